use crate::error::PipelineResult;
use crate::models::{AgentSpec, PipelineContext, StageInputs, TaskSpec};

pub const RESEARCH_SIMILAR_PROJECTS: &str = "research_similar_projects";
pub const GATHER_DOCUMENTATION: &str = "gather_documentation";
pub const COLLECT_CODE_SAMPLES: &str = "collect_code_samples";
pub const BUILD_KNOWLEDGE_BASE: &str = "build_knowledge_base";
pub const FINALIZE_TECH_STACK: &str = "finalize_tech_stack";

fn research_agent(inputs: &StageInputs) -> AgentSpec {
    AgentSpec::new(
        format!("Knowledge Research Specialist for {}", inputs.project_context),
        "Automate the gathering of domain-specific knowledge and code examples \
         to build a comprehensive knowledge base.",
        "You are an AI researcher with expertise in information retrieval, \
         documentation analysis, and code pattern recognition.",
    )
}

/// Knowledge stage: reference material and a proposed tech stack
pub fn build_tasks(
    inputs: &StageInputs,
    _context: &PipelineContext,
) -> PipelineResult<Vec<TaskSpec>> {
    let agent = research_agent(inputs);

    Ok(vec![
        TaskSpec::new(
            RESEARCH_SIMILAR_PROJECTS,
            &agent,
            format!(
                "Using the user requirements: {}, research similar open-source projects and \
                 software in the domain of {}. Only list repository URLs you are confident exist. \
                 Return JSON with keys: 'projects': [{{ 'name', 'repo_url', 'summary' }}].",
                inputs.user_requirements, inputs.project_context
            ),
            "JSON list of similar projects with metadata.",
        ),
        TaskSpec::new(
            GATHER_DOCUMENTATION,
            &agent,
            "Collect official docs, tutorials, and API references for the identified projects \
             and technologies, including language and framework documentation. \
             Return JSON with 'docs': [{ 'title', 'url', 'snippet' }].",
            "JSON list of documentation snippets.",
        )
        .with_context(&[RESEARCH_SIMILAR_PROJECTS]),
        TaskSpec::new(
            COLLECT_CODE_SAMPLES,
            &agent,
            "Analyze the code repositories and extract representative code samples or patterns. \
             Return JSON with 'code_samples': [{ 'file_path', 'pattern', 'example' }].",
            "JSON list of code patterns and examples.",
        )
        .with_context(&[RESEARCH_SIMILAR_PROJECTS]),
        TaskSpec::new(
            BUILD_KNOWLEDGE_BASE,
            &agent,
            "Integrate the outputs from research_similar_projects, gather_documentation, \
             and collect_code_samples into a single JSON knowledge_base object with keys: \
             'projects', 'documentation', 'code_samples'.",
            "A consolidated JSON knowledge_base.",
        )
        .with_context(&[
            RESEARCH_SIMILAR_PROJECTS,
            GATHER_DOCUMENTATION,
            COLLECT_CODE_SAMPLES,
        ]),
        TaskSpec::new(
            FINALIZE_TECH_STACK,
            &agent,
            "Analyze the gathered knowledge base, including similar projects, documentation, \
             and code samples, to propose a finalized tech stack for the project. \
             Return JSON with 'tech_stack': [{ 'technology', 'reason' }].",
            "JSON list of technologies with reasons for selection.",
        )
        .with_context(&[BUILD_KNOWLEDGE_BASE]),
    ])
}
