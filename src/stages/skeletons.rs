use crate::error::PipelineResult;
use crate::models::{AgentSpec, PipelineContext, StageInputs, StageKind, TaskSpec};

use super::{render, require_stage};

pub const CODE_RESEARCH_TASK: &str = "code_research_task";
pub const CODE_SKELETON_TASK: &str = "code_skeleton_task";
pub const MODULE_BOILERPLATE_TASK: &str = "module_boilerplate_task";
pub const TESTING_BOILERPLATE_TASK: &str = "testing_boilerplate_task";
pub const DOCUMENTATION_TASK: &str = "documentation_task";

fn skeleton_agent(inputs: &StageInputs) -> AgentSpec {
    AgentSpec::new(
        format!("Code Skeleton Generator for {}", inputs.project_context),
        "Generate robust code templates and boilerplate based on the architecture design and \
         requirements. Keep the structure scalable, maintainable and performant.",
        "You are an expert in code generation and software engineering, specializing in turning \
         architectural designs into maintainable code templates.",
    )
}

/// Skeletons stage: project layout, module and test boilerplate, docs
pub fn build_tasks(
    inputs: &StageInputs,
    context: &PipelineContext,
) -> PipelineResult<Vec<TaskSpec>> {
    let architecture = require_stage(context, StageKind::Architecture, StageKind::Skeletons)?;
    let architecture = render(&architecture.to_value());
    let agent = skeleton_agent(inputs);

    Ok(vec![
        TaskSpec::new(
            CODE_RESEARCH_TASK,
            &agent,
            format!(
                "Research similar implementations and codebases related to {}. Focus on common \
                 code patterns and structures, industry standards, lessons learned and \
                 optimization techniques. Return a JSON object with keys: \
                 'similar_implementations', 'code_patterns', 'best_practices', \
                 'lessons_learned', 'optimization_techniques'.",
                inputs.project_context
            ),
            "A JSON object containing research findings about similar codebases.",
        ),
        TaskSpec::new(
            CODE_SKELETON_TASK,
            &agent,
            format!(
                "Based on the architecture design: {} and the research findings, generate the \
                 main code skeleton: project structure, core module definitions, interface \
                 specifications, data models and error handling patterns. Return a JSON object \
                 with keys: 'project_structure', 'core_modules', 'interfaces', 'data_models', \
                 'error_handling'.",
                architecture
            ),
            "A JSON object containing the main code skeleton.",
        )
        .with_context(&[CODE_RESEARCH_TASK]),
        TaskSpec::new(
            MODULE_BOILERPLATE_TASK,
            &agent,
            "Generate boilerplate code for each module based on the architecture design and code \
             skeleton: class and function definitions, interface implementations, data model \
             implementations, error handling and integration points. Return a JSON object with \
             keys: 'module_implementations', 'interface_code', 'data_model_code', \
             'error_handling_code'.",
            "A JSON object containing boilerplate code for each module.",
        )
        .with_context(&[CODE_SKELETON_TASK, CODE_RESEARCH_TASK]),
        TaskSpec::new(
            TESTING_BOILERPLATE_TASK,
            &agent,
            "Generate testing boilerplate based on the module implementations: unit, integration \
             and performance test templates, mocks and test utilities. Return a JSON object with \
             keys: 'unit_tests', 'integration_tests', 'performance_tests', 'test_utilities'.",
            "A JSON object containing testing boilerplate code and templates.",
        )
        .with_context(&[MODULE_BOILERPLATE_TASK, CODE_RESEARCH_TASK]),
        TaskSpec::new(
            DOCUMENTATION_TASK,
            &agent,
            "Generate documentation for the code skeleton and module implementations. Return a \
             JSON object with keys: 'api_docs', 'architecture_docs', 'module_docs', \
             'integration_docs', 'performance_docs'.",
            "A JSON object containing documentation for the codebase.",
        )
        .with_context(&[
            MODULE_BOILERPLATE_TASK,
            TESTING_BOILERPLATE_TASK,
            CODE_RESEARCH_TASK,
        ]),
    ])
}
