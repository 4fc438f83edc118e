use crate::error::PipelineResult;
use crate::models::{AgentSpec, PipelineContext, StageInputs, StageKind, TaskSpec};

use super::{knowledge, render};

pub const EXTRACTION_TASK: &str = "extraction_task";
pub const PROJECT_RESEARCH_TASK: &str = "project_research_task";
pub const INTENT_ANALYSIS_TASK: &str = "intent_analysis_task";
pub const TASK_GENERATION_TASK: &str = "task_generation_task";
pub const REQUIREMENT_VALIDATION_TASK: &str = "requirement_validation_task";
pub const SUBTASK_BREAKDOWN_TASK: &str = "subtask_breakdown_task";

fn requirement_agent(inputs: &StageInputs) -> AgentSpec {
    AgentSpec::new(
        format!(
            "AI-Driven Requirements Engineering Specialist for {}",
            inputs.project_context
        ),
        "Analyze and structure software requirements. Transform complex user inputs into \
         actionable development tasks while identifying implicit needs and automation \
         opportunities. Prioritize tasks for AI agent collaboration.",
        "You are an expert in requirements engineering, specializing in identifying automation \
         opportunities and structuring requirements for AI agent collaboration. You excel at \
         uncovering implicit needs and turning them into clear, actionable development tasks.",
    )
}

fn intent_agent() -> AgentSpec {
    AgentSpec::new(
        "User Intent Analysis Specialist",
        "Deeply analyze user requirements to understand the underlying intent, business goals, \
         and implicit needs. Research similar projects and industry best practices to inform \
         task creation.",
        "You are an expert in requirements analysis and user intent understanding. You have \
         extensive experience researching similar projects and identifying successful patterns.",
    )
}

/// Requirements stage: extraction, intent analysis and task breakdown
///
/// Uses the knowledge base when the knowledge stage has already run; it is
/// not required.
pub fn build_tasks(
    inputs: &StageInputs,
    context: &PipelineContext,
) -> PipelineResult<Vec<TaskSpec>> {
    let requirement = requirement_agent(inputs);
    let intent = intent_agent();

    let background = context
        .get(StageKind::Knowledge)
        .and_then(|k| k.get(knowledge::BUILD_KNOWLEDGE_BASE))
        .map(|kb| format!(" Reference knowledge base: {}.", render(kb)))
        .unwrap_or_default();

    Ok(vec![
        TaskSpec::new(
            EXTRACTION_TASK,
            &requirement,
            format!(
                "Analyze the user requirements: {} and project context: {} to extract essential \
                 functionalities, constraints, and automation opportunities. Identify tasks that \
                 can be automated by AI agents and those requiring human intervention. Return a \
                 JSON object with a key 'tasks' mapping to a list of objects, each containing: \
                 'task_id', 'description', 'priority' (low/med/high), 'automation_potential' \
                 (high/medium/low), 'ai_agent_type' (if applicable), and 'dependencies'.",
                inputs.user_requirements, inputs.project_context
            ),
            "A JSON object containing prioritized development tasks with automation potential \
             analysis, in a logical execution order.",
        ),
        TaskSpec::new(
            PROJECT_RESEARCH_TASK,
            &intent,
            format!(
                "Research similar projects and implementations related to {}.{} Focus on:\n\
                 - Similar projects in the same domain\n\
                 - Common implementation patterns\n\
                 - Industry best practices\n\
                 - Lessons learned\n\
                 - Automation approaches used\n\
                 Return a JSON object with keys: 'similar_projects', 'implementation_patterns', \
                 'best_practices', 'lessons_learned', 'automation_examples'.",
                inputs.project_context, background
            ),
            "A JSON object containing research findings about similar projects.",
        ),
        TaskSpec::new(
            INTENT_ANALYSIS_TASK,
            &intent,
            format!(
                "Analyze the user requirements: {} and project context: {} to understand the \
                 true intent and business goals. Consider what problem the user is solving, the \
                 implicit requirements, the key success criteria, and how similar projects \
                 address these needs. Return a JSON object with keys: 'business_goals', \
                 'implicit_requirements', 'success_criteria', 'similar_project_insights', \
                 'automation_potential'.",
                inputs.user_requirements, inputs.project_context
            ),
            "A JSON object containing an analysis of user intent and business goals.",
        )
        .with_context(&[PROJECT_RESEARCH_TASK]),
        TaskSpec::new(
            TASK_GENERATION_TASK,
            &requirement,
            "Based on the user intent analysis and project research, generate a comprehensive \
             list of development tasks, considering similar implementations, best practices, \
             automation opportunities and technical requirements. Return a JSON object with \
             keys: 'tasks', 'automation_strategies', 'implementation_patterns', 'dependencies', \
             'success_metrics'.",
            "A JSON object containing a comprehensive list of tasks.",
        )
        .with_context(&[INTENT_ANALYSIS_TASK, PROJECT_RESEARCH_TASK]),
        TaskSpec::new(
            REQUIREMENT_VALIDATION_TASK,
            &requirement,
            "Validate the extracted requirements against the user intent analysis. Ensure all \
             business goals are addressed, implicit requirements are included, success criteria \
             are measurable and technical constraints are considered. Return a JSON object with \
             keys: 'validated_requirements', 'gaps_identified', 'automation_improvements', \
             'risk_assessment'.",
            "A JSON object containing validated requirements with identified gaps.",
        )
        .with_context(&[INTENT_ANALYSIS_TASK, EXTRACTION_TASK]),
        TaskSpec::new(
            SUBTASK_BREAKDOWN_TASK,
            &requirement,
            "Decompose each extracted high-level task into atomic subtasks suited to AI agent \
             execution. Return a JSON object with a key 'tasks' where each task maps to its list \
             of subtasks, each containing 'subtask_id', 'description', 'priority', \
             'ai_agent_requirements', 'input_spec', 'output_spec', and 'success_criteria'.",
            "A JSON object with a structured breakdown of subtasks.",
        )
        .with_context(&[EXTRACTION_TASK]),
    ])
}
