use crate::error::PipelineResult;
use crate::models::{AgentSpec, PipelineContext, StageInputs, StageKind, TaskSpec};

use super::{render, require_stage, require_task, skeletons};

pub const GENERATE_CODE_TASK: &str = "generate_code_task";
pub const VALIDATE_CODE_TASK: &str = "validate_code_task";

fn code_agent(inputs: &StageInputs) -> AgentSpec {
    AgentSpec::new(
        format!("Code Generation Specialist for {}", inputs.project_context),
        "Generate production-ready code for each module based on the code skeleton and \
         architecture design, following clean code principles and established design patterns.",
        "You are a seasoned software engineer who turns skeletons into fully functional, \
         maintainable systems aligned with their architecture.",
    )
}

/// Generator stage: module code and a review of it
pub fn build_tasks(
    inputs: &StageInputs,
    context: &PipelineContext,
) -> PipelineResult<Vec<TaskSpec>> {
    let architecture = require_stage(context, StageKind::Architecture, StageKind::Generator)?;
    let skeleton = require_task(
        context,
        StageKind::Skeletons,
        skeletons::CODE_SKELETON_TASK,
        StageKind::Generator,
    )?;
    let boilerplate = require_task(
        context,
        StageKind::Skeletons,
        skeletons::MODULE_BOILERPLATE_TASK,
        StageKind::Generator,
    )?;
    let agent = code_agent(inputs);

    Ok(vec![
        TaskSpec::new(
            GENERATE_CODE_TASK,
            &agent,
            format!(
                "Using the code skeleton: {} {} and architecture design: {}, generate \
                 production-ready code for each module, including core logic, error handling \
                 and logging, integration with other modules, and inline documentation. Return \
                 a JSON object with keys: 'module_code', 'integration_code', 'error_handling', \
                 'logging'.",
                render(skeleton),
                render(boilerplate),
                render(&architecture.to_value())
            ),
            "A JSON object containing production-ready code for each module and integration \
             points.",
        ),
        TaskSpec::new(
            VALIDATE_CODE_TASK,
            &agent,
            "Validate the generated code against the architecture design and best practices: \
             alignment with the design, clean code, error handling and logging, testability and \
             maintainability. Return a JSON object with keys: 'validation_results', \
             'recommendations', 'code_quality_score'.",
            "A JSON object containing validation results, recommendations, and a quality score.",
        )
        .with_context(&[GENERATE_CODE_TASK]),
    ])
}
