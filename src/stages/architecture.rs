use crate::error::PipelineResult;
use crate::models::{AgentSpec, PipelineContext, StageInputs, StageKind, TaskSpec};

use super::{knowledge, render, require_stage, require_task, requirements};

pub const SYSTEM_RESEARCH_TASK: &str = "system_research_task";
pub const SYSTEM_FLOWCHART_TASK: &str = "system_flowchart_task";
pub const COMPONENT_DIAGRAM_TASK: &str = "component_diagram_task";
pub const ARCHITECTURE_BLUEPRINT_TASK: &str = "architecture_blueprint_task";
pub const ARCHITECTURE_VALIDATION_TASK: &str = "architecture_validation_task";

fn architecture_agent(inputs: &StageInputs) -> AgentSpec {
    AgentSpec::new(
        format!(
            "System Architecture Design Specialist for {}",
            inputs.project_context
        ),
        "Design a comprehensive system architecture that meets the project requirements while \
         incorporating industry best practices and modern design patterns. Ensure scalability, \
         maintainability, and performance.",
        "You are an expert system architect with extensive experience designing scalable, \
         maintainable systems that balance performance, security, and development efficiency.",
    )
}

/// The stack to design against: the caller's choice, else the knowledge stage's proposal
fn resolve_tech_stack(inputs: &StageInputs, context: &PipelineContext) -> PipelineResult<String> {
    match &inputs.tech_stack {
        Some(stack) if !stack.trim().is_empty() => Ok(stack.clone()),
        _ => require_task(
            context,
            StageKind::Knowledge,
            knowledge::FINALIZE_TECH_STACK,
            StageKind::Architecture,
        )
        .map(render),
    }
}

/// Architecture stage: flowchart, components, blueprint and its validation
pub fn build_tasks(
    inputs: &StageInputs,
    context: &PipelineContext,
) -> PipelineResult<Vec<TaskSpec>> {
    let requirement_analysis =
        require_stage(context, StageKind::Requirements, StageKind::Architecture)?;
    let planned_tasks = require_task(
        context,
        StageKind::Requirements,
        requirements::TASK_GENERATION_TASK,
        StageKind::Architecture,
    )?;
    let extracted = require_task(
        context,
        StageKind::Requirements,
        requirements::EXTRACTION_TASK,
        StageKind::Architecture,
    )?;
    let tech_stack = resolve_tech_stack(inputs, context)?;

    let requirement_analysis = render(&requirement_analysis.to_value());
    let agent = architecture_agent(inputs);

    Ok(vec![
        TaskSpec::new(
            SYSTEM_RESEARCH_TASK,
            &agent,
            format!(
                "Research similar systems and architectures related to {}. Focus on similar \
                 projects in the same domain, common architectural patterns and frameworks, \
                 industry standards, lessons learned and performance optimization techniques. \
                 Return a JSON object with keys: 'similar_systems', 'architectural_patterns', \
                 'best_practices', 'lessons_learned', 'performance_optimizations'.",
                inputs.project_context
            ),
            "A JSON object containing research findings about similar systems and architectures.",
        ),
        TaskSpec::new(
            SYSTEM_FLOWCHART_TASK,
            &agent,
            format!(
                "Analyze the requirements {} and the planned development tasks {} together with \
                 the research findings to create a detailed system flowchart. Include system \
                 components and their interactions, data flow, user interaction points, external \
                 integrations, error handling and recovery paths, and performance critical paths. \
                 Return JSON with a 'flowchart' key containing the diagram and a \
                 'system_workflow' key detailing component interactions at each step.",
                requirement_analysis,
                render(planned_tasks)
            ),
            "JSON object containing a detailed system flowchart and component interactions.",
        )
        .with_context(&[SYSTEM_RESEARCH_TASK]),
        TaskSpec::new(
            COMPONENT_DIAGRAM_TASK,
            &agent,
            format!(
                "Based on the extracted requirements: {}, project context: {}, tech stack: {}, \
                 the research findings, and the system flowchart, create a comprehensive \
                 component diagram covering responsibilities, interfaces and protocols, storage, \
                 external services, security and authentication, monitoring and logging. Return \
                 a JSON object with keys 'component_diagram' for the diagram and \
                 'component_specifications' detailing responsibilities and interfaces.",
                render(extracted),
                inputs.project_context,
                tech_stack
            ),
            "A JSON object containing a detailed component diagram and specifications.",
        )
        .with_context(&[SYSTEM_FLOWCHART_TASK, SYSTEM_RESEARCH_TASK]),
        TaskSpec::new(
            ARCHITECTURE_BLUEPRINT_TASK,
            &agent,
            format!(
                "Create a detailed architecture blueprint targeting the tech stack {} based on \
                 the requirements, research findings, flowchart, and component diagram. For each \
                 component specify responsibilities, interfaces, data models and schemas, \
                 integration points, security requirements, performance considerations and \
                 scalability strategies. Return a JSON object with keys 'architecture_blueprint' \
                 and 'implementation_guidelines'.",
                tech_stack
            ),
            "A JSON object containing an architecture blueprint and implementation guidelines.",
        )
        .with_context(&[
            SYSTEM_FLOWCHART_TASK,
            COMPONENT_DIAGRAM_TASK,
            SYSTEM_RESEARCH_TASK,
        ]),
        TaskSpec::new(
            ARCHITECTURE_VALIDATION_TASK,
            &agent,
            "Validate the architecture design against the requirements and research findings. \
             Check that all requirements are addressed, best practices are followed, security \
             and performance are considered, and the design is scalable, maintainable and \
             feasible to integrate. Return a JSON object with keys: 'validation_results', \
             'recommendations', 'best_practice_alignment', 'risk_assessment'.",
            "A JSON object containing architecture validation results and recommendations.",
        )
        .with_context(&[ARCHITECTURE_BLUEPRINT_TASK, SYSTEM_RESEARCH_TASK]),
    ])
}
