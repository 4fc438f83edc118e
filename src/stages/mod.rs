//! The built-in stages and the [`StageSpec`] type the runner executes.
//!
//! Each stage module exposes a `build_tasks` function that turns the run's
//! static inputs plus the outputs of earlier stages into task descriptors.

pub mod architecture;
pub mod generator;
pub mod knowledge;
pub mod requirements;
pub mod skeletons;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{PipelineContext, StageInputs, StageKind, StageOutput, TaskSpec};

type BuildFn =
    dyn Fn(&StageInputs, &PipelineContext) -> PipelineResult<Vec<TaskSpec>> + Send + Sync;

/// One step of the pipeline: what it is called and how its tasks are built
#[derive(Clone)]
pub struct StageSpec {
    pub kind: StageKind,
    build: Arc<BuildFn>,
}

impl StageSpec {
    pub fn new<F>(kind: StageKind, build: F) -> Self
    where
        F: Fn(&StageInputs, &PipelineContext) -> PipelineResult<Vec<TaskSpec>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind,
            build: Arc::new(build),
        }
    }

    /// The built-in definition of a stage
    pub fn builtin(kind: StageKind) -> Self {
        match kind {
            StageKind::Knowledge => Self::new(kind, knowledge::build_tasks),
            StageKind::Requirements => Self::new(kind, requirements::build_tasks),
            StageKind::Architecture => Self::new(kind, architecture::build_tasks),
            StageKind::Skeletons => Self::new(kind, skeletons::build_tasks),
            StageKind::Generator => Self::new(kind, generator::build_tasks),
        }
    }

    pub fn build_tasks(
        &self,
        inputs: &StageInputs,
        context: &PipelineContext,
    ) -> PipelineResult<Vec<TaskSpec>> {
        (self.build)(inputs, context)
    }
}

impl fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSpec").field("kind", &self.kind).finish()
    }
}

/// All built-in stages in execution order
pub fn default_stages() -> Vec<StageSpec> {
    StageKind::ALL.into_iter().map(StageSpec::builtin).collect()
}

/// Output of an earlier stage, or a `MissingContext` error naming who needed it
pub(crate) fn require_stage(
    context: &PipelineContext,
    stage: StageKind,
    needed_by: StageKind,
) -> PipelineResult<&StageOutput> {
    context
        .get(stage)
        .ok_or_else(|| PipelineError::missing(needed_by, format!("{} output", stage)))
}

/// One task's output from an earlier stage
pub(crate) fn require_task<'a>(
    context: &'a PipelineContext,
    stage: StageKind,
    task: &str,
    needed_by: StageKind,
) -> PipelineResult<&'a Value> {
    require_stage(context, stage, needed_by)?
        .get(task)
        .ok_or_else(|| PipelineError::missing(needed_by, format!("{}.{}", stage, task)))
}

/// Render a value for embedding in a prompt
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_stages_order() {
        let kinds: Vec<StageKind> = default_stages().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
    }

    #[test]
    fn test_every_builtin_has_unique_task_names() {
        let inputs = StageInputs::new("Build a todo app", "Domain: productivity");
        let ctx = crate::stages::tests::full_context();

        for spec in default_stages() {
            let tasks = spec.build_tasks(&inputs, &ctx).unwrap();
            assert!(!tasks.is_empty(), "{} has no tasks", spec.kind);

            let mut names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), tasks.len(), "{} repeats a task name", spec.kind);

            // Context only ever points backwards
            for (i, task) in tasks.iter().enumerate() {
                for dep in &task.context {
                    assert!(
                        tasks[..i].iter().any(|t| &t.name == dep),
                        "{}.{} depends on later task {}",
                        spec.kind,
                        task.name,
                        dep
                    );
                }
            }
        }
    }

    #[test]
    fn test_require_task_reports_missing_key() {
        let mut ctx = PipelineContext::new();
        let mut output = StageOutput::new();
        output.insert("present", json!(1));
        ctx.insert(StageKind::Skeletons, output);

        assert!(require_task(&ctx, StageKind::Skeletons, "present", StageKind::Generator).is_ok());

        let err = require_task(&ctx, StageKind::Skeletons, "absent", StageKind::Generator)
            .unwrap_err();
        assert!(err.to_string().contains("Skeletons.absent"));
        assert_eq!(err.stage(), Some(StageKind::Generator));
    }

    #[test]
    fn test_render_keeps_strings_bare() {
        assert_eq!(render(&json!("Rust, axum")), "Rust, axum");
        assert_eq!(render(&json!({"a": [1]})), r#"{"a":[1]}"#);
    }

    /// A context holding every task output the built-in stages consume
    pub(crate) fn full_context() -> PipelineContext {
        let mut ctx = PipelineContext::new();

        let mut knowledge = StageOutput::new();
        knowledge.insert(
            "finalize_tech_stack",
            json!({"tech_stack": [{"technology": "Rust", "reason": "speed"}]}),
        );
        ctx.insert(StageKind::Knowledge, knowledge);

        let mut requirements = StageOutput::new();
        requirements.insert("extraction_task", json!({"tasks": [{"task_id": "T1"}]}));
        requirements.insert("task_generation_task", json!({"tasks": ["login"]}));
        ctx.insert(StageKind::Requirements, requirements);

        let mut architecture = StageOutput::new();
        architecture.insert("architecture_blueprint_task", json!({"architecture_blueprint": {}}));
        ctx.insert(StageKind::Architecture, architecture);

        let mut skeletons = StageOutput::new();
        skeletons.insert("code_skeleton_task", json!({"project_structure": "src/"}));
        skeletons.insert("module_boilerplate_task", json!({"module_implementations": {}}));
        ctx.insert(StageKind::Skeletons, skeletons);

        ctx
    }
}
