use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::{PipelineError, PipelineResult};
use crate::gate::{AutoApprove, ReviewGate, Verdict};
use crate::io::OutputStore;
use crate::models::{PipelineContext, StageInputs, StageKind, StageOutput, TaskResult};
use crate::normalize::{normalize, normalize_raw};
use crate::stages::StageSpec;

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory name the stage outputs are written under
    pub title: String,
    /// Stages to execute; `None` runs every stage it is given
    pub selected: Option<Vec<StageKind>>,
}

impl PipelineConfig {
    /// Surrounding whitespace is dropped from `title`
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            selected: None,
        }
    }

    pub fn with_selection(mut self, stages: Vec<StageKind>) -> Self {
        self.selected = Some(stages);
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        validate_title(&self.title)
    }

    fn is_selected(&self, stage: StageKind) -> bool {
        self.selected
            .as_ref()
            .is_none_or(|selected| selected.contains(&stage))
    }
}

/// A title becomes a directory name, so it must be a single path component
pub fn validate_title(title: &str) -> PipelineResult<()> {
    let invalid = title.is_empty()
        || title != title.trim()
        || title == "."
        || title == ".."
        || title.contains(['/', '\\']);
    if invalid {
        return Err(PipelineError::Config(format!("invalid title: {:?}", title)));
    }
    Ok(())
}

/// Runs stages in order, feeding each one the outputs of the stages before it
pub struct Pipeline {
    engine: Arc<dyn Engine>,
    store: OutputStore,
    gate: Box<dyn ReviewGate>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(engine: Arc<dyn Engine>, store: OutputStore, config: PipelineConfig) -> Self {
        Self {
            engine,
            store,
            gate: Box::new(AutoApprove),
            config,
        }
    }

    /// Review every task output with `gate` before it is stored
    pub fn with_gate(mut self, gate: impl ReviewGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Execute `stages` in order and return the accumulated context
    ///
    /// Stops at the first stage that fails; outputs of the stages before it
    /// are already on disk. Unselected stages are not executed, but their
    /// saved output from an earlier run is loaded when present.
    pub async fn run(
        &mut self,
        stages: &[StageSpec],
        inputs: &StageInputs,
    ) -> PipelineResult<PipelineContext> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        info!(
            "Pipeline run {} for {:?}: {} stages",
            run_id,
            self.config.title,
            stages.len()
        );

        let mut context = PipelineContext::new();

        for stage in stages {
            if !self.config.is_selected(stage.kind) {
                match self.store.load(&self.config.title, stage.kind)? {
                    Some(output) => {
                        info!("Using saved {} output ({} tasks)", stage.kind, output.len());
                        context.insert(stage.kind, output);
                    }
                    None => debug!("Skipping {} stage", stage.kind),
                }
                continue;
            }

            info!("=== Starting {} stage ===", stage.kind);
            let output = self.run_stage(stage, inputs, &context).await?;
            context.insert(stage.kind, output);
        }

        info!(
            "Pipeline run {} complete: {} stages available",
            run_id,
            context.len()
        );
        Ok(context)
    }

    /// Execute one stage against `context`, review and persist its output
    pub async fn run_stage(
        &mut self,
        stage: &StageSpec,
        inputs: &StageInputs,
        context: &PipelineContext,
    ) -> PipelineResult<StageOutput> {
        self.config.validate()?;

        let tasks = stage.build_tasks(inputs, context)?;
        info!("{} stage: {} tasks", stage.kind, tasks.len());

        let results = self
            .engine
            .kickoff(&tasks)
            .await
            .map_err(|source| PipelineError::Engine {
                stage: stage.kind,
                source,
            })?;

        let results = match results {
            Some(results) if !results.is_empty() => results,
            _ => {
                warn!("{} stage produced no output, stopping", stage.kind);
                return Err(PipelineError::StageFailed { stage: stage.kind });
            }
        };

        let output = self.collect_outputs(stage.kind, results)?;
        self.store.save(&self.config.title, stage.kind, &output)?;
        Ok(output)
    }

    fn collect_outputs(
        &mut self,
        stage: StageKind,
        results: Vec<TaskResult>,
    ) -> PipelineResult<StageOutput> {
        let mut output = StageOutput::new();

        for result in results {
            let value = normalize_raw(&result.raw);
            let verdict = self
                .gate
                .review(stage, &result.name, &value)
                .map_err(|source| PipelineError::Review { stage, source })?;

            let value = match verdict {
                Verdict::Accept => value,
                Verdict::Modify(replacement) => {
                    info!("{}.{}: using modified output", stage, result.name);
                    normalize(replacement)
                }
                Verdict::Reject => {
                    warn!("{}.{}: output rejected, stopping", stage, result.name);
                    return Err(PipelineError::Rejected {
                        stage,
                        task: result.name,
                    });
                }
            };
            output.insert(result.name, value);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentSpec, TaskSpec};
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Answers each task with a fixed reply; a task whose reply is `None` ends the stage empty
    struct FakeEngine {
        replies: Vec<(&'static str, Option<&'static str>)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeEngine {
        fn new(replies: Vec<(&'static str, Option<&'static str>)>) -> Arc<Self> {
            Arc::new(Self {
                replies,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Engine for FakeEngine {
        async fn kickoff(&self, tasks: &[TaskSpec]) -> Result<Option<Vec<TaskResult>>> {
            let mut results = Vec::new();
            for task in tasks {
                self.calls.lock().unwrap().push(task.name.clone());
                let reply = self
                    .replies
                    .iter()
                    .find(|(name, _)| *name == task.name)
                    .and_then(|(_, reply)| *reply);
                match reply {
                    Some(raw) => results.push(TaskResult::new(task.name.clone(), raw)),
                    None => return Ok(None),
                }
            }
            Ok(Some(results))
        }
    }

    /// A stage with one task, named `<stage>_task`, that records the stages it could see
    fn single_task_stage(kind: StageKind) -> StageSpec {
        StageSpec::new(kind, move |_inputs: &StageInputs, ctx: &PipelineContext| {
            let seen: Vec<&str> = ctx.stages().map(|s| s.slug()).collect();
            let agent = AgentSpec::new("Agent", "Goal", "Story");
            Ok(vec![TaskSpec::new(
                format!("{}_task", kind.slug()),
                &agent,
                format!("seen: {}", seen.join(",")),
                "JSON",
            )])
        })
    }

    fn three_stages() -> Vec<StageSpec> {
        vec![
            single_task_stage(StageKind::Knowledge),
            single_task_stage(StageKind::Requirements),
            single_task_stage(StageKind::Architecture),
        ]
    }

    struct ScriptedGate(Vec<Verdict>);

    impl ReviewGate for ScriptedGate {
        fn review(&mut self, _stage: StageKind, _task: &str, _output: &Value) -> Result<Verdict> {
            Ok(self.0.remove(0))
        }
    }

    #[tokio::test]
    async fn test_runs_all_stages_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let engine = FakeEngine::new(vec![
            ("knowledge_task", Some("```json\n{\"k\": 1}\n```")),
            ("requirements_task", Some("{\"r\": \"[true]\"}")),
            ("architecture_task", Some("plain words")),
        ]);

        let mut pipeline =
            Pipeline::new(engine.clone(), store.clone(), PipelineConfig::new("todo"));
        let ctx = pipeline
            .run(&three_stages(), &StageInputs::new("x", "y"))
            .await
            .unwrap();

        assert_eq!(ctx.len(), 3);
        assert_eq!(
            ctx.get(StageKind::Knowledge).unwrap().get("knowledge_task"),
            Some(&json!({"k": 1}))
        );
        assert_eq!(
            ctx.get(StageKind::Requirements).unwrap().get("requirements_task"),
            Some(&json!({"r": [true]}))
        );
        assert_eq!(
            ctx.get(StageKind::Architecture).unwrap().get("architecture_task"),
            Some(&json!("plain words"))
        );

        for kind in [StageKind::Knowledge, StageKind::Requirements, StageKind::Architecture] {
            assert!(store.stage_path("todo", kind).exists());
        }
    }

    #[tokio::test]
    async fn test_stage_without_output_halts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let engine = FakeEngine::new(vec![
            ("knowledge_task", Some("{}")),
            ("requirements_task", None),
            ("architecture_task", Some("{}")),
        ]);

        let mut pipeline =
            Pipeline::new(engine.clone(), store.clone(), PipelineConfig::new("todo"));
        let err = pipeline
            .run(&three_stages(), &StageInputs::new("x", "y"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::StageFailed {
                stage: StageKind::Requirements
            }
        ));
        assert!(store.stage_path("todo", StageKind::Knowledge).exists());
        assert!(!store.stage_path("todo", StageKind::Requirements).exists());
        assert!(!store.stage_path("todo", StageKind::Architecture).exists());
        assert_eq!(engine.calls(), vec!["knowledge_task", "requirements_task"]);
    }

    #[tokio::test]
    async fn test_later_stages_see_earlier_outputs_only() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let stages: Vec<StageSpec> = StageKind::ALL[..3]
            .iter()
            .map(|&kind| {
                let seen = seen.clone();
                StageSpec::new(kind, move |_: &StageInputs, ctx: &PipelineContext| {
                    seen.lock()
                        .unwrap()
                        .push((kind, ctx.stages().collect::<Vec<_>>()));
                    let agent = AgentSpec::new("A", "B", "C");
                    Ok(vec![TaskSpec::new("t", &agent, "d", "e")])
                })
            })
            .collect();

        let engine = FakeEngine::new(vec![("t", Some("{}"))]);
        let mut pipeline =
            Pipeline::new(engine, OutputStore::new(dir.path()), PipelineConfig::new("p"));
        pipeline.run(&stages, &StageInputs::default()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (StageKind::Knowledge, vec![]));
        assert_eq!(seen[1], (StageKind::Requirements, vec![StageKind::Knowledge]));
        assert_eq!(
            seen[2],
            (
                StageKind::Architecture,
                vec![StageKind::Knowledge, StageKind::Requirements]
            )
        );
    }

    #[tokio::test]
    async fn test_rejected_task_halts_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let engine = FakeEngine::new(vec![
            ("knowledge_task", Some("{}")),
            ("requirements_task", Some("{}")),
            ("architecture_task", Some("{}")),
        ]);

        let mut pipeline = Pipeline::new(engine.clone(), store.clone(), PipelineConfig::new("todo"))
            .with_gate(ScriptedGate(vec![Verdict::Accept, Verdict::Reject]));
        let err = pipeline
            .run(&three_stages(), &StageInputs::default())
            .await
            .unwrap_err();

        match err {
            PipelineError::Rejected { stage, task } => {
                assert_eq!(stage, StageKind::Requirements);
                assert_eq!(task, "requirements_task");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!store.stage_path("todo", StageKind::Requirements).exists());
        assert_eq!(engine.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_modified_output_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let engine = FakeEngine::new(vec![("knowledge_task", Some("{\"draft\": true}"))]);

        let mut pipeline = Pipeline::new(engine, store.clone(), PipelineConfig::new("todo"))
            .with_gate(ScriptedGate(vec![Verdict::Modify(json!({"edited": "[1]"}))]));
        let output = pipeline
            .run_stage(
                &single_task_stage(StageKind::Knowledge),
                &StageInputs::default(),
                &PipelineContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(output.get("knowledge_task"), Some(&json!({"edited": [1]})));
        assert_eq!(store.load("todo", StageKind::Knowledge).unwrap(), Some(output));
    }

    #[tokio::test]
    async fn test_unselected_stages_load_saved_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let mut saved = StageOutput::new();
        saved.insert("knowledge_task", json!({"from": "disk"}));
        store.save("todo", StageKind::Knowledge, &saved).unwrap();

        let engine = FakeEngine::new(vec![("requirements_task", Some("{}"))]);
        let config = PipelineConfig::new("todo").with_selection(vec![StageKind::Requirements]);
        let mut pipeline = Pipeline::new(engine.clone(), store, config);

        let ctx = pipeline
            .run(&three_stages(), &StageInputs::default())
            .await
            .unwrap();

        assert_eq!(engine.calls(), vec!["requirements_task"]);
        assert_eq!(ctx.get(StageKind::Knowledge), Some(&saved));
        assert!(ctx.contains(StageKind::Requirements));
        assert!(!ctx.contains(StageKind::Architecture));
    }

    #[tokio::test]
    async fn test_missing_context_stops_before_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new(vec![]);
        let config = PipelineConfig::new("todo").with_selection(vec![StageKind::Architecture]);
        let mut pipeline = Pipeline::new(engine.clone(), OutputStore::new(dir.path()), config);

        let err = pipeline
            .run(&crate::stages::default_stages(), &StageInputs::new("x", "y"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MissingContext {
                stage: StageKind::Architecture,
                ..
            }
        ));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_engine_error_is_attributed_to_stage() {
        struct Failing;

        #[async_trait]
        impl Engine for Failing {
            async fn kickoff(&self, _tasks: &[TaskSpec]) -> Result<Option<Vec<TaskResult>>> {
                anyhow::bail!("connection refused")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(
            Arc::new(Failing),
            OutputStore::new(dir.path()),
            PipelineConfig::new("todo"),
        );
        let err = pipeline
            .run(&three_stages(), &StageInputs::default())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(StageKind::Knowledge));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_title_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new(vec![]);
        let mut pipeline = Pipeline::new(
            engine.clone(),
            OutputStore::new(dir.path()),
            PipelineConfig::new("../elsewhere"),
        );

        let err = pipeline
            .run(&three_stages(), &StageInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_title_whitespace() {
        assert_eq!(PipelineConfig::new("  todo \n").title, "todo");
        assert!(validate_title("todo").is_ok());
        assert!(validate_title("todo ").is_err());
        assert!(validate_title(" ").is_err());
        assert!(validate_title("a\\b").is_err());
    }

    #[tokio::test]
    async fn test_padded_title_writes_trimmed_directory() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::new(vec![("knowledge_task", Some("{}"))]);
        let mut pipeline = Pipeline::new(
            engine,
            OutputStore::new(dir.path()),
            PipelineConfig::new(" todo "),
        );

        pipeline
            .run_stage(
                &single_task_stage(StageKind::Knowledge),
                &StageInputs::default(),
                &PipelineContext::new(),
            )
            .await
            .unwrap();

        assert!(dir.path().join("todo").join("Knowledge.json").exists());
        assert!(!dir.path().join(" todo ").exists());
    }
}
