use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::llm::{ChatModel, JSON_REMINDER, build_system_prompt, build_task_prompt};
use crate::models::{TaskResult, TaskSpec};
use crate::normalize::{is_structured, normalize_raw};

/// Executes the tasks of one stage and returns their raw output
///
/// `Ok(None)` means the stage produced nothing usable; the pipeline treats
/// that as terminal. `Err` is reserved for transport and provider failures.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn kickoff(&self, tasks: &[TaskSpec]) -> Result<Option<Vec<TaskResult>>>;
}

/// Configuration for [`LlmEngine`]
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Extra attempts per task when the response holds no JSON object or array
    pub max_reprompts: u32,
}

/// Runs tasks one after another against a chat model
pub struct LlmEngine<M> {
    model: M,
    config: EngineConfig,
}

impl<M: ChatModel> LlmEngine<M> {
    pub fn new(model: M, config: EngineConfig) -> Self {
        Self { model, config }
    }

    async fn run_task(&self, task: &TaskSpec, context: &[&TaskResult]) -> Result<Option<String>> {
        let system = build_system_prompt(&task.agent);
        let prompt = build_task_prompt(task, context);

        let mut last_response = None;

        for attempt in 0..=self.config.max_reprompts {
            let user = if attempt == 0 {
                prompt.clone()
            } else {
                info!(
                    "Task {}: re-prompt {} of {}",
                    task.name, attempt, self.config.max_reprompts
                );
                format!("{}\n\n{}", prompt, JSON_REMINDER)
            };

            let raw = self
                .model
                .complete(&system, &user)
                .await
                .with_context(|| format!("Task {} failed", task.name))?;

            if raw.trim().is_empty() {
                warn!("Task {}: empty response", task.name);
                return Ok(None);
            }

            if is_structured(&normalize_raw(&raw)) {
                return Ok(Some(raw));
            }

            warn!("Task {}: response holds no JSON object or array", task.name);
            last_response = Some(raw);
        }

        Ok(last_response)
    }
}

#[async_trait]
impl<M: ChatModel> Engine for LlmEngine<M> {
    async fn kickoff(&self, tasks: &[TaskSpec]) -> Result<Option<Vec<TaskResult>>> {
        let mut results: Vec<TaskResult> = Vec::with_capacity(tasks.len());

        for task in tasks {
            let outcome = {
                let context = task
                    .context
                    .iter()
                    .map(|name| {
                        results.iter().find(|r| &r.name == name).with_context(|| {
                            format!(
                                "Task {} needs {} as context, which has not run",
                                task.name, name
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                debug!("Task {}: {} context tasks", task.name, context.len());
                self.run_task(task, &context).await?
            };

            match outcome {
                Some(raw) => {
                    info!("Task {}: {} chars", task.name, raw.len());
                    results.push(TaskResult::new(task.name.clone(), raw));
                }
                None => return Ok(None),
            }
        }

        Ok(Some(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentSpec;
    use std::sync::Mutex;

    /// Replies from a fixed script and records every user prompt
    struct ScriptedModel {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .context("script exhausted")
        }
    }

    fn tasks() -> Vec<TaskSpec> {
        let agent = AgentSpec::new("Analyst", "Analyze", "Experienced");
        vec![
            TaskSpec::new("first", &agent, "Go.", "JSON."),
            TaskSpec::new("second", &agent, "Continue.", "JSON.").with_context(&["first"]),
        ]
    }

    #[tokio::test]
    async fn test_context_is_forwarded() {
        let engine = LlmEngine::new(
            ScriptedModel::new(&["{\"marker\": \"alpha\"}", "```json\n{}\n```"]),
            EngineConfig::default(),
        );

        let results = engine.kickoff(&tasks()).await.unwrap().unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "first");
        assert_eq!(results[1].raw, "```json\n{}\n```");

        let prompts = engine.model.prompts.lock().unwrap();
        assert!(!prompts[0].contains("alpha"));
        assert!(prompts[1].contains("### first\n{\"marker\": \"alpha\"}"));
    }

    #[tokio::test]
    async fn test_empty_response_means_no_output() {
        let engine = LlmEngine::new(
            ScriptedModel::new(&["{}", "   "]),
            EngineConfig::default(),
        );

        assert!(engine.kickoff(&tasks()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reprompt_until_json() {
        let engine = LlmEngine::new(
            ScriptedModel::new(&["sorry, no json", "{\"ok\": true}", "[]"]),
            EngineConfig { max_reprompts: 1 },
        );

        let results = engine.kickoff(&tasks()).await.unwrap().unwrap();
        assert_eq!(results[0].raw, "{\"ok\": true}");

        let prompts = engine.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].ends_with(JSON_REMINDER));
    }

    #[tokio::test]
    async fn test_text_kept_when_reprompts_exhausted() {
        let engine = LlmEngine::new(
            ScriptedModel::new(&["plain text", "more text"]),
            EngineConfig::default(),
        );

        let results = engine.kickoff(&tasks()).await.unwrap().unwrap();
        assert_eq!(results[0].raw, "plain text");
    }

    #[tokio::test]
    async fn test_unknown_context_is_an_error() {
        let agent = AgentSpec::new("A", "B", "C");
        let tasks = vec![TaskSpec::new("only", &agent, "x", "y").with_context(&["missing"])];
        let engine = LlmEngine::new(ScriptedModel::new(&["{}"]), EngineConfig::default());

        let err = engine.kickoff(&tasks).await.unwrap_err();
        assert!(err.to_string().contains("needs missing as context"));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let engine = LlmEngine::new(ScriptedModel::new(&[]), EngineConfig::default());
        let err = engine.kickoff(&tasks()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("script exhausted"));
    }
}
