use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{StageKind, StageOutput};

/// Directory under the store root that receives validation logs
pub const VALIDATION_LOG_DIR: &str = "validation_logs";

/// Writes stage outputs to `<root>/<title>/<Stage>.json`
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a stage output for `title` is written to
    pub fn stage_path(&self, title: &str, stage: StageKind) -> PathBuf {
        self.root
            .join(title)
            .join(format!("{}.json", stage.persist_key()))
    }

    /// Write a stage output, replacing any earlier file
    pub fn save(
        &self,
        title: &str,
        stage: StageKind,
        output: &StageOutput,
    ) -> PipelineResult<PathBuf> {
        let path = self.stage_path(title, stage);
        write_pretty_json(&path, output)?;
        info!("Output saved to {:?}", path);
        Ok(path)
    }

    /// Read a previously saved stage output, if there is one
    pub fn load(&self, title: &str, stage: StageKind) -> PipelineResult<Option<StageOutput>> {
        let path = self.stage_path(title, stage);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        let output: StageOutput = serde_json::from_str(&content)?;
        Ok(Some(output))
    }

    /// Record a hand-edited task output under `validation_logs/<task>_modified.json`
    pub fn save_validation(
        &self,
        task_name: &str,
        modified_output: &Value,
    ) -> PipelineResult<PathBuf> {
        if task_name.is_empty() || task_name.contains(['/', '\\']) || task_name.contains("..") {
            return Err(PipelineError::Config(format!(
                "invalid task name: {:?}",
                task_name
            )));
        }

        let record = ValidationRecord {
            task_name,
            received_at: Utc::now(),
            modified_output,
        };
        let path = self
            .root
            .join(VALIDATION_LOG_DIR)
            .join(format!("{}_modified.json", task_name));
        write_pretty_json(&path, &record)?;
        info!("Modified output for {} saved to {:?}", task_name, path);
        Ok(path)
    }
}

#[derive(Debug, Serialize)]
struct ValidationRecord<'a> {
    task_name: &'a str,
    received_at: DateTime<Utc>,
    modified_output: &'a Value,
}

fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = std::fs::File::create(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_writes_pretty_json_under_title() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let mut output = StageOutput::new();
        output.insert("finalize_tech_stack", json!({"tech_stack": ["Rust"]}));

        let path = store.save("todo", StageKind::Knowledge, &output).unwrap();
        assert_eq!(path, dir.path().join("todo").join("Knowledge.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "{\n  \"finalize_tech_stack\": {\n    \"tech_stack\": [\n      \"Rust\"\n    ]\n  }\n}"
        );
    }

    #[test]
    fn test_save_overwrites_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        assert!(store.load("todo", StageKind::Skeletons).unwrap().is_none());

        let mut first = StageOutput::new();
        first.insert("a", json!(1));
        store.save("todo", StageKind::Skeletons, &first).unwrap();

        let mut second = StageOutput::new();
        second.insert("b", json!(2));
        store.save("todo", StageKind::Skeletons, &second).unwrap();

        assert_eq!(store.load("todo", StageKind::Skeletons).unwrap(), Some(second));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let path = store.stage_path("todo", StageKind::Generator);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            store.load("todo", StageKind::Generator),
            Err(PipelineError::Json(_))
        ));
    }

    #[test]
    fn test_save_validation() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let path = store
            .save_validation("extraction_task", &json!({"tasks": []}))
            .unwrap();
        assert_eq!(
            path,
            dir.path().join("validation_logs").join("extraction_task_modified.json")
        );

        let record: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(record["task_name"], "extraction_task");
        assert_eq!(record["modified_output"], json!({"tasks": []}));
        assert!(record["received_at"].is_string());

        assert!(store.save_validation("../escape", &json!(1)).is_err());
    }
}
