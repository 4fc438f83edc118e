use std::path::PathBuf;

use thiserror::Error;

use crate::models::StageKind;

/// Errors that stop a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid configuration; nothing was executed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stage needs output that no earlier stage produced
    #[error("{stage} stage needs {what}, which is not available")]
    MissingContext { stage: StageKind, what: String },

    /// The engine returned nothing for the stage
    #[error("Pipeline halted at stage {stage}: no output was produced")]
    StageFailed { stage: StageKind },

    /// The review gate rejected a task's output
    #[error("Pipeline halted at stage {stage}: output of task {task} was rejected")]
    Rejected { stage: StageKind, task: String },

    /// Transport or provider failure while executing a stage
    #[error("{stage} stage failed: {source:#}")]
    Engine {
        stage: StageKind,
        #[source]
        source: anyhow::Error,
    },

    /// The review gate could not obtain a decision
    #[error("Review of {stage} output failed: {source:#}")]
    Review {
        stage: StageKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// The stage the run stopped at, if the error is tied to one
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::MissingContext { stage, .. }
            | PipelineError::StageFailed { stage }
            | PipelineError::Rejected { stage, .. }
            | PipelineError::Engine { stage, .. }
            | PipelineError::Review { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub(crate) fn missing(stage: StageKind, what: impl Into<String>) -> Self {
        PipelineError::MissingContext {
            stage,
            what: what.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
