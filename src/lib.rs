pub mod engine;
pub mod error;
pub mod gate;
pub mod io;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod server;
pub mod stages;

pub use engine::{Engine, EngineConfig, LlmEngine};
pub use error::{PipelineError, PipelineResult};
pub use gate::{AutoApprove, ConsoleGate, ReviewGate, Verdict};
pub use io::{OutputStore, ProjectConfig};
pub use llm::{ChatModel, LlmClient, LlmConfig, LlmProvider};
pub use models::{PipelineContext, StageInputs, StageKind, StageOutput, TaskResult, TaskSpec};
pub use normalize::{normalize, normalize_raw, parse_json_from_markdown};
pub use pipeline::{Pipeline, PipelineConfig};
pub use stages::{StageSpec, default_stages};
