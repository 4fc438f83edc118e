//! HTTP surface: one POST endpoint per stage plus a validation log endpoint.
//!
//! Every request runs a single stage with the outputs supplied in the body as
//! its context. Nothing is shared between requests apart from the engine and
//! the output store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::engine::Engine;
use crate::error::PipelineError;
use crate::io::OutputStore;
use crate::models::{PipelineContext, StageInputs, StageKind, StageOutput};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::stages::StageSpec;

pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub store: OutputStore,
}

impl AppState {
    pub fn new(engine: Arc<dyn Engine>, store: OutputStore) -> Arc<Self> {
        Arc::new(Self { engine, store })
    }
}

#[derive(Debug, Deserialize)]
pub struct BasicInput {
    pub user_requirements: String,
    pub project_context: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RequirementInput {
    pub user_requirements: String,
    pub project_context: String,
    pub title: String,
    #[serde(default)]
    pub knowledge_output: Option<StageOutput>,
}

#[derive(Debug, Deserialize)]
pub struct ArchitectureInput {
    pub user_requirements: String,
    pub project_context: String,
    pub title: String,
    #[serde(default)]
    pub requirement_output: Option<StageOutput>,
    #[serde(default)]
    pub knowledge_output: Option<StageOutput>,
    #[serde(default)]
    pub tech_stack: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SkeletonInput {
    pub architecture_output: StageOutput,
    pub project_context: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeGenInput {
    pub architecture_output: StageOutput,
    pub skeleton_output: StageOutput,
    pub project_context: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidationInput {
    pub task_name: String,
    pub modified_output: Value,
}

/// Failure reported as `{"detail": "..."}`
///
/// Pipeline errors are 500; malformed request bodies keep the status the
/// JSON extractor assigned (400, 415 or 422).
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed ({}): {}", self.status, self.detail);
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;
type Body<T> = std::result::Result<Json<T>, JsonRejection>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agent/knowledge", post(knowledge))
        .route("/agent/requirements", post(requirements))
        .route("/agent/architecture", post(architecture))
        .route("/agent/skeleton", post(skeleton))
        .route("/agent/codegen", post(codegen))
        .route("/agent/validate", post(validate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "sdlc-crew listening");
    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Run one built-in stage for a request
async fn run_single_stage(
    state: &AppState,
    kind: StageKind,
    title: String,
    inputs: StageInputs,
    context: PipelineContext,
) -> ApiResult<StageOutput> {
    info!("HTTP request for {} stage, title {:?}", kind, title);
    let mut pipeline = Pipeline::new(
        state.engine.clone(),
        state.store.clone(),
        PipelineConfig::new(title),
    );
    let output = pipeline
        .run_stage(&StageSpec::builtin(kind), &inputs, &context)
        .await?;
    Ok(Json(output))
}

fn context_from(
    outputs: impl IntoIterator<Item = (StageKind, Option<StageOutput>)>,
) -> PipelineContext {
    let mut context = PipelineContext::new();
    for (kind, output) in outputs {
        if let Some(output) = output {
            context.insert(kind, output);
        }
    }
    context
}

async fn knowledge(
    State(state): State<Arc<AppState>>,
    body: Body<BasicInput>,
) -> ApiResult<StageOutput> {
    let Json(input) = body?;
    let inputs = StageInputs::new(input.user_requirements, input.project_context);
    run_single_stage(
        &state,
        StageKind::Knowledge,
        input.title,
        inputs,
        PipelineContext::new(),
    )
    .await
}

async fn requirements(
    State(state): State<Arc<AppState>>,
    body: Body<RequirementInput>,
) -> ApiResult<StageOutput> {
    let Json(input) = body?;
    let inputs = StageInputs::new(input.user_requirements, input.project_context);
    let context = context_from([(StageKind::Knowledge, input.knowledge_output)]);
    run_single_stage(&state, StageKind::Requirements, input.title, inputs, context).await
}

async fn architecture(
    State(state): State<Arc<AppState>>,
    body: Body<ArchitectureInput>,
) -> ApiResult<StageOutput> {
    let Json(input) = body?;
    let mut inputs = StageInputs::new(input.user_requirements, input.project_context);
    inputs.tech_stack = input.tech_stack.filter(|t| !t.trim().is_empty());
    let context = context_from([
        (StageKind::Knowledge, input.knowledge_output),
        (StageKind::Requirements, input.requirement_output),
    ]);
    run_single_stage(&state, StageKind::Architecture, input.title, inputs, context).await
}

async fn skeleton(
    State(state): State<Arc<AppState>>,
    body: Body<SkeletonInput>,
) -> ApiResult<StageOutput> {
    let Json(input) = body?;
    let inputs = StageInputs::new("", input.project_context);
    let context = context_from([(StageKind::Architecture, Some(input.architecture_output))]);
    run_single_stage(&state, StageKind::Skeletons, input.title, inputs, context).await
}

async fn codegen(
    State(state): State<Arc<AppState>>,
    body: Body<CodeGenInput>,
) -> ApiResult<StageOutput> {
    let Json(input) = body?;
    let inputs = StageInputs::new("", input.project_context);
    let context = context_from([
        (StageKind::Architecture, Some(input.architecture_output)),
        (StageKind::Skeletons, Some(input.skeleton_output)),
    ]);
    run_single_stage(&state, StageKind::Generator, input.title, inputs, context).await
}

async fn validate(
    State(state): State<Arc<AppState>>,
    body: Body<ValidationInput>,
) -> ApiResult<Value> {
    let Json(input) = body?;
    state
        .store
        .save_validation(&input.task_name, &input.modified_output)?;
    Ok(Json(json!({
        "message": format!("Output for {} validated successfully", input.task_name)
    })))
}
