pub mod config;
pub mod export;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use voices_agents::{ChatAgent, ChatError, ChatSettings, ModelClient};
use voices_core::{ChatInput, SaveCommentInput};
use voices_observability::{AppMetrics, MetricsSnapshot};
use voices_storage::{seed_defaults, Store};

pub use config::AppConfig;
use export::{build_report, ExportError, ExportRequest, REPORT_DISPOSITION, XLSX_CONTENT_TYPE};

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ChatAgent<Store, ModelClient>>,
    pub metrics: Arc<AppMetrics>,
    pub store_backend: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    pipeline_mode: &'static str,
    store_backend: &'static str,
    completion_backend: &'static str,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    found_policy: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Internal(message) => {
                error!(error = %message, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::Chat(ChatError::Validation(inner)) => {
                (StatusCode::BAD_REQUEST, inner.to_string())
            }
            ApiError::Chat(ChatError::StoreUnavailable(inner)) => {
                error!(error = %inner, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store unavailable".to_string(),
                )
            }
            ApiError::Chat(ChatError::ModelCallFailed(inner)) => {
                (StatusCode::BAD_GATEWAY, inner.to_string())
            }
            ApiError::Export(inner) => {
                error!(error = %inner, "export failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to build report".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

pub async fn build_app(config: AppConfig) -> Result<Router> {
    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?,
        None => Store::memory(),
    };

    let model = match config.openai.clone() {
        Some(openai) => ModelClient::openai(openai).context("failed to build completion client")?,
        None => {
            warn!("OPENAI_API_KEY not set, using offline completion client");
            ModelClient::offline()
        }
    };

    build_app_with(config, store, model).await
}

/// Wires an app around an already constructed store and model client.
pub async fn build_app_with(config: AppConfig, store: Store, model: ModelClient) -> Result<Router> {
    if config.seed_data {
        seed_defaults(&store)
            .await
            .context("failed to seed policy and emotion data")?;
    }

    let metrics = AppMetrics::shared();
    let store_backend = store.backend_name();
    let agent = Arc::new(ChatAgent::new(
        Arc::new(store),
        Arc::new(model),
        config.keywords.clone(),
        ChatSettings {
            mode: config.mode,
            model: config.model.clone(),
            ..ChatSettings::default()
        },
        metrics.clone(),
    ));

    info!(
        store = store_backend,
        completion = agent.completion_backend(),
        mode = config.mode.as_str(),
        keywords = config.keywords.len(),
        "voices api configured"
    );

    let state = ApiState {
        agent,
        metrics,
        store_backend,
    };

    Ok(build_router(state, &config))
}

pub fn build_router(state: ApiState, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/save_comment", post(save_comment))
        .route("/api/export_excel", post(export_excel))
        .route("/api/emotions", get(emotions))
        .route("/api/posts", get(posts))
        .route("/api/posts/:post_id", delete(delete_post))
        .layer(build_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Hello, World!" }))
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        pipeline_mode: state.agent.settings().mode.as_str(),
        store_backend: state.store_backend,
        completion_backend: state.agent.completion_backend(),
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(payload))
}

async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    let text = request
        .message
        .ok_or_else(|| ApiError::BadRequest("missing required field: message".to_string()))?;

    let reply = state.agent.handle_chat(ChatInput { text }).await?;

    Ok(Json(ChatResponse {
        response: reply.response,
        found_policy: reply.found_policy,
    }))
}

async fn save_comment(
    State(state): State<ApiState>,
    payload: Result<Json<SaveCommentInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload.map_err(bad_json)?;
    let post = state.agent.save_comment(input).await?;

    Ok(Json(serde_json::json!({
        "message": "Comment saved successfully",
        "post_id": post.id,
    })))
}

async fn emotions(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let emotions = state.agent.list_emotions().await?;
    Ok(Json(serde_json::json!({ "emotions": emotions })))
}

async fn posts(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.agent.list_posts().await?;
    Ok(Json(serde_json::json!({ "posts": posts })))
}

async fn delete_post(
    State(state): State<ApiState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.agent.delete_post(post_id).await? {
        return Err(ApiError::NotFound(format!("post {post_id} not found")));
    }

    Ok(Json(serde_json::json!({ "message": "Post deleted" })))
}

async fn export_excel(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(bad_json)?;
    let rows = request.table_data.len();

    let bytes = tokio::task::spawn_blocking(move || build_report(&request))
        .await
        .map_err(|join_error| ApiError::Internal(format!("report task failed: {join_error}")))??;

    info!(rows, bytes = bytes.len(), "report exported");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, REPORT_DISPOSITION),
        ],
        bytes,
    )
        .into_response())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
