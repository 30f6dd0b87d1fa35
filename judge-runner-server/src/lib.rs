use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use judge_runner::{
    CodeExecutionService, ExecutionRequest, ExecutionResult, ExecutionStatus, JudgeReport,
    JudgeRequest, RunnerConfig,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Execution(#[from] judge_runner::Error),
    #[error("Server error: {0}")]
    Server(String),
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Execution(judge_runner::Error::RateLimited { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ServerError::Execution(judge_runner::Error::Overloaded) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Execution(e) => match e.status() {
                ExecutionStatus::ValidationError | ExecutionStatus::UnsupportedLanguage => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            ServerError::Execution(judge_runner::Error::RateLimited { retry_after }) => {
                Some(retry_after.as_secs().max(1))
            }
            _ => None,
        };

        let body = match self {
            ServerError::Execution(e) => {
                if status.is_server_error() {
                    error!("Request failed: {}", e);
                }
                Json(json!({ "error": e.to_string(), "status": e.status() }))
            }
            ServerError::Server(message) => {
                error!("Server error: {}", message);
                Json(json!({ "error": "Internal server error" }))
            }
        };

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<CodeExecutionService>,
}

/// Build the router around a service configured from `config`.
pub fn create_app(config: RunnerConfig) -> Result<Router, ServerError> {
    let service = CodeExecutionService::new(config)?;
    Ok(router(service))
}

pub fn router(service: CodeExecutionService) -> Router {
    let state = AppState {
        service: Arc::new(service),
    };

    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute))
        .route("/judge", post(judge))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting judge runner server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "availableSlots": state.service.available_slots(),
    }))
}

async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> Result<Json<ExecutionResult>, ServerError> {
    let result = state.service.execute(request).await.inspect_err(|e| {
        if matches!(e, judge_runner::Error::Overloaded) {
            warn!("Rejecting request, no execution slot available");
        }
    })?;
    Ok(Json(result))
}

async fn judge(
    State(state): State<AppState>,
    Json(request): Json<JudgeRequest>,
) -> Result<Json<JudgeReport>, ServerError> {
    let report = state.service.judge(request).await?;
    Ok(Json(report))
}
