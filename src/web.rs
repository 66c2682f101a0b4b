//! The web demo: an HTML page with two text fields and a JSON endpoint that
//! runs the classifier.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::args::DeployMode;
use crate::error::{Error, Result};
use crate::inference::{Inference, InferenceResult};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    inference: Arc<dyn Inference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRequest {
    pub premise: String,
    pub hypothesis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Inference failure reported to the browser as a 500.
pub struct ApiError(Error);

impl<E> From<E> for ApiError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("inference failed: {}", self.0);
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Builds the demo around `inference`.
pub fn app(inference: Arc<dyn Inference>, mode: DeployMode) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/api", post(classify))
        .route("/health", get(health))
        .with_state(AppState { inference });
    match mode {
        DeployMode::Local => router.layer(cors()),
        DeployMode::Public => router,
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Serves `router` on `addr` until the process is stopped.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("web demo listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn classify(
    State(state): State<AppState>,
    Json(request): Json<PairRequest>,
) -> std::result::Result<Json<InferenceResult>, ApiError> {
    tracing::debug!(premise = %request.premise, hypothesis = %request.hypothesis, "classify");
    let inference = Arc::clone(&state.inference);
    let result = tokio::task::spawn_blocking(move || {
        inference.infer(&request.premise, &request.hypothesis)
    })
    .await??;
    Ok(Json(result))
}
