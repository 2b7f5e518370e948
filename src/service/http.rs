//! HTTP surface: `POST /predict`, `GET /health` and JSON error bodies.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{InvalidHeaderValue, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::error::RequestError;
use crate::service::{InferenceService, PredictRequest, PredictResponse, UnhealthyReport};

const INTERNAL_ERROR: &str = "Internal server error";

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::InvalidBody | RequestError::TextRequired | RequestError::TextTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            RequestError::Vectorize(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            RequestError::Vectorize(_) | RequestError::Model(_) | RequestError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        // server-side details stay in the log
        if status.is_server_error() {
            error_body(status, INTERNAL_ERROR)
        } else {
            error_body(status, &self.to_string())
        }
    }
}

/// CORS for the browser client: listed origins, GET/POST, JSON bodies, credentials.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}

pub fn router(service: Arc<InferenceService>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/predict", post(predict).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn predict(
    State(service): State<Arc<InferenceService>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, RequestError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(stage = "validate", %rejection, "unreadable request body");
        RequestError::InvalidBody
    })?;
    let response = tokio::task::spawn_blocking(move || service.predict(request))
        .await
        .map_err(|e| {
            error!(stage = "predict", error = %e, "inference task failed");
            RequestError::Internal
        })??;
    Ok(Json(response))
}

async fn health(State(service): State<Arc<InferenceService>>) -> Response {
    match tokio::task::spawn_blocking(move || service.health()).await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(report)) => (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response(),
        Err(e) => {
            error!(stage = "health", error = %e, "health task failed");
            let report = UnhealthyReport { status: "unhealthy", error: INTERNAL_ERROR.to_string() };
            (StatusCode::SERVICE_UNAVAILABLE, Json(report)).into_response()
        }
    }
}

async fn not_found() -> Response {
    error_body(StatusCode::NOT_FOUND, "Endpoint not found")
}

async fn method_not_allowed() -> Response {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn handle_panic(_payload: Box<dyn Any + Send + 'static>) -> Response {
    error!("handler panicked");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
}

/// Serve `app` on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "could not install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
