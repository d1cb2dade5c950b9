//! Error mapping and request logging

use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::application::errors::GatewayError;
use crate::presentation::models::{ErrorBody, ErrorEnvelope};

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            GatewayError::ModuleUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
            // Module-reported errors keep the upstream status
            GatewayError::Module { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "gateway request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "gateway request rejected");
        }

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                kind: self.kind().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(envelope)).into_response()
    }
}

/// Per-request access log with a generated request id and latency. The id
/// is echoed back in the `x-request-id` response header.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_millis();
    let status = response.status();
    if status.is_server_error() {
        tracing::error!(%request_id, %method, %path, %status, elapsed_ms, "request");
    } else {
        tracing::info!(%request_id, %method, %path, %status, elapsed_ms, "request");
    }
    if let Ok(value) = request_id.to_string().parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
