//! HTTP controllers

pub mod files;
pub mod modules;
pub mod system;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::application::audit::AuditLog;
use crate::application::router::{GatewayReply, GatewayRouter};
use crate::config::Config;
use crate::infrastructure::readiness::FileReadinessTracker;
use crate::infrastructure::registry::ModuleRegistry;
use crate::presentation::models::ApiEnvelope;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ModuleRegistry>,
    pub tracker: Arc<FileReadinessTracker>,
    pub audit: Arc<AuditLog>,
    pub gateway: Arc<GatewayRouter>,
}

/// Wrap a forwarded module reply in the success envelope, keeping the
/// upstream status. Non-JSON bodies are carried as a string result.
pub(crate) fn reply_response(reply: GatewayReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    let result = serde_json::from_slice::<serde_json::Value>(&reply.body).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(&reply.body).into_owned())
    });
    let envelope = ApiEnvelope::with_warning(result, reply.warning);
    (status, Json(envelope)).into_response()
}

/// Relay a forwarded reply verbatim: upstream status, content type, and
/// body untouched. Used for file content, which is not a JSON API result.
pub(crate) fn raw_response(reply: GatewayReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    let mut response = (status, reply.body).into_response();
    if let Some(content_type) = reply.content_type.and_then(|v| v.parse().ok()) {
        response
            .headers_mut()
            .insert(axum::http::header::CONTENT_TYPE, content_type);
    }
    response
}
