//! File surface: forwarded store operations plus the local readiness views
//!
//! Reads and writes against the store body pass through the gateway
//! pipeline; the analyzable/info/stats views answer from the mirrored
//! tracker state and stay available while the store is down.

use axum::extract::{Query, RawQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::application::errors::GatewayError;
use crate::application::router::{GatewayRequest, RequestPayload};
use crate::domain::files::FileDescriptor;
use crate::domain::permissions::Capability;
use crate::presentation::controllers::{raw_response, reply_response, AppState};
use crate::presentation::extractors::AuthenticatedUser;
use crate::infrastructure::readiness::ReadinessStats;
use crate::presentation::models::{
    AnalyzableFilesDto, ApiEnvelope, FileDescriptorDto, FileEventDto,
};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

fn file_store_request(
    state: &AppState,
    user: crate::application::router::ActingUser,
    capability: Capability,
    payload: RequestPayload,
) -> GatewayRequest {
    GatewayRequest {
        user,
        capability,
        target_module: state.config.routing.file_store_module.clone(),
        payload,
        deadline: None,
    }
}

/// Full store listing, forwarded; the client query string passes through
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "Store listing in the success envelope"),
        (status = 403, description = "Caller lacks read_file"),
        (status = 503, description = "Store unreachable"),
        (status = 504, description = "Store deadline exceeded")
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RawQuery(query): RawQuery,
) -> Result<Response, GatewayError> {
    let path = match query {
        Some(query) => format!("api/files?{query}"),
        None => "api/files".to_string(),
    };
    let request = file_store_request(&state, user, Capability::ReadFile, RequestPayload::get(path));
    let reply = state.gateway.handle(request).await?;
    Ok(reply_response(reply))
}

/// Files currently eligible for analysis, from mirrored tracker state
#[utoipa::path(
    get,
    path = "/api/files/analyzable",
    tag = "files",
    responses(
        (status = 200, description = "Analyzable files", body = ApiEnvelope<AnalyzableFilesDto>),
        (status = 403, description = "Caller lacks read_file")
    )
)]
pub async fn analyzable_files(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ApiEnvelope<AnalyzableFilesDto>>, GatewayError> {
    state
        .gateway
        .authorize_local(&user, Capability::ReadFile, "file_readiness")?;

    let files: Vec<FileDescriptorDto> = state
        .tracker
        .list_analyzable()
        .into_iter()
        .map(|d| FileDescriptorDto::new(d, true))
        .collect();
    let count = files.len();
    Ok(Json(ApiEnvelope::new(AnalyzableFilesDto {
        files,
        count,
        supported_formats: state.tracker.policy().allowed_extensions(),
    })))
}

/// Descriptor for one tracked path, with the derived analyzable flag
#[utoipa::path(
    get,
    path = "/api/files/info",
    tag = "files",
    params(("path" = String, Query, description = "Store path of the file")),
    responses(
        (status = 200, description = "File descriptor", body = ApiEnvelope<FileDescriptorDto>),
        (status = 400, description = "Missing path parameter"),
        (status = 404, description = "Path is not tracked")
    )
)]
pub async fn file_info(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiEnvelope<FileDescriptorDto>>, GatewayError> {
    state
        .gateway
        .authorize_local(&user, Capability::ReadFile, "file_readiness")?;

    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GatewayError::validation("query parameter 'path' is required"))?;
    let (descriptor, analyzable) = state
        .tracker
        .describe(&path)
        .ok_or_else(|| GatewayError::not_found(format!("file {path}")))?;
    Ok(Json(ApiEnvelope::new(FileDescriptorDto::new(
        descriptor, analyzable,
    ))))
}

/// Aggregate counts over tracked files
#[utoipa::path(
    get,
    path = "/api/files/stats",
    tag = "files",
    responses(
        (status = 200, description = "Tracker statistics", body = ApiEnvelope<ReadinessStats>),
        (status = 403, description = "Caller lacks read_file")
    )
)]
pub async fn file_stats(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ApiEnvelope<ReadinessStats>>, GatewayError> {
    state
        .gateway
        .authorize_local(&user, Capability::ReadFile, "file_readiness")?;
    Ok(Json(ApiEnvelope::new(state.tracker.stats())))
}

/// File content, forwarded to the store and relayed verbatim. Content is
/// not wrapped in the JSON envelope; the store's content type passes
/// through with the bytes.
#[utoipa::path(
    get,
    path = "/api/files/download",
    tag = "files",
    params(("path" = String, Query, description = "Store path of the file")),
    responses(
        (status = 200, description = "File content, store content type"),
        (status = 400, description = "Missing path parameter"),
        (status = 403, description = "Caller lacks read_file"),
        (status = 503, description = "Store unreachable")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PathQuery>,
) -> Result<Response, GatewayError> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GatewayError::validation("query parameter 'path' is required"))?;
    let encoded = serde_urlencoded::to_string([("path", path.as_str())])
        .map_err(|e| GatewayError::validation(format!("invalid path parameter: {e}")))?;
    let request = file_store_request(
        &state,
        user,
        Capability::ReadFile,
        RequestPayload::get(format!("api/files/download?{encoded}")),
    );
    let reply = state.gateway.handle(request).await?;
    Ok(raw_response(reply))
}

/// Upload, forwarded to the store. A successful store response feeds the
/// tracker when it carries a recognizable descriptor; the store is the
/// source of truth either way and may re-notify.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Store response in the success envelope"),
        (status = 403, description = "Caller lacks write_file"),
        (status = 503, description = "Store unreachable")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let request = file_store_request(
        &state,
        user,
        Capability::WriteFile,
        RequestPayload::post("api/files", body, content_type),
    );
    let reply = state.gateway.handle(request).await?;

    match descriptor_from_store_body(&reply.body) {
        Some(descriptor) => state.tracker.on_uploaded(descriptor),
        None => tracing::debug!("store upload response carried no descriptor"),
    }
    Ok(reply_response(reply))
}

/// Delete, forwarded to the store; the mirrored entry goes with it
#[utoipa::path(
    delete,
    path = "/api/files",
    tag = "files",
    params(("path" = String, Query, description = "Store path of the file")),
    responses(
        (status = 200, description = "Store response in the success envelope"),
        (status = 400, description = "Missing path parameter"),
        (status = 403, description = "Caller lacks delete_file")
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PathQuery>,
) -> Result<Response, GatewayError> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GatewayError::validation("query parameter 'path' is required"))?;
    let encoded = serde_urlencoded::to_string([("path", path.as_str())])
        .map_err(|e| GatewayError::validation(format!("invalid path parameter: {e}")))?;
    let request = file_store_request(
        &state,
        user,
        Capability::DeleteFile,
        RequestPayload::delete(format!("api/files?{encoded}")),
    );
    let reply = state.gateway.handle(request).await?;

    state.tracker.on_removed(&path);
    Ok(reply_response(reply))
}

/// Store-originated notification of an upload or removal. Idempotent by
/// construction, so at-least-once delivery is safe.
#[utoipa::path(
    post,
    path = "/api/notifications/files",
    tag = "files",
    request_body = FileEventDto,
    responses(
        (status = 200, description = "Notification applied"),
        (status = 400, description = "Malformed notification"),
        (status = 403, description = "Caller lacks write_file")
    )
)]
pub async fn file_notification(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Bytes,
) -> Result<Json<ApiEnvelope<serde_json::Value>>, GatewayError> {
    state
        .gateway
        .authorize_local(&user, Capability::WriteFile, "file_readiness")?;

    let event: FileEventDto = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::validation(format!("malformed notification: {e}")))?;
    if event.path.is_empty() {
        return Err(GatewayError::validation("notification path must not be empty"));
    }

    match event.event.as_str() {
        "uploaded" => {
            let size_bytes = event
                .size_bytes
                .ok_or_else(|| GatewayError::validation("uploaded event requires size_bytes"))?;
            state.tracker.on_uploaded(FileDescriptor::new(
                event.path,
                size_bytes,
                event.checksum,
                event.uploaded_at.unwrap_or_else(Utc::now),
            ));
        }
        "removed" => state.tracker.on_removed(&event.path),
        other => {
            return Err(GatewayError::validation(format!(
                "unknown file event: {other}"
            )))
        }
    }
    Ok(Json(ApiEnvelope::new(
        serde_json::json!({"applied": true}),
    )))
}

/// Best-effort descriptor extraction from a store upload response. Looks at
/// the top level and one level under "result"/"file".
fn descriptor_from_store_body(body: &[u8]) -> Option<FileDescriptor> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let candidates = [Some(&value), value.get("result"), value.get("file")];
    for candidate in candidates.into_iter().flatten() {
        let Some(path) = candidate.get("path").and_then(|v| v.as_str()) else {
            continue;
        };
        let size_bytes = candidate
            .get("size_bytes")
            .or_else(|| candidate.get("size"))
            .and_then(|v| v.as_u64())?;
        let checksum = candidate
            .get("checksum")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());
        let uploaded_at = candidate
            .get("uploaded_at")
            .and_then(|v| v.as_str())
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|v| v.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        return Some(FileDescriptor::new(
            path.to_string(),
            size_bytes,
            checksum,
            uploaded_at,
        ));
    }
    None
}
