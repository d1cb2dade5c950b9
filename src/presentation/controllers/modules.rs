//! Module registry surface

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::application::errors::GatewayError;
use crate::application::router::{GatewayRequest, RequestPayload};
use crate::domain::permissions::Capability;
use crate::presentation::controllers::{reply_response, AppState};
use crate::presentation::extractors::AuthenticatedUser;
use crate::presentation::models::{ApiEnvelope, ModuleStatusDto};

/// Registry snapshot: every module with its last-known status
#[utoipa::path(
    get,
    path = "/api/modules",
    tag = "modules",
    responses((status = 200, description = "Registered modules", body = ApiEnvelope<Vec<ModuleStatusDto>>))
)]
pub async fn list_modules(
    State(state): State<AppState>,
) -> Json<ApiEnvelope<Vec<ModuleStatusDto>>> {
    let modules = state
        .registry
        .list()
        .into_iter()
        .map(ModuleStatusDto::from)
        .collect();
    Json(ApiEnvelope::new(modules))
}

/// Forward a restart order to a module's own restart hook
#[utoipa::path(
    post,
    path = "/api/modules/{name}/restart",
    tag = "modules",
    params(("name" = String, Path, description = "Registered module name")),
    responses(
        (status = 200, description = "Restart accepted by the module"),
        (status = 403, description = "Caller lacks manage_config"),
        (status = 404, description = "Unknown module"),
        (status = 503, description = "Module unreachable")
    )
)]
pub async fn restart_module(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<Response, GatewayError> {
    let reply = state
        .gateway
        .handle(GatewayRequest {
            user,
            capability: Capability::ManageConfig,
            target_module: name,
            payload: RequestPayload::post("api/restart", bytes::Bytes::new(), None),
            deadline: None,
        })
        .await?;
    Ok(reply_response(reply))
}
