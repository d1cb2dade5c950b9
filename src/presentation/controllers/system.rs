//! Gateway liveness, aggregate health, and the audit trail

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::application::errors::GatewayError;
use crate::domain::permissions::Capability;
use crate::presentation::controllers::AppState;
use crate::presentation::extractors::AuthenticatedUser;
use crate::presentation::models::{ApiEnvelope, AuditTrailDto, LivenessDto, SystemHealthDto};

/// Gateway process liveness. Answers even when every module is down; the
/// aggregate module view lives at /api/system/health.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Gateway is alive", body = LivenessDto))
)]
pub async fn liveness() -> Json<LivenessDto> {
    Json(LivenessDto {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Aggregate health over every registered module, from cached probe state
#[utoipa::path(
    get,
    path = "/api/system/health",
    tag = "system",
    responses((status = 200, description = "Aggregate system health", body = ApiEnvelope<SystemHealthDto>))
)]
pub async fn system_health(State(state): State<AppState>) -> Json<ApiEnvelope<SystemHealthDto>> {
    let health = SystemHealthDto::from_modules(state.registry.list());
    Json(ApiEnvelope::new(health))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Recent audit records, newest last
#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "system",
    params(("limit" = Option<usize>, Query, description = "Maximum records returned")),
    responses(
        (status = 200, description = "Recent audit records", body = ApiEnvelope<AuditTrailDto>),
        (status = 403, description = "Caller lacks manage_users")
    )
)]
pub async fn audit_trail(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiEnvelope<AuditTrailDto>>, GatewayError> {
    state
        .gateway
        .authorize_local(&user, Capability::ManageUsers, "audit")?;

    let records = state.audit.recent(query.limit.unwrap_or(100));
    let count = records.len();
    Ok(Json(ApiEnvelope::new(AuditTrailDto { records, count })))
}
