//! Gateway error taxonomy
//!
//! Every denial carries a stable machine-readable kind plus a
//! human-readable reason; no operation fails silently.

use crate::domain::permissions::Capability;

/// Failure of one gateway operation
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Capability absent for the acting role. Never retried automatically.
    #[error("role {role} is not granted {capability}")]
    PermissionDenied { role: String, capability: Capability },

    /// Target offline, or forwarding failed after the one permitted retry.
    #[error("module {module} is unreachable: {reason}")]
    ModuleUnreachable { module: String, reason: String },

    /// Deadline exceeded. The underlying call may still complete on the
    /// module side; the module owns idempotency for timed-out writes.
    #[error("request to module {module} exceeded its deadline of {deadline_ms}ms")]
    Timeout { module: String, deadline_ms: u64 },

    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Malformed request, rejected before any module contact
    #[error("invalid request: {message}")]
    Validation { message: String },

    /// Error reported by the module itself, wrapped with its name for
    /// traceability and passed through with the upstream status
    #[error("module {module} reported status {status}: {message}")]
    Module {
        module: String,
        status: u16,
        message: String,
    },

    /// Fatal at startup; at request time surfaced as NotFound/PermissionDenied
    /// instead of crashing the gateway
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Stable taxonomy tag used in the error envelope and audit records
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::PermissionDenied { .. } => "PermissionDenied",
            GatewayError::ModuleUnreachable { .. } => "ModuleUnreachable",
            GatewayError::Timeout { .. } => "Timeout",
            GatewayError::NotFound { .. } => "NotFound",
            GatewayError::Validation { .. } => "ValidationError",
            GatewayError::Module { .. } => "ModuleError",
            GatewayError::Configuration { .. } => "ConfigurationError",
        }
    }
}
