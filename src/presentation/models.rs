//! API request and response models
//!
//! Every response uses the uniform envelope: `{"result": ...}` on success
//! (plus `"warning"` when a degraded module served it), `{"error": {"kind",
//! "message"}}` on failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::audit::AuditRecord;
use crate::domain::files::FileDescriptor;
use crate::domain::module::{Module, ModuleStatus};

/// Success envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiEnvelope<T> {
    pub result: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn new(result: T) -> Self {
        Self {
            result,
            warning: None,
        }
    }

    pub fn with_warning(result: T, warning: Option<String>) -> Self {
        Self { result, warning }
    }
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Machine-readable error kind plus a human-readable reason
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Taxonomy tag (PermissionDenied, ModuleUnreachable, Timeout,
    /// NotFound, ValidationError, ModuleError, ConfigurationError)
    #[schema(example = "PermissionDenied")]
    pub kind: String,
    #[schema(example = "role reader is not granted delete_file")]
    pub message: String,
}

/// Registry snapshot entry
#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleStatusDto {
    #[schema(example = "file_store")]
    pub name: String,
    pub status: ModuleStatus,
    pub consecutive_failures: u32,
    /// Last observed probe latency in milliseconds
    pub last_latency_ms: Option<u64>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl From<Module> for ModuleStatusDto {
    fn from(module: Module) -> Self {
        Self {
            name: module.name,
            status: module.status,
            consecutive_failures: module.consecutive_failures,
            last_latency_ms: module.last_latency.map(|l| l.as_millis() as u64),
            last_checked_at: module.last_checked_at,
        }
    }
}

/// Aggregate system health
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemHealthDto {
    /// online when every module is Online, offline when every module is
    /// Offline, degraded otherwise
    #[schema(example = "degraded")]
    pub status: String,
    pub modules: Vec<ModuleStatusDto>,
}

impl SystemHealthDto {
    pub fn from_modules(modules: Vec<Module>) -> Self {
        let status = if modules.iter().all(|m| m.status == ModuleStatus::Online) {
            "online"
        } else if !modules.is_empty() && modules.iter().all(|m| m.status == ModuleStatus::Offline)
        {
            "offline"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            modules: modules.into_iter().map(ModuleStatusDto::from).collect(),
        }
    }
}

/// Gateway process liveness (not the aggregate module health)
#[derive(Debug, Serialize, ToSchema)]
pub struct LivenessDto {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// File descriptor as served to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct FileDescriptorDto {
    #[schema(example = "surveys/encuesta.csv")]
    pub path: String,
    #[schema(example = "csv")]
    pub extension: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub checksum: Option<String>,
    /// Derived on every read from the extension policy and integrity check
    pub analyzable: bool,
}

impl FileDescriptorDto {
    pub fn new(descriptor: FileDescriptor, analyzable: bool) -> Self {
        Self {
            path: descriptor.path,
            extension: descriptor.extension,
            size_bytes: descriptor.size_bytes,
            uploaded_at: descriptor.uploaded_at,
            checksum: descriptor.checksum,
            analyzable,
        }
    }
}

/// Analyzable-files listing
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzableFilesDto {
    pub files: Vec<FileDescriptorDto>,
    pub count: usize,
    pub supported_formats: Vec<String>,
}

/// Audit trail listing
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditTrailDto {
    pub records: Vec<AuditRecord>,
    pub count: usize,
}

/// File store notification, delivered at least once; duplicates are
/// absorbed by the tracker's idempotent semantics
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FileEventDto {
    /// "uploaded" or "removed"
    #[schema(example = "uploaded")]
    pub event: String,
    #[schema(example = "surveys/encuesta.csv")]
    pub path: String,
    pub size_bytes: Option<u64>,
    pub checksum: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}
