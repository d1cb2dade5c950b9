//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub health: HealthConfig,
    pub forwarding: ForwardingConfig,
    pub readiness: ReadinessConfig,
    pub audit: AuditConfig,
    pub routing: RoutingConfig,
    pub logging: LoggingConfig,
    /// Backing modules known at startup. The registry is seeded from this
    /// list and never grows at runtime.
    pub modules: Vec<ModuleConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Global request timeout in seconds applied at the HTTP layer.
    pub request_timeout_seconds: u64,
    /// Allowed CORS origins. Use ["*"] to mirror any origin (development only).
    pub allowed_origins: Vec<String>,
    /// Whether to expose interactive API docs (Swagger UI). Should be false in
    /// hardened production.
    pub enable_docs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
            allowed_origins: vec!["*".to_string()],
            enable_docs: true,
        }
    }
}

/// One backing module as declared in static configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Unique module name, used in routing and audit records
    pub name: String,
    /// Internal base address; never exposed to clients
    pub base_address: String,
    /// Path probed by the health monitor, relative to the base address
    pub health_endpoint_path: String,
    /// Upper bound for any forwarded request's deadline (in seconds)
    pub timeout_budget_seconds: u64,
}

impl ModuleConfig {
    pub fn timeout_budget(&self) -> Duration {
        Duration::from_secs(self.timeout_budget_seconds)
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds between consecutive probes of the same module
    pub probe_interval_seconds: u64,
    /// Per-probe timeout in seconds
    pub probe_timeout_seconds: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_seconds: 5,
            probe_timeout_seconds: 2,
        }
    }
}

impl HealthConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

/// Request forwarding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Default deadline for forwarded requests (in seconds), capped per
    /// module by its timeout budget
    pub default_deadline_seconds: u64,
    /// Backoff before the single permitted retry of an idempotent forward
    pub retry_backoff_ms: u64,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            default_deadline_seconds: 10,
            retry_backoff_ms: 200,
        }
    }
}

impl ForwardingConfig {
    pub fn default_deadline(&self) -> Duration {
        Duration::from_secs(self.default_deadline_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// File readiness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Extensions eligible for analysis (lowercase, without dot)
    pub allowed_extensions: Vec<String>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["csv", "xlsx", "xls", "json", "tsv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Number of audit records retained in memory
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Names binding gateway surfaces to registered modules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Module that serves the /api/files surface
    pub file_store_module: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            file_store_module: "file_store".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.health.validate()?;
        self.forwarding.validate()?;
        self.readiness.validate()?;

        if self.modules.is_empty() {
            return Err(ValidationError::modules(
                "At least one backing module must be configured",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            module.validate()?;
            if !seen.insert(module.name.as_str()) {
                return Err(ValidationError::modules(format!(
                    "Duplicate module name: {}",
                    module.name
                )));
            }
        }
        if !seen.contains(self.routing.file_store_module.as_str()) {
            return Err(ValidationError::modules(format!(
                "routing.file_store_module refers to unknown module: {}",
                self.routing.file_store_module
            )));
        }

        Ok(())
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
