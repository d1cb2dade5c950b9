//! Configuration validation module

use crate::config::{ForwardingConfig, HealthConfig, ModuleConfig, ReadinessConfig, ServerConfig};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Health configuration error: {message}")]
    Health { message: String },

    #[error("Forwarding configuration error: {message}")]
    Forwarding { message: String },

    #[error("Readiness configuration error: {message}")]
    Readiness { message: String },

    #[error("Module configuration error: {message}")]
    Modules { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn health(message: impl Into<String>) -> Self {
        Self::Health {
            message: message.into(),
        }
    }

    pub fn forwarding(message: impl Into<String>) -> Self {
        Self::Forwarding {
            message: message.into(),
        }
    }

    pub fn readiness(message: impl Into<String>) -> Self {
        Self::Readiness {
            message: message.into(),
        }
    }

    pub fn modules(message: impl Into<String>) -> Self {
        Self::Modules {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // u16 cannot exceed 65535, so only zero needs rejecting
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for HealthConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.probe_interval_seconds == 0 {
            return Err(ValidationError::health(
                "Probe interval must be greater than 0",
            ));
        }
        if self.probe_timeout_seconds == 0 {
            return Err(ValidationError::health(
                "Probe timeout must be greater than 0",
            ));
        }
        if self.probe_timeout_seconds >= self.probe_interval_seconds {
            return Err(ValidationError::health(
                "Probe timeout must be shorter than the probe interval",
            ));
        }
        Ok(())
    }
}

impl Validate for ForwardingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.default_deadline_seconds == 0 {
            return Err(ValidationError::forwarding(
                "Default deadline must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Validate for ReadinessConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.allowed_extensions.is_empty() {
            return Err(ValidationError::readiness(
                "At least one analyzable extension must be configured",
            ));
        }
        for ext in &self.allowed_extensions {
            if ext.is_empty() || ext.starts_with('.') {
                return Err(ValidationError::readiness(format!(
                    "Extensions must be non-empty and without leading dot, got {:?}",
                    ext
                )));
            }
        }
        Ok(())
    }
}

impl Validate for ModuleConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::modules("Module name cannot be empty"));
        }
        if !self.base_address.starts_with("http://") && !self.base_address.starts_with("https://") {
            return Err(ValidationError::modules(format!(
                "Module {} base_address must be an http(s) URL, got {}",
                self.name, self.base_address
            )));
        }
        if self.timeout_budget_seconds == 0 {
            return Err(ValidationError::modules(format!(
                "Module {} timeout budget must be greater than 0",
                self.name
            )));
        }
        Ok(())
    }
}
