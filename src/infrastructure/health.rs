//! Health monitor: periodic probing of every registered module
//!
//! One independent task per module, so a slow probe against one service
//! never delays another's schedule. Probing runs apart from the request
//! path; the router only ever reads the last-known status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::HealthConfig;
use crate::domain::module::{Module, ProbeOutcome};
use crate::infrastructure::forwarder::module_url;
use crate::infrastructure::registry::ModuleRegistry;

/// Probe transport seam, mockable in tests
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Issue one probe. `Ok` means the module answered with a success
    /// status inside the timeout.
    async fn probe(&self, module: &Module, timeout: Duration) -> Result<(), ProbeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("connection failed: {message}")]
    Connection { message: String },
    #[error("non-success response: {status}")]
    BadStatus { status: u16 },
}

/// Reqwest-backed health probe (GET on the module's health endpoint)
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, module: &Module, timeout: Duration) -> Result<(), ProbeError> {
        let url = module_url(&module.base_address, &module.health_endpoint_path);
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout
                } else {
                    ProbeError::Connection {
                        message: e.to_string(),
                    }
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::BadStatus {
                status: response.status().as_u16(),
            })
        }
    }
}

/// Drives module status through the registry
pub struct HealthMonitor {
    registry: Arc<ModuleRegistry>,
    probe: Arc<dyn HealthProbe>,
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ModuleRegistry>, probe: Arc<dyn HealthProbe>, config: HealthConfig) -> Self {
        Self {
            registry,
            probe,
            config,
        }
    }

    /// Spawn one probe loop per registered module. Loops stop when the
    /// shutdown token fires; the registry keeps its last-known state.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) {
        for module in self.registry.list() {
            let monitor = self.clone();
            let token = shutdown.clone();
            let name = module.name;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(monitor.config.probe_interval());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => {
                            tracing::debug!(module = %name, "health monitor stopping");
                            break;
                        }
                        _ = interval.tick() => {
                            monitor.probe_once(&name).await;
                        }
                    }
                }
            });
        }
    }

    /// Probe one module and record the outcome
    pub async fn probe_once(&self, name: &str) {
        let Some(module) = self.registry.get(name) else {
            return;
        };

        let started = Instant::now();
        let outcome = match self.probe.probe(&module, self.config.probe_timeout()).await {
            Ok(()) => ProbeOutcome::Success {
                latency: started.elapsed(),
            },
            Err(ProbeError::Timeout) => ProbeOutcome::Failure { latency: None },
            Err(error) => {
                tracing::debug!(module = %name, error = %error, "health probe failed");
                ProbeOutcome::Failure {
                    latency: Some(started.elapsed()),
                }
            }
        };

        if let Some((previous, current)) = self.registry.record_probe(name, outcome) {
            if previous != current {
                match current {
                    crate::domain::module::ModuleStatus::Online => {
                        tracing::info!(module = %name, from = %previous, "module recovered");
                    }
                    status => {
                        tracing::warn!(module = %name, from = %previous, to = %status, "module health changed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::module::ModuleStatus;
    use parking_lot::Mutex;

    /// Scripted probe results, one per call; repeats the last entry
    struct ScriptedProbe {
        script: Mutex<Vec<bool>>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<bool>) -> Self {
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedProbe {
        async fn probe(&self, _module: &Module, _timeout: Duration) -> Result<(), ProbeError> {
            let mut script = self.script.lock();
            let up = if script.len() > 1 {
                script.remove(0)
            } else {
                *script.first().unwrap_or(&false)
            };
            if up {
                Ok(())
            } else {
                Err(ProbeError::Connection {
                    message: "refused".to_string(),
                })
            }
        }
    }

    fn monitor(script: Vec<bool>) -> (Arc<HealthMonitor>, Arc<ModuleRegistry>) {
        let registry = Arc::new(ModuleRegistry::new());
        registry.register(Module::new(
            "data_analysis",
            "http://127.0.0.1:8050",
            "/health",
            Duration::from_secs(10),
        ));
        let monitor = Arc::new(HealthMonitor::new(
            registry.clone(),
            Arc::new(ScriptedProbe::new(script)),
            HealthConfig::default(),
        ));
        (monitor, registry)
    }

    #[tokio::test]
    async fn three_failed_probes_take_module_offline() {
        let (monitor, registry) = monitor(vec![false]);
        for _ in 0..3 {
            monitor.probe_once("data_analysis").await;
        }
        let module = registry.get("data_analysis").expect("module");
        assert_eq!(module.status, ModuleStatus::Offline);
        assert_eq!(module.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn recovery_resets_failures_and_goes_online() {
        let (monitor, registry) = monitor(vec![false, false, false, true]);
        for _ in 0..4 {
            monitor.probe_once("data_analysis").await;
        }
        let module = registry.get("data_analysis").expect("module");
        assert_eq!(module.status, ModuleStatus::Online);
        assert_eq!(module.consecutive_failures, 0);
        assert!(module.last_latency.is_some());
        assert!(module.last_checked_at.is_some());
    }

    #[tokio::test]
    async fn successful_probe_records_latency() {
        let (monitor, registry) = monitor(vec![true]);
        monitor.probe_once("data_analysis").await;
        let module = registry.get("data_analysis").expect("module");
        assert_eq!(module.status, ModuleStatus::Online);
        assert!(module.last_latency.is_some());
    }
}
