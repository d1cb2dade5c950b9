//! Application assembly

use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::application::audit::AuditLog;
use crate::application::router::GatewayRouter;
use crate::config::Config;
use crate::domain::files::ExtensionPolicy;
use crate::domain::module::Module;
use crate::domain::permissions::PermissionTable;
use crate::infrastructure::forwarder::HttpModuleClient;
use crate::infrastructure::health::{HealthMonitor, HttpHealthProbe};
use crate::infrastructure::readiness::FileReadinessTracker;
use crate::infrastructure::registry::ModuleRegistry;
use crate::presentation::controllers::AppState;
use crate::presentation::routes::create_router;

/// A running application: its router plus the token that stops the
/// background health monitor.
pub struct AppHandle {
    pub router: Router,
    pub shutdown: CancellationToken,
}

/// Build the shared state: registry seeded from configuration, tracker,
/// audit log, and the gateway pipeline over the given HTTP client.
pub fn build_state(config: Config, http: reqwest::Client) -> AppState {
    let config = Arc::new(config);

    let registry = Arc::new(ModuleRegistry::new());
    for module in &config.modules {
        registry.register(Module::new(
            &module.name,
            &module.base_address,
            &module.health_endpoint_path,
            module.timeout_budget(),
        ));
    }

    let tracker = Arc::new(FileReadinessTracker::new(ExtensionPolicy::new(
        config.readiness.allowed_extensions.clone(),
    )));
    let audit = Arc::new(AuditLog::new(config.audit.capacity));
    let gateway = Arc::new(GatewayRouter::new(
        PermissionTable::builtin(),
        registry.clone(),
        Arc::new(HttpModuleClient::new(http)),
        audit.clone(),
        config.forwarding.clone(),
    ));

    AppState {
        config,
        registry,
        tracker,
        audit,
        gateway,
    }
}

/// Assemble the full application and start the health monitor. Must run
/// inside a Tokio runtime.
pub fn create_app(config: Config) -> Result<AppHandle, reqwest::Error> {
    let http = reqwest::Client::builder().build()?;
    let state = build_state(config, http.clone());

    let shutdown = CancellationToken::new();
    let monitor = Arc::new(HealthMonitor::new(
        state.registry.clone(),
        Arc::new(HttpHealthProbe::new(http)),
        state.config.health.clone(),
    ));
    monitor.spawn(shutdown.clone());

    Ok(AppHandle {
        router: create_router(state),
        shutdown,
    })
}
