//! Gateway router: the pipeline every client operation passes through
//!
//! Steps, in order, each a hard gate: authorization, availability,
//! forwarding, result translation. The first failure short-circuits.
//! Every handled request emits one audit record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::Method;
use bytes::Bytes;
use chrono::Utc;

use crate::application::audit::{AuditLog, AuditRecord};
use crate::application::errors::GatewayError;
use crate::config::ForwardingConfig;
use crate::domain::module::{Module, ModuleStatus};
use crate::domain::permissions::{Capability, PermissionTable, Role};
use crate::infrastructure::registry::ModuleRegistry;

/// The acting user attached to one request. Role is `None` when the caller
/// presented no role or an unrecognized one; such callers hold no
/// capabilities.
#[derive(Debug, Clone)]
pub struct ActingUser {
    pub user_id: String,
    pub role: Option<Role>,
}

impl ActingUser {
    pub fn role_label(&self) -> String {
        match self.role {
            Some(role) => role.to_string(),
            None => "none".to_string(),
        }
    }
}

/// HTTP payload forwarded to a module, address-agnostic: the subpath is
/// resolved against the module's internal base address, which is never
/// exposed to the client.
#[derive(Debug, Clone)]
pub struct RequestPayload {
    pub method: Method,
    /// Path on the module, including any query string
    pub path: String,
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl RequestPayload {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: Bytes::new(),
            content_type: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Bytes, content_type: Option<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body,
            content_type,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: Bytes::new(),
            content_type: None,
        }
    }
}

/// Response received from a module
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: u16,
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl ForwardedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level forwarding failure
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("transport failure: {message}")]
    Transport { message: String },
}

/// Transport seam between the router and the backing modules
#[async_trait]
pub trait ModuleClient: Send + Sync {
    async fn forward(
        &self,
        module: &Module,
        payload: &RequestPayload,
        deadline: Duration,
    ) -> Result<ForwardedResponse, ForwardError>;
}

/// One gateway operation; exists only for the duration of the request
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub user: ActingUser,
    pub capability: Capability,
    pub target_module: String,
    pub payload: RequestPayload,
    /// Caller deadline; defaults from configuration and is always capped by
    /// the module's timeout budget
    pub deadline: Option<Duration>,
}

/// Successful gateway outcome: the module's response passed through
/// unchanged, with a warning when it was served by a degraded module
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: u16,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub warning: Option<String>,
}

/// The gateway router
pub struct GatewayRouter {
    permissions: PermissionTable,
    registry: Arc<ModuleRegistry>,
    client: Arc<dyn ModuleClient>,
    audit: Arc<AuditLog>,
    forwarding: ForwardingConfig,
}

impl GatewayRouter {
    pub fn new(
        permissions: PermissionTable,
        registry: Arc<ModuleRegistry>,
        client: Arc<dyn ModuleClient>,
        audit: Arc<AuditLog>,
        forwarding: ForwardingConfig,
    ) -> Self {
        Self {
            permissions,
            registry,
            client,
            audit,
            forwarding,
        }
    }

    /// Handle one request end to end, recording the outcome in the audit
    /// trail regardless of how it resolves.
    pub async fn handle(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError> {
        let result = self.dispatch(&request).await;
        self.record(
            &request.user,
            request.capability,
            &request.target_module,
            match &result {
                Ok(_) => "ok".to_string(),
                Err(e) => e.kind().to_string(),
            },
        );
        result
    }

    /// Authorize a local (non-forwarded) operation such as reading the
    /// readiness list or the audit trail, with the same audit side effect.
    pub fn authorize_local(
        &self,
        user: &ActingUser,
        capability: Capability,
        target: &str,
    ) -> Result<(), GatewayError> {
        let result = self.check_permission(user, capability);
        self.record(
            user,
            capability,
            target,
            match &result {
                Ok(()) => "ok".to_string(),
                Err(e) => e.kind().to_string(),
            },
        );
        result
    }

    fn record(&self, user: &ActingUser, capability: Capability, target: &str, outcome: String) {
        self.audit.record(AuditRecord {
            user_id: user.user_id.clone(),
            role: user.role_label(),
            capability,
            target_module: target.to_string(),
            outcome,
            timestamp: Utc::now(),
        });
    }

    fn check_permission(
        &self,
        user: &ActingUser,
        capability: Capability,
    ) -> Result<(), GatewayError> {
        let allowed = user
            .role
            .map(|role| self.permissions.authorize(role, capability))
            .unwrap_or(false);
        if allowed {
            Ok(())
        } else {
            Err(GatewayError::PermissionDenied {
                role: user.role_label(),
                capability,
            })
        }
    }

    async fn dispatch(&self, request: &GatewayRequest) -> Result<GatewayReply, GatewayError> {
        // Gate 1: authorization. Denial means no module is ever contacted.
        self.check_permission(&request.user, request.capability)?;

        // Gate 2: availability, from cached health state only. The monitor
        // owns probing; the router never probes synchronously.
        let module = self
            .registry
            .get(&request.target_module)
            .ok_or_else(|| GatewayError::not_found(format!("module {}", request.target_module)))?;

        let mut deadline = request
            .deadline
            .unwrap_or_else(|| self.forwarding.default_deadline())
            .min(module.timeout_budget);
        let mut warning = None;

        match module.status {
            ModuleStatus::Offline => {
                // Fail fast: no network contact for a module declared down
                return Err(GatewayError::ModuleUnreachable {
                    module: module.name.clone(),
                    reason: "marked offline by the health monitor".to_string(),
                });
            }
            ModuleStatus::Degraded => {
                deadline /= 2;
                warning = Some(format!("module {} is degraded", module.name));
            }
            ModuleStatus::Online | ModuleStatus::Unknown => {}
        }

        // Gate 3: forwarding, with one retry for idempotent reads only
        let response = self
            .forward_with_retry(&module, &request.payload, request.capability, deadline)
            .await?;

        // Gate 4: result translation. Success passes through unchanged;
        // module-reported errors are wrapped with the module's name.
        if response.is_success() {
            Ok(GatewayReply {
                status: response.status,
                body: response.body,
                content_type: response.content_type,
                warning,
            })
        } else {
            Err(GatewayError::Module {
                module: module.name.clone(),
                status: response.status,
                message: upstream_error_message(&response),
            })
        }
    }

    async fn forward_with_retry(
        &self,
        module: &Module,
        payload: &RequestPayload,
        capability: Capability,
        deadline: Duration,
    ) -> Result<ForwardedResponse, GatewayError> {
        let started = Instant::now();
        match self.client.forward(module, payload, deadline).await {
            Ok(response) => Ok(response),
            Err(ForwardError::DeadlineExceeded) => Err(GatewayError::Timeout {
                module: module.name.clone(),
                deadline_ms: deadline.as_millis() as u64,
            }),
            Err(ForwardError::Transport { message }) if capability.is_idempotent() => {
                // The caller's deadline bounds both attempts together: the
                // retry runs only on whatever budget the first attempt and
                // the backoff leave over.
                let spent = started.elapsed() + self.forwarding.retry_backoff();
                let Some(remaining) = deadline.checked_sub(spent).filter(|d| !d.is_zero())
                else {
                    return Err(GatewayError::ModuleUnreachable {
                        module: module.name.clone(),
                        reason: format!("{message} (no deadline budget left to retry)"),
                    });
                };
                tracing::debug!(
                    module = %module.name,
                    backoff_ms = self.forwarding.retry_backoff_ms,
                    remaining_ms = remaining.as_millis() as u64,
                    error = %message,
                    "retrying idempotent forward after transport failure"
                );
                tokio::time::sleep(self.forwarding.retry_backoff()).await;
                match self.client.forward(module, payload, remaining).await {
                    Ok(response) => Ok(response),
                    Err(ForwardError::DeadlineExceeded) => Err(GatewayError::Timeout {
                        module: module.name.clone(),
                        deadline_ms: deadline.as_millis() as u64,
                    }),
                    Err(ForwardError::Transport { message }) => {
                        Err(GatewayError::ModuleUnreachable {
                            module: module.name.clone(),
                            reason: message,
                        })
                    }
                }
            }
            Err(ForwardError::Transport { message }) => Err(GatewayError::ModuleUnreachable {
                module: module.name.clone(),
                reason: message,
            }),
        }
    }
}

/// Best-effort extraction of an error message from a module response body
fn upstream_error_message(response: &ForwardedResponse) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let text = String::from_utf8_lossy(&response.body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "upstream error with empty body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::module::ProbeOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock transport that counts attempts and replays scripted results
    struct MockClient {
        attempts: AtomicUsize,
        results: parking_lot::Mutex<Vec<Result<ForwardedResponse, ForwardError>>>,
    }

    impl MockClient {
        fn new(results: Vec<Result<ForwardedResponse, ForwardError>>) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                results: parking_lot::Mutex::new(results),
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn ok_response() -> ForwardedResponse {
            ForwardedResponse {
                status: 200,
                body: Bytes::from_static(b"{\"ok\":true}"),
                content_type: Some("application/json".to_string()),
            }
        }
    }

    #[async_trait]
    impl ModuleClient for MockClient {
        async fn forward(
            &self,
            _module: &Module,
            _payload: &RequestPayload,
            _deadline: Duration,
        ) -> Result<ForwardedResponse, ForwardError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock();
            if results.is_empty() {
                Ok(Self::ok_response())
            } else {
                results.remove(0)
            }
        }
    }

    fn harness(
        client: Arc<MockClient>,
    ) -> (GatewayRouter, Arc<ModuleRegistry>, Arc<AuditLog>) {
        let registry = Arc::new(ModuleRegistry::new());
        registry.register(Module::new(
            "file_store",
            "http://127.0.0.1:8060",
            "/api/status",
            Duration::from_secs(10),
        ));
        let audit = Arc::new(AuditLog::new(64));
        let router = GatewayRouter::new(
            PermissionTable::builtin(),
            registry.clone(),
            client,
            audit.clone(),
            ForwardingConfig {
                default_deadline_seconds: 10,
                retry_backoff_ms: 1,
            },
        );
        (router, registry, audit)
    }

    fn request(role: Option<Role>, capability: Capability) -> GatewayRequest {
        GatewayRequest {
            user: ActingUser {
                user_id: "u1".to_string(),
                role,
            },
            capability,
            target_module: "file_store".to_string(),
            payload: RequestPayload::get("api/files"),
            deadline: None,
        }
    }

    #[tokio::test]
    async fn denied_request_never_contacts_module() {
        let client = Arc::new(MockClient::new(vec![]));
        let (router, _, audit) = harness(client.clone());

        let err = router
            .handle(request(Some(Role::Reader), Capability::DeleteFile))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PermissionDenied");
        assert_eq!(client.attempts(), 0);
        assert_eq!(audit.recent(10)[0].outcome, "PermissionDenied");
    }

    #[tokio::test]
    async fn unknown_role_is_denied_not_crashed() {
        let client = Arc::new(MockClient::new(vec![]));
        let (router, _, _) = harness(client.clone());

        let err = router
            .handle(request(None, Capability::ReadFile))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PermissionDenied");
        assert_eq!(client.attempts(), 0);
    }

    #[tokio::test]
    async fn offline_module_fails_fast_without_forwarding() {
        let client = Arc::new(MockClient::new(vec![]));
        let (router, registry, _) = harness(client.clone());
        for _ in 0..3 {
            registry.record_probe("file_store", ProbeOutcome::Failure { latency: None });
        }

        let err = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ModuleUnreachable");
        assert_eq!(client.attempts(), 0);
    }

    #[tokio::test]
    async fn degraded_module_is_forwarded_with_warning() {
        let client = Arc::new(MockClient::new(vec![]));
        let (router, registry, _) = harness(client.clone());
        registry.record_probe("file_store", ProbeOutcome::Failure { latency: None });

        let reply = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await
            .expect("degraded module still forwards");
        assert!(reply.warning.is_some());
        assert_eq!(client.attempts(), 1);
    }

    #[tokio::test]
    async fn unknown_module_is_not_found() {
        let client = Arc::new(MockClient::new(vec![]));
        let (router, _, _) = harness(client.clone());

        let mut req = request(Some(Role::Admin), Capability::ReadFile);
        req.target_module = "ghost".to_string();
        let err = router.handle(req).await.unwrap_err();
        assert_eq!(err.kind(), "NotFound");
        assert_eq!(client.attempts(), 0);
    }

    #[tokio::test]
    async fn idempotent_read_retries_once_after_transport_failure() {
        let client = Arc::new(MockClient::new(vec![
            Err(ForwardError::Transport {
                message: "connection reset".to_string(),
            }),
            Ok(MockClient::ok_response()),
        ]));
        let (router, _, _) = harness(client.clone());

        let reply = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await
            .expect("retry should recover");
        assert_eq!(reply.status, 200);
        assert_eq!(client.attempts(), 2);
    }

    #[tokio::test]
    async fn write_is_never_retried() {
        let client = Arc::new(MockClient::new(vec![
            Err(ForwardError::Transport {
                message: "connection reset".to_string(),
            }),
            Ok(MockClient::ok_response()),
        ]));
        let (router, _, _) = harness(client.clone());

        let mut req = request(Some(Role::Researcher), Capability::WriteFile);
        req.payload = RequestPayload::post("api/files", Bytes::from_static(b"{}"), None);
        let err = router.handle(req).await.unwrap_err();
        assert_eq!(err.kind(), "ModuleUnreachable");
        assert_eq!(client.attempts(), 1);
    }

    #[tokio::test]
    async fn retry_is_skipped_when_no_deadline_budget_remains() {
        let client = Arc::new(MockClient::new(vec![
            Err(ForwardError::Transport {
                message: "connection reset".to_string(),
            }),
            Ok(MockClient::ok_response()),
        ]));
        let registry = Arc::new(ModuleRegistry::new());
        registry.register(Module::new(
            "file_store",
            "http://127.0.0.1:8060",
            "/api/status",
            Duration::from_secs(10),
        ));
        let router = GatewayRouter::new(
            PermissionTable::builtin(),
            registry,
            client.clone(),
            Arc::new(AuditLog::new(64)),
            // backoff alone outspends the caller's deadline below
            ForwardingConfig {
                default_deadline_seconds: 10,
                retry_backoff_ms: 50,
            },
        );

        let mut req = request(Some(Role::Reader), Capability::ReadFile);
        req.deadline = Some(Duration::from_millis(5));
        let err = router.handle(req).await.unwrap_err();
        assert_eq!(err.kind(), "ModuleUnreachable");
        assert_eq!(client.attempts(), 1);
    }

    #[tokio::test]
    async fn exhausted_retry_reports_unreachable() {
        let client = Arc::new(MockClient::new(vec![
            Err(ForwardError::Transport {
                message: "refused".to_string(),
            }),
            Err(ForwardError::Transport {
                message: "refused".to_string(),
            }),
        ]));
        let (router, _, _) = harness(client.clone());

        let err = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ModuleUnreachable");
        assert_eq!(client.attempts(), 2);
    }

    #[tokio::test]
    async fn deadline_exceeded_maps_to_timeout_without_retry() {
        let client = Arc::new(MockClient::new(vec![Err(ForwardError::DeadlineExceeded)]));
        let (router, _, _) = harness(client.clone());

        let err = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "Timeout");
        assert_eq!(client.attempts(), 1);
    }

    #[tokio::test]
    async fn module_error_is_wrapped_with_module_name() {
        let client = Arc::new(MockClient::new(vec![Ok(ForwardedResponse {
            status: 500,
            body: Bytes::from_static(b"{\"error\":\"disk full\"}"),
            content_type: Some("application/json".to_string()),
        })]));
        let (router, _, _) = harness(client.clone());

        let err = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await
            .unwrap_err();
        match err {
            GatewayError::Module {
                module,
                status,
                message,
            } => {
                assert_eq!(module, "file_store");
                assert_eq!(status, 500);
                assert_eq!(message, "disk full");
            }
            other => panic!("expected Module error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn every_handled_request_is_audited() {
        let client = Arc::new(MockClient::new(vec![]));
        let (router, _, audit) = harness(client.clone());

        let _ = router
            .handle(request(Some(Role::Reader), Capability::ReadFile))
            .await;
        let _ = router
            .handle(request(Some(Role::Reader), Capability::DeleteFile))
            .await;

        let records = audit.recent(10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, "ok");
        assert_eq!(records[1].outcome, "PermissionDenied");
        assert_eq!(records[1].target_module, "file_store");
    }
}
