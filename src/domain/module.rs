//! Backing module entity and health-state transitions
//!
//! A `Module` is one independently running backing service. Its status is
//! driven exclusively by probe outcomes recorded through the registry; no
//! other component mutates it.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Last-observed health state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Not probed yet since startup or re-registration
    Unknown,
    Online,
    /// Failed at least one probe but not enough to be declared down
    Degraded,
    Offline,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Unknown => write!(f, "unknown"),
            ModuleStatus::Online => write!(f, "online"),
            ModuleStatus::Degraded => write!(f, "degraded"),
            ModuleStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Result of one health probe
#[derive(Debug, Clone, Copy)]
pub enum ProbeOutcome {
    Success { latency: Duration },
    /// Timeout, connection refused, or non-success response. Latency is
    /// recorded when the probe got far enough to measure one.
    Failure { latency: Option<Duration> },
}

/// Consecutive failures after which a module is declared Offline
pub const OFFLINE_FAILURE_THRESHOLD: u32 = 3;

/// One independently running backing service behind the gateway
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub base_address: String,
    pub health_endpoint_path: String,
    pub timeout_budget: Duration,

    pub status: ModuleStatus,
    pub consecutive_failures: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_latency: Option<Duration>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        base_address: impl Into<String>,
        health_endpoint_path: impl Into<String>,
        timeout_budget: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            base_address: base_address.into(),
            health_endpoint_path: health_endpoint_path.into(),
            timeout_budget,
            status: ModuleStatus::Unknown,
            consecutive_failures: 0,
            last_checked_at: None,
            last_latency: None,
        }
    }

    /// Apply one probe outcome.
    ///
    /// A single failed probe marks the module Degraded rather than Offline;
    /// Offline requires [`OFFLINE_FAILURE_THRESHOLD`] consecutive failures.
    /// This hysteresis avoids flapping on one dropped probe while still
    /// detecting sustained outages within three probe intervals.
    pub fn apply_probe(&mut self, outcome: ProbeOutcome) {
        self.last_checked_at = Some(Utc::now());
        match outcome {
            ProbeOutcome::Success { latency } => {
                self.last_latency = Some(latency);
                self.consecutive_failures = 0;
                self.status = ModuleStatus::Online;
            }
            ProbeOutcome::Failure { latency } => {
                self.last_latency = latency;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.status = if self.consecutive_failures >= OFFLINE_FAILURE_THRESHOLD {
                    ModuleStatus::Offline
                } else {
                    ModuleStatus::Degraded
                };
            }
        }
    }
}
