//! Audit trail for handled gateway requests
//!
//! Every handled request emits one record: acting user, capability, target
//! module, outcome, timestamp. Records go to the `audit` tracing target and
//! to a bounded in-memory log served at /api/audit.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::permissions::Capability;

/// One handled request, as remembered by the audit trail
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditRecord {
    pub user_id: String,
    /// Role as presented by the caller; "none" when absent or unrecognized
    pub role: String,
    pub capability: Capability,
    pub target_module: String,
    /// "ok" or the error taxonomy kind
    pub outcome: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded in-memory audit log; oldest records are evicted first
pub struct AuditLog {
    records: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, record: AuditRecord) {
        tracing::info!(
            target: "audit",
            user_id = %record.user_id,
            role = %record.role,
            capability = %record.capability,
            target_module = %record.target_module,
            outcome = %record.outcome,
            "gateway request handled"
        );

        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent records, newest last
    pub fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, outcome: &str) -> AuditRecord {
        AuditRecord {
            user_id: user.to_string(),
            role: "reader".to_string(),
            capability: Capability::ReadFile,
            target_module: "file_store".to_string(),
            outcome: outcome.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn retains_newest_records_up_to_capacity() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.record(record(&format!("u{i}"), "ok"));
        }
        let recent = log.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].user_id, "u2");
        assert_eq!(recent[2].user_id, "u4");
    }

    #[test]
    fn recent_limit_returns_tail() {
        let log = AuditLog::new(10);
        for i in 0..4 {
            log.record(record(&format!("u{i}"), "ok"));
        }
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user_id, "u2");
        assert_eq!(recent[1].user_id, "u3");
    }
}
