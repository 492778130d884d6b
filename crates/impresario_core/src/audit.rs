//! Safety audit trail types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One gate decision, appended whether the action was permitted or denied.
///
/// The audit table is append-only; together with task history it is the
/// operator's record of everything the forge was asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Action category: `deploy`, `ddl`, or `api_call`
    pub category: String,
    /// Short description of the requested action
    pub action: String,
    /// Whether the gate permitted it
    pub allowed: bool,
    /// Denial reason, absent on permits
    pub reason: Option<String>,
    /// SHA-256 of the payload for deploys, so audited code is identifiable
    pub digest: Option<String>,
    /// Decision timestamp
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry stamped with the current time.
    pub fn now(
        category: impl Into<String>,
        action: impl Into<String>,
        allowed: bool,
        reason: Option<String>,
        digest: Option<String>,
    ) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            allowed,
            reason,
            digest,
            created_at: Utc::now(),
        }
    }
}
