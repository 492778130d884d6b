//! Gate-before-effect authorization for privileged actions.

use crate::action::ForgeAction;
use crate::policy::ForgePolicy;
use impresario_core::AuditEntry;
use sha2::{Digest, Sha256};

/// The gate's ruling on a single requested action.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    /// Audit category (`deploy`, `ddl`, `api_call`)
    pub category: String,
    /// Short description of the action ruled on
    pub action: String,
    /// Whether the action may proceed
    pub allowed: bool,
    /// Denial reason, absent when allowed
    pub reason: Option<String>,
    /// Content digest, recorded for deploys
    pub digest: Option<String>,
}

impl GateDecision {
    /// Audit-trail entry for this decision, stamped now.
    pub fn audit_entry(&self) -> AuditEntry {
        AuditEntry::now(
            self.category.clone(),
            self.action.clone(),
            self.allowed,
            self.reason.clone(),
            self.digest.clone(),
        )
    }
}

/// Stateless policy check applied to every forge action before execution.
///
/// The gate never performs the effect itself; it only rules. A failed check
/// is a denial with a reason, never an error.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    policy: ForgePolicy,
}

impl SafetyGate {
    /// Create a gate enforcing the given policy.
    pub fn new(policy: ForgePolicy) -> Self {
        Self { policy }
    }

    /// The policy this gate enforces.
    pub fn policy(&self) -> &ForgePolicy {
        &self.policy
    }

    /// Rule on an action. Deploy rulings carry a digest of the payload so
    /// the audit trail identifies exactly what was ruled on.
    #[tracing::instrument(skip(self, action), fields(category = action.category()))]
    pub fn authorize(&self, action: &ForgeAction) -> GateDecision {
        let (reason, digest) = match action {
            ForgeAction::DeployCode { code, .. } => {
                (self.check_deploy(code), Some(sha256_hex(code)))
            }
            ForgeAction::ExecuteDdl { statement } => (self.check_ddl(statement), None),
            ForgeAction::CallApi { url, .. } => (self.check_api(url), None),
        };
        GateDecision {
            category: action.category().to_string(),
            action: action.describe(),
            allowed: reason.is_none(),
            reason,
            digest,
        }
    }

    /// Size ceiling, then blocklist scan. Returns the denial reason, if any.
    fn check_deploy(&self, code: &str) -> Option<String> {
        if code.len() > self.policy.max_code_bytes {
            return Some(format!(
                "Code size {} bytes exceeds ceiling of {} bytes",
                code.len(),
                self.policy.max_code_bytes
            ));
        }
        self.policy.matches_code(code).map(|rule| {
            format!(
                "Code matches blocked pattern '{}' ({})",
                rule.pattern, rule.reason
            )
        })
    }

    /// DDL must be a single CREATE TABLE or CREATE INDEX statement that
    /// never names a protected table, not even inside a column list.
    fn check_ddl(&self, statement: &str) -> Option<String> {
        let trimmed = statement.trim();
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        let normalized = body.to_uppercase();
        if !normalized.starts_with("CREATE TABLE") && !normalized.starts_with("CREATE INDEX") {
            return Some(
                "Only CREATE TABLE and CREATE INDEX statements are permitted".to_string(),
            );
        }
        if body.contains(';') {
            return Some("Multiple SQL statements are not permitted".to_string());
        }
        self.policy
            .protected_table_hit(body)
            .map(|table| format!("Statement references protected table '{table}'"))
    }

    fn check_api(&self, url: &str) -> Option<String> {
        if self.policy.is_allowed_domain(url) {
            None
        } else {
            Some(format!("Domain not allowlisted: {url}"))
        }
    }
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DEFAULT_MAX_CODE_BYTES;

    fn gate() -> SafetyGate {
        SafetyGate::new(ForgePolicy::default())
    }

    #[test]
    fn test_clean_deploy_permitted_with_digest() {
        let action = ForgeAction::DeployCode {
            name: "teaser-feed".to_string(),
            code: "export function handler() { return 1; }".to_string(),
        };
        let decision = gate().authorize(&action);
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
        let digest = decision.digest.expect("deploy digest");
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_blocklisted_deploy_denied() {
        let action = ForgeAction::DeployCode {
            name: "helper".to_string(),
            code: "const cp = require('child_process');".to_string(),
        };
        let decision = gate().authorize(&action);
        assert!(!decision.allowed);
        let reason = decision.reason.expect("denial reason");
        assert!(reason.contains("child_process"));
        // Denied deploys still carry the payload digest.
        assert!(decision.digest.is_some());
    }

    #[test]
    fn test_oversized_deploy_denied() {
        let action = ForgeAction::DeployCode {
            name: "bulk".to_string(),
            code: "x".repeat(DEFAULT_MAX_CODE_BYTES + 1),
        };
        let decision = gate().authorize(&action);
        assert!(!decision.allowed);
        assert!(decision.reason.expect("denial reason").contains("ceiling"));
    }

    #[test]
    fn test_ddl_create_statements_permitted() {
        for statement in [
            "CREATE TABLE moods (id BIGINT PRIMARY KEY, name TEXT);",
            "create index idx_moods_name on moods (name)",
        ] {
            let decision = gate().authorize(&ForgeAction::ExecuteDdl {
                statement: statement.to_string(),
            });
            assert!(decision.allowed, "expected permit for: {statement}");
            assert!(decision.digest.is_none());
        }
    }

    #[test]
    fn test_ddl_non_create_denied() {
        let decision = gate().authorize(&ForgeAction::ExecuteDdl {
            statement: "ALTER TABLE entities ADD COLUMN mood TEXT".to_string(),
        });
        assert!(!decision.allowed);
        assert!(
            decision
                .reason
                .expect("denial reason")
                .contains("CREATE TABLE")
        );
    }

    #[test]
    fn test_ddl_multiple_statements_denied() {
        let decision = gate().authorize(&ForgeAction::ExecuteDdl {
            statement: "CREATE TABLE a (id INT); DROP TABLE entities".to_string(),
        });
        assert!(!decision.allowed);
        assert!(
            decision
                .reason
                .expect("denial reason")
                .contains("Multiple SQL statements")
        );
    }

    #[test]
    fn test_ddl_protected_table_denied_anywhere() {
        let decision = gate().authorize(&ForgeAction::ExecuteDdl {
            statement: "CREATE INDEX idx_audit ON audit_log (created_at)".to_string(),
        });
        assert!(!decision.allowed);
        assert!(decision.reason.expect("denial reason").contains("audit_log"));
    }

    #[test]
    fn test_api_call_allowlisted_host() {
        let decision = gate().authorize(&ForgeAction::CallApi {
            url: "https://api.github.com/repos/show/episodes".to_string(),
            method: "GET".to_string(),
            body: None,
        });
        assert!(decision.allowed);
    }

    #[test]
    fn test_api_call_spoofed_host_denied() {
        let decision = gate().authorize(&ForgeAction::CallApi {
            url: "https://evil.api.github.com.attacker.net/x".to_string(),
            method: "GET".to_string(),
            body: None,
        });
        assert!(!decision.allowed);
        assert!(
            decision
                .reason
                .expect("denial reason")
                .contains("not allowlisted")
        );
    }

    #[test]
    fn test_audit_entry_mirrors_decision() {
        let decision = gate().authorize(&ForgeAction::ExecuteDdl {
            statement: "DROP TABLE canon_rules".to_string(),
        });
        let entry = decision.audit_entry();
        assert_eq!(entry.category, "ddl");
        assert!(!entry.allowed);
        assert_eq!(entry.reason, decision.reason);
    }
}
