//! Policy data the safety gate enforces.
//!
//! The built-in policy ships with a conservative blocklist and an empty-ish
//! domain allowlist. Operators can layer overrides from a TOML file; any key
//! missing from the file keeps its built-in value.

use impresario_error::{ConfigError, ImpresarioResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default ceiling on deployable code size, in bytes.
pub const DEFAULT_MAX_CODE_BYTES: usize = 65_536;

/// A single blocklist entry: a substring and the reason it is banned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRule {
    /// Substring to scan for (matched case-insensitively)
    pub pattern: String,
    /// Human-readable reason recorded when the rule fires
    pub reason: String,
}

impl BlockRule {
    /// Create a rule from a pattern and reason.
    pub fn new(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Shape of a policy override file.
#[derive(Debug, Deserialize)]
struct PolicyFile {
    blocklist: Option<Vec<BlockRule>>,
    max_code_bytes: Option<usize>,
    allowed_domains: Option<Vec<String>>,
    protected_tables: Option<Vec<String>>,
}

/// The data the gate consults: code blocklist, size ceiling, domain
/// allowlist, and tables DDL must never touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgePolicy {
    /// Substrings that make deployable code unacceptable
    pub blocklist: Vec<BlockRule>,
    /// Maximum size of deployable code, in bytes
    pub max_code_bytes: usize,
    /// Hosts API calls may target (exact host or any subdomain)
    pub allowed_domains: Vec<String>,
    /// Tables DDL statements must never name
    pub protected_tables: Vec<String>,
}

impl Default for ForgePolicy {
    fn default() -> Self {
        let blocklist = vec![
            BlockRule::new("eval(", "dynamic code evaluation"),
            BlockRule::new("new Function", "dynamic code evaluation"),
            BlockRule::new("child_process", "subprocess spawning"),
            BlockRule::new("execSync", "subprocess spawning"),
            BlockRule::new("process.env", "environment variable access"),
            BlockRule::new("DROP TABLE", "destructive SQL"),
            BlockRule::new("DELETE FROM", "destructive SQL"),
            BlockRule::new("TRUNCATE", "destructive SQL"),
            BlockRule::new("rm -rf", "destructive shell command"),
        ];
        Self {
            blocklist,
            max_code_bytes: DEFAULT_MAX_CODE_BYTES,
            allowed_domains: vec!["api.github.com".to_string()],
            protected_tables: vec![
                "tasks".to_string(),
                "heartbeats".to_string(),
                "audit_log".to_string(),
                "canon_rules".to_string(),
            ],
        }
    }
}

impl ForgePolicy {
    /// Load overrides from a TOML file, layered over the built-in policy.
    pub fn from_file(path: impl AsRef<Path>) -> ImpresarioResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read policy file {}: {e}", path.display()))
        })?;
        let file: PolicyFile = toml::from_str(&contents).map_err(|e| {
            ConfigError::new(format!("Invalid policy TOML in {}: {e}", path.display()))
        })?;

        let mut policy = Self::default();
        if let Some(blocklist) = file.blocklist {
            policy.blocklist = blocklist;
        }
        if let Some(max_code_bytes) = file.max_code_bytes {
            policy.max_code_bytes = max_code_bytes;
        }
        if let Some(allowed_domains) = file.allowed_domains {
            policy.allowed_domains = allowed_domains;
        }
        if let Some(protected_tables) = file.protected_tables {
            policy.protected_tables = protected_tables;
        }
        Ok(policy)
    }

    /// Add a blocklist rule, consuming self.
    pub fn with_rule(mut self, pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        self.blocklist.push(BlockRule::new(pattern, reason));
        self
    }

    /// Add an allowed domain, consuming self.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_domains.push(domain.into());
        self
    }

    /// First blocklist rule the code trips, if any. Matching is
    /// case-insensitive so `EVAL(` does not slip past `eval(`.
    pub fn matches_code(&self, code: &str) -> Option<&BlockRule> {
        let haystack = code.to_lowercase();
        self.blocklist
            .iter()
            .find(|rule| haystack.contains(&rule.pattern.to_lowercase()))
    }

    /// First protected table the statement names, if any.
    pub fn protected_table_hit(&self, statement: &str) -> Option<&str> {
        let haystack = statement.to_lowercase();
        self.protected_tables
            .iter()
            .find(|table| haystack.contains(&table.to_lowercase()))
            .map(|table| table.as_str())
    }

    /// Whether the URL's host is an allowed domain or a subdomain of one.
    ///
    /// Suffix matching requires a dot boundary: `evil-api.github.com.attacker.net`
    /// shares no suffix with `api.github.com` and is rejected.
    pub fn is_allowed_domain(&self, url_str: &str) -> bool {
        let Ok(url) = url::Url::parse(url_str) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        self.allowed_domains
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_contents() {
        let policy = ForgePolicy::default();
        assert_eq!(*policy.allowed_domains, ["api.github.com".to_string()]);
        assert_eq!(policy.max_code_bytes, DEFAULT_MAX_CODE_BYTES);
        assert!(policy.protected_tables.contains(&"audit_log".to_string()));
        assert!(policy.blocklist.len() >= 5);
    }

    #[test]
    fn test_matches_code_is_case_insensitive() {
        let policy = ForgePolicy::default();
        let hit = policy
            .matches_code("const x = EVAL(payload);")
            .expect("blocklist hit");
        assert_eq!(hit.pattern, "eval(");

        assert!(policy.matches_code("const x = 1 + 1;").is_none());
    }

    #[test]
    fn test_allowed_domain_exact_and_subdomain() {
        let policy = ForgePolicy::default();
        assert!(policy.is_allowed_domain("https://api.github.com/repos/x"));
        assert!(policy.is_allowed_domain("https://uploads.api.github.com/x"));
    }

    #[test]
    fn test_spoofed_domain_rejected() {
        let policy = ForgePolicy::default();
        assert!(!policy.is_allowed_domain("https://evil.api.github.com.attacker.net/x"));
        assert!(!policy.is_allowed_domain("https://apigithub.com/x"));
        assert!(!policy.is_allowed_domain("not a url"));
    }

    #[test]
    fn test_protected_table_hit_anywhere_in_statement() {
        let policy = ForgePolicy::default();
        let hit = policy.protected_table_hit("CREATE INDEX idx ON audit_log (id)");
        assert_eq!(hit, Some("audit_log"));
        assert!(policy.protected_table_hit("CREATE TABLE moods (id BIGINT)").is_none());
    }

    #[test]
    fn test_from_file_layers_over_defaults() {
        let toml = r#"
max_code_bytes = 1024

[[blocklist]]
pattern = "fs.unlink"
reason = "file deletion"
"#;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, toml).expect("write policy file");

        let policy = ForgePolicy::from_file(&path).expect("load policy");
        assert_eq!(policy.max_code_bytes, 1024);
        assert_eq!(policy.blocklist.len(), 1);
        assert_eq!(policy.blocklist[0].pattern, "fs.unlink");
        // Untouched keys keep the built-ins.
        assert!(policy.is_allowed_domain("https://api.github.com/x"));
    }

    #[test]
    fn test_with_rule_and_with_domain() {
        let policy = ForgePolicy::default()
            .with_rule("os.system", "subprocess spawning")
            .with_domain("api.example.com");
        assert!(policy.matches_code("os.system('ls')").is_some());
        assert!(policy.is_allowed_domain("https://api.example.com/v1"));
    }
}
