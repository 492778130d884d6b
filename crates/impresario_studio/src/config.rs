//! Daemon configuration for the studio server binary.

use impresario_error::{ConfigError, ImpresarioResult};
use impresario_showrunner::ShowrunnerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level studio configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Seconds between the start of one cycle and the next.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
    /// Roster file replacing the built-in troupe, if set.
    #[serde(default)]
    pub troupe_path: Option<PathBuf>,
    /// Playbook file layered over the built-in playbooks, if set.
    #[serde(default)]
    pub playbook_path: Option<PathBuf>,
    /// Forge policy file layered over the default policy, if set.
    #[serde(default)]
    pub policy_path: Option<PathBuf>,
    /// Completion provider settings.
    #[serde(default)]
    pub driver: DriverConfig,
    /// Engine tuning passed through to the showrunner.
    #[serde(default)]
    pub showrunner: ShowrunnerConfig,
}

impl StudioConfig {
    /// Load studio configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the TOML is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> ImpresarioResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read studio config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            ConfigError::new(format!("Invalid studio TOML in {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make the daemon misbehave at runtime.
    ///
    /// # Errors
    ///
    /// Returns error on a zero cycle interval or request timeout.
    pub fn validate(&self) -> ImpresarioResult<()> {
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::new("cycle_interval_secs must be at least 1").into());
        }
        if self.driver.request_timeout_secs == 0 {
            return Err(ConfigError::new("driver.request_timeout_secs must be at least 1").into());
        }
        Ok(())
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval(),
            troupe_path: None,
            playbook_path: None,
            policy_path: None,
            driver: DriverConfig::default(),
            showrunner: ShowrunnerConfig::default(),
        }
    }
}

/// Completion provider settings for the HTTP driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Provider root for the OpenAI-compatible API, without the
    /// `/v1/chat/completions` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Retry budget for retryable transport failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_cycle_interval() -> u64 {
    900
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_retries() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: StudioConfig = toml::from_str("").unwrap();

        assert_eq!(config.cycle_interval_secs, 900);
        assert!(config.playbook_path.is_none());
        assert_eq!(config.driver.model, "gpt-4o-mini");
        assert_eq!(config.driver.api_key_env, "OPENAI_API_KEY");
        assert_eq!(*config.showrunner.max_tasks_per_cycle(), 3);
    }

    #[test]
    fn test_from_file_layers_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
cycle_interval_secs = 60
playbook_path = "playbooks/studio.toml"

[driver]
model = "gpt-4o"
max_retries = 1

[showrunner]
max_tasks_per_cycle = 4
"#
        )
        .unwrap();

        let config = StudioConfig::from_file(file.path()).unwrap();

        assert_eq!(config.cycle_interval_secs, 60);
        assert_eq!(
            config.playbook_path.as_deref(),
            Some(std::path::Path::new("playbooks/studio.toml"))
        );
        assert_eq!(config.driver.model, "gpt-4o");
        assert_eq!(config.driver.max_retries, 1);
        assert_eq!(config.driver.base_url, "https://api.openai.com");
        assert_eq!(*config.showrunner.max_tasks_per_cycle(), 4);
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "cycle_interval_secs = 0").unwrap();

        let err = StudioConfig::from_file(file.path()).unwrap_err();

        assert!(err.to_string().contains("cycle_interval_secs"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = StudioConfig::from_file("/nonexistent/studio.toml").unwrap_err();

        assert!(err.to_string().contains("Failed to read studio config"));
    }
}
