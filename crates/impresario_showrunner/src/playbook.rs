//! Role playbooks: the standing prompt material each worker executes with.
//!
//! A playbook pairs a system prompt (who the worker is) with standing
//! instructions (how its output must be shaped). The library ships a
//! built-in set for the four roles and can be overridden from a TOML file.

use impresario_core::WorkerRole;
use impresario_error::{ConfigError, ImpresarioResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Prompt material for one worker role.
#[derive(Debug, Clone, Deserialize)]
pub struct Playbook {
    /// Short name used in logs.
    pub name: String,
    /// System prompt framing the worker's persona and duties.
    pub system: String,
    /// Standing output-shape instructions prepended to every task.
    pub instructions: String,
}

/// File-level TOML shape: `[playbooks.<role>]` tables.
#[derive(Debug, Deserialize)]
struct PlaybookFile {
    #[serde(default)]
    playbooks: HashMap<String, PlaybookEntry>,
}

#[derive(Debug, Deserialize)]
struct PlaybookEntry {
    system: String,
    instructions: String,
}

/// Library of playbooks keyed by worker role.
#[derive(Debug, Clone)]
pub struct PlaybookLibrary {
    playbooks: HashMap<WorkerRole, Playbook>,
}

impl PlaybookLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self {
            playbooks: HashMap::new(),
        }
    }

    /// The built-in playbooks for the four standard roles.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        library.insert(
            WorkerRole::Lore,
            Playbook {
                name: "lore".to_string(),
                system: "You are the lore keeper of an ongoing serialized show. \
                         You maintain the cast of entities and the canon: facts that \
                         have been established and must stay consistent."
                    .to_string(),
                instructions: "Respond with a single JSON object. For a new entity use \
                               {\"name\": ..., \"description\": ...}. For a canon fact use \
                               {\"fact\": ..., \"entity_name\": ...}. Keep descriptions under \
                               three sentences and never contradict the canon rules you were given."
                    .to_string(),
            },
        );
        library.insert(
            WorkerRole::Design,
            Playbook {
                name: "design".to_string(),
                system: "You are the visual designer of an ongoing serialized show. \
                         You turn entities into production-ready image generation briefs."
                    .to_string(),
                instructions: "Respond with a single JSON object: {\"title\": ..., \
                               \"visual_prompt\": ..., \"style\": ..., \"entity_name\": ...}. \
                               The visual_prompt must be a self-contained image generation \
                               prompt; mention palette, mood, and framing."
                    .to_string(),
            },
        );
        library.insert(
            WorkerRole::Script,
            Playbook {
                name: "script".to_string(),
                system: "You are the episode writer of an ongoing serialized show. \
                         You write short-form episode scripts as shot lists."
                    .to_string(),
                instructions: "Respond with a single JSON object: {\"title\": ..., \
                               \"synopsis\": ..., \"shots\": [{\"shot\": 1, \"visual\": ..., \
                               \"dialogue\": ...}, ...]}. Six to ten shots; every shot needs \
                               a visual and may carry dialogue."
                    .to_string(),
            },
        );
        library.insert(
            WorkerRole::Drama,
            Playbook {
                name: "drama".to_string(),
                system: "You are the dramaturg of an ongoing serialized show. \
                         You manage tension: conflicts between entities and the \
                         teasers that hint at them."
                    .to_string(),
                instructions: "Respond with a single JSON object. For a conflict use \
                               {\"title\": ..., \"side_a\": ..., \"side_b\": ..., \
                               \"intensity\": 1-10}. For a teaser use {\"content\": ..., \
                               \"speaker\": ..., \"tone\": ...}. Teasers are one or two \
                               sentences, in-character, no spoilers."
                    .to_string(),
            },
        );
        library
    }

    /// Load playbooks from a TOML file, layered over the built-ins.
    ///
    /// Roles present in the file replace the built-in playbook for that
    /// role; roles absent from the file keep their built-in. Unknown role
    /// keys are a configuration error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is invalid,
    /// or a `[playbooks.<role>]` key is not a known role.
    pub fn from_file(path: impl AsRef<Path>) -> ImpresarioResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read playbook file {}: {e}", path.display()))
        })?;
        let file: PlaybookFile = toml::from_str(&contents).map_err(|e| {
            ConfigError::new(format!("Invalid playbook TOML in {}: {e}", path.display()))
        })?;

        let mut library = Self::builtin();
        for (key, entry) in file.playbooks {
            let role = WorkerRole::from_str(&key).map_err(|_| {
                ConfigError::new(format!("Unknown playbook role '{key}' in {}", path.display()))
            })?;
            library.insert(
                role,
                Playbook {
                    name: key,
                    system: entry.system,
                    instructions: entry.instructions,
                },
            );
        }
        Ok(library)
    }

    /// Insert or replace the playbook for a role.
    pub fn insert(&mut self, role: WorkerRole, playbook: Playbook) {
        self.playbooks.insert(role, playbook);
    }

    /// Look up the playbook for a role.
    pub fn get(&self, role: &WorkerRole) -> Option<&Playbook> {
        self.playbooks.get(role)
    }

    /// Number of playbooks in the library.
    pub fn len(&self) -> usize {
        self.playbooks.len()
    }

    /// Check if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.playbooks.is_empty()
    }
}

impl Default for PlaybookLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_all_roles() {
        let library = PlaybookLibrary::builtin();
        assert_eq!(library.len(), 4);
        for role in [
            WorkerRole::Lore,
            WorkerRole::Design,
            WorkerRole::Script,
            WorkerRole::Drama,
        ] {
            let playbook = library.get(&role).expect("builtin playbook");
            assert!(!playbook.system.is_empty());
            assert!(playbook.instructions.contains("JSON"));
        }
    }

    #[test]
    fn test_from_file_overrides_one_role() {
        let toml = r#"
[playbooks.lore]
system = "Custom lore system prompt."
instructions = "Custom lore instructions."
"#;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("playbooks.toml");
        std::fs::write(&path, toml).expect("write playbook file");

        let library = PlaybookLibrary::from_file(&path).expect("load playbooks");
        assert_eq!(library.len(), 4);
        assert_eq!(
            library.get(&WorkerRole::Lore).unwrap().system,
            "Custom lore system prompt."
        );
        // Untouched roles keep the builtin.
        assert!(
            library
                .get(&WorkerRole::Drama)
                .unwrap()
                .system
                .contains("dramaturg")
        );
    }

    #[test]
    fn test_from_file_rejects_unknown_role() {
        let toml = r#"
[playbooks.stagehand]
system = "nope"
instructions = "nope"
"#;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("playbooks.toml");
        std::fs::write(&path, toml).expect("write playbook file");

        let result = PlaybookLibrary::from_file(&path);
        assert!(result.is_err());
        let message = format!("{}", result.unwrap_err());
        assert!(message.contains("stagehand"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = PlaybookLibrary::from_file("/nonexistent/playbooks.toml");
        assert!(result.is_err());
    }
}
