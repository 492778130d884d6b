//! Registry for the worker troupe.

use impresario_core::{Destination, Worker, WorkerRole};
use impresario_error::{ConfigError, ImpresarioResult, RegistryError, RegistryErrorKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// On-disk shape of a roster file: a list of `[[workers]]` entries.
#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    workers: Vec<Worker>,
}

/// Registry mapping worker names to troupe members.
///
/// The troupe is assembled at startup and injected into the engine; the
/// registry never changes while cycles run. A lookup miss is a per-task
/// rejection, not a halt.
#[derive(Debug)]
pub struct TroupeRegistry {
    workers: HashMap<String, Worker>,
}

impl TroupeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
        }
    }

    /// Build a registry from an assembled roster.
    pub fn from_workers(workers: Vec<Worker>) -> Self {
        let mut registry = Self::new();
        for worker in workers {
            registry.register(worker);
        }
        registry
    }

    /// The built-in four-member troupe: lore, design, script, drama.
    pub fn default_troupe() -> Self {
        let build = |id: &str, name: &str, role, types: &[&str], dests: Vec<Destination>| {
            Worker::builder()
                .id(id)
                .name(name)
                .role(role)
                .permitted_task_types(types.iter().map(|t| t.to_string()).collect::<Vec<_>>())
                .permitted_destinations(dests)
                .build()
                .expect("Built-in worker definitions are complete")
        };

        Self::from_workers(vec![
            build(
                "worker-lore",
                "lore",
                WorkerRole::Lore,
                &["create_entity", "update_entity", "record_fact"],
                vec![Destination::Entities, Destination::CanonFacts],
            ),
            build(
                "worker-design",
                "design",
                WorkerRole::Design,
                &["design_blueprint"],
                vec![Destination::Blueprints],
            ),
            build(
                "worker-script",
                "script",
                WorkerRole::Script,
                &["write_script"],
                vec![Destination::Scripts],
            ),
            build(
                "worker-drama",
                "drama",
                WorkerRole::Drama,
                &[
                    "create_conflict",
                    "escalate_conflict",
                    "resolve_conflict",
                    "write_teaser",
                ],
                vec![Destination::Conflicts, Destination::Teasers],
            ),
        ])
    }

    /// Load a roster from a TOML file, replacing the built-in troupe.
    ///
    /// Each `[[workers]]` entry needs `id`, `name`, and `role`; the
    /// permitted task-type and destination lists default to empty
    /// (unrestricted).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is invalid,
    /// a role or destination string is unknown, or the roster is empty.
    pub fn from_file(path: impl AsRef<Path>) -> ImpresarioResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read roster file {}: {e}", path.display()))
        })?;
        let file: RosterFile = toml::from_str(&contents).map_err(|e| {
            ConfigError::new(format!("Invalid roster TOML in {}: {e}", path.display()))
        })?;
        if file.workers.is_empty() {
            return Err(RegistryError::new(RegistryErrorKind::EmptyTroupe).into());
        }
        Ok(Self::from_workers(file.workers))
    }

    /// Register a worker.
    ///
    /// If a worker with the same name already exists, it is replaced and a
    /// warning logged.
    #[tracing::instrument(skip(self, worker), fields(worker_name = worker.name()))]
    pub fn register(&mut self, worker: Worker) {
        let name = worker.name().to_string();

        if self.workers.contains_key(&name) {
            tracing::warn!(worker = %name, "Worker already registered, overwriting previous registration");
        } else {
            tracing::debug!("Registering worker");
        }

        self.workers.insert(name, worker);
    }

    /// Look up a worker by the name the decision engine addressed it by.
    pub fn resolve(&self, name: &str) -> Option<&Worker> {
        self.workers.get(name)
    }

    /// All workers, sorted by name for stable prompt text.
    pub fn list(&self) -> Vec<&Worker> {
        let mut workers: Vec<&Worker> = self.workers.values().collect();
        workers.sort_by(|a, b| a.name().cmp(b.name()));
        workers
    }

    /// Roster description handed to the decision policy.
    pub fn roster_summary(&self) -> String {
        self.list()
            .iter()
            .map(|w| {
                let types = if w.permitted_task_types().is_empty() {
                    "any".to_string()
                } else {
                    w.permitted_task_types().join(", ")
                };
                format!("- {} ({} role): task types: {}", w.name(), w.role(), types)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Default for TroupeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_troupe_has_four_members() {
        let troupe = TroupeRegistry::default_troupe();
        assert_eq!(troupe.len(), 4);
        for name in ["lore", "design", "script", "drama"] {
            assert!(troupe.resolve(name).is_some(), "missing worker {}", name);
        }
    }

    #[test]
    fn test_resolve_miss_returns_none() {
        let troupe = TroupeRegistry::default_troupe();
        assert!(troupe.resolve("stagehand").is_none());
    }

    #[test]
    fn test_register_overwrites_same_name() {
        let mut troupe = TroupeRegistry::new();
        let first = Worker::builder()
            .id("worker-a")
            .name("lore")
            .role(WorkerRole::Lore)
            .build()
            .unwrap();
        let second = Worker::builder()
            .id("worker-b")
            .name("lore")
            .role(WorkerRole::Lore)
            .build()
            .unwrap();

        troupe.register(first);
        troupe.register(second);

        assert_eq!(troupe.len(), 1);
        assert_eq!(troupe.resolve("lore").unwrap().id(), "worker-b");
    }

    #[test]
    fn test_roster_summary_lists_all_workers_sorted() {
        let troupe = TroupeRegistry::default_troupe();
        let summary = troupe.roster_summary();
        let design_pos = summary.find("design").unwrap();
        let script_pos = summary.find("- script").unwrap();
        assert!(design_pos < script_pos);
        assert!(summary.contains("write_teaser"));
    }

    #[test]
    fn test_from_file_replaces_builtin_roster() {
        let toml = r#"
[[workers]]
id = "worker-archivist"
name = "archivist"
role = "lore"
permitted_task_types = ["record_fact"]
permitted_destinations = ["canon_facts"]

[[workers]]
id = "worker-provocateur"
name = "provocateur"
role = "drama"
"#;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, toml).expect("write roster file");

        let troupe = TroupeRegistry::from_file(&path).expect("load roster");

        assert_eq!(troupe.len(), 2);
        let archivist = troupe.resolve("archivist").unwrap();
        assert_eq!(*archivist.role(), WorkerRole::Lore);
        assert!(archivist.permits_task_type("record_fact"));
        assert!(!archivist.permits_task_type("write_teaser"));
        // An absent advertisement list means unrestricted.
        let provocateur = troupe.resolve("provocateur").unwrap();
        assert!(provocateur.permits_task_type("write_teaser"));
        assert!(troupe.resolve("lore").is_none());
    }

    #[test]
    fn test_from_file_rejects_unknown_role() {
        let toml = r#"
[[workers]]
id = "worker-stagehand"
name = "stagehand"
role = "stagehand"
"#;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, toml).expect("write roster file");

        let err = TroupeRegistry::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid roster TOML"));
    }

    #[test]
    fn test_from_file_rejects_empty_roster() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, "workers = []").expect("write roster file");

        let err = TroupeRegistry::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
