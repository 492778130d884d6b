//! Worker troupe types.

use crate::Destination;
use serde::{Deserialize, Serialize};

/// Creative role a worker plays in the troupe.
///
/// The role selects the worker's playbook and scopes the context it is
/// handed: lore sees canon, design sees blueprints, script sees conflicts
/// and teasers, drama sees the roster and open conflicts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    /// World-building: entities, canon facts, canon rules
    #[display("lore")]
    Lore,
    /// Visual design: blueprints for media generation
    #[display("design")]
    Design,
    /// Episode writing: scripts with shot lists
    #[display("script")]
    Script,
    /// Tension management: conflicts and teasers
    #[display("drama")]
    Drama,
}

impl WorkerRole {
    /// String representation used for storage and playbook lookup.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Lore => "lore",
            WorkerRole::Design => "design",
            WorkerRole::Script => "script",
            WorkerRole::Drama => "drama",
        }
    }
}

impl std::str::FromStr for WorkerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lore" => Ok(WorkerRole::Lore),
            "design" => Ok(WorkerRole::Design),
            "script" => Ok(WorkerRole::Script),
            "drama" => Ok(WorkerRole::Drama),
            _ => Err(format!("Unknown worker role: {}", s)),
        }
    }
}

/// A member of the troupe.
///
/// Workers are immutable once registered; the troupe is assembled at startup
/// and injected into the engine rather than discovered at runtime.
///
/// # Examples
///
/// ```
/// use impresario_core::{Destination, Worker, WorkerRole};
///
/// let worker = Worker::builder()
///     .id("worker-lore")
///     .name("lore")
///     .role(WorkerRole::Lore)
///     .permitted_task_types(vec!["create_entity".to_string()])
///     .permitted_destinations(vec![Destination::Entities])
///     .build()
///     .unwrap();
/// assert_eq!(worker.name(), "lore");
/// assert!(worker.permits_task_type("create_entity"));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(setter(into))]
pub struct Worker {
    /// Stable worker identity, recorded on tasks and heartbeats.
    id: String,
    /// Name the decision engine addresses this worker by.
    name: String,
    /// Creative role; selects playbook and context scope.
    role: WorkerRole,
    /// Task types this worker advertises. Empty means unrestricted.
    #[builder(default)]
    #[serde(default)]
    permitted_task_types: Vec<String>,
    /// Destinations this worker's output is expected to land in.
    #[builder(default)]
    #[serde(default)]
    permitted_destinations: Vec<Destination>,
}

impl Worker {
    /// Creates a new worker builder.
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }

    /// Whether this worker advertises the given task type.
    ///
    /// An empty advertisement list is treated as unrestricted; the list
    /// steers the decision prompt rather than hard-gating execution.
    pub fn permits_task_type(&self, task_type: &str) -> bool {
        self.permitted_task_types.is_empty()
            || self.permitted_task_types.iter().any(|t| t == task_type)
    }
}
