//! Domain records for the show's content tables.
//!
//! One struct per table row plus a `New*` insert type where the router
//! creates rows. `CanonRule` rows are seeded by operators and `Episode`
//! rows are written by the external assembly pipeline, so neither carries
//! an insert type here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member of the cast or a piece of the setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Row id
    pub id: i64,
    /// Display name, unique in practice but not enforced
    pub name: String,
    /// Who or what this is
    pub description: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`Entity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    /// Display name
    pub name: String,
    /// Who or what this is
    pub description: String,
}

/// An established fact about the show's world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonFact {
    /// Row id
    pub id: i64,
    /// The fact itself
    pub fact: String,
    /// Entity this fact is about, when one was resolved
    pub entity_id: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`CanonFact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCanonFact {
    /// The fact itself
    pub fact: String,
    /// Entity this fact is about, when one was resolved
    pub entity_id: Option<i64>,
}

/// A standing rule the show's world obeys. Seeded by operators, read-only
/// to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonRule {
    /// Row id
    pub id: i64,
    /// The rule text
    pub rule: String,
}

/// Status of a conflict between entities.
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
pub enum ConflictStatus {
    /// Active and unresolved
    #[display("open")]
    Open,
    /// Intensity was raised by a drama task
    #[display("escalated")]
    Escalated,
    /// Closed with a recorded resolution
    #[display("resolved")]
    Resolved,
}

impl ConflictStatus {
    /// String representation used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStatus::Open => "open",
            ConflictStatus::Escalated => "escalated",
            ConflictStatus::Resolved => "resolved",
        }
    }

    /// Whether this conflict still drives drama.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConflictStatus::Resolved)
    }
}

impl std::str::FromStr for ConflictStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ConflictStatus::Open),
            "escalated" => Ok(ConflictStatus::Escalated),
            "resolved" => Ok(ConflictStatus::Resolved),
            _ => Err(format!("Unknown conflict status: {}", s)),
        }
    }
}

/// A rivalry or tension between two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Row id
    pub id: i64,
    /// Short label for the conflict
    pub title: String,
    /// First party
    pub side_a: String,
    /// Second party
    pub side_b: String,
    /// How hot the conflict runs, 1 through 10
    pub intensity: i32,
    /// Lifecycle status
    pub status: ConflictStatus,
    /// How it ended, set when resolved
    pub resolution: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last escalation or resolution timestamp
    pub updated_at: DateTime<Utc>,
}

/// Insert form of [`Conflict`]. New conflicts open at the given intensity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConflict {
    /// Short label for the conflict
    pub title: String,
    /// First party
    pub side_a: String,
    /// Second party
    pub side_b: String,
    /// Opening intensity
    pub intensity: i32,
}

/// A visual design prompt awaiting media generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Row id
    pub id: i64,
    /// Entity this design depicts, when one was resolved
    pub entity_id: Option<i64>,
    /// Short label for the design
    pub title: String,
    /// The prompt handed to the media pipeline
    pub visual_prompt: String,
    /// Optional style tag
    pub style: Option<String>,
    /// Pipeline status, `draft` on insert
    pub status: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`Blueprint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlueprint {
    /// Entity this design depicts, when one was resolved
    pub entity_id: Option<i64>,
    /// Short label for the design
    pub title: String,
    /// The prompt handed to the media pipeline
    pub visual_prompt: String,
    /// Optional style tag
    pub style: Option<String>,
    /// Pipeline status
    pub status: String,
}

/// A short promotional beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teaser {
    /// Row id
    pub id: i64,
    /// Entity speaking or featured, when one was resolved
    pub entity_id: Option<i64>,
    /// The teaser text
    pub content: String,
    /// Who delivers it
    pub speaker: Option<String>,
    /// Emotional register
    pub tone: Option<String>,
    /// Advisory ordering hint
    pub priority: i32,
    /// Pipeline status, `draft` on insert
    pub status: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`Teaser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeaser {
    /// Entity speaking or featured, when one was resolved
    pub entity_id: Option<i64>,
    /// The teaser text
    pub content: String,
    /// Who delivers it
    pub speaker: Option<String>,
    /// Emotional register
    pub tone: Option<String>,
    /// Advisory ordering hint
    pub priority: i32,
    /// Pipeline status
    pub status: String,
}

/// An episode script with its shot list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Row id
    pub id: i64,
    /// Episode title
    pub title: String,
    /// One-paragraph summary
    pub synopsis: Option<String>,
    /// Shot list as structured JSON, opaque to the engine
    pub shots: serde_json::Value,
    /// Pipeline status, `draft` on insert
    pub status: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`Script`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScript {
    /// Episode title
    pub title: String,
    /// One-paragraph summary
    pub synopsis: Option<String>,
    /// Shot list as structured JSON
    pub shots: serde_json::Value,
    /// Pipeline status
    pub status: String,
}

/// A published episode. Written by the external assembly pipeline; the
/// engine only reads these for cadence tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Row id
    pub id: i64,
    /// Episode title
    pub title: String,
    /// Where the rendered video landed
    pub video_url: Option<String>,
    /// Publication timestamp
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_status_round_trips() {
        for status in [
            ConflictStatus::Open,
            ConflictStatus::Escalated,
            ConflictStatus::Resolved,
        ] {
            let parsed: ConflictStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_resolved_conflicts_are_inactive() {
        assert!(ConflictStatus::Open.is_active());
        assert!(ConflictStatus::Escalated.is_active());
        assert!(!ConflictStatus::Resolved.is_active());
    }
}
