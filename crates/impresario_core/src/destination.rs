//! Output destination enumeration.

use serde::{Deserialize, Serialize};

/// Domain table a routed output lands in.
///
/// `Unknown` is a first-class destination: output whose shape matches no
/// table is recorded as unknown rather than discarded, so the task still
/// completes and the miss stays visible in the task history.
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
pub enum Destination {
    /// Cast and setting records
    #[display("entities")]
    Entities,
    /// Established facts about the show's world
    #[display("canon_facts")]
    CanonFacts,
    /// Standing rules the show's world obeys
    #[display("canon_rules")]
    CanonRules,
    /// Rivalries and tensions between entities
    #[display("conflicts")]
    Conflicts,
    /// Visual design prompts awaiting media generation
    #[display("blueprints")]
    Blueprints,
    /// Short promotional beats
    #[display("teasers")]
    Teasers,
    /// Episode scripts with shot lists
    #[display("scripts")]
    Scripts,
    /// Published episodes (written by the assembly pipeline)
    #[display("episodes")]
    Episodes,
    /// Shape matched no table
    #[display("unknown")]
    Unknown,
}

impl Destination {
    /// String representation used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Entities => "entities",
            Destination::CanonFacts => "canon_facts",
            Destination::CanonRules => "canon_rules",
            Destination::Conflicts => "conflicts",
            Destination::Blueprints => "blueprints",
            Destination::Teasers => "teasers",
            Destination::Scripts => "scripts",
            Destination::Episodes => "episodes",
            Destination::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entities" => Ok(Destination::Entities),
            "canon_facts" => Ok(Destination::CanonFacts),
            "canon_rules" => Ok(Destination::CanonRules),
            "conflicts" => Ok(Destination::Conflicts),
            "blueprints" => Ok(Destination::Blueprints),
            "teasers" => Ok(Destination::Teasers),
            "scripts" => Ok(Destination::Scripts),
            "episodes" => Ok(Destination::Episodes),
            "unknown" => Ok(Destination::Unknown),
            _ => Err(format!("Unknown destination: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_destination_round_trips_through_strings() {
        for destination in Destination::iter() {
            let parsed: Destination = destination.as_str().parse().unwrap();
            assert_eq!(parsed, destination);
        }
    }

    #[test]
    fn test_unrecognized_destination_errors() {
        assert!("wardrobe".parse::<Destination>().is_err());
    }
}
