use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Category of a recorded action.
///
/// Each collaborator subsystem reports under its own category; per-category
/// counts are what the dashboard overview displays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Module,
    Domain,
    Node,
    Hub,
    Equipment,
    System,
    User,
}

impl ActionType {
    /// All categories, in canonical order.
    pub const ALL: [ActionType; 7] = [
        Self::Module,
        Self::Domain,
        Self::Node,
        Self::Hub,
        Self::Equipment,
        Self::System,
        Self::User,
    ];

    /// Stable lowercase name. This string is part of the canonical hash
    /// encoding and must never change for an existing variant.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Domain => "domain",
            Self::Node => "node",
            Self::Hub => "hub",
            Self::Equipment => "equipment",
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = TypeError;

    /// Parses the lowercase name; the plural forms used by the dashboard
    /// tabs (`nodes`, `modules`, ...) are accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let singular = normalized.strip_suffix('s').unwrap_or(&normalized);
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized || t.as_str() == singular)
            .ok_or_else(|| TypeError::UnknownActionType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_singular_and_plural() {
        assert_eq!("node".parse::<ActionType>().unwrap(), ActionType::Node);
        assert_eq!("nodes".parse::<ActionType>().unwrap(), ActionType::Node);
        assert_eq!("Equipment".parse::<ActionType>().unwrap(), ActionType::Equipment);
        assert_eq!(" hub ".parse::<ActionType>().unwrap(), ActionType::Hub);
    }

    #[test]
    fn parse_unknown_fails() {
        let err = "vault".parse::<ActionType>().unwrap_err();
        assert_eq!(err, TypeError::UnknownActionType("vault".into()));
        assert!("".parse::<ActionType>().is_err());
    }

    #[test]
    fn display_matches_as_str() {
        for t in ActionType::ALL {
            assert_eq!(t.to_string(), t.as_str());
            assert_eq!(t.as_str().parse::<ActionType>().unwrap(), t);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ActionType::Equipment).unwrap();
        assert_eq!(json, "\"equipment\"");
        let parsed: ActionType = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, ActionType::System);
    }
}
