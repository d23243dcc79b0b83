//! Runtime origins and the live runtime handle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an expression runtime is installed from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A development build served from the local machine
    Local,
    /// A published release, by version tag
    TaggedRelease(String),
    /// A build of a named source branch
    Branch(String),
}

impl Origin {
    /// The origin installed at start, before the version manifest is read
    pub fn latest() -> Self {
        Origin::TaggedRelease("latest".into())
    }

    /// Interpret a manifest tag: `local` selects the development build
    pub fn parse(tag: &str) -> Self {
        match tag {
            "local" => Origin::Local,
            other => Origin::TaggedRelease(other.to_string()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Origin::Local)
    }

    /// Short label for display next to the version selector
    pub fn label(&self) -> String {
        match self {
            Origin::Local => "** Local **".to_string(),
            Origin::TaggedRelease(tag) => format!("@{}", tag),
            Origin::Branch(branch) => format!("** {} **", branch),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::TaggedRelease(tag) => write!(f, "release {}", tag),
            Origin::Branch(branch) => write!(f, "branch {}", branch),
        }
    }
}

/// Snapshot of the live runtime slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeHandle {
    pub origin: Origin,
    /// Increments on every install; a newer generation supersedes older ones
    pub generation: u64,
    /// The runtime finished loading and accepts evaluations
    pub loaded: bool,
    /// The runtime can call host bindings
    pub bindings_available: bool,
    /// Why the last install of this generation failed, if it did
    pub load_error: Option<String>,
}

impl RuntimeHandle {
    pub fn pending(origin: Origin, generation: u64) -> Self {
        Self {
            origin,
            generation,
            loaded: false,
            bindings_available: false,
            load_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_tag() {
        assert_eq!(Origin::parse("local"), Origin::Local);
        assert_eq!(Origin::parse("1.8.6"), Origin::TaggedRelease("1.8.6".into()));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Origin::Local.label(), "** Local **");
        assert_eq!(Origin::TaggedRelease("2.0.3".into()).label(), "@2.0.3");
        assert_eq!(Origin::Branch("next".into()).label(), "** next **");
    }
}
