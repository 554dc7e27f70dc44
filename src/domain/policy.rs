//! Import policies
//!
//! Fixed answers for the decision points of an import run. Headless runs
//! supply all of them up front through configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What to do when a reference cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingReferencePolicy {
    /// Drop the reference and remember the target as removed
    #[default]
    Remove,
    /// Stop the run
    Abort,
}

impl FromStr for MissingReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remove" | "drop" => Ok(Self::Remove),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "Invalid missing_reference policy '{other}'. Expected 'remove' or 'abort'"
            )),
        }
    }
}

/// What to do with a present node that sits under a different parent than
/// the bundle declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave the node where it is
    #[default]
    Keep,
    /// Move the node under the declared parent
    Move,
    /// Stop the run
    Abort,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "move" => Ok(Self::Move),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "Invalid structural_conflict policy '{other}'. Expected 'keep', 'move' or 'abort'"
            )),
        }
    }
}

/// Aspect of an already-present object an import may overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAspect {
    /// Names, owner, section and states
    Object,
    /// Field values
    Attribute,
    /// Object relations
    Relation,
    /// Ordering and visibility of locations
    Location,
}

impl FromStr for UpdateAspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "object" => Ok(Self::Object),
            "attribute" | "attributes" => Ok(Self::Attribute),
            "relation" | "relations" => Ok(Self::Relation),
            "location" | "locations" => Ok(Self::Location),
            other => Err(format!("Invalid update scope aspect '{other}'")),
        }
    }
}

impl fmt::Display for UpdateAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "object",
            Self::Attribute => "attribute",
            Self::Relation => "relation",
            Self::Location => "location",
        };
        f.write_str(name)
    }
}

/// Set of aspects an import may overwrite on a present object
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateScope(BTreeSet<UpdateAspect>);

impl UpdateScope {
    /// Nothing is overwritten
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Every aspect is written, as for newly created objects
    pub fn all() -> Self {
        Self(
            [
                UpdateAspect::Object,
                UpdateAspect::Attribute,
                UpdateAspect::Relation,
                UpdateAspect::Location,
            ]
            .into_iter()
            .collect(),
        )
    }

    pub fn contains(&self, aspect: UpdateAspect) -> bool {
        self.0.contains(&aspect)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UpdateAspect> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<UpdateAspect> for UpdateScope {
    fn from_iter<I: IntoIterator<Item = UpdateAspect>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for UpdateScope {
    type Err = String;

    /// Parses a comma-separated list, e.g. `attribute,relation`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_scope_from_str() {
        let scope: UpdateScope = "attribute, relation".parse().unwrap();
        assert!(scope.contains(UpdateAspect::Attribute));
        assert!(scope.contains(UpdateAspect::Relation));
        assert!(!scope.contains(UpdateAspect::Location));

        assert!("".parse::<UpdateScope>().unwrap().is_empty());
        assert!("attribute,owner".parse::<UpdateScope>().is_err());
    }

    #[test]
    fn test_update_scope_serde() {
        let scope: UpdateScope = serde_json::from_str(r#"["object", "location"]"#).unwrap();
        assert_eq!(scope.iter().count(), 2);
        assert!(scope.contains(UpdateAspect::Object));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "ABORT".parse::<MissingReferencePolicy>().unwrap(),
            MissingReferencePolicy::Abort
        );
        assert_eq!("move".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Move);
        assert!("ask".parse::<ConflictPolicy>().is_err());
    }
}
