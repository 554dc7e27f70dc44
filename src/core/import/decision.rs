//! Decision points of an import run
//!
//! Missing references, overwrites of existing objects, structural conflicts
//! and orphaned subtrees are decided through [`Decision`]. Headless runs use
//! [`PolicyDecision`]; interactive runs ask on stdin through
//! [`PromptDecision`].

use crate::config::ImportConfig;
use crate::domain::{ConflictPolicy, MissingReferencePolicy, PortableId, ReferenceKind};
use std::io::{self, BufRead, Write};

/// Answer for a reference whose target cannot be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDecision {
    /// Remove the reference and remember the target as removed
    Drop,
    Abort,
}

/// Answer for nodes whose parent never appeared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanDecision {
    /// Attach the orphaned subtrees below the start node
    Reparent,
    Abort,
}

/// An existing node found under a different parent than the bundle declares
#[derive(Debug, Clone)]
pub struct StructuralConflict<'a> {
    pub node: &'a PortableId,
    pub object_name: &'a str,
    pub current_parent: Option<&'a PortableId>,
    pub declared_parent: &'a PortableId,
}

/// Decision callbacks consulted by the importer
///
/// Implementations have no side effects beyond returning a choice.
pub trait Decision: Send + Sync {
    fn missing_reference(
        &self,
        kind: ReferenceKind,
        referrer: &PortableId,
        target: &PortableId,
    ) -> ReferenceDecision;

    /// Whether an object that already exists in the destination may be
    /// overwritten
    fn confirm_overwrite(&self, uuid: &PortableId, name: &str) -> bool;

    fn structural_conflict(&self, conflict: &StructuralConflict<'_>) -> ConflictPolicy;

    fn orphans(&self, parents: &[PortableId], count: usize) -> OrphanDecision;
}

/// Fixed answers taken from configuration
#[derive(Debug, Clone, Default)]
pub struct PolicyDecision {
    pub missing_reference: MissingReferencePolicy,
    pub overwrite_existing: bool,
    pub structural_conflict: ConflictPolicy,
    pub reparent_orphans: bool,
}

impl PolicyDecision {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            missing_reference: config.missing_reference,
            overwrite_existing: config.overwrite_existing,
            structural_conflict: config.structural_conflict,
            reparent_orphans: config.reparent_orphans,
        }
    }
}

impl Decision for PolicyDecision {
    fn missing_reference(
        &self,
        _kind: ReferenceKind,
        _referrer: &PortableId,
        _target: &PortableId,
    ) -> ReferenceDecision {
        match self.missing_reference {
            MissingReferencePolicy::Remove => ReferenceDecision::Drop,
            MissingReferencePolicy::Abort => ReferenceDecision::Abort,
        }
    }

    fn confirm_overwrite(&self, _uuid: &PortableId, _name: &str) -> bool {
        self.overwrite_existing
    }

    fn structural_conflict(&self, _conflict: &StructuralConflict<'_>) -> ConflictPolicy {
        self.structural_conflict
    }

    fn orphans(&self, _parents: &[PortableId], _count: usize) -> OrphanDecision {
        if self.reparent_orphans {
            OrphanDecision::Reparent
        } else {
            OrphanDecision::Abort
        }
    }
}

/// Asks the operator on stdin
///
/// Falls back to the configured policy when stdin cannot be read.
#[derive(Debug, Clone, Default)]
pub struct PromptDecision {
    fallback: PolicyDecision,
}

impl PromptDecision {
    pub fn new(fallback: PolicyDecision) -> Self {
        Self { fallback }
    }

    fn ask(&self, question: &str, choices: &str) -> Option<String> {
        print!("{question} [{choices}]: ");
        io::stdout().flush().ok()?;
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input).ok()?;
        Some(input.trim().to_lowercase())
    }
}

impl Decision for PromptDecision {
    fn missing_reference(
        &self,
        kind: ReferenceKind,
        referrer: &PortableId,
        target: &PortableId,
    ) -> ReferenceDecision {
        let question = format!("{referrer}: {kind} '{target}' not found. Remove the reference?");
        match self.ask(&question, "Y/n") {
            Some(answer) if answer == "n" => ReferenceDecision::Abort,
            Some(_) => ReferenceDecision::Drop,
            None => self.fallback.missing_reference(kind, referrer, target),
        }
    }

    fn confirm_overwrite(&self, uuid: &PortableId, name: &str) -> bool {
        let question = format!("'{name}' ({uuid}) already exists. Overwrite?");
        match self.ask(&question, "y/N") {
            Some(answer) => answer == "y",
            None => self.fallback.confirm_overwrite(uuid, name),
        }
    }

    fn structural_conflict(&self, conflict: &StructuralConflict<'_>) -> ConflictPolicy {
        let current = conflict
            .current_parent
            .map(ToString::to_string)
            .unwrap_or_else(|| "<none>".to_string());
        let question = format!(
            "'{}' ({}) is located under {} but the bundle places it under {}. Keep, move or abort?",
            conflict.object_name, conflict.node, current, conflict.declared_parent
        );
        match self.ask(&question, "K/m/a").as_deref() {
            Some("m") => ConflictPolicy::Move,
            Some("a") => ConflictPolicy::Abort,
            Some(_) => ConflictPolicy::Keep,
            None => self.fallback.structural_conflict(conflict),
        }
    }

    fn orphans(&self, parents: &[PortableId], count: usize) -> OrphanDecision {
        let listed: Vec<String> = parents.iter().map(ToString::to_string).collect();
        let question = format!(
            "{count} node(s) wait on missing parent(s) {}. Reparent under the start node?",
            listed.join(", ")
        );
        match self.ask(&question, "y/N") {
            Some(answer) if answer == "y" => OrphanDecision::Reparent,
            Some(_) => OrphanDecision::Abort,
            None => self.fallback.orphans(parents, count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> PortableId {
        PortableId::new(value).unwrap()
    }

    #[test]
    fn test_policy_decision_defaults() {
        let decision = PolicyDecision::default();
        assert_eq!(
            decision.missing_reference(ReferenceKind::Owner, &id("a"), &id("b")),
            ReferenceDecision::Drop
        );
        assert!(!decision.confirm_overwrite(&id("a"), "A"));
        assert_eq!(decision.orphans(&[id("p")], 1), OrphanDecision::Abort);
    }

    #[test]
    fn test_policy_decision_from_config() {
        let config = ImportConfig {
            missing_reference: MissingReferencePolicy::Abort,
            overwrite_existing: true,
            structural_conflict: ConflictPolicy::Move,
            reparent_orphans: true,
            ..ImportConfig::default()
        };
        let decision = PolicyDecision::from_config(&config);
        let conflict = StructuralConflict {
            node: &id("n"),
            object_name: "Home",
            current_parent: None,
            declared_parent: &id("p"),
        };

        assert_eq!(
            decision.missing_reference(ReferenceKind::Embed, &id("a"), &id("b")),
            ReferenceDecision::Abort
        );
        assert!(decision.confirm_overwrite(&id("a"), "A"));
        assert_eq!(decision.structural_conflict(&conflict), ConflictPolicy::Move);
        assert_eq!(decision.orphans(&[], 0), OrphanDecision::Reparent);
    }
}
