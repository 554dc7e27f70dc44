//! Working graph built while ingesting a record stream
//!
//! Holds the uuid-keyed object and node indices, the owner→owned and
//! target→referrer reverse indices, and the missing-parent queue.

use super::pending::MissingParentQueue;
use crate::core::codec::embedded_uuids;
use crate::domain::{
    AttributeValue, ClassIdentifier, LocationSpec, NodeId, ObjectId, OwnerRef, PortableId,
    StoredNode, StoredObject, UpdateScope, Visibility,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Lifecycle of a node during one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Not in the destination yet
    New,
    /// Skeleton created in phase 1, content pending
    Created,
    /// Exists in the destination and is up to date
    Present,
    /// Exists in the destination and is never mutated
    Reference,
    /// Excluded from the run together with its subtree
    Removed,
}

/// Lifecycle of an object during one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStatus {
    New,
    Created,
    Present,
    Reference,
    Removed,
}

/// A location in the working tree
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub uuid: PortableId,
    pub parent_uuid: Option<PortableId>,
    pub object_uuid: Option<PortableId>,
    pub status: NodeStatus,
    /// Children in discovery order
    pub children: Vec<PortableId>,
    pub sort_by: String,
    pub priority: i32,
    pub visibility: Visibility,
    pub is_main: bool,
    pub original_uuid: PortableId,
    pub original_parent_uuid: Option<PortableId>,
    pub local_id: Option<NodeId>,
}

impl NodeRecord {
    /// Node that already exists in the destination and stays untouched
    pub fn reference(stored: &StoredNode, parent_uuid: Option<PortableId>) -> Self {
        Self {
            uuid: stored.uuid.clone(),
            parent_uuid: parent_uuid.clone(),
            object_uuid: None,
            status: NodeStatus::Reference,
            children: Vec::new(),
            sort_by: stored.sort_by.clone(),
            priority: stored.priority,
            visibility: stored.visibility,
            is_main: false,
            original_uuid: stored.uuid.clone(),
            original_parent_uuid: parent_uuid,
            local_id: Some(stored.id),
        }
    }

    pub fn add_child(&mut self, child: PortableId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn location_spec(&self) -> LocationSpec {
        LocationSpec {
            uuid: self.uuid.clone(),
            sort_by: self.sort_by.clone(),
            priority: self.priority,
            visibility: self.visibility,
        }
    }
}

/// Metadata cached for an object-level relation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationMeta {
    pub name: String,
    pub class: Option<String>,
}

/// One translation with decoded attribute values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkingTranslation {
    pub name: String,
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// A content object in the working graph
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub uuid: PortableId,
    pub original_uuid: PortableId,
    pub class: ClassIdentifier,
    pub status: ObjectStatus,
    pub owner: Option<OwnerRef>,
    pub main_language: Option<String>,
    pub translations: BTreeMap<String, WorkingTranslation>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub relations: BTreeMap<PortableId, RelationMeta>,
    pub locations: BTreeSet<PortableId>,
    pub main_node: Option<PortableId>,
    pub states: BTreeMap<String, String>,
    pub section: Option<String>,
    pub update_scope: UpdateScope,
    pub local_id: Option<ObjectId>,
    pub verified: bool,
    /// Phase 2 already ran for this object in this run
    pub filled: bool,
}

impl ObjectRecord {
    /// Object that exists in the destination but not in the bundle
    pub fn reference(stored: &StoredObject) -> Self {
        let translations = stored
            .translations
            .iter()
            .map(|(language, translation)| {
                (
                    language.clone(),
                    WorkingTranslation {
                        name: translation.name.clone(),
                        attributes: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            uuid: stored.uuid.clone(),
            original_uuid: stored.uuid.clone(),
            class: stored.class.clone(),
            status: ObjectStatus::Reference,
            owner: None,
            main_language: Some(stored.main_language.clone()),
            translations,
            attributes: BTreeMap::new(),
            relations: BTreeMap::new(),
            locations: BTreeSet::new(),
            main_node: None,
            states: stored.states.clone(),
            section: Some(stored.section.clone()),
            update_scope: UpdateScope::none(),
            local_id: Some(stored.id),
            verified: true,
            filled: true,
        }
    }

    /// Language used to seed the object on creation
    pub fn primary_language(&self) -> Option<&str> {
        match &self.main_language {
            Some(language) if self.translations.contains_key(language) => Some(language),
            _ => self.translations.keys().next().map(String::as_str),
        }
    }

    pub fn display_name(&self) -> &str {
        self.primary_language()
            .and_then(|language| self.translations.get(language))
            .map(|translation| translation.name.as_str())
            .unwrap_or("")
    }

    pub fn is_removed(&self) -> bool {
        self.status == ObjectStatus::Removed
    }

    /// Every attribute value, translated ones first
    pub fn attribute_values(&self) -> impl Iterator<Item = &AttributeValue> {
        self.translations
            .values()
            .flat_map(|translation| translation.attributes.values())
            .chain(self.attributes.values())
    }

    /// Every attribute value, mutably
    pub fn attribute_values_mut(&mut self) -> impl Iterator<Item = &mut AttributeValue> {
        self.translations
            .values_mut()
            .flat_map(|translation| translation.attributes.values_mut())
            .chain(self.attributes.values_mut())
    }

    /// Objects this record points at: owner, relations, relation
    /// attributes and rich text embeds
    pub fn referenced_objects(&self) -> BTreeSet<PortableId> {
        let mut targets: BTreeSet<PortableId> = self.relations.keys().cloned().collect();
        if let Some(owner) = &self.owner {
            targets.insert(owner.uuid.clone());
        }
        for value in self.attribute_values() {
            match value {
                AttributeValue::Relation(Some(target)) => {
                    targets.insert(target.clone());
                }
                AttributeValue::RelationList(list) => targets.extend(list.iter().cloned()),
                AttributeValue::RichText(text) => targets.extend(embedded_uuids(&text.markup)),
                _ => {}
            }
        }
        targets
    }
}

/// Object and node indices of one run
#[derive(Debug, Default)]
pub struct WorkingGraph {
    objects: BTreeMap<PortableId, ObjectRecord>,
    nodes: BTreeMap<PortableId, NodeRecord>,
    owned: HashMap<PortableId, BTreeSet<PortableId>>,
    referrers: HashMap<PortableId, BTreeSet<PortableId>>,
    pub pending: MissingParentQueue,
}

impl WorkingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, uuid: &PortableId) -> Option<&ObjectRecord> {
        self.objects.get(uuid)
    }

    pub fn object_mut(&mut self, uuid: &PortableId) -> Option<&mut ObjectRecord> {
        self.objects.get_mut(uuid)
    }

    pub fn contains_object(&self, uuid: &PortableId) -> bool {
        self.objects.contains_key(uuid)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.objects.values()
    }

    /// Indexes an object and its outgoing references
    pub fn insert_object(&mut self, record: ObjectRecord) {
        let uuid = record.uuid.clone();
        self.objects.insert(uuid.clone(), record);
        self.index_references(&uuid);
    }

    /// Refreshes the reverse indices for `uuid`
    ///
    /// Stale entries are kept; a sweep over a stale referrer is a no-op.
    pub fn index_references(&mut self, uuid: &PortableId) {
        let Some(record) = self.objects.get(uuid) else {
            return;
        };
        if let Some(owner) = &record.owner {
            self.owned
                .entry(owner.uuid.clone())
                .or_default()
                .insert(uuid.clone());
        }
        for target in record.referenced_objects() {
            self.referrers
                .entry(target)
                .or_default()
                .insert(uuid.clone());
        }
    }

    /// Objects owned by `owner`
    pub fn owned_by(&self, owner: &PortableId) -> BTreeSet<PortableId> {
        self.owned.get(owner).cloned().unwrap_or_default()
    }

    /// Objects referring to `target` in any way, owners included
    pub fn referrers_of(&self, target: &PortableId) -> BTreeSet<PortableId> {
        let mut referrers = self.referrers.get(target).cloned().unwrap_or_default();
        referrers.extend(self.owned_by(target));
        referrers
    }

    pub fn node(&self, uuid: &PortableId) -> Option<&NodeRecord> {
        self.nodes.get(uuid)
    }

    pub fn node_mut(&mut self, uuid: &PortableId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(uuid)
    }

    pub fn contains_node(&self, uuid: &PortableId) -> bool {
        self.nodes.contains_key(uuid)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Indexes a node, links it to its parent or parks it in the
    /// missing-parent queue, then adopts children already waiting on it
    ///
    /// Replacing a placeholder keeps the children already linked below it.
    pub fn insert_node(&mut self, mut node: NodeRecord) {
        let uuid = node.uuid.clone();
        let parent = node.parent_uuid.clone();
        if let Some(existing) = self.nodes.remove(&uuid) {
            for child in existing.children {
                node.add_child(child);
            }
        }
        self.nodes.insert(uuid.clone(), node);

        if let Some(parent) = parent {
            self.link(&parent, uuid.clone());
        }

        let waiting = self.pending.resolve(&uuid);
        if let Some(node) = self.nodes.get_mut(&uuid) {
            for child in waiting {
                node.add_child(child);
            }
        }
    }

    /// Attaches `child` below `parent`, or queues it when the parent is unknown
    pub fn link(&mut self, parent: &PortableId, child: PortableId) {
        match self.nodes.get_mut(parent) {
            Some(parent_node) => parent_node.add_child(child),
            None => self.pending.wait(parent.clone(), child),
        }
    }

    /// Moves `child` under `new_parent`
    pub fn reparent(&mut self, child: &PortableId, new_parent: &PortableId) {
        let old_parent = self
            .nodes
            .get(child)
            .and_then(|node| node.parent_uuid.clone());
        if let Some(old_parent) = old_parent {
            if let Some(node) = self.nodes.get_mut(&old_parent) {
                node.children.retain(|uuid| uuid != child);
            }
        }
        self.pending.forget(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent_uuid = Some(new_parent.clone());
        }
        self.link(new_parent, child.clone());
    }

    /// Entry points of the verify and sync walks: nodes whose parent is not
    /// part of the graph, excluding nodes still waiting on a parent
    pub fn start_nodes(&self) -> Vec<PortableId> {
        let waiting: BTreeSet<&PortableId> = self
            .pending
            .pending()
            .flat_map(|(_, children)| children.iter())
            .collect();
        self.nodes
            .values()
            .filter(|node| match &node.parent_uuid {
                None => true,
                Some(parent) => !self.nodes.contains_key(parent),
            })
            .filter(|node| !waiting.contains(&node.uuid))
            .map(|node| node.uuid.clone())
            .collect()
    }

    /// Nodes of the subtree rooted at `root`, pre-order, root included
    pub fn subtree(&self, root: &PortableId) -> Vec<PortableId> {
        let mut order = Vec::new();
        let mut stack = vec![root.clone()];
        let mut seen = BTreeSet::new();
        while let Some(uuid) = stack.pop() {
            if !seen.insert(uuid.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&uuid) {
                stack.extend(node.children.iter().rev().cloned());
            }
            order.push(uuid);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> PortableId {
        PortableId::new(value).unwrap()
    }

    fn node(uuid: &str, parent: &str) -> NodeRecord {
        NodeRecord {
            uuid: id(uuid),
            parent_uuid: Some(id(parent)),
            object_uuid: None,
            status: NodeStatus::New,
            children: Vec::new(),
            sort_by: "path".to_string(),
            priority: 0,
            visibility: Visibility::Visible,
            is_main: true,
            original_uuid: id(uuid),
            original_parent_uuid: Some(id(parent)),
            local_id: None,
        }
    }

    #[test]
    fn test_child_before_parent_is_adopted() {
        let mut graph = WorkingGraph::new();
        graph.insert_node(node("child", "p"));
        assert!(graph.pending.is_waiting_on(&id("p")));

        graph.insert_node(node("p", "root"));
        assert!(!graph.pending.is_waiting_on(&id("p")));
        assert_eq!(graph.node(&id("p")).unwrap().children, vec![id("child")]);
    }

    #[test]
    fn test_parent_before_child_links_directly() {
        let mut graph = WorkingGraph::new();
        graph.insert_node(node("p", "root"));
        graph.insert_node(node("child", "p"));
        assert_eq!(graph.node(&id("p")).unwrap().children, vec![id("child")]);
        assert!(!graph.pending.is_waiting_on(&id("p")));
    }

    fn root() -> NodeRecord {
        NodeRecord {
            parent_uuid: None,
            original_parent_uuid: None,
            status: NodeStatus::Reference,
            ..node("root", "root")
        }
    }

    #[test]
    fn test_start_nodes_exclude_orphans() {
        let mut graph = WorkingGraph::new();
        graph.insert_node(root());
        graph.insert_node(node("a", "root"));
        graph.insert_node(node("orphan", "missing"));
        assert_eq!(graph.start_nodes(), vec![id("root")]);
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut graph = WorkingGraph::new();
        graph.insert_node(root());
        graph.insert_node(node("start", "root"));
        graph.insert_node(node("orphan", "missing"));
        graph.reparent(&id("orphan"), &id("start"));

        assert!(graph.pending.is_empty());
        assert_eq!(graph.node(&id("start")).unwrap().children, vec![id("orphan")]);
        assert_eq!(
            graph.node(&id("orphan")).unwrap().parent_uuid,
            Some(id("start"))
        );
    }

    #[test]
    fn test_replacing_placeholder_keeps_children() {
        let mut graph = WorkingGraph::new();
        graph.insert_node(NodeRecord {
            parent_uuid: None,
            status: NodeStatus::Reference,
            ..node("p", "root")
        });
        graph.insert_node(node("child", "p"));
        graph.insert_node(node("p", "root"));

        let parent = graph.node(&id("p")).unwrap();
        assert_eq!(parent.status, NodeStatus::New);
        assert_eq!(parent.children, vec![id("child")]);
    }

    #[test]
    fn test_subtree_is_pre_order() {
        let mut graph = WorkingGraph::new();
        graph.insert_node(node("a", "root"));
        graph.insert_node(node("b", "a"));
        graph.insert_node(node("c", "b"));
        graph.insert_node(node("d", "a"));
        assert_eq!(
            graph.subtree(&id("a")),
            vec![id("a"), id("b"), id("c"), id("d")]
        );
    }
}
