use std::collections::{BTreeMap, HashMap, HashSet};

use arbor_layout::geometry;
use arbor_layout::kurbo::{Point, Size};
use arbor_layout::{LayoutConfig, LayoutTree};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::node::{NewNode, Node, NodeId};
use crate::snapshot::{NodeRecord, TreeSnapshot};

/// Whether promote/demote may rotate a node through the root
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationPolicy {
    /// Root identity is never replaced by a rotation
    #[default]
    ProtectRoot,
    /// A child of the root may be promoted into the root slot, and the root
    /// may be demoted below its first child
    AllowRootRotation,
}

/// Result of a successful `move_node`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    pub node: NodeId,
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
    pub index: usize,
}

/// Flat id-indexed store of nodes forming a single-root tree.
///
/// All link changes go through the methods here. Every failing operation
/// leaves the model untouched.
#[derive(Clone, Debug)]
pub struct TreeModel {
    nodes: BTreeMap<NodeId, Node>,
    root: Option<NodeId>,
    next_id: u64,
    default_size: Size,
    rotation: RotationPolicy,
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new(LayoutConfig::default().default_size())
    }
}

impl TreeModel {
    pub fn new(default_size: Size) -> Self {
        Self {
            nodes: BTreeMap::new(),
            root: None,
            next_id: 1,
            default_size,
            rotation: RotationPolicy::default(),
        }
    }

    pub fn with_rotation_policy(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        self.rotation
    }

    pub fn set_rotation_policy(&mut self, rotation: RotationPolicy) {
        self.rotation = rotation;
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&id).map(|n| n.children.as_slice())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Create a node under `parent` at `position` (clamped; `None` appends).
    ///
    /// A parentless add is only accepted while the tree has no root.
    pub fn add(
        &mut self,
        spec: NewNode,
        parent: Option<NodeId>,
        position: Option<usize>,
    ) -> Result<NodeId, TreeError> {
        for (field, value) in [
            ("name", &spec.name),
            ("type_tag", &spec.type_tag),
            ("color", &spec.color),
        ] {
            if value.trim().is_empty() {
                return Err(TreeError::InvalidArgument { field });
            }
        }

        match parent {
            None => {
                if let Some(root) = self.root {
                    return Err(TreeError::RootExists(root));
                }
            }
            Some(p) if !self.contains(p) => return Err(TreeError::UnknownNode(p)),
            Some(_) => {}
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        let mut node = Node::from_spec(id, spec, self.default_size);
        node.parent = parent;
        self.nodes.insert(id, node);

        match parent {
            Some(p) => {
                if let Some(parent) = self.nodes.get_mut(&p) {
                    let index = clamp_index(position, parent.children.len());
                    parent.children.insert(index, id);
                }
            }
            None => self.root = Some(id),
        }
        Ok(id)
    }

    /// Reparent `id` under `new_parent` at `position` (clamped; `None` appends).
    ///
    /// `new_parent == None` is only accepted for the root itself, which is a no-op.
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        position: Option<usize>,
    ) -> Result<MoveRecord, TreeError> {
        let node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let from = node.parent;

        let Some(target) = new_parent else {
            return match self.root {
                Some(root) if root == id => Ok(MoveRecord {
                    node: id,
                    from: None,
                    to: None,
                    index: 0,
                }),
                Some(root) => Err(TreeError::RootExists(root)),
                None => Err(TreeError::corrupted(format!("node {id} exists without a root"))),
            };
        };

        if target == id {
            return Err(TreeError::SelfParent(id));
        }
        if !self.contains(target) {
            return Err(TreeError::UnknownNode(target));
        }
        if self.ancestors_checked(target)?.contains(&id) {
            return Err(TreeError::WouldCycle { node: id, target });
        }

        self.detach(id);
        let parent = self
            .nodes
            .get_mut(&target)
            .ok_or(TreeError::UnknownNode(target))?;
        let index = clamp_index(position, parent.children.len());
        parent.children.insert(index, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(target);
        }

        Ok(MoveRecord {
            node: id,
            from,
            to: Some(target),
            index,
        })
    }

    /// Move `id` to `index` among its current siblings
    pub fn reorder(&mut self, id: NodeId, index: usize) -> Result<MoveRecord, TreeError> {
        let node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let parent = node.parent.ok_or(TreeError::IsRoot(id))?;
        self.move_node(id, Some(parent), Some(index))
    }

    /// Remove `id` and its whole subtree. Returns the removed ids in pre-order.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownNode(id));
        }
        let removed = self.subtree(id);
        self.detach(id);
        for victim in &removed {
            self.nodes.remove(victim);
        }
        if self.root == Some(id) {
            self.root = None;
        }
        Ok(removed)
    }

    /// Rotate `id` above its parent.
    ///
    /// The parent becomes the first child of `id`, followed by the former
    /// siblings of `id`; the former children of `id` move to the parent.
    pub fn promote(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let parent_id = node.parent.ok_or(TreeError::IsRoot(id))?;
        let parent = self
            .nodes
            .get(&parent_id)
            .ok_or_else(|| TreeError::corrupted(format!("parent {parent_id} of {id} is missing")))?;
        let grandparent = parent.parent;
        if grandparent.is_none() && self.rotation == RotationPolicy::ProtectRoot {
            return Err(TreeError::ParentIsRoot(id));
        }

        // Snapshot the three groups before touching any link
        let siblings: Vec<NodeId> = parent.children.iter().copied().filter(|&c| c != id).collect();
        let own_children = node.children.clone();
        let slot = match grandparent {
            Some(g) => Some(self.child_index(g, parent_id)?),
            None => None,
        };

        match (grandparent, slot) {
            (Some(g), Some(slot)) => {
                if let Some(g) = self.nodes.get_mut(&g) {
                    g.children[slot] = id;
                }
            }
            _ => self.root = Some(id),
        }

        let mut promoted_children = Vec::with_capacity(siblings.len() + 1);
        promoted_children.push(parent_id);
        promoted_children.extend_from_slice(&siblings);
        self.relink(id, grandparent, promoted_children);
        self.relink(parent_id, Some(id), own_children.clone());
        for s in siblings {
            self.set_parent(s, id);
        }
        for k in own_children {
            self.set_parent(k, parent_id);
        }
        Ok(())
    }

    /// Rotate `id` below its first child, the inverse of `promote`
    pub fn demote(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let parent = node.parent;
        if parent.is_none() && self.rotation == RotationPolicy::ProtectRoot {
            return Err(TreeError::IsRoot(id));
        }
        let pivot_id = *node.children.first().ok_or(TreeError::NoChildren(id))?;
        let rest: Vec<NodeId> = node.children[1..].to_vec();
        let pivot_children = self
            .nodes
            .get(&pivot_id)
            .map(|p| p.children.clone())
            .ok_or_else(|| TreeError::corrupted(format!("child {pivot_id} of {id} is missing")))?;
        let slot = match parent {
            Some(p) => Some(self.child_index(p, id)?),
            None => None,
        };

        match (parent, slot) {
            (Some(p), Some(slot)) => {
                if let Some(p) = self.nodes.get_mut(&p) {
                    p.children[slot] = pivot_id;
                }
            }
            _ => self.root = Some(pivot_id),
        }

        let mut pivot_new_children = Vec::with_capacity(rest.len() + 1);
        pivot_new_children.push(id);
        pivot_new_children.extend_from_slice(&rest);
        self.relink(pivot_id, parent, pivot_new_children);
        self.relink(id, Some(pivot_id), pivot_children.clone());
        for r in rest {
            self.set_parent(r, pivot_id);
        }
        for k in pivot_children {
            self.set_parent(k, id);
        }
        Ok(())
    }

    /// True if `ancestor` lies on the parent chain of `node`.
    ///
    /// Corrupted chains (cycles, dangling parents) are logged and treated as absent.
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        match self.ancestors_checked(node) {
            Ok(chain) => chain.contains(&ancestor),
            Err(err) => {
                tracing::warn!(%ancestor, %node, %err, "ancestry walk aborted");
                false
            }
        }
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.ancestors_checked(id).unwrap_or_else(|err| {
            tracing::warn!(node = %id, %err, "ancestry walk aborted");
            Vec::new()
        })
    }

    /// Parent chain of `id`, failing on cycles or dangling parent links
    pub fn ancestors_checked(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut current = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?.parent;
        while let Some(p) = current {
            if !seen.insert(p) {
                return Err(TreeError::corrupted(format!("cycle through {p} above {id}")));
            }
            let parent = self
                .nodes
                .get(&p)
                .ok_or_else(|| TreeError::corrupted(format!("orphaned parent {p} above {id}")))?;
            chain.push(p);
            current = parent.parent;
        }
        Ok(chain)
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.ancestors_checked(id).ok().map(|chain| chain.len())
    }

    /// `id` followed by all of its descendants in pre-order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                tracing::warn!(node = %current, "revisited node while walking subtree");
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                tracing::warn!(node = %current, "dangling child reference skipped");
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// All descendants of `id` in pre-order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut all = self.subtree(id);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Every node reachable from the root, in pre-order
    pub fn pre_order(&self) -> Vec<NodeId> {
        self.root.map(|r| self.subtree(r)).unwrap_or_default()
    }

    /// Top-most node whose box contains the canvas point
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        // Later pre-order nodes paint over earlier ones
        self.pre_order()
            .into_iter()
            .rev()
            .find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| geometry::point_in_rect(point, n.rect()))
            })
    }

    pub fn set_draggable(&mut self, id: NodeId, draggable: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.draggable = draggable;
        Ok(())
    }

    pub fn set_accepts_children(&mut self, id: NodeId, accepts: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.accepts_children = accepts;
        Ok(())
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), TreeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TreeError::InvalidArgument { field: "name" });
        }
        self.node_mut(id)?.name = name;
        Ok(())
    }

    pub fn set_color(&mut self, id: NodeId, color: impl Into<String>) -> Result<(), TreeError> {
        let color = color.into();
        if color.trim().is_empty() {
            return Err(TreeError::InvalidArgument { field: "color" });
        }
        self.node_mut(id)?.color = color;
        Ok(())
    }

    /// Record the rendered size of a node's content
    pub fn set_size(&mut self, id: NodeId, size: Size) -> Result<(), TreeError> {
        self.node_mut(id)?.size = size;
        Ok(())
    }

    /// Check the four structural invariants
    pub fn validate(&self) -> Result<(), TreeError> {
        let parentless: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect();
        match (self.root, parentless.as_slice()) {
            (None, []) if self.nodes.is_empty() => {}
            (Some(root), [only]) if root == *only => {}
            (Some(root), _) if !self.nodes.contains_key(&root) => {
                return Err(TreeError::corrupted(format!("root {root} is not a live node")));
            }
            _ => {
                return Err(TreeError::corrupted(format!(
                    "expected exactly the root to be parentless, found {parentless:?} with root {:?}",
                    self.root
                )));
            }
        }

        for node in self.nodes.values() {
            if let Some(p) = node.parent {
                let parent = self.nodes.get(&p).ok_or_else(|| {
                    TreeError::corrupted(format!("orphaned parent {p} on {}", node.id))
                })?;
                let count = parent.children.iter().filter(|&&c| c == node.id).count();
                if count != 1 {
                    return Err(TreeError::corrupted(format!(
                        "{} listed {count} times under parent {p}",
                        node.id
                    )));
                }
            }
            for &child in &node.children {
                let child_node = self.nodes.get(&child).ok_or_else(|| {
                    TreeError::corrupted(format!("dangling child {child} under {}", node.id))
                })?;
                if child_node.parent != Some(node.id) {
                    return Err(TreeError::corrupted(format!(
                        "{child} is listed under {} but its parent is {:?}",
                        node.id, child_node.parent
                    )));
                }
            }
            self.ancestors_checked(node.id)?;
        }
        Ok(())
    }

    /// Deep copy of the topology in the serialized tree format
    pub fn export_snapshot(&self) -> TreeSnapshot {
        let mut order = self.pre_order();
        let reached: HashSet<NodeId> = order.iter().copied().collect();
        order.extend(self.nodes.keys().copied().filter(|id| !reached.contains(id)));

        let nodes = order
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .map(|n| NodeRecord {
                id: n.id,
                name: n.name.clone(),
                type_tag: n.type_tag.clone(),
                color: n.color.clone(),
                parent_id: n.parent,
                children_ids: n.children.clone(),
                is_draggable: n.draggable,
                can_have_children: n.accepts_children,
            })
            .collect();

        TreeSnapshot {
            root_node_id: self.root,
            nodes,
        }
    }

    /// Replace the whole model with `snapshot`.
    ///
    /// The snapshot is fully loaded and validated into a fresh model first;
    /// on failure the current model is kept as it was.
    pub fn import_snapshot(&mut self, snapshot: &TreeSnapshot) -> Result<(), TreeError> {
        let mut fresh = Self::new(self.default_size).with_rotation_policy(self.rotation);

        for record in &snapshot.nodes {
            if fresh.nodes.contains_key(&record.id) {
                return Err(TreeError::corrupted(format!("duplicate node id {}", record.id)));
            }
            for (field, value) in [
                ("Name", &record.name),
                ("ComponentId", &record.type_tag),
                ("Color", &record.color),
            ] {
                if value.trim().is_empty() {
                    let message = format!("{} has an empty {field}", record.id);
                    return Err(TreeError::corrupted(message));
                }
            }
            let spec = NewNode::new(&record.name, &record.type_tag, &record.color)
                .draggable(record.is_draggable)
                .accepts_children(record.can_have_children);
            fresh
                .nodes
                .insert(record.id, Node::from_spec(record.id, spec, self.default_size));
        }

        // Child lists are authoritative for both membership and order
        let mut parent_of: HashMap<NodeId, NodeId> = HashMap::new();
        for record in &snapshot.nodes {
            let mut children = Vec::with_capacity(record.children_ids.len());
            for &child in &record.children_ids {
                if child == record.id {
                    return Err(TreeError::corrupted(format!("{child} lists itself as a child")));
                }
                if !fresh.nodes.contains_key(&child) {
                    tracing::warn!(parent = %record.id, %child, "dropping dangling child reference");
                    continue;
                }
                if let Some(previous) = parent_of.insert(child, record.id) {
                    return Err(TreeError::corrupted(format!(
                        "{child} listed under both {previous} and {}",
                        record.id
                    )));
                }
                children.push(child);
            }
            if let Some(node) = fresh.nodes.get_mut(&record.id) {
                node.children = children;
            }
        }

        for record in &snapshot.nodes {
            let derived = parent_of.get(&record.id).copied();
            if record.parent_id != derived {
                tracing::warn!(
                    node = %record.id,
                    declared = ?record.parent_id,
                    derived = ?derived,
                    "parent reference disagrees with child lists, using child lists"
                );
            }
            if let Some(node) = fresh.nodes.get_mut(&record.id) {
                node.parent = derived;
            }
        }

        fresh.root = snapshot.root_node_id;
        if let Some(root) = fresh.root {
            if !fresh.nodes.contains_key(&root) {
                return Err(TreeError::corrupted(format!("root {root} is not in the snapshot")));
            }
        }
        fresh.validate()?;

        fresh.next_id = fresh.nodes.keys().map(|id| id.0 + 1).max().unwrap_or(1);
        *self = fresh;
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        self.nodes
            .get(&parent)
            .and_then(|p| p.children.iter().position(|&c| c == child))
            .ok_or_else(|| TreeError::corrupted(format!("{child} missing from children of {parent}")))
    }

    // Unlink `id` from its parent's child list, keeping sibling order
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    fn relink(&mut self, id: NodeId, parent: Option<NodeId>, children: Vec<NodeId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
            node.children = children;
        }
    }

    fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
    }
}

impl LayoutTree for TreeModel {
    type Id = NodeId;

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn rendered_size(&self, id: NodeId) -> Option<Size> {
        self.nodes.get(&id).map(|n| n.size)
    }

    fn set_position(&mut self, id: NodeId, position: Point) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = position;
        }
    }
}

fn clamp_index(position: Option<usize>, len: usize) -> usize {
    position.map_or(len, |p| p.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn spec(name: &str) -> NewNode {
        NewNode::new(name, "task", "#88aacc")
    }

    fn names(tree: &TreeModel, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| tree.get(*id).unwrap().name().to_string())
            .collect()
    }

    /// A -> [B, C], B -> [D]
    fn sample() -> (TreeModel, [NodeId; 4]) {
        let mut tree = TreeModel::default();
        let a = tree.add(spec("A"), None, None).unwrap();
        let b = tree.add(spec("B"), Some(a), None).unwrap();
        let c = tree.add(spec("C"), Some(a), None).unwrap();
        let d = tree.add(spec("D"), Some(b), None).unwrap();
        (tree, [a, b, c, d])
    }

    #[test]
    fn test_first_parentless_add_becomes_root() {
        let mut tree = TreeModel::default();
        let a = tree.add(spec("A"), None, None).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), Some(a));
        assert_eq!(tree.get(a).unwrap().name(), "A");
    }

    #[test]
    fn test_second_parentless_add_rejected() {
        let mut tree = TreeModel::default();
        let a = tree.add(spec("A"), None, None).unwrap();
        assert_eq!(
            tree.add(spec("B"), None, None),
            Err(TreeError::RootExists(a))
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_add_rejects_empty_fields() {
        let mut tree = TreeModel::default();
        assert_eq!(
            tree.add(NewNode::new("", "task", "red"), None, None),
            Err(TreeError::InvalidArgument { field: "name" })
        );
        assert_eq!(
            tree.add(NewNode::new("A", " ", "red"), None, None),
            Err(TreeError::InvalidArgument { field: "type_tag" })
        );
        assert_eq!(
            tree.add(NewNode::new("A", "task", ""), None, None),
            Err(TreeError::InvalidArgument { field: "color" })
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_add_at_position() {
        let mut tree = TreeModel::default();
        let a = tree.add(spec("A"), None, None).unwrap();
        let b = tree.add(spec("B"), Some(a), None).unwrap();
        let c = tree.add(spec("C"), Some(a), Some(0)).unwrap();
        assert_eq!(tree.children(a).unwrap(), &[c, b]);
        // Past the end appends
        let d = tree.add(spec("D"), Some(a), Some(99)).unwrap();
        assert_eq!(tree.children(a).unwrap(), &[c, b, d]);
    }

    #[test]
    fn test_add_under_unknown_parent() {
        let mut tree = TreeModel::default();
        tree.add(spec("A"), None, None).unwrap();
        assert_eq!(
            tree.add(spec("B"), Some(NodeId(77)), None),
            Err(TreeError::UnknownNode(NodeId(77)))
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_move_rejects_cycle() {
        let (mut tree, [a, b, _, d]) = sample();
        let before = tree.export_snapshot();
        assert_eq!(
            tree.move_node(a, Some(b), None),
            Err(TreeError::WouldCycle { node: a, target: b })
        );
        assert_eq!(
            tree.move_node(b, Some(d), None),
            Err(TreeError::WouldCycle { node: b, target: d })
        );
        assert_eq!(tree.move_node(b, Some(b), None), Err(TreeError::SelfParent(b)));
        assert_eq!(tree.export_snapshot(), before);
    }

    #[test]
    fn test_move_unknown_ids() {
        let (mut tree, [a, ..]) = sample();
        assert_eq!(
            tree.move_node(NodeId(99), Some(a), None),
            Err(TreeError::UnknownNode(NodeId(99)))
        );
        assert_eq!(
            tree.move_node(a, Some(NodeId(99)), None),
            Err(TreeError::UnknownNode(NodeId(99)))
        );
    }

    #[test]
    fn test_move_relinks() {
        let (mut tree, [a, b, c, d]) = sample();
        let record = tree.move_node(d, Some(c), None).unwrap();
        assert_eq!(record.from, Some(b));
        assert_eq!(record.to, Some(c));
        assert_eq!(tree.children(b).unwrap(), &[] as &[NodeId]);
        assert_eq!(tree.children(c).unwrap(), &[d]);
        assert_eq!(tree.parent(d), Some(c));

        tree.move_node(d, Some(a), Some(1)).unwrap();
        assert_eq!(tree.children(a).unwrap(), &[b, d, c]);
        tree.validate().unwrap();
    }

    #[test]
    fn test_move_parentless_only_for_root() {
        let (mut tree, [a, b, ..]) = sample();
        assert!(tree.move_node(a, None, None).is_ok());
        assert_eq!(tree.move_node(b, None, None), Err(TreeError::RootExists(a)));
    }

    #[test]
    fn test_reorder_within_parent() {
        let (mut tree, [a, b, c, _]) = sample();
        tree.reorder(c, 0).unwrap();
        assert_eq!(tree.children(a).unwrap(), &[c, b]);
        assert_eq!(tree.reorder(a, 0), Err(TreeError::IsRoot(a)));
    }

    #[test]
    fn test_remove_cascades() {
        let (mut tree, [a, b, c, d]) = sample();
        let removed = tree.remove(b).unwrap();
        assert_eq!(removed, vec![b, d]);
        assert_eq!(tree.children(a).unwrap(), &[c]);
        assert!(!tree.contains(d));

        let removed = tree.remove(a).unwrap();
        assert_eq!(removed, vec![a, c]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.remove(a), Err(TreeError::UnknownNode(a)));
    }

    #[test]
    fn test_remove_root_of_three() {
        let mut tree = TreeModel::default();
        let a = tree.add(spec("A"), None, None).unwrap();
        tree.add(spec("B"), Some(a), None).unwrap();
        tree.add(spec("C"), Some(a), None).unwrap();
        assert_eq!(tree.remove(a).unwrap().len(), 3);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn test_promote_blocked_next_to_root() {
        let (mut tree, [a, b, _, d]) = sample();
        assert_eq!(tree.promote(a), Err(TreeError::IsRoot(a)));
        assert_eq!(tree.promote(b), Err(TreeError::ParentIsRoot(b)));
        // D's parent B is not the root
        assert!(tree.promote(d).is_ok());
        tree.validate().unwrap();
    }

    #[test]
    fn test_promote_through_root_when_allowed() {
        let (mut tree, [a, b, c, d]) = sample();
        tree.set_rotation_policy(RotationPolicy::AllowRootRotation);
        tree.promote(b).unwrap();
        assert_eq!(tree.root(), Some(b));
        assert_eq!(tree.children(b).unwrap(), &[a, c]);
        assert_eq!(tree.children(a).unwrap(), &[d]);
        assert_eq!(tree.parent(d), Some(a));
        assert_eq!(tree.parent(c), Some(b));
        tree.validate().unwrap();
    }

    #[test]
    fn test_promote_keeps_grandparent_slot() {
        // R -> [X, P, Y], P -> [S1, N, S2], N -> [K]
        let mut tree = TreeModel::default();
        let r = tree.add(spec("R"), None, None).unwrap();
        let x = tree.add(spec("X"), Some(r), None).unwrap();
        let p = tree.add(spec("P"), Some(r), None).unwrap();
        let y = tree.add(spec("Y"), Some(r), None).unwrap();
        let s1 = tree.add(spec("S1"), Some(p), None).unwrap();
        let n = tree.add(spec("N"), Some(p), None).unwrap();
        let s2 = tree.add(spec("S2"), Some(p), None).unwrap();
        let k = tree.add(spec("K"), Some(n), None).unwrap();

        tree.promote(n).unwrap();
        assert_eq!(tree.children(r).unwrap(), &[x, n, y]);
        assert_eq!(names(&tree, tree.children(n).unwrap()), ["P", "S1", "S2"]);
        assert_eq!(tree.children(p).unwrap(), &[k]);
        assert_eq!(tree.parent(s1), Some(n));
        assert_eq!(tree.parent(s2), Some(n));
        assert_eq!(tree.len(), 8);
        tree.validate().unwrap();
    }

    #[test]
    fn test_demote_rules() {
        let (mut tree, [a, b, c, _]) = sample();
        assert_eq!(tree.demote(a), Err(TreeError::IsRoot(a)));
        assert_eq!(tree.demote(c), Err(TreeError::NoChildren(c)));
        tree.demote(b).unwrap();
        tree.validate().unwrap();
    }

    #[test]
    fn test_demote_root_when_allowed() {
        let (mut tree, [a, b, c, d]) = sample();
        tree.set_rotation_policy(RotationPolicy::AllowRootRotation);
        tree.demote(a).unwrap();
        assert_eq!(tree.root(), Some(b));
        assert_eq!(tree.children(b).unwrap(), &[a, c]);
        assert_eq!(tree.children(a).unwrap(), &[d]);
        tree.validate().unwrap();
    }

    #[test]
    fn test_promote_demote_inverse() {
        let mut tree = TreeModel::default();
        let r = tree.add(spec("R"), None, None).unwrap();
        let p = tree.add(spec("P"), Some(r), None).unwrap();
        let n = tree.add(spec("N"), Some(p), None).unwrap();
        tree.add(spec("S"), Some(p), None).unwrap();
        tree.add(spec("K1"), Some(n), None).unwrap();
        tree.add(spec("K2"), Some(n), None).unwrap();
        let before = tree.export_snapshot();

        tree.promote(n).unwrap();
        tree.demote(n).unwrap();
        assert_eq!(tree.export_snapshot(), before);

        tree.demote(n).unwrap();
        tree.promote(n).unwrap();
        assert_eq!(tree.export_snapshot(), before);
    }

    #[test]
    fn test_is_descendant() {
        let (tree, [a, b, c, d]) = sample();
        assert!(tree.is_descendant(a, d));
        assert!(tree.is_descendant(b, d));
        assert!(!tree.is_descendant(c, d));
        assert!(!tree.is_descendant(d, a));
        assert!(!tree.is_descendant(d, d));
    }

    #[traced_test]
    #[test]
    fn test_is_descendant_short_circuits_on_cycle() {
        let (mut tree, [a, b, _, d]) = sample();
        // Corrupt the links directly: A's parent is D
        tree.nodes.get_mut(&a).unwrap().parent = Some(d);
        assert!(!tree.is_descendant(NodeId(99), b));
        assert!(logs_contain("ancestry walk aborted"));
        assert!(matches!(tree.validate(), Err(TreeError::Corrupted(_))));
        assert!(matches!(
            tree.move_node(d, Some(b), None),
            Err(TreeError::Corrupted(_))
        ));
    }

    #[traced_test]
    #[test]
    fn test_orphaned_parent_treated_as_absent() {
        let (mut tree, [_, b, _, d]) = sample();
        tree.nodes.get_mut(&b).unwrap().parent = Some(NodeId(500));
        assert!(!tree.is_descendant(NodeId(500), d));
        assert!(tree.ancestors(d).is_empty());
        assert!(logs_contain("orphaned parent"));
    }

    #[test]
    fn test_node_at_prefers_topmost() {
        let (mut tree, [a, b, c, d]) = sample();
        tree.set_position(a, Point::new(0.0, 0.0));
        tree.set_position(b, Point::new(10.0, 10.0));
        tree.set_position(c, Point::new(1000.0, 0.0));
        tree.set_position(d, Point::new(2000.0, 0.0));
        assert_eq!(tree.node_at(Point::new(20.0, 20.0)), Some(b));
        assert_eq!(tree.node_at(Point::new(5.0, 5.0)), Some(a));
        assert_eq!(tree.node_at(Point::new(-5.0, -5.0)), None);
    }

    #[test]
    fn test_flags() {
        let (mut tree, [a, ..]) = sample();
        tree.set_draggable(a, false).unwrap();
        tree.set_accepts_children(a, false).unwrap();
        let node = tree.get(a).unwrap();
        assert!(!node.is_draggable());
        assert!(!node.accepts_children());
        assert_eq!(
            tree.set_draggable(NodeId(42), true),
            Err(TreeError::UnknownNode(NodeId(42)))
        );
    }

    #[test]
    fn test_snapshot_fixed_point() {
        let (tree, _) = sample();
        let exported = tree.export_snapshot();
        let mut other = TreeModel::default();
        other.import_snapshot(&exported).unwrap();
        assert_eq!(other.export_snapshot(), exported);
        assert_eq!(other.root(), tree.root());
    }

    #[test]
    fn test_import_resumes_id_allocation() {
        let (tree, [_, _, c, _]) = sample();
        let mut other = TreeModel::default();
        other.import_snapshot(&tree.export_snapshot()).unwrap();
        let e = other.add(spec("E"), Some(c), None).unwrap();
        assert_eq!(e, NodeId(5));
    }

    #[test]
    fn test_import_rejects_second_parent() {
        let (mut tree, [a, b, c, d]) = sample();
        let mut snapshot = tree.export_snapshot();
        let record = snapshot.nodes.iter_mut().find(|r| r.id == c).unwrap();
        record.children_ids.push(d);
        let before = tree.export_snapshot();
        assert!(matches!(
            tree.import_snapshot(&snapshot),
            Err(TreeError::Corrupted(_))
        ));
        assert_eq!(tree.export_snapshot(), before);
        assert_eq!(tree.children(a).unwrap(), &[b, c]);
    }

    #[test]
    fn test_import_rejects_cycle() {
        let (mut tree, [a, b, _, d]) = sample();
        let mut snapshot = tree.export_snapshot();
        // Detach B from A and close the loop B -> D -> B
        for record in &mut snapshot.nodes {
            if record.id == a {
                record.children_ids.retain(|&c| c != b);
            }
            if record.id == d {
                record.children_ids.push(b);
            }
        }
        assert!(matches!(
            tree.import_snapshot(&snapshot),
            Err(TreeError::Corrupted(_))
        ));
        assert_eq!(tree.len(), 4);
    }

    #[traced_test]
    #[test]
    fn test_import_drops_dangling_children() {
        let (tree, [a, ..]) = sample();
        let mut snapshot = tree.export_snapshot();
        snapshot.nodes[0].children_ids.push(NodeId(1234));
        let mut other = TreeModel::default();
        other.import_snapshot(&snapshot).unwrap();
        assert_eq!(other.children(a).unwrap().len(), 2);
        assert!(logs_contain("dropping dangling child reference"));
    }

    #[test]
    fn test_import_empty_snapshot_clears() {
        let (mut tree, _) = sample();
        tree.import_snapshot(&TreeSnapshot::default()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn test_import_rejects_blank_fields() {
        let (mut tree, [_, b, ..]) = sample();
        let before = tree.export_snapshot();
        for field in 0..3 {
            let mut snapshot = before.clone();
            let record = snapshot.nodes.iter_mut().find(|r| r.id == b).unwrap();
            match field {
                0 => record.name = String::new(),
                1 => record.type_tag = "  ".to_string(),
                _ => record.color = String::new(),
            }
            assert!(matches!(
                tree.import_snapshot(&snapshot),
                Err(TreeError::Corrupted(_))
            ));
            assert_eq!(tree.export_snapshot(), before);
        }
    }
}
