use std::collections::BTreeMap;

use arbor_layout::kurbo::{CubicBez, Rect};
use arbor_layout::{CurveConfig, connection_curve, reversed};

use crate::node::NodeId;
use crate::tree::TreeModel;

/// Curve for one parent to child edge
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub parent: NodeId,
    pub child: NodeId,
    pub curve: CubicBez,
    parent_rect: Rect,
    child_rect: Rect,
}

/// Edges touched by a sync, keyed by child id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDiff {
    pub added: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl ConnectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Keeps one curve per edge in step with node geometry.
///
/// A node has at most one incoming edge, so edges are keyed by the child.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRenderer {
    edges: BTreeMap<NodeId, Connection>,
    curve: CurveConfig,
}

impl ConnectionRenderer {
    pub fn new(curve: CurveConfig) -> Self {
        Self {
            edges: BTreeMap::new(),
            curve,
        }
    }

    /// Changing the curve shape forces every edge to be rebuilt on the next sync
    pub fn set_curve_config(&mut self, curve: CurveConfig) {
        if self.curve != curve {
            self.curve = curve;
            for edge in self.edges.values_mut() {
                edge.parent_rect = Rect::ZERO;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn get(&self, child: NodeId) -> Option<&Connection> {
        self.edges.get(&child)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.edges.values()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Bring the edge set in line with the tree's links and positions
    pub fn sync(&mut self, tree: &TreeModel) -> ConnectionDiff {
        let mut diff = ConnectionDiff::default();

        self.edges.retain(|&child, edge| {
            let keep = tree.parent(child) == Some(edge.parent);
            if !keep {
                diff.removed.push(child);
            }
            keep
        });

        for node in tree.iter() {
            let Some(parent_id) = node.parent() else {
                continue;
            };
            let Some(parent) = tree.get(parent_id) else {
                continue;
            };
            let parent_rect = parent.rect();
            let child_rect = node.rect();
            match self.edges.get_mut(&node.id()) {
                Some(edge) => {
                    if edge.parent_rect != parent_rect || edge.child_rect != child_rect {
                        edge.curve = connection_curve(parent_rect, child_rect, &self.curve);
                        edge.parent_rect = parent_rect;
                        edge.child_rect = child_rect;
                        diff.updated.push(node.id());
                    }
                }
                None => {
                    // A reparented node shows up as removed and added in one diff
                    self.edges.insert(
                        node.id(),
                        Connection {
                            parent: parent_id,
                            child: node.id(),
                            curve: connection_curve(parent_rect, child_rect, &self.curve),
                            parent_rect,
                            child_rect,
                        },
                    );
                    diff.added.push(node.id());
                }
            }
        }

        if !diff.is_empty() {
            tracing::trace!(
                added = diff.added.len(),
                updated = diff.updated.len(),
                removed = diff.removed.len(),
                "connections synced"
            );
        }
        diff
    }

    /// Curve walked from `from` to the adjacent node `to`
    pub fn segment(&self, from: NodeId, to: NodeId) -> Option<CubicBez> {
        if let Some(edge) = self.edges.get(&to).filter(|e| e.parent == from) {
            return Some(edge.curve);
        }
        self.edges
            .get(&from)
            .filter(|e| e.parent == to)
            .map(|e| reversed(e.curve))
    }
}
