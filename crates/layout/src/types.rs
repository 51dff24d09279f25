use std::fmt::Debug;
use std::hash::Hash;

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A child list names a node the tree cannot size
    #[error("unknown node {0}")]
    UnknownNode(String),
    /// The child lists loop back onto an ancestor
    #[error("cycle detected at node {0}")]
    CycleDetected(String),
}

/// Trait for tree structures the layout engine can position.
///
/// The engine only reads links through `root`/`children` and only writes
/// through `set_position`.
pub trait LayoutTree {
    type Id: Copy + Eq + Hash + Debug;

    fn root(&self) -> Option<Self::Id>;
    /// Ordered children, left to right
    fn children(&self, id: Self::Id) -> &[Self::Id];
    /// Rendered size of the node's box, `None` if the id is unknown
    fn rendered_size(&self, id: Self::Id) -> Option<Size>;
    /// Top-left anchor in canvas space
    fn set_position(&mut self, id: Self::Id, position: Point);
}

/// Spacing parameters for the two-pass tree layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Fixed box width used for subtree width accounting
    pub node_width: f64,
    /// Default box height for nodes whose content has not been measured
    pub node_height: f64,
    /// Gap between adjacent sibling subtrees
    pub horizontal_spacing: f64,
    /// Gap between a parent's bottom edge and its children's top edge
    pub vertical_margin: f64,
    /// Center x of the root box
    pub root_x: f64,
    /// Top y of the root box
    pub root_y: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 150.0,
            node_height: 60.0,
            horizontal_spacing: 40.0,
            vertical_margin: 80.0,
            root_x: 0.0,
            root_y: 50.0,
        }
    }
}

impl LayoutConfig {
    pub fn default_size(&self) -> Size {
        Size::new(self.node_width, self.node_height)
    }
}

/// Control point parameters for parent to child connection curves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurveConfig {
    pub vertical_ratio: f64,
    pub horizontal_ratio: f64,
    pub vertical_cap: f64,
    pub horizontal_cap: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            vertical_ratio: 0.6,
            horizontal_ratio: 0.3,
            vertical_cap: 120.0,
            horizontal_cap: 80.0,
        }
    }
}
