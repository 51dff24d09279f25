use std::fmt;

use arbor_layout::geometry;
use arbor_layout::kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Stable node identity, allocated by the tree model
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fields needed to create a node
#[derive(Clone, Debug, PartialEq)]
pub struct NewNode {
    pub name: String,
    /// Palette template this node was made from
    pub type_tag: String,
    pub color: String,
    pub draggable: bool,
    pub accepts_children: bool,
}

impl NewNode {
    pub fn new(
        name: impl Into<String>,
        type_tag: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            color: color.into(),
            draggable: true,
            accepts_children: true,
        }
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn accepts_children(mut self, accepts_children: bool) -> Self {
        self.accepts_children = accepts_children;
        self
    }
}

// Positioned tree node. Links are only ever changed by `TreeModel`.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) type_tag: String,
    pub(crate) color: String,
    pub(crate) draggable: bool,
    pub(crate) accepts_children: bool,
    // Top-left anchor in canvas space (written by layout)
    pub(crate) position: Point,
    // Rendered size reported by the host
    pub(crate) size: Size,
    // Relation only: never followed to free anything
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn from_spec(id: NodeId, spec: NewNode, size: Size) -> Self {
        Self {
            id,
            name: spec.name,
            type_tag: spec.type_tag,
            color: spec.color,
            draggable: spec.draggable,
            accepts_children: spec.accepts_children,
            position: Point::ZERO,
            size,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn accepts_children(&self) -> bool {
        self.accepts_children
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn rect(&self) -> Rect {
        geometry::node_rect(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }
}
