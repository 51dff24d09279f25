use std::time::{Duration, Instant};

use arbor_layout::kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::node::{NewNode, NodeId};
use crate::tree::TreeModel;
use crate::viewport::Camera;

/// Template a new node can be dragged out of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteItem {
    pub type_tag: String,
    pub name: String,
    pub color: String,
    #[serde(default = "default_true")]
    pub draggable: bool,
    #[serde(default = "default_true")]
    pub accepts_children: bool,
}

fn default_true() -> bool {
    true
}

impl PaletteItem {
    pub fn new(
        type_tag: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: name.into(),
            color: color.into(),
            draggable: true,
            accepts_children: true,
        }
    }

    pub fn to_new_node(&self) -> NewNode {
        NewNode::new(&self.name, &self.type_tag, &self.color)
            .draggable(self.draggable)
            .accepts_children(self.accepts_children)
    }
}

/// What a gesture carries
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    Palette(PaletteItem),
    Node(NodeId),
}

impl DragSource {
    fn label<'a>(&'a self, tree: &'a TreeModel) -> &'a str {
        match self {
            Self::Palette(item) => &item.name,
            Self::Node(id) => tree.get(*id).map(|n| n.name()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    /// Pressed on a source, threshold not yet exceeded
    Armed,
    Dragging,
    /// Released over a target, waiting for the host verdict
    Resolving,
}

/// Floating preview following the pointer, in viewport space
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    pub position: Point,
    pub label: String,
}

/// Dragged entity as the host sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropSubject {
    Node(NodeId),
    TypeTag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropTicket(u64);

/// A drop awaiting host validation
#[derive(Debug, Clone, PartialEq)]
pub struct DropRequest {
    pub ticket: DropTicket,
    pub subject: DropSubject,
    /// `None` only for a palette drop that creates the root
    pub target: Option<NodeId>,
    /// Insertion index under the target, `None` appends
    pub position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    /// Threshold exceeded, ghost shown
    Started,
    /// Highlighted drop target changed
    Hover(Option<NodeId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    /// Press and release without a drag
    Click(DragSource),
    /// Needs a host verdict before anything changes
    Resolve(DropRequest),
    /// Released without a valid target
    Cancelled,
    /// No gesture was active
    Ignored,
}

/// Pointer gesture state machine for palette and node drags.
///
/// Only one gesture exists at a time; presses are ignored until the
/// current one is back to `Idle`.
#[derive(Debug)]
pub struct DragController {
    phase: DragPhase,
    source: Option<DragSource>,
    down_point: Point,
    pointer: Point,
    hover: Option<NodeId>,
    last_poll: Option<Instant>,
    pending: Option<DropRequest>,
    next_ticket: u64,
    threshold: f64,
    poll_interval: Duration,
}

impl DragController {
    pub fn new(threshold: f64, poll_interval: Duration) -> Self {
        Self {
            phase: DragPhase::Idle,
            source: None,
            down_point: Point::ZERO,
            pointer: Point::ZERO,
            hover: None,
            last_poll: None,
            pending: None,
            next_ticket: 1,
            threshold,
            poll_interval,
        }
    }

    pub fn set_limits(&mut self, threshold: f64, poll_interval: Duration) {
        self.threshold = threshold;
        self.poll_interval = poll_interval;
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn source(&self) -> Option<&DragSource> {
        self.source.as_ref()
    }

    /// Highlighted drop target, at most one
    pub fn hover(&self) -> Option<NodeId> {
        self.hover
    }

    pub fn pending(&self) -> Option<&DropRequest> {
        self.pending.as_ref()
    }

    pub fn ghost(&self, tree: &TreeModel) -> Option<Ghost> {
        match self.phase {
            DragPhase::Dragging | DragPhase::Resolving => self.source.as_ref().map(|source| Ghost {
                position: self.pointer,
                label: source.label(tree).to_string(),
            }),
            _ => None,
        }
    }

    /// Arm a gesture. Returns false when the press is ignored.
    pub fn pointer_down(&mut self, source: DragSource, point: Point, tree: &TreeModel) -> bool {
        if self.phase != DragPhase::Idle {
            tracing::debug!(phase = ?self.phase, "press ignored while a gesture is active");
            return false;
        }
        if let DragSource::Node(id) = &source {
            match tree.get(*id) {
                Some(node) if node.is_draggable() => {}
                _ => return false,
            }
        }
        self.phase = DragPhase::Armed;
        self.source = Some(source);
        self.down_point = point;
        self.pointer = point;
        self.hover = None;
        self.last_poll = None;
        true
    }

    pub fn pointer_move(
        &mut self,
        point: Point,
        now: Instant,
        tree: &TreeModel,
        camera: &Camera,
    ) -> Option<DragEvent> {
        match self.phase {
            DragPhase::Armed => {
                self.pointer = point;
                if (point - self.down_point).hypot() <= self.threshold {
                    return None;
                }
                self.phase = DragPhase::Dragging;
                self.poll(now, tree, camera);
                Some(DragEvent::Started)
            }
            DragPhase::Dragging => {
                self.pointer = point;
                let due = self
                    .last_poll
                    .is_none_or(|last| now.saturating_duration_since(last) >= self.poll_interval);
                if !due {
                    return None;
                }
                let previous = self.hover;
                self.poll(now, tree, camera);
                (previous != self.hover).then_some(DragEvent::Hover(self.hover))
            }
            DragPhase::Idle | DragPhase::Resolving => None,
        }
    }

    /// Finish the gesture. A valid release suspends in `Resolving`.
    pub fn pointer_up(&mut self, point: Point, tree: &TreeModel, camera: &Camera) -> Release {
        match self.phase {
            DragPhase::Armed => {
                let source = self.source.take();
                self.reset();
                source.map_or(Release::Ignored, Release::Click)
            }
            DragPhase::Dragging => {
                self.pointer = point;
                self.hover = self.target_at(point, tree, camera);
                let Some(source) = self.source.as_ref() else {
                    self.reset();
                    return Release::Ignored;
                };
                let subject = match source {
                    DragSource::Palette(item) => DropSubject::TypeTag(item.type_tag.clone()),
                    DragSource::Node(id) => DropSubject::Node(*id),
                };
                let root_drop = matches!(source, DragSource::Palette(_)) && tree.root().is_none();
                if self.hover.is_none() && !root_drop {
                    self.reset();
                    return Release::Cancelled;
                }

                let ticket = DropTicket(self.next_ticket);
                self.next_ticket += 1;
                let canvas_point = camera.to_canvas(point);
                let request = DropRequest {
                    ticket,
                    subject,
                    target: self.hover,
                    position: self.hover.and_then(|t| drop_index(tree, t, canvas_point)),
                };
                self.phase = DragPhase::Resolving;
                self.pending = Some(request.clone());
                Release::Resolve(request)
            }
            DragPhase::Idle | DragPhase::Resolving => Release::Ignored,
        }
    }

    /// Abort an armed or dragging gesture. A resolving one cannot be cancelled.
    pub fn pointer_cancel(&mut self) -> bool {
        match self.phase {
            DragPhase::Armed | DragPhase::Dragging => {
                self.reset();
                true
            }
            DragPhase::Idle | DragPhase::Resolving => false,
        }
    }

    /// Leave `Resolving` for `ticket`, handing back its request and source.
    /// Stale tickets leave the state untouched.
    pub fn finish(&mut self, ticket: DropTicket) -> Option<(DropRequest, DragSource)> {
        if self.phase != DragPhase::Resolving
            || self.pending.as_ref().map(|p| p.ticket) != Some(ticket)
        {
            return None;
        }
        let request = self.pending.take();
        let source = self.source.take();
        self.reset();
        request.zip(source)
    }

    pub fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.source = None;
        self.hover = None;
        self.last_poll = None;
        self.pending = None;
    }

    fn poll(&mut self, now: Instant, tree: &TreeModel, camera: &Camera) {
        self.last_poll = Some(now);
        self.hover = self.target_at(self.pointer, tree, camera);
    }

    fn target_at(&self, point: Point, tree: &TreeModel, camera: &Camera) -> Option<NodeId> {
        let source = self.source.as_ref()?;
        let target = tree.node_at(camera.to_canvas(point))?;
        is_valid_target(source, target, tree).then_some(target)
    }
}

/// Local drop rules: not the source itself, not inside its subtree,
/// not its current parent, and the target must accept children
pub fn is_valid_target(source: &DragSource, target: NodeId, tree: &TreeModel) -> bool {
    let Some(target_node) = tree.get(target) else {
        return false;
    };
    if let DragSource::Node(dragged) = source {
        if *dragged == target
            || tree.is_descendant(*dragged, target)
            || tree.parent(*dragged) == Some(target)
        {
            return false;
        }
    }
    target_node.accepts_children()
}

// Children are laid out left to right, so the slot is the count of
// children whose center lies left of the pointer
fn drop_index(tree: &TreeModel, target: NodeId, point: Point) -> Option<usize> {
    let children = tree.children(target)?;
    let index = children
        .iter()
        .filter_map(|&c| tree.get(c))
        .take_while(|c| c.center().x < point.x)
        .count();
    Some(index)
}
