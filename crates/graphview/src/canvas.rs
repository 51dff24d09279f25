use std::fmt;
use std::time::{Duration, Instant};

use arbor_layout::TreeLayout;
use arbor_layout::kurbo::{Point, Size, Vec2};
use futures::future::LocalBoxFuture;

use crate::animator::{FlowOptions, MarkerFrame, MarkerId, PathAnimator, find_path};
use crate::config::CanvasConfig;
use crate::connections::{ConnectionDiff, ConnectionRenderer};
use crate::drag::{
    DragController, DragEvent, DragPhase, DragSource, DropRequest, DropTicket, Ghost, PaletteItem,
    Release, is_valid_target,
};
use crate::error::{CanvasError, Result, TreeError};
use crate::host::{CanvasEvent, CanvasHost, NullHost};
use crate::node::{NewNode, NodeId};
use crate::scheduler::{FrameScheduler, LoopId};
use crate::snapshot::TreeSnapshot;
use crate::tree::{MoveRecord, TreeModel};
use crate::viewport::{Camera, ViewportController};

/// Result of releasing the pointer
pub enum PointerUp {
    /// Press and release on a node without dragging; the node is now selected
    Click(NodeId),
    /// A drop is waiting for the host verdict
    Pending(PendingDrop),
    /// The drag ended without a valid target
    Cancelled,
    /// A pan gesture ended, possibly gliding on
    PanEnded,
    Ignored,
}

/// A drop suspended on host validation
pub struct PendingDrop {
    request: DropRequest,
    verdict: LocalBoxFuture<'static, anyhow::Result<bool>>,
}

impl fmt::Debug for PendingDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDrop")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl PendingDrop {
    pub fn request(&self) -> &DropRequest {
        &self.request
    }

    /// Await the host. A failed validation call counts as a rejection.
    pub async fn wait(self) -> DropVerdict {
        let accepted = match self.verdict.await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "drop validation failed, rejecting");
                false
            }
        };
        DropVerdict {
            ticket: self.request.ticket,
            accepted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropVerdict {
    pub ticket: DropTicket,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Created(NodeId),
    Moved(MoveRecord),
    /// Vetoed by the host or no longer valid; nothing changed
    Rejected,
    /// The commit itself failed; nothing changed
    Failed(TreeError),
    /// The ticket does not belong to the pending drop
    Stale,
}

/// State to draw after one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub camera: Camera,
    pub markers: Vec<MarkerFrame>,
    /// Whether the host should schedule another tick
    pub needs_frame: bool,
}

#[derive(Debug, Clone, Copy)]
struct PanGesture {
    last: Point,
    velocity: Vec2,
}

/// One interactive diagram: the tree plus every controller acting on it.
///
/// All topology operations run mutation, layout, connection sync and camera
/// policy in that order and end with a single host notification.
pub struct Canvas {
    config: CanvasConfig,
    tree: TreeModel,
    layout: TreeLayout<NodeId>,
    connections: ConnectionRenderer,
    viewport: ViewportController,
    drag: DragController,
    animator: PathAnimator,
    scheduler: FrameScheduler,
    host: Option<Box<dyn CanvasHost>>,
    selected: Option<NodeId>,
    pan: Option<PanGesture>,
    press: Option<(NodeId, Point)>,
    disposed: bool,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("nodes", &self.tree.len())
            .field("camera", &self.viewport.camera())
            .field("drag", &self.drag.phase())
            .field("selected", &self.selected)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    pub fn new(config: CanvasConfig, viewport: Size, host: impl CanvasHost + 'static) -> Self {
        let config = config.validate();
        let tree = TreeModel::new(config.layout.default_size())
            .with_rotation_policy(config.rotation_policy());
        Self {
            layout: TreeLayout::new(config.layout),
            connections: ConnectionRenderer::new(config.curve),
            viewport: ViewportController::new(&config, viewport),
            drag: DragController::new(
                config.drag_threshold,
                Duration::from_millis(config.hover_poll_ms),
            ),
            animator: PathAnimator::new(),
            scheduler: FrameScheduler::new(),
            host: Some(Box::new(host)),
            selected: None,
            pan: None,
            press: None,
            disposed: false,
            tree,
            config,
        }
    }

    /// Canvas whose host accepts every drop and ignores notifications
    pub fn headless(config: CanvasConfig, viewport: Size) -> Self {
        Self::new(config, viewport, NullHost)
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn camera(&self) -> Camera {
        self.viewport.camera()
    }

    pub fn connections(&self) -> &ConnectionRenderer {
        &self.connections
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag.phase()
    }

    pub fn drop_target(&self) -> Option<NodeId> {
        self.drag.hover()
    }

    pub fn ghost(&self) -> Option<Ghost> {
        self.drag.ghost(&self.tree)
    }

    pub fn markers(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.animator.ids()
    }

    pub fn needs_frame(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(CanvasError::Disposed);
        }
        Ok(())
    }

    pub fn set_config(&mut self, config: CanvasConfig) -> Result<()> {
        self.ensure_live()?;
        let config = config.validate();
        let auto_zoom_changed = config.auto_zoom != self.config.auto_zoom;
        self.tree.set_rotation_policy(config.rotation_policy());
        self.layout.set_config(config.layout);
        self.connections.set_curve_config(config.curve);
        self.viewport.set_config(&config);
        self.drag.set_limits(
            config.drag_threshold,
            Duration::from_millis(config.hover_poll_ms),
        );
        self.config = config;
        self.relayout();
        self.apply_camera_policy();
        if auto_zoom_changed {
            self.notify(CanvasEvent::AutoZoomChanged {
                enabled: self.config.auto_zoom,
            });
        }
        Ok(())
    }

    pub fn set_auto_zoom(&mut self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        if self.config.auto_zoom == enabled {
            return Ok(());
        }
        self.config.auto_zoom = enabled;
        if enabled {
            self.apply_camera_policy();
        }
        self.notify(CanvasEvent::AutoZoomChanged { enabled });
        Ok(())
    }

    pub fn set_auto_center(&mut self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        if self.config.auto_center == enabled {
            return Ok(());
        }
        self.config.auto_center = enabled;
        if enabled {
            self.apply_camera_policy();
        }
        Ok(())
    }

    pub fn set_viewport_size(&mut self, size: Size) -> Result<()> {
        self.ensure_live()?;
        self.viewport.set_viewport_size(size);
        self.apply_camera_policy();
        Ok(())
    }

    // Topology

    pub fn add_node(
        &mut self,
        spec: NewNode,
        parent: Option<NodeId>,
        position: Option<usize>,
    ) -> Result<NodeId> {
        self.ensure_live()?;
        let id = self.tree.add(spec, parent, position)?;
        self.debug_op("add", id);
        self.after_topology();
        self.notify(CanvasEvent::NodeAdded { id, parent });
        Ok(id)
    }

    pub fn move_node(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        position: Option<usize>,
    ) -> Result<MoveRecord> {
        self.ensure_live()?;
        let record = self.tree.move_node(id, parent, position)?;
        self.debug_op("move", id);
        self.after_topology();
        self.notify_moved(record);
        Ok(record)
    }

    pub fn reorder(&mut self, id: NodeId, index: usize) -> Result<MoveRecord> {
        self.ensure_live()?;
        let record = self.tree.reorder(id, index)?;
        self.debug_op("reorder", id);
        self.after_topology();
        self.notify_moved(record);
        Ok(record)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        self.ensure_live()?;
        let removed = self.tree.remove(id)?;
        self.debug_op("remove", id);
        self.forget(&removed);
        self.after_topology();
        self.notify(CanvasEvent::NodeRemoved {
            ids: removed.clone(),
        });
        Ok(removed)
    }

    pub fn promote(&mut self, id: NodeId) -> Result<()> {
        self.ensure_live()?;
        self.tree.promote(id)?;
        self.debug_op("promote", id);
        self.after_topology();
        self.notify(CanvasEvent::NodePromoted { id });
        Ok(())
    }

    pub fn demote(&mut self, id: NodeId) -> Result<()> {
        self.ensure_live()?;
        self.tree.demote(id)?;
        self.debug_op("demote", id);
        self.after_topology();
        self.notify(CanvasEvent::NodeDemoted { id });
        Ok(())
    }

    /// Drop every node and return the camera home
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_live()?;
        let removed = self.tree.pre_order();
        self.drag.reset();
        self.pan = None;
        self.press = None;
        self.forget(&removed);
        self.tree.clear();
        self.after_topology();
        self.viewport.stop(true);
        let level = self.viewport.reset();
        self.zoom_changed(level);
        if !removed.is_empty() {
            self.notify(CanvasEvent::NodeRemoved { ids: removed });
        }
        Ok(())
    }

    pub fn export_snapshot(&self) -> TreeSnapshot {
        self.tree.export_snapshot()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(self.export_snapshot().to_json()?)
    }

    /// Replace the whole tree. A rejected snapshot leaves the canvas unchanged.
    pub fn import_snapshot(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
        self.ensure_live()?;
        self.tree.import_snapshot(snapshot)?;
        self.drag.reset();
        self.press = None;
        self.selected = None;
        self.animator.cancel_all();
        self.scheduler.cancel_all();
        self.connections.clear();
        self.after_topology();
        tracing::info!(nodes = self.tree.len(), "tree imported");
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let snapshot = TreeSnapshot::from_json(json)?;
        self.import_snapshot(&snapshot)
    }

    // Node attributes

    pub fn set_draggable(&mut self, id: NodeId, draggable: bool) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.set_draggable(id, draggable)?)
    }

    pub fn set_accepts_children(&mut self, id: NodeId, accepts: bool) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.set_accepts_children(id, accepts)?)
    }

    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.rename(id, name)?)
    }

    pub fn set_color(&mut self, id: NodeId, color: &str) -> Result<()> {
        self.ensure_live()?;
        Ok(self.tree.set_color(id, color)?)
    }

    /// Record a measured content size; descendants move to make room
    pub fn set_node_size(&mut self, id: NodeId, size: Size) -> Result<ConnectionDiff> {
        self.ensure_live()?;
        self.tree.set_size(id, size)?;
        Ok(self.relayout())
    }

    pub fn select_node(&mut self, id: Option<NodeId>) -> Result<()> {
        self.ensure_live()?;
        if let Some(id) = id {
            if !self.tree.contains(id) {
                return Err(TreeError::UnknownNode(id).into());
            }
        }
        if self.selected == id {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.selected, id);
        self.notify(CanvasEvent::NodeSelected { id, previous });
        Ok(())
    }

    // Camera

    pub fn zoom_in(&mut self) -> Result<()> {
        self.ensure_live()?;
        let level = self.viewport.zoom_in();
        self.zoom_changed(level);
        Ok(())
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.ensure_live()?;
        let level = self.viewport.zoom_out();
        self.zoom_changed(level);
        Ok(())
    }

    pub fn reset_zoom(&mut self) -> Result<()> {
        self.ensure_live()?;
        let level = self.viewport.reset_zoom();
        self.zoom_changed(level);
        Ok(())
    }

    pub fn set_zoom(&mut self, level: f64) -> Result<()> {
        self.ensure_live()?;
        let level = self.viewport.set_zoom(level);
        self.zoom_changed(level);
        Ok(())
    }

    /// Anchor-preserving zoom by an additive delta around a viewport point
    pub fn zoom_at_point(&mut self, point: Point, delta: f64) -> Result<()> {
        self.ensure_live()?;
        let level = self.viewport.zoom_at_point(point, delta);
        self.zoom_changed(level);
        Ok(())
    }

    pub fn zoom_at_point_by_factor(&mut self, point: Point, factor: f64) -> Result<()> {
        self.ensure_live()?;
        let level = self.viewport.zoom_at_point_by_factor(point, factor);
        self.zoom_changed(level);
        Ok(())
    }

    pub fn zoom_to_fit(&mut self) -> Result<()> {
        self.ensure_live()?;
        let before = self.viewport.target().zoom;
        let level = self
            .viewport
            .zoom_to_fit(self.tree.iter().map(|n| n.rect()))
            .filter(|level| (level - before).abs() >= f64::EPSILON);
        self.zoom_changed(level);
        Ok(())
    }

    pub fn pan_to(&mut self, pan: Vec2) -> Result<()> {
        self.ensure_live()?;
        if self.config.enable_panning {
            self.viewport.pan_to(pan);
            self.schedule_viewport();
        }
        Ok(())
    }

    /// Center the camera on a node, optionally at a new zoom
    pub fn focus_node(&mut self, id: NodeId, zoom: Option<f64>) -> Result<()> {
        self.ensure_live()?;
        let rect = self.tree.get(id).ok_or(TreeError::UnknownNode(id))?.rect();
        let level = self.viewport.focus(rect, zoom);
        self.zoom_changed(level);
        Ok(())
    }

    pub fn add_momentum(&mut self, vx: f64, vy: f64) -> Result<()> {
        self.ensure_live()?;
        if self.config.enable_panning && self.viewport.add_momentum(vx, vy) {
            self.schedule_viewport();
        }
        Ok(())
    }

    /// Halt the camera loop; velocity survives unless `reset_velocity`
    pub fn stop_animation(&mut self, reset_velocity: bool) {
        self.viewport.stop(reset_velocity);
        self.scheduler.cancel(LoopId::Viewport);
    }

    // Flow animation

    /// Send markers along the tree path between two nodes
    pub fn animate_flow(
        &mut self,
        from: NodeId,
        to: NodeId,
        options: FlowOptions,
        now: Instant,
    ) -> Result<Vec<MarkerId>> {
        self.ensure_live()?;
        for id in [from, to] {
            if !self.tree.contains(id) {
                return Err(TreeError::UnknownNode(id).into());
            }
        }
        let Some(path) = find_path(&self.tree, from, to) else {
            return Err(TreeError::corrupted(format!("no path from {from} to {to}")).into());
        };
        let ids = self
            .animator
            .animate(&path, &self.connections, options, now)?;
        for id in &ids {
            self.scheduler.request(LoopId::Marker(id.0));
        }
        Ok(ids)
    }

    pub fn cancel_marker(&mut self, id: MarkerId) -> bool {
        self.scheduler.cancel(LoopId::Marker(id.0));
        self.animator.cancel(id)
    }

    pub fn cancel_all_markers(&mut self) {
        for id in self.animator.cancel_all() {
            self.scheduler.cancel(LoopId::Marker(id.0));
        }
    }

    /// Run every loop due this frame exactly once
    pub fn tick(&mut self, now: Instant) -> FrameOutput {
        let mut markers = Vec::new();
        for id in self.scheduler.begin_frame() {
            match id {
                LoopId::Viewport => {
                    if self.viewport.step() {
                        self.scheduler.request(LoopId::Viewport);
                    }
                }
                LoopId::Marker(raw) => {
                    if let Some(frame) = self.animator.step(MarkerId(raw), now) {
                        if !frame.finished {
                            self.scheduler.request(id);
                        }
                        markers.push(frame);
                    }
                }
            }
        }
        FrameOutput {
            camera: self.viewport.camera(),
            markers,
            needs_frame: !self.scheduler.is_idle(),
        }
    }

    // Pointer input, in viewport coordinates

    /// Press on the canvas: arms a node drag or starts a pan
    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.disposed || self.drag.phase() != DragPhase::Idle || self.pan.is_some() {
            return false;
        }
        let canvas_point = self.viewport.to_canvas(point);
        if let Some(id) = self.tree.node_at(canvas_point) {
            if self.config.enable_drag_drop
                && self.drag.pointer_down(DragSource::Node(id), point, &self.tree)
            {
                self.debug_op("arm", id);
                return true;
            }
            self.press = Some((id, point));
            return true;
        }
        self.begin_pan(point)
    }

    /// Start dragging the camera from a viewport point
    pub fn begin_pan(&mut self, point: Point) -> bool {
        if self.disposed
            || !self.config.enable_panning
            || self.drag.phase() != DragPhase::Idle
            || self.pan.is_some()
        {
            return false;
        }
        self.stop_animation(true);
        self.pan = Some(PanGesture {
            last: point,
            velocity: Vec2::ZERO,
        });
        true
    }

    /// Follow the pointer during a pan. Returns false when no pan is active.
    pub fn pan_to_pointer(&mut self, point: Point) -> bool {
        let Some(pan) = self.pan.as_mut() else {
            return false;
        };
        let delta = point - pan.last;
        pan.last = point;
        pan.velocity = delta;
        self.viewport.pan_by(delta);
        true
    }

    /// Release a pan; the last pointer delta carries on as momentum
    pub fn end_pan(&mut self) -> bool {
        let Some(pan) = self.pan.take() else {
            return false;
        };
        if self.viewport.add_momentum(pan.velocity.x, pan.velocity.y) {
            self.schedule_viewport();
        }
        true
    }

    /// Press on a palette entry outside the canvas
    pub fn palette_pointer_down(&mut self, item: PaletteItem, point: Point) -> bool {
        if self.disposed || !self.config.enable_drag_drop || self.pan.is_some() {
            return false;
        }
        self.drag.pointer_down(DragSource::Palette(item), point, &self.tree)
    }

    pub fn pointer_move(&mut self, point: Point, now: Instant) -> Option<DragEvent> {
        if self.disposed {
            return None;
        }
        if self.pan_to_pointer(point) {
            return None;
        }
        let event = self
            .drag
            .pointer_move(point, now, &self.tree, &self.viewport.camera());
        if let Some(event) = &event {
            if self.config.debug_logging {
                tracing::debug!(?event, "drag");
            }
        }
        event
    }

    pub fn pointer_up(&mut self, point: Point) -> PointerUp {
        if self.disposed {
            return PointerUp::Ignored;
        }
        if self.end_pan() {
            return PointerUp::PanEnded;
        }
        if let Some((id, down)) = self.press.take() {
            if (point - down).hypot() <= self.config.drag_threshold && self.tree.contains(id) {
                self.click(id);
                return PointerUp::Click(id);
            }
            return PointerUp::Ignored;
        }

        match self
            .drag
            .pointer_up(point, &self.tree, &self.viewport.camera())
        {
            Release::Click(DragSource::Node(id)) => {
                self.click(id);
                PointerUp::Click(id)
            }
            Release::Click(DragSource::Palette(_)) | Release::Ignored => PointerUp::Ignored,
            Release::Cancelled => PointerUp::Cancelled,
            Release::Resolve(request) => {
                let Some(host) = self.host.as_ref() else {
                    self.drag.reset();
                    return PointerUp::Ignored;
                };
                if self.config.debug_logging {
                    tracing::debug!(?request, "awaiting drop validation");
                }
                let verdict = host.validate_drop(&request);
                PointerUp::Pending(PendingDrop { request, verdict })
            }
        }
    }

    /// Abort an armed or dragging gesture, or a pan
    pub fn pointer_cancel(&mut self) -> bool {
        self.press = None;
        if self.pan.take().is_some() {
            return true;
        }
        self.drag.pointer_cancel()
    }

    /// Commit or discard a resolved drop
    pub fn complete_drop(&mut self, verdict: DropVerdict) -> Result<DropOutcome> {
        self.ensure_live()?;
        let Some((request, source)) = self.drag.finish(verdict.ticket) else {
            return Ok(DropOutcome::Stale);
        };
        if !verdict.accepted {
            tracing::debug!(ticket = ?request.ticket, "drop rejected by host");
            return Ok(DropOutcome::Rejected);
        }
        // The tree may have changed while the host was deciding
        if let Some(target) = request.target {
            if !is_valid_target(&source, target, &self.tree) {
                return Ok(DropOutcome::Rejected);
            }
        }

        let outcome = match source {
            DragSource::Palette(item) => {
                match self.add_node(item.to_new_node(), request.target, request.position) {
                    Ok(id) => DropOutcome::Created(id),
                    Err(CanvasError::Tree(err)) => DropOutcome::Failed(err),
                    Err(err) => return Err(err),
                }
            }
            DragSource::Node(id) => match self.move_node(id, request.target, request.position) {
                Ok(record) => DropOutcome::Moved(record),
                Err(CanvasError::Tree(err)) => DropOutcome::Failed(err),
                Err(err) => return Err(err),
            },
        };
        if let DropOutcome::Failed(err) = &outcome {
            tracing::warn!(%err, "drop commit failed");
        }
        Ok(outcome)
    }

    /// Stop every loop, release the host and clear all state.
    /// Nothing reaches the host afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.scheduler.close();
        self.viewport.stop(true);
        self.animator.cancel_all();
        self.drag.reset();
        self.pan = None;
        self.press = None;
        self.selected = None;
        self.tree.clear();
        self.connections.clear();
        self.layout.invalidate();
        self.host = None;
        self.disposed = true;
        tracing::debug!("canvas disposed");
    }

    fn click(&mut self, id: NodeId) {
        if self.selected != Some(id) {
            let previous = self.selected.replace(id);
            self.notify(CanvasEvent::NodeSelected {
                id: Some(id),
                previous,
            });
        }
    }

    // Selection and markers referring to removed nodes
    fn forget(&mut self, removed: &[NodeId]) {
        if self.selected.is_some_and(|s| removed.contains(&s)) {
            self.selected = None;
        }
        for id in self.animator.cancel_touching(removed) {
            self.scheduler.cancel(LoopId::Marker(id.0));
        }
    }

    fn relayout(&mut self) -> ConnectionDiff {
        if let Err(err) = self.layout.apply(&mut self.tree) {
            tracing::warn!(%err, "layout aborted");
        }
        let diff = self.connections.sync(&self.tree);
        for id in self.animator.refresh(&self.connections) {
            tracing::debug!(marker = id.0, "flow path broken");
            self.scheduler.cancel(LoopId::Marker(id.0));
        }
        diff
    }

    fn after_topology(&mut self) {
        self.relayout();
        self.apply_camera_policy();
    }

    // Auto-fit wins over auto-center; otherwise the camera stays put
    fn apply_camera_policy(&mut self) {
        if self.config.auto_zoom {
            self.viewport.zoom_to_fit(self.tree.iter().map(|n| n.rect()));
        } else if self.config.auto_center {
            if let Some(root) = self.tree.root().and_then(|r| self.tree.get(r)) {
                let center = root.center();
                self.viewport.center_on(center);
            }
        }
        self.schedule_viewport();
    }

    fn schedule_viewport(&mut self) {
        if self.viewport.is_animating() {
            self.scheduler.request(LoopId::Viewport);
        }
    }

    fn zoom_changed(&mut self, level: Option<f64>) {
        self.schedule_viewport();
        if let Some(level) = level {
            self.notify(CanvasEvent::ZoomChanged { level });
        }
    }

    fn notify_moved(&self, record: MoveRecord) {
        self.notify(CanvasEvent::NodeMoved {
            id: record.node,
            from: record.from,
            to: record.to,
            index: record.index,
        });
    }

    fn notify(&self, event: CanvasEvent) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        if self.config.debug_logging {
            tracing::debug!(?event, "notify host");
        }
        if let Err(err) = host.notify(&event) {
            tracing::warn!(error = %err, ?event, "host notification failed");
        }
    }

    fn debug_op(&self, op: &'static str, node: NodeId) {
        if self.config.debug_logging {
            tracing::debug!(op, %node, nodes = self.tree.len(), "canvas operation");
        }
    }
}
