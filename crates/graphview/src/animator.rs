use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use arbor_layout::kurbo::{CubicBez, ParamCurve, Point};
use smallvec::SmallVec;
use crate::connections::ConnectionRenderer;
use crate::easing::Easing;
use crate::error::FlowError;
use crate::node::NodeId;
use crate::tree::TreeModel;

/// Shortest path between two nodes, treating links as undirected.
///
/// Returns `None` when either id is unknown or no path exists.
pub fn find_path(tree: &TreeModel, start: NodeId, end: NodeId) -> Option<Vec<NodeId>> {
    if !tree.contains(start) || !tree.contains(end) {
        return None;
    }
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        if current == end {
            let mut path = vec![end];
            let mut at = end;
            while let Some(&prev) = came_from.get(&at) {
                path.push(prev);
                at = prev;
            }
            path.reverse();
            return Some(path);
        }
        let node = tree.get(current)?;
        let neighbors = node.parent().into_iter().chain(node.children().iter().copied());
        for next in neighbors {
            if tree.contains(next) && seen.insert(next) {
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}

type Segments = SmallVec<[CubicBez; 8]>;

// One curve per hop, walked in path direction
fn segments_for(
    path: &[NodeId],
    connections: &ConnectionRenderer,
) -> Result<Segments, FlowError> {
    if path.len() < 2 {
        return Err(FlowError::TooShort);
    }
    path.windows(2)
        .map(|pair| {
            connections
                .segment(pair[0], pair[1])
                .ok_or(FlowError::NotAnEdge {
                    from: pair[0],
                    to: pair[1],
                })
        })
        .collect()
}

/// Parameters for one flow animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowOptions {
    /// Time for one marker to walk the whole path
    pub duration: Duration,
    pub count: usize,
    /// Start delay between consecutive markers
    pub stagger_delay: Duration,
    /// Head start of consecutive markers, as a fraction of the first segment
    pub stagger_offset: f64,
    pub easing: Easing,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1500),
            count: 1,
            stagger_delay: Duration::from_millis(200),
            stagger_offset: 0.0,
            easing: Easing::EaseInOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Marker state reported for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFrame {
    pub id: MarkerId,
    /// `None` until the marker's stagger delay has passed
    pub position: Option<Point>,
    /// Eased progress along the path in `[0, 1]`
    pub progress: f64,
    pub finished: bool,
}

#[derive(Debug, Clone)]
struct Marker {
    path: Vec<NodeId>,
    segments: Segments,
    starts_at: Instant,
    offset: f64,
    duration: Duration,
    easing: Easing,
}

impl Marker {
    fn frame(&self, id: MarkerId, now: Instant) -> MarkerFrame {
        let Some(elapsed) = now.checked_duration_since(self.starts_at) else {
            return MarkerFrame {
                id,
                position: None,
                progress: 0.0,
                finished: false,
            };
        };
        let raw = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };
        let progress = self.easing.apply(raw);
        MarkerFrame {
            id,
            position: Some(self.point_at(progress)),
            progress,
            finished: raw >= 1.0,
        }
    }

    // Progress 0 sits `offset` into the first segment, 1 at the path end
    fn point_at(&self, progress: f64) -> Point {
        let count = self.segments.len() as f64;
        let global = self.offset + progress * (count - self.offset);
        let index = (global.floor() as usize).min(self.segments.len() - 1);
        let local = (global - index as f64).clamp(0.0, 1.0);
        self.segments[index].eval(local)
    }
}

/// Independent markers moving along tree paths
#[derive(Debug, Default)]
pub struct PathAnimator {
    markers: BTreeMap<MarkerId, Marker>,
    next_id: u64,
}

impl PathAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.markers.keys().copied()
    }

    pub fn path(&self, id: MarkerId) -> Option<&[NodeId]> {
        self.markers.get(&id).map(|m| m.path.as_slice())
    }

    /// Launch `options.count` markers along `path`.
    ///
    /// Nothing is started unless every marker can be scheduled.
    pub fn animate(
        &mut self,
        path: &[NodeId],
        connections: &ConnectionRenderer,
        options: FlowOptions,
        now: Instant,
    ) -> Result<Vec<MarkerId>, FlowError> {
        let segments = segments_for(path, connections)?;
        let starts = (0..options.count)
            .map(|i| {
                u32::try_from(i)
                    .ok()
                    .and_then(|i| options.stagger_delay.checked_mul(i))
                    .and_then(|delay| now.checked_add(delay))
                    .ok_or(FlowError::ScheduleOverflow)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let stagger_offset = if options.stagger_offset.is_finite() {
            options.stagger_offset
        } else {
            0.0
        };

        let ids = starts
            .into_iter()
            .enumerate()
            .map(|(i, starts_at)| {
                self.next_id += 1;
                let id = MarkerId(self.next_id);
                let marker = Marker {
                    path: path.to_vec(),
                    segments: segments.clone(),
                    starts_at,
                    offset: (stagger_offset * i as f64).clamp(0.0, 1.0),
                    duration: options.duration,
                    easing: options.easing,
                };
                self.markers.insert(id, marker);
                id
            })
            .collect::<Vec<_>>();
        tracing::debug!(markers = ids.len(), hops = path.len() - 1, "flow started");
        Ok(ids)
    }

    /// Re-read every marker's curves after nodes moved.
    /// Markers whose path is no longer connected are dropped and returned.
    pub fn refresh(&mut self, connections: &ConnectionRenderer) -> Vec<MarkerId> {
        let mut broken = Vec::new();
        for (&id, marker) in &mut self.markers {
            match segments_for(&marker.path, connections) {
                Ok(segments) => marker.segments = segments,
                Err(_) => broken.push(id),
            }
        }
        for id in &broken {
            self.markers.remove(id);
        }
        broken
    }

    /// Position of one marker at `now`; a finished marker is dropped after
    /// reporting its final frame
    pub fn step(&mut self, id: MarkerId, now: Instant) -> Option<MarkerFrame> {
        let frame = self.markers.get(&id)?.frame(id, now);
        if frame.finished {
            self.markers.remove(&id);
        }
        Some(frame)
    }

    pub fn cancel(&mut self, id: MarkerId) -> bool {
        self.markers.remove(&id).is_some()
    }

    pub fn cancel_all(&mut self) -> Vec<MarkerId> {
        let ids = self.markers.keys().copied().collect();
        self.markers.clear();
        ids
    }

    /// Cancel markers whose path visits any of `removed`
    pub fn cancel_touching(&mut self, removed: &[NodeId]) -> Vec<MarkerId> {
        let removed: HashSet<NodeId> = removed.iter().copied().collect();
        let doomed: Vec<MarkerId> = self
            .markers
            .iter()
            .filter(|(_, m)| m.path.iter().any(|n| removed.contains(n)))
            .map(|(&id, _)| id)
            .collect();
        for id in &doomed {
            self.markers.remove(id);
        }
        doomed
    }
}
