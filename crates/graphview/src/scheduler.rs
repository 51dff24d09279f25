use std::collections::BTreeSet;

/// Identity of an animation loop driven by the frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoopId {
    Viewport,
    Marker(u64),
}

/// Cooperative frame queue.
///
/// A loop asks for the next frame with `request`; every tick drains the
/// pending set so each loop runs at most once per frame, and a cancelled
/// loop can never be resumed by a stale request.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: BTreeSet<LoopId>,
    frame: u64,
    closed: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for `id` to run on the next frame. Ignored after `close`.
    pub fn request(&mut self, id: LoopId) -> bool {
        if self.closed {
            return false;
        }
        self.pending.insert(id)
    }

    pub fn cancel(&mut self, id: LoopId) -> bool {
        self.pending.remove(&id)
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Cancel everything and refuse further requests
    pub fn close(&mut self) {
        self.pending.clear();
        self.closed = true;
    }

    pub fn is_pending(&self, id: LoopId) -> bool {
        self.pending.contains(&id)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Frames run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Take the loops due for this frame, viewport first
    pub fn begin_frame(&mut self) -> Vec<LoopId> {
        if self.closed {
            return Vec::new();
        }
        self.frame += 1;
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_loop_once_per_frame() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request(LoopId::Marker(2));
        scheduler.request(LoopId::Viewport);
        assert!(!scheduler.request(LoopId::Viewport));
        assert_eq!(
            scheduler.begin_frame(),
            vec![LoopId::Viewport, LoopId::Marker(2)]
        );
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.frame(), 1);
    }

    #[test]
    fn test_cancel_and_close() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request(LoopId::Marker(1));
        scheduler.request(LoopId::Marker(3));
        assert!(scheduler.cancel(LoopId::Marker(1)));
        assert_eq!(scheduler.begin_frame(), vec![LoopId::Marker(3)]);

        scheduler.request(LoopId::Viewport);
        scheduler.close();
        assert!(!scheduler.request(LoopId::Viewport));
        assert!(scheduler.begin_frame().is_empty());
    }
}
