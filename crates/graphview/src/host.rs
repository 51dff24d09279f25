use futures::future::{self, LocalBoxFuture};

use crate::drag::DropRequest;
use crate::node::NodeId;

/// Change notification sent to the host, one per logical operation
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    NodeAdded {
        id: NodeId,
        parent: Option<NodeId>,
    },
    /// Every removed id, the removed subtree root first
    NodeRemoved {
        ids: Vec<NodeId>,
    },
    NodeMoved {
        id: NodeId,
        from: Option<NodeId>,
        to: Option<NodeId>,
        index: usize,
    },
    NodePromoted {
        id: NodeId,
    },
    NodeDemoted {
        id: NodeId,
    },
    NodeSelected {
        id: Option<NodeId>,
        previous: Option<NodeId>,
    },
    ZoomChanged {
        level: f64,
    },
    AutoZoomChanged {
        enabled: bool,
    },
}

/// Callbacks a host application provides to a canvas.
///
/// The returned validation future must not borrow the host; a canvas keeps at
/// most one of them pending at a time.
pub trait CanvasHost {
    /// Authoritative veto over a drop. `Err` counts as a rejection.
    fn validate_drop(&self, request: &DropRequest) -> LocalBoxFuture<'static, anyhow::Result<bool>>;

    /// Best-effort notification; failures are logged and ignored
    fn notify(&self, event: &CanvasEvent) -> anyhow::Result<()>;
}

/// Host that accepts every drop and ignores notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl CanvasHost for NullHost {
    fn validate_drop(&self, _request: &DropRequest) -> LocalBoxFuture<'static, anyhow::Result<bool>> {
        Box::pin(future::ready(Ok(true)))
    }

    fn notify(&self, _event: &CanvasEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
