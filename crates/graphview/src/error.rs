use thiserror::Error;

use crate::node::NodeId;

pub type Result<T, E = CanvasError> = std::result::Result<T, E>;

/// Failures of Tree Model operations. The model is unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid argument: {field} must not be empty")]
    InvalidArgument { field: &'static str },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} cannot become its own parent")]
    SelfParent(NodeId),

    #[error("moving {node} under {target} would create a cycle")]
    WouldCycle { node: NodeId, target: NodeId },

    #[error("tree already has root {0}")]
    RootExists(NodeId),

    #[error("node {0} is the root")]
    IsRoot(NodeId),

    #[error("parent of node {0} is the root")]
    ParentIsRoot(NodeId),

    #[error("node {0} has no children")]
    NoChildren(NodeId),

    #[error("tree data corrupted: {0}")]
    Corrupted(String),
}

impl TreeError {
    pub(crate) fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("a flow needs at least two nodes")]
    TooShort,

    #[error("{from} and {to} are not linked")]
    NotAnEdge { from: NodeId, to: NodeId },

    #[error("stagger delay overflows the marker schedule")]
    ScheduleOverflow,
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canvas has been disposed")]
    Disposed,
}
