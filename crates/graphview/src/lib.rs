//! Interactive tree canvas: topology model, camera physics, drag and drop
//! and flow animation. Rendering is left to the host.

mod animator;
mod canvas;
mod config;
mod connections;
mod drag;
mod easing;
mod error;
mod host;
mod node;
mod scheduler;
mod snapshot;
mod tree;
mod viewport;

pub use animator::{FlowOptions, MarkerFrame, MarkerId, PathAnimator, find_path};
pub use canvas::{Canvas, DropOutcome, DropVerdict, FrameOutput, PendingDrop, PointerUp};
pub use config::{CanvasConfig, PhysicsConfig};
pub use connections::{Connection, ConnectionDiff, ConnectionRenderer};
pub use drag::{
    DragController, DragEvent, DragPhase, DragSource, DropRequest, DropSubject, DropTicket, Ghost,
    PaletteItem, Release, is_valid_target,
};
pub use easing::Easing;
pub use error::{CanvasError, FlowError, Result, TreeError};
pub use host::{CanvasEvent, CanvasHost, NullHost};
pub use node::{NewNode, Node, NodeId};
pub use scheduler::{FrameScheduler, LoopId};
pub use snapshot::{NodeRecord, TreeSnapshot};
pub use tree::{MoveRecord, RotationPolicy, TreeModel};
pub use viewport::{Camera, ViewportController};

pub use arbor_layout::kurbo;
