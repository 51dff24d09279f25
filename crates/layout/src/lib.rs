//! Geometry and layout for single-root trees of fixed-width boxes.

mod connection;
pub mod geometry;
mod layout;
mod svg;
mod types;

pub use connection::{connection_curve, reversed};
pub use layout::TreeLayout;
pub use svg::{SvgNode, SvgScene, generate_svg};
pub use types::*;

pub use kurbo;
