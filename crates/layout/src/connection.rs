use kurbo::{CubicBez, Rect, Vec2};

use crate::geometry::{bottom_center, top_center};
use crate::types::CurveConfig;

/// S-curve from the parent's bottom-center anchor to the child's top-center anchor.
///
/// Control points are pushed along the direction of travel by a capped
/// fraction of the vertical and horizontal distances.
pub fn connection_curve(parent: Rect, child: Rect, config: &CurveConfig) -> CubicBez {
    let start = bottom_center(parent);
    let end = top_center(child);
    let delta = end - start;

    let vertical = (config.vertical_ratio * delta.y.abs()).min(config.vertical_cap);
    let horizontal = (config.horizontal_ratio * delta.x.abs()).min(config.horizontal_cap);
    let offset = Vec2::new(
        horizontal * delta.x.signum(),
        vertical * delta.y.signum(),
    );

    CubicBez::new(start, start + offset, end - offset, end)
}

/// Same curve walked from end to start
pub fn reversed(curve: CubicBez) -> CubicBez {
    CubicBez::new(curve.p3, curve.p2, curve.p1, curve.p0)
}
