//! Pure coordinate math shared by the layout engine and the canvas
//!
//! Viewport (screen) and canvas (world) space are related by
//! `viewport = canvas * zoom + pan`.

use kurbo::{Point, Rect, Size, Vec2};

/// Map a viewport-space point into canvas space
pub fn viewport_to_canvas(point: Point, pan: Vec2, zoom: f64) -> Point {
    ((point.to_vec2() - pan) / zoom).to_point()
}

/// Map a canvas-space point into viewport space
pub fn canvas_to_viewport(point: Point, pan: Vec2, zoom: f64) -> Point {
    (point.to_vec2() * zoom + pan).to_point()
}

/// Box of a node from its top-left anchor and size
pub fn node_rect(position: Point, size: Size) -> Rect {
    Rect::from_origin_size(position, size)
}

pub fn node_center(position: Point, size: Size) -> Point {
    node_rect(position, size).center()
}

/// Edge-inclusive containment test
pub fn point_in_rect(point: Point, rect: Rect) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Union of all rectangles, `None` for an empty input
pub fn bounding_box<I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = Rect>,
{
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// Anchor for outgoing connections
pub fn bottom_center(rect: Rect) -> Point {
    Point::new((rect.x0 + rect.x1) / 2.0, rect.y1)
}

/// Anchor for incoming connections
pub fn top_center(rect: Rect) -> Point {
    Point::new((rect.x0 + rect.x1) / 2.0, rect.y0)
}
