use arbor_layout::geometry;
use arbor_layout::kurbo::{Point, Rect, Size, Vec2};

use crate::config::{CanvasConfig, PhysicsConfig};

/// Zoom and pan pair; viewport = canvas * zoom + pan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub zoom: f64,
    pub pan: Vec2,
}

impl Camera {
    pub fn to_canvas(&self, point: Point) -> Point {
        geometry::viewport_to_canvas(point, self.pan, self.zoom)
    }

    pub fn to_viewport(&self, point: Point) -> Point {
        geometry::canvas_to_viewport(point, self.pan, self.zoom)
    }
}

/// Camera state with momentum and target seeking.
///
/// Direct manipulation (`zoom_at_point`, `pan_by`) moves the live camera and the
/// target together. Programmatic requests only move the target and the live
/// camera eases toward it, one `step` per frame.
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Size,
    current: Camera,
    target: Camera,
    velocity: Vec2,
    min_zoom: f64,
    max_zoom: f64,
    home_zoom: f64,
    smooth: bool,
    physics: PhysicsConfig,
    animating: bool,
}

impl ViewportController {
    pub fn new(config: &CanvasConfig, viewport: Size) -> Self {
        let camera = Camera {
            zoom: config.zoom_level,
            pan: Vec2::ZERO,
        };
        Self {
            viewport: viewport_extent(viewport),
            current: camera,
            target: camera,
            velocity: Vec2::ZERO,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            home_zoom: config.zoom_level,
            smooth: config.smooth_animations,
            physics: config.physics,
            animating: false,
        }
    }

    /// Pick up changed limits and physics; the camera is re-clamped
    pub fn set_config(&mut self, config: &CanvasConfig) {
        self.min_zoom = config.min_zoom;
        self.max_zoom = config.max_zoom;
        self.home_zoom = config.zoom_level;
        self.smooth = config.smooth_animations;
        self.physics = config.physics;
        self.current.zoom = self.clamp(self.current.zoom);
        self.target.zoom = self.clamp(self.target.zoom);
        if !self.smooth {
            self.snap();
        }
    }

    pub fn camera(&self) -> Camera {
        self.current
    }

    pub fn target(&self) -> Camera {
        self.target
    }

    pub fn zoom(&self) -> f64 {
        self.current.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.current.pan
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport = viewport_extent(size);
    }

    pub fn zoom_limits(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn to_canvas(&self, point: Point) -> Point {
        self.current.to_canvas(point)
    }

    pub fn to_viewport(&self, point: Point) -> Point {
        self.current.to_viewport(point)
    }

    fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.current.zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    fn center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    /// Change zoom by an additive `delta`, keeping the canvas point under
    /// `point` fixed. Returns the new zoom when it changed.
    pub fn zoom_at_point(&mut self, point: Point, delta: f64) -> Option<f64> {
        let zoom = self.clamp(self.current.zoom + delta);
        self.zoom_at_point_to(point, zoom)
    }

    /// Multiplicative variant of `zoom_at_point`, for wheel input
    pub fn zoom_at_point_by_factor(&mut self, point: Point, factor: f64) -> Option<f64> {
        if factor <= 0.0 {
            return None;
        }
        let zoom = self.clamp(self.current.zoom * factor);
        self.zoom_at_point_to(point, zoom)
    }

    fn zoom_at_point_to(&mut self, point: Point, zoom: f64) -> Option<f64> {
        if (zoom - self.current.zoom).abs() < f64::EPSILON {
            return None;
        }
        let anchor = self.current.to_canvas(point);
        self.current = Camera {
            zoom,
            pan: point.to_vec2() - anchor.to_vec2() * zoom,
        };
        self.target = self.current;
        self.animating = self.velocity_active();
        Some(zoom)
    }

    /// Seek `zoom` while keeping the viewport center fixed.
    /// Returns the new target zoom when it changed.
    pub fn set_zoom(&mut self, zoom: f64) -> Option<f64> {
        let zoom = self.clamp(zoom);
        if (zoom - self.target.zoom).abs() < f64::EPSILON {
            return None;
        }
        let center = self.center();
        let anchor = self.target.to_canvas(center);
        self.retarget(Camera {
            zoom,
            pan: center.to_vec2() - anchor.to_vec2() * zoom,
        });
        Some(zoom)
    }

    pub fn zoom_in(&mut self) -> Option<f64> {
        self.set_zoom(self.target.zoom + self.physics.zoom_step)
    }

    pub fn zoom_out(&mut self) -> Option<f64> {
        self.set_zoom(self.target.zoom - self.physics.zoom_step)
    }

    pub fn reset_zoom(&mut self) -> Option<f64> {
        self.set_zoom(self.home_zoom)
    }

    /// Seek the initial camera: home zoom, no pan
    pub fn reset(&mut self) -> Option<f64> {
        let changed = (self.target.zoom - self.home_zoom).abs() >= f64::EPSILON;
        self.velocity = Vec2::ZERO;
        self.retarget(Camera {
            zoom: self.home_zoom,
            pan: Vec2::ZERO,
        });
        changed.then_some(self.home_zoom)
    }

    /// Seek the camera that shows every rect with padding, centered.
    /// Returns the target zoom, or `None` when there is nothing to fit.
    pub fn zoom_to_fit<I>(&mut self, rects: I) -> Option<f64>
    where
        I: IntoIterator<Item = Rect>,
    {
        let bounds = geometry::bounding_box(rects)?.inflate(
            self.physics.fit_padding,
            self.physics.fit_padding,
        );
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return None;
        }
        let sx = self.viewport.width / bounds.width().max(f64::MIN_POSITIVE);
        let sy = self.viewport.height / bounds.height().max(f64::MIN_POSITIVE);
        let zoom = self.clamp(sx.min(sy));
        let pan = self.center().to_vec2() - bounds.center().to_vec2() * zoom;

        // Momentum would keep overwriting the target with the live position
        self.velocity = Vec2::ZERO;
        self.retarget(Camera { zoom, pan });
        Some(zoom)
    }

    /// Seek a pan that puts the canvas point at the viewport center
    pub fn center_on(&mut self, point: Point) {
        let pan = self.center().to_vec2() - point.to_vec2() * self.target.zoom;
        self.velocity = Vec2::ZERO;
        self.retarget(Camera {
            zoom: self.target.zoom,
            pan,
        });
    }

    /// Seek a camera centered on `rect`, optionally at a new zoom
    pub fn focus(&mut self, rect: Rect, zoom: Option<f64>) -> Option<f64> {
        let zoom = zoom.map(|z| self.clamp(z)).unwrap_or(self.target.zoom);
        let changed = (zoom - self.target.zoom).abs() >= f64::EPSILON;
        let pan = self.center().to_vec2() - rect.center().to_vec2() * zoom;
        self.velocity = Vec2::ZERO;
        self.retarget(Camera { zoom, pan });
        changed.then_some(zoom)
    }

    /// Seek an explicit pan, limited by `constrain_pan`
    pub fn pan_to(&mut self, pan: Vec2) {
        let pan = self.constrain_pan(pan);
        self.velocity = Vec2::ZERO;
        self.retarget(Camera {
            zoom: self.target.zoom,
            pan,
        });
    }

    /// Move the live camera by a viewport-space delta
    pub fn pan_by(&mut self, delta: Vec2) {
        self.current.pan = self.constrain_pan(self.current.pan + delta);
        self.target.pan = self.current.pan;
    }

    /// Start a glide; each axis is clamped to the maximum speed.
    /// Returns true when a frame loop should run.
    pub fn add_momentum(&mut self, vx: f64, vy: f64) -> bool {
        if !self.smooth {
            return false;
        }
        let max = self.physics.max_speed;
        self.velocity = Vec2::new(vx.clamp(-max, max), vy.clamp(-max, max));
        if self.velocity_active() {
            self.animating = true;
        } else {
            self.velocity = Vec2::ZERO;
        }
        self.animating
    }

    /// Clamp a pan to a bounded multiple of the viewport size
    pub fn constrain_pan(&self, pan: Vec2) -> Vec2 {
        let limit_x = (self.viewport.width * self.physics.pan_limit_factor).max(0.0);
        let limit_y = (self.viewport.height * self.physics.pan_limit_factor).max(0.0);
        Vec2::new(pan.x.clamp(-limit_x, limit_x), pan.y.clamp(-limit_y, limit_y))
    }

    /// Advance one frame. Returns true while another frame is needed.
    pub fn step(&mut self) -> bool {
        if !self.animating {
            return false;
        }

        if self.velocity_active() {
            self.current.pan = self.constrain_pan(self.current.pan + self.velocity);
            self.target.pan = self.current.pan;
            self.velocity *= self.physics.friction;
            return true;
        }
        self.velocity = Vec2::ZERO;

        let dz = self.target.zoom - self.current.zoom;
        let dp = self.target.pan - self.current.pan;
        if dz.abs() <= self.physics.zoom_snap
            && dp.x.abs() <= self.physics.position_snap
            && dp.y.abs() <= self.physics.position_snap
        {
            self.current = self.target;
            self.animating = false;
            return false;
        }

        let ease = self.physics.ease_factor;
        self.current.zoom = self.clamp(self.current.zoom + dz * ease);
        self.current.pan += dp * ease;
        true
    }

    /// Halt the loop where it is. Velocity is kept unless `reset_velocity`.
    pub fn stop(&mut self, reset_velocity: bool) {
        self.animating = false;
        self.target = self.current;
        if reset_velocity {
            self.velocity = Vec2::ZERO;
        }
    }

    /// Jump straight to the target
    pub fn snap(&mut self) {
        self.current = self.target;
        self.velocity = Vec2::ZERO;
        self.animating = false;
    }

    fn velocity_active(&self) -> bool {
        self.velocity.x.abs() > self.physics.velocity_snap
            || self.velocity.y.abs() > self.physics.velocity_snap
    }

    fn retarget(&mut self, target: Camera) {
        self.target = target;
        if self.smooth {
            self.animating = true;
        } else {
            self.snap();
        }
    }
}

// Negative or non-finite extents collapse to zero
fn viewport_extent(size: Size) -> Size {
    let extent = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(extent(size.width), extent(size.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ViewportController {
        ViewportController::new(&CanvasConfig::default(), Size::new(800.0, 600.0))
    }

    fn settle(viewport: &mut ViewportController) -> usize {
        let mut frames = 0;
        while viewport.step() {
            frames += 1;
            assert!(frames < 10_000, "viewport never settled");
        }
        frames
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = controller();
        viewport.zoom_at_point(Point::new(10.0, 10.0), 100.0);
        assert_eq!(viewport.zoom(), 3.0);
        viewport.zoom_at_point(Point::new(10.0, 10.0), -100.0);
        assert_eq!(viewport.zoom(), 0.1);
        assert_eq!(viewport.zoom_at_point(Point::ZERO, -1.0), None);
        viewport.set_zoom(42.0);
        settle(&mut viewport);
        assert_eq!(viewport.zoom(), 3.0);
    }

    #[test]
    fn test_zoom_preserves_anchor() {
        let mut viewport = controller();
        viewport.pan_by(Vec2::new(37.0, -12.0));
        let anchor = Point::new(321.0, 123.0);
        for delta in [0.5, -0.3, 1.1, -0.9] {
            let before = viewport.to_canvas(anchor);
            viewport.zoom_at_point(anchor, delta);
            let after = viewport.to_canvas(anchor);
            assert!((before - after).hypot() < 1e-9);
        }
        let before = viewport.to_canvas(anchor);
        viewport.zoom_at_point_by_factor(anchor, 1.25);
        assert!((before - viewport.to_canvas(anchor)).hypot() < 1e-9);
    }

    #[test]
    fn test_momentum_decays_in_bounded_frames() {
        let mut viewport = controller();
        assert!(viewport.add_momentum(500.0, -80.0));
        assert_eq!(viewport.velocity(), Vec2::new(50.0, -50.0));
        let frames = settle(&mut viewport);
        assert!(frames <= 100, "took {frames} frames");
        assert_eq!(viewport.velocity(), Vec2::ZERO);
        assert_eq!(viewport.camera(), viewport.target());
        assert!(viewport.pan().x > 500.0);
    }

    #[test]
    fn test_target_seek_converges() {
        let mut viewport = controller();
        viewport.pan_to(Vec2::new(200.0, 100.0));
        assert!(viewport.is_animating());
        settle(&mut viewport);
        assert_eq!(viewport.pan(), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn test_zoom_to_fit_centers_content() {
        let mut viewport = controller();
        let rects = [
            Rect::new(0.0, 0.0, 150.0, 60.0),
            Rect::new(1000.0, 500.0, 1150.0, 560.0),
        ];
        let zoom = viewport.zoom_to_fit(rects).unwrap();
        // Padded box is 1250 x 660
        assert!((zoom - 800.0 / 1250.0).abs() < 1e-12);
        settle(&mut viewport);
        let center = viewport.to_viewport(Point::new(575.0, 280.0));
        assert!((center - Point::new(400.0, 300.0)).hypot() < 1e-9);
        assert_eq!(viewport.zoom_to_fit(Vec::<Rect>::new()), None);
    }

    #[test]
    fn test_fit_during_momentum_wins() {
        let mut viewport = controller();
        viewport.add_momentum(50.0, 50.0);
        viewport.step();
        viewport.zoom_to_fit([Rect::new(0.0, 0.0, 100.0, 100.0)]);
        let target = viewport.target();
        settle(&mut viewport);
        assert_eq!(viewport.camera(), target);
    }

    #[test]
    fn test_snap_without_smooth_animations() {
        let config = CanvasConfig {
            smooth_animations: false,
            ..Default::default()
        };
        let mut viewport = ViewportController::new(&config, Size::new(800.0, 600.0));
        viewport.set_zoom(2.0);
        assert!(!viewport.is_animating());
        assert_eq!(viewport.zoom(), 2.0);
        viewport.center_on(Point::new(100.0, 100.0));
        assert_eq!(viewport.pan(), Vec2::new(200.0, 100.0));
        assert!(!viewport.add_momentum(10.0, 10.0));
    }

    #[test]
    fn test_stop_keeps_velocity_unless_reset() {
        let mut viewport = controller();
        viewport.add_momentum(20.0, 0.0);
        viewport.stop(false);
        assert!(!viewport.is_animating());
        assert_eq!(viewport.velocity(), Vec2::new(20.0, 0.0));
        assert!(!viewport.step());
        viewport.stop(true);
        assert_eq!(viewport.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_constrain_pan() {
        let mut viewport = controller();
        viewport.pan_by(Vec2::new(1e6, -1e6));
        assert_eq!(viewport.pan(), Vec2::new(2400.0, -1800.0));
    }

    #[test]
    fn test_degenerate_viewport_pins_pan() {
        let mut viewport =
            ViewportController::new(&CanvasConfig::default(), Size::new(-800.0, f64::NAN));
        assert_eq!(viewport.viewport_size(), Size::ZERO);
        viewport.pan_by(Vec2::new(30.0, -30.0));
        assert_eq!(viewport.pan(), Vec2::ZERO);

        viewport.set_viewport_size(Size::new(100.0, -5.0));
        viewport.pan_by(Vec2::new(1e6, 1e6));
        assert_eq!(viewport.pan(), Vec2::new(300.0, 0.0));
    }

    #[test]
    fn test_zoom_steps_and_reset() {
        let mut viewport = controller();
        assert_eq!(viewport.zoom_in(), Some(1.1));
        assert_eq!(viewport.zoom_out(), Some(1.0));
        viewport.set_zoom(2.5);
        assert_eq!(viewport.reset_zoom(), Some(1.0));
        assert_eq!(viewport.reset_zoom(), None);
    }
}
