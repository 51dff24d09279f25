use arbor_layout::{CurveConfig, LayoutConfig};
use serde::{Deserialize, Serialize};

use crate::tree::RotationPolicy;

/// Options recognized by a canvas session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    /// Initial zoom, also the target of a zoom reset
    pub zoom_level: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub enable_panning: bool,
    pub enable_drag_drop: bool,
    /// When off, camera changes snap instead of animating
    pub smooth_animations: bool,
    /// Fit all content after every topology change
    pub auto_zoom: bool,
    /// Center on the root after every topology change (ignored while `auto_zoom` is on)
    pub auto_center: bool,
    pub debug_logging: bool,
    pub allow_root_rotation: bool,
    /// Pointer travel in viewport pixels before a press becomes a drag
    pub drag_threshold: f64,
    /// Minimum interval between hover re-evaluations while dragging
    pub hover_poll_ms: u64,
    pub layout: LayoutConfig,
    pub curve: CurveConfig,
    pub physics: PhysicsConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            zoom_level: 1.0,
            min_zoom: 0.1,
            max_zoom: 3.0,
            enable_panning: true,
            enable_drag_drop: true,
            smooth_animations: true,
            auto_zoom: false,
            auto_center: true,
            debug_logging: false,
            allow_root_rotation: false,
            drag_threshold: 5.0,
            hover_poll_ms: 50,
            layout: LayoutConfig::default(),
            curve: CurveConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl CanvasConfig {
    /// Normalize inconsistent values in place
    pub fn validate(mut self) -> Self {
        if !self.min_zoom.is_finite() || self.min_zoom <= 0.0 {
            tracing::warn!(min_zoom = self.min_zoom, "minZoom must be positive, using 0.1");
            self.min_zoom = 0.1;
        }
        if !self.max_zoom.is_finite() || self.max_zoom <= 0.0 {
            tracing::warn!(max_zoom = self.max_zoom, "maxZoom must be positive, using 3.0");
            self.max_zoom = 3.0;
        }
        if self.max_zoom < self.min_zoom {
            tracing::warn!(
                min_zoom = self.min_zoom,
                max_zoom = self.max_zoom,
                "maxZoom below minZoom, swapping"
            );
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        self.zoom_level = self.clamp_zoom(self.zoom_level);
        self.drag_threshold = finite_or(self.drag_threshold, 5.0).max(0.0);
        self.physics = self.physics.validate();
        self
    }

    /// Bring `zoom` into range; non-finite input falls back to the configured level
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let zoom = if zoom.is_finite() {
            zoom
        } else {
            finite_or(self.zoom_level, 1.0)
        };
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        if self.allow_root_rotation {
            RotationPolicy::AllowRootRotation
        } else {
            RotationPolicy::ProtectRoot
        }
    }
}

/// Camera physics constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsConfig {
    /// Velocity multiplier applied every frame
    pub friction: f64,
    /// Maximum momentum speed per axis, in viewport pixels per frame
    pub max_speed: f64,
    /// Speeds below this count as stopped
    pub velocity_snap: f64,
    /// Fraction of the remaining distance to the target covered every frame
    pub ease_factor: f64,
    pub position_snap: f64,
    pub zoom_snap: f64,
    /// Canvas-space padding around content for zoom-to-fit
    pub fit_padding: f64,
    /// Pan is limited to this multiple of the viewport size
    pub pan_limit_factor: f64,
    /// Zoom change for one zoom-in/zoom-out step
    pub zoom_step: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            friction: 0.92,
            max_speed: 50.0,
            velocity_snap: 0.1,
            ease_factor: 0.15,
            position_snap: 0.5,
            zoom_snap: 0.001,
            fit_padding: 50.0,
            pan_limit_factor: 3.0,
            zoom_step: 0.1,
        }
    }
}

impl PhysicsConfig {
    fn validate(mut self) -> Self {
        let defaults = Self::default();
        // Friction at or above 1 would never decay
        if !(f64::EPSILON..1.0).contains(&self.friction) {
            self.friction = defaults.friction;
        }
        if !(f64::EPSILON..=1.0).contains(&self.ease_factor) {
            self.ease_factor = defaults.ease_factor;
        }
        self.max_speed = finite_or(self.max_speed, defaults.max_speed).abs();
        self.velocity_snap = finite_or(self.velocity_snap, defaults.velocity_snap)
            .abs()
            .max(f64::EPSILON);
        self.position_snap = finite_or(self.position_snap, defaults.position_snap).abs();
        self.zoom_snap = finite_or(self.zoom_snap, defaults.zoom_snap).abs();
        self.fit_padding = finite_or(self.fit_padding, defaults.fit_padding).max(0.0);
        self.pan_limit_factor =
            finite_or(self.pan_limit_factor, defaults.pan_limit_factor).max(0.0);
        self.zoom_step = finite_or(self.zoom_step, defaults.zoom_step).abs();
        self
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
