//! Configuration for the ripple background.
//!
//! Every value defaults to the tuning the effect was designed with. Hosts
//! normally use [`BackgroundConfig::default`] and only switch the input mode.
//!
//! # Example
//!
//! ```ignore
//! use moire::prelude::*;
//!
//! let config = BackgroundConfig::new()
//!     .with_input_mode(InputMode::Touch)
//!     .with_colors(ColorPair::new(Vec3::new(0.1, 0.1, 0.9), Vec3::new(1.0, 0.8, 0.2)));
//! ```

use std::time::Duration;

use crate::field::{DAMPING, DROP_RADIUS, DROP_STRENGTH, FIELD_RESOLUTION, STIFFNESS};
use crate::input::InputMode;
use crate::shading::{ColorPair, DISPLACEMENT};

/// On-screen distance between neighbouring points, in logical pixels.
pub const POINT_SPACING: f32 = 3.0;
/// Point spacing used when the host is a touch device.
pub const TOUCH_POINT_SPACING: f32 = 4.0;
/// Injection radius and strength used for touch input.
pub const TOUCH_DROP: f32 = 0.08;
/// Radius of the idle stimulus orbit in field coordinates.
pub const IDLE_ORBIT_RADIUS: f32 = 0.2;
/// Resting camera distance.
pub const CAMERA_DISTANCE: f32 = 50.0;
/// How far the camera moves in when the page is scrolled to the bottom.
pub const SCROLL_DRIFT: f32 = 3.0;
/// Fraction of the remaining distance the camera covers each frame.
pub const CAMERA_EASING: f32 = 0.02;

/// Radius and strength of a single injection kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropProfile {
    pub radius: f32,
    pub strength: f32,
}

impl DropProfile {
    pub const fn new(radius: f32, strength: f32) -> Self {
        Self { radius, strength }
    }
}

/// Tunables for one background session.
#[derive(Clone, Debug)]
pub struct BackgroundConfig {
    /// Side length of the square simulation field in texels.
    /// Independent of the viewport size.
    pub resolution: u32,
    /// Wave stiffness applied to the neighbour average.
    pub stiffness: f32,
    /// Per-step velocity damping (must stay below 1.0 for the field to settle).
    pub damping: f32,
    /// Injection used for pointer movement.
    pub pointer_drop: DropProfile,
    /// Injection used for touch movement.
    pub touch_drop: DropProfile,
    /// Injection issued once per frame while nothing touches the surface.
    pub idle_drop: DropProfile,
    /// Radius of the idle stimulus orbit.
    pub idle_orbit: f32,
    /// Point spacing in logical pixels (pointer devices).
    pub point_spacing: f32,
    /// Point spacing in logical pixels (touch devices).
    pub touch_point_spacing: f32,
    /// Height-to-depth amplification applied in the surface shader.
    pub displacement: f32,
    /// Camera distance with the page scrolled to the top.
    pub camera_distance: f32,
    /// Camera travel across the full scroll range.
    pub scroll_drift: f32,
    /// Per-frame camera easing factor.
    pub camera_easing: f32,
    /// Minimum time between two handled scroll events.
    pub scroll_throttle: Duration,
    /// Upper bound for the device pixel ratio used for the surface.
    pub max_pixel_ratio: f32,
    /// Background clear color (RGBA).
    pub clear_color: [f64; 4],
    /// Initial point colors.
    pub colors: ColorPair,
    /// Which family of input events the background listens to.
    pub input_mode: InputMode,
}

impl BackgroundConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self {
            resolution: FIELD_RESOLUTION,
            stiffness: STIFFNESS,
            damping: DAMPING,
            pointer_drop: DropProfile::new(DROP_RADIUS, DROP_STRENGTH),
            touch_drop: DropProfile::new(TOUCH_DROP, TOUCH_DROP),
            idle_drop: DropProfile::new(DROP_RADIUS, DROP_STRENGTH),
            idle_orbit: IDLE_ORBIT_RADIUS,
            point_spacing: POINT_SPACING,
            touch_point_spacing: TOUCH_POINT_SPACING,
            displacement: DISPLACEMENT,
            camera_distance: CAMERA_DISTANCE,
            scroll_drift: SCROLL_DRIFT,
            camera_easing: CAMERA_EASING,
            scroll_throttle: Duration::from_millis(16),
            max_pixel_ratio: 2.0,
            clear_color: [1.0, 1.0, 1.0, 1.0],
            colors: ColorPair::default(),
            input_mode: InputMode::Pointer,
        }
    }

    /// Set the simulation resolution.
    ///
    /// # Panics
    ///
    /// Panics if `resolution` is below 2 or above 4096.
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        assert!(resolution >= 2, "resolution must be at least 2");
        assert!(resolution <= 4096, "resolution must be at most 4096");
        self.resolution = resolution;
        self
    }

    /// Set stiffness and damping. Damping is clamped to `0.0..=1.0`.
    pub fn with_wave(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness.max(0.0);
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Set the pointer injection.
    pub fn with_pointer_drop(mut self, radius: f32, strength: f32) -> Self {
        self.pointer_drop = DropProfile::new(radius.max(f32::EPSILON), strength);
        self
    }

    /// Set the touch injection.
    pub fn with_touch_drop(mut self, radius: f32, strength: f32) -> Self {
        self.touch_drop = DropProfile::new(radius.max(f32::EPSILON), strength);
        self
    }

    /// Set the idle stimulus injection and orbit radius.
    pub fn with_idle_drop(mut self, radius: f32, strength: f32, orbit: f32) -> Self {
        self.idle_drop = DropProfile::new(radius.max(f32::EPSILON), strength);
        self.idle_orbit = orbit.clamp(0.0, 1.0);
        self
    }

    /// Set the point spacing (pointer devices). Clamped to at least one pixel.
    pub fn with_point_spacing(mut self, spacing: f32) -> Self {
        self.point_spacing = spacing.max(1.0);
        self
    }

    /// Set the camera distance and the scroll drift range.
    pub fn with_camera(mut self, distance: f32, scroll_drift: f32) -> Self {
        self.camera_distance = distance.max(1.0);
        self.scroll_drift = scroll_drift.clamp(0.0, self.camera_distance - 1.0);
        self
    }

    /// Set the per-frame camera easing factor, clamped to `(0, 1]`.
    pub fn with_camera_easing(mut self, easing: f32) -> Self {
        self.camera_easing = easing.clamp(f32::EPSILON, 1.0);
        self
    }

    /// Set how far a unit of height lifts a point towards the camera.
    pub fn with_displacement(mut self, displacement: f32) -> Self {
        self.displacement = displacement;
        self
    }

    /// Set the minimum interval between handled scroll events.
    pub fn with_scroll_throttle(mut self, interval: Duration) -> Self {
        self.scroll_throttle = interval;
        self
    }

    /// Cap the device pixel ratio used for the drawing buffer. At least 1.
    pub fn with_max_pixel_ratio(mut self, ratio: f32) -> Self {
        self.max_pixel_ratio = ratio.max(1.0);
        self
    }

    /// Set the initial colors.
    pub fn with_colors(mut self, colors: ColorPair) -> Self {
        self.colors = colors;
        self
    }

    /// Set the input mode.
    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, rgba: [f64; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    /// Point spacing for the configured input mode.
    pub fn spacing(&self) -> f32 {
        match self.input_mode {
            InputMode::Pointer => self.point_spacing,
            InputMode::Touch => self.touch_point_spacing,
        }
    }

    /// Injection profile for direct interaction in the configured input mode.
    pub fn interaction_drop(&self) -> DropProfile {
        match self.input_mode {
            InputMode::Pointer => self.pointer_drop,
            InputMode::Touch => self.touch_drop,
        }
    }

    /// Camera target distance for a scroll fraction in `0.0..=1.0`.
    pub fn camera_target(&self, scroll_fraction: f32) -> f32 {
        self.camera_distance - scroll_fraction.clamp(0.0, 1.0) * self.scroll_drift
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self::new()
    }
}
