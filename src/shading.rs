//! Point coloring and displacement rules.
//!
//! The surface shader samples the field height `h` at each point and uses it
//! twice: the point moves towards the camera by `h * DISPLACEMENT`, and its
//! color is blended from [`ColorPair::color1`] to [`ColorPair::color2`] with a
//! different weight curve per channel:
//!
//! | channel | weight                  |
//! |---------|-------------------------|
//! | red     | `smoothstep(0, 0.5, h)` |
//! | green   | `sin(h * PI)`           |
//! | blue    | `sqrt(h)`               |
//!
//! The green curve peaks at `h = 0.5` and falls back to zero at `h = 1`, so a
//! fully raised point is not `color2`. The functions here mirror the WGSL so
//! the blend can be tested and rendered without a GPU.

use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;

/// Height-to-depth amplification.
pub const DISPLACEMENT: f32 = 10.0;

/// Hermite interpolation between `edge0` and `edge1`, clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Per-channel blend weights for a sampled height.
///
/// Negative heights give a zero blue weight rather than a NaN.
#[inline]
pub fn blend_weights(h: f32) -> Vec3 {
    Vec3::new(smoothstep(0.0, 0.5, h), (h * PI).sin(), h.max(0.0).sqrt())
}

/// Blend `color1` towards `color2` using [`blend_weights`].
#[inline]
pub fn blend(color1: Vec3, color2: Vec3, h: f32) -> Vec3 {
    color1 + (color2 - color1) * blend_weights(h)
}

/// Local z offset of a point whose sampled height is `h`.
#[inline]
pub fn displacement(h: f32, amplitude: f32) -> f32 {
    h * amplitude
}

/// The two colors the points are blended between.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorPair {
    pub color1: Vec3,
    pub color2: Vec3,
}

impl ColorPair {
    pub fn new(color1: Vec3, color2: Vec3) -> Self {
        Self { color1, color2 }
    }

    /// Replace both colors with uniformly random RGB values.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.color1 = random_color(rng);
        self.color2 = random_color(rng);
        log::debug!("colors randomized to {:?} / {:?}", self.color1, self.color2);
    }

    /// Color of a point at height `h`.
    pub fn shade(&self, h: f32) -> Vec3 {
        blend(self.color1, self.color2, h)
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        Self {
            color1: Vec3::new(0.149, 0.141, 0.912),
            color2: Vec3::new(1.0, 0.833, 0.224),
        }
    }
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(rng.gen(), rng.gen(), rng.gen())
}
