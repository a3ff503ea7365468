//! The ripple field: a damped wave equation on a 2D grid.
//!
//! Each cell stores a height (red channel on the GPU) and a velocity
//! (green channel). Two programs operate on the field:
//!
//! - **Update**: every cell moves towards the average height of its four
//!   axis neighbours, with stiffness [`STIFFNESS`] and damping [`DAMPING`].
//! - **Drop**: adds a smooth radial bump to the height of every cell inside
//!   the drop radius.
//!
//! Neighbours outside the grid are clamped to the edge cell, matching a
//! clamp-to-edge sampler on the GPU.
//!
//! This module holds the rules themselves, a CPU grid ([`FieldGrid`]) and the
//! [`FieldBackend`] trait through which the [`SimulationDriver`] executes the
//! programs, either on the GPU or with [`CpuFieldBackend`].
//!
//! [`SimulationDriver`]: crate::driver::SimulationDriver

use std::f32::consts::PI;

/// Default side length of the square field.
pub const FIELD_RESOLUTION: u32 = 512;
/// Pull towards the neighbour average.
pub const STIFFNESS: f32 = 2.0;
/// Velocity multiplier applied every update.
pub const DAMPING: f32 = 0.8;
/// Default injection radius, in texture coordinates.
pub const DROP_RADIUS: f32 = 0.05;
/// Default injection strength.
pub const DROP_STRENGTH: f32 = 0.05;

/// One cell of the field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldCell {
    pub height: f32,
    pub velocity: f32,
}

/// A one-shot perturbation of the field.
///
/// `x` and `y` are in `[-1, 1]` field coordinates (the field center is the
/// origin, +y points up the screen). `radius` is measured in texture
/// coordinates, so `0.05` covers a twentieth of the field's width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InjectionRequest {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub strength: f32,
}

impl InjectionRequest {
    pub fn new(x: f32, y: f32, radius: f32, strength: f32) -> Self {
        Self { x, y, radius, strength }
    }

    /// Center of the drop in texture coordinates.
    #[inline]
    pub fn center_uv(&self) -> (f32, f32) {
        (self.x * 0.5 + 0.5, self.y * 0.5 + 0.5)
    }

    /// Whether the request can be executed.
    pub fn is_valid(&self) -> bool {
        self.radius > 0.0
            && self.radius.is_finite()
            && self.x.is_finite()
            && self.y.is_finite()
            && self.strength.is_finite()
    }
}

/// The two full-grid programs a backend must be able to run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldProgram {
    Update,
    Drop(InjectionRequest),
}

/// Wave constants used by the update program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveParams {
    pub stiffness: f32,
    pub damping: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            stiffness: STIFFNESS,
            damping: DAMPING,
        }
    }
}

/// Advance a single cell given the mean height of its four neighbours.
#[inline]
pub fn step_cell(cell: FieldCell, neighbour_average: f32, wave: WaveParams) -> FieldCell {
    let mut velocity = cell.velocity + (neighbour_average - cell.height) * wave.stiffness;
    velocity *= wave.damping;
    FieldCell {
        height: cell.height + velocity,
        velocity,
    }
}

/// Eased drop weight for a texel at `distance` (texture units) from the
/// drop center. Zero at and beyond `radius`.
#[inline]
pub fn drop_falloff(distance: f32, radius: f32) -> f32 {
    let linear = (1.0 - distance / radius).max(0.0);
    0.5 - (linear * PI).cos() * 0.5
}

/// A CPU-resident field grid, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldGrid {
    width: u32,
    height: u32,
    cells: Vec<FieldCell>,
}

impl FieldGrid {
    /// Create a zeroed grid.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "field dimensions must be non-zero");
        Self {
            width,
            height,
            cells: vec![FieldCell::default(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[FieldCell] {
        &self.cells
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Cell at `(x, y)`, clamped to the grid edge.
    #[inline]
    pub fn clamped(&self, x: i64, y: i64) -> FieldCell {
        let cx = x.clamp(0, self.width as i64 - 1) as u32;
        let cy = y.clamp(0, self.height as i64 - 1) as u32;
        self.cells[self.index(cx, cy)]
    }

    pub fn get(&self, x: u32, y: u32) -> FieldCell {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, cell: FieldCell) {
        let i = self.index(x, y);
        self.cells[i] = cell;
    }

    /// Texture coordinate of the center of texel `(x, y)`.
    #[inline]
    pub fn texel_uv(&self, x: u32, y: u32) -> (f32, f32) {
        (
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    /// Nearest-texel height lookup at a texture coordinate.
    pub fn sample_height(&self, u: f32, v: f32) -> f32 {
        let x = (u * self.width as f32).floor() as i64;
        let y = (v * self.height as f32).floor() as i64;
        self.clamped(x, y).height
    }

    /// Bilinear height lookup at a texture coordinate, matching a
    /// clamp-to-edge linear sampler: texel centers sit at `(i + 0.5) / size`.
    pub fn sample_height_linear(&self, u: f32, v: f32) -> f32 {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.clamped(x0, y0).height * (1.0 - tx) + self.clamped(x0 + 1, y0).height * tx;
        let bottom = self.clamped(x0, y0 + 1).height * (1.0 - tx) + self.clamped(x0 + 1, y0 + 1).height * tx;
        top * (1.0 - ty) + bottom * ty
    }

    /// Mean of `|height|` over the grid.
    pub fn mean_abs_height(&self) -> f32 {
        let sum: f64 = self.cells.iter().map(|c| c.height.abs() as f64).sum();
        (sum / self.cells.len() as f64) as f32
    }

    /// Sum of heights over the grid.
    pub fn total_height(&self) -> f64 {
        self.cells.iter().map(|c| c.height as f64).sum()
    }

    /// Largest `|velocity|` in the grid.
    pub fn max_abs_velocity(&self) -> f32 {
        self.cells.iter().fold(0.0, |m, c| m.max(c.velocity.abs()))
    }

    /// Write one update step of `source` into `self`.
    pub fn update_from(&mut self, source: &FieldGrid, wave: WaveParams) {
        debug_assert_eq!((self.width, self.height), (source.width, source.height));
        for y in 0..source.height {
            for x in 0..source.width {
                let (xi, yi) = (x as i64, y as i64);
                let average = (source.clamped(xi - 1, yi).height
                    + source.clamped(xi, yi - 1).height
                    + source.clamped(xi + 1, yi).height
                    + source.clamped(xi, yi + 1).height)
                    * 0.25;
                let i = self.index(x, y);
                self.cells[i] = step_cell(source.get(x, y), average, wave);
            }
        }
    }

    /// Write `source` plus one drop into `self`.
    pub fn drop_from(&mut self, source: &FieldGrid, request: &InjectionRequest) {
        debug_assert_eq!((self.width, self.height), (source.width, source.height));
        let (cu, cv) = request.center_uv();
        for y in 0..source.height {
            for x in 0..source.width {
                let (u, v) = source.texel_uv(x, y);
                let distance = ((cu - u).powi(2) + (cv - v).powi(2)).sqrt();
                let mut cell = source.get(x, y);
                cell.height += drop_falloff(distance, request.radius) * request.strength;
                let i = self.index(x, y);
                self.cells[i] = cell;
            }
        }
    }
}

/// Executes field programs on some storage.
///
/// Implementations read `source` and overwrite every texel of `target`;
/// they never touch `source`. The driver handles the role swap.
pub trait FieldBackend {
    /// One half of the double-buffered field.
    type Target;

    /// Allocate a zeroed half.
    fn create_target(&mut self) -> Self::Target;

    /// Run `program` reading `source` and writing `target`.
    fn execute(&mut self, program: &FieldProgram, source: &Self::Target, target: &mut Self::Target);
}

/// Runs the field programs on the CPU.
#[derive(Clone, Debug)]
pub struct CpuFieldBackend {
    width: u32,
    height: u32,
    wave: WaveParams,
}

impl CpuFieldBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            wave: WaveParams::default(),
        }
    }

    pub fn with_wave(mut self, wave: WaveParams) -> Self {
        self.wave = wave;
        self
    }
}

impl FieldBackend for CpuFieldBackend {
    type Target = FieldGrid;

    fn create_target(&mut self) -> FieldGrid {
        FieldGrid::new(self.width, self.height)
    }

    fn execute(&mut self, program: &FieldProgram, source: &FieldGrid, target: &mut FieldGrid) {
        match program {
            FieldProgram::Update => target.update_from(source, self.wave),
            FieldProgram::Drop(request) => target.drop_from(source, request),
        }
    }
}
