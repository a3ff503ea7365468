//! The point field mesh.
//!
//! A regular grid of points that covers the viewport. Each point carries a
//! world-space position (on the `z = 0` plane, centered on the origin), the
//! field texture coordinate it samples and an on-screen size.
//!
//! Texture coordinates keep the field's square aspect: on a wide viewport the
//! U axis spans `[0, 1]` and V covers a centered band of height `1 / ratio`;
//! on a tall viewport V spans `[0, 1]` and U covers a centered band of width
//! `ratio`.

use bytemuck::{Pod, Zeroable};

/// One vertex of the point field, laid out for an instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GridPoint {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub size: f32,
}

/// Byte offsets of the [`GridPoint`] attributes.
pub const POSITION_OFFSET: u64 = 0;
pub const UV_OFFSET: u64 = 12;
pub const SIZE_OFFSET: u64 = 20;

/// An immutable grid of points for one viewport size.
#[derive(Clone, Debug, PartialEq)]
pub struct PointFieldMesh {
    points: Vec<GridPoint>,
    columns: u32,
    rows: u32,
    grid_ratio: f32,
}

impl PointFieldMesh {
    /// Build the grid for a `viewport_width` x `viewport_height` viewport
    /// (logical pixels) whose visible plane is `world_width` units wide.
    ///
    /// There are `floor(w / spacing) + 1` columns and `floor(h / spacing) + 1`
    /// rows. A viewport with a zero dimension yields an empty mesh.
    pub fn build(viewport_width: f32, viewport_height: f32, world_width: f32, spacing: f32) -> Self {
        if !(viewport_width > 0.0 && viewport_height > 0.0 && spacing > 0.0) {
            return Self::empty();
        }

        let columns = (viewport_width / spacing).floor() as u32 + 1;
        let rows = (viewport_height / spacing).floor() as u32 + 1;
        let world_step = spacing * world_width / viewport_width;
        let ox = -world_step * (columns as f32 / 2.0 - 0.5);
        let oy = -world_step * (rows as f32 / 2.0 - 0.5);

        let grid_ratio = viewport_width / viewport_height;
        let (u0, du, v0, dv) = if grid_ratio >= 1.0 {
            (
                0.0,
                1.0 / columns as f32,
                (1.0 - 1.0 / grid_ratio) / 2.0,
                1.0 / rows as f32 / grid_ratio,
            )
        } else {
            (
                (1.0 - grid_ratio) / 2.0,
                1.0 / columns as f32 * grid_ratio,
                0.0,
                1.0 / rows as f32,
            )
        };

        let size = spacing / 2.0;
        let mut points = Vec::with_capacity((columns * rows) as usize);
        // Column-major: point (i, j) lives at i * rows + j.
        for i in 0..columns {
            let x = ox + i as f32 * world_step;
            for j in 0..rows {
                points.push(GridPoint {
                    position: [x, oy + j as f32 * world_step, 0.0],
                    uv: [u0 + i as f32 * du, v0 + j as f32 * dv],
                    size,
                });
            }
        }

        log::debug!(
            "built point field {}x{} ({} points) for {}x{}",
            columns,
            rows,
            points.len(),
            viewport_width,
            viewport_height
        );

        Self {
            points,
            columns,
            rows,
            grid_ratio,
        }
    }

    /// A mesh with no points.
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            columns: 0,
            rows: 0,
            grid_ratio: 1.0,
        }
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Viewport width over height (1.0 for an empty mesh).
    pub fn grid_ratio(&self) -> f32 {
        self.grid_ratio
    }

    /// Flat `xyz` positions.
    pub fn positions(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| p.position).collect()
    }

    /// Flat `uv` coordinates.
    pub fn uvs(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| p.uv).collect()
    }

    /// Per-point sizes.
    pub fn sizes(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.size).collect()
    }

    /// Interleaved instance data.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}

/// Number of points [`PointFieldMesh::build`] produces for a viewport.
pub fn point_count(viewport_width: f32, viewport_height: f32, spacing: f32) -> usize {
    if !(viewport_width > 0.0 && viewport_height > 0.0 && spacing > 0.0) {
        return 0;
    }
    let columns = (viewport_width / spacing).floor() as usize + 1;
    let rows = (viewport_height / spacing).floor() as usize + 1;
    columns * rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_count_formula() {
        let mesh = PointFieldMesh::build(768.0, 512.0, 62.1, 3.0);
        assert_eq!(mesh.columns(), 257);
        assert_eq!(mesh.rows(), 171);
        assert_eq!(mesh.len(), 43_947);
        assert_eq!(point_count(768.0, 512.0, 3.0), 43_947);
    }

    #[test]
    fn test_zero_viewport_is_empty() {
        assert!(PointFieldMesh::build(0.0, 512.0, 10.0, 3.0).is_empty());
        assert!(PointFieldMesh::build(512.0, 0.0, 10.0, 3.0).is_empty());
        assert_eq!(point_count(0.0, 0.0, 3.0), 0);
    }

    #[test]
    fn test_wide_viewport_letterboxes_v() {
        let mesh = PointFieldMesh::build(600.0, 300.0, 40.0, 3.0);
        let uvs = mesh.uvs();
        let (us, vs): (Vec<f32>, Vec<f32>) = uvs.chunks(2).map(|c| (c[0], c[1])).unzip();
        let u_min = us.iter().cloned().fold(f32::MAX, f32::min);
        let u_max = us.iter().cloned().fold(f32::MIN, f32::max);
        let v_min = vs.iter().cloned().fold(f32::MAX, f32::min);
        let v_max = vs.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(u_min, 0.0);
        assert!(u_max > 0.99 && u_max < 1.0);
        assert!((v_min - 0.25).abs() < 1e-6);
        assert!(v_max < 0.75);
        assert!((v_max - v_min) > 0.49);
    }

    #[test]
    fn test_tall_viewport_pillarboxes_u() {
        let mesh = PointFieldMesh::build(300.0, 600.0, 20.0, 3.0);
        let first = mesh.points()[0];
        assert!((first.uv[0] - 0.25).abs() < 1e-6);
        assert_eq!(first.uv[1], 0.0);
        assert!(mesh.grid_ratio() < 1.0);
    }

    #[test]
    fn test_positions_centered() {
        let mesh = PointFieldMesh::build(300.0, 300.0, 30.0, 3.0);
        let first = mesh.points()[0].position;
        let last = mesh.points()[mesh.len() - 1].position;
        assert!((first[0] + last[0]).abs() < 1e-4);
        assert!((first[1] + last[1]).abs() < 1e-4);
        assert!(mesh.points().iter().all(|p| p.position[2] == 0.0 && p.size == 1.5));
    }

    #[test]
    fn test_column_major_order() {
        let mesh = PointFieldMesh::build(9.0, 6.0, 9.0, 3.0);
        assert_eq!((mesh.columns(), mesh.rows()), (4, 3));
        let p = mesh.points();
        // Same column shares x, consecutive rows step y.
        assert_eq!(p[0].position[0], p[1].position[0]);
        assert!(p[1].position[1] > p[0].position[1]);
        assert!(p[3].position[0] > p[2].position[0]);
    }

    #[test]
    fn test_rebuild_is_bit_identical() {
        let a = PointFieldMesh::build(1024.0, 640.0, 52.3, 3.0);
        let b = PointFieldMesh::build(1024.0, 640.0, 52.3, 3.0);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_attribute_offsets() {
        assert_eq!(std::mem::size_of::<GridPoint>(), 24);
        assert_eq!(UV_OFFSET, 12);
        assert_eq!(SIZE_OFFSET, 20);
        assert_eq!(POSITION_OFFSET, 0);
    }
}
