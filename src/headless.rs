//! A [`Stage`] that runs entirely on the CPU.
//!
//! The field runs on [`CpuFieldBackend`] and every frame each mesh point is
//! displaced and colored with the same rules the surface shader uses,
//! sampling the field bilinearly like the GPU's linear sampler. The
//! result is kept as a list of [`ShadedPoint`]s instead of pixels. Useful
//! for tests, benchmarks and hosts without a GPU that still want the
//! simulation; it is never substituted for a failed GPU mount.

use glam::{Vec3, Vec4};

use crate::config::BackgroundConfig;
use crate::controller::{FrameView, Stage, Viewport};
use crate::driver::SimulationDriver;
use crate::error::StageError;
use crate::field::{CpuFieldBackend, FieldGrid, InjectionRequest, WaveParams};
use crate::mesh::PointFieldMesh;
use crate::shading::displacement;

/// One point of a headless frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadedPoint {
    /// Displaced world position.
    pub position: Vec3,
    /// Normalized device position after projection.
    pub ndc: Vec3,
    pub color: Vec3,
}

/// CPU stage.
pub struct HeadlessStage {
    driver: SimulationDriver<CpuFieldBackend>,
    mesh: PointFieldMesh,
    viewport: Viewport,
    points: Vec<ShadedPoint>,
    frames: u64,
    released: bool,
}

impl HeadlessStage {
    pub fn new(config: &BackgroundConfig) -> Self {
        let backend = CpuFieldBackend::new(config.resolution, config.resolution).with_wave(WaveParams {
            stiffness: config.stiffness,
            damping: config.damping,
        });
        Self {
            driver: SimulationDriver::new(backend),
            mesh: PointFieldMesh::empty(),
            viewport: Viewport::new(0.0, 0.0, 1.0),
            points: Vec::new(),
            frames: 0,
            released: false,
        }
    }

    /// The readable field.
    pub fn field(&self) -> &FieldGrid {
        self.driver.readable()
    }

    pub fn driver(&self) -> &SimulationDriver<CpuFieldBackend> {
        &self.driver
    }

    pub fn mesh(&self) -> &PointFieldMesh {
        &self.mesh
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Points of the last rendered frame.
    pub fn points(&self) -> &[ShadedPoint] {
        &self.points
    }

    /// Number of frames rendered.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Stage for HeadlessStage {
    fn inject(&mut self, request: InjectionRequest) -> bool {
        self.driver.inject_request(request)
    }

    fn advance(&mut self) {
        self.driver.advance();
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn set_mesh(&mut self, mesh: &PointFieldMesh) {
        self.mesh = mesh.clone();
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), StageError> {
        let view_proj = frame.camera.view_proj(self.viewport.aspect());
        let field = self.driver.readable();
        self.points.clear();
        self.points.extend(self.mesh.points().iter().map(|point| {
            let h = field.sample_height_linear(point.uv[0], point.uv[1]);
            let position = Vec3::new(
                point.position[0],
                point.position[1],
                displacement(h, frame.displacement),
            );
            let clip = view_proj * Vec4::from((position, 1.0));
            ShadedPoint {
                position,
                ndc: clip.truncate() / clip.w,
                color: frame.colors.shade(h),
            }
        }));
        self.frames += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.points = Vec::new();
        self.mesh = PointFieldMesh::empty();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::camera::Camera;
    use crate::shading::ColorPair;

    fn small_config() -> BackgroundConfig {
        BackgroundConfig::new().with_resolution(64)
    }

    fn view(camera: &Camera) -> FrameView<'_> {
        FrameView {
            camera,
            colors: ColorPair::default(),
            displacement: 10.0,
            clear_color: [1.0; 4],
        }
    }

    #[test]
    fn test_flat_field_renders_color1() {
        let config = small_config();
        let mut stage = HeadlessStage::new(&config);
        stage.resize(Viewport::new(60.0, 30.0, 1.0));
        stage.set_mesh(&PointFieldMesh::build(60.0, 30.0, 20.0, 3.0));
        let camera = Camera::default();
        stage.render(&view(&camera)).unwrap();

        assert_eq!(stage.points().len(), 21 * 11);
        assert!(stage
            .points()
            .iter()
            .all(|p| p.position.z == 0.0 && p.color == ColorPair::default().color1));
    }

    #[test]
    fn test_drop_raises_center_points() {
        let config = small_config();
        let mut stage = HeadlessStage::new(&config);
        stage.resize(Viewport::new(30.0, 30.0, 1.0));
        stage.set_mesh(&PointFieldMesh::build(30.0, 30.0, 20.0, 3.0));
        assert!(stage.inject(InjectionRequest::new(0.0, 0.0, 0.3, 0.5)));
        let camera = Camera::default();
        stage.render(&view(&camera)).unwrap();

        let highest = stage
            .points()
            .iter()
            .max_by(|a, b| a.position.z.total_cmp(&b.position.z))
            .unwrap();
        assert!(highest.position.z > 1.0);
        assert!(highest.position.x.abs() < 2.5 && highest.position.y.abs() < 2.5);
        assert!(highest.ndc.x.abs() < 0.2);
    }

    #[test]
    fn test_release_clears_frame() {
        let config = small_config();
        let mut stage = HeadlessStage::new(&config);
        stage.set_mesh(&PointFieldMesh::build(30.0, 30.0, 20.0, 3.0));
        let camera = Camera::default();
        stage.render(&view(&camera)).unwrap();
        stage.release();
        assert!(stage.is_released());
        assert!(stage.points().is_empty());
        assert_eq!(stage.frames(), 1);
    }
}
