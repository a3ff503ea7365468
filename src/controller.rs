//! Interaction and lifecycle controller.
//!
//! [`Background`] owns one session of the ripple effect. It turns
//! [`InteractionEvent`]s into injections, runs the per-frame sequence and
//! tears everything down on [`dispose`](Background::dispose).
//!
//! ```text
//! Uninitialized --mount ok--> Running --dispose--> Disposed
//!       |                        |
//!   mount failed            fatal frame error
//!       v                        v
//!    Disabled <------------------+ --dispose--> Disposed
//! ```
//!
//! Rendering goes through the [`Stage`] trait, implemented by the GPU
//! [`Session`](crate::gpu::Session) and by the CPU
//! [`HeadlessStage`](crate::headless::HeadlessStage).
//!
//! Each frame, in order: the camera drifts towards its target, the idle
//! stimulus injects (only while nothing is over the surface), the field
//! advances one step, and the stage renders the readable field.

use std::time::Instant;

use glam::Vec2;

use crate::config::{BackgroundConfig, DropProfile};
use crate::error::{GpuError, StageError};
use crate::field::InjectionRequest;
use crate::gpu::camera::Camera;
use crate::input::{pointer_to_field, InteractionEvent, Listeners, PointerTracker};
use crate::mesh::PointFieldMesh;
use crate::scheduler::{FrameScheduler, FrameTicket};
use crate::shading::ColorPair;
use crate::time::{Throttle, Time};

/// Size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Width in logical pixels.
    pub width: f32,
    /// Height in logical pixels.
    pub height: f32,
    /// Device pixel ratio reported by the host.
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(width: f32, height: f32, scale_factor: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            scale_factor,
        }
    }

    /// Width over height, 1.0 when empty.
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Device pixel ratio capped at `max`.
    pub fn pixel_ratio(&self, max: f32) -> f32 {
        (self.scale_factor as f32).clamp(f32::EPSILON, max.max(f32::EPSILON))
    }

    /// Drawing buffer size in pixels for a pixel ratio capped at `max`.
    pub fn buffer_size(&self, max: f32) -> (u32, u32) {
        let ratio = self.pixel_ratio(max);
        (
            (self.width * ratio).round() as u32,
            (self.height * ratio).round() as u32,
        )
    }
}

/// Everything a stage needs to draw one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub camera: &'a Camera,
    pub colors: ColorPair,
    pub displacement: f32,
    pub clear_color: [f64; 4],
}

/// The rendering side of a session.
///
/// A stage owns the simulation field and whatever draws it. The controller
/// calls these in frame order and never after [`release`](Stage::release).
pub trait Stage {
    /// Apply one injection. Returns false if the request was rejected.
    fn inject(&mut self, request: InjectionRequest) -> bool;

    /// Advance the field one step.
    fn advance(&mut self);

    /// The surface changed size or pixel ratio.
    fn resize(&mut self, viewport: Viewport);

    /// Replace the point field.
    fn set_mesh(&mut self, mesh: &PointFieldMesh);

    /// Draw the readable field.
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), StageError>;

    /// Free every resource. The stage is dropped right after.
    fn release(&mut self);
}

/// Where a background is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    /// Mounting failed or the stage hit a fatal error. Inert until disposed.
    Disabled,
    Disposed,
}

/// Result of a frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame ran; schedule `next`.
    Rendered(FrameTicket),
    /// The frame could not be presented; schedule `next` and try again.
    Skipped(FrameTicket),
    /// The ticket is from a stopped loop. Nothing ran.
    Stale,
    /// The stage failed fatally and the background is now disabled.
    Halted,
}

/// One session of the ripple background.
pub struct Background<S: Stage> {
    config: BackgroundConfig,
    state: LifecycleState,
    stage: Option<S>,
    scheduler: FrameScheduler,
    listeners: Listeners,
    pointer: PointerTracker,
    camera: Camera,
    colors: ColorPair,
    viewport: Viewport,
    mesh_shape: (u32, u32),
    scroll_throttle: Throttle,
    time: Time,
}

impl<S: Stage> Background<S> {
    pub fn new(config: BackgroundConfig) -> Self {
        Self {
            camera: Camera::new(config.camera_distance, config.camera_easing),
            colors: config.colors,
            scroll_throttle: Throttle::new(config.scroll_throttle),
            config,
            state: LifecycleState::Uninitialized,
            stage: None,
            scheduler: FrameScheduler::new(),
            listeners: Listeners::new(),
            pointer: PointerTracker::new(),
            viewport: Viewport::new(0.0, 0.0, 1.0),
            mesh_shape: (0, 0),
            time: Time::new(),
        }
    }

    /// Start the session, never failing into the host.
    ///
    /// `create` builds the stage for the container. If it fails the error is
    /// logged and the background stays [`Disabled`](LifecycleState::Disabled).
    /// Returns the ticket of the first frame on success.
    pub fn mount<F>(&mut self, viewport: Viewport, create: F) -> Option<FrameTicket>
    where
        F: FnOnce(&BackgroundConfig, Viewport) -> Result<S, GpuError>,
    {
        match self.try_mount(viewport, create) {
            Ok(ticket) => ticket,
            Err(e) => {
                log::warn!("ripple background disabled: {}", e);
                None
            }
        }
    }

    /// Like [`mount`](Self::mount) but hands the creation error back.
    ///
    /// Mounting anything but a fresh background does nothing and returns
    /// `Ok(None)`.
    pub fn try_mount<F>(&mut self, viewport: Viewport, create: F) -> Result<Option<FrameTicket>, GpuError>
    where
        F: FnOnce(&BackgroundConfig, Viewport) -> Result<S, GpuError>,
    {
        if self.state != LifecycleState::Uninitialized {
            log::debug!("mount ignored in state {:?}", self.state);
            return Ok(None);
        }

        let mut stage = match create(&self.config, viewport) {
            Ok(stage) => stage,
            Err(e) => {
                // No retries within a session.
                self.state = LifecycleState::Disabled;
                return Err(e);
            }
        };

        self.viewport = viewport;
        stage.resize(viewport);
        self.stage = Some(stage);
        self.rebuild_mesh();
        self.listeners.attach(self.config.input_mode);
        self.time = Time::new();
        self.state = LifecycleState::Running;
        log::debug!(
            "ripple background running at {}x{} (x{})",
            viewport.width,
            viewport.height,
            viewport.scale_factor
        );
        Ok(Some(self.scheduler.start()))
    }

    /// Feed one host event. Returns whether an attached listener handled it.
    pub fn handle_event(&mut self, event: InteractionEvent, now: Instant) -> bool {
        if self.state != LifecycleState::Running || !self.listeners.accepts(&event) {
            return false;
        }

        match event {
            InteractionEvent::PointerMove { x, y } => {
                if let Some(position) = self.field_position(x, y) {
                    self.pointer.pointer_moved(position);
                    self.inject_at(position, self.config.interaction_drop());
                }
            }
            InteractionEvent::PointerLeave => self.pointer.pointer_left(),
            InteractionEvent::PointerUp => self.colors.randomize(&mut rand::thread_rng()),
            InteractionEvent::TouchStart { x, y } => {
                if let Some(position) = self.field_position(x, y) {
                    self.pointer.touch_started(position);
                    self.inject_at(position, self.config.interaction_drop());
                }
            }
            InteractionEvent::TouchMove { x, y } => {
                if let Some(position) = self.field_position(x, y) {
                    if self.pointer.touch_moved(position) {
                        self.inject_at(position, self.config.interaction_drop());
                    }
                }
            }
            InteractionEvent::TouchEnd | InteractionEvent::TouchCancel => self.pointer.touch_ended(),
            InteractionEvent::Resize { width, height } => {
                self.viewport = Viewport::new(width, height, self.viewport.scale_factor);
                if let Some(stage) = self.stage.as_mut() {
                    stage.resize(self.viewport);
                }
                self.rebuild_mesh();
            }
            InteractionEvent::ScaleFactor(scale_factor) => {
                // Mesh density is in logical pixels, so only the stage cares.
                self.viewport.scale_factor = scale_factor;
                if let Some(stage) = self.stage.as_mut() {
                    stage.resize(self.viewport);
                }
            }
            InteractionEvent::Scroll { offset, max } => {
                if !self.scroll_throttle.ready(now) {
                    return true;
                }
                let fraction = if max > 0.0 { offset / max } else { 0.0 };
                self.camera.target_z = self.config.camera_target(fraction);
            }
        }
        true
    }

    /// Run the frame scheduled with `ticket`.
    pub fn frame(&mut self, ticket: FrameTicket, now: Instant) -> FrameOutcome {
        if self.state != LifecycleState::Running || !self.scheduler.accepts(ticket) {
            return FrameOutcome::Stale;
        }
        let Some(stage) = self.stage.as_mut() else {
            return FrameOutcome::Stale;
        };

        let (t, _) = self.time.update_at(now);
        self.camera.drift();

        if !self.pointer.is_over() {
            let idle = self.config.idle_drop;
            let orbit = self.config.idle_orbit;
            stage.inject(InjectionRequest::new(
                t.cos() * orbit,
                t.sin() * orbit,
                idle.radius,
                idle.strength,
            ));
        }

        stage.advance();

        let view = FrameView {
            camera: &self.camera,
            colors: self.colors,
            displacement: self.config.displacement,
            clear_color: self.config.clear_color,
        };
        match stage.render(&view) {
            Ok(()) => FrameOutcome::Rendered(self.scheduler.next_ticket()),
            Err(e) if e.is_fatal() => {
                log::error!("ripple background stopped: {}", e);
                self.shutdown();
                self.state = LifecycleState::Disabled;
                FrameOutcome::Halted
            }
            Err(e) => {
                log::debug!("frame skipped: {}", e);
                FrameOutcome::Skipped(self.scheduler.next_ticket())
            }
        }
    }

    /// Tear the session down. Safe to call any number of times; only the
    /// first call does anything. Returns whether this call disposed.
    pub fn dispose(&mut self) -> bool {
        if self.state == LifecycleState::Disposed {
            return false;
        }
        self.shutdown();
        self.state = LifecycleState::Disposed;
        log::debug!("ripple background disposed");
        true
    }

    fn shutdown(&mut self) {
        self.scheduler.stop();
        let detached = self.listeners.detach_all();
        if detached > 0 {
            log::debug!("detached {} listeners", detached);
        }
        self.pointer.reset();
        if let Some(mut stage) = self.stage.take() {
            stage.release();
        }
        self.mesh_shape = (0, 0);
    }

    fn field_position(&self, x: f32, y: f32) -> Option<Vec2> {
        pointer_to_field(x, y, self.viewport.width, self.viewport.height)
    }

    fn inject_at(&mut self, position: Vec2, drop: DropProfile) {
        if let Some(stage) = self.stage.as_mut() {
            stage.inject(InjectionRequest::new(
                position.x,
                position.y,
                drop.radius,
                drop.strength,
            ));
        }
    }

    fn rebuild_mesh(&mut self) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        let (world_width, _) = self.camera.world_size(self.viewport.aspect());
        let mesh = PointFieldMesh::build(
            self.viewport.width,
            self.viewport.height,
            world_width,
            self.config.spacing(),
        );
        self.mesh_shape = (mesh.columns(), mesh.rows());
        stage.set_mesh(&mesh);
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    pub fn stage(&self) -> Option<&S> {
        self.stage.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn colors(&self) -> ColorPair {
        self.colors
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// `(columns, rows)` of the current point field.
    pub fn mesh_shape(&self) -> (u32, u32) {
        self.mesh_shape
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }
}

impl<S: Stage> Drop for Background<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputMode;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingStage {
        injections: Vec<InjectionRequest>,
        advances: u32,
        renders: u32,
        meshes: Vec<usize>,
        viewports: Vec<Viewport>,
        released: bool,
        fail_with: Option<StageError>,
    }

    impl Stage for RecordingStage {
        fn inject(&mut self, request: InjectionRequest) -> bool {
            self.injections.push(request);
            true
        }
        fn advance(&mut self) {
            self.advances += 1;
        }
        fn resize(&mut self, viewport: Viewport) {
            self.viewports.push(viewport);
        }
        fn set_mesh(&mut self, mesh: &PointFieldMesh) {
            self.meshes.push(mesh.len());
        }
        fn render(&mut self, _frame: &FrameView<'_>) -> Result<(), StageError> {
            self.renders += 1;
            match self.fail_with.clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
        fn release(&mut self) {
            self.released = true;
        }
    }

    fn mounted(config: BackgroundConfig) -> (Background<RecordingStage>, FrameTicket) {
        let mut background = Background::new(config);
        let ticket = background
            .mount(Viewport::new(768.0, 512.0, 1.0), |_, _| Ok(RecordingStage::default()))
            .unwrap();
        (background, ticket)
    }

    #[test]
    fn test_mount_builds_mesh_and_listeners() {
        let (background, _) = mounted(BackgroundConfig::new());
        assert_eq!(background.state(), LifecycleState::Running);
        assert_eq!(background.mesh_shape(), (257, 171));
        assert_eq!(background.stage().unwrap().meshes, vec![43_947]);
        assert_eq!(background.listeners().len(), 5);
    }

    #[test]
    fn test_failed_mount_disables() {
        let mut background: Background<RecordingStage> = Background::new(BackgroundConfig::new());
        let ticket = background.mount(Viewport::new(10.0, 10.0, 1.0), |_, _| Err(GpuError::NoAdapter));
        assert!(ticket.is_none());
        assert_eq!(background.state(), LifecycleState::Disabled);
        assert!(background.listeners().is_empty());
        assert!(!background.handle_event(InteractionEvent::PointerUp, Instant::now()));

        // Not retried.
        let again = background.try_mount(Viewport::new(10.0, 10.0, 1.0), |_, _| Ok(RecordingStage::default()));
        assert!(matches!(again, Ok(None)));
        assert_eq!(background.state(), LifecycleState::Disabled);
    }

    #[test]
    fn test_try_mount_returns_error() {
        let mut background: Background<RecordingStage> = Background::new(BackgroundConfig::new());
        let result = background.try_mount(Viewport::new(10.0, 10.0, 1.0), |_, _| {
            Err(GpuError::Pipeline("broken".into()))
        });
        assert!(matches!(result, Err(GpuError::Pipeline(_))));
    }

    #[test]
    fn test_oversized_field_disables() {
        let config = BackgroundConfig::new().with_resolution(4096);
        let mut background: Background<RecordingStage> = Background::new(config);
        let result = background.try_mount(Viewport::new(10.0, 10.0, 1.0), |config, _| {
            crate::gpu::field_gpu::check_resolution(config.resolution, 2048)?;
            Ok(RecordingStage::default())
        });
        assert!(matches!(
            result,
            Err(GpuError::Resolution {
                requested: 4096,
                max: 2048
            })
        ));
        assert_eq!(background.state(), LifecycleState::Disabled);
        assert!(background.stage().is_none());
    }

    #[test]
    fn test_idle_frame_order() {
        let (mut background, ticket) = mounted(BackgroundConfig::new());
        let outcome = background.frame(ticket, Instant::now());
        assert!(matches!(outcome, FrameOutcome::Rendered(_)));
        let stage = background.stage().unwrap();
        assert_eq!(stage.injections.len(), 1);
        assert_eq!(stage.injections[0].radius, 0.05);
        assert_eq!(stage.advances, 1);
        assert_eq!(stage.renders, 1);
    }

    #[test]
    fn test_idle_orbit_position() {
        let (mut background, ticket) = mounted(BackgroundConfig::new());
        let start = Instant::now() + Duration::from_millis(1);
        background.time = Time::starting_at(start);
        background.frame(ticket, start + Duration::from_secs_f32(std::f32::consts::FRAC_PI_2));
        let drop = background.stage().unwrap().injections[0];
        assert!(drop.x.abs() < 1e-3);
        assert!((drop.y - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_pointer_suppresses_idle() {
        let (mut background, ticket) = mounted(BackgroundConfig::new());
        let now = Instant::now();
        assert!(background.handle_event(InteractionEvent::PointerMove { x: 384.0, y: 256.0 }, now));
        let FrameOutcome::Rendered(next) = background.frame(ticket, now) else {
            panic!("frame did not render");
        };
        // One injection from the move, none from the idle stimulus.
        assert_eq!(background.stage().unwrap().injections.len(), 1);

        background.handle_event(InteractionEvent::PointerLeave, now);
        background.frame(next, now);
        assert_eq!(background.stage().unwrap().injections.len(), 2);
    }

    #[test]
    fn test_pointer_move_is_aspect_corrected() {
        let (mut background, _) = mounted(BackgroundConfig::new());
        background.handle_event(InteractionEvent::PointerMove { x: 768.0, y: 0.0 }, Instant::now());
        let drop = background.stage().unwrap().injections[0];
        assert!((drop.x - 1.0).abs() < 1e-6);
        assert!((drop.y - 512.0 / 768.0).abs() < 1e-6);
    }

    #[test]
    fn test_touch_mode_ignores_pointer() {
        let config = BackgroundConfig::new().with_input_mode(InputMode::Touch);
        let (mut background, _) = mounted(config);
        let now = Instant::now();
        assert!(!background.handle_event(InteractionEvent::PointerMove { x: 1.0, y: 1.0 }, now));
        // A move without a touch down is heard but injects nothing.
        assert!(background.handle_event(InteractionEvent::TouchMove { x: 1.0, y: 1.0 }, now));
        assert!(background.stage().unwrap().injections.is_empty());

        background.handle_event(InteractionEvent::TouchStart { x: 10.0, y: 10.0 }, now);
        background.handle_event(InteractionEvent::TouchMove { x: 20.0, y: 10.0 }, now);
        let injections = &background.stage().unwrap().injections;
        assert_eq!(injections.len(), 2);
        assert_eq!(injections[1].radius, 0.08);
        assert!(background.pointer().is_over());

        background.handle_event(InteractionEvent::TouchCancel, now);
        assert!(!background.pointer().is_over());
    }

    #[test]
    fn test_pointer_up_randomizes_colors() {
        let (mut background, _) = mounted(BackgroundConfig::new());
        let before = background.colors();
        background.handle_event(InteractionEvent::PointerUp, Instant::now());
        assert_ne!(background.colors(), before);
    }

    #[test]
    fn test_resize_rebuilds_mesh() {
        let (mut background, _) = mounted(BackgroundConfig::new());
        background.handle_event(InteractionEvent::Resize { width: 0.0, height: 300.0 }, Instant::now());
        assert_eq!(background.mesh_shape(), (0, 0));
        assert_eq!(background.state(), LifecycleState::Running);
        background.handle_event(InteractionEvent::Resize { width: 300.0, height: 300.0 }, Instant::now());
        assert_eq!(background.stage().unwrap().meshes, vec![43_947, 0, 101 * 101]);
    }

    #[test]
    fn test_scale_factor_keeps_mesh() {
        let (mut background, _) = mounted(BackgroundConfig::new());
        background.handle_event(InteractionEvent::ScaleFactor(2.0), Instant::now());
        let stage = background.stage().unwrap();
        assert_eq!(stage.meshes.len(), 1);
        assert_eq!(stage.viewports.last().unwrap().scale_factor, 2.0);
    }

    #[test]
    fn test_scroll_is_throttled() {
        let (mut background, _) = mounted(BackgroundConfig::new());
        let now = Instant::now();
        background.handle_event(InteractionEvent::Scroll { offset: 50.0, max: 100.0 }, now);
        assert_eq!(background.camera().target_z, 48.5);
        background.handle_event(
            InteractionEvent::Scroll { offset: 100.0, max: 100.0 },
            now + Duration::from_millis(5),
        );
        assert_eq!(background.camera().target_z, 48.5);
        background.handle_event(
            InteractionEvent::Scroll { offset: 100.0, max: 100.0 },
            now + Duration::from_millis(20),
        );
        assert_eq!(background.camera().target_z, 47.0);
    }

    #[test]
    fn test_unscrollable_page_keeps_distance() {
        let (mut background, _) = mounted(BackgroundConfig::new());
        background.handle_event(InteractionEvent::Scroll { offset: 0.0, max: 0.0 }, Instant::now());
        assert_eq!(background.camera().target_z, 50.0);
    }

    #[test]
    fn test_fatal_error_disables() {
        let (mut background, ticket) = mounted(BackgroundConfig::new());
        background.stage.as_mut().unwrap().fail_with = Some(StageError::OutOfMemory);
        assert_eq!(background.frame(ticket, Instant::now()), FrameOutcome::Halted);
        assert_eq!(background.state(), LifecycleState::Disabled);
        assert!(background.stage().is_none());
        assert!(background.listeners().is_empty());
        assert!(background.dispose());
    }

    #[test]
    fn test_surface_error_skips() {
        let (mut background, ticket) = mounted(BackgroundConfig::new());
        background.stage.as_mut().unwrap().fail_with = Some(StageError::Surface("timeout".into()));
        assert!(matches!(background.frame(ticket, Instant::now()), FrameOutcome::Skipped(_)));
        assert_eq!(background.state(), LifecycleState::Running);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut background, ticket) = mounted(BackgroundConfig::new());
        assert!(background.dispose());
        assert!(!background.dispose());
        assert_eq!(background.frame(ticket, Instant::now()), FrameOutcome::Stale);
        assert!(!background.handle_event(InteractionEvent::PointerUp, Instant::now()));
    }

    #[test]
    fn test_viewport_buffer_size_capped() {
        let viewport = Viewport::new(800.0, 600.0, 3.0);
        assert_eq!(viewport.pixel_ratio(2.0), 2.0);
        assert_eq!(viewport.buffer_size(2.0), (1600, 1200));
        let viewport = Viewport::new(800.0, 600.0, 1.5);
        assert_eq!(viewport.buffer_size(2.0), (1200, 900));
    }
}
