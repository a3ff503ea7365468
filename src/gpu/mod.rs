//! GPU session: device setup and the wgpu [`Stage`].

pub mod camera;
mod canvas;
pub mod field_gpu;
mod points;

use std::sync::Arc;

use winit::window::Window;

use crate::config::BackgroundConfig;
use crate::controller::{FrameView, Stage, Viewport};
use crate::double_buffer::Slot;
use crate::driver::SimulationDriver;
use crate::error::{GpuError, StageError};
use crate::field::{InjectionRequest, WaveParams};
use crate::mesh::PointFieldMesh;

use canvas::Canvas;
use field_gpu::GpuFieldBackend;
use points::{PointsRenderer, SurfaceFrame};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Device, queue and the configured window surface.
pub struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    configured: bool,
    window: Arc<Window>,
}

impl GpuContext {
    /// Open the adapter and device for `window` and configure its surface.
    pub fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async(window))
    }

    async fn new_async(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Ripple Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("uncaptured GPU error: {}", error);
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        // Colors are written as given, without an sRGB encode.
        let format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let mut context = Self {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            configured: false,
            window,
        };
        context.configure();

        log::debug!(
            "GPU ready: {} ({:?}), surface {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format
        );

        Ok(context)
    }

    /// Match the surface to the window. A zero-sized window leaves it
    /// unconfigured.
    fn configure(&mut self) {
        let size = self.window.inner_size();
        self.configured = size.width > 0 && size.height > 0;
        if self.configured {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

/// Everything the GPU side of one background session owns.
pub struct Session {
    context: GpuContext,
    driver: SimulationDriver<GpuFieldBackend>,
    points: PointsRenderer,
    canvas: Canvas,
    viewport: Viewport,
    max_pixel_ratio: f32,
    released: bool,
}

impl Session {
    /// Set up the GPU for `window`.
    pub fn new(window: Arc<Window>, config: &BackgroundConfig, viewport: Viewport) -> Result<Self, GpuError> {
        let context = GpuContext::new(window)?;
        let device = context.device.clone();

        let backend = GpuFieldBackend::new(
            device.clone(),
            context.queue.clone(),
            config.resolution,
            WaveParams {
                stiffness: config.stiffness,
                damping: config.damping,
            },
        )?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let points = PointsRenderer::new(&device, backend.source_layout(), context.format());
        let canvas = Canvas::new(&device, context.format());
        let driver = SimulationDriver::new(backend);
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(GpuError::Pipeline(error.to_string()));
        }

        let mut session = Self {
            driver,
            points,
            canvas,
            context,
            viewport,
            max_pixel_ratio: config.max_pixel_ratio,
            released: false,
        };
        session.resize(viewport);
        Ok(session)
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Points drawn per frame.
    pub fn point_count(&self) -> u32 {
        self.points.instance_count()
    }

    /// The double-buffered field on the GPU.
    pub fn driver(&self) -> &SimulationDriver<GpuFieldBackend> {
        &self.driver
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, StageError> {
        match self.context.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.configure();
                Err(StageError::Surface("surface lost, reconfigured".into()))
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(StageError::OutOfMemory),
            Err(e) => Err(StageError::Surface(e.to_string())),
        }
    }
}

impl Stage for Session {
    fn inject(&mut self, request: InjectionRequest) -> bool {
        self.driver.inject_request(request)
    }

    fn advance(&mut self) {
        self.driver.advance();
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.context.configure();
        let (width, height) = viewport.buffer_size(self.max_pixel_ratio);
        self.canvas.resize(&self.context.device, width, height);
    }

    fn set_mesh(&mut self, mesh: &PointFieldMesh) {
        self.points.set_mesh(&self.context.device, mesh);
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), StageError> {
        if self.released || !self.context.configured {
            return Ok(());
        }
        let Some(canvas_size) = self.canvas.size() else {
            return Ok(());
        };

        let output = self.acquire()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.points.prepare(
            &self.context.queue,
            &SurfaceFrame {
                view_proj: frame.camera.view_proj(self.viewport.aspect()),
                colors: frame.colors,
                viewport: canvas_size,
                point_scale: self.viewport.pixel_ratio(self.max_pixel_ratio),
                amplitude: frame.displacement,
            },
        );

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Surface Encoder"),
            });

        if let Some((color_view, depth_view)) = self.canvas.attachments() {
            let [r, g, b, a] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Field Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.points.draw(&mut pass, self.driver.readable());
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.canvas.present(&mut pass);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.points.release();
        self.canvas.destroy_targets();
        for slot in [Slot::A, Slot::B] {
            self.driver.targets().get(slot).texture.destroy();
        }
        self.released = true;
        log::debug!("GPU session released");
    }
}
