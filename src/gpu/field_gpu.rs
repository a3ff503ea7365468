//! GPU resources and render pipelines for the ripple field.
//!
//! Each half of the field is an `Rgba16Float` texture (R = height,
//! G = velocity). The update and drop programs are fullscreen passes that
//! sample the source half and render into the target half.

use std::sync::Arc;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::error::GpuError;
use crate::field::{FieldBackend, FieldProgram, WaveParams};
use crate::shader::{drop_source, update_source, DropUniforms};

/// Reject field resolutions outside `1..=max` texels per side.
pub fn check_resolution(resolution: u32, max: u32) -> Result<(), GpuError> {
    if resolution == 0 || resolution > max {
        return Err(GpuError::Resolution {
            requested: resolution,
            max,
        });
    }
    Ok(())
}

/// Texel format of the field textures.
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// One half of the double-buffered field.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Binds this half as the source of a program or of the surface shader.
    pub source_group: wgpu::BindGroup,
}

/// Executes the field programs on the GPU.
pub struct GpuFieldBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    resolution: u32,
    sampler: wgpu::Sampler,
    source_layout: wgpu::BindGroupLayout,
    update_pipeline: wgpu::RenderPipeline,
    drop_pipeline: wgpu::RenderPipeline,
    drop_buffer: wgpu::Buffer,
    drop_group: wgpu::BindGroup,
    targets_created: u32,
}

impl GpuFieldBackend {
    /// Compile both programs.
    ///
    /// A resolution the device cannot hold is rejected with
    /// [`GpuError::Resolution`]. Shader and pipeline validation errors are
    /// captured and returned as [`GpuError::Pipeline`].
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        resolution: u32,
        wave: WaveParams,
    ) -> Result<Self, GpuError> {
        check_resolution(resolution, device.limits().max_texture_dimension_2d)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Field Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Field Source Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let drop_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Drop Params Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let drop_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Drop Params Buffer"),
            contents: bytemuck::bytes_of(&DropUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let drop_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Drop Params Bind Group"),
            layout: &drop_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: drop_buffer.as_entire_binding(),
            }],
        });

        let update_pipeline = create_program(
            &device,
            "Field Update",
            &update_source(wave),
            &[&source_layout],
        );
        let drop_pipeline = create_program(
            &device,
            "Field Drop",
            &drop_source(),
            &[&source_layout, &drop_layout],
        );

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::Pipeline(error.to_string()));
        }

        log::debug!("field programs ready at {0}x{0}", resolution);

        Ok(Self {
            device,
            queue,
            resolution,
            sampler,
            source_layout,
            update_pipeline,
            drop_pipeline,
            drop_buffer,
            drop_group,
            targets_created: 0,
        })
    }

    /// Layout of a [`RenderTarget::source_group`].
    pub fn source_layout(&self) -> &wgpu::BindGroupLayout {
        &self.source_layout
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    fn run(&self, pipeline: &wgpu::RenderPipeline, source: &RenderTarget, target: &RenderTarget, params: bool) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Field Program Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Field Program Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &source.source_group, &[]);
            if params {
                pass.set_bind_group(1, &self.drop_group, &[]);
            }
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl FieldBackend for GpuFieldBackend {
    type Target = RenderTarget;

    fn create_target(&mut self) -> RenderTarget {
        self.targets_created += 1;
        let label = format!("Field Target {}", self.targets_created);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: self.resolution,
                height: self.resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let source_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: &self.source_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        // Start from a flat, still field.
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Field Clear Encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Field Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.queue.submit(std::iter::once(encoder.finish()));

        RenderTarget {
            texture,
            view,
            source_group,
        }
    }

    fn execute(&mut self, program: &FieldProgram, source: &RenderTarget, target: &mut RenderTarget) {
        match program {
            FieldProgram::Update => self.run(&self.update_pipeline, source, target, false),
            FieldProgram::Drop(request) => {
                // Applied before the pass below is submitted.
                self.queue.write_buffer(
                    &self.drop_buffer,
                    0,
                    bytemuck::bytes_of(&DropUniforms::from(request)),
                );
                self.run(&self.drop_pipeline, source, target, true);
            }
        }
    }
}

fn create_program(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: FIELD_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
