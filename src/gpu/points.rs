//! Point-field renderer.
//!
//! Draws one instanced quad per [`GridPoint`]. The instance buffer is
//! replaced whenever the mesh is rebuilt; an empty mesh draws nothing.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::mesh::{GridPoint, PointFieldMesh, POSITION_OFFSET, SIZE_OFFSET, UV_OFFSET};
use crate::shader::{surface_source, SurfaceUniforms};
use crate::shading::ColorPair;

use super::field_gpu::RenderTarget;
use super::DEPTH_FORMAT;

/// Per-frame values for the surface shader.
pub struct SurfaceFrame {
    pub view_proj: glam::Mat4,
    pub colors: ColorPair,
    pub viewport: (u32, u32),
    pub point_scale: f32,
    pub amplitude: f32,
}

impl SurfaceFrame {
    fn uniforms(&self) -> SurfaceUniforms {
        SurfaceUniforms {
            view_proj: self.view_proj.to_cols_array_2d(),
            color1: rgba(self.colors.color1),
            color2: rgba(self.colors.color2),
            viewport: [self.viewport.0.max(1) as f32, self.viewport.1.max(1) as f32],
            point_scale: self.point_scale,
            amplitude: self.amplitude,
        }
    }
}

fn rgba(color: Vec3) -> [f32; 4] {
    [color.x, color.y, color.z, 1.0]
}

/// GPU resources for drawing the point field.
pub struct PointsRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    instances: Option<wgpu::Buffer>,
    instance_count: u32,
}

impl PointsRenderer {
    pub fn new(
        device: &wgpu::Device,
        source_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Uniform Buffer"),
            size: std::mem::size_of::<SurfaceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Surface Shader"),
            source: wgpu::ShaderSource::Wgsl(surface_source().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, source_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Surface Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<GridPoint>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: POSITION_OFFSET,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        },
                        wgpu::VertexAttribute {
                            offset: UV_OFFSET,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x2,
                        },
                        wgpu::VertexAttribute {
                            offset: SIZE_OFFSET,
                            shader_location: 2,
                            format: wgpu::VertexFormat::Float32,
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            uniform_group,
            instances: None,
            instance_count: 0,
        }
    }

    /// Replace the instance data with `mesh`.
    pub fn set_mesh(&mut self, device: &wgpu::Device, mesh: &PointFieldMesh) {
        if let Some(old) = self.instances.take() {
            old.destroy();
        }
        self.instance_count = mesh.len() as u32;
        if mesh.is_empty() {
            return;
        }
        self.instances = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Field Instances"),
            contents: mesh.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Upload this frame's uniforms.
    pub fn prepare(&self, queue: &wgpu::Queue, frame: &SurfaceFrame) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&frame.uniforms()));
    }

    /// Record the point draw into `pass`, sampling `field`.
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, field: &'a RenderTarget) {
        let Some(instances) = &self.instances else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_group, &[]);
        pass.set_bind_group(1, &field.source_group, &[]);
        pass.set_vertex_buffer(0, instances.slice(..));
        pass.draw(0..6, 0..self.instance_count);
    }

    /// Free the GPU buffers.
    pub fn release(&mut self) {
        if let Some(instances) = self.instances.take() {
            instances.destroy();
        }
        self.instance_count = 0;
        self.uniform_buffer.destroy();
    }
}
