//! WGSL generation for the field programs and the point-field surface.
//!
//! The field programs are fullscreen-triangle render passes: the fragment
//! stage runs once per texel of the write target and reads the source field
//! through `field` / `field_sampler` (group 0). The drop program adds its
//! parameters in group 1.
//!
//! The surface shader draws one instanced quad per [`GridPoint`], sampling
//! the readable field in the vertex stage.
//!
//! [`GridPoint`]: crate::mesh::GridPoint

use bytemuck::{Pod, Zeroable};

use crate::field::{InjectionRequest, WaveParams};

/// Uniforms for the drop program.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DropUniforms {
    pub center: [f32; 2],
    pub radius: f32,
    pub strength: f32,
}

impl From<&InjectionRequest> for DropUniforms {
    fn from(request: &InjectionRequest) -> Self {
        Self {
            center: [request.x, request.y],
            radius: request.radius,
            strength: request.strength,
        }
    }
}

/// Uniforms for the surface shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SurfaceUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub color1: [f32; 4],
    pub color2: [f32; 4],
    /// Surface size in physical pixels.
    pub viewport: [f32; 2],
    /// Physical pixels per logical pixel.
    pub point_scale: f32,
    /// Height-to-depth amplification.
    pub amplitude: f32,
}

const FIELD_BINDINGS: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
};

@group(0) @binding(0)
var field: texture_2d<f32>;
@group(0) @binding(1)
var field_sampler: sampler;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    return out;
}
"#;

/// The update program: one damped wave step per texel.
pub fn update_source(wave: WaveParams) -> String {
    format!(
        r#"{FIELD_BINDINGS}
const STIFFNESS: f32 = {stiffness:?};
const DAMPING: f32 = {damping:?};

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let size = vec2<f32>(textureDimensions(field));
    let uv = in.clip_position.xy / size;
    let delta = 1.0 / size;

    var info = textureSample(field, field_sampler, uv);
    let average = (
        textureSample(field, field_sampler, uv - vec2<f32>(delta.x, 0.0)).r +
        textureSample(field, field_sampler, uv - vec2<f32>(0.0, delta.y)).r +
        textureSample(field, field_sampler, uv + vec2<f32>(delta.x, 0.0)).r +
        textureSample(field, field_sampler, uv + vec2<f32>(0.0, delta.y)).r
    ) * 0.25;

    info.g += (average - info.r) * STIFFNESS;
    info.g *= DAMPING;
    info.r += info.g;
    return info;
}}
"#,
        stiffness = wave.stiffness,
        damping = wave.damping,
    )
}

/// The drop program: adds an eased radial bump to the height channel.
pub fn drop_source() -> String {
    format!(
        r#"{FIELD_BINDINGS}
const PI: f32 = 3.141592653589793;

struct DropParams {{
    center: vec2<f32>,
    radius: f32,
    strength: f32,
}};

@group(1) @binding(0)
var<uniform> params: DropParams;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let size = vec2<f32>(textureDimensions(field));
    let uv = in.clip_position.xy / size;

    var info = textureSample(field, field_sampler, uv);
    var falloff = max(0.0, 1.0 - distance(params.center * 0.5 + 0.5, uv) / params.radius);
    falloff = 0.5 - cos(falloff * PI) * 0.5;
    info.r += falloff * params.strength;
    return info;
}}
"#
    )
}

/// The point-field surface shader.
pub fn surface_source() -> String {
    r#"
const PI: f32 = 3.141592653589793;

struct SurfaceUniforms {
    view_proj: mat4x4<f32>,
    color1: vec4<f32>,
    color2: vec4<f32>,
    viewport: vec2<f32>,
    point_scale: f32,
    amplitude: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> surface: SurfaceUniforms;

@group(1) @binding(0)
var field: texture_2d<f32>;
@group(1) @binding(1)
var field_sampler: sampler;

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) size: f32,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vertex_index];

    let h = textureSampleLevel(field, field_sampler, uv, 0.0).r;
    var pos = position;
    pos.z = surface.amplitude * h;

    let weights = vec3<f32>(
        smoothstep(0.0, 0.5, h),
        sin(h * PI),
        sqrt(max(h, 0.0)),
    );

    var clip = surface.view_proj * vec4<f32>(pos, 1.0);
    // `size` is the point diameter in logical pixels.
    let half_extent = size * surface.point_scale / surface.viewport;
    clip = vec4<f32>(clip.xy + corner * half_extent * clip.w, clip.zw);

    var out: VertexOutput;
    out.clip_position = clip;
    out.color = mix(surface.color1.rgb, surface.color2.rgb, weights);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#
    .to_string()
}

/// Fullscreen pass that scales the canvas onto the window surface.
pub fn present_source() -> String {
    r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var canvas: texture_2d<f32>;
@group(0) @binding(1)
var canvas_sampler: sampler;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(canvas, canvas_sampler, in.uv);
}
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<DropUniforms>(), 16);
        assert_eq!(std::mem::size_of::<SurfaceUniforms>(), 112);
    }

    #[test]
    fn test_constants_are_float_literals() {
        let source = update_source(WaveParams::default());
        assert!(source.contains("const STIFFNESS: f32 = 2.0;"));
        assert!(source.contains("const DAMPING: f32 = 0.8;"));
    }

    #[test]
    fn test_drop_uniforms_from_request() {
        let request = InjectionRequest::new(0.25, -0.5, 0.05, 0.1);
        let uniforms = DropUniforms::from(&request);
        assert_eq!(uniforms.center, [0.25, -0.5]);
        assert_eq!(uniforms.radius, 0.05);
        assert_eq!(uniforms.strength, 0.1);
    }
}
