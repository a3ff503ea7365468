//! Validation of every generated WGSL program with naga.

use moire::field::WaveParams;
use moire::shader::{drop_source, present_source, surface_source, update_source};

fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code).map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

fn entry_points(module: &naga::Module) -> Vec<(&str, naga::ShaderStage)> {
    module
        .entry_points
        .iter()
        .map(|ep| (ep.name.as_str(), ep.stage))
        .collect()
}

fn assert_render_program(code: &str) -> naga::Module {
    let module = validate_wgsl(code).unwrap_or_else(|e| panic!("{}\n{}", e, code));
    let entries = entry_points(&module);
    assert!(entries.contains(&("vs_main", naga::ShaderStage::Vertex)));
    assert!(entries.contains(&("fs_main", naga::ShaderStage::Fragment)));
    module
}

#[test]
fn test_update_program_validates() {
    assert_render_program(&update_source(WaveParams::default()));
}

#[test]
fn test_update_program_with_custom_wave_validates() {
    let source = update_source(WaveParams {
        stiffness: 1.0,
        damping: 0.95,
    });
    assert!(source.contains("const DAMPING: f32 = 0.95;"));
    assert_render_program(&source);
}

#[test]
fn test_drop_program_validates() {
    let module = assert_render_program(&drop_source());
    let params = module
        .global_variables
        .iter()
        .find(|(_, var)| var.name.as_deref() == Some("params"))
        .map(|(_, var)| var.binding.clone());
    assert_eq!(
        params,
        Some(Some(naga::ResourceBinding { group: 1, binding: 0 }))
    );
}

#[test]
fn test_surface_shader_validates() {
    assert_render_program(&surface_source());
}

#[test]
fn test_present_shader_validates() {
    assert_render_program(&present_source());
}
