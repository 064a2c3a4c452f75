//! Pipeline tests against the wgpu backend.
//!
//! These require a GPU adapter (real or software fallback). Without one the
//! tests print a notice and return early.

use volstage::*;

fn device_or_skip() -> Option<WgpuDevice> {
    match WgpuDevice::new_headless_blocking() {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("Skipping wgpu test: {e}");
            None
        }
    }
}

#[test]
fn wgpu_pipeline_uploads_textures() {
    let Some(mut device) = device_or_skip() else {
        return;
    };

    let mut image = ImageData::new(UVec3::new(4, 3, 2)).with_spacing(DVec3::splat(0.25));
    let values: Vec<u16> = (0..24).collect();
    image
        .point_data_mut()
        .set_scalars(DataArray::new("density", 1, values).unwrap());

    let mut property = VolumeProperty::new();
    property
        .color_mut()
        .add_rgb_point(0.0, Vec3::ZERO)
        .add_rgb_point(23.0, Vec3::ONE);
    property
        .scalar_opacity_mut()
        .add_point(0.0, 0.0)
        .add_point(23.0, 1.0);
    let volume = Volume::with_property(property);
    let mut source = ImageSource::from_image(image);

    let mut node = VolumeMapperNode::with_options(
        MapperOptions::new().with_color_size(16).with_opacity_size(8),
    );
    let mut frame = FrameVolumes::new();
    let mut diagnostics = Diagnostics::new();

    let outcome = node.render(
        &volume,
        Some(&mut source),
        &mut device,
        &mut frame,
        &mut diagnostics,
    );
    assert!(outcome.is_staged());

    let handle = node.state().resources.volume().unwrap();
    let gpu_volume = device.volume(handle).expect("volume resources");
    assert_eq!(gpu_volume.color_texture.width(), 16);
    assert_eq!(gpu_volume.opacity_texture.width(), 8);

    let field = gpu_volume.field.expect("attached field");
    let gpu_field = device.spatial_field(field).expect("field resources");
    assert_eq!(gpu_field.dimensions, UVec3::new(4, 3, 2));
    assert_eq!(gpu_field.texture.depth_or_array_layers(), 2);

    node.release(&mut device);
    assert!(device.volume(handle).is_none());
    assert!(device.spatial_field(field).is_none());
}

#[test]
fn wgpu_oversized_textures_are_not_committed() {
    let Some(mut device) = device_or_skip() else {
        return;
    };
    let limits = device.device().limits();

    let dimensions = UVec3::new(limits.max_texture_dimension_3d + 1, 2, 2);
    let mut image = ImageData::new(dimensions);
    let values = vec![1.0f32; (dimensions.x * 4) as usize];
    image
        .point_data_mut()
        .set_scalars(DataArray::new("wide", 1, values).unwrap());
    let mut source = ImageSource::from_image(image);

    let mut property = VolumeProperty::new();
    property.color_mut().add_rgb_point(0.0, Vec3::ONE);
    property.scalar_opacity_mut().add_point(0.0, 1.0);
    let volume = Volume::with_property(property);

    let mut node = VolumeMapperNode::with_options(
        MapperOptions::new().with_color_size(limits.max_texture_dimension_1d as usize + 1),
    );
    let mut frame = FrameVolumes::new();
    let mut diagnostics = Diagnostics::new();

    let outcome = node.render(
        &volume,
        Some(&mut source),
        &mut device,
        &mut frame,
        &mut diagnostics,
    );
    assert!(outcome.is_staged());

    let handle = node.state().resources.volume().unwrap();
    let field = node.state().resources.spatial_field().unwrap();
    assert!(device.spatial_field(field).is_none());
    assert!(device.volume(handle).is_none());
    assert!(device.is_live(field.object()));

    // A table within the limit commits once the options are lowered.
    node.set_color_size(16);
    node.release(&mut device);
    node.render(
        &volume,
        Some(&mut source),
        &mut device,
        &mut frame,
        &mut diagnostics,
    );
    let handle = node.state().resources.volume().unwrap();
    assert_eq!(
        device.volume(handle).map(|v| v.color_texture.width()),
        Some(16)
    );
}
