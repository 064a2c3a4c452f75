//! Demo showing incremental volume staging.
//!
//! Builds a signed distance field of a sphere, stages it on the headless
//! device and then changes the property and the data to show which parts
//! are rebuilt. Pass a JSON file with mapper options as the first argument
//! to override the table sizes. Run with `RUST_LOG=debug` to see every
//! pipeline step.

use volstage::*;

fn sphere_distance(n: u32) -> ImageData {
    let spacing = 2.0 / f64::from(n - 1);
    let mut values = Vec::with_capacity((n * n * n) as usize);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let p = DVec3::new(f64::from(i), f64::from(j), f64::from(k)) * spacing - 1.0;
                values.push((p.length() - 0.6) as f32);
            }
        }
    }

    let mut image = ImageData::new(UVec3::splat(n))
        .with_origin(DVec3::splat(-1.0))
        .with_spacing(DVec3::splat(spacing));
    image
        .point_data_mut()
        .set_scalars(DataArray::new("distance", 1, values).expect("one component"));
    image
}

fn report(frame: usize, outcome: &RenderOutcome, diagnostics: &Diagnostics) {
    match outcome {
        RenderOutcome::Staged { is_new, plan } => {
            println!(
                "frame {frame}: staged (new: {is_new}, scope: {:?}, field: {}, tables: {})",
                plan.scope, plan.rebuild_field, plan.rebuild_transfer_function
            );
        }
        RenderOutcome::Skipped(reason) => println!("frame {frame}: skipped ({reason:?})"),
    }
    for diagnostic in diagnostics.entries() {
        println!("  {:?}: {diagnostic}", diagnostic.severity);
    }
}

fn main() -> Result<()> {
    init_logging();

    let options = match std::env::args().nth(1) {
        Some(path) => MapperOptions::load(path)?,
        None => MapperOptions::new().with_color_size(64).with_opacity_size(32),
    };

    let mut property = VolumeProperty::new();
    property
        .color_mut()
        .add_rgb_point(-0.6, Vec3::new(0.2, 0.2, 0.9))
        .add_rgb_point(0.0, Vec3::new(1.0, 1.0, 1.0))
        .add_rgb_point(1.2, Vec3::new(0.9, 0.3, 0.1));
    property
        .scalar_opacity_mut()
        .add_point(-0.6, 0.8)
        .add_point(0.0, 0.3)
        .add_point(0.1, 0.0);
    let mut volume = Volume::with_property(property);
    let mut source = ImageSource::from_image(sphere_distance(32));

    let mut node = VolumeMapperNode::with_options(options);
    let mut device = HeadlessDevice::new();
    let mut diagnostics = Diagnostics::new();

    let mut frames = Vec::new();
    for frame in 0..4 {
        match frame {
            2 => {
                if let Some(property) = volume.property_mut() {
                    property.scalar_opacity_mut().add_point(0.0, 0.5);
                }
            }
            3 => {
                source = ImageSource::from_image(sphere_distance(24));
            }
            _ => {}
        }

        let mut staged = FrameVolumes::new();
        diagnostics.clear();
        let outcome = node.render(
            &volume,
            Some(&mut source),
            &mut device,
            &mut staged,
            &mut diagnostics,
        );
        report(frame, &outcome, &diagnostics);
        frames.push(staged.len());
    }

    if let Some(tf) = &node.state().transfer_function {
        println!(
            "transfer function: {} colors, {} opacities over [{}, {}]",
            tf.color.len(),
            tf.opacity.len(),
            tf.value_range[0],
            tf.value_range[1]
        );
    }
    println!(
        "live objects: {} volume, {} field, {} arrays; staged per frame: {frames:?}",
        device.live_count(ObjectKind::Volume),
        device.live_count(ObjectKind::SpatialField),
        device.live_count(ObjectKind::Array)
    );

    node.release(&mut device);
    Ok(())
}
