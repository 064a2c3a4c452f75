//! volstage-rs: incremental staging of structured volumes for a rendering backend.
//!
//! A [`VolumeMapperNode`] takes a 3D structured grid with a selected scalar
//! array plus a [`VolumeProperty`] holding color and opacity ramps, and keeps
//! a backend volume in sync with them. Only what changed since the last
//! render is rebuilt.
//!
//! # Quick Start
//!
//! ```
//! use volstage::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut image = ImageData::new(UVec3::splat(4));
//!     let values: Vec<f32> = (0..64u8).map(f32::from).collect();
//!     image.point_data_mut().set_scalars(DataArray::new("temp", 1, values)?);
//!
//!     let mut property = VolumeProperty::new();
//!     property
//!         .color_mut()
//!         .add_rgb_point(0.0, Vec3::Z)
//!         .add_rgb_point(63.0, Vec3::X);
//!     property.scalar_opacity_mut().add_point(0.0, 0.0).add_point(63.0, 1.0);
//!
//!     let volume = Volume::with_property(property);
//!     let mut source = ImageSource::from_image(image);
//!     let mut node = VolumeMapperNode::new();
//!     let mut device = HeadlessDevice::new();
//!     let mut frame = FrameVolumes::new();
//!     let mut diagnostics = Diagnostics::new();
//!
//!     let outcome = node.render(
//!         &volume,
//!         Some(&mut source),
//!         &mut device,
//!         &mut frame,
//!         &mut diagnostics,
//!     );
//!     assert!(outcome.is_staged());
//!     assert_eq!(frame.len(), 1);
//!
//!     node.release(&mut device);
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! Every render call runs the same stages:
//!
//! - The [`StalenessTracker`] compares input times against the last build
//! - Multi-component arrays are reduced by [`extract_scalar_channel`]
//! - The field is converted and uploaded by [`upload_spatial_field`]
//! - The ramps are sampled by a [`TransferFunctionBuilder`]
//! - [`VolumeResources`] owns the device objects and stages the volume

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod mapper;
mod scene;

pub use mapper::{MapperState, RenderOutcome, SkipReason, VolumeMapperNode};
pub use scene::{ImageSource, Volume, VolumeMapperInput};

// Re-export core types
pub use volstage_core::{
    BuildTimestamps, Component, Diagnostic, DiagnosticSink, Diagnostics, LogOnly, MapperOptions,
    ModTime, RebuildPlan, RebuildScope, Result, Severity, StalenessInputs, StalenessTracker,
    TimeStamp, VolstageError, DEFAULT_COLOR_SIZE, DEFAULT_OPACITY_SIZE,
};

// Re-export data model types
pub use volstage_structures::{
    extract_scalar_channel, f16, ArraySelection, ColorTransferFunction, DataArray, DataSet,
    FieldAssociation, FieldData, ImageData, InterpolationType, PiecewiseFunction, Scalar,
    ScalarBuffer, ScalarMode, ScalarType, TransferFunctionMode, VectorMode, VolumeProperty,
};

// Re-export backend types
pub use volstage_render::{
    set_and_release, upload_spatial_field, DiscretizedTransferFunction, FieldGeometry, FilterTag,
    FrameVolumes, HeadlessDevice, ObjectHandle, ObjectKind, Parameter, RenderError,
    RenderResult, SpatialFieldHandle, TransferFunctionBuilder, VolumeDevice, VolumeHandle,
    VolumeResources, VolumeStager, WgpuDevice, FIELD_SUBTYPE, VOLUME_SUBTYPE,
};

pub use glam::{DVec3, UVec3, Vec3};

/// Installs an `env_logger` logger configured from `RUST_LOG`.
///
/// Does nothing if a logger is already installed.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::info!("volstage-rs logging initialized");
    }
}
