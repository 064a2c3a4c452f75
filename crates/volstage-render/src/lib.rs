//! Rendering backend staging for volstage-rs.
//!
//! This crate turns extracted scalar data into backend objects:
//! - The [`VolumeDevice`] operation set and its two backends,
//!   [`HeadlessDevice`] and the wgpu-based [`WgpuDevice`]
//! - Spatial field conversion and upload
//! - Transfer function discretization
//! - Ownership of a mapper's volume objects and frame staging

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Casts between u32 dimensions and usize sample counts are intentional
#![allow(clippy::cast_possible_truncation)]

pub mod device;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod resources;
pub mod spatial_field;
pub mod store;
pub mod transfer_function;

pub use device::{
    set_and_release, ArrayHandle, ObjectHandle, ObjectKind, Parameter, SpatialFieldHandle,
    VolumeDevice, VolumeHandle,
};
pub use error::{RenderError, RenderResult};
pub use gpu::{FieldUniforms, GpuSpatialField, GpuVolume, VolumeUniforms, WgpuDevice};
pub use headless::HeadlessDevice;
pub use resources::{FrameVolumes, VolumeResources, VolumeStager, VOLUME_SUBTYPE};
pub use spatial_field::{
    convert_to_f32, filter_for, upload_spatial_field, FieldGeometry, FilterTag, FIELD_SUBTYPE,
};
pub use store::{ArrayShape, ObjectStore};
pub use transfer_function::{DiscretizedTransferFunction, TransferFunctionBuilder};
