//! Data structures for volstage-rs.
//!
//! - [`DataArray`]: named tuples stored in any [`ScalarType`]
//! - [`ImageData`]: a structured grid with point and cell arrays
//! - [`VolumeProperty`]: color/opacity curves and sampling settings
//! - [`extract_scalar_channel`]: reduction of vector arrays to one channel

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod data_array;
pub mod extract;
pub mod image_data;
pub mod property;
pub mod transfer_function;

pub use data_array::{DataArray, Scalar, ScalarBuffer, ScalarType};
pub use extract::extract_scalar_channel;
pub use image_data::{ArraySelection, DataSet, FieldAssociation, FieldData, ImageData, ScalarMode};
pub use property::{InterpolationType, TransferFunctionMode, VolumeProperty};
pub use transfer_function::{sample_positions, ColorTransferFunction, PiecewiseFunction, VectorMode};

// Re-export half for callers building 16-bit float arrays
pub use half::f16;
