//! Conversion and upload of structured scalar fields.
//!
//! Any supported element type is converted to a flat `f32` buffer in one
//! pass, directly into the mapped device array. The element type picks a
//! conversion function from a fixed table; types without a dedicated entry
//! go through the boxed per-element iterator of [`ScalarBuffer`].

use glam::{UVec3, Vec3};
use volstage_core::{Component, DiagnosticSink, Result, VolstageError};
use volstage_structures::{
    DataArray, FieldAssociation, ImageData, InterpolationType, Scalar, ScalarBuffer, ScalarType,
};

use crate::device::{set_and_release, Parameter, SpatialFieldHandle, VolumeDevice};

/// Backend subtype of every spatial field this crate creates.
pub const FIELD_SUBTYPE: &str = "structuredRegular";

/// Placement and sample counts of a structured field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGeometry {
    pub origin: Vec3,
    pub spacing: Vec3,
    /// Samples per axis after the point/cell adjustment.
    pub dimensions: UVec3,
}

impl FieldGeometry {
    /// Geometry of `image` sampled at the given association.
    ///
    /// Cell-centered fields have one sample fewer per axis; axes that are
    /// only one point wide collapse to zero samples.
    pub fn from_image(image: &ImageData, association: FieldAssociation) -> Self {
        let dimensions = match association {
            FieldAssociation::Points => image.dimensions(),
            FieldAssociation::Cells => image.cell_dimensions(),
        };
        Self {
            origin: image.origin().as_vec3(),
            spacing: image.spacing().as_vec3(),
            dimensions,
        }
    }

    /// Total number of samples.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.dimensions.x as usize * self.dimensions.y as usize * self.dimensions.z as usize
    }

    /// Checks that the field has samples and that `num_tuples` fills it exactly.
    pub fn validate(&self, num_tuples: usize) -> Result<()> {
        let samples = self.num_samples();
        if samples == 0 {
            let d = self.dimensions;
            return Err(VolstageError::DegenerateDimensions(d.x, d.y, d.z));
        }
        if samples != num_tuples {
            return Err(VolstageError::SizeMismatch {
                expected: samples,
                actual: num_tuples,
            });
        }
        Ok(())
    }
}

/// Backend sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterTag {
    Nearest,
    Linear,
}

impl FilterTag {
    /// The backend's name for this filter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterTag::Nearest => "nearest",
            FilterTag::Linear => "linear",
        }
    }
}

/// Maps an interpolation mode to a backend filter.
///
/// Returns `None` for modes the backend cannot express; the field then
/// keeps the backend default filter.
pub fn filter_for(
    interpolation: InterpolationType,
    diagnostics: &mut dyn DiagnosticSink,
) -> Option<FilterTag> {
    match interpolation {
        InterpolationType::Nearest => Some(FilterTag::Nearest),
        InterpolationType::Linear => Some(FilterTag::Linear),
        InterpolationType::Cubic => {
            diagnostics.warn(
                Component::SpatialField,
                "cubic interpolation is not supported, using the default filter",
            );
            None
        }
        InterpolationType::Other(code) => {
            diagnostics.warn(
                Component::SpatialField,
                format!("unknown interpolation mode {code}, using the default filter"),
            );
            None
        }
    }
}

type ConvertFn = fn(&ScalarBuffer, &mut [f32]) -> usize;

fn conversion_for(scalar_type: ScalarType) -> ConvertFn {
    match scalar_type {
        ScalarType::F64 => convert_typed::<f64>,
        ScalarType::F32 => convert_typed::<f32>,
        ScalarType::I32 => convert_typed::<i32>,
        ScalarType::U32 => convert_typed::<u32>,
        ScalarType::I8 => convert_typed::<i8>,
        ScalarType::U8 => convert_typed::<u8>,
        ScalarType::U16 => convert_typed::<u16>,
        ScalarType::I16 => convert_typed::<i16>,
        ScalarType::I64 | ScalarType::U64 | ScalarType::F16 => convert_generic,
    }
}

fn convert_typed<T: Scalar>(buffer: &ScalarBuffer, dst: &mut [f32]) -> usize {
    let Some(src) = T::view(buffer) else {
        return convert_generic(buffer, dst);
    };
    for (d, s) in dst.iter_mut().zip(src) {
        *d = s.to_f32();
    }
    src.len().min(dst.len())
}

fn convert_generic(buffer: &ScalarBuffer, dst: &mut [f32]) -> usize {
    let mut written = 0;
    for (d, s) in dst.iter_mut().zip(buffer.iter_f32()) {
        *d = s;
        written += 1;
    }
    written
}

/// Writes every value of `array` into `dst` in storage order, converted to
/// `f32` without rescaling. Returns the number of values written.
pub fn convert_to_f32(array: &DataArray, dst: &mut [f32]) -> usize {
    conversion_for(array.scalar_type())(array.buffer(), dst)
}

/// Creates a spatial field holding `scalars` and commits it.
///
/// `scalars` must be single-component with one tuple per sample of
/// `geometry` (see [`FieldGeometry::validate`]). The returned handle is
/// owned by the caller.
pub fn upload_spatial_field(
    device: &mut dyn VolumeDevice,
    geometry: &FieldGeometry,
    scalars: &DataArray,
    filter: Option<FilterTag>,
    diagnostics: &mut dyn DiagnosticSink,
) -> SpatialFieldHandle {
    let field = device.new_spatial_field(FIELD_SUBTYPE);
    device.set_parameter(field.object(), "origin", Parameter::Vec3(geometry.origin));
    device.set_parameter(field.object(), "spacing", Parameter::Vec3(geometry.spacing));
    if let Some(filter) = filter {
        device.set_parameter(
            field.object(),
            "filter",
            Parameter::String(filter.as_str().to_string()),
        );
    }

    let data = device.new_array_3d_f32(geometry.dimensions);
    match device.map_array_f32(data) {
        Some(dst) => {
            let written = convert_to_f32(scalars, dst);
            if written != dst.len() {
                diagnostics.error(
                    Component::SpatialField,
                    format!(
                        "'{}' filled {written} of {} field samples",
                        scalars.name(),
                        dst.len()
                    ),
                );
            }
        }
        None => diagnostics.error(
            Component::SpatialField,
            format!("could not map field array {}", data.object()),
        ),
    }
    device.unmap_array(data);

    set_and_release(device, field.object(), "data", data);
    device.commit_parameters(field.object());
    log::debug!(
        "uploaded '{}' ({:?}) as {}x{}x{} field {}",
        scalars.name(),
        scalars.scalar_type(),
        geometry.dimensions.x,
        geometry.dimensions.y,
        geometry.dimensions.z,
        field.object()
    );
    field
}
