//! Backend device interface.
//!
//! A backend exposes opaque, reference-counted objects (volumes, spatial
//! fields, arrays) through a small fixed operation set. Parameters set on an
//! object take effect when the object is committed. An object parameter
//! keeps its target alive until the parameter is replaced or the holder is
//! destroyed.

use std::fmt;
use std::num::NonZeroU64;

use glam::{UVec3, Vec3};

/// An opaque reference to a backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(NonZeroU64);

impl ObjectHandle {
    /// Wraps a raw, non-zero id.
    #[must_use]
    pub fn from_raw(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Volume,
    SpatialField,
    Array,
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(ObjectHandle);

        impl $name {
            /// Wraps an untyped handle.
            #[must_use]
            pub fn new(handle: ObjectHandle) -> Self {
                Self(handle)
            }

            /// Returns the untyped handle.
            #[must_use]
            pub fn object(self) -> ObjectHandle {
                self.0
            }
        }

        impl From<$name> for ObjectHandle {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }
    };
}

typed_handle!(
    /// Handle to a backend volume object.
    VolumeHandle
);
typed_handle!(
    /// Handle to a backend spatial field object.
    SpatialFieldHandle
);
typed_handle!(
    /// Handle to a backend data array.
    ArrayHandle
);

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Vec3(Vec3),
    /// A closed interval `[lo, hi]`.
    Box1([f32; 2]),
    String(String),
    Object(ObjectHandle),
}

/// The operation set every rendering backend provides.
pub trait VolumeDevice {
    /// Creates a volume object of the given subtype.
    fn new_volume(&mut self, subtype: &str) -> VolumeHandle;

    /// Creates a spatial field object of the given subtype.
    fn new_spatial_field(&mut self, subtype: &str) -> SpatialFieldHandle;

    /// Creates a zero-filled 3D array of single-precision floats.
    fn new_array_3d_f32(&mut self, dimensions: UVec3) -> ArrayHandle;

    /// Creates a 1D array of float triples holding a copy of `data`.
    fn new_array_1d_vec3(&mut self, data: &[Vec3]) -> ArrayHandle;

    /// Creates a 1D array of floats holding a copy of `data`.
    fn new_array_1d_f32(&mut self, data: &[f32]) -> ArrayHandle;

    /// Maps a float array for writing. Returns `None` for invalid handles.
    fn map_array_f32(&mut self, array: ArrayHandle) -> Option<&mut [f32]>;

    /// Ends a mapping started by [`VolumeDevice::map_array_f32`].
    fn unmap_array(&mut self, array: ArrayHandle);

    /// Sets a parameter; takes effect at the next commit.
    fn set_parameter(&mut self, object: ObjectHandle, name: &str, value: Parameter);

    /// Applies all pending parameters of `object`.
    fn commit_parameters(&mut self, object: ObjectHandle);

    /// Drops the caller's reference to `object`.
    fn release(&mut self, object: ObjectHandle);

    /// Returns whether `object` still exists.
    fn is_live(&self, object: ObjectHandle) -> bool;
}

/// Sets `value` as an object parameter and drops the caller's reference to
/// it, handing ownership to `object`.
pub fn set_and_release(
    device: &mut dyn VolumeDevice,
    object: ObjectHandle,
    name: &str,
    value: impl Into<ObjectHandle>,
) {
    let value = value.into();
    device.set_parameter(object, name, Parameter::Object(value));
    device.release(value);
}
