//! In-memory reference backend.
//!
//! [`HeadlessDevice`] implements the full device operation set without a
//! GPU. It keeps every object, parameter and array so hosts and tests can
//! inspect exactly what the pipeline staged.

use glam::{UVec3, Vec3};

use crate::device::{
    ArrayHandle, ObjectHandle, ObjectKind, Parameter, SpatialFieldHandle, VolumeDevice,
    VolumeHandle,
};
use crate::store::{ArrayShape, ObjectStore};

/// A device that records objects in memory.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    store: ObjectStore,
}

impl HeadlessDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object bookkeeping.
    #[must_use]
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Counts live objects of one kind.
    #[must_use]
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.store.live_count(kind)
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn parameter(&self, object: impl Into<ObjectHandle>, name: &str) -> Option<&Parameter> {
        self.store.parameter(object.into(), name)
    }

    /// Returns the spatial field attached to a volume.
    #[must_use]
    pub fn volume_field(&self, volume: VolumeHandle) -> Option<SpatialFieldHandle> {
        self.store
            .object_parameter(volume.object(), "field")
            .map(SpatialFieldHandle::new)
    }

    /// Returns the uploaded samples of a spatial field.
    #[must_use]
    pub fn field_samples(&self, field: SpatialFieldHandle) -> Option<&[f32]> {
        let data = self.store.object_parameter(field.object(), "data")?;
        self.store.array_values(data)
    }

    /// Returns the sample grid dimensions of a spatial field.
    #[must_use]
    pub fn field_dimensions(&self, field: SpatialFieldHandle) -> Option<UVec3> {
        let data = self.store.object_parameter(field.object(), "data")?;
        match self.store.array_shape(data)? {
            ArrayShape::D3(dim) => Some(dim),
            ArrayShape::D1 { .. } => None,
        }
    }

    /// Returns the color table attached to a volume.
    #[must_use]
    pub fn volume_colors(&self, volume: VolumeHandle) -> Option<Vec<Vec3>> {
        let array = self.store.object_parameter(volume.object(), "color")?;
        self.store.array_vec3(array)
    }

    /// Returns the opacity table attached to a volume.
    #[must_use]
    pub fn volume_opacities(&self, volume: VolumeHandle) -> Option<&[f32]> {
        let array = self.store.object_parameter(volume.object(), "opacity")?;
        self.store.array_values(array)
    }

    /// Returns the value range of a volume.
    #[must_use]
    pub fn volume_value_range(&self, volume: VolumeHandle) -> Option<[f32; 2]> {
        match self.store.parameter(volume.object(), "valueRange")? {
            Parameter::Box1(range) => Some(*range),
            _ => None,
        }
    }

    /// Returns how often an object was committed.
    #[must_use]
    pub fn commit_count(&self, object: impl Into<ObjectHandle>) -> u32 {
        self.store.commit_count(object.into())
    }
}

impl VolumeDevice for HeadlessDevice {
    fn new_volume(&mut self, subtype: &str) -> VolumeHandle {
        VolumeHandle::new(self.store.create(ObjectKind::Volume, subtype))
    }

    fn new_spatial_field(&mut self, subtype: &str) -> SpatialFieldHandle {
        SpatialFieldHandle::new(self.store.create(ObjectKind::SpatialField, subtype))
    }

    fn new_array_3d_f32(&mut self, dimensions: UVec3) -> ArrayHandle {
        ArrayHandle::new(self.store.create_array_3d(dimensions))
    }

    fn new_array_1d_vec3(&mut self, data: &[Vec3]) -> ArrayHandle {
        ArrayHandle::new(self.store.create_array_1d_vec3(data))
    }

    fn new_array_1d_f32(&mut self, data: &[f32]) -> ArrayHandle {
        ArrayHandle::new(self.store.create_array_1d_f32(data))
    }

    fn map_array_f32(&mut self, array: ArrayHandle) -> Option<&mut [f32]> {
        self.store.map(array.object())
    }

    fn unmap_array(&mut self, array: ArrayHandle) {
        self.store.unmap(array.object());
    }

    fn set_parameter(&mut self, object: ObjectHandle, name: &str, value: Parameter) {
        let destroyed = self.store.set_parameter(object, name, value);
        if !destroyed.is_empty() {
            log::trace!("parameter '{name}' replaced, destroyed {destroyed:?}");
        }
    }

    fn commit_parameters(&mut self, object: ObjectHandle) {
        self.store.commit(object);
    }

    fn release(&mut self, object: ObjectHandle) {
        self.store.release(object);
    }

    fn is_live(&self, object: ObjectHandle) -> bool {
        self.store.contains(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::set_and_release;

    #[test]
    fn test_field_inspection() {
        let mut device = HeadlessDevice::new();
        let field = device.new_spatial_field("structuredRegular");
        let array = device.new_array_3d_f32(UVec3::new(2, 2, 1));
        device
            .map_array_f32(array)
            .unwrap()
            .copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        device.unmap_array(array);
        set_and_release(&mut device, field.object(), "data", array);

        assert_eq!(device.field_samples(field), Some(&[1.0, 2.0, 3.0, 4.0][..]));
        assert_eq!(device.field_dimensions(field), Some(UVec3::new(2, 2, 1)));
        assert_eq!(device.live_count(ObjectKind::Array), 1);
    }

    #[test]
    fn test_volume_tables() {
        let mut device = HeadlessDevice::new();
        let volume = device.new_volume("transferFunction1D");
        let colors = device.new_array_1d_vec3(&[Vec3::X, Vec3::Y]);
        let opacities = device.new_array_1d_f32(&[0.0, 1.0]);
        set_and_release(&mut device, volume.object(), "color", colors);
        set_and_release(&mut device, volume.object(), "opacity", opacities);
        device.set_parameter(volume.object(), "valueRange", Parameter::Box1([0.0, 2.0]));
        device.commit_parameters(volume.object());

        assert_eq!(device.volume_colors(volume), Some(vec![Vec3::X, Vec3::Y]));
        assert_eq!(device.volume_opacities(volume), Some(&[0.0, 1.0][..]));
        assert_eq!(device.volume_value_range(volume), Some([0.0, 2.0]));
        assert_eq!(device.commit_count(volume), 1);

        device.release(volume.object());
        assert_eq!(device.live_count(ObjectKind::Array), 0);
        assert!(!device.is_live(volume.object()));
    }
}
