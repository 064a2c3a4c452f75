//! Reference-counted object bookkeeping shared by the device backends.

use std::collections::HashMap;
use std::num::NonZeroU64;

use glam::{UVec3, Vec3};

use crate::device::{ObjectHandle, ObjectKind, Parameter};

/// Shape of a data array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayShape {
    /// `len` elements of `components` floats each.
    D1 { len: usize, components: usize },
    /// A 3D grid of single floats.
    D3(UVec3),
}

impl ArrayShape {
    /// Number of floats stored.
    #[must_use]
    pub fn num_floats(&self) -> usize {
        match *self {
            ArrayShape::D1 { len, components } => len * components,
            ArrayShape::D3(dim) => dim.x as usize * dim.y as usize * dim.z as usize,
        }
    }
}

#[derive(Debug)]
struct ArrayData {
    shape: ArrayShape,
    values: Vec<f32>,
    mapped: bool,
}

#[derive(Debug)]
struct Object {
    kind: ObjectKind,
    subtype: String,
    refs: u32,
    params: HashMap<String, Parameter>,
    array: Option<ArrayData>,
    commits: u32,
}

/// Objects, their parameters and reference counts.
#[derive(Debug)]
pub struct ObjectStore {
    objects: HashMap<ObjectHandle, Object>,
    next_id: u64,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: 1,
        }
    }
}

impl ObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &mut self,
        kind: ObjectKind,
        subtype: &str,
        array: Option<ArrayData>,
    ) -> ObjectHandle {
        let raw = NonZeroU64::new(self.next_id).unwrap_or(NonZeroU64::MIN);
        self.next_id += 1;
        let handle = ObjectHandle::from_raw(raw);
        self.objects.insert(
            handle,
            Object {
                kind,
                subtype: subtype.to_string(),
                refs: 1,
                params: HashMap::new(),
                array,
                commits: 0,
            },
        );
        handle
    }

    /// Creates a volume or spatial field object.
    pub fn create(&mut self, kind: ObjectKind, subtype: &str) -> ObjectHandle {
        self.insert(kind, subtype, None)
    }

    /// Creates an array object.
    pub fn create_array(&mut self, shape: ArrayShape, values: Vec<f32>) -> ObjectHandle {
        debug_assert_eq!(shape.num_floats(), values.len());
        let subtype = match shape {
            ArrayShape::D1 { .. } => "array1d",
            ArrayShape::D3(_) => "array3d",
        };
        self.insert(
            ObjectKind::Array,
            subtype,
            Some(ArrayData {
                shape,
                values,
                mapped: false,
            }),
        )
    }

    /// Creates a zero-filled 3D float array.
    pub fn create_array_3d(&mut self, dimensions: UVec3) -> ObjectHandle {
        let shape = ArrayShape::D3(dimensions);
        self.create_array(shape, vec![0.0; shape.num_floats()])
    }

    /// Creates a 1D array of vec3 elements.
    pub fn create_array_1d_vec3(&mut self, data: &[Vec3]) -> ObjectHandle {
        let shape = ArrayShape::D1 {
            len: data.len(),
            components: 3,
        };
        self.create_array(shape, data.iter().flat_map(|c| c.to_array()).collect())
    }

    /// Creates a 1D array of floats.
    pub fn create_array_1d_f32(&mut self, data: &[f32]) -> ObjectHandle {
        let shape = ArrayShape::D1 {
            len: data.len(),
            components: 1,
        };
        self.create_array(shape, data.to_vec())
    }

    /// Returns whether `handle` exists.
    #[must_use]
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    /// Returns the kind of `handle`.
    #[must_use]
    pub fn kind(&self, handle: ObjectHandle) -> Option<ObjectKind> {
        self.objects.get(&handle).map(|o| o.kind)
    }

    /// Returns the subtype `handle` was created with.
    #[must_use]
    pub fn subtype(&self, handle: ObjectHandle) -> Option<&str> {
        self.objects.get(&handle).map(|o| o.subtype.as_str())
    }

    /// Returns the current reference count of `handle`.
    #[must_use]
    pub fn ref_count(&self, handle: ObjectHandle) -> u32 {
        self.objects.get(&handle).map_or(0, |o| o.refs)
    }

    /// Counts live objects of one kind.
    #[must_use]
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.objects.values().filter(|o| o.kind == kind).count()
    }

    /// Returns live handles of one kind, in creation order.
    #[must_use]
    pub fn live_handles(&self, kind: ObjectKind) -> Vec<ObjectHandle> {
        let mut handles: Vec<_> = self
            .objects
            .iter()
            .filter(|(_, o)| o.kind == kind)
            .map(|(h, _)| *h)
            .collect();
        handles.sort();
        handles
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn parameter(&self, handle: ObjectHandle, name: &str) -> Option<&Parameter> {
        self.objects.get(&handle)?.params.get(name)
    }

    /// Looks up an object parameter.
    #[must_use]
    pub fn object_parameter(&self, handle: ObjectHandle, name: &str) -> Option<ObjectHandle> {
        match self.parameter(handle, name)? {
            Parameter::Object(target) => Some(*target),
            _ => None,
        }
    }

    /// Returns the values of an array.
    #[must_use]
    pub fn array_values(&self, handle: ObjectHandle) -> Option<&[f32]> {
        self.objects
            .get(&handle)?
            .array
            .as_ref()
            .map(|a| a.values.as_slice())
    }

    /// Returns the shape of an array.
    #[must_use]
    pub fn array_shape(&self, handle: ObjectHandle) -> Option<ArrayShape> {
        self.objects.get(&handle)?.array.as_ref().map(|a| a.shape)
    }

    /// Maps an array for writing.
    pub fn map(&mut self, handle: ObjectHandle) -> Option<&mut [f32]> {
        let array = self.objects.get_mut(&handle)?.array.as_mut()?;
        array.mapped = true;
        Some(array.values.as_mut_slice())
    }

    /// Ends a mapping.
    pub fn unmap(&mut self, handle: ObjectHandle) {
        if let Some(array) = self.objects.get_mut(&handle).and_then(|o| o.array.as_mut()) {
            array.mapped = false;
        }
    }

    /// Returns whether an array is currently mapped.
    #[must_use]
    pub fn is_mapped(&self, handle: ObjectHandle) -> bool {
        self.objects
            .get(&handle)
            .and_then(|o| o.array.as_ref())
            .is_some_and(|a| a.mapped)
    }

    /// Sets a parameter. Returns the objects destroyed as a consequence.
    ///
    /// Object values are retained; a replaced object value is released.
    pub fn set_parameter(
        &mut self,
        handle: ObjectHandle,
        name: &str,
        value: Parameter,
    ) -> Vec<ObjectHandle> {
        if !self.objects.contains_key(&handle) {
            log::error!("set_parameter '{name}' on invalid handle {handle}");
            return Vec::new();
        }
        if let Parameter::Object(target) = &value {
            if !self.retain(*target) {
                log::error!("parameter '{name}' of {handle} refers to invalid handle {target}");
                return Vec::new();
            }
        }

        let previous = self
            .objects
            .get_mut(&handle)
            .and_then(|o| o.params.insert(name.to_string(), value));

        match previous {
            Some(Parameter::Object(old)) => self.release(old),
            _ => Vec::new(),
        }
    }

    /// Marks `handle` committed. Returns false for invalid handles.
    pub fn commit(&mut self, handle: ObjectHandle) -> bool {
        match self.objects.get_mut(&handle) {
            Some(object) => {
                object.commits += 1;
                true
            }
            None => {
                log::error!("commit on invalid handle {handle}");
                false
            }
        }
    }

    /// Returns how often `handle` was committed.
    #[must_use]
    pub fn commit_count(&self, handle: ObjectHandle) -> u32 {
        self.objects.get(&handle).map_or(0, |o| o.commits)
    }

    fn retain(&mut self, handle: ObjectHandle) -> bool {
        match self.objects.get_mut(&handle) {
            Some(object) => {
                object.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference. Returns every object destroyed as a result,
    /// including objects only kept alive through parameters.
    pub fn release(&mut self, handle: ObjectHandle) -> Vec<ObjectHandle> {
        let mut destroyed = Vec::new();
        let mut pending = vec![handle];

        while let Some(current) = pending.pop() {
            let Some(object) = self.objects.get_mut(&current) else {
                log::error!("release of invalid handle {current}");
                continue;
            };
            object.refs -= 1;
            if object.refs > 0 {
                continue;
            }
            if let Some(object) = self.objects.remove(&current) {
                pending.extend(object.params.into_values().filter_map(|p| match p {
                    Parameter::Object(target) => Some(target),
                    _ => None,
                }));
                destroyed.push(current);
            }
        }

        destroyed
    }

    /// Vec3 values of a 3-component 1D array.
    #[must_use]
    pub fn array_vec3(&self, handle: ObjectHandle) -> Option<Vec<Vec3>> {
        match self.array_shape(handle)? {
            ArrayShape::D1 { components: 3, .. } => Some(
                self.array_values(handle)?
                    .chunks_exact(3)
                    .map(Vec3::from_slice)
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_parameter_keeps_target_alive() {
        let mut store = ObjectStore::new();
        let volume = store.create(ObjectKind::Volume, "transferFunction1D");
        let field = store.create(ObjectKind::SpatialField, "structuredRegular");

        store.set_parameter(volume, "field", Parameter::Object(field));
        assert!(store.release(field).is_empty());
        assert!(store.contains(field));
        assert_eq!(store.ref_count(field), 1);

        let destroyed = store.release(volume);
        assert_eq!(destroyed.len(), 2);
        assert!(!store.contains(field));
        assert!(!store.contains(volume));
    }

    #[test]
    fn test_replacing_object_parameter_releases_old() {
        let mut store = ObjectStore::new();
        let volume = store.create(ObjectKind::Volume, "transferFunction1D");
        let first = store.create(ObjectKind::SpatialField, "structuredRegular");
        store.set_parameter(volume, "field", Parameter::Object(first));
        store.release(first);

        let second = store.create(ObjectKind::SpatialField, "structuredRegular");
        let destroyed = store.set_parameter(volume, "field", Parameter::Object(second));
        store.release(second);

        assert_eq!(destroyed, vec![first]);
        assert_eq!(store.live_count(ObjectKind::SpatialField), 1);
        assert_eq!(store.object_parameter(volume, "field"), Some(second));
    }

    #[test]
    fn test_invalid_handles_are_ignored() {
        let mut store = ObjectStore::new();
        let volume = store.create(ObjectKind::Volume, "transferFunction1D");
        store.release(volume);

        assert!(store
            .set_parameter(volume, "valueRange", Parameter::Box1([0.0, 1.0]))
            .is_empty());
        assert!(!store.commit(volume));
        assert!(store.release(volume).is_empty());
    }

    #[test]
    fn test_array_mapping() {
        let mut store = ObjectStore::new();
        let array = store.create_array(ArrayShape::D3(UVec3::new(2, 1, 1)), vec![0.0; 2]);
        store.map(array).unwrap().copy_from_slice(&[1.0, 2.0]);
        assert!(store.is_mapped(array));
        store.unmap(array);
        assert!(!store.is_mapped(array));
        assert_eq!(store.array_values(array), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_array_vec3() {
        let mut store = ObjectStore::new();
        let array = store.create_array(
            ArrayShape::D1 {
                len: 2,
                components: 3,
            },
            vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        );
        assert_eq!(
            store.array_vec3(array),
            Some(vec![Vec3::Z, Vec3::X])
        );
    }
}
