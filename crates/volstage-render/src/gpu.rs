//! wgpu backend.
//!
//! Objects and parameters are kept in an [`ObjectStore`]; committing a
//! spatial field or volume turns its current parameters into GPU resources:
//! the field samples become an `R32Float` 3D texture, the color table an
//! `Rgba32Float` 1D texture and the opacity table an `R32Float` 1D texture.

use std::collections::HashMap;

use glam::{UVec3, Vec3};
use pollster::FutureExt;
use wgpu::util::DeviceExt;

use crate::device::{
    ArrayHandle, ObjectHandle, ObjectKind, Parameter, SpatialFieldHandle, VolumeDevice,
    VolumeHandle,
};
use crate::error::{RenderError, RenderResult};
use crate::store::{ArrayShape, ObjectStore};

/// Uniforms describing a spatial field's placement.
/// Layout must match WGSL `FieldUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct FieldUniforms {
    /// World position of sample (0, 0, 0).
    pub origin: [f32; 3],
    pub _pad0: f32,
    /// Distance between adjacent samples.
    pub spacing: [f32; 3],
    pub _pad1: f32,
    /// Samples per axis.
    pub dimensions: [u32; 3],
    pub _pad2: u32,
}

/// Uniforms describing a volume's transfer function domain.
/// Layout must match WGSL `VolumeUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct VolumeUniforms {
    /// Scalar value mapped to the first and last table entry.
    pub value_range: [f32; 2],
    /// Number of color and opacity table entries.
    pub table_sizes: [u32; 2],
}

/// GPU resources of a committed spatial field.
pub struct GpuSpatialField {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub uniform_buffer: wgpu::Buffer,
    pub dimensions: UVec3,
}

/// GPU resources of a committed volume.
pub struct GpuVolume {
    pub color_texture: wgpu::Texture,
    pub opacity_texture: wgpu::Texture,
    pub uniform_buffer: wgpu::Buffer,
    /// The spatial field attached at commit time.
    pub field: Option<SpatialFieldHandle>,
}

/// A device that stages volumes into wgpu resources.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    store: ObjectStore,
    fields: HashMap<ObjectHandle, GpuSpatialField>,
    volumes: HashMap<ObjectHandle, GpuVolume>,
}

impl WgpuDevice {
    /// Wraps an existing wgpu device and queue.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            store: ObjectStore::new(),
            fields: HashMap::new(),
            volumes: HashMap::new(),
        }
    }

    /// Creates a device without a surface.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("volstage device (headless)"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        log::info!("created headless wgpu device on {:?}", adapter.get_info().name);
        Ok(Self::new(device, queue))
    }

    /// Blocking variant of [`Self::new_headless`].
    pub fn new_headless_blocking() -> RenderResult<Self> {
        Self::new_headless().block_on()
    }

    /// Returns the wgpu device.
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns the object bookkeeping.
    #[must_use]
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Returns the GPU resources of a committed spatial field.
    #[must_use]
    pub fn spatial_field(&self, field: SpatialFieldHandle) -> Option<&GpuSpatialField> {
        self.fields.get(&field.object())
    }

    /// Returns the GPU resources of a committed volume.
    #[must_use]
    pub fn volume(&self, volume: VolumeHandle) -> Option<&GpuVolume> {
        self.volumes.get(&volume.object())
    }

    fn drop_gpu_resources(&mut self, destroyed: &[ObjectHandle]) {
        for handle in destroyed {
            self.fields.remove(handle);
            self.volumes.remove(handle);
        }
    }

    fn vec3_parameter(&self, object: ObjectHandle, name: &str) -> Vec3 {
        match self.store.parameter(object, name) {
            Some(Parameter::Vec3(v)) => *v,
            _ => Vec3::ZERO,
        }
    }

    fn commit_spatial_field(&mut self, object: ObjectHandle) {
        let Some(data) = self.store.object_parameter(object, "data") else {
            log::error!("spatial field {object} committed without data");
            self.fields.remove(&object);
            return;
        };
        let (Some(ArrayShape::D3(dimensions)), Some(values)) =
            (self.store.array_shape(data), self.store.array_values(data))
        else {
            log::error!("spatial field {object} data is not a 3D array");
            self.fields.remove(&object);
            return;
        };
        if dimensions.min_element() == 0 {
            log::error!("spatial field {object} has empty dimensions {dimensions}");
            self.fields.remove(&object);
            return;
        }
        let limit = self.device.limits().max_texture_dimension_3d;
        if dimensions.max_element() > limit {
            log::error!(
                "spatial field {object} dimensions {dimensions} exceed \
                 the 3D texture limit {limit}"
            );
            self.fields.remove(&object);
            return;
        }

        let size = wgpu::Extent3d {
            width: dimensions.x,
            height: dimensions.y,
            depth_or_array_layers: dimensions.z,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("spatial field texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(values),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(dimensions.x * 4),
                rows_per_image: Some(dimensions.y),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let filter = match self.store.parameter(object, "filter") {
            Some(Parameter::String(tag)) if tag == "nearest" => wgpu::FilterMode::Nearest,
            _ => wgpu::FilterMode::Linear,
        };
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("spatial field sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let uniforms = FieldUniforms {
            origin: self.vec3_parameter(object, "origin").to_array(),
            _pad0: 0.0,
            spacing: self.vec3_parameter(object, "spacing").to_array(),
            _pad1: 0.0,
            dimensions: dimensions.to_array(),
            _pad2: 0,
        };
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("spatial field uniforms"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        self.fields.insert(
            object,
            GpuSpatialField {
                texture,
                view,
                sampler,
                uniform_buffer,
                dimensions,
            },
        );
    }

    fn create_table_texture(
        &self,
        label: &str,
        format: wgpu::TextureFormat,
        texels: &[f32],
        width: u32,
        floats_per_texel: u32,
    ) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if width > 0 {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(texels),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * floats_per_texel * 4),
                    rows_per_image: None,
                },
                size,
            );
        }
        texture
    }

    /// Returns the table length as a texture width, if the device can hold it.
    fn table_width(&self, object: ObjectHandle, table: &str, len: usize) -> Option<u32> {
        let limit = self.device.limits().max_texture_dimension_1d;
        match u32::try_from(len) {
            Ok(width) if width <= limit => Some(width),
            _ => {
                log::error!(
                    "volume {object} {table} table of {len} entries exceeds \
                     the 1D texture limit {limit}"
                );
                None
            }
        }
    }

    fn commit_volume(&mut self, object: ObjectHandle) {
        let colors = self
            .store
            .object_parameter(object, "color")
            .and_then(|a| self.store.array_vec3(a))
            .unwrap_or_default();
        let opacities = self
            .store
            .object_parameter(object, "opacity")
            .and_then(|a| self.store.array_values(a))
            .map(<[f32]>::to_vec)
            .unwrap_or_default();
        let value_range = match self.store.parameter(object, "valueRange") {
            Some(Parameter::Box1(range)) => *range,
            _ => [0.0, 1.0],
        };

        let (Some(color_width), Some(opacity_width)) = (
            self.table_width(object, "color", colors.len()),
            self.table_width(object, "opacity", opacities.len()),
        ) else {
            self.volumes.remove(&object);
            return;
        };

        let rgba: Vec<f32> = colors
            .iter()
            .flat_map(|c| [c.x, c.y, c.z, 1.0])
            .collect();
        let color_texture = self.create_table_texture(
            "volume color table",
            wgpu::TextureFormat::Rgba32Float,
            &rgba,
            color_width,
            4,
        );
        let opacity_texture = self.create_table_texture(
            "volume opacity table",
            wgpu::TextureFormat::R32Float,
            &opacities,
            opacity_width,
            1,
        );

        let uniforms = VolumeUniforms {
            value_range,
            table_sizes: [color_width, opacity_width],
        };
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("volume uniforms"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let field = self
            .store
            .object_parameter(object, "field")
            .map(SpatialFieldHandle::new);

        self.volumes.insert(
            object,
            GpuVolume {
                color_texture,
                opacity_texture,
                uniform_buffer,
                field,
            },
        );
    }
}

impl VolumeDevice for WgpuDevice {
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
        self.drop_gpu_resources(&destroyed);
    }

    fn commit_parameters(&mut self, object: ObjectHandle) {
        if !self.store.commit(object) {
            return;
        }
        match self.store.kind(object) {
            Some(ObjectKind::SpatialField) => self.commit_spatial_field(object),
            Some(ObjectKind::Volume) => self.commit_volume(object),
            Some(ObjectKind::Array) | None => {}
        }
    }

    fn release(&mut self, object: ObjectHandle) {
        let destroyed = self.store.release(object);
        self.drop_gpu_resources(&destroyed);
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
    fn test_uniform_layouts() {
        assert_eq!(std::mem::size_of::<FieldUniforms>(), 48);
        assert_eq!(std::mem::size_of::<VolumeUniforms>(), 16);
    }

    /// Requires a GPU adapter (real or software fallback); skipped otherwise.
    #[test]
    fn test_commit_creates_gpu_resources() {
        let mut device = match WgpuDevice::new_headless_blocking() {
            Ok(device) => device,
            Err(e) => {
                eprintln!("Skipping wgpu device test: {e}");
                return;
            }
        };

        let volume = device.new_volume("transferFunction1D");
        let field = device.new_spatial_field("structuredRegular");
        let data = device.new_array_3d_f32(UVec3::new(2, 2, 2));
        if let Some(values) = device.map_array_f32(data) {
            values.copy_from_slice(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        }
        device.unmap_array(data);
        set_and_release(&mut device, field.object(), "data", data);
        device.set_parameter(
            field.object(),
            "filter",
            Parameter::String("nearest".to_string()),
        );
        device.commit_parameters(field.object());
        assert_eq!(
            device.spatial_field(field).map(|f| f.dimensions),
            Some(UVec3::new(2, 2, 2))
        );

        set_and_release(&mut device, volume.object(), "field", field);
        let colors = device.new_array_1d_vec3(&[Vec3::ZERO, Vec3::ONE]);
        set_and_release(&mut device, volume.object(), "color", colors);
        device.commit_parameters(volume.object());
        assert_eq!(device.volume(volume).and_then(|v| v.field), Some(field));

        device.release(volume.object());
        assert!(device.volume(volume).is_none());
        assert!(device.spatial_field(field).is_none());
    }
}
