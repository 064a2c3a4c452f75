//! Ownership of the device objects behind one mapped volume.

use volstage_core::{Component, DiagnosticSink};

use crate::device::{set_and_release, Parameter, SpatialFieldHandle, VolumeDevice, VolumeHandle};
use crate::transfer_function::DiscretizedTransferFunction;

/// Backend subtype of every volume this crate creates.
pub const VOLUME_SUBTYPE: &str = "transferFunction1D";

/// Receives the volumes to draw in the current frame.
pub trait VolumeStager {
    /// Adds a volume. `is_new` is set the first frame a volume is staged.
    fn add_volume(&mut self, volume: VolumeHandle, is_new: bool);
}

/// A [`VolumeStager`] that collects one frame's volumes.
#[derive(Debug, Clone, Default)]
pub struct FrameVolumes {
    volumes: Vec<(VolumeHandle, bool)>,
}

impl FrameVolumes {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Staged volumes in insertion order, with their `is_new` flags.
    pub fn volumes(&self) -> &[(VolumeHandle, bool)] {
        &self.volumes
    }

    /// Volumes staged for the first time.
    pub fn new_volumes(&self) -> impl Iterator<Item = VolumeHandle> + '_ {
        self.volumes.iter().filter(|(_, is_new)| *is_new).map(|(v, _)| *v)
    }

    /// Number of staged volumes.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Returns whether nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Empties the batch for the next frame.
    pub fn clear(&mut self) {
        self.volumes.clear();
    }
}

impl VolumeStager for FrameVolumes {
    fn add_volume(&mut self, volume: VolumeHandle, is_new: bool) {
        self.volumes.push((volume, is_new));
    }
}

/// The volume handle of one mapper and the spatial field attached to it.
///
/// The volume is created once and then updated in place. The spatial field
/// is owned by the volume through its `field` parameter, so replacing it
/// releases the previous field.
#[derive(Debug, Default)]
pub struct VolumeResources {
    volume: Option<VolumeHandle>,
    field: Option<SpatialFieldHandle>,
}

impl VolumeResources {
    /// Creates resources that hold no device objects yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The volume handle, if one was created.
    pub fn volume(&self) -> Option<VolumeHandle> {
        self.volume
    }

    /// The spatial field currently attached to the volume.
    pub fn spatial_field(&self) -> Option<SpatialFieldHandle> {
        self.field
    }

    /// Returns whether the volume exists on `device`.
    pub fn has_live_volume(&self, device: &dyn VolumeDevice) -> bool {
        self.volume.is_some_and(|v| device.is_live(v.object()))
    }

    /// Returns the volume, creating it if needed. The flag is true when the
    /// volume was created by this call.
    pub fn ensure_volume(&mut self, device: &mut dyn VolumeDevice) -> (VolumeHandle, bool) {
        if let Some(volume) = self.volume {
            if device.is_live(volume.object()) {
                return (volume, false);
            }
            log::warn!("volume {} is no longer live, recreating it", volume.object());
        }
        let volume = device.new_volume(VOLUME_SUBTYPE);
        log::debug!("created volume {}", volume.object());
        self.volume = Some(volume);
        self.field = None;
        (volume, true)
    }

    /// Hands `field` to the volume, releasing the previously attached field,
    /// and commits the volume.
    pub fn install_spatial_field(
        &mut self,
        device: &mut dyn VolumeDevice,
        field: SpatialFieldHandle,
        diagnostics: &mut dyn DiagnosticSink,
    ) {
        let Some(volume) = self.live_volume(device, diagnostics, "install a spatial field") else {
            device.release(field.object());
            return;
        };
        set_and_release(device, volume.object(), "field", field);
        device.commit_parameters(volume.object());
        self.field = Some(field);
    }

    /// Replaces the volume's value range and lookup tables and commits it.
    pub fn upload_transfer_function(
        &mut self,
        device: &mut dyn VolumeDevice,
        transfer_function: &DiscretizedTransferFunction,
        diagnostics: &mut dyn DiagnosticSink,
    ) {
        let Some(volume) = self.live_volume(device, diagnostics, "upload a transfer function")
        else {
            return;
        };
        device.set_parameter(
            volume.object(),
            "valueRange",
            Parameter::Box1(transfer_function.value_range),
        );
        let color = device.new_array_1d_vec3(&transfer_function.color);
        set_and_release(device, volume.object(), "color", color);
        let opacity = device.new_array_1d_f32(&transfer_function.opacity);
        set_and_release(device, volume.object(), "opacity", opacity);
        device.commit_parameters(volume.object());
    }

    /// Passes the volume to `stager` if it is live. Returns whether it was staged.
    pub fn stage(
        &self,
        device: &dyn VolumeDevice,
        stager: &mut dyn VolumeStager,
        is_new: bool,
    ) -> bool {
        match self.volume {
            Some(volume) if device.is_live(volume.object()) => {
                stager.add_volume(volume, is_new);
                true
            }
            _ => false,
        }
    }

    /// Releases the volume and, through it, the attached field and tables.
    pub fn release(&mut self, device: &mut dyn VolumeDevice) {
        if let Some(volume) = self.volume.take() {
            if device.is_live(volume.object()) {
                device.release(volume.object());
            }
        }
        self.field = None;
    }

    fn live_volume(
        &self,
        device: &dyn VolumeDevice,
        diagnostics: &mut dyn DiagnosticSink,
        action: &str,
    ) -> Option<VolumeHandle> {
        match self.volume {
            Some(volume) if device.is_live(volume.object()) => Some(volume),
            _ => {
                diagnostics.error(
                    Component::Resources,
                    format!("cannot {action} without a volume"),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ObjectKind;
    use crate::headless::HeadlessDevice;
    use glam::Vec3;
    use volstage_core::{Diagnostics, Severity};

    fn table() -> DiscretizedTransferFunction {
        DiscretizedTransferFunction {
            color: vec![Vec3::ZERO, Vec3::ONE],
            opacity: vec![0.0, 1.0],
            value_range: [2.0, 4.0],
        }
    }

    #[test]
    fn test_ensure_volume_creates_once() {
        let mut device = HeadlessDevice::new();
        let mut resources = VolumeResources::new();

        let (first, is_new) = resources.ensure_volume(&mut device);
        assert!(is_new);
        let (second, is_new) = resources.ensure_volume(&mut device);
        assert!(!is_new);
        assert_eq!(first, second);
        assert_eq!(device.store().subtype(first.object()), Some(VOLUME_SUBTYPE));
        assert_eq!(device.live_count(ObjectKind::Volume), 1);
    }

    #[test]
    fn test_installing_field_releases_previous() {
        let mut device = HeadlessDevice::new();
        let mut diagnostics = Diagnostics::new();
        let mut resources = VolumeResources::new();
        let (volume, _) = resources.ensure_volume(&mut device);

        let first = device.new_spatial_field("structuredRegular");
        resources.install_spatial_field(&mut device, first, &mut diagnostics);
        let second = device.new_spatial_field("structuredRegular");
        resources.install_spatial_field(&mut device, second, &mut diagnostics);

        assert!(!device.is_live(first.object()));
        assert!(device.is_live(second.object()));
        assert_eq!(device.live_count(ObjectKind::SpatialField), 1);
        assert_eq!(device.volume_field(volume), Some(second));
        assert_eq!(resources.spatial_field(), Some(second));
        assert_eq!(device.commit_count(volume), 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_upload_transfer_function_in_place() {
        let mut device = HeadlessDevice::new();
        let mut diagnostics = Diagnostics::new();
        let mut resources = VolumeResources::new();
        let (volume, _) = resources.ensure_volume(&mut device);

        resources.upload_transfer_function(&mut device, &table(), &mut diagnostics);
        resources.upload_transfer_function(&mut device, &table(), &mut diagnostics);

        assert_eq!(resources.volume(), Some(volume));
        assert_eq!(device.volume_value_range(volume), Some([2.0, 4.0]));
        assert_eq!(device.volume_colors(volume), Some(vec![Vec3::ZERO, Vec3::ONE]));
        assert_eq!(device.volume_opacities(volume), Some(&[0.0, 1.0][..]));
        // Replaced tables are released.
        assert_eq!(device.live_count(ObjectKind::Array), 2);
    }

    #[test]
    fn test_operations_without_volume_are_noops() {
        let mut device = HeadlessDevice::new();
        let mut diagnostics = Diagnostics::new();
        let mut resources = VolumeResources::new();

        let field = device.new_spatial_field("structuredRegular");
        resources.install_spatial_field(&mut device, field, &mut diagnostics);
        resources.upload_transfer_function(&mut device, &table(), &mut diagnostics);

        assert!(!device.is_live(field.object()));
        assert_eq!(device.live_count(ObjectKind::Array), 0);
        assert_eq!(diagnostics.with_severity(Severity::Error).count(), 2);
    }

    #[test]
    fn test_stage_and_release() {
        let mut device = HeadlessDevice::new();
        let mut diagnostics = Diagnostics::new();
        let mut resources = VolumeResources::new();
        let mut frame = FrameVolumes::new();

        assert!(!resources.stage(&device, &mut frame, true));
        let (volume, is_new) = resources.ensure_volume(&mut device);
        let field = device.new_spatial_field("structuredRegular");
        resources.install_spatial_field(&mut device, field, &mut diagnostics);
        assert!(resources.stage(&device, &mut frame, is_new));
        assert_eq!(frame.volumes(), &[(volume, true)]);
        assert_eq!(frame.new_volumes().count(), 1);

        resources.release(&mut device);
        assert!(resources.volume().is_none());
        assert_eq!(device.store().live_handles(ObjectKind::Volume).len(), 0);
        assert!(!device.is_live(field.object()));

        frame.clear();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_dead_volume_is_recreated() {
        let mut device = HeadlessDevice::new();
        let mut resources = VolumeResources::new();
        let (first, _) = resources.ensure_volume(&mut device);
        device.release(first.object());

        let (second, is_new) = resources.ensure_volume(&mut device);
        assert!(is_new);
        assert_ne!(first, second);
    }
}
