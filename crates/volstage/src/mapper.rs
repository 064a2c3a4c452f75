//! The per-frame volume mapping pipeline.
//!
//! A [`VolumeMapperNode`] owns one device volume. Each call to
//! [`VolumeMapperNode::render`] resolves the input array, asks the staleness
//! tracker what changed, rebuilds the spatial field and/or the transfer
//! function accordingly and hands the volume to the frame's stager.

use volstage_core::{
    Component, DiagnosticSink, MapperOptions, RebuildPlan, StalenessInputs, StalenessTracker,
};
use volstage_render::{
    filter_for, upload_spatial_field, DiscretizedTransferFunction, FieldGeometry,
    TransferFunctionBuilder, VolumeDevice, VolumeResources, VolumeStager,
};
use volstage_structures::{
    extract_scalar_channel, DataArray, ImageData, VectorMode, VolumeProperty,
};

use crate::scene::{Volume, VolumeMapperInput};

/// Why a render call returned without staging a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The volume is hidden.
    Hidden,
    /// The volume has no property.
    NoProperty,
    /// No input is connected, or it produced no data set.
    NoInput,
    /// The input is not a structured grid.
    NotImageData,
    /// The selected scalar array does not exist.
    NoScalars,
    /// The grid and the array cannot form a field.
    InvalidField,
}

/// Result of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The volume was staged; `plan` is the work this call did.
    Staged { is_new: bool, plan: RebuildPlan },
    /// Nothing was staged; device resources were left as they were.
    Skipped(SkipReason),
}

impl RenderOutcome {
    /// Returns whether the volume was handed to the stager.
    pub fn is_staged(&self) -> bool {
        matches!(self, RenderOutcome::Staged { .. })
    }

    /// Returns why the call skipped, if it did.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            RenderOutcome::Skipped(reason) => Some(*reason),
            RenderOutcome::Staged { .. } => None,
        }
    }
}

/// Everything a mapper keeps between render calls.
#[derive(Debug, Default)]
pub struct MapperState {
    pub tracker: StalenessTracker,
    pub resources: VolumeResources,
    /// The tables currently uploaded to the volume.
    pub transfer_function: Option<DiscretizedTransferFunction>,
    /// Value range of the scalars the current field was built from.
    pub field_range: Option<(f64, f64)>,
}

/// Stages one volume per frame into a [`VolumeDevice`].
#[derive(Debug, Default)]
pub struct VolumeMapperNode {
    options: MapperOptions,
    state: MapperState,
}

impl VolumeMapperNode {
    /// Creates a mapper with default table sizes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper with the given table sizes.
    pub fn with_options(options: MapperOptions) -> Self {
        Self {
            options,
            state: MapperState::default(),
        }
    }

    /// Returns the current options.
    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Sets the color table resolution (at least 1).
    pub fn set_color_size(&mut self, color_size: usize) {
        self.options = self.options.with_color_size(color_size);
    }

    /// Sets the opacity table resolution (at least 1).
    pub fn set_opacity_size(&mut self, opacity_size: usize) {
        self.options = self.options.with_opacity_size(opacity_size);
    }

    /// Returns the state kept between render calls.
    pub fn state(&self) -> &MapperState {
        &self.state
    }

    /// Runs the pipeline for one frame.
    ///
    /// Missing inputs end the call early with a diagnostic and leave all
    /// previously staged device objects untouched.
    pub fn render(
        &mut self,
        volume: &Volume,
        input: Option<&mut dyn VolumeMapperInput>,
        device: &mut dyn VolumeDevice,
        stager: &mut dyn VolumeStager,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> RenderOutcome {
        if !volume.visible() {
            diagnostics.debug(Component::Mapper, "volume is not visible");
            return RenderOutcome::Skipped(SkipReason::Hidden);
        }
        let Some(property) = volume.property() else {
            diagnostics.debug(Component::Mapper, "volume has no property");
            return RenderOutcome::Skipped(SkipReason::NoProperty);
        };
        let Some(input) = input else {
            diagnostics.debug(Component::Mapper, "no input connected");
            return RenderOutcome::Skipped(SkipReason::NoInput);
        };

        input.update();
        let Some(data_set) = input.data_set() else {
            diagnostics.debug(Component::Mapper, "input produced no data set");
            return RenderOutcome::Skipped(SkipReason::NoInput);
        };
        let Some(image) = data_set.as_image() else {
            diagnostics.debug(Component::Mapper, "input is not image data");
            return RenderOutcome::Skipped(SkipReason::NotImageData);
        };
        let selection = input.array_selection();
        let Some((array, association)) = image.array_to_process(selection) else {
            let name = match selection.name.as_deref() {
                Some(name) => format!("'{name}'"),
                None => "active scalars".to_string(),
            };
            diagnostics.error(Component::Mapper, format!("no scalar array ({name}) to render"));
            return RenderOutcome::Skipped(SkipReason::NoScalars);
        };

        let color = property.color();
        let channel = match color.vector_mode() {
            VectorMode::Component => Some(color.vector_component()),
            VectorMode::Magnitude => None,
        };
        let plan = self.state.tracker.evaluate(&StalenessInputs {
            has_volume: self.state.resources.has_live_volume(device),
            data_time: image.mtime(),
            array_name: array.name(),
            vector_component: channel,
            property_time: property.mtime(),
        });

        // The channel is only extracted when the field itself is rebuilt.
        let scalars = if plan.rebuild_field {
            Some(extract_scalar_channel(
                array,
                color.vector_component(),
                color.vector_mode(),
                diagnostics,
            ))
        } else {
            None
        };

        let geometry = FieldGeometry::from_image(image, association);
        if let Some(scalars) = &scalars {
            if let Err(err) = geometry.validate(scalars.num_tuples()) {
                diagnostics.error(
                    Component::SpatialField,
                    format!("cannot build a field from '{}': {err}", array.name()),
                );
                return RenderOutcome::Skipped(SkipReason::InvalidField);
            }
        }

        let (_, created) = self.state.resources.ensure_volume(device);
        let is_new = plan.is_new_volume || created;

        if let Some(scalars) = &scalars {
            self.rebuild_field(device, image, &geometry, scalars, property, diagnostics);
            self.state.tracker.record_field_build(array.name(), channel);
            self.state.field_range = Some(scalars.range(0));
        }
        if plan.rebuild_transfer_function {
            let fallback = match self.state.field_range {
                Some(range) => range,
                None => extract_scalar_channel(
                    array,
                    color.vector_component(),
                    color.vector_mode(),
                    diagnostics,
                )
                .range(0),
            };
            self.rebuild_transfer_function(device, property, fallback, diagnostics);
            self.state.tracker.record_transfer_function_build();
        }

        self.state.resources.stage(device, stager, is_new);
        RenderOutcome::Staged { is_new, plan }
    }

    fn rebuild_field(
        &mut self,
        device: &mut dyn VolumeDevice,
        image: &ImageData,
        geometry: &FieldGeometry,
        scalars: &DataArray,
        property: &VolumeProperty,
        diagnostics: &mut dyn DiagnosticSink,
    ) {
        let filter = filter_for(property.interpolation(), diagnostics);
        let field = upload_spatial_field(device, geometry, scalars, filter, diagnostics);
        self.state
            .resources
            .install_spatial_field(device, field, diagnostics);
        log::debug!(
            "rebuilt field '{}' from {} grid",
            scalars.name(),
            image.dimensions()
        );
    }

    fn rebuild_transfer_function(
        &mut self,
        device: &mut dyn VolumeDevice,
        property: &VolumeProperty,
        fallback: (f64, f64),
        diagnostics: &mut dyn DiagnosticSink,
    ) {
        let builder = TransferFunctionBuilder::from_options(&self.options);
        let transfer_function = builder.build(property, fallback, diagnostics);
        self.state
            .resources
            .upload_transfer_function(device, &transfer_function, diagnostics);
        self.state.transfer_function = Some(transfer_function);
    }

    /// Releases the device volume and everything attached to it.
    ///
    /// The next render call starts over with a first build.
    pub fn release(&mut self, device: &mut dyn VolumeDevice) {
        self.state.resources.release(device);
        self.state.tracker.reset();
        self.state.transfer_function = None;
        self.state.field_range = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volstage_core::{Diagnostics, Severity};
    use volstage_render::{FrameVolumes, HeadlessDevice};

    #[test]
    fn test_hidden_volume_is_skipped_quietly() {
        let mut node = VolumeMapperNode::new();
        let mut device = HeadlessDevice::new();
        let mut frame = FrameVolumes::new();
        let mut diagnostics = Diagnostics::new();
        let mut volume = Volume::with_property(VolumeProperty::new());
        volume.set_visible(false);

        let outcome = node.render(&volume, None, &mut device, &mut frame, &mut diagnostics);
        assert_eq!(outcome.skip_reason(), Some(SkipReason::Hidden));
        assert!(diagnostics.contains(Severity::Debug, Component::Mapper));
        assert!(frame.is_empty());
    }

    #[test]
    fn test_missing_property_and_input() {
        let mut node = VolumeMapperNode::new();
        let mut device = HeadlessDevice::new();
        let mut frame = FrameVolumes::new();
        let mut diagnostics = Diagnostics::new();

        let outcome = node.render(&Volume::new(), None, &mut device, &mut frame, &mut diagnostics);
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::NoProperty));

        let volume = Volume::with_property(VolumeProperty::new());
        let outcome = node.render(&volume, None, &mut device, &mut frame, &mut diagnostics);
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::NoInput));
        assert_eq!(diagnostics.with_severity(Severity::Error).count(), 0);
        assert!(node.state().resources.volume().is_none());
    }

    #[test]
    fn test_table_sizes_are_clamped() {
        let mut node = VolumeMapperNode::new();
        node.set_color_size(0);
        node.set_opacity_size(16);
        assert_eq!(node.options().color_size, 1);
        assert_eq!(node.options().opacity_size, 16);
    }
}
