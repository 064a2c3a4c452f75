//! Scene-side inputs of a volume mapper.

use volstage_structures::{ArraySelection, DataSet, ImageData, VolumeProperty};

/// A volume object as resolved by the host for one render call.
#[derive(Debug, Clone)]
pub struct Volume {
    visible: bool,
    property: Option<VolumeProperty>,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            visible: true,
            property: None,
        }
    }
}

impl Volume {
    /// Creates a visible volume without a property.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a visible volume with `property`.
    pub fn with_property(property: VolumeProperty) -> Self {
        Self {
            visible: true,
            property: Some(property),
        }
    }

    /// Returns whether the volume is drawn.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the volume.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The volume's property, if set.
    pub fn property(&self) -> Option<&VolumeProperty> {
        self.property.as_ref()
    }

    /// The volume's property for editing.
    pub fn property_mut(&mut self) -> Option<&mut VolumeProperty> {
        self.property.as_mut()
    }

    /// Replaces the property.
    pub fn set_property(&mut self, property: Option<VolumeProperty>) {
        self.property = property;
    }
}

/// The upstream pipeline feeding a volume mapper.
pub trait VolumeMapperInput {
    /// Brings the data set up to date. Called once per render before any read.
    fn update(&mut self);

    /// The current data set, if any.
    fn data_set(&self) -> Option<&DataSet>;

    /// Which scalar array to render.
    fn array_selection(&self) -> &ArraySelection;
}

/// A [`VolumeMapperInput`] holding a data set in memory.
#[derive(Debug, Clone, Default)]
pub struct ImageSource {
    data_set: Option<DataSet>,
    selection: ArraySelection,
    updates: u64,
}

impl ImageSource {
    /// Creates a source without data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source for `image` that renders its active scalars.
    pub fn from_image(image: ImageData) -> Self {
        Self {
            data_set: Some(DataSet::Image(image)),
            ..Self::default()
        }
    }

    /// Sets the array selection.
    /// Selects the array to render.
    #[must_use]
    pub fn with_selection(mut self, selection: ArraySelection) -> Self {
        self.selection = selection;
        self
    }

    /// Replaces the data set the source produces.
    pub fn set_data_set(&mut self, data_set: Option<DataSet>) {
        self.data_set = data_set;
    }

    /// Selects the array to render.
    pub fn set_selection(&mut self, selection: ArraySelection) {
        self.selection = selection;
    }

    /// The image data for editing, if the source holds one.
    pub fn image_mut(&mut self) -> Option<&mut ImageData> {
        self.data_set.as_mut().and_then(DataSet::as_image_mut)
    }

    /// How often [`VolumeMapperInput::update`] was called.
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

impl VolumeMapperInput for ImageSource {
    fn update(&mut self) {
        self.updates += 1;
    }

    fn data_set(&self) -> Option<&DataSet> {
        self.data_set.as_ref()
    }

    fn array_selection(&self) -> &ArraySelection {
        &self.selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    #[test]
    fn test_volume_defaults() {
        let mut volume = Volume::new();
        assert!(volume.visible());
        assert!(volume.property().is_none());
        volume.set_property(Some(VolumeProperty::new()));
        volume.set_visible(false);
        assert!(volume.property_mut().is_some());
        assert!(!volume.visible());
    }

    #[test]
    fn test_image_source() {
        let mut source = ImageSource::from_image(ImageData::new(UVec3::splat(2)))
            .with_selection(ArraySelection::by_name("temp"));
        assert_eq!(source.array_selection().array_name(), "temp");
        assert!(source.image_mut().is_some());

        source.update();
        source.update();
        assert_eq!(source.update_count(), 2);

        source.set_data_set(Some(DataSet::Unsupported("polydata".to_string())));
        assert!(source.image_mut().is_none());
        assert!(source.data_set().is_some());
    }
}
