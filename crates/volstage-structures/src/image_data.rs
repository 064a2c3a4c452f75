//! Structured image data: a regular axis-aligned grid with point and cell
//! arrays.

use glam::{DVec3, UVec3};
use serde::{Deserialize, Serialize};
use volstage_core::{ModTime, TimeStamp};

use crate::data_array::DataArray;

/// Whether values sit on grid vertices or grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldAssociation {
    /// One value per grid vertex.
    Points,
    /// One value per grid cell (voxel).
    Cells,
}

/// An ordered set of named arrays with an optional active scalar array.
#[derive(Debug, Clone, Default)]
pub struct FieldData {
    arrays: Vec<DataArray>,
    active_scalars: Option<String>,
}

impl FieldData {
    /// Creates an empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an array, replacing any array with the same name.
    pub fn add_array(&mut self, array: DataArray) {
        if let Some(existing) = self.arrays.iter_mut().find(|a| a.name() == array.name()) {
            *existing = array;
        } else {
            self.arrays.push(array);
        }
    }

    /// Adds an array and marks it as the active scalars.
    pub fn set_scalars(&mut self, array: DataArray) {
        self.active_scalars = Some(array.name().to_string());
        self.add_array(array);
    }

    /// Marks an existing array as the active scalars.
    pub fn set_active_scalars(&mut self, name: impl Into<String>) {
        self.active_scalars = Some(name.into());
    }

    /// Returns the active scalar array, if any.
    #[must_use]
    pub fn scalars(&self) -> Option<&DataArray> {
        self.active_scalars
            .as_deref()
            .and_then(|name| self.array(name))
    }

    /// Looks an array up by name.
    #[must_use]
    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name() == name)
    }

    /// Removes an array by name.
    pub fn remove_array(&mut self, name: &str) -> Option<DataArray> {
        let idx = self.arrays.iter().position(|a| a.name() == name)?;
        if self.active_scalars.as_deref() == Some(name) {
            self.active_scalars = None;
        }
        Some(self.arrays.remove(idx))
    }

    /// Returns all arrays.
    #[must_use]
    pub fn arrays(&self) -> &[DataArray] {
        &self.arrays
    }

    fn mtime(&self) -> ModTime {
        self.arrays
            .iter()
            .map(DataArray::mtime)
            .max()
            .unwrap_or(ModTime::ZERO)
    }
}

/// Where the mapper looks for its scalar array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarMode {
    /// Point data first, then cell data.
    #[default]
    Default,
    /// Point data only.
    PointFieldData,
    /// Cell data only.
    CellFieldData,
}

/// The mapper's choice of scalar array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySelection {
    pub mode: ScalarMode,
    /// Array to look up by name; `None` selects the active scalars.
    pub name: Option<String>,
}

impl ArraySelection {
    /// Selects the active scalars.
    pub fn active() -> Self {
        Self::default()
    }

    /// Selects an array by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            mode: ScalarMode::Default,
            name: Some(name.into()),
        }
    }

    /// Restricts the lookup to point or cell data.
    #[must_use]
    pub fn with_mode(mut self, mode: ScalarMode) -> Self {
        self.mode = mode;
        self
    }

    /// The selected name, or the empty string for active scalars.
    #[must_use]
    pub fn array_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// A 3D structured grid.
#[derive(Debug, Clone)]
pub struct ImageData {
    origin: DVec3,
    spacing: DVec3,
    dimensions: UVec3,
    point_data: FieldData,
    cell_data: FieldData,
    mtime: TimeStamp,
}

impl ImageData {
    /// Creates an empty grid with `dimensions` vertices per axis.
    pub fn new(dimensions: UVec3) -> Self {
        Self {
            origin: DVec3::ZERO,
            spacing: DVec3::ONE,
            dimensions,
            point_data: FieldData::new(),
            cell_data: FieldData::new(),
            mtime: TimeStamp::new(),
        }
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: DVec3) -> Self {
        self.set_origin(origin);
        self
    }

    /// Sets the spacing.
    #[must_use]
    pub fn with_spacing(mut self, spacing: DVec3) -> Self {
        self.set_spacing(spacing);
        self
    }

    /// Returns the world position of vertex (0, 0, 0).
    #[must_use]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Sets the origin.
    pub fn set_origin(&mut self, origin: DVec3) {
        self.origin = origin;
        self.mtime.modified();
    }

    /// Returns the distance between adjacent vertices.
    #[must_use]
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    /// Sets the spacing.
    pub fn set_spacing(&mut self, spacing: DVec3) {
        self.spacing = spacing;
        self.mtime.modified();
    }

    /// Returns the number of vertices per axis.
    #[must_use]
    pub fn dimensions(&self) -> UVec3 {
        self.dimensions
    }

    /// Sets the number of vertices per axis.
    pub fn set_dimensions(&mut self, dimensions: UVec3) {
        self.dimensions = dimensions;
        self.mtime.modified();
    }

    /// Returns the number of cells per axis.
    #[must_use]
    pub fn cell_dimensions(&self) -> UVec3 {
        self.dimensions.saturating_sub(UVec3::ONE)
    }

    /// Returns the total number of vertices.
    #[must_use]
    pub fn num_points(&self) -> u64 {
        volume_of(self.dimensions)
    }

    /// Returns the total number of cells.
    #[must_use]
    pub fn num_cells(&self) -> u64 {
        volume_of(self.cell_dimensions())
    }

    /// Returns the point arrays.
    #[must_use]
    pub fn point_data(&self) -> &FieldData {
        &self.point_data
    }

    /// Returns the point arrays for editing.
    pub fn point_data_mut(&mut self) -> &mut FieldData {
        self.mtime.modified();
        &mut self.point_data
    }

    /// Returns the cell arrays.
    #[must_use]
    pub fn cell_data(&self) -> &FieldData {
        &self.cell_data
    }

    /// Returns the cell arrays for editing.
    pub fn cell_data_mut(&mut self) -> &mut FieldData {
        self.mtime.modified();
        &mut self.cell_data
    }

    /// Resolves the array a mapper should render.
    ///
    /// Named lookups search point data before cell data unless the selection
    /// restricts the association; without a name the active scalars are
    /// used, again point data first.
    #[must_use]
    pub fn array_to_process(
        &self,
        selection: &ArraySelection,
    ) -> Option<(&DataArray, FieldAssociation)> {
        let name = selection.name.as_deref();
        let from_points =
            || lookup(&self.point_data, name).map(|a| (a, FieldAssociation::Points));
        let from_cells = || lookup(&self.cell_data, name).map(|a| (a, FieldAssociation::Cells));

        match selection.mode {
            ScalarMode::Default => from_points().or_else(from_cells),
            ScalarMode::PointFieldData => from_points(),
            ScalarMode::CellFieldData => from_cells(),
        }
    }

    /// Returns the latest modification time of the grid or any of its arrays.
    #[must_use]
    pub fn mtime(&self) -> ModTime {
        self.mtime
            .get()
            .max(self.point_data.mtime())
            .max(self.cell_data.mtime())
    }
}

fn lookup<'a>(field: &'a FieldData, name: Option<&str>) -> Option<&'a DataArray> {
    match name {
        Some(name) => field.array(name),
        None => field.scalars(),
    }
}

fn volume_of(dim: UVec3) -> u64 {
    u64::from(dim.x) * u64::from(dim.y) * u64::from(dim.z)
}

/// Input data set handed to a volume mapper.
#[derive(Debug, Clone)]
pub enum DataSet {
    /// A structured grid the mapper can render.
    Image(ImageData),
    /// Any other data set kind, named for diagnostics.
    Unsupported(String),
}

impl DataSet {
    /// Returns the image data, if this is one.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageData> {
        match self {
            DataSet::Image(image) => Some(image),
            DataSet::Unsupported(_) => None,
        }
    }

    /// Returns the image data for editing, if this is one.
    pub fn as_image_mut(&mut self) -> Option<&mut ImageData> {
        match self {
            DataSet::Image(image) => Some(image),
            DataSet::Unsupported(_) => None,
        }
    }
}
