//! Configuration options for the volume mapper.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VolstageError};

/// Default number of samples in the color lookup table.
pub const DEFAULT_COLOR_SIZE: usize = 128;

/// Default number of samples in the opacity lookup table.
pub const DEFAULT_OPACITY_SIZE: usize = 128;

/// Host-settable knobs of a volume mapper.
///
/// Both resolutions are read on every transfer function rebuild, so they
/// should be set before the first render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Number of RGB samples taken from the color ramp.
    pub color_size: usize,

    /// Number of samples taken from the opacity ramp.
    pub opacity_size: usize,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            color_size: DEFAULT_COLOR_SIZE,
            opacity_size: DEFAULT_OPACITY_SIZE,
        }
    }
}

impl MapperOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the color table resolution (at least 1).
    pub fn with_color_size(mut self, color_size: usize) -> Self {
        self.color_size = color_size.max(1);
        self
    }

    /// Sets the opacity table resolution (at least 1).
    pub fn with_opacity_size(mut self, opacity_size: usize) -> Self {
        self.opacity_size = opacity_size.max(1);
        self
    }

    /// Checks that both resolutions are usable.
    pub fn validate(&self) -> Result<()> {
        if self.color_size == 0 {
            return Err(VolstageError::InvalidOption {
                name: "color_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.opacity_size == 0 {
            return Err(VolstageError::InvalidOption {
                name: "opacity_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parses options from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
