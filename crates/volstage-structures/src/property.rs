//! Volume appearance properties.

use serde::{Deserialize, Serialize};
use volstage_core::{ModTime, TimeStamp};

use crate::transfer_function::{ColorTransferFunction, PiecewiseFunction};

/// Sampling filter requested for the volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationType {
    Nearest,
    #[default]
    Linear,
    Cubic,
    /// A mode code this crate does not know.
    Other(i32),
}

/// Dimensionality of the transfer function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferFunctionMode {
    /// Color and opacity indexed by scalar value.
    #[default]
    OneD,
    /// Indexed by scalar value and gradient magnitude.
    TwoD,
}

/// Color, opacity and sampling settings of a volume.
#[derive(Debug, Clone)]
pub struct VolumeProperty {
    color: ColorTransferFunction,
    scalar_opacity: PiecewiseFunction,
    gradient_opacity: Option<PiecewiseFunction>,
    gradient_opacity_disabled: bool,
    interpolation: InterpolationType,
    transfer_function_mode: TransferFunctionMode,
    mtime: TimeStamp,
}

impl Default for VolumeProperty {
    fn default() -> Self {
        Self {
            color: ColorTransferFunction::new(),
            scalar_opacity: PiecewiseFunction::new(),
            gradient_opacity: None,
            gradient_opacity_disabled: false,
            interpolation: InterpolationType::default(),
            transfer_function_mode: TransferFunctionMode::default(),
            mtime: TimeStamp::new(),
        }
    }
}

impl VolumeProperty {
    /// Creates a property with empty curves and linear interpolation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a property from a color ramp and an opacity ramp.
    pub fn with_curves(color: ColorTransferFunction, scalar_opacity: PiecewiseFunction) -> Self {
        Self {
            color,
            scalar_opacity,
            ..Self::default()
        }
    }

    /// Returns the color ramp.
    #[must_use]
    pub fn color(&self) -> &ColorTransferFunction {
        &self.color
    }

    /// Returns the color ramp for editing.
    pub fn color_mut(&mut self) -> &mut ColorTransferFunction {
        &mut self.color
    }

    /// Replaces the color ramp.
    pub fn set_color(&mut self, color: ColorTransferFunction) {
        self.color = color;
        self.mtime.modified();
    }

    /// Returns the opacity ramp.
    #[must_use]
    pub fn scalar_opacity(&self) -> &PiecewiseFunction {
        &self.scalar_opacity
    }

    /// Returns the opacity ramp for editing.
    pub fn scalar_opacity_mut(&mut self) -> &mut PiecewiseFunction {
        &mut self.scalar_opacity
    }

    /// Replaces the opacity ramp.
    pub fn set_scalar_opacity(&mut self, opacity: PiecewiseFunction) {
        self.scalar_opacity = opacity;
        self.mtime.modified();
    }

    /// Sets or clears the gradient opacity curve.
    pub fn set_gradient_opacity(&mut self, gradient_opacity: Option<PiecewiseFunction>) {
        self.gradient_opacity = gradient_opacity;
        self.mtime.modified();
    }

    /// Enables or disables the gradient opacity curve without dropping it.
    pub fn set_gradient_opacity_disabled(&mut self, disabled: bool) {
        self.gradient_opacity_disabled = disabled;
        self.mtime.modified();
    }

    /// Returns whether a gradient opacity curve is set and enabled.
    #[must_use]
    pub fn has_gradient_opacity(&self) -> bool {
        self.gradient_opacity.is_some() && !self.gradient_opacity_disabled
    }

    /// Returns the requested sampling filter.
    #[must_use]
    pub fn interpolation(&self) -> InterpolationType {
        self.interpolation
    }

    /// Sets the requested sampling filter.
    pub fn set_interpolation(&mut self, interpolation: InterpolationType) {
        self.interpolation = interpolation;
        self.mtime.modified();
    }

    /// Returns the transfer function mode.
    #[must_use]
    pub fn transfer_function_mode(&self) -> TransferFunctionMode {
        self.transfer_function_mode
    }

    /// Sets the transfer function mode.
    pub fn set_transfer_function_mode(&mut self, mode: TransferFunctionMode) {
        self.transfer_function_mode = mode;
        self.mtime.modified();
    }

    /// Returns the latest modification time of the property or its curves.
    #[must_use]
    pub fn mtime(&self) -> ModTime {
        let mut mtime = self
            .mtime
            .get()
            .max(self.color.mtime())
            .max(self.scalar_opacity.mtime());
        if let Some(gradient) = &self.gradient_opacity {
            mtime = mtime.max(gradient.mtime());
        }
        mtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_defaults() {
        let property = VolumeProperty::new();
        assert_eq!(property.interpolation(), InterpolationType::Linear);
        assert_eq!(property.transfer_function_mode(), TransferFunctionMode::OneD);
        assert!(!property.has_gradient_opacity());
    }

    #[test]
    fn test_curve_edits_advance_property_mtime() {
        let mut property = VolumeProperty::new();
        let before = property.mtime();
        property.color_mut().add_rgb_point(0.0, Vec3::ONE);
        let after_color = property.mtime();
        assert!(after_color > before);

        property.scalar_opacity_mut().add_point(0.0, 0.5);
        assert!(property.mtime() > after_color);
    }

    #[test]
    fn test_gradient_opacity_toggle() {
        let mut property = VolumeProperty::new();
        property.set_gradient_opacity(Some(PiecewiseFunction::new()));
        assert!(property.has_gradient_opacity());
        property.set_gradient_opacity_disabled(true);
        assert!(!property.has_gradient_opacity());
    }
}
