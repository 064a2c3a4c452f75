//! Discretization of a volume property's transfer function curves.

use glam::Vec3;
use volstage_core::{Component, DiagnosticSink, MapperOptions};
use volstage_structures::{TransferFunctionMode, VolumeProperty};

/// Sampled color and opacity tables over a resolved value range.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretizedTransferFunction {
    /// RGB samples, first at `value_range[0]`, last at `value_range[1]`.
    pub color: Vec<Vec3>,
    /// Opacity samples over the same range.
    pub opacity: Vec<f32>,
    pub value_range: [f32; 2],
}

/// Builds [`DiscretizedTransferFunction`]s at fixed table resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFunctionBuilder {
    color_size: usize,
    opacity_size: usize,
}

impl Default for TransferFunctionBuilder {
    fn default() -> Self {
        Self::from_options(&MapperOptions::default())
    }
}

impl TransferFunctionBuilder {
    /// Creates a builder; both sizes are clamped to at least 1.
    pub fn new(color_size: usize, opacity_size: usize) -> Self {
        Self {
            color_size: color_size.max(1),
            opacity_size: opacity_size.max(1),
        }
    }

    /// Creates a builder using the table sizes in `options`.
    pub fn from_options(options: &MapperOptions) -> Self {
        Self::new(options.color_size, options.opacity_size)
    }

    /// Number of color samples.
    pub fn color_size(&self) -> usize {
        self.color_size
    }

    /// Number of opacity samples.
    pub fn opacity_size(&self) -> usize {
        self.opacity_size
    }

    /// Picks the value range the tables are sampled over.
    ///
    /// The color ramp's node range wins when it is non-empty; otherwise
    /// `fallback`, normally the range of the mapped scalars, is used.
    pub fn resolve_range(&self, property: &VolumeProperty, fallback: (f64, f64)) -> (f64, f64) {
        if property.transfer_function_mode() == TransferFunctionMode::OneD {
            let (lo, hi) = property.color().range();
            if hi > lo {
                return (lo, hi);
            }
        }
        fallback
    }

    /// Samples both curves of `property`.
    ///
    /// 2D transfer functions and gradient opacity are reported and ignored;
    /// the 1D ramps are always used.
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(
        &self,
        property: &VolumeProperty,
        fallback: (f64, f64),
        diagnostics: &mut dyn DiagnosticSink,
    ) -> DiscretizedTransferFunction {
        if property.transfer_function_mode() == TransferFunctionMode::TwoD {
            diagnostics.warn(
                Component::TransferFunction,
                "2D transfer functions are not supported, using the 1D ramps",
            );
        }
        if property.has_gradient_opacity() {
            diagnostics.warn(
                Component::TransferFunction,
                "gradient opacity is not supported and is ignored",
            );
        }

        let (lo, hi) = self.resolve_range(property, fallback);
        let opacity = property.scalar_opacity().table(lo, hi, self.opacity_size);
        let color = property.color().table(lo, hi, self.color_size);
        log::debug!(
            "sampled transfer function over [{lo}, {hi}]: {} colors, {} opacities",
            color.len(),
            opacity.len()
        );

        DiscretizedTransferFunction {
            color,
            opacity,
            value_range: [lo as f32, hi as f32],
        }
    }
}
