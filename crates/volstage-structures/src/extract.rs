//! Reduction of multi-component arrays to one scalar channel.

use std::borrow::Cow;

use volstage_core::{Component, DiagnosticSink};

use crate::data_array::{DataArray, ScalarBuffer};
use crate::transfer_function::VectorMode;

/// Reduces `array` to a single-component array with the same tuple count.
///
/// Single-component arrays are borrowed unchanged. Otherwise a new array of
/// the same element type is allocated, holding either the selected component
/// or the Euclidean norm of the first `min(C, 3)` components of each tuple.
/// The derived array is dropped with the returned [`Cow`].
pub fn extract_scalar_channel<'a>(
    array: &'a DataArray,
    vector_component: usize,
    mode: VectorMode,
    diagnostics: &mut dyn DiagnosticSink,
) -> Cow<'a, DataArray> {
    let num_components = array.num_components();
    if num_components == 1 {
        return Cow::Borrowed(array);
    }

    let buffer = match mode {
        VectorMode::Component => {
            let component = if vector_component < num_components {
                vector_component
            } else {
                diagnostics.warn(
                    Component::Extractor,
                    format!(
                        "vector component {vector_component} out of range for '{}' \
                         with {num_components} components, using component 0",
                        array.name()
                    ),
                );
                0
            };
            array.buffer().strided_copy(component, num_components)
        }
        VectorMode::Magnitude => {
            if num_components != 3 {
                diagnostics.warn(
                    Component::Extractor,
                    format!(
                        "magnitude of '{}' computed over the first {} \
                         of {num_components} components",
                        array.name(),
                        num_components.min(3)
                    ),
                );
            }
            magnitude(array.buffer(), num_components)
        }
    };

    // The reduced buffer always holds exactly one value per source tuple.
    match DataArray::from_buffer(array.name(), 1, buffer) {
        Ok(derived) => Cow::Owned(derived),
        Err(err) => {
            diagnostics.error(Component::Extractor, err.to_string());
            Cow::Borrowed(array)
        }
    }
}

fn magnitude(buffer: &ScalarBuffer, num_components: usize) -> ScalarBuffer {
    let used = num_components.min(3);
    let mut values = buffer.iter_f64();
    let num_tuples = buffer.len() / num_components;
    let norms = (0..num_tuples).map(move |_| {
        let mut sum = 0.0;
        for c in 0..num_components {
            let v = values.next().unwrap_or(0.0);
            if c < used {
                sum += v * v;
            }
        }
        sum.sqrt()
    });
    buffer.from_f64_like(norms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use volstage_core::{Diagnostics, Severity};

    #[test]
    fn test_single_component_is_borrowed() {
        let array = DataArray::new("temp", 1, vec![1.0f32, 2.0, 3.0]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 0, VectorMode::Magnitude, &mut diagnostics);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(std::ptr::eq(&*out, &array));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_select_component() {
        let array = DataArray::new("v", 3, vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 1, VectorMode::Component, &mut diagnostics);
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(out.num_components(), 1);
        assert_eq!(out.typed_values::<i32>(), Some(&[2, 5][..]));
        assert_eq!(out.name(), "v");
    }

    #[test]
    fn test_magnitude_of_three_components() {
        let array = DataArray::new("v", 3, vec![3.0f64, 4.0, 0.0, 1.0, 2.0, 2.0]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 0, VectorMode::Magnitude, &mut diagnostics);
        assert_eq!(out.typed_values::<f64>(), Some(&[5.0, 3.0][..]));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_magnitude_keeps_integer_storage() {
        let array = DataArray::new("v", 3, vec![3u8, 4, 0, 1, 1, 1]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 0, VectorMode::Magnitude, &mut diagnostics);
        // sqrt(3) truncates to 1
        assert_eq!(out.typed_values::<u8>(), Some(&[5, 1][..]));
    }

    #[test]
    fn test_magnitude_two_components_warns() {
        let array = DataArray::new("v", 2, vec![3.0f32, 4.0]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 0, VectorMode::Magnitude, &mut diagnostics);
        assert_eq!(out.typed_values::<f32>(), Some(&[5.0][..]));
        assert!(diagnostics.contains(Severity::Warning, Component::Extractor));
    }

    #[test]
    fn test_magnitude_four_components_uses_first_three() {
        let array = DataArray::new("v", 4, vec![2.0f32, 3.0, 6.0, 100.0]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 0, VectorMode::Magnitude, &mut diagnostics);
        assert_eq!(out.typed_values::<f32>(), Some(&[7.0][..]));
        assert!(diagnostics.contains(Severity::Warning, Component::Extractor));
    }

    #[test]
    fn test_out_of_range_component_falls_back_to_zero() {
        let array = DataArray::new("v", 2, vec![7u16, 8, 9, 10]).unwrap();
        let mut diagnostics = Diagnostics::new();
        let out = extract_scalar_channel(&array, 5, VectorMode::Component, &mut diagnostics);
        assert_eq!(out.typed_values::<u16>(), Some(&[7, 9][..]));
        assert!(diagnostics.contains(Severity::Warning, Component::Extractor));
    }

    proptest! {
        #[test]
        fn selected_component_matches_source(
            tuples in proptest::collection::vec(proptest::array::uniform4(-1000i32..1000), 1..64),
            component in 0usize..4,
        ) {
            let flat: Vec<i32> = tuples.iter().flatten().copied().collect();
            let array = DataArray::new("v", 4, flat).unwrap();
            let mut diagnostics = Diagnostics::new();
            let out =
                extract_scalar_channel(&array, component, VectorMode::Component, &mut diagnostics);
            prop_assert_eq!(out.num_tuples(), tuples.len());
            for (i, tuple) in tuples.iter().enumerate() {
                prop_assert_eq!(out.component(i, 0), Some(f64::from(tuple[component])));
            }
        }

        #[test]
        fn magnitude_matches_norm(
            tuples in proptest::collection::vec(proptest::array::uniform3(-100.0f64..100.0), 1..64),
        ) {
            let flat: Vec<f64> = tuples.iter().flatten().copied().collect();
            let array = DataArray::new("v", 3, flat).unwrap();
            let mut diagnostics = Diagnostics::new();
            let out = extract_scalar_channel(&array, 0, VectorMode::Magnitude, &mut diagnostics);
            for (i, t) in tuples.iter().enumerate() {
                let expected = (t[0] * t[0] + t[1] * t[1] + t[2] * t[2]).sqrt();
                let actual = out.component(i, 0).unwrap();
                prop_assert!((actual - expected).abs() < 1e-9);
            }
        }
    }
}
