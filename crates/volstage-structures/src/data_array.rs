//! Typed scalar storage.
//!
//! A [`DataArray`] stores tuples of `num_components` values in one of the
//! numeric types listed in [`ScalarType`]. Code that needs to work on every
//! storage type goes through the [`Scalar`] trait instead of matching on the
//! type by hand.

use half::f16;
use serde::{Deserialize, Serialize};
use volstage_core::{ModTime, Result, TimeStamp, VolstageError};

/// Runtime tag of an array's element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F16,
    F32,
    F64,
}

impl ScalarType {
    /// Every supported element type.
    pub const ALL: [ScalarType; 11] = [
        ScalarType::I8,
        ScalarType::U8,
        ScalarType::I16,
        ScalarType::U16,
        ScalarType::I32,
        ScalarType::U32,
        ScalarType::I64,
        ScalarType::U64,
        ScalarType::F16,
        ScalarType::F32,
        ScalarType::F64,
    ];

    /// Size of one element in bytes.
    #[must_use]
    pub fn size_of(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 | ScalarType::F16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    /// Returns whether the type is a floating point type.
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F16 | ScalarType::F32 | ScalarType::F64)
    }
}

/// A numeric element type that can live in a [`ScalarBuffer`].
pub trait Scalar: Copy + Send + Sync + 'static {
    /// The runtime tag of this type.
    const TYPE: ScalarType;

    /// Converts to single precision with `as`-style narrowing.
    fn to_f32(self) -> f32;

    /// Converts to double precision.
    fn to_f64(self) -> f64;

    /// Converts from double precision (saturating for integers).
    fn from_f64(value: f64) -> Self;

    /// Wraps owned values into the matching buffer variant.
    fn into_buffer(values: Vec<Self>) -> ScalarBuffer;

    /// Borrows the values if the buffer holds this type.
    fn view(buffer: &ScalarBuffer) -> Option<&[Self]>;
}

macro_rules! impl_primitive_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const TYPE: ScalarType = ScalarType::$variant;

                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                fn to_f32(self) -> f32 {
                    self as f32
                }

                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_lossless
                )]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                fn into_buffer(values: Vec<Self>) -> ScalarBuffer {
                    ScalarBuffer::$variant(values)
                }

                fn view(buffer: &ScalarBuffer) -> Option<&[Self]> {
                    match buffer {
                        ScalarBuffer::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_primitive_scalar! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl Scalar for f16 {
    const TYPE: ScalarType = ScalarType::F16;

    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }

    fn into_buffer(values: Vec<Self>) -> ScalarBuffer {
        ScalarBuffer::F16(values)
    }

    fn view(buffer: &ScalarBuffer) -> Option<&[Self]> {
        match buffer {
            ScalarBuffer::F16(values) => Some(values),
            _ => None,
        }
    }
}

/// Owned values of one element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarBuffer {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Expands `$body` once per buffer variant with `$values` bound to the
/// variant's `Vec`.
macro_rules! with_buffer {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            ScalarBuffer::I8($values) => $body,
            ScalarBuffer::U8($values) => $body,
            ScalarBuffer::I16($values) => $body,
            ScalarBuffer::U16($values) => $body,
            ScalarBuffer::I32($values) => $body,
            ScalarBuffer::U32($values) => $body,
            ScalarBuffer::I64($values) => $body,
            ScalarBuffer::U64($values) => $body,
            ScalarBuffer::F16($values) => $body,
            ScalarBuffer::F32($values) => $body,
            ScalarBuffer::F64($values) => $body,
        }
    };
}

impl ScalarBuffer {
    /// Returns the element type tag.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        with_buffer!(self, values => element_type(values))
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        with_buffer!(self, values => values.len())
    }

    /// Returns whether the buffer stores no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads value `index` widened to double precision.
    #[must_use]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        with_buffer!(self, values => values.get(index).map(|v| v.to_f64()))
    }

    /// Iterates all values widened to double precision.
    ///
    /// This is the type-erased access path; hot loops should borrow the
    /// typed slice through [`Scalar::view`] instead.
    pub fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        with_buffer!(self, values => {
            Box::new(values.iter().map(|v| v.to_f64())) as Box<dyn Iterator<Item = f64> + '_>
        })
    }

    /// Iterates all values converted to single precision.
    ///
    /// Each value goes through [`Scalar::to_f32`] directly, so the result is
    /// identical to the typed conversion.
    pub fn iter_f32(&self) -> Box<dyn Iterator<Item = f32> + '_> {
        with_buffer!(self, values => {
            Box::new(values.iter().map(|v| v.to_f32())) as Box<dyn Iterator<Item = f32> + '_>
        })
    }

    /// Copies every `stride`-th value starting at `offset`.
    #[must_use]
    pub fn strided_copy(&self, offset: usize, stride: usize) -> ScalarBuffer {
        with_buffer!(self, values => strided(values, offset, stride))
    }

    /// Builds a buffer of this buffer's element type from doubles.
    #[must_use]
    pub fn from_f64_like(&self, doubles: impl Iterator<Item = f64>) -> ScalarBuffer {
        with_buffer!(self, values => collect_like(values, doubles))
    }
}

fn element_type<T: Scalar>(_: &[T]) -> ScalarType {
    T::TYPE
}

fn strided<T: Scalar>(values: &[T], offset: usize, stride: usize) -> ScalarBuffer {
    T::into_buffer(
        values
            .iter()
            .skip(offset)
            .step_by(stride.max(1))
            .copied()
            .collect(),
    )
}

fn collect_like<T: Scalar>(_: &[T], doubles: impl Iterator<Item = f64>) -> ScalarBuffer {
    T::into_buffer(doubles.map(T::from_f64).collect())
}

/// A named array of fixed-width tuples.
#[derive(Debug, Clone)]
pub struct DataArray {
    name: String,
    num_components: usize,
    buffer: ScalarBuffer,
    mtime: TimeStamp,
}

impl DataArray {
    /// Creates an array from typed values.
    ///
    /// `values.len()` must be a multiple of `num_components`.
    pub fn new<T: Scalar>(
        name: impl Into<String>,
        num_components: usize,
        values: Vec<T>,
    ) -> Result<Self> {
        Self::from_buffer(name, num_components, T::into_buffer(values))
    }

    /// Creates an array from an already tagged buffer.
    pub fn from_buffer(
        name: impl Into<String>,
        num_components: usize,
        buffer: ScalarBuffer,
    ) -> Result<Self> {
        let name = name.into();
        if num_components == 0 {
            return Err(VolstageError::NoComponents(name));
        }
        if buffer.len() % num_components != 0 {
            return Err(VolstageError::SizeMismatch {
                expected: buffer.len().next_multiple_of(num_components),
                actual: buffer.len(),
            });
        }
        Ok(Self {
            name,
            num_components,
            buffer,
            mtime: TimeStamp::new(),
        })
    }

    /// Returns the array name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of components per tuple.
    #[must_use]
    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Returns the number of tuples.
    #[must_use]
    pub fn num_tuples(&self) -> usize {
        self.buffer.len() / self.num_components
    }

    /// Returns the element type tag.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        self.buffer.scalar_type()
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn buffer(&self) -> &ScalarBuffer {
        &self.buffer
    }

    /// Borrows the values as `T` if that is the storage type.
    #[must_use]
    pub fn typed_values<T: Scalar>(&self) -> Option<&[T]> {
        T::view(&self.buffer)
    }

    /// Reads component `component` of tuple `tuple`.
    #[must_use]
    pub fn component(&self, tuple: usize, component: usize) -> Option<f64> {
        if component >= self.num_components {
            return None;
        }
        self.buffer.get_f64(tuple * self.num_components + component)
    }

    /// Replaces the values, keeping name and tuple width.
    pub fn set_values(&mut self, buffer: ScalarBuffer) -> Result<()> {
        if buffer.len() % self.num_components != 0 {
            return Err(VolstageError::SizeMismatch {
                expected: buffer.len().next_multiple_of(self.num_components),
                actual: buffer.len(),
            });
        }
        self.buffer = buffer;
        self.mtime.modified();
        Ok(())
    }

    /// Returns the finite min/max of one component.
    ///
    /// Falls back to `(0, 1)` when the component holds no finite values.
    #[must_use]
    pub fn range(&self, component: usize) -> (f64, f64) {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        if component < self.num_components {
            for v in self
                .buffer
                .iter_f64()
                .skip(component)
                .step_by(self.num_components)
            {
                if v.is_finite() {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
        }
        if min > max {
            (0.0, 1.0)
        } else {
            (min, max)
        }
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn mtime(&self) -> ModTime {
        self.mtime.get()
    }
}
