//! Owned, typed storage for one field.

use crate::dtype::{Element, ElementType};

/// The contents of a single field: a contiguous vector of one element type.
///
/// A `Column` is what callers hand to the table at construction (ownership
/// moves into the table) and what snapshots hand back out. Its length is
/// fixed once it is inside a table.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// `bool` elements.
    Bool(Vec<bool>),
    /// `i8` elements.
    Int8(Vec<i8>),
    /// `u8` elements.
    UInt8(Vec<u8>),
    /// `i16` elements.
    Int16(Vec<i16>),
    /// `u16` elements.
    UInt16(Vec<u16>),
    /// `i32` elements.
    Int32(Vec<i32>),
    /// `u32` elements.
    UInt32(Vec<u32>),
    /// `i64` elements.
    Int64(Vec<i64>),
    /// `u64` elements.
    UInt64(Vec<u64>),
    /// `f32` elements.
    Float32(Vec<f32>),
    /// `f64` elements.
    Float64(Vec<f64>),
}

/// Apply the same expression to whichever vector a column holds.
macro_rules! each_variant {
    ($column:expr, $v:ident => $body:expr) => {
        match $column {
            Column::Bool($v) => $body,
            Column::Int8($v) => $body,
            Column::UInt8($v) => $body,
            Column::Int16($v) => $body,
            Column::UInt16($v) => $body,
            Column::Int32($v) => $body,
            Column::UInt32($v) => $body,
            Column::Int64($v) => $body,
            Column::UInt64($v) => $body,
            Column::Float32($v) => $body,
            Column::Float64($v) => $body,
        }
    };
}

impl Column {
    /// A column of `len` zero (or `false`) elements.
    pub fn zeroed(dtype: ElementType, len: usize) -> Self {
        match dtype {
            ElementType::Bool => Self::Bool(vec![false; len]),
            ElementType::Int8 => Self::Int8(vec![0; len]),
            ElementType::UInt8 => Self::UInt8(vec![0; len]),
            ElementType::Int16 => Self::Int16(vec![0; len]),
            ElementType::UInt16 => Self::UInt16(vec![0; len]),
            ElementType::Int32 => Self::Int32(vec![0; len]),
            ElementType::UInt32 => Self::UInt32(vec![0; len]),
            ElementType::Int64 => Self::Int64(vec![0; len]),
            ElementType::UInt64 => Self::UInt64(vec![0; len]),
            ElementType::Float32 => Self::Float32(vec![0.0; len]),
            ElementType::Float64 => Self::Float64(vec![0.0; len]),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    /// Whether the column holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element type tag of this column.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Bool(_) => ElementType::Bool,
            Self::Int8(_) => ElementType::Int8,
            Self::UInt8(_) => ElementType::UInt8,
            Self::Int16(_) => ElementType::Int16,
            Self::UInt16(_) => ElementType::UInt16,
            Self::Int32(_) => ElementType::Int32,
            Self::UInt32(_) => ElementType::UInt32,
            Self::Int64(_) => ElementType::Int64,
            Self::UInt64(_) => ElementType::UInt64,
            Self::Float32(_) => ElementType::Float32,
            Self::Float64(_) => ElementType::Float64,
        }
    }

    /// Typed view; `None` if `T` is not this column's element type.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Typed mutable view; `None` on type mismatch.
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Element `index` widened to `f64`, or `None` past the end.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        each_variant!(self, v => v.get(index).map(|x| x.to_f64()))
    }

    /// Start of the element buffer as an untyped pointer.
    ///
    /// The pointer is stable for as long as the column is neither grown nor
    /// dropped. Dereferencing it is the caller's responsibility.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        each_variant!(self, v => v.as_mut_ptr().cast::<u8>())
    }
}
