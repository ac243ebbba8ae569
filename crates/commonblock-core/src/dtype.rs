//! Element type tags and the sealed [`Element`] trait.

use std::fmt;

use crate::column::Column;

/// Numeric element type of a field.
///
/// The set is closed: every field in a table stores exactly one of these.
/// The `repr(u8)` discriminants are ABI-stable and used by the C builder.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    /// One byte per element, `0` or `1`.
    Bool = 0,
    /// Signed 8-bit integer.
    Int8 = 1,
    /// Unsigned 8-bit integer.
    UInt8 = 2,
    /// Signed 16-bit integer.
    Int16 = 3,
    /// Unsigned 16-bit integer.
    UInt16 = 4,
    /// Signed 32-bit integer.
    Int32 = 5,
    /// Unsigned 32-bit integer.
    UInt32 = 6,
    /// Signed 64-bit integer.
    Int64 = 7,
    /// Unsigned 64-bit integer.
    UInt64 = 8,
    /// IEEE-754 single precision.
    Float32 = 9,
    /// IEEE-754 double precision.
    Float64 = 10,
}

impl ElementType {
    /// Every element type, in discriminant order.
    pub const ALL: [ElementType; 11] = [
        Self::Bool,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// The type tag exported to foreign contexts (e.g. `"float64"`).
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse a type tag. Returns `None` for anything not produced by [`tag`](Self::tag).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Decode the ABI discriminant.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Size of one element in bytes.
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

mod private {
    pub trait Sealed {}
}

/// A Rust type that can be stored in a field.
///
/// Sealed: implemented exactly for the types named by [`ElementType`].
pub trait Element:
    private::Sealed + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// The tag this Rust type corresponds to.
    const DTYPE: ElementType;

    /// View a column as a slice of `Self`, if the column has this type.
    fn slice(column: &Column) -> Option<&[Self]>;

    /// Mutable counterpart of [`slice`](Element::slice).
    fn slice_mut(column: &mut Column) -> Option<&mut [Self]>;

    /// Wrap owned values into a column.
    fn into_column(values: Vec<Self>) -> Column;

    /// Lossy numeric view, used for tabular presentation.
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    (@to_f64 Bool $v:ident) => { if $v { 1.0 } else { 0.0 } };
    (@to_f64 $other:ident $v:ident) => { $v as f64 };
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}

            impl Element for $ty {
                const DTYPE: ElementType = ElementType::$variant;

                fn slice(column: &Column) -> Option<&[Self]> {
                    match column {
                        Column::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }

                fn slice_mut(column: &mut Column) -> Option<&mut [Self]> {
                    match column {
                        Column::$variant(v) => Some(v.as_mut_slice()),
                        _ => None,
                    }
                }

                fn into_column(values: Vec<Self>) -> Column {
                    Column::$variant(values)
                }

                fn to_f64(self) -> f64 {
                    impl_element!(@to_f64 $variant self)
                }
            }

            impl From<Vec<$ty>> for Column {
                fn from(values: Vec<$ty>) -> Self {
                    Column::$variant(values)
                }
            }
        )*
    };
}

impl_element! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for t in ElementType::ALL {
            assert_eq!(ElementType::from_tag(t.tag()), Some(t));
            assert_eq!(ElementType::from_code(t as u8), Some(t));
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(ElementType::from_tag("complex128"), None);
        assert_eq!(ElementType::from_tag(""), None);
        assert_eq!(ElementType::from_code(11), None);
    }

    #[test]
    fn sizes_match_rust_types() {
        assert_eq!(ElementType::Bool.size_bytes(), std::mem::size_of::<bool>());
        assert_eq!(ElementType::Int16.size_bytes(), std::mem::size_of::<i16>());
        assert_eq!(ElementType::Float32.size_bytes(), std::mem::size_of::<f32>());
        assert_eq!(ElementType::UInt64.size_bytes(), std::mem::size_of::<u64>());
    }

    #[test]
    fn element_dtype_constants() {
        assert_eq!(<f64 as Element>::DTYPE, ElementType::Float64);
        assert_eq!(<bool as Element>::DTYPE, ElementType::Bool);
        assert_eq!(<u16 as Element>::DTYPE, ElementType::UInt16);
    }

    #[test]
    fn bool_to_f64() {
        assert_eq!(true.to_f64(), 1.0);
        assert_eq!(false.to_f64(), 0.0);
        assert_eq!((-3i8).to_f64(), -3.0);
    }
}
