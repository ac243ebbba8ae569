//! Conversions between C buffers and typed table elements.

use std::ffi::{c_char, c_void, CStr};
use std::slice;

use commonblock_core::{Column, Element, ElementType};

use crate::status::CbStatus;

/// An element as it is laid out in a C buffer.
///
/// Identical to the Rust type for every numeric type. `bool` crosses as a
/// byte so that arbitrary non-zero C values never become an invalid `bool`.
pub(crate) trait CElement: Element {
    type Raw: Copy;

    fn from_c(raw: Self::Raw) -> Self;
    fn to_c(self) -> Self::Raw;
}

impl CElement for bool {
    type Raw = u8;

    fn from_c(raw: u8) -> bool {
        raw != 0
    }

    fn to_c(self) -> u8 {
        u8::from(self)
    }
}

macro_rules! same_repr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CElement for $ty {
                type Raw = $ty;

                fn from_c(raw: $ty) -> $ty {
                    raw
                }

                fn to_c(self) -> $ty {
                    self
                }
            }
        )*
    };
}

same_repr!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

/// Call `$func::<T>($args)` with `T` chosen by an [`ElementType`].
macro_rules! dispatch {
    ($dtype:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $dtype {
            ElementType::Bool => $func::<bool>($($arg),*),
            ElementType::Int8 => $func::<i8>($($arg),*),
            ElementType::UInt8 => $func::<u8>($($arg),*),
            ElementType::Int16 => $func::<i16>($($arg),*),
            ElementType::UInt16 => $func::<u16>($($arg),*),
            ElementType::Int32 => $func::<i32>($($arg),*),
            ElementType::UInt32 => $func::<u32>($($arg),*),
            ElementType::Int64 => $func::<i64>($($arg),*),
            ElementType::UInt64 => $func::<u64>($($arg),*),
            ElementType::Float32 => $func::<f32>($($arg),*),
            ElementType::Float64 => $func::<f64>($($arg),*),
        }
    };
}
pub(crate) use dispatch;

pub(crate) fn element_type(code: u8) -> Result<ElementType, CbStatus> {
    ElementType::from_code(code).ok_or(CbStatus::InvalidArgument)
}

pub(crate) fn to_usize(n: u64) -> Result<usize, CbStatus> {
    usize::try_from(n).map_err(|_| CbStatus::InvalidArgument)
}

/// Borrow a NUL-terminated UTF-8 string from C.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
#[allow(unsafe_code)]
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char) -> Result<&'a str, CbStatus> {
    if ptr.is_null() {
        return Err(CbStatus::InvalidArgument);
    }
    // SAFETY: non-null and NUL-terminated per caller contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| CbStatus::InvalidArgument)
}

/// Borrow `len` values of `R` from a C buffer. `ptr` may be null when
/// `len == 0`.
///
/// # Safety
///
/// A non-null `ptr` must address `len` initialized values valid for `'a`.
#[allow(unsafe_code)]
pub(crate) unsafe fn c_slice<'a, R>(ptr: *const c_void, len: usize) -> Result<&'a [R], CbStatus> {
    if len == 0 {
        return Ok(&[]);
    }
    let ptr = ptr.cast::<R>();
    if ptr.is_null() || !ptr.is_aligned() {
        return Err(CbStatus::InvalidArgument);
    }
    // SAFETY: non-null, aligned, and `len` long per caller contract.
    Ok(unsafe { slice::from_raw_parts(ptr, len) })
}

/// Mutable counterpart of [`c_slice`].
///
/// # Safety
///
/// A non-null `ptr` must address `len` writable values, not aliased, valid
/// for `'a`.
#[allow(unsafe_code)]
pub(crate) unsafe fn c_slice_mut<'a, R>(ptr: *mut c_void, len: usize) -> Result<&'a mut [R], CbStatus> {
    if len == 0 {
        return Ok(&mut []);
    }
    let ptr = ptr.cast::<R>();
    if ptr.is_null() || !ptr.is_aligned() {
        return Err(CbStatus::InvalidArgument);
    }
    // SAFETY: non-null, aligned, exclusive, and `len` long per caller
    // contract.
    Ok(unsafe { slice::from_raw_parts_mut(ptr, len) })
}

/// Copy a C buffer of `T::Raw` into an owned column.
pub(crate) fn column_from_c<T: CElement>(raw: &[T::Raw]) -> Column {
    T::into_column(raw.iter().map(|&r| T::from_c(r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build<T: CElement>(raw: &[T::Raw]) -> Column {
        column_from_c::<T>(raw)
    }

    #[test]
    fn bool_crosses_as_byte() {
        assert!(bool::from_c(7));
        assert!(!bool::from_c(0));
        assert_eq!(true.to_c(), 1);
        assert_eq!(build::<bool>(&[0, 2, 1]), Column::Bool(vec![false, true, true]));
    }

    #[test]
    fn dispatch_picks_matching_type() {
        fn size<T: CElement>() -> usize {
            std::mem::size_of::<T::Raw>()
        }
        for dtype in ElementType::ALL {
            assert_eq!(dispatch!(dtype, size()), dtype.size_bytes());
        }
    }

    #[test]
    #[allow(unsafe_code)]
    fn null_and_misaligned_buffers_rejected() {
        // SAFETY: rejected before any read.
        unsafe {
            assert!(c_slice::<u32>(std::ptr::null(), 1).is_err());
            assert!(c_slice::<u32>(std::ptr::null(), 0).unwrap().is_empty());
            let bytes = [0u32; 2];
            let odd = bytes.as_ptr().cast::<u8>().add(1).cast::<c_void>();
            assert!(c_slice::<u32>(odd, 1).is_err());
            assert!(c_str(std::ptr::null()).is_err());
            assert_eq!(c_str(c"ok".as_ptr()), Ok("ok"));
        }
    }

    #[test]
    fn unknown_type_code_rejected() {
        assert_eq!(element_type(10), Ok(ElementType::Float64));
        assert_eq!(element_type(11), Err(CbStatus::InvalidArgument));
    }
}
