//! Typed, lock-scoped access to one field.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Bound, Range, RangeBounds};

use commonblock_core::{Element, TableError};

use crate::field::{FieldDescriptor, FieldSlot};

/// Resolve `range` against a field of `len` elements.
///
/// Fails with `IndexOutOfRange` if any part of the range lies outside
/// `[0, len)` or the range is inverted.
pub(crate) fn resolve_range(
    field: &str,
    range: impl RangeBounds<usize>,
    len: usize,
) -> Result<Range<usize>, TableError> {
    let start = match range.start_bound() {
        Bound::Included(&s) => Some(s),
        Bound::Excluded(&s) => s.checked_add(1),
        Bound::Unbounded => Some(0),
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.checked_add(1),
        Bound::Excluded(&e) => Some(e),
        Bound::Unbounded => Some(len),
    };
    match (start, end) {
        (Some(start), Some(end)) if start <= end && end <= len => Ok(start..end),
        (start, end) => Err(TableError::IndexOutOfRange {
            field: field.to_owned(),
            start: start.unwrap_or(usize::MAX),
            end: end.unwrap_or(usize::MAX),
            len,
        }),
    }
}

/// Check that a write supplies exactly one value per element of `range`.
pub(crate) fn check_shape(field: &str, range: &Range<usize>, found: usize) -> Result<(), TableError> {
    if range.len() == found {
        Ok(())
    } else {
        Err(TableError::ShapeMismatch {
            field: field.to_owned(),
            expected: range.len(),
            found,
        })
    }
}

/// Capability to read and write one field as elements of type `T`.
///
/// Obtained from [`ArrayTable::accessor`](crate::ArrayTable::accessor), which
/// has already checked `T` against the field's element type. Every operation
/// takes the field lock for its own duration only; guards release on every
/// exit path, including a panic inside a caller-supplied closure.
pub struct FieldAccessor<'a, T: Element> {
    slot: &'a FieldSlot,
    _elem: PhantomData<fn() -> T>,
}

impl<'a, T: Element> FieldAccessor<'a, T> {
    pub(crate) fn new(slot: &'a FieldSlot) -> Result<Self, TableError> {
        let found = slot.descriptor.element_type();
        if found != T::DTYPE {
            return Err(TableError::TypeMismatch {
                field: slot.descriptor.name().to_owned(),
                expected: T::DTYPE,
                found,
            });
        }
        Ok(Self {
            slot,
            _elem: PhantomData,
        })
    }

    /// Field name.
    pub fn name(&self) -> &'a str {
        self.slot.descriptor.name()
    }

    /// The field's immutable metadata.
    pub fn descriptor(&self) -> &'a FieldDescriptor {
        &self.slot.descriptor
    }

    /// Fixed element count. Takes no lock.
    pub fn length(&self) -> usize {
        self.slot.descriptor.len()
    }

    /// Copy out `range` under a shared lock.
    pub fn read(&self, range: impl RangeBounds<usize>) -> Result<Vec<T>, TableError> {
        let range = resolve_range(self.name(), range, self.length())?;
        self.with_read(|data| data[range].to_vec())
    }

    /// Overwrite `range` with `values` under the exclusive lock.
    pub fn write(&self, range: impl RangeBounds<usize>, values: &[T]) -> Result<(), TableError> {
        let range = resolve_range(self.name(), range, self.length())?;
        check_shape(self.name(), &range, values.len())?;
        self.with_write(|data| data[range].copy_from_slice(values))
    }

    /// Single element at `index`.
    pub fn get(&self, index: usize) -> Result<T, TableError> {
        let range = resolve_range(self.name(), index..=index, self.length())?;
        self.with_read(|data| data[range.start])
    }

    /// Overwrite the single element at `index`.
    pub fn set(&self, index: usize, value: T) -> Result<(), TableError> {
        let range = resolve_range(self.name(), index..=index, self.length())?;
        self.with_write(|data| data[range.start] = value)
    }

    /// Set every element to `value`.
    pub fn fill(&self, value: T) -> Result<(), TableError> {
        self.with_write(|data| data.fill(value))
    }

    /// Run `f` over the whole field under a shared lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R, TableError> {
        self.slot
            .with_column(|column| T::slice(column).map(f))
            .ok_or_else(|| self.mismatch())
    }

    /// Run `f` over the whole field under the exclusive lock.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R, TableError> {
        self.slot
            .with_column_mut(|column| T::slice_mut(column).map(f))
            .ok_or_else(|| self.mismatch())
    }

    /// Non-blocking [`read`](Self::read).
    ///
    /// Fails with `LockFailure` instead of waiting when a writer holds the
    /// field.
    pub fn try_read(&self, range: impl RangeBounds<usize>) -> Result<Vec<T>, TableError> {
        let range = resolve_range(self.name(), range, self.length())?;
        self.slot
            .try_with_column(|column| T::slice(column).map(|data| data[range].to_vec()))
            .ok_or_else(|| TableError::LockFailure {
                reason: format!("field '{}' is locked exclusively", self.name()),
            })?
            .ok_or_else(|| self.mismatch())
    }

    fn mismatch(&self) -> TableError {
        TableError::TypeMismatch {
            field: self.name().to_owned(),
            expected: T::DTYPE,
            found: self.slot.descriptor.element_type(),
        }
    }
}

impl<T: Element> Clone for FieldAccessor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Element> Copy for FieldAccessor<'_, T> {}

impl<T: Element> fmt::Debug for FieldAccessor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name())
            .field("dtype", &T::DTYPE)
            .field("len", &self.length())
            .finish()
    }
}
