//! Field descriptors and the slot that binds storage to its lock.

use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::ptr::NonNull;

use commonblock_core::{Column, ElementType, FieldIndex};

use crate::lock::FieldLock;

/// Immutable metadata for one field.
///
/// Built once at table construction. `len` equals the exact number of
/// elements of the owned storage and never changes; `data` is the start of
/// that storage and stays valid for the table's lifetime.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    index: FieldIndex,
    name: String,
    dtype: ElementType,
    len: usize,
    data: NonNull<u8>,
}

impl FieldDescriptor {
    /// Position in table order (and lock order).
    pub fn index(&self) -> FieldIndex {
        self.index
    }

    /// Unique field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type.
    pub fn element_type(&self) -> ElementType {
        self.dtype
    }

    /// The exported type tag, e.g. `"float64"`.
    pub fn type_tag(&self) -> &'static str {
        self.dtype.tag()
    }

    /// Fixed element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the field holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw address of the field's contiguous storage.
    ///
    /// Only meaningful while the owning table is alive, and only to be
    /// dereferenced while holding this field's lock.
    pub fn data_ptr(&self) -> *mut c_void {
        self.data.as_ptr().cast()
    }
}

// SAFETY: the descriptor is immutable; `data` is an address, and
// dereferencing it is governed by the field lock, not by the descriptor.
#[allow(unsafe_code)]
unsafe impl Send for FieldDescriptor {}
#[allow(unsafe_code)]
unsafe impl Sync for FieldDescriptor {}

/// One table entry: descriptor, lock, and the storage the lock guards.
pub(crate) struct FieldSlot {
    pub(crate) descriptor: FieldDescriptor,
    pub(crate) lock: FieldLock,
    storage: UnsafeCell<Column>,
}

// SAFETY: `storage` is only dereferenced while `lock` is held in the mode
// matching the access (shared for `&`, exclusive for `&mut`). The raw data
// pointer in the descriptor carries the same contract for foreign users.
#[allow(unsafe_code)]
unsafe impl Send for FieldSlot {}
#[allow(unsafe_code)]
unsafe impl Sync for FieldSlot {}

impl FieldSlot {
    pub(crate) fn new(index: FieldIndex, name: String, mut column: Column) -> Self {
        let dtype = column.element_type();
        let len = column.len();
        // Vec::as_mut_ptr is never null, even for an empty allocation.
        let data = NonNull::new(column.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self {
            descriptor: FieldDescriptor {
                index,
                name,
                dtype,
                len,
                data,
            },
            lock: FieldLock::new(),
            storage: UnsafeCell::new(column),
        }
    }

    /// Run `f` over the column under a shared lock.
    pub(crate) fn with_column<R>(&self, f: impl FnOnce(&Column) -> R) -> R {
        let _guard = self.lock.read();
        // SAFETY: shared lock held for the duration of the borrow.
        #[allow(unsafe_code)]
        let column = unsafe { &*self.storage.get() };
        f(column)
    }

    /// Run `f` over the column under the exclusive lock.
    pub(crate) fn with_column_mut<R>(&self, f: impl FnOnce(&mut Column) -> R) -> R {
        let _guard = self.lock.write();
        // SAFETY: exclusive lock held for the duration of the borrow.
        #[allow(unsafe_code)]
        let column = unsafe { &mut *self.storage.get() };
        f(column)
    }

    /// Like [`with_column`](Self::with_column) but fails instead of blocking.
    pub(crate) fn try_with_column<R>(&self, f: impl FnOnce(&Column) -> R) -> Option<R> {
        let _guard = self.lock.try_read()?;
        // SAFETY: shared lock held for the duration of the borrow.
        #[allow(unsafe_code)]
        let column = unsafe { &*self.storage.get() };
        Some(f(column))
    }

    /// Borrow the column without taking the lock.
    ///
    /// # Safety
    ///
    /// The caller must already hold this slot's lock in shared or exclusive
    /// mode for as long as the returned reference lives.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn column_unlocked(&self) -> &Column {
        // SAFETY: forwarded caller contract.
        unsafe { &*self.storage.get() }
    }
}
