//! The foreign layout record: one address from which every field, lock,
//! and the state word can be located.
//!
//! # Layout (version 1, 64-bit targets)
//!
//! ```text
//! offset  field         C type
//!      0  field_count   uint64_t
//!      8  names         const char *const *      NUL-terminated UTF-8
//!     16  type_tags     const char *const *      "bool", "int8", ..., "float64"
//!     24  data          void *const *
//!     32  lengths       const uint64_t *         element counts
//!     40  locks         const void *const *      field lock handles
//!     48  state_lock    const void *
//!     56  state         uint64_t                 guarded by state_lock
//! ```
//!
//! The five per-field arrays are parallel and `field_count` long, in table
//! order. The record and every array it points to are owned by the table
//! and stay at fixed addresses until the table is dropped.

use std::ffi::{c_char, c_void, CStr, CString};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use commonblock_core::ElementType;

use crate::field::FieldSlot;
use crate::lock::FieldLock;

/// Version of the record layout documented above.
pub const LAYOUT_VERSION: u32 = 1;

/// The `repr(C)` record handed to foreign contexts.
#[repr(C)]
#[derive(Debug)]
pub struct ForeignLayout {
    /// Number of fields.
    pub field_count: u64,
    /// Field names.
    pub names: *const *const c_char,
    /// Element type tags.
    pub type_tags: *const *const c_char,
    /// Start of each field's storage.
    ///
    /// A `bool` field is one byte per element and its owner reads it as
    /// Rust `bool`: foreign writers must store only 0 or 1 there.
    pub data: *const *mut c_void,
    /// Element count of each field.
    pub lengths: *const u64,
    /// Lock handle of each field.
    pub locks: *const *const c_void,
    /// Handle of the lock guarding `state`.
    pub state_lock: *const c_void,
    /// The state word.
    pub state: u64,
}

// Compile-time layout assertions for ABI stability.
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<ForeignLayout>() == 64);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::align_of::<ForeignLayout>() == 8);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::offset_of!(ForeignLayout, state) == 56);

/// C string form of a type tag.
pub(crate) fn c_tag(dtype: ElementType) -> &'static CStr {
    match dtype {
        ElementType::Bool => c"bool",
        ElementType::Int8 => c"int8",
        ElementType::UInt8 => c"uint8",
        ElementType::Int16 => c"int16",
        ElementType::UInt16 => c"uint16",
        ElementType::Int32 => c"int32",
        ElementType::UInt32 => c"uint32",
        ElementType::Int64 => c"int64",
        ElementType::UInt64 => c"uint64",
        ElementType::Float32 => c"float32",
        ElementType::Float64 => c"float64",
    }
}

/// Owner of the record and of the arrays it points into.
///
/// The record is heap-allocated once and only ever accessed through raw
/// pointers, because foreign contexts write `state` concurrently with Rust
/// reads of the immutable parts.
pub(crate) struct LayoutBlock {
    record: NonNull<ForeignLayout>,
    _names: Vec<CString>,
    _name_ptrs: Vec<*const c_char>,
    _tag_ptrs: Vec<*const c_char>,
    _data_ptrs: Vec<*mut c_void>,
    _lengths: Vec<u64>,
    _lock_ptrs: Vec<*const c_void>,
}

impl LayoutBlock {
    /// Build the record for `slots` (already in final order and at their
    /// final addresses). `names` are the C forms of the slot names.
    pub(crate) fn new(slots: &[FieldSlot], names: Vec<CString>, state_lock: &FieldLock) -> Self {
        let name_ptrs: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        let tag_ptrs: Vec<*const c_char> = slots
            .iter()
            .map(|s| c_tag(s.descriptor.element_type()).as_ptr())
            .collect();
        let data_ptrs: Vec<*mut c_void> = slots.iter().map(|s| s.descriptor.data_ptr()).collect();
        let lengths: Vec<u64> = slots.iter().map(|s| s.descriptor.len() as u64).collect();
        let lock_ptrs: Vec<*const c_void> = slots.iter().map(|s| s.lock.handle()).collect();

        let record = Box::new(ForeignLayout {
            field_count: slots.len() as u64,
            names: name_ptrs.as_ptr(),
            type_tags: tag_ptrs.as_ptr(),
            data: data_ptrs.as_ptr(),
            lengths: lengths.as_ptr(),
            locks: lock_ptrs.as_ptr(),
            state_lock: state_lock.handle(),
            state: 0,
        });

        Self {
            record: NonNull::from(Box::leak(record)),
            _names: names,
            _name_ptrs: name_ptrs,
            _tag_ptrs: tag_ptrs,
            _data_ptrs: data_ptrs,
            _lengths: lengths,
            _lock_ptrs: lock_ptrs,
        }
    }

    pub(crate) fn record(&self) -> NonNull<ForeignLayout> {
        self.record
    }

    /// Address of the live state word inside the record.
    pub(crate) fn state_word(&self) -> NonNull<u64> {
        // SAFETY: `record` is a live allocation owned by `self`; taking a
        // field address does not create a reference.
        #[allow(unsafe_code)]
        let word = unsafe { ptr::addr_of_mut!((*self.record.as_ptr()).state) };
        NonNull::new(word).unwrap_or(NonNull::dangling())
    }
}

impl Drop for LayoutBlock {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: `record` came from `Box::leak` in `new` and is freed once.
        drop(unsafe { Box::from_raw(self.record.as_ptr()) });
    }
}

/// One decoded entry of the record.
#[derive(Clone, Copy, Debug)]
pub struct LayoutEntry<'a> {
    /// Field name.
    pub name: &'a str,
    /// Element type tag.
    pub type_tag: &'a str,
    /// Start of the field's storage.
    pub data: *mut c_void,
    /// Element count.
    pub element_count: u64,
    /// Field lock handle.
    pub lock: *const c_void,
}

/// Borrowed view of a table's exported record.
///
/// Reading the view acquires no field lock: everything except `state` is
/// immutable after construction. [`as_ptr`](Self::as_ptr) is the address to
/// hand to a foreign context.
#[derive(Clone, Copy, Debug)]
pub struct LayoutView<'a> {
    record: NonNull<ForeignLayout>,
    _table: PhantomData<&'a ()>,
}

impl<'a> LayoutView<'a> {
    pub(crate) fn new(record: NonNull<ForeignLayout>) -> Self {
        Self {
            record,
            _table: PhantomData,
        }
    }

    /// The record address.
    pub fn as_ptr(&self) -> *const ForeignLayout {
        self.record.as_ptr()
    }

    /// Number of fields in the record.
    #[allow(unsafe_code)]
    pub fn field_count(&self) -> usize {
        // SAFETY: immutable header field of a live record.
        unsafe { ptr::addr_of!((*self.record.as_ptr()).field_count).read() as usize }
    }

    /// Decode entry `i`, or `None` past the end.
    #[allow(unsafe_code)]
    pub fn entry(&self, i: usize) -> Option<LayoutEntry<'a>> {
        if i >= self.field_count() {
            return None;
        }
        let rec = self.record.as_ptr();
        // SAFETY: the per-field arrays are `field_count` long, immutable, and
        // owned by the table for `'a`. Names and tags were built from valid
        // UTF-8 (`String` / static tags).
        unsafe {
            let name = CStr::from_ptr(*ptr::addr_of!((*rec).names).read().add(i));
            let tag = CStr::from_ptr(*ptr::addr_of!((*rec).type_tags).read().add(i));
            Some(LayoutEntry {
                name: name.to_str().unwrap_or_default(),
                type_tag: tag.to_str().unwrap_or_default(),
                data: *ptr::addr_of!((*rec).data).read().add(i),
                element_count: *ptr::addr_of!((*rec).lengths).read().add(i),
                lock: *ptr::addr_of!((*rec).locks).read().add(i),
            })
        }
    }

    /// All entries in table order.
    pub fn entries(&self) -> impl Iterator<Item = LayoutEntry<'a>> + 'a {
        let view = *self;
        (0..view.field_count()).filter_map(move |i| view.entry(i))
    }

    /// Handle of the state lock.
    #[allow(unsafe_code)]
    pub fn state_lock_handle(&self) -> *const c_void {
        // SAFETY: immutable header field of a live record.
        unsafe { ptr::addr_of!((*self.record.as_ptr()).state_lock).read() }
    }

    /// Current state value, read under the state lock.
    #[allow(unsafe_code)]
    pub fn state_value(&self) -> u64 {
        // SAFETY: the state lock handle refers to the table's state lock,
        // alive for `'a`.
        let lock = unsafe { FieldLock::from_handle(self.state_lock_handle()) };
        let _guard = lock.map(FieldLock::read);
        // SAFETY: state lock held; the record is live.
        unsafe { ptr::addr_of!((*self.record.as_ptr()).state).read() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_core_tags() {
        for dtype in ElementType::ALL {
            assert_eq!(c_tag(dtype).to_str().unwrap(), dtype.tag());
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn record_is_64_bytes() {
        assert_eq!(std::mem::size_of::<ForeignLayout>(), 64);
        assert_eq!(std::mem::offset_of!(ForeignLayout, field_count), 0);
        assert_eq!(std::mem::offset_of!(ForeignLayout, locks), 40);
        assert_eq!(std::mem::offset_of!(ForeignLayout, state_lock), 48);
    }
}
