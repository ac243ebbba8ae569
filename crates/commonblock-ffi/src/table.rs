//! Table lifecycle FFI: create from a builder, export the layout record,
//! copy field ranges in and out, destroy.
//!
//! Tables live behind `Arc` so the global `TABLES` lock is only held for
//! handle lookup; field access then goes through the table's own locks.

use std::ffi::{c_char, c_void};
use std::sync::{Arc, Mutex};

use commonblock_core::ElementType;
use commonblock_table::{ArrayTable, ForeignLayout};

use crate::builder::builders;
use crate::convert::{c_slice, c_slice_mut, c_str, dispatch, element_type, to_usize, CElement};
use crate::handle::HandleTable;
use crate::status::CbStatus;

static TABLES: Mutex<HandleTable<Arc<ArrayTable>>> = Mutex::new(HandleTable::new());

fn get_table(handle: u64) -> Option<Arc<ArrayTable>> {
    TABLES.lock().ok()?.get(handle).cloned()
}

/// Build a table from a builder handle. Consumes the builder.
///
/// On success writes the table handle to `table_out`. On failure the
/// builder is still consumed.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_table_create(builder: u64, table_out: *mut u64) -> i32 {
    ffi_guard!({
        let builder = match ffi_lock!(builders()).remove(builder) {
            Some(b) => b,
            None => return CbStatus::InvalidHandle as i32,
        };
        if table_out.is_null() {
            return CbStatus::InvalidArgument as i32;
        }
        let table = ffi_try!(builder.build());
        let handle = ffi_lock!(TABLES).insert(Arc::new(table));
        // SAFETY: table_out is non-null and valid per caller contract.
        unsafe { *table_out = handle };
        CbStatus::Ok as i32
    })
}

/// Destroy a table.
///
/// Every layout record address obtained from it becomes dangling; no
/// context may still hold one of its locks.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_table_destroy(table: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(TABLES).remove(table) {
            Some(_) => CbStatus::Ok as i32,
            None => CbStatus::InvalidHandle as i32,
        }
    })
}

/// Write the address of the table's layout record to `layout_out`.
///
/// The address stays valid until `cb_table_destroy`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_table_layout(table: u64, layout_out: *mut *const ForeignLayout) -> i32 {
    ffi_guard!({
        let Some(table) = get_table(table) else {
            return CbStatus::InvalidHandle as i32;
        };
        if layout_out.is_null() {
            return CbStatus::InvalidArgument as i32;
        }
        // SAFETY: layout_out is non-null and valid per caller contract.
        unsafe { *layout_out = table.export_layout().as_ptr() };
        CbStatus::Ok as i32
    })
}

/// Write the number of fields to `count_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_table_field_count(table: u64, count_out: *mut u64) -> i32 {
    ffi_guard!({
        let Some(table) = get_table(table) else {
            return CbStatus::InvalidHandle as i32;
        };
        if count_out.is_null() {
            return CbStatus::InvalidArgument as i32;
        }
        // SAFETY: count_out is non-null and valid per caller contract.
        unsafe { *count_out = table.field_count() as u64 };
        CbStatus::Ok as i32
    })
}

/// Copy elements `[start, end)` of field `name` into `out` under the
/// field's shared lock.
///
/// `dtype` must be the field's element type code; `out` must hold
/// `end - start` elements of it (`bool` as bytes).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_table_read(
    table: u64,
    name: *const c_char,
    dtype: u8,
    start: u64,
    end: u64,
    out: *mut c_void,
) -> i32 {
    ffi_guard!({
        let Some(table) = get_table(table) else {
            return CbStatus::InvalidHandle as i32;
        };
        // SAFETY: name is a NUL-terminated string per caller contract.
        let name = ffi_try!(unsafe { c_str(name) });
        let dtype = ffi_try!(element_type(dtype));
        let (start, end) = (ffi_try!(to_usize(start)), ffi_try!(to_usize(end)));
        ffi_try!(dispatch!(dtype, read_into(&table, name, start, end, out)));
        CbStatus::Ok as i32
    })
}

/// Overwrite elements `[start, end)` of field `name` from `data` under the
/// field's exclusive lock.
///
/// `dtype` must be the field's element type code; `data` must hold
/// `end - start` elements of it (`bool` as bytes, non-zero is `true`).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_table_write(
    table: u64,
    name: *const c_char,
    dtype: u8,
    start: u64,
    end: u64,
    data: *const c_void,
) -> i32 {
    ffi_guard!({
        let Some(table) = get_table(table) else {
            return CbStatus::InvalidHandle as i32;
        };
        // SAFETY: name is a NUL-terminated string per caller contract.
        let name = ffi_try!(unsafe { c_str(name) });
        let dtype = ffi_try!(element_type(dtype));
        let (start, end) = (ffi_try!(to_usize(start)), ffi_try!(to_usize(end)));
        ffi_try!(dispatch!(dtype, write_from(&table, name, start, end, data)));
        CbStatus::Ok as i32
    })
}

fn read_into<T: CElement>(
    table: &ArrayTable,
    name: &str,
    start: usize,
    end: usize,
    out: *mut c_void,
) -> Result<(), CbStatus> {
    let values = table.accessor::<T>(name)?.read(start..end)?;
    // SAFETY: out holds `end - start` elements per the caller contract of
    // `cb_table_read`.
    #[allow(unsafe_code)]
    let dst = unsafe { c_slice_mut::<T::Raw>(out, values.len()) }?;
    for (d, v) in dst.iter_mut().zip(values) {
        *d = v.to_c();
    }
    Ok(())
}

fn write_from<T: CElement>(
    table: &ArrayTable,
    name: &str,
    start: usize,
    end: usize,
    data: *const c_void,
) -> Result<(), CbStatus> {
    let accessor = table.accessor::<T>(name)?;
    // SAFETY: data holds `end - start` elements per the caller contract of
    // `cb_table_write`.
    #[allow(unsafe_code)]
    let src = unsafe { c_slice::<T::Raw>(data, end.saturating_sub(start)) }?;
    let values: Vec<T> = src.iter().map(|&r| T::from_c(r)).collect();
    accessor.write(start..end, &values)?;
    Ok(())
}
