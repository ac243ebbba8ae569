//! Field lock FFI: operate a lock through the opaque handle found in the
//! layout record's `locks` array (or its `state_lock`).
//!
//! A null handle, an unlock with no granted hold in the matching mode, and
//! a failed `try` acquisition all report `LockFailure`. A writer queued
//! behind shared holders is not a granted hold.

use std::ffi::c_void;

use commonblock_table::FieldLock;

use crate::status::CbStatus;

/// Resolve a handle from a layout record.
///
/// # Safety
///
/// `handle` must be null or a lock handle from the record of a live table.
#[allow(unsafe_code)]
unsafe fn resolve<'a>(handle: *const c_void) -> Result<&'a FieldLock, CbStatus> {
    // SAFETY: forwarded caller contract.
    unsafe { FieldLock::from_handle(handle) }.ok_or(CbStatus::LockFailure)
}

/// Acquire shared access, blocking while a writer holds the lock.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_lock_shared(lock: *const c_void) -> i32 {
    ffi_guard!({
        // SAFETY: lock comes from a live layout record per caller contract.
        let lock = ffi_try!(unsafe { resolve(lock) });
        lock.lock_shared();
        CbStatus::Ok as i32
    })
}

/// Release one shared hold taken with `cb_lock_shared` or
/// `cb_try_lock_shared`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_unlock_shared(lock: *const c_void) -> i32 {
    ffi_guard!({
        // SAFETY: lock comes from a live layout record per caller contract.
        let lock = ffi_try!(unsafe { resolve(lock) });
        if lock.release_shared() {
            CbStatus::Ok as i32
        } else {
            CbStatus::LockFailure as i32
        }
    })
}

/// Acquire exclusive access, blocking until every holder releases.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_lock_exclusive(lock: *const c_void) -> i32 {
    ffi_guard!({
        // SAFETY: lock comes from a live layout record per caller contract.
        let lock = ffi_try!(unsafe { resolve(lock) });
        lock.lock_exclusive();
        CbStatus::Ok as i32
    })
}

/// Release the exclusive hold taken with `cb_lock_exclusive` or
/// `cb_try_lock_exclusive`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_unlock_exclusive(lock: *const c_void) -> i32 {
    ffi_guard!({
        // SAFETY: lock comes from a live layout record per caller contract.
        let lock = ffi_try!(unsafe { resolve(lock) });
        if lock.release_exclusive() {
            CbStatus::Ok as i32
        } else {
            CbStatus::LockFailure as i32
        }
    })
}

/// Try to acquire shared access without blocking.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_try_lock_shared(lock: *const c_void) -> i32 {
    ffi_guard!({
        // SAFETY: lock comes from a live layout record per caller contract.
        let lock = ffi_try!(unsafe { resolve(lock) });
        if lock.try_lock_shared() {
            CbStatus::Ok as i32
        } else {
            CbStatus::LockFailure as i32
        }
    })
}

/// Try to acquire exclusive access without blocking.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cb_try_lock_exclusive(lock: *const c_void) -> i32 {
    ffi_guard!({
        // SAFETY: lock comes from a live layout record per caller contract.
        let lock = ffi_try!(unsafe { resolve(lock) });
        if lock.try_lock_exclusive() {
            CbStatus::Ok as i32
        } else {
            CbStatus::LockFailure as i32
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK: i32 = CbStatus::Ok as i32;
    const FAIL: i32 = CbStatus::LockFailure as i32;

    #[test]
    fn null_handle_fails() {
        let null = std::ptr::null();
        assert_eq!(cb_lock_shared(null), FAIL);
        assert_eq!(cb_unlock_shared(null), FAIL);
        assert_eq!(cb_lock_exclusive(null), FAIL);
        assert_eq!(cb_unlock_exclusive(null), FAIL);
        assert_eq!(cb_try_lock_shared(null), FAIL);
        assert_eq!(cb_try_lock_exclusive(null), FAIL);
    }

    #[test]
    fn shared_then_exclusive() {
        let lock = FieldLock::new();
        let h = lock.handle();
        assert_eq!(cb_lock_shared(h), OK);
        assert_eq!(cb_try_lock_shared(h), OK);
        assert_eq!(cb_try_lock_exclusive(h), FAIL);
        assert_eq!(cb_unlock_shared(h), OK);
        assert_eq!(cb_unlock_shared(h), OK);
        assert_eq!(cb_try_lock_exclusive(h), OK);
        assert_eq!(cb_try_lock_shared(h), FAIL);
        assert_eq!(cb_unlock_exclusive(h), OK);
        assert!(!lock.is_locked());
    }

    #[test]
    fn unlock_in_wrong_mode_fails() {
        let lock = FieldLock::new();
        let h = lock.handle();
        assert_eq!(cb_unlock_shared(h), FAIL);
        assert_eq!(cb_unlock_exclusive(h), FAIL);
        assert_eq!(cb_lock_exclusive(h), OK);
        assert_eq!(cb_unlock_shared(h), FAIL);
        assert_eq!(cb_unlock_exclusive(h), OK);
        assert_eq!(cb_lock_shared(h), OK);
        assert_eq!(cb_unlock_exclusive(h), FAIL);
        assert_eq!(cb_unlock_shared(h), OK);
    }

    #[test]
    fn shared_unlock_releases_queued_writer() {
        let lock = FieldLock::new();
        let h = lock.handle() as usize;
        assert_eq!(cb_lock_shared(h as *const c_void), OK);
        std::thread::scope(|s| {
            let writer = s.spawn(move || {
                let h = h as *const c_void;
                (cb_lock_exclusive(h), cb_unlock_exclusive(h))
            });
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert_eq!(cb_unlock_exclusive(h as *const c_void), FAIL);
            assert_eq!(cb_unlock_shared(h as *const c_void), OK);
            assert_eq!(writer.join().unwrap(), (OK, OK));
        });
        assert!(!lock.is_locked());
    }

    #[test]
    fn raw_and_guarded_paths_share_the_lock() {
        let lock = FieldLock::new();
        let guard = lock.write();
        assert_eq!(cb_try_lock_shared(lock.handle()), FAIL);
        drop(guard);
        assert_eq!(cb_try_lock_shared(lock.handle()), OK);
        assert!(lock.try_write().is_none());
        assert_eq!(cb_unlock_shared(lock.handle()), OK);
    }
}
