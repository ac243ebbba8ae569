//! Per-field reader-writer lock with an addressable raw form.
//!
//! [`FieldLock`] wraps `parking_lot`'s raw rwlock so that it can be driven
//! two ways: through RAII guards by the owning context, and through raw
//! lock/release calls on an opaque handle by a foreign context that only
//! holds the exported layout record. Both paths operate the same lock word.
//!
//! Granted holds are counted beside the raw lock. The raw lock's own state
//! also reflects writers that are still queued, so it cannot tell a release
//! whether the hold it is about to drop was actually granted.

use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::lock_api::RawRwLock as RawRwLockApi;
use parking_lot::RawRwLock;

/// A reader-writer lock guarding one field (or the state word).
///
/// Any number of shared holders, or exactly one exclusive holder, never
/// both. Unlocking is not tied to the acquiring thread.
pub struct FieldLock {
    raw: RawRwLock,
    readers: AtomicUsize,
    writer: AtomicBool,
}

impl FieldLock {
    /// A new, unlocked lock.
    pub const fn new() -> Self {
        Self {
            raw: <RawRwLock as RawRwLockApi>::INIT,
            readers: AtomicUsize::new(0),
            writer: AtomicBool::new(false),
        }
    }

    /// Acquire shared access, blocking while a writer holds the lock.
    pub fn read(&self) -> SharedGuard<'_> {
        self.lock_shared();
        SharedGuard { lock: self }
    }

    /// Acquire exclusive access, blocking until all holders release.
    pub fn write(&self) -> ExclusiveGuard<'_> {
        self.lock_exclusive();
        ExclusiveGuard { lock: self }
    }

    /// Shared access without blocking; `None` if a writer holds the lock.
    pub fn try_read(&self) -> Option<SharedGuard<'_>> {
        self.try_lock_shared().then(|| SharedGuard { lock: self })
    }

    /// Exclusive access without blocking; `None` if anyone holds the lock.
    pub fn try_write(&self) -> Option<ExclusiveGuard<'_>> {
        self.try_lock_exclusive()
            .then(|| ExclusiveGuard { lock: self })
    }

    /// Whether any hold is currently granted.
    ///
    /// A writer still waiting for readers to drain does not count.
    pub fn is_locked(&self) -> bool {
        self.is_locked_exclusive() || self.shared_holders() > 0
    }

    /// Whether the exclusive hold is currently granted.
    pub fn is_locked_exclusive(&self) -> bool {
        self.writer.load(Ordering::Acquire)
    }

    /// Number of granted shared holds.
    pub fn shared_holders(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    // ── Raw, guard-free operations (foreign side) ──────────────────

    /// Acquire shared access without producing a guard.
    ///
    /// Must be paired with exactly one [`release_shared`](Self::release_shared).
    pub fn lock_shared(&self) {
        self.raw.lock_shared();
        self.readers.fetch_add(1, Ordering::AcqRel);
    }

    /// Acquire exclusive access without producing a guard.
    ///
    /// Must be paired with exactly one [`release_exclusive`](Self::release_exclusive).
    pub fn lock_exclusive(&self) {
        self.raw.lock_exclusive();
        self.writer.store(true, Ordering::Release);
    }

    /// Non-blocking [`lock_shared`](Self::lock_shared).
    pub fn try_lock_shared(&self) -> bool {
        let acquired = self.raw.try_lock_shared();
        if acquired {
            self.readers.fetch_add(1, Ordering::AcqRel);
        }
        acquired
    }

    /// Non-blocking [`lock_exclusive`](Self::lock_exclusive).
    pub fn try_lock_exclusive(&self) -> bool {
        let acquired = self.raw.try_lock_exclusive();
        if acquired {
            self.writer.store(true, Ordering::Release);
        }
        acquired
    }

    /// Release one shared hold taken through a raw call.
    ///
    /// Returns `false`, leaving the lock untouched, when no shared hold is
    /// granted. A writer queued behind the remaining readers does not make
    /// this fail.
    #[allow(unsafe_code)]
    pub fn release_shared(&self) -> bool {
        let counted = self
            .readers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if counted {
            // SAFETY: a granted shared hold existed and its count was taken.
            unsafe { self.raw.unlock_shared() }
        }
        counted
    }

    /// Release the exclusive hold taken through a raw call.
    ///
    /// Returns `false`, leaving the lock untouched, when the exclusive hold
    /// is not granted.
    #[allow(unsafe_code)]
    pub fn release_exclusive(&self) -> bool {
        let held = self
            .writer
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if held {
            // SAFETY: the exclusive hold was granted and its flag was cleared.
            unsafe { self.raw.unlock_exclusive() }
        }
        held
    }

    // ── Handles ────────────────────────────────────────────────────

    /// The opaque handle exported in the layout record: this lock's address.
    pub fn handle(&self) -> *const c_void {
        (self as *const Self).cast()
    }

    /// Recover a lock from an exported handle. `None` for a null handle.
    ///
    /// # Safety
    ///
    /// `handle` must be null or a value returned by [`handle`](Self::handle)
    /// on a lock that outlives `'a`.
    #[allow(unsafe_code)]
    pub unsafe fn from_handle<'a>(handle: *const c_void) -> Option<&'a FieldLock> {
        // SAFETY: non-null handles point to a live FieldLock per caller contract.
        unsafe { handle.cast::<FieldLock>().as_ref() }
    }
}

impl Default for FieldLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FieldLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldLock")
            .field("locked", &self.is_locked())
            .field("exclusive", &self.is_locked_exclusive())
            .field("shared_holders", &self.shared_holders())
            .finish()
    }
}

/// Shared hold on a [`FieldLock`]; released on drop, including during unwinding.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SharedGuard<'a> {
    lock: &'a FieldLock,
}

impl SharedGuard<'_> {
    /// The lock this guard holds.
    pub fn lock(&self) -> &FieldLock {
        self.lock
    }
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        let released = self.lock.release_shared();
        debug_assert!(released, "shared guard outlived its hold");
    }
}

/// Exclusive hold on a [`FieldLock`]; released on drop, including during unwinding.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    lock: &'a FieldLock,
}

impl ExclusiveGuard<'_> {
    /// The lock this guard holds.
    pub fn lock(&self) -> &FieldLock {
        self.lock
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        let released = self.lock.release_exclusive();
        debug_assert!(released, "exclusive guard outlived its hold");
    }
}

// Compile-time assertion: FieldLock must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<FieldLock>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_holders_coexist() {
        let lock = FieldLock::new();
        let a = lock.read();
        let b = lock.try_read();
        assert!(b.is_some());
        assert!(lock.try_write().is_none());
        drop(a);
        drop(b);
        assert!(!lock.is_locked());
    }

    #[test]
    fn exclusive_excludes_everyone() {
        let lock = FieldLock::new();
        let w = lock.write();
        assert!(lock.is_locked_exclusive());
        assert!(lock.try_read().is_none());
        assert!(lock.try_write().is_none());
        drop(w);
        assert!(lock.try_write().is_some());
    }

    #[test]
    fn guard_released_on_panic() {
        let lock = FieldLock::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = lock.write();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!lock.is_locked());
    }

    #[test]
    #[allow(unsafe_code)]
    fn handle_round_trip_drives_same_lock() {
        let lock = FieldLock::new();
        let handle = lock.handle();
        // SAFETY: `lock` outlives the recovered reference.
        let same = unsafe { FieldLock::from_handle(handle) }.unwrap();
        same.lock_exclusive();
        assert!(lock.is_locked_exclusive());
        assert!(same.release_exclusive());
        assert!(!lock.is_locked());
    }

    #[test]
    fn release_without_hold_is_refused() {
        let lock = FieldLock::new();
        assert!(!lock.release_shared());
        assert!(!lock.release_exclusive());
        lock.lock_shared();
        assert!(!lock.release_exclusive());
        assert!(lock.release_shared());
        lock.lock_exclusive();
        assert!(!lock.release_shared());
        assert!(lock.release_exclusive());
        assert!(!lock.is_locked());
    }

    #[test]
    fn shared_release_succeeds_with_writer_queued() {
        let lock = FieldLock::new();
        lock.lock_shared();
        std::thread::scope(|s| {
            let writer = s.spawn(|| {
                lock.lock_exclusive();
                lock.release_exclusive()
            });
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(!lock.is_locked_exclusive());
            assert!(!lock.release_exclusive());
            assert_eq!(lock.shared_holders(), 1);
            assert!(lock.release_shared());
            assert!(writer.join().unwrap());
        });
        assert!(!lock.is_locked());
    }

    #[test]
    #[allow(unsafe_code)]
    fn null_handle_is_none() {
        // SAFETY: null is explicitly allowed.
        assert!(unsafe { FieldLock::from_handle(std::ptr::null()) }.is_none());
    }
}
