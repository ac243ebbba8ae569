//! Polled cross-context state signal.
//!
//! The state word is a single `u64` guarded by its own reader-writer lock,
//! independent of every field lock. Its meaning is entirely the caller's:
//! the signal only offers atomic read, last-write-wins `notify`, and two
//! wait predicates. Waits poll at a fixed interval instead of blocking on a
//! condition variable, because the other side may be a foreign context that
//! cannot be handed a native waitable object.

use std::marker::PhantomData;
use std::ptr::NonNull;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use commonblock_core::TableError;

use crate::config::SignalConfig;
use crate::lock::FieldLock;

/// Handle on a table's state word.
///
/// Cheap to create; several may exist at once for the same word (one per
/// context). Borrowed from the table (or from a [`ForeignBlock`](crate::ForeignBlock))
/// and cannot outlive it.
#[derive(Clone, Copy, Debug)]
pub struct StateSignal<'a> {
    lock: &'a FieldLock,
    word: NonNull<u64>,
    config: SignalConfig,
    _word: PhantomData<&'a u64>,
}

// SAFETY: `word` is only read under `lock` held shared and only written
// under `lock` held exclusively; the lock itself is Send + Sync.
#[allow(unsafe_code)]
unsafe impl Send for StateSignal<'_> {}
#[allow(unsafe_code)]
unsafe impl Sync for StateSignal<'_> {}

impl<'a> StateSignal<'a> {
    /// Bind a signal to a lock and the word it guards.
    ///
    /// # Safety
    ///
    /// `word` must stay valid for `'a` and must only ever be accessed while
    /// holding `lock`.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn from_parts(lock: &'a FieldLock, word: NonNull<u64>, config: SignalConfig) -> Self {
        Self {
            lock,
            word,
            config,
            _word: PhantomData,
        }
    }

    /// The polling configuration in effect.
    pub fn config(&self) -> SignalConfig {
        self.config
    }

    /// Same signal with a different polling configuration.
    pub fn with_config(mut self, config: SignalConfig) -> Result<Self, TableError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Current value, read under the shared state lock.
    #[allow(unsafe_code)]
    pub fn read(&self) -> u64 {
        let _guard = self.lock.read();
        // SAFETY: state lock held shared; `word` valid for `'a`.
        unsafe { self.word.as_ptr().read() }
    }

    /// Overwrite the value under the exclusive state lock. The previous
    /// value is discarded.
    #[allow(unsafe_code)]
    pub fn notify(&self, value: u64) {
        let _guard = self.lock.write();
        // SAFETY: state lock held exclusively; `word` valid for `'a`.
        unsafe { self.word.as_ptr().write(value) }
    }

    /// Block until the value equals `target`. Returns the observed value.
    ///
    /// Uses the configured timeout; fails with `TimedOut` when it expires.
    pub fn wait(&self, target: u64) -> Result<u64, TableError> {
        self.wait_until(|v| v == target, self.deadline(self.config.timeout))
    }

    /// Block until `value & mask != 0`. Returns the observed value.
    ///
    /// `mask == 0` can never be satisfied and is rejected with `InvalidInput`.
    pub fn wait_mask(&self, mask: u64) -> Result<u64, TableError> {
        self.wait_mask_inner(mask, self.config.timeout)
    }

    /// [`wait`](Self::wait) with an explicit timeout.
    pub fn wait_timeout(&self, target: u64, timeout: Duration) -> Result<u64, TableError> {
        self.wait_until(|v| v == target, self.deadline(Some(timeout)))
    }

    /// [`wait_mask`](Self::wait_mask) with an explicit timeout.
    pub fn wait_mask_timeout(&self, mask: u64, timeout: Duration) -> Result<u64, TableError> {
        self.wait_mask_inner(mask, Some(timeout))
    }

    /// Poll until `pred` accepts the value or `deadline` passes.
    ///
    /// The value is read once before any sleep, so an already-satisfied
    /// predicate returns without suspending.
    pub fn wait_until(
        &self,
        mut pred: impl FnMut(u64) -> bool,
        deadline: Option<Instant>,
    ) -> Result<u64, TableError> {
        let start = Instant::now();
        let mut polls: u64 = 0;
        loop {
            let current = self.read();
            polls += 1;
            if pred(current) {
                trace!(value = current, polls, "state wait satisfied");
                return Ok(current);
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let waited = now.duration_since(start);
                        warn!(last_value = current, polls, ?waited, "state wait timed out");
                        return Err(TableError::TimedOut {
                            waited,
                            last_value: current,
                        });
                    }
                    self.config.poll_interval.min(deadline - now)
                }
                None => self.config.poll_interval,
            };
            thread::sleep(pause);
        }
    }

    fn wait_mask_inner(&self, mask: u64, timeout: Option<Duration>) -> Result<u64, TableError> {
        if mask == 0 {
            return Err(TableError::InvalidInput {
                reason: "wait_mask(0) can never be satisfied".into(),
            });
        }
        self.wait_until(|v| v & mask != 0, self.deadline(timeout))
    }

    /// `None` when there is no timeout, or when it lies past what
    /// `Instant` can represent.
    fn deadline(&self, timeout: Option<Duration>) -> Option<Instant> {
        timeout.and_then(|t| Instant::now().checked_add(t))
    }
}
