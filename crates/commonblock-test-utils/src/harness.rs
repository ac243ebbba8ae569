//! Producer thread harness.
//!
//! [`spawn_producer`] runs a closure against a shared table on a scoped
//! thread. The closure's result comes back over a `crossbeam-channel`, and
//! [`ProducerHandle::finish`] waits for it with a deadline.

use std::thread::{Scope, ScopedJoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use commonblock_core::TableError;
use commonblock_table::ArrayTable;

/// Running producer. Call [`finish`](ProducerHandle::finish) to collect it.
pub struct ProducerHandle<'scope> {
    done: Receiver<Result<(), TableError>>,
    thread: ScopedJoinHandle<'scope, ()>,
}

/// Start `produce` on a scoped thread.
pub fn spawn_producer<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    table: &'env ArrayTable,
    produce: F,
) -> ProducerHandle<'scope>
where
    F: FnOnce(&ArrayTable) -> Result<(), TableError> + Send + 'scope,
{
    let (tx, done) = bounded(1);
    let thread = scope.spawn(move || {
        let result = produce(table);
        // The receiver may already have timed out and gone away.
        let _ = tx.send(result);
    });
    ProducerHandle { done, thread }
}

impl ProducerHandle<'_> {
    /// Wait up to `timeout` for the producer's result.
    ///
    /// Panics if the producer does not report in time or panicked.
    pub fn finish(self, timeout: Duration) -> Result<(), TableError> {
        match self.done.recv_timeout(timeout) {
            Ok(result) => {
                self.thread.join().expect("producer thread panicked");
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                panic!("producer did not finish within {timeout:?}")
            }
            Err(RecvTimeoutError::Disconnected) => {
                panic!("producer thread panicked before reporting")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_table;
    use std::thread;

    #[test]
    fn producer_result_is_returned() {
        let table = scenario_table();
        thread::scope(|s| {
            let handle = spawn_producer(s, &table, |t| {
                t.accessor::<f64>("b")?.fill(1.0)?;
                Ok(())
            });
            assert_eq!(handle.finish(Duration::from_secs(5)), Ok(()));
        });
        assert_eq!(
            table.accessor::<f64>("b").unwrap().read(..).unwrap(),
            vec![1.0, 1.0]
        );
    }

    #[test]
    fn producer_error_is_returned() {
        let table = scenario_table();
        thread::scope(|s| {
            let handle = spawn_producer(s, &table, |t| t.accessor::<f64>("nope").map(|_| ()));
            assert!(matches!(
                handle.finish(Duration::from_secs(5)),
                Err(TableError::UnknownField { .. })
            ));
        });
    }
}
