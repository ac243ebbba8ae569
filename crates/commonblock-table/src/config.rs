//! Table and signal configuration.

use std::time::Duration;

use commonblock_core::ConfigError;

// ── SignalConfig ───────────────────────────────────────────────────

/// Polling parameters for [`StateSignal`](crate::StateSignal) waits.
///
/// The wait loop sleeps `poll_interval` between reads of the state word.
/// Shorter intervals lower wake-up latency at the cost of more lock traffic
/// on the state lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalConfig {
    /// Sleep between successive reads. Default: 1 ms.
    pub poll_interval: Duration,
    /// Default deadline for `wait`/`wait_mask`. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl SignalConfig {
    /// Default poll interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Same configuration with a different timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if let Some(timeout) = self.timeout {
            if timeout < self.poll_interval {
                return Err(ConfigError::TimeoutShorterThanPoll {
                    timeout,
                    poll: self.poll_interval,
                });
            }
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

// ── OrderPolicy ────────────────────────────────────────────────────

/// How a caller-preferred field order is reconciled with the supplied arrays.
///
/// In both policies the names that the preferred order does not mention are
/// appended in ascending lexicographic order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderPolicy {
    /// Unknown and repeated names in the preferred order are dropped.
    #[default]
    Prefer,
    /// Unknown or repeated names in the preferred order are rejected
    /// with `InvalidInput`.
    Strict,
}

// ── TableConfig ────────────────────────────────────────────────────

/// Configuration applied when an [`ArrayTable`](crate::ArrayTable) is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableConfig {
    /// Preferred-order reconciliation.
    pub order_policy: OrderPolicy,
    /// State signal polling.
    pub signal: SignalConfig,
}

impl TableConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(TableConfig::default().validate(), Ok(()));
        assert_eq!(
            SignalConfig::default().poll_interval,
            Duration::from_millis(1)
        );
        assert_eq!(OrderPolicy::default(), OrderPolicy::Prefer);
    }

    #[test]
    fn zero_poll_rejected() {
        let cfg = SignalConfig {
            poll_interval: Duration::ZERO,
            timeout: None,
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPollInterval));
    }

    #[test]
    fn timeout_below_poll_rejected() {
        let cfg = SignalConfig {
            poll_interval: Duration::from_millis(10),
            timeout: Some(Duration::from_millis(5)),
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::TimeoutShorterThanPoll { .. })
        ));
        assert_eq!(
            cfg.with_timeout(Some(Duration::from_millis(10))).validate(),
            Ok(())
        );
    }
}
