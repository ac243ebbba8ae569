//! Error types for array tables and their configuration.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::dtype::ElementType;

/// Errors surfaced synchronously by table, accessor, and signal operations.
///
/// None are retried internally. A construction error means no table was
/// built; a per-field error leaves every other field untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableError {
    /// Bad construction or call arguments (empty table, duplicate or empty
    /// names, rejected preferred order, unsatisfiable wait mask).
    InvalidInput {
        /// Description of what was rejected.
        reason: String,
    },
    /// No field with this name exists in the table.
    UnknownField {
        /// The requested name.
        name: String,
    },
    /// A read or write range falls partly or wholly outside `[0, len)`.
    IndexOutOfRange {
        /// Field the range was applied to.
        field: String,
        /// Requested start (inclusive).
        start: usize,
        /// Requested end (exclusive).
        end: usize,
        /// The field's fixed element count.
        len: usize,
    },
    /// The number of values written differs from the range length.
    ShapeMismatch {
        /// Field being written.
        field: String,
        /// Range length.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// A typed accessor was requested with the wrong element type.
    TypeMismatch {
        /// Field requested.
        field: String,
        /// Element type the caller asked for.
        expected: ElementType,
        /// Element type the field actually stores.
        found: ElementType,
    },
    /// A wait exceeded its deadline.
    TimedOut {
        /// How long the wait ran before giving up.
        waited: Duration,
        /// The last state value observed.
        last_value: u64,
    },
    /// A lock could not be acquired (held by a conflicting holder in a
    /// non-blocking call, or the handle itself is unusable).
    LockFailure {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
            Self::UnknownField { name } => write!(f, "unknown field '{name}'"),
            Self::IndexOutOfRange {
                field,
                start,
                end,
                len,
            } => write!(
                f,
                "range {start}..{end} out of bounds for field '{field}' of length {len}"
            ),
            Self::ShapeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "shape mismatch writing field '{field}': range holds {expected} elements, got {found}"
            ),
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "type mismatch for field '{field}': requested {expected}, field stores {found}"
            ),
            Self::TimedOut { waited, last_value } => write!(
                f,
                "timed out after {waited:?} waiting on state (last value {last_value})"
            ),
            Self::LockFailure { reason } => write!(f, "lock failure: {reason}"),
        }
    }
}

impl Error for TableError {}

/// Errors detected by configuration `validate()` methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The poll interval is zero, which would spin without yielding.
    ZeroPollInterval,
    /// A wait timeout shorter than one poll interval can never observe a change.
    TimeoutShorterThanPoll {
        /// The configured timeout.
        timeout: Duration,
        /// The configured poll interval.
        poll: Duration,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPollInterval => write!(f, "poll_interval must be non-zero"),
            Self::TimeoutShorterThanPoll { timeout, poll } => write!(
                f,
                "timeout {timeout:?} is shorter than poll_interval {poll:?}"
            ),
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for TableError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidInput {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let e = TableError::IndexOutOfRange {
            field: "a".into(),
            start: 2,
            end: 5,
            len: 3,
        };
        assert_eq!(
            e.to_string(),
            "range 2..5 out of bounds for field 'a' of length 3"
        );
    }

    #[test]
    fn config_error_maps_to_invalid_input() {
        let e: TableError = ConfigError::ZeroPollInterval.into();
        assert!(matches!(e, TableError::InvalidInput { .. }));
    }
}
