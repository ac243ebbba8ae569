//! Strongly-typed field index.

use std::fmt;

/// Position of a field within a table's fixed order.
///
/// `FieldIndex(n)` is the n-th entry of the exported layout record. It is
/// also the global lock-acquisition order for any operation that holds
/// more than one field lock at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(pub u32);

impl FieldIndex {
    /// The index as a `usize`, for slice indexing.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
