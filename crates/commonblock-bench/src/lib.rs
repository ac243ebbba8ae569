//! Benchmark profiles for commonblock array tables.
//!
//! - [`reference_table`]: eight `f64` fields of 10K elements plus one
//!   `i32` and one `bool` field, roughly the shape of a per-event column
//!   set handed between a producer and a consumer.
//! - [`sized_table`]: `n` `f64` fields of `len` elements.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use commonblock_core::ElementType;
use commonblock_table::ArrayTable;

/// Elements per field in the reference profile.
pub const REFERENCE_LEN: usize = 10_000;

/// Build the reference profile.
pub fn reference_table() -> ArrayTable {
    let names = ["px", "py", "pz", "e", "pt", "eta", "phi", "mass"];
    names
        .iter()
        .fold(ArrayTable::builder(), |b, name| {
            b.array(*name, vec![0.0f64; REFERENCE_LEN])
        })
        .zeroed("charge", ElementType::Int32, REFERENCE_LEN)
        .zeroed("selected", ElementType::Bool, REFERENCE_LEN)
        .order(names)
        .build()
        .unwrap()
}

/// Build `n` `f64` fields of `len` elements, named `f000`, `f001`, ...
pub fn sized_table(n: usize, len: usize) -> ArrayTable {
    (0..n)
        .fold(ArrayTable::builder(), |b, i| {
            b.array(format!("f{i:03}"), vec![0.0f64; len])
        })
        .build()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_shape() {
        let t = reference_table();
        assert_eq!(t.field_count(), 10);
        assert_eq!(t.names().next(), Some("px"));
        assert!(t.descriptors().all(|d| d.len() == REFERENCE_LEN));
    }

    #[test]
    fn sized_table_shape() {
        let t = sized_table(3, 7);
        assert_eq!(t.names().collect::<Vec<_>>(), ["f000", "f001", "f002"]);
    }
}
