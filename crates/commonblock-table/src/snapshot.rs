//! Consistent, all-fields copy of a table for tabular presentation.

use indexmap::IndexMap;

use commonblock_core::Column;

use crate::field::FieldSlot;
use crate::lock::SharedGuard;

/// Copy every field under shared locks taken in ascending index.
pub(crate) fn capture(slots: &[FieldSlot]) -> TableSnapshot {
    let guards: Vec<SharedGuard<'_>> = slots.iter().map(|s| s.lock.read()).collect();
    let columns = slots
        .iter()
        .map(|slot| {
            // SAFETY: `guards` holds this slot's lock shared until after the
            // clone below.
            #[allow(unsafe_code)]
            let column = unsafe { slot.column_unlocked() };
            (slot.descriptor.name().to_owned(), column.clone())
        })
        .collect();
    for guard in guards.into_iter().rev() {
        drop(guard);
    }
    TableSnapshot { columns }
}

/// Field name to column contents, in table order.
///
/// All columns were copied while every field lock was held at once, so they
/// are mutually consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSnapshot {
    columns: IndexMap<String, Column>,
}

impl TableSnapshot {
    /// Column for `name`.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// `(name, column)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Field names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Length of the longest column.
    pub fn max_rows(&self) -> usize {
        self.columns.values().map(Column::len).max().unwrap_or(0)
    }

    /// Row `index` across all columns, widened to `f64`.
    ///
    /// Columns shorter than `index + 1` contribute `None`.
    pub fn row(&self, index: usize) -> Vec<Option<f64>> {
        self.columns.values().map(|c| c.get_f64(index)).collect()
    }

    /// The underlying ordered map.
    pub fn into_inner(self) -> IndexMap<String, Column> {
        self.columns
    }
}

impl<'a> IntoIterator for &'a TableSnapshot {
    type Item = (&'a String, &'a Column);
    type IntoIter = indexmap::map::Iter<'a, String, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::table::ArrayTable;
    use commonblock_core::Column;

    fn table() -> ArrayTable {
        ArrayTable::builder()
            .array("pt", vec![1.5f64, 2.5, 3.5])
            .array("charge", vec![-1i8, 1])
            .array("flag", vec![true])
            .order(["pt"])
            .build()
            .unwrap()
    }

    #[test]
    fn columns_in_table_order() {
        let snap = table().snapshot();
        assert_eq!(snap.names().collect::<Vec<_>>(), ["pt", "charge", "flag"]);
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.get("charge"), Some(&Column::Int8(vec![-1, 1])));
    }

    #[test]
    fn ragged_rows() {
        let snap = table().snapshot();
        assert_eq!(snap.max_rows(), 3);
        assert_eq!(snap.row(0), vec![Some(1.5), Some(-1.0), Some(1.0)]);
        assert_eq!(snap.row(2), vec![Some(3.5), None, None]);
    }

    #[test]
    fn all_locks_released() {
        let t = table();
        let _ = t.snapshot();
        for name in ["pt", "charge", "flag"] {
            assert!(!t.field_lock(name).unwrap().is_locked());
        }
    }

    #[test]
    fn snapshot_is_a_copy() {
        let t = table();
        let snap = t.snapshot();
        t.accessor::<f64>("pt").unwrap().fill(0.0).unwrap();
        assert_eq!(snap.get("pt"), Some(&Column::Float64(vec![1.5, 2.5, 3.5])));
    }
}
