//! The array table and its builder.

use std::ffi::CString;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use commonblock_core::{Column, Element, ElementType, FieldIndex, TableError};

use crate::accessor::FieldAccessor;
use crate::config::TableConfig;
use crate::field::{FieldDescriptor, FieldSlot};
use crate::layout::{LayoutBlock, LayoutView};
use crate::lock::FieldLock;
use crate::order::resolve_order;
use crate::signal::StateSignal;
use crate::snapshot::{self, TableSnapshot};

// ── ArrayTableBuilder ──────────────────────────────────────────────

/// Collects named arrays and options, then builds an [`ArrayTable`].
///
/// # Examples
///
/// ```
/// use commonblock_table::{ArrayTable, ElementType};
///
/// let table = ArrayTable::builder()
///     .array("pt", vec![0.0f64; 4])
///     .zeroed("charge", ElementType::Int8, 4)
///     .order(["pt"])
///     .build()
///     .unwrap();
/// assert_eq!(table.names().collect::<Vec<_>>(), ["pt", "charge"]);
/// ```
#[derive(Debug, Default)]
pub struct ArrayTableBuilder {
    arrays: Vec<(String, Column)>,
    order: Option<Vec<String>>,
    config: TableConfig,
}

impl ArrayTableBuilder {
    /// An empty builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field that takes ownership of `values`.
    pub fn array(mut self, name: impl Into<String>, values: impl Into<Column>) -> Self {
        self.arrays.push((name.into(), values.into()));
        self
    }

    /// Add a field of `len` zero elements.
    pub fn zeroed(self, name: impl Into<String>, dtype: ElementType, len: usize) -> Self {
        self.array(name, Column::zeroed(dtype, len))
    }

    /// Preferred field order. Names not listed follow in lexicographic order.
    pub fn order<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the configuration.
    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration the table will be built with.
    pub fn current_config(&self) -> &TableConfig {
        &self.config
    }

    /// Validate everything and build the table. Nothing is built on error.
    pub fn build(self) -> Result<ArrayTable, TableError> {
        self.config.validate()?;
        if self.arrays.is_empty() {
            return Err(TableError::InvalidInput {
                reason: "a table needs at least one array".into(),
            });
        }
        if u32::try_from(self.arrays.len()).is_err() {
            return Err(TableError::InvalidInput {
                reason: format!("too many arrays ({})", self.arrays.len()),
            });
        }

        let mut seen: IndexMap<&str, ()> = IndexMap::with_capacity(self.arrays.len());
        for (name, _) in &self.arrays {
            validate_name(name)?;
            if seen.insert(name.as_str(), ()).is_some() {
                return Err(TableError::InvalidInput {
                    reason: format!("duplicate field name '{name}'"),
                });
            }
        }
        drop(seen);

        let names: Vec<String> = self.arrays.iter().map(|(n, _)| n.clone()).collect();
        let order = resolve_order(&names, self.order.as_deref(), self.config.order_policy)?;

        let mut pending: Vec<Option<(String, Column)>> =
            self.arrays.into_iter().map(Some).collect();
        let mut slots = Vec::with_capacity(order.len());
        let mut c_names = Vec::with_capacity(order.len());
        for (i, pos) in order.into_iter().enumerate() {
            let Some((name, column)) = pending[pos].take() else {
                return Err(TableError::InvalidInput {
                    reason: "field order visits an array twice".into(),
                });
            };
            c_names.push(c_name(&name)?);
            slots.push(FieldSlot::new(FieldIndex(i as u32), name, column));
        }
        // Slots are boxed before any lock address is taken, so the handles
        // written into the layout stay valid when the table itself moves.
        let slots: Box<[FieldSlot]> = slots.into_boxed_slice();
        let state_lock = Box::new(FieldLock::new());
        let layout = LayoutBlock::new(&slots, c_names, &state_lock);

        let by_name: IndexMap<String, FieldIndex> = slots
            .iter()
            .map(|s| (s.descriptor.name().to_owned(), s.descriptor.index()))
            .collect();

        debug!(
            fields = slots.len(),
            order = ?by_name.keys().collect::<Vec<_>>(),
            "array table built"
        );

        Ok(ArrayTable {
            slots,
            by_name,
            state_lock,
            layout,
            config: self.config,
        })
    }
}

fn validate_name(name: &str) -> Result<(), TableError> {
    if name.is_empty() {
        return Err(TableError::InvalidInput {
            reason: "field names must be non-empty".into(),
        });
    }
    Ok(())
}

fn c_name(name: &str) -> Result<CString, TableError> {
    CString::new(name).map_err(|_| TableError::InvalidInput {
        reason: format!("field name {name:?} contains a NUL byte"),
    })
}

// ── ArrayTable ─────────────────────────────────────────────────────

/// A fixed, ordered set of named numeric arrays with one reader-writer
/// lock per field and a lock-guarded state word.
///
/// The set of fields, their order, their element types and their lengths
/// never change after construction; only element values do, and only
/// through a field lock.
pub struct ArrayTable {
    slots: Box<[FieldSlot]>,
    by_name: IndexMap<String, FieldIndex>,
    state_lock: Box<FieldLock>,
    layout: LayoutBlock,
    config: TableConfig,
}

// SAFETY: every field is only reached through its FieldLock and the state
// word through the state lock. The layout block holds raw pointers into
// storage owned by this table and is immutable apart from the state word.
#[allow(unsafe_code)]
unsafe impl Send for ArrayTable {}
#[allow(unsafe_code)]
unsafe impl Sync for ArrayTable {}

impl ArrayTable {
    /// Start a builder.
    pub fn builder() -> ArrayTableBuilder {
        ArrayTableBuilder::new()
    }

    /// Build a table from `arrays` with an optional preferred `order`,
    /// using the default configuration.
    ///
    /// Fails with `InvalidInput` when `arrays` is empty or a name is empty,
    /// duplicated, or contains NUL. Unknown and repeated names in `order`
    /// are ignored.
    pub fn new<K, C>(
        order: Option<&[&str]>,
        arrays: impl IntoIterator<Item = (K, C)>,
    ) -> Result<Self, TableError>
    where
        K: Into<String>,
        C: Into<Column>,
    {
        let mut builder = arrays
            .into_iter()
            .fold(Self::builder(), |b, (name, values)| b.array(name, values));
        if let Some(order) = order {
            builder = builder.order(order.iter().copied());
        }
        builder.build()
    }

    /// Typed accessor for the field called `name`.
    ///
    /// Fails with `UnknownField` if there is no such field and with
    /// `TypeMismatch` if `T` is not the field's element type.
    pub fn accessor<T: Element>(&self, name: &str) -> Result<FieldAccessor<'_, T>, TableError> {
        FieldAccessor::new(self.slot(name)?)
    }

    /// The foreign layout record. Acquires no field lock.
    pub fn export_layout(&self) -> LayoutView<'_> {
        let view = LayoutView::new(self.layout.record());
        debug!(
            fields = self.slots.len(),
            address = ?view.as_ptr(),
            "foreign layout exported"
        );
        view
    }

    /// Consistent copy of every field.
    ///
    /// Holds every field lock in shared mode at once, acquired in ascending
    /// field index, so no writer interleaves with the copy.
    pub fn snapshot(&self) -> TableSnapshot {
        snapshot::capture(&self.slots)
    }

    /// The state signal, using the table's configured polling.
    #[allow(unsafe_code)]
    pub fn signal(&self) -> StateSignal<'_> {
        // SAFETY: the state word lives in the layout record owned by
        // `self` and is only accessed through `state_lock`, here and in the
        // foreign functions that take the record.
        unsafe {
            StateSignal::from_parts(&self.state_lock, self.layout.state_word(), self.config.signal)
        }
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    /// Field names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_name.keys().map(String::as_str)
    }

    /// Position of `name` in table order.
    pub fn index_of(&self, name: &str) -> Option<FieldIndex> {
        self.by_name.get(name).copied()
    }

    /// Descriptor of the field called `name`.
    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index_of(name)
            .map(|i| &self.slots[i.as_usize()].descriptor)
    }

    /// All descriptors in table order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.slots.iter().map(|s| &s.descriptor)
    }

    /// Lock guarding the field called `name`.
    ///
    /// For callers composing multi-field operations: locks of different
    /// fields must be taken in ascending field index.
    pub fn field_lock(&self, name: &str) -> Option<&FieldLock> {
        self.index_of(name).map(|i| &self.slots[i.as_usize()].lock)
    }

    /// The configuration the table was built with.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    fn slot(&self, name: &str) -> Result<&FieldSlot, TableError> {
        self.index_of(name)
            .map(|i| &self.slots[i.as_usize()])
            .ok_or_else(|| TableError::UnknownField {
                name: name.to_owned(),
            })
    }
}

impl fmt::Debug for ArrayTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayTable")
            .field("fields", &self.descriptors().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: ArrayTable can be shared across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ArrayTable>();
};
