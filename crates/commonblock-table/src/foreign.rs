//! Consumer-side reader for a [`ForeignLayout`] record.
//!
//! A context that was handed nothing but the record address uses
//! [`ForeignBlock`] to find fields by name, check their element type, and
//! read or write them through the exported lock handles. Nothing here calls
//! back into the owning [`ArrayTable`](crate::ArrayTable).

use std::fmt;
use std::marker::PhantomData;
use std::ops::RangeBounds;
use std::ptr::{self, NonNull};

use commonblock_core::{Element, ElementType, TableError};

use crate::accessor::{check_shape, resolve_range};
use crate::config::SignalConfig;
use crate::layout::{ForeignLayout, LayoutEntry, LayoutView};
use crate::lock::FieldLock;
use crate::signal::StateSignal;

/// A record address interpreted as a table.
#[derive(Clone, Copy, Debug)]
pub struct ForeignBlock<'a> {
    view: LayoutView<'a>,
}

impl<'a> ForeignBlock<'a> {
    /// Interpret `record` as a layout record.
    ///
    /// Fails with `InvalidInput` for a null address.
    ///
    /// # Safety
    ///
    /// A non-null `record` must point to a record produced by
    /// [`ArrayTable::export_layout`](crate::ArrayTable::export_layout) whose
    /// table outlives `'a`.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw(record: *const ForeignLayout) -> Result<Self, TableError> {
        let record = NonNull::new(record.cast_mut()).ok_or_else(|| TableError::InvalidInput {
            reason: "null layout record".into(),
        })?;
        Ok(Self {
            view: LayoutView::new(record),
        })
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.view.field_count()
    }

    /// Field names in record order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.view.entries().map(|e| e.name)
    }

    /// Position of `name` in the record.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.view.entries().position(|e| e.name == name)
    }

    /// Decoded entry `i`.
    pub fn entry(&self, i: usize) -> Option<LayoutEntry<'a>> {
        self.view.entry(i)
    }

    /// Typed accessor for the field called `name`.
    ///
    /// Checks the record's type tag against `T`: `UnknownField` if no entry
    /// has that name, `TypeMismatch` if the tag names another type,
    /// `InvalidInput` for an unrecognized tag or a misaligned data address,
    /// `LockFailure` for a null lock handle. For a `bool` field the bytes
    /// are checked on every read, not here; see [`ForeignAccessor`].
    pub fn accessor<T: Element>(&self, name: &str) -> Result<ForeignAccessor<'a, T>, TableError> {
        let entry = self
            .view
            .entries()
            .find(|e| e.name == name)
            .ok_or_else(|| TableError::UnknownField {
                name: name.to_owned(),
            })?;
        let found = ElementType::from_tag(entry.type_tag).ok_or_else(|| TableError::InvalidInput {
            reason: format!("field '{name}' has unrecognized type tag '{}'", entry.type_tag),
        })?;
        if found != T::DTYPE {
            return Err(TableError::TypeMismatch {
                field: name.to_owned(),
                expected: T::DTYPE,
                found,
            });
        }
        // SAFETY: lock handles in a live record point to the table's locks.
        #[allow(unsafe_code)]
        let lock = unsafe { FieldLock::from_handle(entry.lock) }.ok_or_else(|| {
            TableError::LockFailure {
                reason: format!("field '{name}' has a null lock handle"),
            }
        })?;
        let len = usize::try_from(entry.element_count).map_err(|_| TableError::InvalidInput {
            reason: format!("field '{name}' length does not fit in usize"),
        })?;
        let data = if len == 0 {
            NonNull::dangling()
        } else {
            NonNull::new(entry.data.cast::<T>())
                .filter(|p| p.as_ptr().is_aligned())
                .ok_or_else(|| TableError::InvalidInput {
                    reason: format!("field '{name}' has a null or misaligned data address"),
                })?
        };
        Ok(ForeignAccessor {
            name: entry.name,
            lock,
            data,
            len,
            _elem: PhantomData,
        })
    }

    /// The record's state signal, polled with `config`.
    #[allow(unsafe_code)]
    pub fn signal(&self, config: SignalConfig) -> Result<StateSignal<'a>, TableError> {
        config.validate()?;
        // SAFETY: the state lock handle of a live record points to the
        // table's state lock.
        let lock = unsafe { FieldLock::from_handle(self.view.state_lock_handle()) }.ok_or_else(
            || TableError::LockFailure {
                reason: "null state lock handle".into(),
            },
        )?;
        let record = self.view.as_ptr().cast_mut();
        // SAFETY: field address inside a live record; no reference is made.
        let word = unsafe { ptr::addr_of_mut!((*record).state) };
        let word = NonNull::new(word).ok_or_else(|| TableError::InvalidInput {
            reason: "null state word".into(),
        })?;
        // SAFETY: the state word is only touched under the state lock, by
        // every signal built over this record and by the owning table.
        Ok(unsafe { StateSignal::from_parts(lock, word, config) })
    }
}

/// Typed access to one field located through a layout record.
///
/// Same error contract as [`FieldAccessor`](crate::FieldAccessor); each call
/// takes the field lock through its exported handle for its own duration.
///
/// A `bool` field is foreign-writable memory that may hold bytes other than
/// 0 and 1. Reads check the bytes under the shared lock and fail with
/// `InvalidInput` instead of viewing such a byte as `bool`; writes first
/// rewrite every non-zero byte to 1 under the exclusive lock.
pub struct ForeignAccessor<'a, T: Element> {
    name: &'a str,
    lock: &'a FieldLock,
    data: NonNull<T>,
    len: usize,
    _elem: PhantomData<&'a [T]>,
}

// SAFETY: `data` is only dereferenced under `lock`, which is shared by
// every context that reaches this field.
#[allow(unsafe_code)]
unsafe impl<T: Element> Send for ForeignAccessor<'_, T> {}
#[allow(unsafe_code)]
unsafe impl<T: Element> Sync for ForeignAccessor<'_, T> {}

impl<T: Element> ForeignAccessor<'_, T> {
    /// Field name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the field has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element at `index` under a shared lock.
    pub fn get(&self, index: usize) -> Result<T, TableError> {
        let range = resolve_range(self.name, index..=index, self.len)?;
        self.with_read(|data| data[range.start])
    }

    /// Overwrite the element at `index` under the exclusive lock.
    pub fn set(&self, index: usize, value: T) -> Result<(), TableError> {
        let range = resolve_range(self.name, index..=index, self.len)?;
        self.with_write(|data| data[range.start] = value)
    }

    /// Copy out `range` under a shared lock.
    pub fn read(&self, range: impl RangeBounds<usize>) -> Result<Vec<T>, TableError> {
        let range = resolve_range(self.name, range, self.len)?;
        self.with_read(|data| data[range].to_vec())
    }

    /// Overwrite `range` with `values` under the exclusive lock.
    pub fn write(&self, range: impl RangeBounds<usize>, values: &[T]) -> Result<(), TableError> {
        let range = resolve_range(self.name, range, self.len)?;
        check_shape(self.name, &range, values.len())?;
        self.with_write(|data| data[range].copy_from_slice(values))
    }

    /// Run `f` over the whole field under a shared lock.
    ///
    /// Fails with `InvalidInput` if a `bool` field holds a byte other than
    /// 0 or 1.
    #[allow(unsafe_code)]
    pub fn with_read<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R, TableError> {
        let _guard = self.lock.read();
        if T::DTYPE == ElementType::Bool {
            // SAFETY: `len` initialized bytes owned by the table; the shared
            // lock excludes writers.
            let bytes = unsafe { std::slice::from_raw_parts(self.data.as_ptr().cast::<u8>(), self.len) };
            if let Some(at) = bytes.iter().position(|&b| b > 1) {
                return Err(TableError::InvalidInput {
                    reason: format!(
                        "bool field '{}' holds byte {} at index {at}",
                        self.name, bytes[at]
                    ),
                });
            }
        }
        // SAFETY: `data` addresses `len` initialized elements of `T` owned
        // by the table, each a valid `T` (checked above for `bool`); the
        // shared lock excludes writers.
        let data = unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) };
        Ok(f(data))
    }

    /// Run `f` over the whole field under the exclusive lock.
    ///
    /// A `bool` field has its non-zero bytes rewritten to 1 first.
    #[allow(unsafe_code)]
    pub fn with_write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R, TableError> {
        let _guard = self.lock.write();
        if T::DTYPE == ElementType::Bool {
            // SAFETY: `len` initialized bytes owned by the table; the
            // exclusive lock excludes every other holder.
            let bytes = unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr().cast::<u8>(), self.len) };
            for b in bytes.iter_mut() {
                *b = u8::from(*b != 0);
            }
        }
        // SAFETY: as in `with_read`; every element is a valid `T` and the
        // exclusive lock makes this the only live reference.
        let data = unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) };
        Ok(f(data))
    }
}

impl<T: Element> fmt::Debug for ForeignAccessor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignAccessor")
            .field("name", &self.name)
            .field("dtype", &T::DTYPE)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ArrayTable;

    fn table() -> ArrayTable {
        ArrayTable::builder()
            .array("a", vec![0.0f64; 3])
            .array("b", vec![1u64, 2])
            .array("z", Vec::<i32>::new())
            .build()
            .unwrap()
    }

    #[allow(unsafe_code)]
    fn block(t: &ArrayTable) -> ForeignBlock<'_> {
        // SAFETY: `t` outlives the block.
        unsafe { ForeignBlock::from_raw(t.export_layout().as_ptr()) }.unwrap()
    }

    #[test]
    #[allow(unsafe_code)]
    fn null_record_rejected() {
        // SAFETY: null is checked before any dereference.
        let err = unsafe { ForeignBlock::from_raw(ptr::null()) }.unwrap_err();
        assert!(matches!(err, TableError::InvalidInput { .. }));
    }

    #[test]
    fn names_follow_table_order() {
        let t = table();
        let b = block(&t);
        assert_eq!(b.field_count(), 3);
        assert_eq!(b.names().collect::<Vec<_>>(), ["a", "b", "z"]);
        assert_eq!(b.index_of("b"), Some(1));
        assert_eq!(b.index_of("q"), None);
    }

    #[test]
    fn writes_visible_to_owner() {
        let t = table();
        let b = block(&t);
        let a = b.accessor::<f64>("a").unwrap();
        a.write(.., &[1.0, 2.0, 3.0]).unwrap();
        a.set(0, 9.0).unwrap();
        assert_eq!(t.accessor::<f64>("a").unwrap().read(..).unwrap(), vec![9.0, 2.0, 3.0]);
    }

    #[test]
    fn owner_writes_visible_to_foreign() {
        let t = table();
        t.accessor::<u64>("b").unwrap().write(.., &[5, 6]).unwrap();
        let b = block(&t);
        assert_eq!(b.accessor::<u64>("b").unwrap().read(..).unwrap(), vec![5, 6]);
        assert_eq!(b.accessor::<u64>("b").unwrap().get(1), Ok(6));
    }

    #[test]
    fn foreign_errors() {
        let t = table();
        let b = block(&t);
        assert!(matches!(b.accessor::<f64>("nope"), Err(TableError::UnknownField { .. })));
        assert!(matches!(b.accessor::<f32>("a"), Err(TableError::TypeMismatch { .. })));
        let a = b.accessor::<f64>("a").unwrap();
        assert!(matches!(a.read(0..4), Err(TableError::IndexOutOfRange { .. })));
        assert!(matches!(a.write(0..1, &[]), Err(TableError::ShapeMismatch { .. })));
    }

    #[test]
    fn empty_field() {
        let t = table();
        let z = block(&t).accessor::<i32>("z").unwrap();
        assert!(z.is_empty());
        assert_eq!(z.read(..).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn foreign_lock_excludes_owner() {
        let t = table();
        let a = block(&t).accessor::<f64>("a").unwrap();
        a.with_write(|_| {
            let owner = t.accessor::<f64>("a").unwrap();
            assert!(matches!(owner.try_read(..), Err(TableError::LockFailure { .. })));
        })
        .unwrap();
    }

    #[test]
    #[allow(unsafe_code)]
    fn stray_bool_byte_rejected_then_repaired() {
        let t = ArrayTable::builder()
            .array("flag", vec![false, true, false])
            .build()
            .unwrap();
        let b = block(&t);
        let entry = b.entry(0).unwrap();
        let lock = t.field_lock("flag").unwrap();
        let guard = lock.write();
        // SAFETY: exclusive lock held; index 2 is within the field. This is
        // what a C writer storing 7 through the exported address does.
        unsafe { entry.data.cast::<u8>().add(2).write(7) };
        drop(guard);

        let flag = b.accessor::<bool>("flag").unwrap();
        assert!(matches!(flag.read(..), Err(TableError::InvalidInput { .. })));
        assert!(matches!(flag.get(0), Err(TableError::InvalidInput { .. })));

        flag.set(0, true).unwrap();
        assert_eq!(flag.read(..).unwrap(), vec![true, true, true]);
    }

    #[test]
    fn shared_state_word() {
        let t = table();
        let s = block(&t).signal(SignalConfig::default()).unwrap();
        s.notify(3);
        assert_eq!(t.signal().read(), 3);
        t.signal().notify(4);
        assert_eq!(s.read(), 4);
    }
}
