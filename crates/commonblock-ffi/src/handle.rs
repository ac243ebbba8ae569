//! Opaque `u64` handles for builders and tables handed to C.
//!
//! A handle packs a slot index (upper 32 bits) and that slot's generation
//! (lower 32 bits). Removing a value bumps the generation, so a handle kept
//! after `cb_*_destroy` resolves to nothing instead of to whatever reuses
//! the slot. Destroying twice is a harmless `None`.

fn pack(slot: u32, generation: u32) -> u64 {
    (u64::from(slot) << 32) | u64::from(generation)
}

fn unpack(handle: u64) -> (usize, u32) {
    ((handle >> 32) as usize, handle as u32)
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Values owned on behalf of C callers, addressed by generation-checked
/// handles.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
}

impl<T> HandleTable<T> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Store `value`, reusing a vacant slot when one exists.
    pub(crate) fn insert(&mut self, value: T) -> u64 {
        match self.vacant.pop() {
            Some(slot) => {
                let entry = &mut self.entries[slot as usize];
                entry.value = Some(value);
                pack(slot, entry.generation)
            }
            None => {
                let slot = self.entries.len() as u32;
                self.entries.push(Entry {
                    generation: 0,
                    value: Some(value),
                });
                pack(slot, 0)
            }
        }
    }

    fn live(&self, handle: u64) -> Option<&Entry<T>> {
        let (slot, generation) = unpack(handle);
        self.entries
            .get(slot)
            .filter(|e| e.generation == generation)
    }

    pub(crate) fn get(&self, handle: u64) -> Option<&T> {
        self.live(handle)?.value.as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        let (slot, generation) = unpack(handle);
        self.entries
            .get_mut(slot)
            .filter(|e| e.generation == generation)?
            .value
            .as_mut()
    }

    /// Take the value out and invalidate `handle`.
    ///
    /// A slot whose generation wraps to zero is retired rather than reused,
    /// so no stale handle from its first use can match again.
    pub(crate) fn remove(&mut self, handle: u64) -> Option<T> {
        let (slot, generation) = unpack(handle);
        let entry = self
            .entries
            .get_mut(slot)
            .filter(|e| e.generation == generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        if entry.generation != 0 {
            self.vacant.push(slot as u32);
        }
        Some(value)
    }

    /// Number of live values.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_then_get() {
        let mut t = HandleTable::new();
        let h = t.insert("a");
        assert_eq!(t.get(h), Some(&"a"));
        *t.get_mut(h).unwrap() = "b";
        assert_eq!(t.get(h), Some(&"b"));
    }

    #[test]
    fn removed_handle_is_stale() {
        let mut t = HandleTable::new();
        let h = t.insert(1u8);
        assert_eq!(t.remove(h), Some(1));
        assert_eq!(t.get(h), None);
        assert_eq!(t.get_mut(h), None);
        assert_eq!(t.remove(h), None);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut t = HandleTable::new();
        let h1 = t.insert(1u8);
        t.remove(h1);
        let h2 = t.insert(2u8);
        assert_eq!(unpack(h1).0, unpack(h2).0);
        assert_eq!(unpack(h2).1, unpack(h1).1 + 1);
        assert_eq!(t.get(h1), None);
        assert_eq!(t.get(h2), Some(&2));
    }

    #[test]
    fn never_issued_handle_is_none() {
        let t: HandleTable<u8> = HandleTable::new();
        assert_eq!(t.get(pack(12, 0)), None);
    }

    #[test]
    fn wrapped_generation_retires_slot() {
        let mut t = HandleTable::new();
        let h = t.insert(0u8);
        t.remove(h);
        t.entries[0].generation = u32::MAX;
        let last = t.insert(1u8);
        assert_eq!(unpack(last), (0, u32::MAX));
        t.remove(last);
        assert!(!t.vacant.contains(&0));
        assert_eq!(t.get(pack(0, 0)), None);
        let fresh = t.insert(2u8);
        assert_ne!(unpack(fresh).0, 0);
    }

    proptest! {
        #[test]
        fn live_count_tracks_inserts_and_removes(ops in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut t = HandleTable::new();
            let mut live: Vec<u64> = Vec::new();
            for insert in ops {
                if insert || live.is_empty() {
                    live.push(t.insert(()));
                } else {
                    let h = live.swap_remove(0);
                    prop_assert!(t.remove(h).is_some());
                    prop_assert!(t.get(h).is_none());
                }
                prop_assert_eq!(t.len(), live.len());
            }
            for h in live {
                prop_assert!(t.get(h).is_some());
            }
        }
    }
}
