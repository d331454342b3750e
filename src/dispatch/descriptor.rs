//! One concrete table configuration of a dispatch cache.
//!
//! Purpose: map a [`DispatchKey`] to its slot in O(1) expected time under a
//! fixed `(log_size, shifts)` layout.
//!
//! Invariants and safety rules:
//! - `1 <= N <= 4` (checked at compile time).
//! - The table holds `2^log_size` slots; a slot is free iff its key is
//!   [`DispatchKey::EMPTY`].
//! - At most one slot holds a given key.
//! - Right-place invariant: every live key sits at its home index, or its home
//!   index holds another live key. A key whose home slot is free is absent.
//! - The layout never changes after construction; reconfiguration builds a new
//!   descriptor and migrates into it.
//! - Slots are never freed.
//!
//! High-level algorithm (`lookup_or_repair`):
//! 1. Compute the home index: shift each key word by its position's shift,
//!    interleave the shifted words, mask to the table size.
//! 2. Home holds the key: hit. Home is free: claim it.
//! 3. Otherwise scan the table once, looking for the key (displaced by an
//!    earlier conflict) and for the first free slot. Swap whichever is found
//!    into the home index. With neither, report `NoRoom`.
//!
//! Claiming a slot asks the caller for the new key's handle first and writes
//! the slot afterwards, so a caller that unwinds while producing the handle
//! leaves the table untouched.
//!
//! Design choices:
//! - Slots store an arena handle instead of the value, so migrating between
//!   descriptors moves 8-40 bytes per key and never moves a value.
//! - The most recently requested key wins its home slot, which keeps the hot
//!   key on the one-probe path.

use crate::api::{DispatchKey, MAX_ARITY};
use crate::stdx::bits::low_mask;
#[cfg(not(feature = "interleave-tables"))]
use crate::stdx::interleave::{interleave_2, interleave_3, interleave_4};
#[cfg(feature = "interleave-tables")]
use crate::stdx::interleave::{
    interleave_2_table as interleave_2, interleave_3_table as interleave_3,
    interleave_4_table as interleave_4,
};

/// Folds the per-position shifted words of a key into one index.
pub type Combiner = fn(&[usize]) -> usize;

fn combine_unsupported(_: &[usize]) -> usize {
    unreachable!("dispatch key arity must be 1..=4")
}

#[inline(always)]
fn combine_1(words: &[usize]) -> usize {
    words[0]
}

#[inline(always)]
fn combine_2(words: &[usize]) -> usize {
    interleave_2(words[0] as u32, words[1] as u32) as usize
}

#[inline(always)]
fn combine_3(words: &[usize]) -> usize {
    interleave_3(words[0] as u32, words[1] as u32, words[2] as u32) as usize
}

#[inline(always)]
fn combine_4(words: &[usize]) -> usize {
    interleave_4(
        words[0] as u16,
        words[1] as u16,
        words[2] as u16,
        words[3] as u16,
    ) as usize
}

/// Index combiners by arity.
pub const COMBINERS: [Combiner; MAX_ARITY + 1] =
    [combine_unsupported, combine_1, combine_2, combine_3, combine_4];

/// Hashing parameters of a table: size and one shift per key position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableLayout<const N: usize> {
    /// `log2` of the slot count.
    pub log_size: u32,
    /// Right shift applied to each key word before interleaving.
    pub shifts: [u32; N],
}

impl<const N: usize> TableLayout<N> {
    const COMBINE: Combiner = {
        assert!(N >= 1 && N <= MAX_ARITY, "dispatch key arity must be 1..=4");
        COMBINERS[N]
    };

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        1usize << self.log_size
    }

    /// `capacity - 1`.
    #[inline]
    pub fn mask(&self) -> usize {
        low_mask(self.log_size)
    }

    /// Home index of `key` under this layout.
    #[inline]
    pub fn index(&self, key: &DispatchKey<N>) -> usize {
        let words = key.words();
        let mut shifted = [0usize; N];
        for i in 0..N {
            shifted[i] = words[i] >> self.shifts[i];
        }
        (Self::COMBINE)(&shifted) & self.mask()
    }
}

/// A table entry: key plus a handle into the owning cache's value arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot<const N: usize> {
    /// Occupying key, or [`DispatchKey::EMPTY`].
    pub key: DispatchKey<N>,
    /// Value handle; meaningless while the slot is free.
    pub handle: u32,
}

impl<const N: usize> Slot<N> {
    const FREE: Self = Self {
        key: DispatchKey::EMPTY,
        handle: 0,
    };

    #[inline]
    fn is_free(&self) -> bool {
        self.key.is_empty()
    }
}

/// Outcome of [`CacheDescriptor::lookup_or_repair`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The key was at its home index.
    Hit {
        /// Home index.
        slot: usize,
        /// Stored value handle.
        handle: u32,
    },
    /// The key was resident but displaced; it has been swapped home.
    Repaired {
        /// Home index the key now occupies.
        slot: usize,
        /// Stored value handle.
        handle: u32,
        /// The slot's previous occupant was itself at home and is now
        /// displaced.
        conflict: bool,
    },
    /// The key was absent and now occupies its home index with the handle
    /// returned by the caller's claim.
    Inserted {
        /// Home index.
        slot: usize,
        /// Handle stored for the key.
        handle: u32,
        /// See [`Lookup::Repaired::conflict`].
        conflict: bool,
    },
    /// The key is absent and every slot is taken.
    NoRoom,
}

/// Fixed-layout open-addressing table of dispatch keys.
#[derive(Debug)]
pub struct CacheDescriptor<const N: usize> {
    layout: TableLayout<N>,
    slots: Box<[Slot<N>]>,
    occupied: usize,
}

impl<const N: usize> CacheDescriptor<N> {
    /// Allocates an empty table for `layout`.
    pub fn new(layout: TableLayout<N>) -> Self {
        Self {
            layout,
            slots: vec![Slot::FREE; layout.capacity()].into_boxed_slice(),
            occupied: 0,
        }
    }

    /// Hashing parameters of this table.
    #[inline]
    pub fn layout(&self) -> TableLayout<N> {
        self.layout
    }

    /// `log2` of the slot count.
    #[inline]
    pub fn log_size(&self) -> u32 {
        self.layout.log_size
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live keys.
    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Heap bytes used by the slot array.
    #[inline]
    pub fn memory_bytes(&self) -> usize {
        self.slots.len() * size_of::<Slot<N>>()
    }

    /// Home index of `key`.
    #[inline]
    pub fn index(&self, key: &DispatchKey<N>) -> usize {
        self.layout.index(key)
    }

    /// Returns the slot at `index`.
    #[inline]
    pub fn slot(&self, index: usize) -> &Slot<N> {
        &self.slots[index]
    }

    /// Iterates live slots in table order.
    pub fn live_slots(&self) -> impl Iterator<Item = &Slot<N>> + '_ {
        self.slots.iter().filter(|s| !s.is_free())
    }

    /// Iterates live keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = DispatchKey<N>> + '_ {
        self.live_slots().map(|s| s.key)
    }

    /// Number of live keys not at their home index.
    pub fn displaced(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, s)| !s.is_free() && self.index(&s.key) != *i)
            .count()
    }

    #[inline]
    fn is_home(&self, index: usize) -> bool {
        let slot = &self.slots[index];
        !slot.is_free() && self.index(&slot.key) == index
    }

    /// Finds the slot holding `key` without modifying the table.
    pub fn find(&self, key: &DispatchKey<N>) -> Option<usize> {
        let home = self.index(key);
        let occupant = &self.slots[home];
        if occupant.key == *key {
            return Some(home);
        }
        if occupant.is_free() {
            return None;
        }
        self.slots.iter().position(|s| s.key == *key)
    }

    /// Looks up `key`, repairing its position or inserting it as needed.
    ///
    /// `claim` runs only when the key is absent and a free slot exists; its
    /// return value is stored as the key's handle. The table never overwrites
    /// a live key and never grows; a full table yields [`Lookup::NoRoom`]
    /// without calling `claim`.
    #[inline]
    pub fn lookup_or_repair<F>(&mut self, key: &DispatchKey<N>, claim: F) -> Lookup
    where
        F: FnOnce() -> u32,
    {
        debug_assert!(!key.is_empty(), "the empty key is never looked up");
        let home = self.index(key);
        let occupant = self.slots[home];
        if occupant.key == *key {
            return Lookup::Hit {
                slot: home,
                handle: occupant.handle,
            };
        }
        if occupant.is_free() {
            let handle = claim();
            self.slots[home] = Slot { key: *key, handle };
            self.occupied += 1;
            return Lookup::Inserted {
                slot: home,
                handle,
                conflict: false,
            };
        }
        self.lookup_displaced(key, home, claim)
    }

    #[cold]
    fn lookup_displaced<F>(&mut self, key: &DispatchKey<N>, home: usize, claim: F) -> Lookup
    where
        F: FnOnce() -> u32,
    {
        let conflict = self.is_home(home);

        let mut resident = None;
        let mut first_free = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.key == *key {
                resident = Some(i);
                break;
            }
            if first_free.is_none() && slot.is_free() {
                first_free = Some(i);
            }
        }

        if let Some(at) = resident {
            let handle = self.slots[at].handle;
            self.slots.swap(home, at);
            return Lookup::Repaired {
                slot: home,
                handle,
                conflict,
            };
        }

        let Some(free) = first_free else {
            return Lookup::NoRoom;
        };
        let handle = claim();
        self.slots[free] = Slot { key: *key, handle };
        self.slots.swap(home, free);
        self.occupied += 1;
        Lookup::Inserted {
            slot: home,
            handle,
            conflict,
        }
    }

    /// Moves displaced keys home wherever that does not evict a key that is
    /// already home.
    ///
    /// Each move raises the number of keys at home by at least one, so the
    /// loop runs at most `occupied + 1` passes.
    pub fn restore_invariant(&mut self) {
        loop {
            let mut moved = false;
            for i in 0..self.slots.len() {
                let slot = self.slots[i];
                if slot.is_free() {
                    continue;
                }
                let home = self.index(&slot.key);
                if home != i && !self.is_home(home) {
                    self.slots.swap(i, home);
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }

    /// Copies every live slot of `old` into this (empty) table, keeping value
    /// handles, then restores the right-place invariant.
    ///
    /// # Panics
    ///
    /// Panics if this table is not empty or cannot hold `old`'s keys.
    pub fn migrate_from(&mut self, old: &CacheDescriptor<N>) {
        assert_eq!(0, self.occupied, "migration target must be empty");
        assert!(
            old.occupied <= self.capacity(),
            "migration target too small: {} keys into {} slots",
            old.occupied,
            self.capacity()
        );

        let mut overflow = Vec::new();
        for slot in old.live_slots() {
            let home = self.index(&slot.key);
            if self.slots[home].is_free() {
                self.slots[home] = *slot;
            } else {
                overflow.push(*slot);
            }
        }

        let mut cursor = 0;
        for slot in overflow {
            while !self.slots[cursor].is_free() {
                cursor += 1;
            }
            self.slots[cursor] = slot;
        }
        self.occupied = old.occupied;

        self.restore_invariant();
    }

    /// Verifies key uniqueness, the occupancy count, and the right-place
    /// invariant.
    ///
    /// # Panics
    ///
    /// Panics on the first violation found. O(capacity^2).
    pub fn check_invariants(&self) {
        let mut live = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.is_free() {
                continue;
            }
            live += 1;
            assert!(
                slot.key.words().iter().all(|&w| w != 0),
                "slot {i} holds a partially empty key"
            );
            let home = self.index(&slot.key);
            if home != i {
                assert!(
                    !self.slots[home].is_free(),
                    "slot {i} is displaced but its home {home} is free"
                );
            }
            let duplicates = self.slots.iter().filter(|s| s.key == slot.key).count();
            assert_eq!(1, duplicates, "key {:x?} stored more than once", slot.key);
        }
        assert_eq!(self.occupied, live, "occupied count out of sync");
    }
}
