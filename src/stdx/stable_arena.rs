//! Append-only arena whose elements never move.
//!
//! Purpose: give dispatch values a storage address that survives every table
//! reconfiguration, so callers may keep per-key state behind a reference they
//! obtained earlier (hit counters, lazily resolved targets).
//!
//! Invariants:
//! - Chunk `k` holds exactly `first << k` elements once full and is allocated
//!   with at least that capacity up front, so it never reallocates.
//! - Element `i` lives in chunk `log2(i + first) - log2(first)`.
//! - Elements are never removed; `len` is monotonically non-decreasing.
//!
//! Complexity:
//! - `push`, `get`, `get_mut` are O(1); at most `log2(len)` chunk allocations.

/// Append-only, address-stable storage.
#[derive(Debug)]
pub struct StableArena<T> {
    chunks: Vec<Vec<T>>,
    len: usize,
    first_log: u32,
}

impl<T> StableArena<T> {
    /// Creates an empty arena whose first chunk holds `first_chunk` elements
    /// (rounded up to a power of two, minimum 1). Allocates lazily.
    pub fn with_first_chunk(first_chunk: usize) -> Self {
        let first = first_chunk.max(1).next_power_of_two();
        Self {
            chunks: Vec::new(),
            len: 0,
            first_log: first.trailing_zeros(),
        }
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when nothing has been pushed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn chunk_len(&self, chunk: usize) -> usize {
        1usize << (self.first_log as usize + chunk)
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, usize) {
        let biased = index + (1usize << self.first_log);
        let log = usize::BITS - 1 - biased.leading_zeros();
        let chunk = (log - self.first_log) as usize;
        (chunk, biased - (1usize << log))
    }

    /// Appends `value` and returns its index.
    pub fn push(&mut self, value: T) -> usize {
        let needs_chunk = match self.chunks.last() {
            None => true,
            Some(last) => last.len() == self.chunk_len(self.chunks.len() - 1),
        };
        if needs_chunk {
            let cap = self.chunk_len(self.chunks.len());
            self.chunks.push(Vec::with_capacity(cap));
        }
        let index = self.len;
        let last = self
            .chunks
            .last_mut()
            .unwrap_or_else(|| unreachable!("chunk allocated above"));
        debug_assert!(last.len() < last.capacity());
        last.push(value);
        self.len += 1;
        index
    }

    /// Returns the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    pub fn get(&self, index: usize) -> &T {
        assert!(index < self.len, "arena index out of bounds");
        let (chunk, offset) = self.locate(index);
        &self.chunks[chunk][offset]
    }

    /// Returns the element at `index` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        assert!(index < self.len, "arena index out of bounds");
        let (chunk, offset) = self.locate(index);
        &mut self.chunks[chunk][offset]
    }

    /// Iterates elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|c| c.iter())
    }

    /// Heap bytes reserved for elements and the chunk directory.
    pub fn memory_bytes(&self) -> usize {
        let elements: usize = self.chunks.iter().map(|c| c.capacity()).sum();
        elements * size_of::<T>() + self.chunks.capacity() * size_of::<Vec<T>>()
    }
}
