//! # sparse-sorted-index
//!
//! A sparse, sorted map from 32-bit ids to values.
//!
//! Ids are split into a 16-bit high word and a 16-bit low word. Distinct high words are kept
//! in one sorted vector; each high word owns a sorted group of `(low word, value)` pairs.
//! Ids that cluster by their high word (node ids of a graph partitioned into blocks, for
//! example) therefore share a single group and stay cheap to search and iterate.
//!
//! ## Example
//!
//! ```rust
//! use sparse_sorted_index::SparseSortedIndex;
//!
//! let mut index: SparseSortedIndex<&str> = SparseSortedIndex::new();
//! index.add(5, "a");
//! index.add(70000, "b");
//! index.add(6, "c");
//!
//! let entries: Vec<_> = index.entries().map(|(id, v)| (id, *v)).collect();
//! assert_eq!(entries, vec![(5, "a"), (6, "c"), (70000, "b")]);
//!
//! index.remove(6);
//! assert_eq!(index.size(), 2);
//! assert_eq!(index.get(6), "");
//! ```

mod error;

pub use error::{Error, Result};

use std::fmt;
use std::iter::FusedIterator;

use log::trace;

// =============================================================================
// Configuration
// =============================================================================

/// Bit position where the high word of an id starts.
pub const HIGH_SHIFT: u32 = 16;
/// Mask selecting the low word of an id. Must cover every bit below [`HIGH_SHIFT`].
pub const LOW_MASK: u32 = (1 << HIGH_SHIFT) - 1;

// =============================================================================
// Id utilities
// =============================================================================

#[inline]
pub fn high_word(id: u32) -> u16 {
    (id >> HIGH_SHIFT) as u16
}

#[inline]
pub fn low_word(id: u32) -> u16 {
    (id & LOW_MASK) as u16
}

/// Rebuild an id from its two halves.
#[inline]
pub fn join(high: u16, low: u16) -> u32 {
    (u32::from(high) << HIGH_SHIFT) | u32::from(low)
}

/// Split an id held in a wider signed integer, rejecting values outside `0..=u32::MAX`.
pub fn split_checked(raw: i64) -> Result<(u16, u16)> {
    let id = SparseId::try_from(raw)?;
    Ok((id.high(), id.low()))
}

/// A validated 32-bit id.
///
/// The index itself accepts plain `u32`s; this newtype exists for callers that receive ids
/// as wider integers and want the range check done once at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SparseId(u32);

impl SparseId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn from_parts(high: u16, low: u16) -> Self {
        Self(join(high, low))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn high(self) -> u16 {
        high_word(self.0)
    }

    #[inline]
    pub fn low(self) -> u16 {
        low_word(self.0)
    }
}

impl From<u32> for SparseId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<SparseId> for u32 {
    fn from(id: SparseId) -> Self {
        id.0
    }
}

impl TryFrom<i64> for SparseId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| Error::IdOutOfRange(raw))
    }
}

// =============================================================================
// Positions
// =============================================================================

/// A slot inside the two-level layout: `lows[group][offset]`.
///
/// Equality is field-wise, so two positions that differ in either coordinate are unequal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Position {
    group: usize,
    offset: usize,
}

impl Position {
    const BEGIN: Position = Position {
        group: 0,
        offset: 0,
    };
}

// =============================================================================
// SparseSortedIndex
// =============================================================================

/// A sorted map from `u32` ids to values, indexed by high word then low word.
///
/// Invariants:
/// - `highs` is strictly ascending and `highs.len() == lows.len()`
/// - every group in `lows` is non-empty and strictly ascending by low word
/// - `count` is the total number of `(low, value)` pairs across all groups
#[derive(Clone, PartialEq, Eq)]
pub struct SparseSortedIndex<V> {
    /// Distinct high words, ascending.
    highs: Vec<u16>,
    /// `lows[i]` holds the entries whose high word is `highs[i]`.
    lows: Vec<Vec<(u16, V)>>,
    count: usize,
}

impl<V> SparseSortedIndex<V> {
    pub fn new() -> Self {
        Self {
            highs: Vec::new(),
            lows: Vec::new(),
            count: 0,
        }
    }

    /// Create an index with room for `groups` distinct high words.
    pub fn with_capacity(groups: usize) -> Self {
        Self {
            highs: Vec::with_capacity(groups),
            lows: Vec::with_capacity(groups),
            count: 0,
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn size(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of distinct high words currently stored.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.highs.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.highs.capacity() * std::mem::size_of::<u16>()
            + self.lows.capacity() * std::mem::size_of::<Vec<(u16, V)>>()
            + self
                .lows
                .iter()
                .map(|group| group.capacity() * std::mem::size_of::<(u16, V)>())
                .sum::<usize>()
    }

    pub fn shrink_to_fit(&mut self) {
        self.highs.shrink_to_fit();
        self.lows.shrink_to_fit();
        for group in &mut self.lows {
            group.shrink_to_fit();
        }
    }

    /// Candidate slot for `id`: the first high word not below `high_word(id)`, and within
    /// that group the first low word not below `low_word(id)`.
    ///
    /// The result may point past the end of either level or at a different id.
    fn locate(&self, id: u32) -> Position {
        let high = high_word(id);
        let group = self.highs.partition_point(|&h| h < high);
        let offset = match self.lows.get(group) {
            Some(lows) => {
                let low = low_word(id);
                lows.partition_point(|&(l, _)| l < low)
            }
            None => 0,
        };
        Position { group, offset }
    }

    /// Slot holding exactly `id`, if any.
    fn find(&self, id: u32) -> Option<Position> {
        let pos = self.locate(id);
        let high = *self.highs.get(pos.group)?;
        let (low, _) = self.lows[pos.group].get(pos.offset)?;
        (join(high, *low) == id).then_some(pos)
    }

    #[inline]
    fn end(&self) -> Position {
        Position {
            group: self.highs.len(),
            offset: 0,
        }
    }

    pub fn has(&self, id: u32) -> bool {
        self.find(id).is_some()
    }

    pub fn get_ref(&self, id: u32) -> Option<&V> {
        let Position { group, offset } = self.find(id)?;
        Some(&self.lows[group][offset].1)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut V> {
        let Position { group, offset } = self.find(id)?;
        Some(&mut self.lows[group][offset].1)
    }

    /// Overwrite the value of an existing entry. Returns `false`, leaving the index
    /// untouched, when `id` is absent.
    pub fn set(&mut self, id: u32, value: V) -> bool {
        match self.get_mut(id) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Insert `id`, or overwrite its value if it is already present.
    ///
    /// Returns the previous value when the id existed.
    pub fn add(&mut self, id: u32, value: V) -> Option<V> {
        let Position { group, mut offset } = self.locate(id);
        let high = high_word(id);
        if self.highs.get(group) != Some(&high) {
            trace!("new group {:#06x} at slot {}", high, group);
            self.highs.insert(group, high);
            self.lows.insert(group, Vec::new());
            offset = 0;
        }

        let low = low_word(id);
        let lows = &mut self.lows[group];
        if lows.get(offset).map_or(false, |&(l, _)| l == low) {
            return Some(std::mem::replace(&mut lows[offset].1, value));
        }
        lows.insert(offset, (low, value));
        self.count += 1;
        None
    }

    /// Remove `id`, returning its value. Dropping the last entry of a group also drops the
    /// group and its high word.
    pub fn remove(&mut self, id: u32) -> Option<V> {
        let Position { group, offset } = self.find(id)?;
        let (_, value) = self.lows[group].remove(offset);
        self.count -= 1;

        if self.lows[group].is_empty() {
            trace!("dropping empty group {:#06x} at slot {}", self.highs[group], group);
            self.lows.remove(group);
            self.highs.remove(group);
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        trace!(
            "clearing {} entries in {} groups",
            self.count,
            self.highs.len()
        );
        self.highs.clear();
        self.lows.clear();
        self.count = 0;
    }

    /// Smallest entry by id.
    pub fn first(&self) -> Option<(u32, &V)> {
        let high = *self.highs.first()?;
        let (low, value) = self.lows.first()?.first()?;
        Some((join(high, *low), value))
    }

    /// Largest entry by id.
    pub fn last(&self) -> Option<(u32, &V)> {
        let high = *self.highs.last()?;
        let (low, value) = self.lows.last()?.last()?;
        Some((join(high, *low), value))
    }

    /// All entries in ascending id order.
    pub fn entries(&self) -> Entries<'_, V> {
        Entries::new(self)
    }

    pub fn keys(&self) -> Keys<'_, V> {
        Keys {
            inner: self.entries(),
        }
    }

    pub fn values(&self) -> Values<'_, V> {
        Values {
            inner: self.entries(),
        }
    }

    /// Mutable access to every value, in ascending id order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.lows
            .iter_mut()
            .flat_map(|group| group.iter_mut().map(|(_, value)| value))
    }
}

impl<V: Default + Clone> SparseSortedIndex<V> {
    /// Value stored for `id`, or `V::default()` when absent. Never inserts.
    pub fn get(&self, id: u32) -> V {
        self.get_ref(id).cloned().unwrap_or_default()
    }
}

impl<V: Default> SparseSortedIndex<V> {
    pub fn add_default(&mut self, id: u32) -> Option<V> {
        self.add(id, V::default())
    }
}

impl<V> Default for SparseSortedIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for SparseSortedIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

impl<'a, V> IntoIterator for &'a SparseSortedIndex<V> {
    type Item = (u32, &'a V);
    type IntoIter = Entries<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Ordered `(id, &value)` traversal. Ids are rebuilt from their two halves on the fly.
pub struct Entries<'a, V> {
    index: &'a SparseSortedIndex<V>,
    pos: Position,
    end: Position,
    remaining: usize,
}

impl<'a, V> Entries<'a, V> {
    fn new(index: &'a SparseSortedIndex<V>) -> Self {
        let mut entries = Self {
            index,
            pos: Position::BEGIN,
            end: index.end(),
            remaining: index.count,
        };
        entries.settle();
        entries
    }

    /// Move off exhausted groups until `pos` is a live slot or the end sentinel.
    fn settle(&mut self) {
        let lows = &self.index.lows;
        while self.pos.group < lows.len() && self.pos.offset >= lows[self.pos.group].len() {
            self.pos.group += 1;
            self.pos.offset = 0;
        }
    }
}

impl<'a, V> Iterator for Entries<'a, V> {
    type Item = (u32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.end {
            return None;
        }

        let index = self.index;
        let Position { group, offset } = self.pos;
        let (low, value) = &index.lows[group][offset];
        let item = (join(index.highs[group], *low), value);

        self.pos.offset += 1;
        self.settle();
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Entries<'_, V> {}

impl<V> FusedIterator for Entries<'_, V> {}

impl<V> Clone for Entries<'_, V> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            pos: self.pos,
            end: self.end,
            remaining: self.remaining,
        }
    }
}

pub struct Keys<'a, V> {
    inner: Entries<'a, V>,
}

impl<V> Iterator for Keys<'_, V> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.inner.next().map(|(id, _)| id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Keys<'_, V> {}

impl<V> FusedIterator for Keys<'_, V> {}

pub struct Values<'a, V> {
    inner: Entries<'a, V>,
}

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Values<'_, V> {}

impl<V> FusedIterator for Values<'_, V> {}
