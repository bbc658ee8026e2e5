/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{Move, Score, ZobristKey};

/// How the value stored in a [`TTableEntry`] bounds the true score.
///
/// See [CPW](https://www.chessprogramming.org/Node_Types) for more.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Bound {
    /// The search window never cut off; the value is exact.
    Exact,

    /// Every move failed low; the true score is at most this value.
    Upper,

    /// A beta cutoff occurred; the true score is at least this value.
    Lower,
}

/// A search result cached for one position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TTableEntry {
    /// Key of the position this entry describes.
    pub key: ZobristKey,

    /// Value found for the position, bounded per `flag`.
    pub value: Score,

    /// Remaining depth of the search that produced the value.
    pub depth: i32,

    /// Best move found, if any move raised alpha.
    pub best_move: Option<Move>,

    /// How `value` bounds the true score.
    pub flag: Bound,

    /// Entries surviving from an earlier deepening iteration are marked
    /// stale, making them first in line for replacement.
    pub stale: bool,
}

impl TTableEntry {
    /// Constructs a fresh (non-stale) entry.
    #[inline(always)]
    pub const fn new(
        key: ZobristKey,
        value: Score,
        depth: i32,
        best_move: Option<Move>,
        flag: Bound,
    ) -> Self {
        Self {
            key,
            value,
            depth,
            best_move,
            flag,
            stale: false,
        }
    }
}

/// A fixed-capacity transposition table keyed by Zobrist key.
///
/// Each key maps to exactly one bucket (`key mod (capacity + 1)`); two
/// different positions landing in the same bucket fight over it through the
/// replacement policy, and probe-time key comparison makes sure a reader
/// never mistakes one position's data for another's.
///
/// The table belongs to a single search thread; there is no locking.
#[derive(Debug, Clone)]
pub struct TTable {
    slots: Vec<Option<TTableEntry>>,
    used: usize,
}

impl TTable {
    /// Default capacity, sized for a single move request.
    pub const DEFAULT_CAPACITY: usize = 200_000;

    /// Create a new [`TTable`] holding up to `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity + 1],
            used: 0,
        }
    }

    /// Number of entries currently stored.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.used
    }

    /// Whether the table holds no entries.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Number of entries this table can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Map a key to its bucket.
    #[inline(always)]
    fn index(&self, key: ZobristKey) -> usize {
        (key.inner() % self.slots.len() as u64) as usize
    }

    /// Stores `entry`, subject to the replacement policy: an occupied
    /// bucket is overwritten iff the occupant is stale, was searched no
    /// deeper, or describes the same position.
    pub fn insert(&mut self, entry: TTableEntry) {
        let index = self.index(entry.key);

        match &self.slots[index] {
            None => {
                self.slots[index] = Some(entry);
                self.used += 1;
            }
            Some(occupant) => {
                if occupant.stale
                    || occupant.depth <= entry.depth
                    || occupant.key == entry.key
                {
                    self.slots[index] = Some(entry);
                }
            }
        }
    }

    /// Looks up the entry for `key`, if one is stored.
    ///
    /// A bucket holding a different position's data yields `None`, so
    /// index collisions are suppressed at read time.
    #[inline(always)]
    pub fn probe(&self, key: ZobristKey) -> Option<&TTableEntry> {
        self.slots[self.index(key)]
            .as_ref()
            .filter(|entry| entry.key == key)
    }

    /// Marks every stored entry stale, scheduling it for replacement.
    ///
    /// The search calls this between deepening iterations: the previous
    /// iteration's results keep seeding probes and move ordering, but they
    /// no longer hold their buckets against fresh entries.
    pub fn mark_stale(&mut self) {
        for entry in self.slots.iter_mut().flatten() {
            entry.stale = true;
        }
    }

    /// Empties the table. Invoked between move requests.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.used = 0;
    }
}

impl Default for TTable {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(value: u64) -> ZobristKey {
        let mut key = ZobristKey::default();
        key.hash(value);
        key
    }

    fn entry_of(key: u64, depth: i32) -> TTableEntry {
        TTableEntry::new(key_of(key), Score::new(42), depth, None, Bound::Exact)
    }

    #[test]
    fn test_probe_rejects_colliding_keys() {
        // Capacity 4 means buckets mod 5; keys 3 and 8 collide.
        let mut tt = TTable::with_capacity(4);
        tt.insert(entry_of(3, 4));

        assert!(tt.probe(key_of(3)).is_some());
        assert!(tt.probe(key_of(8)).is_none());
        assert_eq!(tt.len(), 1);
    }

    #[test]
    fn test_replacement_prefers_deeper_searches() {
        let mut tt = TTable::with_capacity(4);
        tt.insert(entry_of(3, 4));

        // A shallower different position does not displace the occupant.
        tt.insert(entry_of(8, 2));
        assert!(tt.probe(key_of(3)).is_some());
        assert!(tt.probe(key_of(8)).is_none());

        // A deeper one does.
        tt.insert(entry_of(8, 6));
        assert!(tt.probe(key_of(3)).is_none());
        assert!(tt.probe(key_of(8)).is_some());
    }

    #[test]
    fn test_same_position_always_updates() {
        let mut tt = TTable::with_capacity(4);
        tt.insert(entry_of(3, 6));

        // Same key, shallower depth: still replaced.
        let update = TTableEntry::new(key_of(3), Score::new(-7), 2, None, Bound::Lower);
        tt.insert(update);

        let stored = tt.probe(key_of(3)).unwrap();
        assert_eq!(stored.value, Score::new(-7));
        assert_eq!(stored.depth, 2);
        assert_eq!(stored.flag, Bound::Lower);
    }

    #[test]
    fn test_stale_entries_give_way() {
        let mut tt = TTable::with_capacity(4);
        tt.insert(entry_of(3, 9));
        tt.mark_stale();

        // Even a much shallower different position displaces a stale
        // occupant.
        tt.insert(entry_of(8, 1));
        assert!(tt.probe(key_of(8)).is_some());
        assert!(tt.probe(key_of(3)).is_none());
    }

    #[test]
    fn test_clear_empties_the_table() {
        let mut tt = TTable::with_capacity(4);
        tt.insert(entry_of(1, 1));
        tt.insert(entry_of(2, 1));
        assert_eq!(tt.len(), 2);

        tt.clear();
        assert!(tt.is_empty());
        assert!(tt.probe(key_of(1)).is_none());
    }
}
