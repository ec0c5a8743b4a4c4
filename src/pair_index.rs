//! Incremental digram frequency index.
//!
//! Counts every adjacent pair of the current sequence and keeps a max-heap of
//! `(count, pair)` records. Records are never updated in place: every count
//! change pushes a fresh record and outdated ones are dropped when they reach
//! the top of the heap.

use crate::sequence::{NodeKey, Sequence, Splice};
use crate::symbol::SymbolId;
use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::trace;

/// An ordered pair of adjacent symbols.
///
/// Ordering is lexicographic on `(left, right)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Pair {
    pub left: SymbolId,
    pub right: SymbolId,
}

impl Pair {
    pub fn new(left: SymbolId, right: SymbolId) -> Self {
        Self { left, right }
    }
}

/// A pair with the frequency it had when the record was pushed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct PairRecord {
    frequency: u32,
    pair: Pair,
}

impl Ord for PairRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher frequency first, then the lexicographically smallest pair
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| other.pair.cmp(&self.pair))
    }
}

impl PartialOrd for PairRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct PairEntry {
    count: u32,
    /// Left-node handles of occurrences; may contain stale handles
    occurrences: Vec<NodeKey>,
}

#[derive(Debug, Default)]
pub(crate) struct PairIndex {
    entries: HashMap<Pair, PairEntry>,
    queue: BinaryHeap<PairRecord>,
}

impl PairIndex {
    /// Counts every adjacent pair of `sequence` in one pass.
    pub(crate) fn build(sequence: &Sequence) -> Self {
        let mut entries: HashMap<Pair, PairEntry> = HashMap::default();
        for (pair, key) in sequence.pairs() {
            let entry = entries.entry(pair).or_default();
            entry.count += 1;
            entry.occurrences.push(key);
        }

        let queue = entries
            .iter()
            .filter(|(_, entry)| entry.count >= 2)
            .map(|(&pair, entry)| PairRecord {
                frequency: entry.count,
                pair,
            })
            .collect();

        Self { entries, queue }
    }

    /// Current occurrence count of `pair`, overlapping occurrences included.
    pub(crate) fn count(&self, pair: Pair) -> u32 {
        self.entries.get(&pair).map_or(0, |entry| entry.count)
    }

    /// Number of distinct pairs currently present.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the most frequent pair occurring at least twice.
    ///
    /// Ties go to the pair with the smallest `(left, right)` ids.
    pub(crate) fn most_frequent(&mut self) -> Option<(Pair, u32)> {
        while let Some(&top) = self.queue.peek() {
            if self.count(top.pair) == top.frequency {
                return Some((top.pair, top.frequency));
            }
            trace!(
                left = top.pair.left.as_u32(),
                right = top.pair.right.as_u32(),
                frequency = top.frequency,
                "dropping stale pair record"
            );
            self.queue.pop();
        }
        None
    }

    /// Recorded occurrence handles of `pair`, possibly stale and unordered.
    ///
    /// The entry disappears once every occurrence has been spliced away.
    pub(crate) fn occurrences(&self, pair: Pair) -> &[NodeKey] {
        self.entries
            .get(&pair)
            .map(|entry| entry.occurrences.as_slice())
            .unwrap_or(&[])
    }

    /// Applies the adjacency changes of one replacement.
    pub(crate) fn on_splice(&mut self, splice: &Splice) {
        for &pair in splice.removed.iter().flatten() {
            self.decrement(pair);
        }
        for &(pair, key) in splice.added.iter().flatten() {
            self.increment(pair, key);
        }
    }

    fn increment(&mut self, pair: Pair, key: NodeKey) {
        let entry = self.entries.entry(pair).or_default();
        entry.count += 1;
        entry.occurrences.push(key);

        if entry.count >= 2 {
            self.queue.push(PairRecord {
                frequency: entry.count,
                pair,
            });
        }
    }

    fn decrement(&mut self, pair: Pair) {
        let Some(entry) = self.entries.get_mut(&pair) else {
            debug_assert!(false, "decrementing a pair that is not indexed");
            return;
        };

        entry.count -= 1;
        match entry.count {
            0 => {
                self.entries.remove(&pair);
            }
            1 => {}
            frequency => self.queue.push(PairRecord { frequency, pair }),
        }
    }
}
