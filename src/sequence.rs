//! Mutable top-level sequence with O(1) pair splicing.
//!
//! Nodes live in a [`SlotMap`] and are linked through explicit `prev`/`next`
//! keys. Replacing an occurrence of a pair rewrites the left node in place and
//! unlinks the right node, so no other node moves. Each node remembers the
//! original position of the first token it covers; that position is strictly
//! increasing along the list and gives occurrence handles a sequence order
//! without walking the list.

use crate::pair_index::Pair;
use crate::symbol::SymbolId;
use slotmap::{DefaultKey, SlotMap};

/// Handle of one node in the sequence arena.
pub(crate) type NodeKey = DefaultKey;

/// A node in the doubly-linked list of sequence symbols.
#[derive(Debug)]
pub(crate) struct SequenceNode {
    pub symbol: SymbolId,
    /// Original index of the first token this node expands to
    pub origin: usize,
    pub prev: Option<NodeKey>,
    pub next: Option<NodeKey>,
}

/// Adjacency changes caused by a single replacement.
///
/// `removed` lists the pairs that no longer exist; `added` lists the new
/// pairs together with the key of their left node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Splice {
    pub removed: [Option<Pair>; 3],
    pub added: [Option<(Pair, NodeKey)>; 2],
}

/// The current top-level symbol stream of one analysis.
#[derive(Debug, Default)]
pub(crate) struct Sequence {
    nodes: SlotMap<NodeKey, SequenceNode>,
    head: Option<NodeKey>,
    len: usize,
}

impl Sequence {
    /// Builds the sequence from already interned terminal ids, one node per token.
    pub(crate) fn initialize(symbols: &[SymbolId]) -> Self {
        let mut nodes = SlotMap::with_capacity(symbols.len());
        let mut head = None;
        let mut last: Option<NodeKey> = None;

        for (origin, &symbol) in symbols.iter().enumerate() {
            let key = nodes.insert(SequenceNode {
                symbol,
                origin,
                prev: last,
                next: None,
            });

            match last {
                Some(prev) => nodes[prev].next = Some(key),
                None => head = Some(key),
            }
            last = Some(key);
        }

        Self {
            nodes,
            head,
            len: symbols.len(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates the current symbols from left to right.
    pub(crate) fn symbols(&self) -> SequenceSymbols<'_> {
        SequenceSymbols {
            sequence: self,
            current: self.head,
        }
    }

    /// Iterates every adjacent pair along with the key of its left node.
    pub(crate) fn pairs(&self) -> impl Iterator<Item = (Pair, NodeKey)> + '_ {
        let mut current = self.head;
        std::iter::from_fn(move || loop {
            let key = current?;
            let node = &self.nodes[key];
            current = node.next;
            if let Some(next) = node.next {
                return Some((Pair::new(node.symbol, self.nodes[next].symbol), key));
            }
        })
    }

    /// Returns the right node key if `left` still starts an occurrence of `pair`.
    fn occurrence_at(&self, left: NodeKey, pair: Pair) -> Option<NodeKey> {
        let node = self.nodes.get(left)?;
        if node.symbol != pair.left {
            return None;
        }
        let right = node.next?;
        (self.nodes[right].symbol == pair.right).then_some(right)
    }

    /// Drops dead handles, then sorts and deduplicates the rest in sequence order.
    pub(crate) fn order_candidates(&self, candidates: &mut Vec<NodeKey>) {
        candidates.retain(|&key| self.nodes.contains_key(key));
        candidates.sort_by_key(|&key| self.nodes[key].origin);
        candidates.dedup();
    }

    /// Counts how many non-overlapping replacements `replace_occurrences`
    /// would make, without touching the sequence.
    ///
    /// `candidates` must already be in sequence order.
    pub(crate) fn count_replacements(&self, pair: Pair, candidates: &[NodeKey]) -> u32 {
        let mut count = 0;
        let mut consumed: Option<NodeKey> = None;

        for &left in candidates {
            if consumed == Some(left) {
                continue;
            }
            if let Some(right) = self.occurrence_at(left, pair) {
                count += 1;
                consumed = Some(right);
            }
        }

        count
    }

    /// Replaces every non-overlapping occurrence of `pair` among `candidates`
    /// with `new_symbol`, greedily from left to right.
    ///
    /// `candidates` must already be in sequence order; stale handles are
    /// skipped. `on_splice` is called once per replacement with the adjacency
    /// changes it caused. Returns the number of replacements.
    pub(crate) fn replace_occurrences<F>(
        &mut self,
        pair: Pair,
        new_symbol: SymbolId,
        candidates: &[NodeKey],
        mut on_splice: F,
    ) -> u32
    where
        F: FnMut(&Splice),
    {
        let mut count = 0;

        for &left in candidates {
            let Some(right) = self.occurrence_at(left, pair) else {
                continue;
            };

            let before = self.nodes[left].prev;
            let after = self.nodes[right].next;

            let removed = [
                before.map(|prev| Pair::new(self.nodes[prev].symbol, pair.left)),
                Some(pair),
                after.map(|next| Pair::new(pair.right, self.nodes[next].symbol)),
            ];

            // Rewrite the left node in place and unlink the right one
            self.nodes[left].symbol = new_symbol;
            self.nodes[left].next = after;
            if let Some(next) = after {
                self.nodes[next].prev = Some(left);
            }
            self.nodes.remove(right);
            self.len -= 1;

            let added = [
                before.map(|prev| (Pair::new(self.nodes[prev].symbol, new_symbol), prev)),
                after.map(|next| (Pair::new(new_symbol, self.nodes[next].symbol), left)),
            ];

            on_splice(&Splice { removed, added });
            count += 1;
        }

        count
    }
}

/// Left-to-right iterator over the symbols of a [`Sequence`].
pub(crate) struct SequenceSymbols<'a> {
    sequence: &'a Sequence,
    current: Option<NodeKey>,
}

impl Iterator for SequenceSymbols<'_> {
    type Item = SymbolId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.sequence.nodes[self.current?];
        self.current = node.next;
        Some(node.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<SymbolId> {
        raw.iter().map(|&r| SymbolId(r)).collect()
    }

    fn all_candidates(seq: &Sequence, pair: Pair) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = seq
            .pairs()
            .filter(|(p, _)| *p == pair)
            .map(|(_, key)| key)
            .collect();
        seq.order_candidates(&mut keys);
        keys
    }

    #[test]
    fn test_initialize_preserves_order() {
        let seq = Sequence::initialize(&ids(&[0, 1, 0, 2]));
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.symbols().collect::<Vec<_>>(), ids(&[0, 1, 0, 2]));
    }

    #[test]
    fn test_initialize_empty() {
        let seq = Sequence::initialize(&[]);
        assert!(seq.is_empty());
        assert_eq!(seq.symbols().count(), 0);
        assert_eq!(seq.pairs().count(), 0);
    }

    #[test]
    fn test_pairs() {
        let seq = Sequence::initialize(&ids(&[0, 1, 2]));
        let pairs: Vec<Pair> = seq.pairs().map(|(p, _)| p).collect();
        assert_eq!(
            pairs,
            vec![
                Pair::new(SymbolId(0), SymbolId(1)),
                Pair::new(SymbolId(1), SymbolId(2))
            ]
        );
    }

    #[test]
    fn test_replace_simple() {
        let mut seq = Sequence::initialize(&ids(&[0, 1, 0, 1, 2]));
        let pair = Pair::new(SymbolId(0), SymbolId(1));
        let candidates = all_candidates(&seq, pair);

        let mut splices = Vec::new();
        let count = seq.replace_occurrences(pair, SymbolId(3), &candidates, |s| {
            splices.push(s.clone())
        });

        assert_eq!(count, 2);
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.symbols().collect::<Vec<_>>(), ids(&[3, 3, 2]));

        // First splice: no predecessor, successor is the second `0`
        assert_eq!(splices[0].removed[0], None);
        assert_eq!(splices[0].removed[1], Some(pair));
        assert_eq!(
            splices[0].removed[2],
            Some(Pair::new(SymbolId(1), SymbolId(0)))
        );
        assert_eq!(
            splices[0].added[1].map(|(p, _)| p),
            Some(Pair::new(SymbolId(3), SymbolId(0)))
        );
    }

    #[test]
    fn test_replace_overlapping_run() {
        // a a a: two overlapping candidates, only one replacement
        let mut seq = Sequence::initialize(&ids(&[0, 0, 0]));
        let pair = Pair::new(SymbolId(0), SymbolId(0));
        let candidates = all_candidates(&seq, pair);
        assert_eq!(candidates.len(), 2);
        assert_eq!(seq.count_replacements(pair, &candidates), 1);

        let count = seq.replace_occurrences(pair, SymbolId(1), &candidates, |_| {});
        assert_eq!(count, 1);
        assert_eq!(seq.symbols().collect::<Vec<_>>(), ids(&[1, 0]));
    }

    #[test]
    fn test_replace_even_run() {
        let mut seq = Sequence::initialize(&ids(&[0, 0, 0, 0, 0]));
        let pair = Pair::new(SymbolId(0), SymbolId(0));
        let candidates = all_candidates(&seq, pair);
        assert_eq!(seq.count_replacements(pair, &candidates), 2);

        let count = seq.replace_occurrences(pair, SymbolId(1), &candidates, |_| {});
        assert_eq!(count, 2);
        assert_eq!(seq.symbols().collect::<Vec<_>>(), ids(&[1, 1, 0]));
    }

    #[test]
    fn test_stale_candidates_skipped() {
        let mut seq = Sequence::initialize(&ids(&[0, 1, 0, 1]));
        let pair = Pair::new(SymbolId(0), SymbolId(1));
        let candidates = all_candidates(&seq, pair);

        seq.replace_occurrences(pair, SymbolId(2), &candidates, |_| {});
        // Same handles again: every occurrence is gone
        let again = seq.replace_occurrences(pair, SymbolId(2), &candidates, |_| {});
        assert_eq!(again, 0);
        assert_eq!(seq.symbols().collect::<Vec<_>>(), ids(&[2, 2]));
    }

    #[test]
    fn test_order_candidates_sorts_and_drops_dead() {
        let mut seq = Sequence::initialize(&ids(&[0, 1, 0, 1]));
        let pair = Pair::new(SymbolId(0), SymbolId(1));
        let mut keys: Vec<NodeKey> = seq.pairs().map(|(_, k)| k).collect();
        keys.reverse();
        keys.push(keys[0]);

        let ordered = {
            let mut k = keys.clone();
            seq.order_candidates(&mut k);
            k
        };
        assert_eq!(ordered.len(), 3);

        seq.replace_occurrences(pair, SymbolId(2), &ordered, |_| {});
        seq.order_candidates(&mut keys);
        // Right nodes of both replacements were removed
        assert_eq!(keys.len(), 2);
    }
}
