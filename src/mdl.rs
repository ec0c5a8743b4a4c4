//! Two-part minimum description length scoring.
//!
//! `L = L_grammar + L_sequence` where
//! - every rule costs `2 * log2(V)` bits, `V` being the vocabulary size
//!   (terminals plus earlier rules) when the rule's operands were encoded;
//! - the top-level sequence is charged its zeroth-order entropy,
//!   `sum over positions of -log2(f(s) / N)`, which equals
//!   `N log2 N - sum over symbols of f log2 f`.
//!
//! The scorer keeps `N`, the symbol frequencies and `sum f log2 f` so a
//! candidate rule can be priced in O(1).
//!
//! Vocabulary and alphabet sizes below 2 are rounded up to 2 so that every
//! rule and every token costs at least one bit.

use crate::pair_index::Pair;
use crate::symbol::SymbolId;
use ahash::AHashMap as HashMap;
use serde::Serialize;

/// Gains smaller than this are treated as rounding noise.
const MIN_GAIN_BITS: f64 = 1e-9;

/// Bits needed to name one of `v` symbols.
#[inline]
pub(crate) fn symbol_bits(v: usize) -> f64 {
    (v.max(2) as f64).log2()
}

#[inline]
fn plogp(f: u64) -> f64 {
    if f == 0 {
        0.0
    } else {
        let f = f as f64;
        f * f.log2()
    }
}

/// Cost of encoding `original_len` tokens with a flat code over the input alphabet.
pub fn naive_bits(original_len: usize, alphabet: usize) -> f64 {
    original_len as f64 * symbol_bits(alphabet)
}

/// Breakdown of a description length in bits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionLength {
    pub grammar_bits: f64,
    pub sequence_bits: f64,
}

impl DescriptionLength {
    pub fn total_bits(&self) -> f64 {
        self.grammar_bits + self.sequence_bits
    }
}

/// Incremental scorer for one induction run.
#[derive(Debug, Clone)]
pub(crate) struct MdlScorer {
    terminal_count: usize,
    rule_count: usize,
    grammar_bits: f64,
    /// Current top-level sequence length (N)
    length: u64,
    frequencies: HashMap<SymbolId, u64>,
    /// Sum of f log2 f over `frequencies`
    weighted: f64,
}

/// The state a committed rule would leave behind.
#[derive(Debug, Clone, Copy)]
struct Projection {
    grammar_bits: f64,
    length: u64,
    weighted: f64,
}

impl Projection {
    fn cost(&self) -> DescriptionLength {
        DescriptionLength {
            grammar_bits: self.grammar_bits,
            sequence_bits: (plogp(self.length) - self.weighted).max(0.0),
        }
    }
}

impl MdlScorer {
    pub(crate) fn new(sequence: impl IntoIterator<Item = SymbolId>, terminal_count: usize) -> Self {
        let mut frequencies: HashMap<SymbolId, u64> = HashMap::default();
        let mut length = 0;
        for symbol in sequence {
            *frequencies.entry(symbol).or_insert(0) += 1;
            length += 1;
        }

        // Sum in symbol order so the result does not depend on hash order
        let mut counts: Vec<(SymbolId, u64)> = frequencies.iter().map(|(&s, &f)| (s, f)).collect();
        counts.sort_unstable();
        let weighted = counts.iter().map(|&(_, f)| plogp(f)).sum();

        Self {
            terminal_count,
            rule_count: 0,
            grammar_bits: 0.0,
            length,
            frequencies,
            weighted,
        }
    }

    pub(crate) fn current(&self) -> DescriptionLength {
        Projection {
            grammar_bits: self.grammar_bits,
            length: self.length,
            weighted: self.weighted,
        }
        .cost()
    }

    /// Cost of the next rule: two operands from the vocabulary defined so far.
    fn rule_bits(&self) -> f64 {
        2.0 * symbol_bits(self.terminal_count + self.rule_count)
    }

    fn frequency(&self, symbol: SymbolId) -> u64 {
        self.frequencies.get(&symbol).copied().unwrap_or(0)
    }

    fn project(&self, pair: Pair, replacements: u32) -> Projection {
        let m = u64::from(replacements);
        let mut weighted = self.weighted;

        if pair.left == pair.right {
            let f = self.frequency(pair.left);
            weighted += plogp(f - 2 * m) - plogp(f);
        } else {
            let fl = self.frequency(pair.left);
            let fr = self.frequency(pair.right);
            weighted += plogp(fl - m) - plogp(fl);
            weighted += plogp(fr - m) - plogp(fr);
        }
        weighted += plogp(m);

        Projection {
            grammar_bits: self.grammar_bits + self.rule_bits(),
            length: self.length - m,
            weighted,
        }
    }

    /// Description length after replacing `replacements` occurrences of `pair`
    /// with a new rule.
    pub(crate) fn propose(&self, pair: Pair, replacements: u32) -> DescriptionLength {
        self.project(pair, replacements).cost()
    }

    /// Returns true when `proposal` strictly lowers the current description length.
    pub(crate) fn improves(&self, proposal: &DescriptionLength) -> bool {
        proposal.total_bits() < self.current().total_bits() - MIN_GAIN_BITS
    }

    /// Records a committed rule. Must mirror the replacements actually made.
    pub(crate) fn commit(&mut self, pair: Pair, new_symbol: SymbolId, replacements: u32) {
        let projection = self.project(pair, replacements);
        let m = u64::from(replacements);

        for side in [pair.left, pair.right] {
            if let Some(f) = self.frequencies.get_mut(&side) {
                *f -= m;
                if *f == 0 {
                    self.frequencies.remove(&side);
                }
            }
        }
        if m > 0 {
            self.frequencies.insert(new_symbol, m);
        }

        self.grammar_bits = projection.grammar_bits;
        self.length = projection.length;
        self.weighted = projection.weighted;
        self.rule_count += 1;
    }
}

/// Zeroth-order entropy cost of a sequence, computed from scratch.
pub fn sequence_bits(sequence: &[SymbolId]) -> f64 {
    let mut frequencies: HashMap<SymbolId, u64> = HashMap::default();
    for &symbol in sequence {
        *frequencies.entry(symbol).or_insert(0) += 1;
    }
    let n = sequence.len() as f64;
    frequencies
        .values()
        .map(|&f| {
            let f = f as f64;
            -f * (f / n).log2()
        })
        .sum()
}

/// Grammar cost of `rule_count` rules over `terminal_count` terminals.
pub fn grammar_bits(terminal_count: usize, rule_count: usize) -> f64 {
    (0..rule_count)
        .map(|i| 2.0 * symbol_bits(terminal_count + i))
        .sum()
}
