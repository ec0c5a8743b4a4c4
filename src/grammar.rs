use crate::error::{EngineError, Result};
use crate::iter::ExpandIter;
use crate::symbol::{RuleId, Symbol, SymbolId, SymbolTable};
use serde::Serialize;

/// A binary production `id -> left right`.
///
/// `left` and `right` are symbol ids. In the serialized record they index the
/// `symbols` array, whose entries are `{"terminal": token}` or
/// `{"non_terminal": rule_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub left: SymbolId,
    pub right: SymbolId,
    /// Occurrences replaced when the rule was created
    pub usage_count: u32,
    /// References left at the end of the run, top sequence and right-hand sides
    pub references: u32,
}

/// The finished (or checkpointed) grammar of one analysis.
///
/// Rules are stored in creation order, so `rules[i].id == RuleId(i)`, and a
/// rule only ever references rules created before it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grammar {
    rules: Vec<Rule>,
    top_sequence: Vec<SymbolId>,
    symbols: SymbolTable,
    #[serde(skip)]
    original_len: usize,
}

impl Grammar {
    /// Assembles a grammar from rule operands in creation order.
    ///
    /// `productions` holds `(left, right, usage_count)` per rule.
    pub(crate) fn new(
        symbols: SymbolTable,
        productions: Vec<(SymbolId, SymbolId, u32)>,
        top_sequence: Vec<SymbolId>,
        original_len: usize,
    ) -> Self {
        let mut references = vec![0u32; productions.len()];
        let operands = productions.iter().flat_map(|&(left, right, _)| [left, right]);
        for symbol in top_sequence.iter().copied().chain(operands) {
            if let Some(rule) = symbols.rule_of(symbol) {
                references[rule.index()] += 1;
            }
        }

        let rules = (0u32..)
            .zip(productions.into_iter().zip(references))
            .map(|(i, ((left, right, usage_count), references))| Rule {
                id: RuleId(i),
                left,
                right,
                usage_count,
                references,
            })
            .collect();

        Self {
            rules,
            top_sequence,
            symbols,
            original_len,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    pub fn top_sequence(&self) -> &[SymbolId] {
        &self.top_sequence
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Number of tokens in the input this grammar was induced from.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn resolve(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    /// The two operand symbols of a rule.
    pub fn operands(&self, id: RuleId) -> Option<(&Symbol, &Symbol)> {
        let rule = self.rule(id)?;
        Some((self.resolve(rule.left)?, self.resolve(rule.right)?))
    }

    /// Iterates the terminals the whole grammar expands to.
    pub fn expand(&self) -> ExpandIter<'_> {
        ExpandIter::new(self, &self.top_sequence)
    }

    /// Iterates the terminals a single symbol expands to.
    pub fn expand_symbol(&self, id: SymbolId) -> ExpandIter<'_> {
        ExpandIter::from_symbol(self, id)
    }

    /// Rebuilds the original token list.
    pub fn reconstruct(&self) -> Vec<&str> {
        self.expand().collect()
    }

    /// Expansion length of every rule, indexed by rule id.
    pub fn expansion_lengths(&self) -> Vec<u64> {
        let mut lengths: Vec<u64> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let len = [rule.left, rule.right]
                .iter()
                .map(|&s| match self.symbols.rule_of(s) {
                    Some(r) => lengths.get(r.index()).copied().unwrap_or(0),
                    None => 1,
                })
                .sum();
            lengths.push(len);
        }
        lengths
    }

    /// Fraction of original tokens covered by a rule in the top sequence.
    pub fn coverage(&self) -> f64 {
        if self.original_len == 0 {
            return 0.0;
        }
        let lengths = self.expansion_lengths();
        let covered: u64 = self
            .top_sequence
            .iter()
            .filter_map(|&s| self.symbols.rule_of(s))
            .map(|r| lengths[r.index()])
            .sum();
        covered as f64 / self.original_len as f64
    }

    /// Checks that every reference resolves and that rules only reference
    /// earlier rules, which rules out cycles.
    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.id.index() != i {
                return Err(EngineError::MalformedGrammar(format!(
                    "rule at index {} has id {}",
                    i, rule.id
                )));
            }
            for operand in [rule.left, rule.right] {
                match self.resolve(operand) {
                    None => {
                        return Err(EngineError::MalformedGrammar(format!(
                            "{} references unknown symbol {}",
                            rule.id, operand
                        )))
                    }
                    Some(Symbol::NonTerminal(target)) if *target >= rule.id => {
                        return Err(EngineError::MalformedGrammar(format!(
                            "{} references {} which is not older",
                            rule.id, target
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        for &symbol in &self.top_sequence {
            match self.resolve(symbol) {
                None => {
                    return Err(EngineError::MalformedGrammar(format!(
                        "top sequence references unknown symbol {}",
                        symbol
                    )))
                }
                Some(Symbol::NonTerminal(target)) if self.rule(*target).is_none() => {
                    return Err(EngineError::MalformedGrammar(format!(
                        "top sequence references undefined {}",
                        target
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
