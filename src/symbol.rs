use crate::error::{EngineError, Result};
use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::fmt;

/// Narrows a table index to a 32-bit id.
fn dense_id(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| EngineError::InvalidInput {
        position: index,
        reason: format!("more than {} distinct symbols", u32::MAX),
    })
}

/// Dense identifier of a symbol in the [`SymbolTable`].
///
/// Terminals are numbered first, in order of first appearance in the input;
/// nonterminals follow in rule-creation order. Pair tie-breaking relies on
/// this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an induced rule. Rule ids start at 0 and only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A grammar symbol: either an input token or a reference to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Terminal(String),
    NonTerminal(RuleId),
}

impl Symbol {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn as_terminal(&self) -> Option<&str> {
        match self {
            Symbol::Terminal(token) => Some(token),
            Symbol::NonTerminal(_) => None,
        }
    }

    pub fn as_rule(&self) -> Option<RuleId> {
        match self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal(rule) => Some(*rule),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(token) => f.write_str(token),
            Symbol::NonTerminal(rule) => write!(f, "{}", rule),
        }
    }
}

/// Append-only table of every symbol created during one analysis.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SymbolTable {
    /// Symbols indexed by `SymbolId`
    symbols: Vec<Symbol>,

    /// Deduplicates terminal tokens
    #[serde(skip)]
    terminal_index: HashMap<String, SymbolId>,

    /// Maps rule ids to their nonterminal symbol
    #[serde(skip)]
    rule_symbols: Vec<SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets or creates the id of a terminal token.
    ///
    /// All terminals must be interned before the first rule is pushed.
    pub(crate) fn intern_terminal(&mut self, token: &str) -> Result<SymbolId> {
        if let Some(&id) = self.terminal_index.get(token) {
            return Ok(id);
        }

        debug_assert!(
            self.rule_symbols.is_empty(),
            "Terminals must be interned before rules are created"
        );

        let id = SymbolId(dense_id(self.symbols.len())?);
        self.symbols.push(Symbol::Terminal(token.to_owned()));
        self.terminal_index.insert(token.to_owned(), id);
        Ok(id)
    }

    /// Allocates the next rule id together with its nonterminal symbol.
    ///
    /// Leaves the table untouched when the id space is exhausted.
    pub(crate) fn push_rule(&mut self) -> Result<(RuleId, SymbolId)> {
        let rule = RuleId(dense_id(self.rule_symbols.len())?);
        let id = SymbolId(dense_id(self.symbols.len())?);
        self.symbols.push(Symbol::NonTerminal(rule));
        self.rule_symbols.push(id);
        Ok((rule, id))
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Returns the id of a previously seen terminal token.
    pub fn lookup_terminal(&self, token: &str) -> Option<SymbolId> {
        self.terminal_index.get(token).copied()
    }

    /// Returns the nonterminal symbol standing for `rule`.
    pub fn rule_symbol(&self, rule: RuleId) -> Option<SymbolId> {
        self.rule_symbols.get(rule.index()).copied()
    }

    /// Returns the rule a symbol stands for, if it is a nonterminal.
    pub fn rule_of(&self, id: SymbolId) -> Option<RuleId> {
        self.get(id).and_then(Symbol::as_rule)
    }

    pub fn terminal_count(&self) -> usize {
        self.terminal_index.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rule_symbols.len()
    }

    /// Vocabulary size: terminals plus rules defined so far.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        (0u32..).zip(&self.symbols).map(|(i, symbol)| (SymbolId(i), symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut table = SymbolTable::new();
        let a = table.intern_terminal("TAG:Button").unwrap();
        let b = table.intern_terminal("PROP:variant").unwrap();
        let a2 = table.intern_terminal("TAG:Button").unwrap();

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(table.terminal_count(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_terminals_numbered_by_first_appearance() {
        let mut table = SymbolTable::new();
        for token in ["c", "a", "b", "a"] {
            table.intern_terminal(token).unwrap();
        }
        assert_eq!(table.lookup_terminal("c"), Some(SymbolId(0)));
        assert_eq!(table.lookup_terminal("a"), Some(SymbolId(1)));
        assert_eq!(table.lookup_terminal("b"), Some(SymbolId(2)));
        assert_eq!(table.lookup_terminal("z"), None);
    }

    #[test]
    fn test_rules_follow_terminals() {
        let mut table = SymbolTable::new();
        table.intern_terminal("x").unwrap();
        table.intern_terminal("y").unwrap();

        let (r0, s0) = table.push_rule().unwrap();
        let (r1, s1) = table.push_rule().unwrap();

        assert_eq!(r0, RuleId(0));
        assert_eq!(r1, RuleId(1));
        assert_eq!(s0, SymbolId(2));
        assert_eq!(s1, SymbolId(3));
        assert_eq!(table.rule_of(s1), Some(r1));
        assert_eq!(table.rule_symbol(r0), Some(s0));
        assert_eq!(table.rule_of(SymbolId(0)), None);
        assert_eq!(table.get(s0), Some(&Symbol::NonTerminal(r0)));
        assert_eq!(table.rule_count(), 2);
    }

    #[test]
    fn test_symbol_display() {
        assert_eq!(Symbol::Terminal("TAG:Icon".into()).to_string(), "TAG:Icon");
        assert_eq!(Symbol::NonTerminal(RuleId(4)).to_string(), "R4");
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_id_overflow_is_an_error() {
        assert_eq!(dense_id(u32::MAX as usize), Ok(u32::MAX));
        assert!(matches!(
            dense_id(u32::MAX as usize + 1),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
