//! Iterator for reconstructing token streams from an induced grammar.

use crate::grammar::Grammar;
use crate::symbol::{Symbol, SymbolId};
use std::slice;

/// Iterator that expands symbols depth-first into their terminal tokens.
///
/// Pending right-hand operands are kept on an explicit stack, so deep rule
/// chains never recurse.
pub struct ExpandIter<'a> {
    grammar: &'a Grammar,
    roots: slice::Iter<'a, SymbolId>,
    stack: Vec<SymbolId>,
}

impl<'a> ExpandIter<'a> {
    pub(crate) fn new(grammar: &'a Grammar, roots: &'a [SymbolId]) -> Self {
        Self {
            grammar,
            roots: roots.iter(),
            stack: Vec::new(),
        }
    }

    pub(crate) fn from_symbol(grammar: &'a Grammar, id: SymbolId) -> Self {
        Self {
            grammar,
            roots: [].iter(),
            stack: vec![id],
        }
    }
}

impl<'a> Iterator for ExpandIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = match self.stack.pop() {
                Some(id) => id,
                None => *self.roots.next()?,
            };

            match self.grammar.resolve(id)? {
                Symbol::Terminal(token) => return Some(token.as_str()),
                Symbol::NonTerminal(rule) => {
                    // Descend: left operand is expanded first
                    let rule = self.grammar.rule(*rule)?;
                    self.stack.push(rule.right);
                    self.stack.push(rule.left);
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a Grammar {
    type Item = &'a str;
    type IntoIter = ExpandIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.expand()
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::Grammar;
    use crate::symbol::SymbolTable;

    #[test]
    fn test_iter_empty() {
        let grammar = Grammar::new(SymbolTable::new(), Vec::new(), Vec::new(), 0);
        assert_eq!(grammar.expand().count(), 0);
    }

    #[test]
    fn test_iter_terminals_only() {
        let mut symbols = SymbolTable::new();
        let top: Vec<_> = ["x", "y", "x"]
            .iter()
            .map(|t| symbols.intern_terminal(t).unwrap())
            .collect();
        let grammar = Grammar::new(symbols, Vec::new(), top, 3);
        let collected: Vec<&str> = grammar.expand().collect();
        assert_eq!(collected, vec!["x", "y", "x"]);
    }

    #[test]
    fn test_iter_nested_rules() {
        let mut symbols = SymbolTable::new();
        let a = symbols.intern_terminal("a").unwrap();
        let b = symbols.intern_terminal("b").unwrap();
        let (_, r0) = symbols.push_rule().unwrap();
        let (_, r1) = symbols.push_rule().unwrap();
        let (_, r2) = symbols.push_rule().unwrap();
        let grammar = Grammar::new(
            symbols,
            vec![(a, b, 2), (r0, r0, 2), (r1, r1, 1)],
            vec![r2, a],
            9,
        );

        let collected: String = grammar.expand().collect();
        assert_eq!(collected, "ababababa");
        assert_eq!(grammar.expand_symbol(r1).collect::<String>(), "abab");
        assert_eq!(grammar.expand_symbol(b).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_into_iterator() {
        let mut symbols = SymbolTable::new();
        let top = vec![symbols.intern_terminal("t").unwrap()];
        let grammar = Grammar::new(symbols, Vec::new(), top, 1);
        let collected: Vec<&str> = (&grammar).into_iter().collect();
        assert_eq!(collected, vec!["t"]);
    }
}
