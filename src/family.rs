//! Post-hoc grouping of rules into pattern families.
//!
//! A rule's head is the first head-category terminal (by default a `TAG:`
//! token) in its expansion, or its first terminal when there is none. Rules
//! sharing a head form a family. Heads are computed bottom-up in rule order,
//! so classification is linear in the number of rules.

use crate::config::FamilyConfig;
use crate::grammar::Grammar;
use crate::symbol::{RuleId, SymbolId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Rules that share a structural head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFamily {
    /// The head token
    pub name: String,
    pub head: SymbolId,
    /// Sorted ascending
    pub member_rule_ids: Vec<RuleId>,
    /// Member usage counts plus literal head occurrences left in the top sequence
    pub total_usage: u64,
    /// Tokens present in some but not all member expansions, sorted
    pub variants: Vec<String>,
}

/// Groups the rules of `grammar` into families, ranked by usage.
///
/// Ranking is by `total_usage` descending, ties broken by the earliest member rule.
pub fn classify(grammar: &Grammar, config: &FamilyConfig) -> Vec<PatternFamily> {
    let heads = rule_heads(grammar, config);

    let mut members: BTreeMap<SymbolId, Vec<RuleId>> = BTreeMap::new();
    for (rule, head) in grammar.rules().iter().zip(&heads) {
        members.entry(*head).or_default().push(rule.id);
    }

    let mut literal: BTreeMap<SymbolId, u64> = BTreeMap::new();
    for &symbol in grammar.top_sequence() {
        if members.contains_key(&symbol) {
            *literal.entry(symbol).or_insert(0) += 1;
        }
    }

    let mut families: Vec<PatternFamily> = members
        .into_iter()
        .map(|(head, rule_ids)| {
            let usage: u64 = rule_ids
                .iter()
                .filter_map(|&id| grammar.rule(id))
                .map(|rule| u64::from(rule.usage_count))
                .sum();
            PatternFamily {
                name: grammar
                    .resolve(head)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                head,
                total_usage: usage + literal.get(&head).copied().unwrap_or(0),
                variants: variants(grammar, head, &rule_ids),
                member_rule_ids: rule_ids,
            }
        })
        .collect();

    families.sort_by(|a, b| {
        b.total_usage
            .cmp(&a.total_usage)
            .then_with(|| a.member_rule_ids.first().cmp(&b.member_rule_ids.first()))
    });
    families
}

/// Head terminal of every rule, indexed by rule id.
fn rule_heads(grammar: &Grammar, config: &FamilyConfig) -> Vec<SymbolId> {
    let symbols = grammar.symbols();
    let mut category: Vec<Option<SymbolId>> = Vec::with_capacity(grammar.rules().len());
    let mut first: Vec<SymbolId> = Vec::with_capacity(grammar.rules().len());

    for rule in grammar.rules() {
        let category_of = |s: SymbolId| match symbols.rule_of(s) {
            Some(r) => category[r.index()],
            None => symbols
                .get(s)
                .and_then(|sym| sym.as_terminal())
                .filter(|token| config.is_head(token))
                .map(|_| s),
        };
        let head = category_of(rule.left).or_else(|| category_of(rule.right));
        let leading = match symbols.rule_of(rule.left) {
            Some(r) => first[r.index()],
            None => rule.left,
        };

        category.push(head);
        first.push(leading);
    }

    category
        .into_iter()
        .zip(first)
        .map(|(head, leading)| head.unwrap_or(leading))
        .collect()
}

/// Tokens that distinguish the members of one family.
fn variants(grammar: &Grammar, head: SymbolId, rule_ids: &[RuleId]) -> Vec<String> {
    if rule_ids.len() < 2 {
        return Vec::new();
    }

    let symbols = grammar.symbols();
    let mut union: BTreeSet<&str> = BTreeSet::new();
    let mut common: Option<BTreeSet<&str>> = None;

    for &id in rule_ids {
        let Some(symbol) = symbols.rule_symbol(id) else {
            continue;
        };
        let tokens: BTreeSet<&str> = grammar.expand_symbol(symbol).collect();
        union.extend(tokens.iter().copied());
        common = Some(match common {
            Some(shared) => shared.intersection(&tokens).copied().collect(),
            None => tokens,
        });
    }

    let head_token = grammar.resolve(head).and_then(|s| s.as_terminal());
    let common = common.unwrap_or_default();
    union
        .into_iter()
        .filter(|token| !common.contains(token) && Some(*token) != head_token)
        .map(str::to_owned)
        .collect()
}
