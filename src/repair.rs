//! RePair grammar induction.
//!
//! RePair is a greedy grammar-based compression algorithm that repeatedly
//! replaces the most frequent pair of adjacent symbols with a new rule. Here
//! the loop is driven by an incremental pair index and priced by the MDL
//! scorer, so each step costs time proportional to the occurrences it
//! rewrites rather than to the sequence length.
//!
//! A step either commits completely (rule, splices, index and scorer updates)
//! or changes nothing, so the grammar is valid after every step and a run can
//! stop at any step boundary.

use crate::config::{EngineConfig, StoppingPolicy};
use crate::emergence::UsageEntropy;
use crate::error::{EngineError, Result, Termination};
use crate::grammar::Grammar;
use crate::mdl::{DescriptionLength, MdlScorer};
use crate::pair_index::{Pair, PairIndex};
use crate::sequence::{NodeKey, Sequence};
use crate::symbol::{RuleId, SymbolId, SymbolTable};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// State of the induction loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InductionState {
    Running,
    Stopped(Termination),
}

/// One committed induction step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    /// 1-based step number
    pub number: usize,
    pub rule: RuleId,
    pub pair: Pair,
    pub replacements: u32,
    /// Description length after the step
    pub cost: DescriptionLength,
    /// Entropy of rule reference counts after the step
    pub usage_entropy: f64,
}

/// Mutable state of one RePair run.
pub(crate) struct Inducer<'a> {
    symbols: SymbolTable,
    sequence: Sequence,
    index: PairIndex,
    scorer: MdlScorer,

    /// `(left, right, usage_count)` per rule, in creation order
    productions: Vec<(SymbolId, SymbolId, u32)>,

    /// Live references per rule, for the usage entropy
    references: Vec<u32>,
    entropy: UsageEntropy,

    original_len: usize,
    initial_cost: DescriptionLength,
    /// Whether any pair occurred at least twice before the first step
    had_repeats: bool,

    policy: StoppingPolicy,
    max_rules: usize,
    deadline: Option<Instant>,
    cancel: Option<&'a AtomicBool>,
    state: InductionState,
}

/// Rejects tokens the engine cannot carry.
pub(crate) fn validate_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<()> {
    // Positions and pair counts are 32-bit
    if u32::try_from(tokens.len()).is_err() {
        return Err(EngineError::InvalidInput {
            position: tokens.len(),
            reason: format!("more than {} tokens", u32::MAX),
        });
    }
    match tokens.iter().position(|t| t.as_ref().is_empty()) {
        Some(position) => Err(EngineError::InvalidInput {
            position,
            reason: "empty token".to_string(),
        }),
        None => Ok(()),
    }
}

impl<'a> Inducer<'a> {
    /// Interns the tokens and builds the sequence, pair index and scorer.
    ///
    /// Fails without side effects on a malformed token.
    pub(crate) fn new<S: AsRef<str>>(
        tokens: &[S],
        config: &EngineConfig,
        cancel: Option<&'a AtomicBool>,
    ) -> Result<Self> {
        validate_tokens(tokens)?;

        let mut symbols = SymbolTable::new();
        let ids = tokens
            .iter()
            .map(|t| symbols.intern_terminal(t.as_ref()))
            .collect::<Result<Vec<SymbolId>>>()?;

        let sequence = Sequence::initialize(&ids);
        let mut index = PairIndex::build(&sequence);
        let scorer = MdlScorer::new(ids.iter().copied(), symbols.terminal_count());
        let had_repeats = index.most_frequent().is_some();
        let initial_cost = scorer.current();

        Ok(Self {
            symbols,
            sequence,
            index,
            scorer,
            productions: Vec::new(),
            references: Vec::new(),
            entropy: UsageEntropy::default(),
            original_len: ids.len(),
            initial_cost,
            had_repeats,
            policy: config.stopping,
            max_rules: config.rule_cap(ids.len()),
            deadline: config.deadline().map(|d| Instant::now() + d),
            cancel,
            state: InductionState::Running,
        })
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> InductionState {
        self.state
    }

    pub(crate) fn cost(&self) -> DescriptionLength {
        self.scorer.current()
    }

    pub(crate) fn initial_cost(&self) -> DescriptionLength {
        self.initial_cost
    }

    pub(crate) fn had_repeats(&self) -> bool {
        self.had_repeats
    }

    pub(crate) fn usage_entropy(&self) -> f64 {
        self.entropy.bits()
    }

    pub(crate) fn rule_count(&self) -> usize {
        self.productions.len()
    }

    /// Current top-level sequence.
    #[cfg(test)]
    pub(crate) fn sequence_symbols(&self) -> Vec<SymbolId> {
        self.sequence.symbols().collect()
    }

    /// The pair the next step would consider.
    #[cfg(test)]
    pub(crate) fn most_frequent_pair(&mut self) -> Option<(Pair, u32)> {
        self.index.most_frequent()
    }

    fn stop(&mut self, termination: Termination) -> ControlFlow<Termination, Step> {
        self.state = InductionState::Stopped(termination);
        ControlFlow::Break(termination)
    }

    /// Performs one induction step.
    ///
    /// Returns `Break` once the loop has stopped; further calls keep
    /// returning the same termination.
    pub(crate) fn step(&mut self) -> ControlFlow<Termination, Step> {
        if let InductionState::Stopped(termination) = self.state {
            return ControlFlow::Break(termination);
        }

        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return self.stop(Termination::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return self.stop(Termination::DeadlineElapsed);
        }

        let Some((pair, count)) = self.index.most_frequent() else {
            return self.stop(Termination::Exhausted);
        };

        let mut candidates = self.index.occurrences(pair).to_vec();
        self.sequence.order_candidates(&mut candidates);
        let replacements = self.sequence.count_replacements(pair, &candidates);

        if self.policy == StoppingPolicy::Mdl {
            let proposal = self.scorer.propose(pair, replacements);
            if !self.scorer.improves(&proposal) {
                debug!(
                    left = pair.left.as_u32(),
                    right = pair.right.as_u32(),
                    count,
                    proposed_bits = proposal.total_bits(),
                    current_bits = self.scorer.current().total_bits(),
                    "rule would not shorten the description"
                );
                return self.stop(Termination::MdlConverged);
            }
        }

        if self.productions.len() >= self.max_rules {
            warn!(
                max_rules = self.max_rules,
                "rule cap reached before induction converged"
            );
            return self.stop(Termination::CapExceeded);
        }

        let (rule, symbol) = match self.symbols.push_rule() {
            Ok(ids) => ids,
            Err(err) => {
                warn!(%err, "symbol id space exhausted");
                return self.stop(Termination::CapExceeded);
            }
        };

        ControlFlow::Continue(self.commit(rule, symbol, pair, &candidates, replacements))
    }

    fn commit(
        &mut self,
        rule: RuleId,
        symbol: SymbolId,
        pair: Pair,
        candidates: &[NodeKey],
        expected: u32,
    ) -> Step {

        let index = &mut self.index;
        let replacements = self
            .sequence
            .replace_occurrences(pair, symbol, candidates, |splice| index.on_splice(splice));
        debug_assert_eq!(replacements, expected, "dry run and splice disagree");
        debug_assert_eq!(self.index.count(pair), 0, "pair survived its replacement");

        self.scorer.commit(pair, symbol, replacements);
        self.productions.push((pair.left, pair.right, replacements));
        self.track_references(pair, replacements);

        let cost = self.scorer.current();
        debug!(
            rule = rule.as_u32(),
            left = pair.left.as_u32(),
            right = pair.right.as_u32(),
            replacements,
            sequence_len = self.sequence.len(),
            distinct_pairs = self.index.len(),
            total_bits = cost.total_bits(),
            "rule committed"
        );

        Step {
            number: self.productions.len(),
            rule,
            pair,
            replacements,
            cost,
            usage_entropy: self.entropy.bits(),
        }
    }

    /// Moves `replacements` references from the operands into the new rule.
    fn track_references(&mut self, pair: Pair, replacements: u32) {
        for operand in [pair.left, pair.right] {
            if let Some(rule) = self.symbols.rule_of(operand) {
                let old = self.references[rule.index()];
                // Each replaced occurrence drops one reference; the new
                // right-hand side adds one back.
                let new = old - replacements + 1;
                self.references[rule.index()] = new;
                self.entropy.update(old, new);
            }
        }
        self.references.push(replacements);
        self.entropy.update(0, replacements);
    }

    /// Runs steps until the loop stops, reporting every committed step.
    pub(crate) fn run<F>(&mut self, mut on_step: F) -> Termination
    where
        F: FnMut(&Step),
    {
        loop {
            match self.step() {
                ControlFlow::Continue(step) => on_step(&step),
                ControlFlow::Break(termination) => return termination,
            }
        }
    }

    /// Freezes the current state into a grammar.
    pub(crate) fn into_grammar(self) -> Grammar {
        let top = self.sequence.symbols().collect();
        Grammar::new(self.symbols, self.productions, top, self.original_len)
    }
}
