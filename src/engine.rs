//! Analysis entry points and the output record.

use crate::config::EngineConfig;
use crate::emergence::{self, EmergenceDetector, EmergenceEvent, EmergenceReport};
use crate::error::{EngineError, Result, Termination};
use crate::family::{self, PatternFamily};
use crate::grammar::Grammar;
use crate::mdl;
use crate::repair::{self, Inducer};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Size and compression figures of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// `original_len * log2(alphabet)`
    pub naive_bits: f64,
    /// Final description length
    pub total_bits: f64,
    pub grammar_bits: f64,
    pub sequence_bits: f64,
    /// Description length before the first rule
    pub initial_bits: f64,
    /// `naive_bits / total_bits`; `None` when not applicable (empty input,
    /// no pair occurring twice, or a zero-bit description).
    ///
    /// At least 1 under [`StoppingPolicy::Mdl`], where every rule lowers the
    /// description length. [`StoppingPolicy::Exhaustive`] accepts rules that
    /// cost more than they save, so its ratio can drop below 1.
    ///
    /// [`StoppingPolicy::Mdl`]: crate::StoppingPolicy::Mdl
    /// [`StoppingPolicy::Exhaustive`]: crate::StoppingPolicy::Exhaustive
    pub compression_ratio: Option<f64>,
    /// Fraction of original tokens covered by a rule in the top sequence
    pub coverage: f64,
}

/// Result of one analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(flatten)]
    pub grammar: Grammar,
    pub families: Vec<PatternFamily>,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergence: Option<EmergenceReport>,
    pub termination: Termination,
}

impl Analysis {
    /// Rebuilds the original token list from the grammar.
    pub fn reconstruct(&self) -> Vec<&str> {
        self.grammar.reconstruct()
    }

    /// True when induction stopped before its natural end.
    pub fn is_truncated(&self) -> bool {
        self.termination.is_truncated()
    }
}

/// Summary of one window of a sliding-window analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub index: usize,
    /// Offset of the window's first token in the input
    pub start: usize,
    pub len: usize,
    pub rules: usize,
    pub naive_bits: f64,
    pub total_bits: f64,
    pub compression_ratio: Option<f64>,
    pub termination: Termination,
}

/// A flagged jump between consecutive windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowEvent {
    pub window: usize,
    pub delta: f64,
    pub z_score: Option<f64>,
}

/// Result of a sliding-window analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowedAnalysis {
    pub windows: Vec<WindowSummary>,
    /// Final description length of every window
    pub trajectory: Vec<f64>,
    pub events: Vec<WindowEvent>,
}

/// Grammar induction engine. Holds configuration only; every call builds
/// fresh state and discards it afterwards.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

/// Analyzes `tokens` with the default configuration.
pub fn analyze<S: AsRef<str>>(tokens: &[S]) -> Result<Analysis> {
    Engine::default().analyze(tokens)
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Analysis> {
        self.run(tokens, None)
    }

    /// Like [`Engine::analyze`], but stops at the next step boundary once
    /// `cancel` is set. The partial grammar is still returned.
    pub fn analyze_with_cancel<S: AsRef<str>>(
        &self,
        tokens: &[S],
        cancel: &AtomicBool,
    ) -> Result<Analysis> {
        self.run(tokens, Some(cancel))
    }

    fn run<S: AsRef<str>>(&self, tokens: &[S], cancel: Option<&AtomicBool>) -> Result<Analysis> {
        let mut inducer = Inducer::new(tokens, &self.config, cancel)?;

        let mut detector = self.config.emergence.clone().map(EmergenceDetector::new);
        let mut breakdown = Vec::new();
        let mut entropy = Vec::new();
        let mut events = Vec::new();
        if let Some(detector) = detector.as_mut() {
            let cost = inducer.cost();
            detector.record(cost.total_bits());
            breakdown.push(cost);
            entropy.push(inducer.usage_entropy());
        }

        let termination = inducer.run(|step| {
            let Some(detector) = detector.as_mut() else {
                return;
            };
            if let Some(hit) = detector.record(step.cost.total_bits()) {
                events.push(EmergenceEvent {
                    step: hit.step,
                    delta: hit.delta,
                    z_score: hit.z_score,
                    rule_id: step.rule,
                });
            }
            breakdown.push(step.cost);
            entropy.push(step.usage_entropy);
        });

        let cost = inducer.cost();
        let initial = inducer.initial_cost();
        let had_repeats = inducer.had_repeats();
        let grammar = inducer.into_grammar();

        let naive_bits = mdl::naive_bits(grammar.original_len(), grammar.symbols().terminal_count());
        let metrics = Metrics {
            naive_bits,
            total_bits: cost.total_bits(),
            grammar_bits: cost.grammar_bits,
            sequence_bits: cost.sequence_bits,
            initial_bits: initial.total_bits(),
            compression_ratio: compression_ratio(naive_bits, cost.total_bits(), had_repeats),
            coverage: grammar.coverage(),
        };
        let families = family::classify(&grammar, &self.config.families);

        info!(
            ?termination,
            tokens = grammar.original_len(),
            rules = grammar.rules().len(),
            families = families.len(),
            total_bits = metrics.total_bits,
            naive_bits = metrics.naive_bits,
            "analysis finished"
        );

        let emergence = detector.map(|detector| EmergenceReport {
            trajectory: detector.into_trajectory(),
            breakdown,
            entropy,
            events,
        });

        Ok(Analysis {
            grammar,
            families,
            metrics,
            emergence,
            termination,
        })
    }

    /// Runs an independent induction over each window of `window` tokens,
    /// advancing by `step` (default `window / 2`), and flags jumps in the
    /// per-window description length.
    ///
    /// Inputs shorter than one window are analyzed as a single window.
    pub fn analyze_windows<S: AsRef<str>>(
        &self,
        tokens: &[S],
        window: usize,
        step: Option<usize>,
    ) -> Result<WindowedAnalysis> {
        if window == 0 {
            return Err(EngineError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        let step = step.unwrap_or((window / 2).max(1));
        if step == 0 {
            return Err(EngineError::InvalidConfig(
                "window step must be at least 1".to_string(),
            ));
        }
        repair::validate_tokens(tokens)?;

        let starts: Vec<usize> = if tokens.len() < window {
            vec![0]
        } else {
            (0..=tokens.len() - window).step_by(step).collect()
        };

        let mut windows = Vec::with_capacity(starts.len());
        for (index, start) in starts.into_iter().enumerate() {
            let end = (start + window).min(tokens.len());
            let mut inducer = Inducer::new(&tokens[start..end], &self.config, None)?;
            let termination = inducer.run(|_| {});

            let cost = inducer.cost();
            let had_repeats = inducer.had_repeats();
            let rules = inducer.rule_count();
            let grammar = inducer.into_grammar();
            let naive_bits =
                mdl::naive_bits(grammar.original_len(), grammar.symbols().terminal_count());

            windows.push(WindowSummary {
                index,
                start,
                len: end - start,
                rules,
                naive_bits,
                total_bits: cost.total_bits(),
                compression_ratio: compression_ratio(naive_bits, cost.total_bits(), had_repeats),
                termination,
            });
        }

        let trajectory: Vec<f64> = windows.iter().map(|w| w.total_bits).collect();
        let config = self.config.emergence.clone().unwrap_or_default();
        let events = emergence::detect(&trajectory, &config)
            .into_iter()
            .map(|hit| WindowEvent {
                window: hit.step,
                delta: hit.delta,
                z_score: hit.z_score,
            })
            .collect();

        info!(windows = windows.len(), window, step, "window analysis finished");

        Ok(WindowedAnalysis {
            windows,
            trajectory,
            events,
        })
    }
}

/// `naive / total`, or `None` when the ratio carries no information.
fn compression_ratio(naive_bits: f64, total_bits: f64, had_repeats: bool) -> Option<f64> {
    (had_repeats && total_bits > 0.0).then(|| naive_bits / total_bits)
}
