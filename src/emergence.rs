//! Change-point detection over the description-length trajectory.
//!
//! After every induction step the detector receives the new total `L`. It
//! keeps the first differences `delta[i] = H[i] - H[i-1]` in a trailing
//! window and flags step `i` when `|delta[i] - mean| > k * stddev` of the
//! deltas before it. The detector only observes; it never feeds back into
//! induction.

use crate::config::EmergenceConfig;
use crate::mdl::DescriptionLength;
use crate::symbol::RuleId;
use serde::Serialize;
use std::collections::VecDeque;

/// Deviation required to fire when the window has zero spread.
const FLAT_WINDOW_EPS: f64 = 1e-9;

/// A flagged jump in the description-length trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergenceEvent {
    /// Induction step (1-based; step 0 is the initial sequence)
    pub step: usize,
    pub delta: f64,
    /// Standardized deviation; `None` when the window had zero spread
    pub z_score: Option<f64>,
    /// Rule created at this step
    pub rule_id: RuleId,
}

/// Trajectory and events of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergenceReport {
    /// `H[0..=n]`: total description length before and after every step
    pub trajectory: Vec<f64>,
    /// Grammar and sequence parts of every `H[i]`
    pub breakdown: Vec<DescriptionLength>,
    /// Shannon entropy of rule reference counts after every step
    pub entropy: Vec<f64>,
    pub events: Vec<EmergenceEvent>,
}

/// A detection before it is attributed to a rule or window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Detection {
    pub step: usize,
    pub delta: f64,
    pub z_score: Option<f64>,
}

#[derive(Debug)]
pub(crate) struct EmergenceDetector {
    config: EmergenceConfig,
    trajectory: Vec<f64>,
    window: VecDeque<f64>,
    last_event: Option<usize>,
}

impl EmergenceDetector {
    pub(crate) fn new(config: EmergenceConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window + 1),
            config,
            trajectory: Vec::new(),
            last_event: None,
        }
    }

    /// Appends `H[i]` and returns a detection if step `i` is an outlier.
    pub(crate) fn record(&mut self, total_bits: f64) -> Option<Detection> {
        let step = self.trajectory.len();
        let previous = self.trajectory.last().copied();
        self.trajectory.push(total_bits);

        let delta = total_bits - previous?;
        let detection = self.check(step, delta);

        self.window.push_back(delta);
        if self.window.len() > self.config.window {
            self.window.pop_front();
        }

        if detection.is_some() {
            self.last_event = Some(step);
        }
        detection
    }

    fn check(&self, step: usize, delta: f64) -> Option<Detection> {
        if self.window.len() < self.config.min_samples {
            return None;
        }
        if let Some(last) = self.last_event {
            if step - last < self.config.min_gap {
                return None;
            }
        }

        let n = self.window.len() as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self
            .window
            .iter()
            .map(|d| (d - mean) * (d - mean))
            .sum::<f64>()
            / n;
        let stddev = variance.sqrt();
        let deviation = (delta - mean).abs();

        let (fires, z_score) = if stddev > 0.0 {
            (deviation > self.config.k * stddev, Some((delta - mean) / stddev))
        } else {
            (deviation > FLAT_WINDOW_EPS, None)
        };

        fires.then_some(Detection {
            step,
            delta,
            z_score,
        })
    }

    pub(crate) fn into_trajectory(self) -> Vec<f64> {
        self.trajectory
    }
}

/// Runs the detector over a complete trajectory.
pub(crate) fn detect(trajectory: &[f64], config: &EmergenceConfig) -> Vec<Detection> {
    let mut detector = EmergenceDetector::new(config.clone());
    trajectory
        .iter()
        .filter_map(|&total| detector.record(total))
        .collect()
}

/// Shannon entropy of a changing set of counts, maintained in O(1) per update.
#[derive(Debug, Clone, Default)]
pub(crate) struct UsageEntropy {
    total: u64,
    /// Sum of c log2 c
    weighted: f64,
}

impl UsageEntropy {
    pub(crate) fn update(&mut self, old: u32, new: u32) {
        self.total = self.total - u64::from(old) + u64::from(new);
        self.weighted += clog(new) - clog(old);
    }

    /// Entropy in bits; 0 when there are no counts.
    pub(crate) fn bits(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        (total.log2() - self.weighted / total).max(0.0)
    }
}

fn clog(c: u32) -> f64 {
    if c == 0 {
        0.0
    } else {
        let c = f64::from(c);
        c * c.log2()
    }
}
