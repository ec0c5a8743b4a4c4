//! Per-analysis configuration.
//!
//! Every field has a serde default so a partial document (or an empty one)
//! deserializes into a usable configuration.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When the induction loop stops accepting profitable pairs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoppingPolicy {
    /// Stop once the next rule would not strictly lower the description length.
    #[default]
    Mdl,
    /// Keep going while any pair occurs at least twice.
    Exhaustive,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub stopping: StoppingPolicy,

    /// Safety cap on the number of rules. `None` uses the input length.
    #[serde(default)]
    pub max_rules: Option<usize>,

    /// Wall-clock budget for the induction loop, in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,

    #[serde(default)]
    pub families: FamilyConfig,

    /// Emergence detection; `None` skips it entirely.
    #[serde(default)]
    pub emergence: Option<EmergenceConfig>,
}

impl EngineConfig {
    pub fn with_stopping(mut self, stopping: StoppingPolicy) -> Self {
        self.stopping = stopping;
        self
    }

    pub fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = Some(max_rules);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    pub fn with_families(mut self, families: FamilyConfig) -> Self {
        self.families = families;
        self
    }

    pub fn with_emergence(mut self, emergence: EmergenceConfig) -> Self {
        self.emergence = Some(emergence);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Rule cap for an input of `input_len` tokens.
    pub(crate) fn rule_cap(&self, input_len: usize) -> usize {
        self.max_rules.unwrap_or(input_len)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rules == Some(0) {
            return Err(EngineError::InvalidConfig(
                "max_rules must be at least 1".to_string(),
            ));
        }
        if let Some(emergence) = &self.emergence {
            emergence.validate()?;
        }
        Ok(())
    }
}

/// How rules are grouped into pattern families.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyConfig {
    /// Prefix marking head-category tokens. Rules whose expansion contains no
    /// such token fall back to their first terminal.
    #[serde(default = "default_head_prefix")]
    pub head_prefix: Option<String>,
}

fn default_head_prefix() -> Option<String> {
    Some("TAG:".to_string())
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            head_prefix: default_head_prefix(),
        }
    }
}

impl FamilyConfig {
    pub fn is_head(&self, token: &str) -> bool {
        self.head_prefix
            .as_deref()
            .is_some_and(|prefix| token.starts_with(prefix))
    }
}

/// Named sensitivity levels for the emergence detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmergencePreset {
    Sensitive,
    Balanced,
    Strict,
}

/// Rolling z-score change-point detection over the description-length trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergenceConfig {
    /// Number of trailing deltas in the rolling window.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Threshold in standard deviations.
    #[serde(default = "default_k")]
    pub k: f64,

    /// Deltas required in the window before any event can fire.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Minimum number of steps between two events.
    #[serde(default = "default_min_gap")]
    pub min_gap: usize,
}

fn default_window() -> usize {
    5
}

fn default_k() -> f64 {
    2.0
}

fn default_min_samples() -> usize {
    3
}

fn default_min_gap() -> usize {
    1
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            k: default_k(),
            min_samples: default_min_samples(),
            min_gap: default_min_gap(),
        }
    }
}

impl EmergenceConfig {
    pub fn preset(preset: EmergencePreset) -> Self {
        let k = match preset {
            EmergencePreset::Sensitive => 1.5,
            EmergencePreset::Balanced => 2.0,
            EmergencePreset::Strict => 3.0,
        };
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_min_gap(mut self, min_gap: usize) -> Self {
        self.min_gap = min_gap;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(EngineError::InvalidConfig(
                "emergence window must be at least 1".to_string(),
            ));
        }
        if !self.k.is_finite() || self.k < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "emergence k must be a finite non-negative number, got {}",
                self.k
            )));
        }
        if self.min_samples < 2 || self.min_samples > self.window {
            return Err(EngineError::InvalidConfig(format!(
                "emergence min_samples must be in 2..={}, got {}",
                self.window, self.min_samples
            )));
        }
        if self.min_gap == 0 {
            return Err(EngineError::InvalidConfig(
                "emergence min_gap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stopping, StoppingPolicy::Mdl);
        assert_eq!(config.rule_cap(42), 42);
        assert!(config.emergence.is_none());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = EngineConfig::default().with_max_rules(0);
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_emergence_validation() {
        assert!(EmergenceConfig::default().validate().is_ok());
        assert!(EmergenceConfig::default().with_window(0).validate().is_err());
        assert!(EmergenceConfig::default().with_k(-1.0).validate().is_err());
        assert!(EmergenceConfig::default()
            .with_k(f64::NAN)
            .validate()
            .is_err());
        assert!(EmergenceConfig::default()
            .with_min_samples(1)
            .validate()
            .is_err());
        assert!(EmergenceConfig::default()
            .with_window(3)
            .with_min_samples(4)
            .validate()
            .is_err());
        assert!(EmergenceConfig::default().with_min_gap(0).validate().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(EmergenceConfig::preset(EmergencePreset::Sensitive).k, 1.5);
        assert_eq!(EmergenceConfig::preset(EmergencePreset::Balanced).k, 2.0);
        assert_eq!(EmergenceConfig::preset(EmergencePreset::Strict).k, 3.0);
    }

    #[test]
    fn test_head_prefix() {
        let families = FamilyConfig::default();
        assert!(families.is_head("TAG:Button"));
        assert!(!families.is_head("PROP:variant"));

        let none = FamilyConfig { head_prefix: None };
        assert!(!none.is_head("TAG:Button"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"stopping":"exhaustive","emergence":{"k":3.0}}"#)
                .expect("config should parse");
        assert_eq!(config.stopping, StoppingPolicy::Exhaustive);
        let emergence = config.emergence.expect("emergence should be set");
        assert_eq!(emergence.k, 3.0);
        assert_eq!(emergence.window, 5);
        assert_eq!(config.families, FamilyConfig::default());
    }

    #[test]
    fn test_deadline_roundtrip() {
        let config = EngineConfig::default().with_deadline(Duration::from_millis(250));
        assert_eq!(config.deadline(), Some(Duration::from_millis(250)));
    }
}
