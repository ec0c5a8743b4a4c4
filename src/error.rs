use serde::Serialize;
use thiserror::Error;

/// Errors that abort an analysis before any induction step is taken.
///
/// Truncated runs (safety cap, cancellation, deadline) are not errors; they
/// are reported through [`Termination`] on an otherwise valid result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid input token at position {position}: {reason}")]
    InvalidInput { position: usize, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Malformed grammar: {0}")]
    MalformedGrammar(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why the induction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No adjacent pair occurs twice.
    Exhausted,
    /// The next rule would not strictly lower the description length.
    MdlConverged,
    /// The configured rule cap was reached while a profitable pair remained.
    CapExceeded,
    /// The caller raised the cancellation flag.
    Cancelled,
    /// The configured wall-clock budget ran out.
    DeadlineElapsed,
}

impl Termination {
    /// Returns true when the grammar is a valid prefix of a longer run.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            Termination::CapExceeded | Termination::Cancelled | Termination::DeadlineElapsed
        )
    }
}
