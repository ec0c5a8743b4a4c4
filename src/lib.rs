//! # Emergence Engine - Grammar Induction over Token Streams
//!
//! Induces a binary context-free grammar from a flat sequence of string
//! tokens using RePair: the most frequent adjacent pair is repeatedly
//! replaced with a fresh rule. Every candidate rule is priced with a
//! Minimum Description Length scorer, and induction stops once no rule
//! shortens the description.
//!
//! On top of the grammar the engine reports:
//! 1. **Metrics**: naive and induced description lengths, compression ratio, coverage
//! 2. **Pattern families**: rules grouped by their structural head token
//! 3. **Emergence events**: abrupt jumps in the description-length trajectory
//!
//! ## Example
//!
//! ```
//! use emergence_engine::{analyze, Termination};
//!
//! let tokens = ["TAG:Button", "PROP:variant", "TAG:Button", "PROP:variant", "TAG:Icon"];
//! let analysis = analyze(&tokens).unwrap();
//!
//! assert_eq!(analysis.grammar.rules().len(), 1);
//! assert_eq!(analysis.reconstruct(), tokens.to_vec());
//! assert_eq!(analysis.termination, Termination::Exhausted);
//! assert_eq!(analysis.families[0].name, "TAG:Button");
//! ```
//!
//! ## Performance
//!
//! - Pair counts are maintained incrementally in a hash index with a lazy max-heap
//! - Each step costs time proportional to the occurrences it rewrites
//! - Candidate rules are priced in O(1) before anything is mutated

mod config;
mod emergence;
mod engine;
mod error;
mod family;
mod grammar;
mod iter;
mod mdl;
mod pair_index;
mod repair;
mod sequence;
mod symbol;


pub use config::{EmergenceConfig, EmergencePreset, EngineConfig, FamilyConfig, StoppingPolicy};
pub use emergence::{EmergenceEvent, EmergenceReport};
pub use engine::{analyze, Analysis, Engine, Metrics, WindowEvent, WindowSummary, WindowedAnalysis};
pub use error::{EngineError, Result, Termination};
pub use family::{classify, PatternFamily};
pub use grammar::{Grammar, Rule};
pub use iter::ExpandIter;
pub use mdl::{grammar_bits, naive_bits, sequence_bits, DescriptionLength};
pub use pair_index::Pair;
pub use symbol::{RuleId, Symbol, SymbolId, SymbolTable};
