//! Greedy coverage-maximizing sequence generation for class-constrained
//! cellular automaton rules.
//!
//! The generator builds long sequences of CA rule applications over a
//! fixed-width cyclic bit-vector. A transition grammar restricts which
//! rule may follow which: every rule satisfies a set of classes and
//! transitions into exactly one class, and sequences close with a
//! terminal rule drawn from a class-indexed table.
//!
//! ## Core Concepts
//!
//! - **State**: a fixed-width cyclic vector of cell values, hashed and
//!   compared by content
//! - **Rule**: an integer identifier; its family (elementary, majority,
//!   XOR, totalistic, threshold, extended) and parameter are decoded
//!   from the numeric band it falls in
//! - **Class**: one of six grammar symbols constraining legal sequencing
//! - **Coverage**: the fraction of the state space visited so far; the
//!   generator greedily picks the candidate that best balances reaching
//!   unseen states against local behavioral diversity
//!
//! ## The Generation Loop
//!
//! ```text
//! R0 = smallest rule satisfying the start class
//! loop {
//!     candidates = rules satisfying next_class(previous rule)
//!     winner     = argmax score(candidate, state it would produce)
//!     commit winner; stop on full coverage / stagnation / length bound
//! }
//! append terminal rule for the last rule's class
//! ```

mod analyzer;
mod coverage;
mod engine;
mod error;
mod generator;
mod grammar;
mod scorer;
mod state;

pub use analyzer::{SequenceAnalyzer, SequenceSummary};
pub use coverage::{state_space_size, CoverageTracker, PARTIAL_DENOMINATOR_CAP};
pub use engine::{RuleFamily, RuleKind, TransitionEngine};
pub use error::{GeneratorError, GeneratorResult};
pub use generator::{
    GenerationRun, GeneratorConfig, SequenceGenerator, StepObserver, StepRecord, Termination,
    TracingObserver, FULL_COVERAGE_AUTO_THRESHOLD,
};
pub use grammar::{RuleClass, RuleGrammar, EXTENDED_MIN_WIDTH};
pub use scorer::{CandidateScorer, ScoreBreakdown, ScoreWeights};
pub use state::{CaState, InitialStateBuilder, InitialStrategy};
