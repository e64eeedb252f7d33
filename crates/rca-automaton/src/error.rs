//! Error types for the sequence generator.

use thiserror::Error;

use crate::grammar::RuleClass;

/// Result type alias for generator operations.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors that can occur while building a rule sequence.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// No rule in the grammar satisfies the required class.
    ///
    /// At first-rule selection this is fatal; mid-sequence the generator
    /// recovers by finishing with the partial sequence built so far.
    #[error("no candidate rules satisfy class {class}")]
    GrammarExhausted { class: RuleClass },

    /// The initial-state strategy name does not match a known strategy.
    #[error("unknown initial-state strategy: {name}")]
    UnknownStrategy { name: String },

    /// A candidate rule could not be simulated on the current state.
    ///
    /// Only the nonlinear rule families can fail this way; the scorer
    /// skips such candidates rather than aborting the step.
    #[error("rule {rule} cannot be evaluated: {message}")]
    CandidateEvaluation { rule: u32, message: String },

    /// The generator configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}
