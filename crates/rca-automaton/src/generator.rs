//! The greedy online sequence generator.
//!
//! Orchestrates grammar, engine, scorer and tracker into a step-by-step
//! loop: obtain legal candidates for the class the previous rule
//! transitions into, score each candidate on the state it would produce,
//! commit the winner, and stop on full coverage, stagnation, lack of
//! coverage progress, or the length bound.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coverage::{state_space_size, CoverageTracker};
use crate::engine::TransitionEngine;
use crate::error::{GeneratorError, GeneratorResult};
use crate::grammar::{RuleClass, RuleGrammar};
use crate::scorer::{CandidateScorer, ScoreBreakdown, ScoreWeights};
use crate::state::{CaState, InitialStateBuilder, InitialStrategy};

/// State-space size at or below which full coverage is attempted by
/// default.
pub const FULL_COVERAGE_AUTO_THRESHOLD: u64 = 1024;

/// Configuration for one generator instance.
///
/// The stagnation, no-progress and length limits are tuned constants,
/// not derived invariants; leave them `None` to get mode-dependent
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of cells in the state vector.
    pub width: usize,

    /// Bits per cell (1 for the binary case).
    pub bits_per_cell: u8,

    /// Scoring weights.
    pub weights: ScoreWeights,

    /// Enable the nonlinear rule families and scoring profile.
    pub nonlinear: bool,

    /// Aim for full state-space coverage. `None` auto-detects: true iff
    /// the state space has at most [`FULL_COVERAGE_AUTO_THRESHOLD`] states.
    pub aim_for_full_coverage: Option<bool>,

    /// Consecutive-revisit budget before stopping; `None` for the
    /// mode-dependent default.
    pub stagnation_limit: Option<u32>,

    /// Budget of steps without coverage growth before stopping; `None`
    /// for the mode-dependent default.
    pub no_progress_limit: Option<u32>,

    /// Multiplier on the state-space size when auto-deriving the max
    /// length in full-coverage mode.
    pub length_multiplier: u64,

    /// Hard cap on the auto-derived max length.
    pub length_cap: u64,

    /// RNG seed for the engine and the random initial-state strategy.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::linear(8)
    }
}

impl GeneratorConfig {
    /// Elementary-rules-only configuration.
    pub fn linear(width: usize) -> Self {
        Self {
            width,
            bits_per_cell: 1,
            weights: ScoreWeights::default(),
            nonlinear: false,
            aim_for_full_coverage: None,
            stagnation_limit: None,
            no_progress_limit: None,
            length_multiplier: 2,
            length_cap: 5000,
            seed: 0,
        }
    }

    /// Configuration with the nonlinear rule families enabled. The
    /// length budget is more generous: nonlinear runs take longer to
    /// stagnate.
    pub fn nonlinear(width: usize) -> Self {
        Self {
            nonlinear: true,
            length_multiplier: 3,
            length_cap: 10_000,
            ..Self::linear(width)
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every representable state was visited.
    FullCoverage,

    /// The stagnation counter exceeded its limit.
    Stagnation,

    /// The no-progress counter exceeded its limit.
    NoProgress,

    /// The length bound was reached.
    MaxLength,

    /// No legal candidate existed mid-sequence; the partial sequence is
    /// still returned.
    GrammarExhausted,
}

/// One committed step, handed to observers after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step index within the run (the first scored step is 1).
    pub step: usize,

    /// The winning rule.
    pub rule: u32,

    /// Score decomposition for the winner.
    pub breakdown: ScoreBreakdown,

    /// Coverage fraction before this step's state was recorded.
    pub coverage: f64,

    /// Stagnation counter after this step.
    pub stagnation: u32,

    /// No-progress counter after this step.
    pub no_progress: u32,

    /// Whether the produced state had been seen before.
    pub revisit: bool,
}

/// Observer invoked after each committed step.
///
/// Purely informational: the generator's decisions never depend on
/// whether an observer is attached.
pub trait StepObserver {
    fn on_step(&mut self, record: &StepRecord);
}

/// Observer that emits `tracing` events at a fixed step interval.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    interval: usize,
}

impl TracingObserver {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl StepObserver for TracingObserver {
    fn on_step(&mut self, record: &StepRecord) {
        if record.step % self.interval == 0 {
            info!(
                step = record.step,
                rule = record.rule,
                coverage = record.coverage,
                stagnation = record.stagnation,
                "generation_progress"
            );
        }
    }
}

/// A finished run: the sequence plus summary facts about how it ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRun {
    /// The rule sequence, terminal rule included.
    pub sequence: Vec<u32>,

    /// Why generation stopped.
    pub termination: Termination,

    /// Final coverage fraction.
    pub coverage: f64,

    /// Distinct states visited.
    pub visited_states: usize,

    /// Scored steps taken (excludes the first rule and the terminal rule).
    pub steps: usize,
}

/// The greedy sequence generator. One instance owns one run's coverage
/// and history exclusively.
pub struct SequenceGenerator {
    grammar: RuleGrammar,
    engine: TransitionEngine,
    tracker: CoverageTracker,
    scorer: CandidateScorer,
    builder: InitialStateBuilder,
    rng: StdRng,
    observer: Option<Box<dyn StepObserver>>,
    config: GeneratorConfig,
    full_coverage: bool,
    stagnation_limit: u32,
    no_progress_limit: u32,
}

impl SequenceGenerator {
    /// Create a generator from a configuration.
    pub fn new(config: GeneratorConfig) -> GeneratorResult<Self> {
        let builder = InitialStateBuilder::new(config.width, config.bits_per_cell)?;
        let grammar = RuleGrammar::new();
        grammar.validate()?;

        let state_space = state_space_size(config.width, config.bits_per_cell);
        let full_coverage = config
            .aim_for_full_coverage
            .unwrap_or(state_space <= FULL_COVERAGE_AUTO_THRESHOLD);

        let stagnation_limit = config.stagnation_limit.unwrap_or(match (config.nonlinear, full_coverage) {
            (false, true) => 100,
            (false, false) => 50,
            (true, true) => 150,
            (true, false) => 75,
        });
        let no_progress_limit = config
            .no_progress_limit
            .unwrap_or(if full_coverage { 200 } else { 100 });

        let tracker = CoverageTracker::new(config.width, config.bits_per_cell, full_coverage);
        let scorer = CandidateScorer::new(config.weights.clone(), config.nonlinear, full_coverage);

        info!(
            state_space,
            full_coverage,
            nonlinear = config.nonlinear,
            "generator_init"
        );

        Ok(Self {
            grammar,
            engine: TransitionEngine::new(config.seed),
            tracker,
            scorer,
            builder,
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            observer: None,
            config,
            full_coverage,
            stagnation_limit,
            no_progress_limit,
        })
    }

    /// Attach a step observer (builder pattern).
    pub fn with_observer(mut self, observer: Box<dyn StepObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The coverage tracker for this run.
    pub fn tracker(&self) -> &CoverageTracker {
        &self.tracker
    }

    /// The grammar in use.
    pub fn grammar(&self) -> &RuleGrammar {
        &self.grammar
    }

    /// Whether this run aims for full state-space coverage.
    pub fn full_coverage(&self) -> bool {
        self.full_coverage
    }

    /// Generate a rule sequence starting from `start_class`.
    ///
    /// `max_length` of `None` auto-derives a bound from the state-space
    /// size and the configured multiplier/cap.
    pub fn generate(
        &mut self,
        start_class: RuleClass,
        max_length: Option<usize>,
        strategy: InitialStrategy,
    ) -> GeneratorResult<GenerationRun> {
        let max_length = max_length.unwrap_or_else(|| self.auto_max_length());
        info!(%start_class, %strategy, max_length, "generation_start");

        let mut state = self.builder.build(start_class, strategy, &mut self.rng);
        debug!(initial_state = %state, "initial_state_built");

        // First rule: deterministic smallest satisfier of the start class.
        let first = self.grammar.first_rule(start_class)?;
        let mut sequence = vec![first];
        let mut prev_rule = first;

        state = self.engine.apply(&state, first)?;
        self.tracker.record_state(state.clone());
        self.tracker.record_rule(first);

        let mut stagnation: u32 = 0;
        let mut no_progress: u32 = 0;
        let mut last_coverage = 0.0f64;
        let mut termination = Termination::MaxLength;
        let mut steps = 0usize;

        for step in 1..max_length.saturating_sub(1) {
            let next_class = match self.grammar.next_class_of(prev_rule) {
                Some(class) => class,
                None => {
                    // Nonlinear rules have no grammar entry; they keep
                    // the sequence in class I.
                    RuleClass::I
                }
            };

            let candidates = if self.config.nonlinear {
                self.grammar.expanded_candidates(next_class, self.config.width)
            } else {
                self.grammar.candidates_for_class(next_class)
            };
            if candidates.is_empty() {
                warn!(%next_class, step, "grammar_exhausted_mid_run");
                termination = Termination::GrammarExhausted;
                break;
            }

            let (rule, next_state, breakdown) = match self.pick_rule(&candidates, &state) {
                Ok(picked) => picked,
                Err(err) => {
                    warn!(error = %err, step, "candidate_selection_failed");
                    termination = Termination::GrammarExhausted;
                    break;
                }
            };

            sequence.push(rule);
            steps += 1;
            state = next_state;

            // Coverage fraction before this step's state is recorded, so
            // a revisit cannot inflate it.
            let coverage = self.tracker.coverage_fraction();
            let revisit = self.tracker.is_visited(&state);

            if revisit {
                stagnation += 1;
                if coverage == last_coverage {
                    // Extra penalty: repeating states without any
                    // coverage growth.
                    stagnation += 2;
                }
            } else {
                stagnation = stagnation.saturating_sub(1);
            }

            if coverage == last_coverage {
                no_progress += 1;
            } else {
                no_progress = 0;
            }

            if let Some(observer) = self.observer.as_mut() {
                observer.on_step(&StepRecord {
                    step,
                    rule,
                    breakdown,
                    coverage,
                    stagnation,
                    no_progress,
                    revisit,
                });
            }

            if self.full_coverage && self.tracker.is_full() {
                info!(length = sequence.len(), "full_coverage_reached");
                termination = Termination::FullCoverage;
                break;
            }
            if stagnation > self.stagnation_limit {
                info!(length = sequence.len(), coverage, "stagnation_stop");
                termination = Termination::Stagnation;
                break;
            }
            if no_progress > self.no_progress_limit {
                info!(length = sequence.len(), coverage, "no_progress_stop");
                termination = Termination::NoProgress;
                break;
            }

            self.tracker.record_state(state.clone());
            self.tracker.record_rule(rule);
            prev_rule = rule;
            last_coverage = coverage;
        }

        // Close the sequence with a terminal rule keyed by the last
        // applied rule's class membership.
        if sequence.len() > 1 {
            if let Some(terminal) = self.grammar.terminal_rule(prev_rule) {
                sequence.push(terminal);
            }
        }

        let run = GenerationRun {
            steps,
            coverage: self.tracker.coverage_fraction(),
            visited_states: self.tracker.visited_count(),
            termination,
            sequence,
        };
        info!(
            length = run.sequence.len(),
            coverage = run.coverage,
            visited = run.visited_states,
            termination = ?run.termination,
            "generation_complete"
        );
        Ok(run)
    }

    /// Score every legal candidate and pick the winner.
    ///
    /// Candidates whose simulation fails are skipped. If none could be
    /// scored, fall back to the smallest candidate without scoring it;
    /// if even that fails the step is unrecoverable.
    fn pick_rule(
        &mut self,
        candidates: &[u32],
        state: &CaState,
    ) -> GeneratorResult<(u32, CaState, ScoreBreakdown)> {
        let mut best: Option<(u32, CaState, ScoreBreakdown, f64)> = None;

        for &candidate in candidates {
            let produced = match self.engine.apply(state, candidate) {
                Ok(produced) => produced,
                Err(err) => {
                    debug!(rule = candidate, error = %err, "candidate_skipped");
                    continue;
                }
            };
            let breakdown = self.scorer.score(candidate, &produced, &self.tracker);
            let total = breakdown.total();
            // Strictly-greater comparison: ties go to the first-seen
            // candidate, and candidates arrive in ascending order.
            if best.as_ref().map_or(true, |(_, _, _, score)| total > *score) {
                best = Some((candidate, produced, breakdown, total));
            }
        }

        match best {
            Some((rule, produced, breakdown, _)) => Ok((rule, produced, breakdown)),
            None => {
                let Some(fallback) = candidates.iter().min().copied() else {
                    return Err(GeneratorError::CandidateEvaluation {
                        rule: 0,
                        message: "no candidates to score".to_string(),
                    });
                };
                let produced = self.engine.apply(state, fallback)?;
                // A zeroed breakdown: the fallback was not scored and
                // did not win on score.
                Ok((
                    fallback,
                    produced,
                    ScoreBreakdown {
                        rule: fallback,
                        coverage: 0.0,
                        diversity: 0.0,
                        closing: 0.0,
                        rule_usage: 0.0,
                        family: 0.0,
                    },
                ))
            }
        }
    }

    fn auto_max_length(&self) -> usize {
        let space = self.tracker.state_space();
        let bound = if self.full_coverage {
            space
                .saturating_mul(self.config.length_multiplier)
                .min(self.config.length_cap)
        } else if self.config.nonlinear {
            2000.min(space / 5)
        } else {
            1000.min(space / 10)
        };
        (bound.max(4)) as usize
    }
}

impl std::fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceGenerator")
            .field("width", &self.config.width)
            .field("nonlinear", &self.config.nonlinear)
            .field("full_coverage", &self.full_coverage)
            .field("visited", &self.tracker.visited_count())
            .finish()
    }
}
