//! Scalar scoring of candidate rules.
//!
//! Each candidate is scored on the state it *would* produce; the terms
//! are independently weighted and additive so observers can see exactly
//! why a rule won.

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageTracker;
use crate::engine::{RuleFamily, RuleKind};
use crate::state::CaState;

/// Caller-supplied weights for the scoring terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Bonus for reaching an unseen state.
    pub coverage_bonus: f64,

    /// Weight on the mean normalized Hamming distance from recent states.
    pub diversity_weight: f64,

    /// Flat bonus for non-elementary candidates (nonlinear profile only).
    pub nonlinear_weight: f64,

    /// How many recent states the diversity term looks back over.
    pub history_window: usize,

    /// Coverage fraction above which the closing bonus kicks in.
    pub closing_watermark: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            coverage_bonus: 2.0,
            diversity_weight: 0.1,
            nonlinear_weight: 1.0,
            history_window: 20,
            closing_watermark: 0.8,
        }
    }
}

/// Per-term decomposition of one candidate's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// The candidate rule.
    pub rule: u32,

    /// Coverage term: full bonus for unseen states, a diminishing
    /// fraction for revisits.
    pub coverage: f64,

    /// Diversity term over the recent history window.
    pub diversity: f64,

    /// Closing bonus near full coverage.
    pub closing: f64,

    /// Per-rule usage bonus or penalty.
    pub rule_usage: f64,

    /// Nonlinear-family bonus.
    pub family: f64,
}

impl ScoreBreakdown {
    /// Sum of all terms.
    pub fn total(&self) -> f64 {
        self.coverage + self.diversity + self.closing + self.rule_usage + self.family
    }
}

/// Scores candidate rules against the current coverage picture.
#[derive(Debug, Clone)]
pub struct CandidateScorer {
    weights: ScoreWeights,
    nonlinear: bool,
    full_coverage: bool,
}

impl CandidateScorer {
    /// Create a scorer.
    ///
    /// `nonlinear` selects the enhanced profile: family bonuses and a
    /// usage *penalty* instead of the linear profile's usage bonus.
    pub fn new(weights: ScoreWeights, nonlinear: bool, full_coverage: bool) -> Self {
        Self {
            weights,
            nonlinear,
            full_coverage,
        }
    }

    /// The configured weights.
    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score a candidate rule given the state it would produce.
    pub fn score(
        &self,
        candidate: u32,
        produced: &CaState,
        tracker: &CoverageTracker,
    ) -> ScoreBreakdown {
        let coverage = if tracker.is_visited(produced) {
            // Diminishing reward for repeats rather than an outright ban.
            self.weights.coverage_bonus * (0.1 / (1.0 + tracker.visit_count(produced) as f64))
        } else {
            self.weights.coverage_bonus
        };

        let recent = tracker.recent(self.weights.history_window);
        let diversity = if recent.is_empty() {
            0.0
        } else {
            let width = produced.width().max(1) as f64;
            let sum: f64 = recent
                .iter()
                .map(|prev| produced.hamming(prev) as f64 / width)
                .sum();
            self.weights.diversity_weight * (sum / recent.len() as f64)
        };

        let closing = if self.full_coverage {
            let ratio = tracker.true_coverage_fraction();
            if ratio > self.weights.closing_watermark {
                (1.0 - ratio) * 2.0
            } else {
                0.0
            }
        } else {
            0.0
        };

        let uses = tracker.rule_usage(candidate) as f64;
        let rule_usage = if self.nonlinear {
            -0.1 * uses
        } else {
            0.05 / (1.0 + uses)
        };

        let family = if self.nonlinear {
            let kind = RuleKind::decode(candidate);
            if kind.family() != RuleFamily::Elementary {
                let family_uses = tracker.family_usage(kind.family()) as f64;
                self.weights.nonlinear_weight + 0.5 / (1.0 + family_uses)
            } else {
                0.0
            }
        } else {
            0.0
        };

        ScoreBreakdown {
            rule: candidate,
            coverage,
            diversity,
            closing,
            rule_usage,
            family,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(cells: &[u8]) -> CaState {
        CaState::new(cells.to_vec(), 1)
    }

    fn linear_scorer() -> CandidateScorer {
        CandidateScorer::new(ScoreWeights::default(), false, true)
    }

    #[test]
    fn test_unseen_state_gets_full_bonus() {
        let tracker = CoverageTracker::new(4, 1, true);
        let breakdown = linear_scorer().score(30, &state(&[1, 0, 1, 0]), &tracker);
        assert_eq!(breakdown.coverage, 2.0);
    }

    #[test]
    fn test_revisit_bonus_diminishes() {
        let mut tracker = CoverageTracker::new(4, 1, true);
        let s = state(&[1, 0, 1, 0]);
        tracker.record_state(s.clone());
        let once = linear_scorer().score(30, &s, &tracker).coverage;
        tracker.record_state(s.clone());
        let twice = linear_scorer().score(30, &s, &tracker).coverage;

        assert!(once < 2.0);
        assert!(twice < once);
        // bonus * 0.1 / (1 + count)
        assert!((once - 2.0 * 0.1 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_diversity_rewards_distance() {
        let mut tracker = CoverageTracker::new(4, 1, true);
        tracker.record_state(state(&[0, 0, 0, 0]));

        let scorer = linear_scorer();
        let near = scorer.score(30, &state(&[0, 0, 0, 1]), &tracker);
        let far = scorer.score(30, &state(&[1, 1, 1, 1]), &tracker);
        assert!(far.diversity > near.diversity);
        assert!((far.diversity - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_closing_bonus_above_watermark() {
        let mut tracker = CoverageTracker::new(2, 1, true);
        // Visit 3 of 4 states: ratio 0.75, below the watermark.
        for cells in [[0, 0], [0, 1], [1, 0]] {
            tracker.record_state(state(&cells));
        }
        let scorer = linear_scorer();
        assert_eq!(scorer.score(30, &state(&[1, 1]), &tracker).closing, 0.0);

        tracker.record_state(state(&[1, 1]));
        // Ratio 1.0 is not above the watermark check's purpose, but the
        // formula still yields (1 - 1.0) * 2 = 0.
        assert_eq!(scorer.score(30, &state(&[1, 1]), &tracker).closing, 0.0);
    }

    #[test]
    fn test_closing_bonus_proportional_to_remainder() {
        let mut tracker = CoverageTracker::new(4, 1, true);
        // Visit 14 of 16 states: ratio 0.875 > 0.8.
        for i in 0..14u8 {
            tracker.record_state(state(&[i & 1, (i >> 1) & 1, (i >> 2) & 1, (i >> 3) & 1]));
        }
        let breakdown = linear_scorer().score(30, &state(&[0, 1, 1, 1]), &tracker);
        assert!((breakdown.closing - (1.0 - 14.0 / 16.0) * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rule_usage_profiles() {
        let mut tracker = CoverageTracker::new(4, 1, true);
        tracker.record_rule(30);
        tracker.record_rule(30);

        let s = state(&[1, 0, 1, 0]);
        let linear = linear_scorer().score(30, &s, &tracker);
        assert!((linear.rule_usage - 0.05 / 3.0).abs() < 1e-12);

        let nonlinear = CandidateScorer::new(ScoreWeights::default(), true, true).score(
            30, &s, &tracker,
        );
        assert!((nonlinear.rule_usage + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_family_bonus_favors_underused_families() {
        let mut tracker = CoverageTracker::new(5, 1, true);
        tracker.record_rule(2075);

        let scorer = CandidateScorer::new(ScoreWeights::default(), true, true);
        let s = state(&[1, 0, 1, 0, 1]);

        let elementary = scorer.score(30, &s, &tracker);
        assert_eq!(elementary.family, 0.0);

        let used_family = scorer.score(2075, &s, &tracker);
        let fresh_family = scorer.score(1050, &s, &tracker);
        assert!(fresh_family.family > used_family.family);
        assert!((fresh_family.family - 1.5).abs() < 1e-12);
    }
}
