//! Post-hoc analysis of finished sequences.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageTracker;
use crate::engine::{RuleFamily, RuleKind};
use crate::grammar::{RuleClass, RuleGrammar};

/// Summary statistics for a finished rule sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSummary {
    /// Total sequence length, terminal rule included.
    pub length: usize,

    /// Number of distinct rule identifiers used.
    pub unique_rules: usize,

    /// `unique_rules / length` (0 for an empty sequence).
    pub rule_diversity: f64,

    /// Occurrences per rule identifier.
    pub rule_distribution: BTreeMap<u32, usize>,

    /// Occurrences per class, counting each class a rule satisfies.
    pub class_distribution: BTreeMap<RuleClass, usize>,

    /// Occurrences per rule family.
    pub family_distribution: BTreeMap<RuleFamily, usize>,

    /// Fraction of the sequence drawn from non-elementary families.
    pub nonlinear_fraction: f64,

    /// Distinct states the run visited.
    pub unique_states_visited: usize,

    /// Final coverage fraction, using the tracker's denominator.
    pub state_coverage: f64,
}

/// Computes summaries from a sequence and its run's final tracker.
#[derive(Debug, Clone, Default)]
pub struct SequenceAnalyzer {
    grammar: RuleGrammar,
}

impl SequenceAnalyzer {
    pub fn new() -> Self {
        Self {
            grammar: RuleGrammar::new(),
        }
    }

    /// Analyze a finished sequence.
    pub fn analyze(&self, sequence: &[u32], tracker: &CoverageTracker) -> SequenceSummary {
        let length = sequence.len();
        let unique: HashSet<u32> = sequence.iter().copied().collect();

        let mut rule_distribution: BTreeMap<u32, usize> = BTreeMap::new();
        let mut class_distribution: BTreeMap<RuleClass, usize> = BTreeMap::new();
        let mut family_distribution: BTreeMap<RuleFamily, usize> = BTreeMap::new();
        let mut nonlinear = 0usize;

        for &rule in sequence {
            *rule_distribution.entry(rule).or_insert(0) += 1;

            if let Some(classes) = self.grammar.classes_of(rule) {
                for class in classes {
                    *class_distribution.entry(*class).or_insert(0) += 1;
                }
            }

            let family = RuleKind::decode(rule).family();
            *family_distribution.entry(family).or_insert(0) += 1;
            if family != RuleFamily::Elementary {
                nonlinear += 1;
            }
        }

        let rule_diversity = if length == 0 {
            0.0
        } else {
            unique.len() as f64 / length as f64
        };
        let nonlinear_fraction = if length == 0 {
            0.0
        } else {
            nonlinear as f64 / length as f64
        };

        SequenceSummary {
            length,
            unique_rules: unique.len(),
            rule_diversity,
            rule_distribution,
            class_distribution,
            family_distribution,
            nonlinear_fraction,
            unique_states_visited: tracker.visited_count(),
            state_coverage: tracker.coverage_fraction(),
        }
    }
}
