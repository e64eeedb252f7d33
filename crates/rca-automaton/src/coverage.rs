//! Visited-state and usage bookkeeping for one generation run.
//!
//! A tracker is owned exclusively by one generator instance; independent
//! runs never share one. It grows monotonically and is reset only by
//! constructing a fresh tracker.

use std::collections::{HashMap, HashSet};

use crate::engine::{RuleFamily, RuleKind};
use crate::state::CaState;

/// Cap on the coverage denominator when not aiming for full coverage.
pub const PARTIAL_DENOMINATOR_CAP: u64 = 10_000;

/// Records every distinct state seen, the ordered visit history, and
/// per-rule / per-family usage counts.
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    visited: HashSet<CaState>,
    history: Vec<CaState>,
    frequency: HashMap<CaState, usize>,
    rule_usage: HashMap<u32, usize>,
    family_usage: HashMap<RuleFamily, usize>,
    state_space: u64,
    denominator: u64,
}

impl CoverageTracker {
    /// Create a tracker for a state space of `width` cells at
    /// `bits_per_cell` bits each.
    ///
    /// In full-coverage mode the coverage denominator is the true state
    /// space size; otherwise it is capped at
    /// [`PARTIAL_DENOMINATOR_CAP`]. State spaces too large for a `u64`
    /// saturate.
    pub fn new(width: usize, bits_per_cell: u8, full_coverage: bool) -> Self {
        let state_space = state_space_size(width, bits_per_cell);
        let denominator = if full_coverage {
            state_space
        } else {
            state_space.min(PARTIAL_DENOMINATOR_CAP)
        };
        Self {
            visited: HashSet::new(),
            history: Vec::new(),
            frequency: HashMap::new(),
            rule_usage: HashMap::new(),
            family_usage: HashMap::new(),
            state_space,
            denominator,
        }
    }

    /// Record a visited state, in emission order.
    pub fn record_state(&mut self, state: CaState) {
        self.visited.insert(state.clone());
        *self.frequency.entry(state.clone()).or_insert(0) += 1;
        self.history.push(state);
    }

    /// Record that a rule was applied.
    pub fn record_rule(&mut self, rule: u32) {
        *self.rule_usage.entry(rule).or_insert(0) += 1;
        *self
            .family_usage
            .entry(RuleKind::decode(rule).family())
            .or_insert(0) += 1;
    }

    /// Whether the state has been seen before.
    pub fn is_visited(&self, state: &CaState) -> bool {
        self.visited.contains(state)
    }

    /// How many times this exact state has appeared in history.
    pub fn visit_count(&self, state: &CaState) -> usize {
        self.frequency.get(state).copied().unwrap_or(0)
    }

    /// The last `k` visited states, oldest first.
    pub fn recent(&self, k: usize) -> &[CaState] {
        let start = self.history.len().saturating_sub(k);
        &self.history[start..]
    }

    /// Number of distinct states visited.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Total visits recorded, duplicates included.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Total state-space size (saturating).
    pub fn state_space(&self) -> u64 {
        self.state_space
    }

    /// Denominator used for coverage fractions.
    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Fraction of the (possibly capped) state space visited.
    pub fn coverage_fraction(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.visited.len() as f64 / self.denominator as f64
    }

    /// Fraction of the *true* state space visited, used by the scorer's
    /// closing bonus.
    pub fn true_coverage_fraction(&self) -> f64 {
        if self.state_space == 0 {
            return 0.0;
        }
        self.visited.len() as f64 / self.state_space as f64
    }

    /// Whether every representable state has been visited.
    pub fn is_full(&self) -> bool {
        self.visited.len() as u64 == self.state_space
    }

    /// How many times this rule has been applied.
    pub fn rule_usage(&self, rule: u32) -> usize {
        self.rule_usage.get(&rule).copied().unwrap_or(0)
    }

    /// How many times rules of this family have been applied.
    pub fn family_usage(&self, family: RuleFamily) -> usize {
        self.family_usage.get(&family).copied().unwrap_or(0)
    }
}

/// `2^(width * bits_per_cell)`, saturating at `u64::MAX`.
pub fn state_space_size(width: usize, bits_per_cell: u8) -> u64 {
    let bits = (width as u32).saturating_mul(bits_per_cell as u32);
    if bits >= 64 {
        u64::MAX
    } else {
        1u64 << bits
    }
}
