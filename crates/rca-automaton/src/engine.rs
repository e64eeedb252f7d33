//! The CA transition engine.
//!
//! A rule identifier encodes a family and a family-local parameter by
//! numeric band. The identifier is decoded once into a [`RuleKind`] and
//! then matched exhaustively, so unrecognized bands can never fall
//! through silently.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, GeneratorResult};
use crate::state::CaState;

/// Rule family, derived from the identifier band.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RuleFamily {
    Elementary,
    Majority,
    Xor,
    Totalistic,
    Threshold,
    Extended,
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleFamily::Elementary => "Elementary",
            RuleFamily::Majority => "Majority",
            RuleFamily::Xor => "Xor",
            RuleFamily::Totalistic => "Totalistic",
            RuleFamily::Threshold => "Threshold",
            RuleFamily::Extended => "Extended",
        };
        write!(f, "{}", name)
    }
}

impl RuleFamily {
    /// All families, in band order.
    pub const ALL: [RuleFamily; 6] = [
        RuleFamily::Elementary,
        RuleFamily::Majority,
        RuleFamily::Xor,
        RuleFamily::Totalistic,
        RuleFamily::Threshold,
        RuleFamily::Extended,
    ];
}

/// A decoded rule: family plus family-local parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Elementary(u32),
    Majority(u32),
    Xor(u32),
    Totalistic(u32),
    Threshold(u32),
    Extended(u32),
}

impl RuleKind {
    /// Decode a raw identifier by numeric band.
    ///
    /// Identifiers past the last band fold back into the elementary rule
    /// space modulo 256, so decoding is total.
    pub fn decode(rule: u32) -> Self {
        match rule {
            0..=999 => RuleKind::Elementary(rule),
            1000..=1999 => RuleKind::Majority(rule - 1000),
            2000..=2999 => RuleKind::Xor(rule - 2000),
            3000..=3999 => RuleKind::Totalistic(rule - 3000),
            4000..=4999 => RuleKind::Threshold(rule - 4000),
            5000..=5999 => RuleKind::Extended(rule - 5000),
            _ => RuleKind::Elementary(rule % 256),
        }
    }

    /// The family this rule belongs to.
    pub fn family(&self) -> RuleFamily {
        match self {
            RuleKind::Elementary(_) => RuleFamily::Elementary,
            RuleKind::Majority(_) => RuleFamily::Majority,
            RuleKind::Xor(_) => RuleFamily::Xor,
            RuleKind::Totalistic(_) => RuleFamily::Totalistic,
            RuleKind::Threshold(_) => RuleFamily::Threshold,
            RuleKind::Extended(_) => RuleFamily::Extended,
        }
    }

    /// The family-local parameter.
    pub fn param(&self) -> u32 {
        match self {
            RuleKind::Elementary(p)
            | RuleKind::Majority(p)
            | RuleKind::Xor(p)
            | RuleKind::Totalistic(p)
            | RuleKind::Threshold(p)
            | RuleKind::Extended(p) => *p,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.family(), self.param())
    }
}

/// Applies rules to states.
///
/// Every family reads a cyclic neighborhood (3 cells, or 5 for the
/// threshold and extended families on wide enough states). The engine
/// owns a seeded RNG used only by the random majority tie-break, so a
/// fixed seed makes the whole engine deterministic.
#[derive(Debug)]
pub struct TransitionEngine {
    rng: StdRng,
}

impl TransitionEngine {
    /// Create an engine with a fixed RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Apply a rule to a state, producing the successor state.
    ///
    /// Elementary rules mask cells to their low bit and are total. The
    /// nonlinear families are defined over binary cells only; a wider
    /// cell value yields a recoverable [`GeneratorError::CandidateEvaluation`].
    pub fn apply(&mut self, state: &CaState, rule: u32) -> GeneratorResult<CaState> {
        let kind = RuleKind::decode(rule);
        let n = state.width();

        if !matches!(kind, RuleKind::Elementary(_)) && !state.is_binary() {
            return Err(GeneratorError::CandidateEvaluation {
                rule,
                message: format!("{} requires binary cells", kind),
            });
        }

        let mut cells = vec![0u8; n];
        match kind {
            RuleKind::Elementary(param) => {
                for (i, out) in cells.iter_mut().enumerate() {
                    let idx = neighborhood_index(state, i as isize);
                    *out = ((param >> idx) & 1) as u8;
                }
            }
            RuleKind::Majority(param) => {
                for (i, out) in cells.iter_mut().enumerate() {
                    let hood = three_cell(state, i as isize);
                    *out = self.majority(hood, param);
                }
            }
            RuleKind::Xor(param) => {
                for (i, out) in cells.iter_mut().enumerate() {
                    let hood = three_cell(state, i as isize);
                    *out = xor(hood, param);
                }
            }
            RuleKind::Totalistic(param) => {
                for (i, out) in cells.iter_mut().enumerate() {
                    let hood = three_cell(state, i as isize);
                    *out = totalistic(&hood, param);
                }
            }
            RuleKind::Threshold(param) => {
                for (i, out) in cells.iter_mut().enumerate() {
                    let hood = threshold_neighborhood(state, i as isize);
                    *out = threshold(&hood, param);
                }
            }
            RuleKind::Extended(param) => {
                for (i, out) in cells.iter_mut().enumerate() {
                    *out = extended(state, i as isize, param);
                }
            }
        }

        Ok(CaState::new(cells, state.bits_per_cell()))
    }

    /// 3-cell majority vote. A tie (exactly one live cell) is broken by
    /// the strategy sub-field of the parameter: 0 center, 1 left,
    /// 2 right, anything else a uniform random draw.
    fn majority(&mut self, [left, center, right]: [u8; 3], param: u32) -> u8 {
        let tie_strategy = (param / 10) % 10;
        let ones = left + center + right;
        match ones {
            2.. => 1,
            0 => 0,
            _ => match tie_strategy {
                0 => center,
                1 => left,
                2 => right,
                _ => self.rng.random_range(0..=1),
            },
        }
    }
}

/// 3-bit lookup index for the elementary family: `(l << 2) | (c << 1) | r`.
fn neighborhood_index(state: &CaState, i: isize) -> u32 {
    let left = (state.cell_wrapped(i - 1) & 1) as u32;
    let center = (state.cell_wrapped(i) & 1) as u32;
    let right = (state.cell_wrapped(i + 1) & 1) as u32;
    (left << 2) | (center << 1) | right
}

fn three_cell(state: &CaState, i: isize) -> [u8; 3] {
    [
        state.cell_wrapped(i - 1),
        state.cell_wrapped(i),
        state.cell_wrapped(i + 1),
    ]
}

/// Base three-way XOR, augmented with AND-product terms as the parameter
/// crosses 50, 75 and 100.
fn xor([left, center, right]: [u8; 3], param: u32) -> u8 {
    let mut result = left ^ center ^ right;
    if param >= 50 {
        result ^= left & right;
    }
    if param >= 75 {
        result ^= (left & center) ^ (center & right);
    }
    if param >= 100 {
        result ^= left & center & right;
    }
    result
}

/// Output depends only on the neighborhood sum versus a tiered threshold.
fn totalistic(hood: &[u8], param: u32) -> u8 {
    let total: u32 = hood.iter().map(|&c| c as u32).sum();
    let max_sum = hood.len() as u32;
    let threshold = if param < 50 {
        max_sum / 3
    } else if param < 100 {
        max_sum / 2
    } else {
        2 * max_sum / 3
    };
    u8::from(total >= threshold)
}

/// Up to 5 cells around the position; narrow states keep the 3-cell window.
fn threshold_neighborhood(state: &CaState, i: isize) -> Vec<u8> {
    let wide = state.width() > 3;
    (-2..=2isize)
        .filter(|offset| wide || offset.abs() <= 1)
        .map(|offset| state.cell_wrapped(i + offset))
        .collect()
}

/// Sum-based activation, optionally with hysteresis: a lower threshold
/// for switching off than for switching on, keyed by the center cell.
fn threshold(hood: &[u8], param: u32) -> u8 {
    let sum: u32 = hood.iter().map(|&c| c as u32).sum();
    let on_threshold = (param % 10) + 1;
    let hysteresis = (param / 10) % 2 == 1;

    if hysteresis {
        let off_threshold = (on_threshold - 1).max(1);
        let center = hood.get(hood.len() / 2).copied().unwrap_or(0);
        if center == 0 {
            u8::from(sum >= on_threshold)
        } else {
            u8::from(sum > off_threshold)
        }
    } else {
        u8::from(sum >= on_threshold)
    }
}

/// 5-cell neighborhood classified by sum (low params) or variance (high
/// params). Falls back to the 3-cell XOR logic when the state is too
/// narrow for a 5-cell window.
fn extended(state: &CaState, i: isize, param: u32) -> u8 {
    let n = state.width();
    if n < 5 {
        return xor(three_cell(state, i), param);
    }

    let hood: Vec<u8> = (-2..=2isize)
        .map(|offset| state.cell_wrapped(i + offset))
        .collect();
    let sum: u32 = hood.iter().map(|&c| c as u32).sum();

    if param < 100 {
        u8::from(sum >= 3)
    } else {
        let mean = sum as f64 / 5.0;
        let variance: f64 = hood.iter().map(|&c| (c as f64 - mean).powi(2)).sum();
        u8::from(variance > 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(cells: &[u8]) -> CaState {
        CaState::new(cells.to_vec(), 1)
    }

    #[test]
    fn test_decode_bands() {
        assert_eq!(RuleKind::decode(30), RuleKind::Elementary(30));
        assert_eq!(RuleKind::decode(1050), RuleKind::Majority(50));
        assert_eq!(RuleKind::decode(2075), RuleKind::Xor(75));
        assert_eq!(RuleKind::decode(3100), RuleKind::Totalistic(100));
        assert_eq!(RuleKind::decode(4011), RuleKind::Threshold(11));
        assert_eq!(RuleKind::decode(5100), RuleKind::Extended(100));
    }

    #[test]
    fn test_decode_fold_back() {
        assert_eq!(RuleKind::decode(6300), RuleKind::Elementary(6300 % 256));
        assert_eq!(RuleKind::decode(u32::MAX), RuleKind::Elementary(u32::MAX % 256));
    }

    #[test]
    fn test_elementary_lookup_table_property() {
        let mut engine = TransitionEngine::new(0);
        // For every neighborhood index, the output bit must equal the
        // corresponding bit of the rule parameter.
        for rule in [30u32, 90, 110, 150] {
            for idx in 0u32..8 {
                // Width-3 state [l, c, r]: position 1 sees exactly this
                // neighborhood.
                let cells = vec![(idx >> 2) as u8 & 1, (idx >> 1) as u8 & 1, idx as u8 & 1];
                let state = binary(&cells);
                let next = engine.apply(&state, rule).unwrap();
                assert_eq!(next.cells()[1] as u32, (rule >> idx) & 1);
            }
        }
    }

    #[test]
    fn test_periodic_boundaries_shift_rules() {
        let mut engine = TransitionEngine::new(0);
        // Rule 170 copies the right neighbor; rule 240 copies the left.
        let state = binary(&[0, 0, 0, 1]);
        let left_shifted = engine.apply(&state, 170).unwrap();
        assert_eq!(left_shifted.cells(), &[0, 0, 1, 0]);
        let right_shifted = engine.apply(&state, 240).unwrap();
        assert_eq!(right_shifted.cells(), &[1, 0, 0, 0]);
    }

    #[test]
    fn test_majority_self_bias_tie_break() {
        let mut engine = TransitionEngine::new(0);
        // Rule 1000: tie strategy 0 (self-bias).
        // [1,0,1]: every position sees two live cells, no tie.
        let next = engine.apply(&binary(&[1, 0, 1]), 1000).unwrap();
        assert_eq!(next.cells(), &[1, 1, 1]);
        // [1,0,0]: every position sees exactly one live cell, a tie
        // resolved to the center value.
        let next = engine.apply(&binary(&[1, 0, 0]), 1000).unwrap();
        assert_eq!(next.cells(), &[1, 0, 0]);
    }

    #[test]
    fn test_majority_left_and_right_bias() {
        let mut engine = TransitionEngine::new(0);
        // Tie strategies 1 (left) and 2 (right) on the same tied state.
        let left = engine.apply(&binary(&[1, 0, 0]), 1010).unwrap();
        assert_eq!(left.cells(), &[0, 1, 0]);
        let right = engine.apply(&binary(&[1, 0, 0]), 1020).unwrap();
        assert_eq!(right.cells(), &[0, 0, 1]);
    }

    #[test]
    fn test_xor_augmentation_thresholds() {
        // [1,1,0]: base xor = 0; l&r = 0; (l&c)^(c&r) = 1; l&c&r = 0.
        assert_eq!(xor([1, 1, 0], 0), 0);
        assert_eq!(xor([1, 1, 0], 50), 0);
        assert_eq!(xor([1, 1, 0], 75), 1);
        // [1,1,1]: base = 1; +l&r -> 0; +mixed -> 0; +product -> 1.
        assert_eq!(xor([1, 1, 1], 0), 1);
        assert_eq!(xor([1, 1, 1], 50), 0);
        assert_eq!(xor([1, 1, 1], 75), 0);
        assert_eq!(xor([1, 1, 1], 100), 1);
    }

    #[test]
    fn test_totalistic_tiers() {
        // 3-cell window: low and mid tiers both threshold at 1, high at 2.
        assert_eq!(totalistic(&[0, 0, 0], 120), 0);
        assert_eq!(totalistic(&[1, 0, 0], 120), 0);
        assert_eq!(totalistic(&[1, 1, 0], 120), 1);
        assert_eq!(totalistic(&[1, 0, 0], 10), 1);
    }

    #[test]
    fn test_threshold_hysteresis() {
        // param 12: threshold 3, hysteresis on (off threshold 2).
        // Live center holds on while the sum stays above 2.
        assert_eq!(threshold(&[1, 1, 1, 0, 0], 12), 1);
        assert_eq!(threshold(&[1, 1, 0, 0, 0], 12), 0);
        // Dead center needs the full on-threshold.
        assert_eq!(threshold(&[1, 1, 0, 1, 0], 12), 1);
        assert_eq!(threshold(&[1, 0, 0, 1, 0], 12), 0);
    }

    #[test]
    fn test_extended_narrow_falls_back_to_xor() {
        let mut engine = TransitionEngine::new(0);
        let narrow = binary(&[1, 0, 1]);
        let via_extended = engine.apply(&narrow, 5025).unwrap();
        let via_xor = engine.apply(&narrow, 2025).unwrap();
        assert_eq!(via_extended, via_xor);
    }

    #[test]
    fn test_extended_sum_and_variance_modes() {
        let mut engine = TransitionEngine::new(0);
        let state = binary(&[1, 1, 1, 0, 0, 0]);
        // Sum mode: position 1 sees [0,1,1,1,0] (sum 3) -> 1.
        let sum_mode = engine.apply(&state, 5050).unwrap();
        assert_eq!(sum_mode.cells()[1], 1);
        // Variance mode: a mixed window has total squared deviation > 1.
        let var_mode = engine.apply(&state, 5100).unwrap();
        assert_eq!(var_mode.cells()[1], 1);
    }

    #[test]
    fn test_nonlinear_rejects_wide_cells() {
        let mut engine = TransitionEngine::new(0);
        let wide = CaState::new(vec![2, 0, 1], 2);
        assert!(engine.apply(&wide, 1000).is_err());
        // Elementary masks to the low bit instead of failing.
        assert!(engine.apply(&wide, 90).is_ok());
    }

    #[test]
    fn test_apply_is_deterministic_for_fixed_seed() {
        let state = binary(&[1, 0, 1, 1, 0]);
        let mut a = TransitionEngine::new(42);
        let mut b = TransitionEngine::new(42);
        for rule in [30u32, 1035, 2075, 3050, 4012, 5100] {
            assert_eq!(a.apply(&state, rule).unwrap(), b.apply(&state, rule).unwrap());
        }
    }
}
