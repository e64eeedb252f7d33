//! Cyclic bit-vector states and initial-state construction.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, GeneratorResult};
use crate::grammar::RuleClass;

/// A fixed-width cyclic vector of cell values.
///
/// Each cell holds a value in `[0, 2^bits_per_cell)`; the binary case is
/// one bit per cell. States are immutable values compared and hashed by
/// content - every transition produces a fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaState {
    cells: Vec<u8>,
    bits_per_cell: u8,
}

impl CaState {
    /// Create a state from raw cell values.
    pub fn new(cells: Vec<u8>, bits_per_cell: u8) -> Self {
        Self {
            cells,
            bits_per_cell,
        }
    }

    /// Number of cells.
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Bits per cell.
    pub fn bits_per_cell(&self) -> u8 {
        self.bits_per_cell
    }

    /// Cell values as a slice.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Cell value at a position, wrapping cyclically in both directions.
    pub fn cell_wrapped(&self, index: isize) -> u8 {
        let n = self.cells.len() as isize;
        self.cells[(index.rem_euclid(n)) as usize]
    }

    /// Number of positions at which two states differ.
    ///
    /// States of unequal width compare over the shorter prefix, matching
    /// positional zip semantics.
    pub fn hamming(&self, other: &CaState) -> usize {
        self.cells
            .iter()
            .zip(other.cells.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// True when every cell is 0 or 1.
    pub fn is_binary(&self) -> bool {
        self.cells.iter().all(|&c| c <= 1)
    }
}

impl fmt::Display for CaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}

/// Named strategies for constructing the starting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialStrategy {
    /// Parity by position: `0 1 0 1 ...`.
    Alternating,
    /// Fixed 8-bit per-class seed pattern, replicated across positions.
    ClassBased,
    /// Position- and class-derived parity, decorrelated from alternating.
    Diverse,
    /// Uniform independent draw per cell.
    Random,
}

impl fmt::Display for InitialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InitialStrategy::Alternating => "alternating",
            InitialStrategy::ClassBased => "class_based",
            InitialStrategy::Diverse => "diverse",
            InitialStrategy::Random => "random",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for InitialStrategy {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alternating" => Ok(InitialStrategy::Alternating),
            "class_based" => Ok(InitialStrategy::ClassBased),
            "diverse" => Ok(InitialStrategy::Diverse),
            "random" => Ok(InitialStrategy::Random),
            other => Err(GeneratorError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

/// 8-bit seed fingerprints per class, indexed by [`RuleClass::index`].
const CLASS_SEEDS: [u8; 6] = [
    0b1010_1010, // I: alternating
    0b1100_1100, // II: blocks
    0b1110_0011, // III: edges
    0b1111_0000, // IV: halves
    0b1111_1000, // V: gradient
    0b1001_1001, // VI: mixed
];

/// Builds starting states for a given class and strategy.
#[derive(Debug, Clone)]
pub struct InitialStateBuilder {
    width: usize,
    bits_per_cell: u8,
}

impl InitialStateBuilder {
    /// Create a builder for states of the given shape.
    pub fn new(width: usize, bits_per_cell: u8) -> GeneratorResult<Self> {
        if width == 0 {
            return Err(GeneratorError::InvalidConfig {
                message: "state width must be at least 1".to_string(),
            });
        }
        if bits_per_cell == 0 || bits_per_cell > 7 {
            return Err(GeneratorError::InvalidConfig {
                message: format!("bits per cell must be in 1..=7, got {}", bits_per_cell),
            });
        }
        Ok(Self {
            width,
            bits_per_cell,
        })
    }

    /// Build a starting state.
    ///
    /// Only the `random` strategy consumes entropy; the other three are
    /// deterministic functions of position and class.
    pub fn build(
        &self,
        class: RuleClass,
        strategy: InitialStrategy,
        rng: &mut impl Rng,
    ) -> CaState {
        let cells = match strategy {
            InitialStrategy::Alternating => (0..self.width).map(|i| (i % 2) as u8).collect(),
            InitialStrategy::ClassBased => {
                let seed = CLASS_SEEDS[class.index()];
                (0..self.width).map(|i| (seed >> (i % 8)) & 1).collect()
            }
            InitialStrategy::Diverse => {
                let salt = class.index();
                (0..self.width)
                    .map(|i| ((i * 3 + salt) % 2) as u8)
                    .collect()
            }
            InitialStrategy::Random => {
                let max = (1u8 << self.bits_per_cell) - 1;
                (0..self.width).map(|_| rng.random_range(0..=max)).collect()
            }
        };
        CaState::new(cells, self.bits_per_cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn builder(width: usize) -> InitialStateBuilder {
        InitialStateBuilder::new(width, 1).unwrap()
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "class_based".parse::<InitialStrategy>().unwrap(),
            InitialStrategy::ClassBased
        );
        let err = "zigzag".parse::<InitialStrategy>().unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownStrategy { .. }));
    }

    #[test]
    fn test_alternating_pattern() {
        let mut rng = StdRng::seed_from_u64(0);
        let state = builder(6).build(RuleClass::I, InitialStrategy::Alternating, &mut rng);
        assert_eq!(state.cells(), &[0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_class_based_is_class_dependent() {
        let mut rng = StdRng::seed_from_u64(0);
        let b = builder(8);
        let one = b.build(RuleClass::I, InitialStrategy::ClassBased, &mut rng);
        let three = b.build(RuleClass::III, InitialStrategy::ClassBased, &mut rng);
        assert_ne!(one, three);
        // Seed bits are read low-to-high by position.
        assert_eq!(one.cells(), &[0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_class_based_replicates_modulo_eight() {
        let mut rng = StdRng::seed_from_u64(0);
        let state = builder(10).build(RuleClass::IV, InitialStrategy::ClassBased, &mut rng);
        assert_eq!(state.cells()[0], state.cells()[8]);
        assert_eq!(state.cells()[1], state.cells()[9]);
    }

    #[test]
    fn test_random_respects_cell_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        let b = InitialStateBuilder::new(32, 2).unwrap();
        let state = b.build(RuleClass::II, InitialStrategy::Random, &mut rng);
        assert!(state.cells().iter().all(|&c| c < 4));
    }

    #[test]
    fn test_hamming_distance() {
        let a = CaState::new(vec![1, 0, 1, 0], 1);
        let b = CaState::new(vec![1, 1, 1, 1], 1);
        assert_eq!(a.hamming(&b), 2);
        assert_eq!(a.hamming(&a), 0);
    }

    #[test]
    fn test_cell_wrapped_both_directions() {
        let state = CaState::new(vec![1, 2, 3], 2);
        assert_eq!(state.cell_wrapped(-1), 3);
        assert_eq!(state.cell_wrapped(3), 1);
        assert_eq!(state.cell_wrapped(-4), 3);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        assert!(InitialStateBuilder::new(0, 1).is_err());
        assert!(InitialStateBuilder::new(4, 0).is_err());
        assert!(InitialStateBuilder::new(4, 8).is_err());
    }
}
