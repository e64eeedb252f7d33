//! The rule-class transition grammar.
//!
//! Rules are plain integer identifiers; classes are a closed set of six
//! grammar symbols. The grammar answers three questions: which classes a
//! rule satisfies, which class applying a rule transitions *into*, and
//! which rules are allowed to close a sequence. It is pure lookup data,
//! read-only after construction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, GeneratorResult};

/// One of the six behavioral classes constraining rule sequencing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RuleClass {
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl RuleClass {
    /// All classes in canonical (lexicographic label) order.
    pub const ALL: [RuleClass; 6] = [
        RuleClass::I,
        RuleClass::II,
        RuleClass::III,
        RuleClass::IV,
        RuleClass::V,
        RuleClass::VI,
    ];

    /// Stable small index for this class (0..6).
    pub fn index(self) -> usize {
        match self {
            RuleClass::I => 0,
            RuleClass::II => 1,
            RuleClass::III => 2,
            RuleClass::IV => 3,
            RuleClass::V => 4,
            RuleClass::VI => 5,
        }
    }
}

impl fmt::Display for RuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuleClass::I => "I",
            RuleClass::II => "II",
            RuleClass::III => "III",
            RuleClass::IV => "IV",
            RuleClass::V => "V",
            RuleClass::VI => "VI",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for RuleClass {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(RuleClass::I),
            "II" => Ok(RuleClass::II),
            "III" => Ok(RuleClass::III),
            "IV" => Ok(RuleClass::IV),
            "V" => Ok(RuleClass::V),
            "VI" => Ok(RuleClass::VI),
            other => Err(GeneratorError::InvalidConfig {
                message: format!("unknown rule class: {}", other),
            }),
        }
    }
}

use RuleClass::{I, II, III, IV, V, VI};

/// (rule, classes it satisfies, class it transitions into).
const RULE_TABLE: &[(u32, &[RuleClass], RuleClass)] = &[
    (5, &[II, III, VI], II),
    (15, &[II, III, VI], II),
    (17, &[I, V], I),
    (20, &[III], III),
    (23, &[III], III),
    (27, &[III], III),
    (30, &[II], II),
    (39, &[III], III),
    (43, &[III], III),
    (45, &[II], II),
    (51, &[I, III, V], I),
    (53, &[I], I),
    (54, &[I], I),
    (57, &[I], I),
    (58, &[I], I),
    (60, &[I, II, IV], IV),
    (65, &[III], III),
    (68, &[III], III),
    (75, &[II], II),
    (77, &[III], III),
    (78, &[III], III),
    (80, &[III], III),
    (83, &[I], I),
    (85, &[I, II, III, V], II),
    (86, &[I, III, V], I),
    (89, &[I, III, V], I),
    (90, &[I, II, III, IV, V, VI], IV),
    (92, &[I], I),
    (99, &[I], I),
    (101, &[I, III, V], I),
    (102, &[I, III, V], III),
    (105, &[I, III, IV, V, VI], IV),
    (106, &[I, III, V], I),
    (108, &[I], I),
    (113, &[III], III),
    (114, &[III], III),
    (120, &[II], II),
    (135, &[II], II),
    (141, &[III], III),
    (142, &[III], III),
    (147, &[I], I),
    (149, &[I, III, V], I),
    (150, &[II, III, IV, V, VI], IV),
    (153, &[I, III, V], III),
    (154, &[I, III, V], I),
    (156, &[I], I),
    (163, &[I], I),
    (165, &[I, II, III, V, VI], II),
    (166, &[I, III, V], I),
    (169, &[I, III, V], I),
    (170, &[I, II, V], II),
    (172, &[I], I),
    (177, &[III], III),
    (178, &[III], III),
    (180, &[II], II),
    (195, &[I, IV], IV),
    (196, &[III], III),
    (197, &[I], I),
    (198, &[I], I),
    (201, &[I, V], I),
    (202, &[I], I),
    (204, &[I, III], I),
    (210, &[II], II),
    (212, &[III], III),
    (216, &[III], III),
    (225, &[II], II),
    (228, &[III], III),
    (232, &[III], III),
    (240, &[II, III, VI], II),
];

/// Allowed closing rules, keyed by the class of the previous rule.
const TERMINAL_TABLE: &[(RuleClass, &[u32])] = &[
    (I, &[17, 20, 65, 68]),
    (II, &[5, 20, 65, 80]),
    (III, &[5, 17, 68, 80]),
    (IV, &[20, 65]),
    (V, &[17, 68]),
    (VI, &[5, 80]),
];

/// Extra nonlinear candidates per class, drawn from the Majority, XOR,
/// Totalistic and Threshold identifier bands.
const NONLINEAR_TABLE: &[(RuleClass, &[u32])] = &[
    (I, &[1001, 2025, 3010, 4050]),
    (II, &[1050, 2075, 3050, 4100]),
    (III, &[1075, 2100, 3075, 4150]),
    (IV, &[1100, 2150, 3100, 4200]),
    (V, &[1025, 2050, 3025, 4075]),
    (VI, &[1150, 2200, 3150, 4250]),
];

/// Extended-neighborhood candidates, legal for any class once the state
/// is wide enough for a 5-cell window.
const EXTENDED_RULES: &[u32] = &[5025, 5050, 5075, 5100];

/// Minimum state width for extended-neighborhood candidates.
pub const EXTENDED_MIN_WIDTH: usize = 5;

/// Static lookup tables for legal rule sequencing.
///
/// All query results are deterministic: candidate lists come back in
/// ascending identifier order, and class iteration follows the canonical
/// class order.
#[derive(Debug, Clone)]
pub struct RuleGrammar {
    classes_of: BTreeMap<u32, BTreeSet<RuleClass>>,
    next_class_of: BTreeMap<u32, RuleClass>,
    terminal_rules: BTreeMap<RuleClass, Vec<u32>>,
    nonlinear_rules: BTreeMap<RuleClass, Vec<u32>>,
}

impl Default for RuleGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleGrammar {
    /// Build the grammar from the built-in tables.
    pub fn new() -> Self {
        let mut classes_of = BTreeMap::new();
        let mut next_class_of = BTreeMap::new();
        for (rule, classes, next) in RULE_TABLE {
            classes_of.insert(*rule, classes.iter().copied().collect());
            next_class_of.insert(*rule, *next);
        }

        let terminal_rules = TERMINAL_TABLE
            .iter()
            .map(|(class, rules)| (*class, rules.to_vec()))
            .collect();
        let nonlinear_rules = NONLINEAR_TABLE
            .iter()
            .map(|(class, rules)| (*class, rules.to_vec()))
            .collect();

        Self {
            classes_of,
            next_class_of,
            terminal_rules,
            nonlinear_rules,
        }
    }

    /// Classes the given rule satisfies, if the rule is known.
    pub fn classes_of(&self, rule: u32) -> Option<&BTreeSet<RuleClass>> {
        self.classes_of.get(&rule)
    }

    /// The class applying this rule transitions into.
    pub fn next_class_of(&self, rule: u32) -> Option<RuleClass> {
        self.next_class_of.get(&rule).copied()
    }

    /// All rules known to the grammar, ascending.
    pub fn rules(&self) -> impl Iterator<Item = u32> + '_ {
        self.classes_of.keys().copied()
    }

    /// All rules satisfying the given class, in ascending identifier order.
    pub fn candidates_for_class(&self, class: RuleClass) -> Vec<u32> {
        self.classes_of
            .iter()
            .filter(|(_, classes)| classes.contains(&class))
            .map(|(rule, _)| *rule)
            .collect()
    }

    /// Candidates for a class including the nonlinear expansion.
    ///
    /// Extended-neighborhood rules join the pool only when the state is
    /// at least [`EXTENDED_MIN_WIDTH`] cells wide.
    pub fn expanded_candidates(&self, class: RuleClass, width: usize) -> Vec<u32> {
        let mut candidates = self.candidates_for_class(class);
        if let Some(extra) = self.nonlinear_rules.get(&class) {
            candidates.extend_from_slice(extra);
        }
        if width >= EXTENDED_MIN_WIDTH {
            candidates.extend_from_slice(EXTENDED_RULES);
        }
        candidates
    }

    /// Deterministic first rule for a start class: the numerically
    /// smallest rule satisfying it.
    pub fn first_rule(&self, class: RuleClass) -> GeneratorResult<u32> {
        self.candidates_for_class(class)
            .first()
            .copied()
            .ok_or(GeneratorError::GrammarExhausted { class })
    }

    /// Closing rule for a sequence whose last applied rule was `prev_rule`.
    ///
    /// Iterates the previous rule's class memberships in canonical order
    /// and returns the smallest terminal rule of the first class that has
    /// a terminal entry.
    pub fn terminal_rule(&self, prev_rule: u32) -> Option<u32> {
        let classes = self.classes_of.get(&prev_rule)?;
        for class in classes {
            if let Some(rules) = self.terminal_rules.get(class) {
                return rules.iter().min().copied();
            }
        }
        None
    }

    /// Terminal rules registered for a class.
    pub fn terminal_rules_of(&self, class: RuleClass) -> &[u32] {
        self.terminal_rules
            .get(&class)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Check that every class reachable via `next_class_of` has at least
    /// one satisfying rule. A failure here is a configuration defect.
    pub fn validate(&self) -> GeneratorResult<()> {
        for class in self.next_class_of.values() {
            if self.candidates_for_class(*class).is_empty() {
                return Err(GeneratorError::GrammarExhausted { class: *class });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_parse_round_trip() {
        for class in RuleClass::ALL {
            let parsed: RuleClass = class.to_string().parse().unwrap();
            assert_eq!(parsed, class);
        }
        assert!("VII".parse::<RuleClass>().is_err());
    }

    #[test]
    fn test_candidates_ascending() {
        let grammar = RuleGrammar::new();
        let candidates = grammar.candidates_for_class(RuleClass::III);
        assert!(!candidates.is_empty());
        assert!(candidates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_first_rule_for_class_three() {
        let grammar = RuleGrammar::new();
        // 5 satisfies {II, III, VI} and is the smallest rule with III.
        assert_eq!(grammar.first_rule(RuleClass::III).unwrap(), 5);
    }

    #[test]
    fn test_next_class_lookup() {
        let grammar = RuleGrammar::new();
        assert_eq!(grammar.next_class_of(90), Some(RuleClass::IV));
        assert_eq!(grammar.next_class_of(85), Some(RuleClass::II));
        assert_eq!(grammar.next_class_of(9999), None);
    }

    #[test]
    fn test_terminal_rule_canonical_order() {
        let grammar = RuleGrammar::new();
        // Rule 90 belongs to every class; class I comes first and its
        // smallest terminal rule is 17.
        assert_eq!(grammar.terminal_rule(90), Some(17));
        // Rule 20 belongs only to III; smallest terminal for III is 5.
        assert_eq!(grammar.terminal_rule(20), Some(5));
    }

    #[test]
    fn test_expanded_candidates_include_nonlinear() {
        let grammar = RuleGrammar::new();
        let narrow = grammar.expanded_candidates(RuleClass::I, 4);
        assert!(narrow.contains(&1001));
        assert!(!narrow.contains(&5025));

        let wide = grammar.expanded_candidates(RuleClass::I, 6);
        assert!(wide.contains(&5025));
    }

    #[test]
    fn test_grammar_satisfiable() {
        RuleGrammar::new().validate().unwrap();
    }
}
