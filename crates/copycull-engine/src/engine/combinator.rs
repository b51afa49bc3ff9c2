//! Boolean reduction across the per-column outcomes of one row.

use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How the outcomes of several column predicates combine into one decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Combinator {
    /// Every predicate is true.
    #[default]
    And,
    /// At least one predicate is true.
    Or,
    /// An odd number of predicates are true.
    Xor,
}

impl Combinator {
    /// Reduce a row's outcomes. An empty sequence has no defined result and is rejected.
    pub fn reduce<I>(self, outcomes: I) -> Result<bool>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut outcomes = outcomes.into_iter();
        let first = outcomes
            .next()
            .ok_or_else(|| EngineError::InvalidCombinator("empty predicate set".to_string()))?;
        Ok(outcomes.fold(first, |acc, next| match self {
            Combinator::And => acc && next,
            Combinator::Or => acc || next,
            Combinator::Xor => acc ^ next,
        }))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Xor => "XOR",
        }
    }
}

impl FromStr for Combinator {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            "XOR" => Ok(Combinator::Xor),
            _ => Err(EngineError::InvalidCombinator(format!(
                "must be one of AND, OR, XOR (got {:?})",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Combinator {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: [(bool, bool); 4] = [(false, false), (false, true), (true, false), (true, true)];

    #[test]
    fn test_two_predicate_truth_tables() {
        for (p1, p2) in PAIRS {
            assert_eq!(Combinator::And.reduce([p1, p2]).unwrap(), p1 && p2);
            assert_eq!(Combinator::Or.reduce([p1, p2]).unwrap(), p1 || p2);
            assert_eq!(Combinator::Xor.reduce([p1, p2]).unwrap(), p1 != p2);
        }
        assert!(!Combinator::Xor.reduce([true, true]).unwrap());
        assert!(Combinator::Xor.reduce([true, false]).unwrap());
    }

    #[test]
    fn test_xor_is_odd_parity() {
        assert!(Combinator::Xor.reduce([true, true, true]).unwrap());
        assert!(!Combinator::Xor.reduce([true, false, true, false]).unwrap());
    }

    #[test]
    fn test_single_outcome_passes_through() {
        for c in [Combinator::And, Combinator::Or, Combinator::Xor] {
            assert!(c.reduce([true]).unwrap());
            assert!(!c.reduce([false]).unwrap());
        }
    }

    #[test]
    fn test_empty_outcomes_rejected() {
        let err = Combinator::Or.reduce(std::iter::empty()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCombinator(_)));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("and".parse::<Combinator>().unwrap(), Combinator::And);
        assert_eq!(" Xor ".parse::<Combinator>().unwrap(), Combinator::Xor);
        assert!("NAND".parse::<Combinator>().is_err());
    }
}
