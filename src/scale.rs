//! Relevance scale: the 1-4 ordinal grading used throughout the crate, and the
//! translation from the judge's 0-3 wire scale.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};

/// Minimum graded score considered relevant by the binary predicate.
/// MAP and MRR use this threshold; NDCG uses the raw graded score.
pub const RELEVANCE_THRESHOLD: u8 = 3;

/// Graded relevance on the canonical 1-4 scale.
///
/// The judge wire protocol scores 0-3; [`RelevanceScore::from_wire`] is the
/// single place that offset is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RelevanceScore {
    NotRelevant = 1,
    PartiallyRelevant = 2,
    ModeratelyRelevant = 3,
    HighlyRelevant = 4,
}

impl RelevanceScore {
    /// Numeric value on the canonical 1-4 scale.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Binary relevance predicate: score >= 3 on the 1-4 scale.
    pub fn is_relevant(self) -> bool {
        self.value() >= RELEVANCE_THRESHOLD
    }

    /// Gain term used by DCG: 2^score - 1.
    pub fn gain(self) -> f64 {
        (1u32 << self.value()) as f64 - 1.0
    }

    /// Translate a judge wire score (0-3) to the canonical scale (1-4).
    /// Out-of-range wire values are a judge protocol violation.
    pub fn from_wire(wire: u8) -> Result<Self> {
        if wire > 3 {
            return Err(EvalError::JudgeResponseInvalid(format!(
                "wire score {} outside 0-3",
                wire
            )));
        }
        // Unwrap is safe: wire+1 is within 1-4 here.
        Ok(Self::try_from(wire + 1).expect("wire score validated"))
    }
}

impl From<RelevanceScore> for u8 {
    fn from(score: RelevanceScore) -> Self {
        score.value()
    }
}

impl TryFrom<u8> for RelevanceScore {
    type Error = EvalError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(RelevanceScore::NotRelevant),
            2 => Ok(RelevanceScore::PartiallyRelevant),
            3 => Ok(RelevanceScore::ModeratelyRelevant),
            4 => Ok(RelevanceScore::HighlyRelevant),
            other => Err(EvalError::InvalidInput(format!(
                "relevance score {} outside 1-4",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_splits_scale() {
        assert!(!RelevanceScore::NotRelevant.is_relevant());
        assert!(!RelevanceScore::PartiallyRelevant.is_relevant());
        assert!(RelevanceScore::ModeratelyRelevant.is_relevant());
        assert!(RelevanceScore::HighlyRelevant.is_relevant());
    }

    #[test]
    fn gain_values() {
        assert_eq!(RelevanceScore::NotRelevant.gain(), 1.0);
        assert_eq!(RelevanceScore::PartiallyRelevant.gain(), 3.0);
        assert_eq!(RelevanceScore::ModeratelyRelevant.gain(), 7.0);
        assert_eq!(RelevanceScore::HighlyRelevant.gain(), 15.0);
    }

    #[test]
    fn wire_translation_offsets_by_one() {
        assert_eq!(
            RelevanceScore::from_wire(0).unwrap(),
            RelevanceScore::NotRelevant
        );
        assert_eq!(
            RelevanceScore::from_wire(3).unwrap(),
            RelevanceScore::HighlyRelevant
        );
        assert!(matches!(
            RelevanceScore::from_wire(4),
            Err(EvalError::JudgeResponseInvalid(_))
        ));
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(RelevanceScore::try_from(0).is_err());
        assert!(RelevanceScore::try_from(5).is_err());
    }

    #[test]
    fn serde_round_trip_as_integer() {
        let json = serde_json::to_string(&RelevanceScore::HighlyRelevant).unwrap();
        assert_eq!(json, "4");
        let back: RelevanceScore = serde_json::from_str("2").unwrap();
        assert_eq!(back, RelevanceScore::PartiallyRelevant);
        assert!(serde_json::from_str::<RelevanceScore>("7").is_err());
    }
}
