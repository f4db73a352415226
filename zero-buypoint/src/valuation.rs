//! Valuation scoring.
//!
//! Scores a PE ratio against the archetype-specific threshold row and a
//! dividend yield against fixed bands. Missing data never fails: it yields
//! the `Unknown` status with a middle-of-the-road fallback score.

use serde::{Deserialize, Serialize};

use crate::config::{DividendBands, PeThresholdTable};
use crate::industry::StockArchetype;

/// PE score fallback when PE is missing or non-positive.
pub const PE_UNKNOWN_SCORE: u8 = 10;

/// Dividend score fallback when the yield is missing.
pub const DIVIDEND_UNKNOWN_SCORE: u8 = 5;

/// PE valuation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeStatus {
    Ideal,
    Acceptable,
    Warning,
    Danger,
    Unknown,
}

impl PeStatus {
    /// Score for this tier (0-25).
    pub const fn score(&self) -> u8 {
        match self {
            Self::Ideal => 25,
            Self::Acceptable => 20,
            Self::Warning => 10,
            Self::Danger => 0,
            Self::Unknown => PE_UNKNOWN_SCORE,
        }
    }
}

impl std::fmt::Display for PeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ideal => write!(f, "理想"),
            Self::Acceptable => write!(f, "可接受"),
            Self::Warning => write!(f, "警告"),
            Self::Danger => write!(f, "危险"),
            Self::Unknown => write!(f, "未知"),
        }
    }
}

/// Dividend yield tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendStatus {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Unknown,
}

impl DividendStatus {
    /// Score for this tier (0-20).
    pub const fn score(&self) -> u8 {
        match self {
            Self::Excellent => 20,
            Self::Good => 15,
            Self::Acceptable => 8,
            Self::Poor => 0,
            Self::Unknown => DIVIDEND_UNKNOWN_SCORE,
        }
    }
}

impl std::fmt::Display for DividendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "优秀"),
            Self::Good => write!(f, "良好"),
            Self::Acceptable => write!(f, "可接受"),
            Self::Poor => write!(f, "差"),
            Self::Unknown => write!(f, "未知"),
        }
    }
}

/// PE evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeAssessment {
    pub status: PeStatus,
    pub score: u8,
    pub comment: String,
}

/// Dividend yield evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendAssessment {
    pub status: DividendStatus,
    pub score: u8,
    pub comment: String,
}

/// Combined PE and dividend score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationScore {
    pub pe: PeAssessment,
    pub dividend: DividendAssessment,
}

/// PE and dividend scorer.
#[derive(Debug, Clone, Default)]
pub struct ValuationScorer {
    pe_thresholds: PeThresholdTable,
    dividend_bands: DividendBands,
}

impl ValuationScorer {
    pub fn new(pe_thresholds: PeThresholdTable, dividend_bands: DividendBands) -> Self {
        Self {
            pe_thresholds,
            dividend_bands,
        }
    }

    /// Tier a PE against the archetype's thresholds.
    ///
    /// Anything above the warning row is `Danger`; the danger row is kept
    /// for display and validation.
    pub fn pe_status(&self, pe: Option<f64>, archetype: StockArchetype) -> PeStatus {
        let Some(pe) = pe.filter(|p| p.is_finite() && *p > 0.0) else {
            return PeStatus::Unknown;
        };

        let t = self.pe_thresholds.for_archetype(archetype);
        if pe <= t.ideal {
            PeStatus::Ideal
        } else if pe <= t.acceptable {
            PeStatus::Acceptable
        } else if pe <= t.warning {
            PeStatus::Warning
        } else {
            PeStatus::Danger
        }
    }

    /// Evaluate a PE ratio.
    pub fn evaluate_pe(&self, pe: Option<f64>, archetype: StockArchetype) -> PeAssessment {
        let status = self.pe_status(pe, archetype);
        let pe = pe.unwrap_or_default();

        let comment = match status {
            PeStatus::Ideal => format!("✅ PE={:.1}，估值极具吸引力，Dang氏认可的好价格", pe),
            PeStatus::Acceptable => format!("✅ PE={:.1}，估值合理，可以考虑建仓", pe),
            PeStatus::Warning => format!("⚠️ PE={:.1}，估值偏高，容易'挂旗杆'", pe),
            PeStatus::Danger => format!("❌ PE={:.1}，估值过高，Dang氏铁律：坚决不碰！", pe),
            PeStatus::Unknown => "PE数据缺失或为负，无法判断".to_string(),
        };

        tracing::debug!(pe, archetype = ?archetype, status = ?status, "PE evaluated");

        PeAssessment {
            status,
            score: status.score(),
            comment,
        }
    }

    /// Tier a dividend yield (%).
    pub fn dividend_status(&self, dividend_yield: Option<f64>) -> DividendStatus {
        let Some(dy) = dividend_yield.filter(|d| d.is_finite()) else {
            return DividendStatus::Unknown;
        };

        let bands = &self.dividend_bands;
        if dy >= bands.excellent {
            DividendStatus::Excellent
        } else if dy >= bands.good {
            DividendStatus::Good
        } else if dy >= bands.acceptable {
            DividendStatus::Acceptable
        } else {
            DividendStatus::Poor
        }
    }

    /// Evaluate a dividend yield (%).
    pub fn evaluate_dividend(&self, dividend_yield: Option<f64>) -> DividendAssessment {
        let status = self.dividend_status(dividend_yield);
        let dy = dividend_yield.unwrap_or_default();

        let comment = match status {
            DividendStatus::Excellent => {
                format!("✅ 股息率{:.2}%，这才是Dang氏最爱的生产资料！", dy)
            }
            DividendStatus::Good => format!("✅ 股息率{:.2}%，分红稳定，值得关注", dy),
            DividendStatus::Acceptable => {
                format!("⚡ 股息率{:.2}%，分红一般，看其他因素", dy)
            }
            DividendStatus::Poor => {
                format!("⚠️ 股息率{:.2}%或不分红，Dang氏说这是'耍流氓'", dy)
            }
            DividendStatus::Unknown => "股息数据缺失".to_string(),
        };

        DividendAssessment {
            status,
            score: status.score(),
            comment,
        }
    }

    /// Score both dimensions.
    pub fn score(
        &self,
        pe: Option<f64>,
        dividend_yield: Option<f64>,
        archetype: StockArchetype,
    ) -> ValuationScore {
        ValuationScore {
            pe: self.evaluate_pe(pe, archetype),
            dividend: self.evaluate_dividend(dividend_yield),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(5.5, StockArchetype::Banking, PeStatus::Acceptable)]
    #[test_case(4.0, StockArchetype::Banking, PeStatus::Ideal)]
    #[test_case(12.5, StockArchetype::Banking, PeStatus::Danger)]
    #[test_case(35.0, StockArchetype::Default, PeStatus::Danger)]
    #[test_case(30.0, StockArchetype::Default, PeStatus::Warning)]
    #[test_case(30.01, StockArchetype::Default, PeStatus::Danger)]
    #[test_case(350.0, StockArchetype::Tech, PeStatus::Danger)]
    #[test_case(250.0, StockArchetype::Tech, PeStatus::Danger)]
    #[test_case(100.0, StockArchetype::Tech, PeStatus::Warning)]
    #[test_case(100.5, StockArchetype::Tech, PeStatus::Danger)]
    #[test_case(90.0, StockArchetype::Tech, PeStatus::Warning)]
    #[test_case(15.0, StockArchetype::Cyclical, PeStatus::Acceptable)]
    fn test_pe_tiers(pe: f64, archetype: StockArchetype, expected: PeStatus) {
        let scorer = ValuationScorer::default();
        assert_eq!(scorer.evaluate_pe(Some(pe), archetype).status, expected);
    }

    #[test]
    fn test_pe_missing_or_negative() {
        let scorer = ValuationScorer::default();
        for pe in [None, Some(0.0), Some(-8.0), Some(f64::NAN)] {
            let result = scorer.evaluate_pe(pe, StockArchetype::Default);
            assert_eq!(result.status, PeStatus::Unknown);
            assert_eq!(result.score, 10);
        }
    }

    #[test]
    fn test_pe_scores_strictly_decrease() {
        let scores: Vec<u8> = [
            PeStatus::Ideal,
            PeStatus::Acceptable,
            PeStatus::Warning,
            PeStatus::Danger,
        ]
        .iter()
        .map(PeStatus::score)
        .collect();
        assert_eq!(scores, vec![25, 20, 10, 0]);
    }

    #[test_case(5.0, DividendStatus::Excellent, 20)]
    #[test_case(4.99, DividendStatus::Good, 15)]
    #[test_case(3.0, DividendStatus::Good, 15)]
    #[test_case(1.0, DividendStatus::Acceptable, 8)]
    #[test_case(0.99, DividendStatus::Poor, 0)]
    #[test_case(0.0, DividendStatus::Poor, 0)]
    fn test_dividend_bands(dy: f64, status: DividendStatus, score: u8) {
        let scorer = ValuationScorer::default();
        let result = scorer.evaluate_dividend(Some(dy));
        assert_eq!(result.status, status);
        assert_eq!(result.score, score);
    }

    #[test]
    fn test_dividend_missing() {
        let result = ValuationScorer::default().evaluate_dividend(None);
        assert_eq!(result.status, DividendStatus::Unknown);
        assert_eq!(result.score, 5);
        assert_eq!(result.comment, "股息数据缺失");
    }

    proptest::proptest! {
        #[test]
        fn prop_pe_score_never_rises_with_pe(a in 0.1f64..500.0, b in 0.1f64..500.0) {
            let scorer = ValuationScorer::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for archetype in [
                StockArchetype::Cyclical,
                StockArchetype::Banking,
                StockArchetype::Tech,
                StockArchetype::Consumer,
                StockArchetype::Default,
            ] {
                let cheap = scorer.evaluate_pe(Some(lo), archetype).score;
                let dear = scorer.evaluate_pe(Some(hi), archetype).score;
                proptest::prop_assert!(cheap >= dear);
            }
        }

        #[test]
        fn prop_dividend_score_never_falls_with_yield(a in 0.0f64..20.0, b in 0.0f64..20.0) {
            let scorer = ValuationScorer::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            proptest::prop_assert!(
                scorer.evaluate_dividend(Some(lo)).score <= scorer.evaluate_dividend(Some(hi)).score
            );
        }
    }
}
