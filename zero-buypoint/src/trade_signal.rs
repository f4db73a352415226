//! Profit-take and rebuy triggers.
//!
//! Both checks take a percentage move: the gain since entry (or a recent
//! low) for profit-taking, the drop from the recent high for rebuying.

use serde::{Deserialize, Serialize};

use crate::config::TradeThresholds;

/// Profit-take trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitTakeSignal {
    /// Gain at or above the hard line: must take profit
    Hard,
    /// Gain at or above the soft line: taking profit advised
    Soft,
    None,
}

impl ProfitTakeSignal {
    pub const fn is_triggered(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for ProfitTakeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hard => write!(f, "强制止盈"),
            Self::Soft => write!(f, "建议止盈"),
            Self::None => write!(f, "无"),
        }
    }
}

/// Rebuy trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuySignal {
    Ideal,
    Partial,
    None,
}

impl RebuySignal {
    pub const fn is_triggered(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for RebuySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ideal => write!(f, "理想补仓"),
            Self::Partial => write!(f, "小额补仓"),
            Self::None => write!(f, "无"),
        }
    }
}

/// Profit-take check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitTakeCheck {
    pub signal: ProfitTakeSignal,
    /// Empty when nothing fired
    pub comment: String,
}

/// Rebuy check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuyCheck {
    pub signal: RebuySignal,
    pub comment: String,
}

/// Evaluates profit-take and rebuy triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeSignalEvaluator {
    thresholds: TradeThresholds,
}

impl TradeSignalEvaluator {
    pub fn new(thresholds: TradeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TradeThresholds {
        &self.thresholds
    }

    /// Check whether a gain (%) calls for taking profit.
    pub fn check_profit_take(&self, change_pct: Option<f64>) -> ProfitTakeCheck {
        let Some(pct) = change_pct.filter(|p| p.is_finite()) else {
            return ProfitTakeCheck {
                signal: ProfitTakeSignal::None,
                comment: String::new(),
            };
        };

        let (signal, comment) = if pct >= self.thresholds.profit_take_hard {
            (
                ProfitTakeSignal::Hard,
                format!(
                    "🔴 涨幅{:.1}%，Dang氏铁律：超{:.0}%必须止盈，不管后面涨多少那是别人的钱！",
                    pct, self.thresholds.profit_take_hard
                ),
            )
        } else if pct >= self.thresholds.profit_take_soft {
            (
                ProfitTakeSignal::Soft,
                format!(
                    "🟠 涨幅{:.1}%，达到{:.0}%止盈线，Dang氏建议落袋为安",
                    pct, self.thresholds.profit_take_soft
                ),
            )
        } else {
            (ProfitTakeSignal::None, String::new())
        };

        if signal.is_triggered() {
            tracing::debug!(change_pct = pct, signal = ?signal, "Profit-take triggered");
        }

        ProfitTakeCheck { signal, comment }
    }

    /// Check whether a drop from the high (%) is a rebuy opportunity.
    pub fn check_rebuy(&self, drop_pct: Option<f64>) -> RebuyCheck {
        let Some(pct) = drop_pct.filter(|p| p.is_finite()) else {
            return RebuyCheck {
                signal: RebuySignal::None,
                comment: String::new(),
            };
        };

        if pct >= self.thresholds.rebuy_ideal {
            RebuyCheck {
                signal: RebuySignal::Ideal,
                comment: format!("✅ 下跌{:.1}%，达到理想补仓位，可拉开距离建仓", pct),
            }
        } else if pct >= self.thresholds.rebuy_partial {
            RebuyCheck {
                signal: RebuySignal::Partial,
                comment: format!("⚡ 下跌{:.1}%，可考虑小额补仓", pct),
            }
        } else {
            RebuyCheck {
                signal: RebuySignal::None,
                comment: format!(
                    "跌幅不足{:.0}%，Dang氏说不要急着补仓",
                    self.thresholds.rebuy_partial
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some(55.0), ProfitTakeSignal::Hard)]
    #[test_case(Some(50.0), ProfitTakeSignal::Hard)]
    #[test_case(Some(49.9), ProfitTakeSignal::Soft)]
    #[test_case(Some(30.0), ProfitTakeSignal::Soft)]
    #[test_case(Some(29.9), ProfitTakeSignal::None)]
    #[test_case(Some(-12.0), ProfitTakeSignal::None)]
    #[test_case(None, ProfitTakeSignal::None)]
    fn test_profit_take(change: Option<f64>, expected: ProfitTakeSignal) {
        let evaluator = TradeSignalEvaluator::default();
        assert_eq!(evaluator.check_profit_take(change).signal, expected);
    }

    #[test]
    fn test_profit_take_comments() {
        let evaluator = TradeSignalEvaluator::default();
        let hard = evaluator.check_profit_take(Some(62.0));
        assert!(hard.comment.starts_with("🔴 涨幅62.0%"));
        assert!(hard.comment.contains("超50%必须止盈"));

        let soft = evaluator.check_profit_take(Some(35.0));
        assert!(soft.comment.contains("达到30%止盈线"));

        assert!(evaluator.check_profit_take(Some(5.0)).comment.is_empty());
    }

    #[test_case(Some(20.0), RebuySignal::Ideal)]
    #[test_case(Some(15.0), RebuySignal::Ideal)]
    #[test_case(Some(12.0), RebuySignal::Partial)]
    #[test_case(Some(10.0), RebuySignal::Partial)]
    #[test_case(Some(9.9), RebuySignal::None)]
    #[test_case(None, RebuySignal::None)]
    fn test_rebuy(drop: Option<f64>, expected: RebuySignal) {
        let evaluator = TradeSignalEvaluator::default();
        assert_eq!(evaluator.check_rebuy(drop).signal, expected);
    }

    #[test]
    fn test_rebuy_shallow_drop_advises_patience() {
        let evaluator = TradeSignalEvaluator::default();
        let check = evaluator.check_rebuy(Some(4.0));
        assert!(!check.signal.is_triggered());
        assert_eq!(check.comment, "跌幅不足10%，Dang氏说不要急着补仓");

        assert!(evaluator.check_rebuy(None).comment.is_empty());
    }
}
