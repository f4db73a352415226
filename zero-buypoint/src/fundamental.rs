//! Value-investing fundamental analysis.
//!
//! Aggregates the industry tier, PE and dividend scores and the
//! profit-take / rebuy checks into one bounded score:
//!
//! ```text
//! industry (0-15) + PE (0-25) + dividend (0-20) + risk penalties (<= 0)
//!                                            => clamped to [0, 60]
//! ```
//!
//! Risk penalties accumulate (every firing rule counts), while the narrative
//! comment picks at most one sentence per category.

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, IndustryScores, RiskPenalties};
use crate::industry::{IndustryClassifier, IndustryTier, StockArchetype};
use crate::rules::{Rule, RuleTable};
use crate::trade_signal::{ProfitTakeCheck, RebuyCheck, TradeSignalEvaluator};
use crate::valuation::{
    DividendAssessment, DividendStatus, PeAssessment, PeStatus, ValuationScorer,
};

/// Upper bound of the fundamental score.
pub const MAX_FUNDAMENTAL_SCORE: i32 = 60;

/// Comment used when no category has anything to say.
pub const FALLBACK_COMMENT: &str = "继续观察，鄙人不善择时。";

const SHAREHOLDER_SELLING_ITEM: &str = "⚠️ 大股东减持，心里要有疙瘩";

/// Inputs for a fundamental analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalInput {
    pub industry: String,
    pub pe: Option<f64>,
    /// Dividend yield (%)
    pub dividend_yield: Option<f64>,
    /// Gain since entry or recent low (%)
    pub price_change_pct: Option<f64>,
    /// Drop from the recent high (%)
    pub price_from_high_pct: Option<f64>,
    pub shareholder_selling: bool,
}

impl FundamentalInput {
    pub fn new(industry: impl Into<String>) -> Self {
        Self {
            industry: industry.into(),
            ..Default::default()
        }
    }

    pub fn with_pe(mut self, pe: f64) -> Self {
        self.pe = Some(pe);
        self
    }

    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    pub fn with_price_change(mut self, pct: f64) -> Self {
        self.price_change_pct = Some(pct);
        self
    }

    pub fn with_drop_from_high(mut self, pct: f64) -> Self {
        self.price_from_high_pct = Some(pct);
        self
    }

    pub fn with_shareholder_selling(mut self, selling: bool) -> Self {
        self.shareholder_selling = selling;
        self
    }
}

/// Result of a fundamental analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundamentalAssessment {
    pub industry_tier: IndustryTier,
    pub industry_comment: String,
    pub archetype: StockArchetype,
    pub industry_score: i32,

    pub pe: PeAssessment,
    pub dividend: DividendAssessment,

    pub profit_take: ProfitTakeCheck,
    pub rebuy: RebuyCheck,

    /// Triggered risk descriptions, in rule order
    pub risk_items: Vec<String>,
    /// Sum of penalty deltas (<= 0 with default penalties)
    pub risk_penalty: i32,

    /// Total, clamped to [0, 60]
    pub fundamental_score: i32,
    pub comment: String,
}

impl FundamentalAssessment {
    pub fn profit_take_alert(&self) -> bool {
        self.profit_take.signal.is_triggered()
    }

    pub fn rebuy_opportunity(&self) -> bool {
        self.rebuy.signal.is_triggered()
    }
}

// ============================================================================
// Risk rules
// ============================================================================

/// Everything the risk rules look at.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub industry_tier: IndustryTier,
    pub industry_comment: String,
    pub pe_status: PeStatus,
    pub pe_comment: String,
    pub dividend_status: DividendStatus,
    pub profit_take: ProfitTakeCheck,
    pub shareholder_selling: bool,
    pub penalties: RiskPenalties,
}

/// A fired risk rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskHit {
    pub penalty: i32,
    /// Some risks only cost points and add no item
    pub item: Option<String>,
}

/// Risk rules in the order their items are reported.
pub fn risk_rules() -> Vec<Rule<RiskContext, RiskHit>> {
    vec![
        Rule::new(
            "profit_take",
            |c: &RiskContext| c.profit_take.signal.is_triggered(),
            |c: &RiskContext| RiskHit {
                penalty: c.penalties.profit_take,
                item: Some(c.profit_take.comment.clone()),
            },
        ),
        Rule::new(
            "shareholder_selling",
            |c: &RiskContext| c.shareholder_selling,
            |c: &RiskContext| RiskHit {
                penalty: c.penalties.shareholder_selling,
                item: Some(SHAREHOLDER_SELLING_ITEM.to_string()),
            },
        ),
        Rule::new(
            "blacklist_industry",
            |c: &RiskContext| c.industry_tier == IndustryTier::Blacklist,
            |c: &RiskContext| RiskHit {
                penalty: c.penalties.blacklist_industry,
                item: Some(c.industry_comment.clone()),
            },
        ),
        Rule::new(
            "pe_danger",
            |c: &RiskContext| c.pe_status == PeStatus::Danger,
            |c: &RiskContext| RiskHit {
                penalty: c.penalties.pe_danger,
                item: Some(c.pe_comment.clone()),
            },
        ),
        Rule::new(
            "poor_dividend",
            |c: &RiskContext| c.dividend_status == DividendStatus::Poor,
            |c: &RiskContext| RiskHit {
                penalty: c.penalties.poor_dividend,
                item: None,
            },
        ),
    ]
}

// ============================================================================
// Comment rules
// ============================================================================

/// Statuses the narrative comment is chosen from.
#[derive(Debug, Clone, Copy)]
pub struct CommentContext {
    pub profit_take: bool,
    pub industry_tier: IndustryTier,
    pub pe_status: PeStatus,
    pub dividend_status: DividendStatus,
}

/// One table per category; each contributes its first matching sentence.
pub fn comment_categories() -> Vec<(&'static str, RuleTable<CommentContext, &'static str>)> {
    vec![
        (
            "profit_take",
            RuleTable::new(vec![Rule::new(
                "take_profit",
                |c: &CommentContext| c.profit_take,
                |_: &CommentContext| "兄弟，该止盈就止盈，后面涨多少那是别人的钱。",
            )]),
        ),
        (
            "industry",
            RuleTable::new(vec![
                Rule::new(
                    "preferred",
                    |c: &CommentContext| c.industry_tier == IndustryTier::Preferred,
                    |_: &CommentContext| "生产资料到手，拿着踏实。有的，兄弟，有的。",
                ),
                Rule::new(
                    "blacklist",
                    |c: &CommentContext| c.industry_tier == IndustryTier::Blacklist,
                    |_: &CommentContext| {
                        "这种内卷行业，大家都觉得自己能卷死对手，最后一起死。我不碰。"
                    },
                ),
            ]),
        ),
        (
            "pe",
            RuleTable::new(vec![
                Rule::new(
                    "danger",
                    |c: &CommentContext| c.pe_status == PeStatus::Danger,
                    |_: &CommentContext| "300PE的科技股，故事讲得再好，没有信仰，跌下来你拿不住。",
                ),
                Rule::new(
                    "ideal",
                    |c: &CommentContext| c.pe_status == PeStatus::Ideal,
                    |_: &CommentContext| "这个估值，模糊的正确远胜精确的错误，干就完了。",
                ),
            ]),
        ),
        (
            "dividend",
            RuleTable::new(vec![
                Rule::new(
                    "excellent",
                    |c: &CommentContext| c.dividend_status == DividendStatus::Excellent,
                    |_: &CommentContext| "5%以上的股息，这才是我要的生产资料。",
                ),
                Rule::new(
                    "poor",
                    |c: &CommentContext| c.dividend_status == DividendStatus::Poor,
                    |_: &CommentContext| "不分红？那不是耍流氓嘛。",
                ),
            ]),
        ),
    ]
}

// ============================================================================
// Analyzer
// ============================================================================

/// Value-investing fundamental analyzer.
#[derive(Debug, Clone)]
pub struct FundamentalAnalyzer {
    industry: IndustryClassifier,
    valuation: ValuationScorer,
    trade: TradeSignalEvaluator,
    penalties: RiskPenalties,
    industry_scores: IndustryScores,
    risk_rules: RuleTable<RiskContext, RiskHit>,
    comment_rules: Vec<(&'static str, RuleTable<CommentContext, &'static str>)>,
}

impl Default for FundamentalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FundamentalAnalyzer {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            industry: IndustryClassifier::new(),
            valuation: ValuationScorer::new(config.pe_thresholds, config.dividend_bands),
            trade: TradeSignalEvaluator::new(config.trade),
            penalties: config.penalties,
            industry_scores: config.industry_scores,
            risk_rules: RuleTable::new(risk_rules()),
            comment_rules: comment_categories(),
        }
    }

    /// Replace the industry keyword tables.
    pub fn with_industry_classifier(mut self, classifier: IndustryClassifier) -> Self {
        self.industry = classifier;
        self
    }

    pub fn industry_classifier(&self) -> &IndustryClassifier {
        &self.industry
    }

    pub fn valuation(&self) -> &ValuationScorer {
        &self.valuation
    }

    pub fn trade_signals(&self) -> &TradeSignalEvaluator {
        &self.trade
    }

    pub fn risk_table(&self) -> &RuleTable<RiskContext, RiskHit> {
        &self.risk_rules
    }

    /// Run the full fundamental analysis.
    pub fn analyze(&self, input: &FundamentalInput) -> FundamentalAssessment {
        // 1. Industry
        let tier = self.industry.classify_industry(&input.industry);
        let archetype = self.industry.classify_stock_type(&input.industry);
        let industry_score = self.industry_scores.for_tier(tier.tier);

        // 2. Valuation
        let pe = self.valuation.evaluate_pe(input.pe, archetype);
        let dividend = self.valuation.evaluate_dividend(input.dividend_yield);

        // 3. Trade signals
        let profit_take = self.trade.check_profit_take(input.price_change_pct);
        let rebuy = self.trade.check_rebuy(input.price_from_high_pct);

        // 4. Risks
        let risk_ctx = RiskContext {
            industry_tier: tier.tier,
            industry_comment: tier.comment.clone(),
            pe_status: pe.status,
            pe_comment: pe.comment.clone(),
            dividend_status: dividend.status,
            profit_take: profit_take.clone(),
            shareholder_selling: input.shareholder_selling,
            penalties: self.penalties,
        };
        let hits = self.risk_rules.all_matches(&risk_ctx);
        let risk_penalty = hits
            .iter()
            .fold(0i32, |acc, hit| acc.saturating_add(hit.outcome.penalty));
        let risk_items: Vec<String> = hits
            .iter()
            .filter_map(|hit| hit.outcome.item.clone())
            .filter(|item| !item.is_empty())
            .collect();

        // 5. Score
        let raw = industry_score
            .saturating_add(i32::from(pe.score))
            .saturating_add(i32::from(dividend.score))
            .saturating_add(risk_penalty);
        let fundamental_score = raw.clamp(0, MAX_FUNDAMENTAL_SCORE);

        // 6. Comment
        let comment = self.comment(&CommentContext {
            profit_take: profit_take.signal.is_triggered(),
            industry_tier: tier.tier,
            pe_status: pe.status,
            dividend_status: dividend.status,
        });

        tracing::debug!(
            industry = %input.industry,
            tier = ?tier.tier,
            archetype = ?archetype,
            pe_status = ?pe.status,
            dividend_status = ?dividend.status,
            risks = ?hits.iter().map(|h| h.rule).collect::<Vec<_>>(),
            raw_score = raw,
            fundamental_score,
            "Fundamental analysis complete"
        );

        FundamentalAssessment {
            industry_tier: tier.tier,
            industry_comment: tier.comment,
            archetype,
            industry_score,
            pe,
            dividend,
            profit_take,
            rebuy,
            risk_items,
            risk_penalty,
            fundamental_score,
            comment,
        }
    }

    /// One sentence per category that has something to say, in category order.
    pub fn comment(&self, ctx: &CommentContext) -> String {
        let parts: Vec<&'static str> = self
            .comment_rules
            .iter()
            .filter_map(|(_, table)| table.first_match(ctx).map(|fired| fired.outcome))
            .collect();

        if parts.is_empty() {
            FALLBACK_COMMENT.to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade_signal::ProfitTakeSignal;

    #[test]
    fn test_preferred_bank_with_high_dividend() {
        let analyzer = FundamentalAnalyzer::new();
        let result = analyzer.analyze(
            &FundamentalInput::new("银行")
                .with_pe(5.5)
                .with_dividend_yield(5.5),
        );

        assert_eq!(result.industry_tier, IndustryTier::Preferred);
        assert_eq!(result.archetype, StockArchetype::Banking);
        assert_eq!(result.industry_score, 15);
        assert_eq!(result.pe.status, PeStatus::Acceptable);
        assert_eq!(result.dividend.status, DividendStatus::Excellent);
        assert_eq!(result.risk_penalty, 0);
        assert_eq!(result.fundamental_score, 55);
        assert_eq!(
            result.comment,
            "生产资料到手，拿着踏实。有的，兄弟，有的。 5%以上的股息，这才是我要的生产资料。"
        );
    }

    #[test]
    fn test_all_risks_accumulate_in_order() {
        let analyzer = FundamentalAnalyzer::new();
        let result = analyzer.analyze(
            &FundamentalInput::new("光伏设备")
                .with_pe(80.0)
                .with_dividend_yield(0.2)
                .with_price_change(60.0)
                .with_shareholder_selling(true),
        );

        assert_eq!(result.profit_take.signal, ProfitTakeSignal::Hard);
        assert_eq!(result.risk_penalty, -28);
        assert_eq!(result.fundamental_score, 0);
        assert_eq!(result.risk_items.len(), 4);
        assert!(result.risk_items[0].starts_with("🔴 涨幅60.0%"));
        assert_eq!(result.risk_items[1], "⚠️ 大股东减持，心里要有疙瘩");
        assert!(result.risk_items[2].contains("黑名单行业"));
        assert!(result.risk_items[3].starts_with("❌ PE=80.0"));
        assert!(result.comment.starts_with("兄弟，该止盈就止盈"));
        assert!(result.comment.ends_with("不分红？那不是耍流氓嘛。"));
    }

    #[test]
    fn test_missing_everything_uses_fallbacks() {
        let analyzer = FundamentalAnalyzer::new();
        let result = analyzer.analyze(&FundamentalInput::default());

        assert_eq!(result.industry_comment, "行业信息缺失");
        assert_eq!(result.pe.status, PeStatus::Unknown);
        assert_eq!(result.dividend.status, DividendStatus::Unknown);
        // normal 10 + unknown PE 10 + unknown dividend 5
        assert_eq!(result.fundamental_score, 25);
        assert!(result.risk_items.is_empty());
        assert_eq!(result.comment, FALLBACK_COMMENT);
        assert!(!result.profit_take_alert());
        assert!(!result.rebuy_opportunity());
    }

    #[test]
    fn test_poor_dividend_penalizes_without_item() {
        let analyzer = FundamentalAnalyzer::new();
        let result = analyzer.analyze(&FundamentalInput::new("机械").with_dividend_yield(0.5));
        assert_eq!(result.risk_penalty, -3);
        assert!(result.risk_items.is_empty());
    }

    #[test]
    fn test_rebuy_does_not_affect_score() {
        let analyzer = FundamentalAnalyzer::new();
        let base = analyzer.analyze(&FundamentalInput::new("机械"));
        let dipped = analyzer.analyze(&FundamentalInput::new("机械").with_drop_from_high(18.0));
        assert!(dipped.rebuy_opportunity());
        assert_eq!(base.fundamental_score, dipped.fundamental_score);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let analyzer = FundamentalAnalyzer::new();
        assert_eq!(
            analyzer.risk_table().names(),
            vec![
                "profit_take",
                "shareholder_selling",
                "blacklist_industry",
                "pe_danger",
                "poor_dividend"
            ]
        );
        let categories: Vec<&str> = comment_categories().iter().map(|(name, _)| *name).collect();
        assert_eq!(categories, vec!["profit_take", "industry", "pe", "dividend"]);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = FundamentalAnalyzer::new();
        let input = FundamentalInput::new("白酒")
            .with_pe(28.0)
            .with_dividend_yield(2.1)
            .with_price_change(33.0);
        let a = serde_json::to_string(&analyzer.analyze(&input)).unwrap();
        let b = serde_json::to_string(&analyzer.analyze(&input)).unwrap();
        assert_eq!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn prop_score_always_clamped(
            industry in proptest::sample::select(vec!["", "银行", "光伏设备", "白酒", "软件", "机械"]),
            pe in proptest::option::of(-50.0f64..1000.0),
            dividend_yield in proptest::option::of(-1.0f64..30.0),
            change in proptest::option::of(-90.0f64..300.0),
            selling in proptest::bool::ANY,
            penalty in -10_000i32..=0,
            bonus in 0i32..=10_000,
        ) {
            let mut config = EngineConfig::default();
            config.penalties = RiskPenalties {
                profit_take: penalty,
                shareholder_selling: penalty,
                blacklist_industry: penalty,
                pe_danger: penalty,
                poor_dividend: penalty,
            };
            config.industry_scores.preferred = bonus;
            let analyzer = FundamentalAnalyzer::with_config(&config);

            let input = FundamentalInput {
                industry: industry.to_string(),
                pe,
                dividend_yield,
                price_change_pct: change,
                price_from_high_pct: None,
                shareholder_selling: selling,
            };
            let result = analyzer.analyze(&input);
            proptest::prop_assert!((0..=MAX_FUNDAMENTAL_SCORE).contains(&result.fundamental_score));
        }
    }
}
