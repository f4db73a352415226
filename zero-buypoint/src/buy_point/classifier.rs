//! Buy-point labeling.
//!
//! Combines the short-term signal with the price position relative to MA120
//! into a final label, then looks up the matching advice sentence.

use serde::{Deserialize, Serialize};

use super::short_signal::ShortSignal;
use crate::config::PositionConfig;
use crate::rules::{Rule, RuleTable};

/// Price position relative to MA120.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ma120Status {
    /// More than the band below MA120
    Below,
    /// Within the band, inclusive
    Near,
    /// More than the band above MA120
    Above,
}

impl Ma120Status {
    /// Classify a deviation (%) with a symmetric band, e.g. ±3.
    pub fn from_deviation(deviation_pct: f64, band_pct: f64) -> Self {
        if deviation_pct < -band_pct {
            Self::Below
        } else if deviation_pct <= band_pct {
            Self::Near
        } else {
            Self::Above
        }
    }
}

impl std::fmt::Display for Ma120Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Below => write!(f, "价格<MA120"),
            Self::Near => write!(f, "价格≈MA120"),
            Self::Above => write!(f, "价格>MA120"),
        }
    }
}

/// Final buy-point label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyPointLabel {
    /// 最佳买点
    Best,
    /// 良好买点
    Good,
    /// 观望
    Watch,
    /// 规避
    Avoid,
}

impl BuyPointLabel {
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Best => "⭐",
            Self::Good => "🟢",
            Self::Watch => "🟡",
            Self::Avoid => "🔴",
        }
    }
}

impl std::fmt::Display for BuyPointLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Best => write!(f, "最佳买点"),
            Self::Good => write!(f, "良好买点"),
            Self::Watch => write!(f, "观望"),
            Self::Avoid => write!(f, "规避"),
        }
    }
}

/// Label plus the value-zone qualifier on `Watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: BuyPointLabel,
    pub value_zone: bool,
}

impl Verdict {
    const fn plain(label: BuyPointLabel) -> Self {
        Self {
            label,
            value_zone: false,
        }
    }

    /// Display text, e.g. `观望(价值区)`.
    pub fn text(&self) -> String {
        if self.value_zone {
            format!("{}(价值区)", self.label)
        } else {
            self.label.to_string()
        }
    }
}

/// Inputs to the labeling rules.
#[derive(Debug, Clone, Copy)]
pub struct LabelContext {
    pub signal: ShortSignal,
    pub status: Ma120Status,
    pub deviation_pct: f64,
    pub value_zone_pct: f64,
}

/// Inputs to the advice rules.
#[derive(Debug, Clone, Copy)]
pub struct AdviceContext {
    pub verdict: Verdict,
    pub signal: ShortSignal,
    pub status: Ma120Status,
    pub add_price: Option<f64>,
}

/// Priority-ordered labeling rules.
pub fn label_rules() -> Vec<Rule<LabelContext, Verdict>> {
    vec![
        Rule::new(
            "breakdown_avoid",
            |c: &LabelContext| c.signal == ShortSignal::Breakdown,
            |_: &LabelContext| Verdict::plain(BuyPointLabel::Avoid),
        ),
        Rule::new(
            "overextended_watch",
            |c: &LabelContext| c.signal == ShortSignal::Overextended,
            |_: &LabelContext| Verdict::plain(BuyPointLabel::Watch),
        ),
        Rule::new(
            "entry_below_ma120",
            |c: &LabelContext| c.signal.is_entry() && c.status == Ma120Status::Below,
            |_: &LabelContext| Verdict::plain(BuyPointLabel::Best),
        ),
        Rule::new(
            "entry",
            |c: &LabelContext| c.signal.is_entry(),
            |_: &LabelContext| Verdict::plain(BuyPointLabel::Good),
        ),
        Rule::new(
            "value_zone",
            |c: &LabelContext| {
                c.signal == ShortSignal::None
                    && c.status == Ma120Status::Below
                    && c.deviation_pct < c.value_zone_pct
            },
            |_: &LabelContext| Verdict {
                label: BuyPointLabel::Watch,
                value_zone: true,
            },
        ),
        Rule::new(
            "watch",
            |_: &LabelContext| true,
            |_: &LabelContext| Verdict::plain(BuyPointLabel::Watch),
        ),
    ]
}

fn is_label(c: &AdviceContext, label: BuyPointLabel) -> bool {
    c.verdict.label == label
}

fn is_pullback(c: &AdviceContext) -> bool {
    c.signal == ShortSignal::PullbackLowVolume
}

/// Advice lookup keyed on (label, signal, MA120 status).
pub fn advice_rules() -> Vec<Rule<AdviceContext, String>> {
    vec![
        Rule::new(
            "best_pullback",
            |c: &AdviceContext| is_label(c, BuyPointLabel::Best) && is_pullback(c),
            |c: &AdviceContext| match c.add_price {
                Some(p) => format!("可分批建仓，回踩{:.2}元附近可加仓", p),
                None => "可分批建仓，注意控制仓位".to_string(),
            },
        ),
        Rule::new(
            "best",
            |c: &AdviceContext| is_label(c, BuyPointLabel::Best),
            |_: &AdviceContext| "可适量建仓，注意控制仓位".to_string(),
        ),
        Rule::new(
            "good_pullback",
            |c: &AdviceContext| is_label(c, BuyPointLabel::Good) && is_pullback(c),
            |c: &AdviceContext| match c.add_price {
                Some(p) => format!("可小仓试探，等待回踩{:.2}元加仓", p),
                None => "可小仓试探，注意控制仓位".to_string(),
            },
        ),
        Rule::new(
            "good",
            |c: &AdviceContext| is_label(c, BuyPointLabel::Good),
            |_: &AdviceContext| "可关注，突破后轻仓跟进".to_string(),
        ),
        Rule::new(
            "avoid",
            |c: &AdviceContext| is_label(c, BuyPointLabel::Avoid),
            |_: &AdviceContext| "建议暂时规避，等待企稳信号".to_string(),
        ),
        Rule::new(
            "watch_below_ma120",
            |c: &AdviceContext| c.status == Ma120Status::Below,
            |_: &AdviceContext| "处于价值区，可等待短期买点信号".to_string(),
        ),
        Rule::new(
            "watch",
            |_: &AdviceContext| true,
            |_: &AdviceContext| "暂无明确信号，继续观察".to_string(),
        ),
    ]
}

/// Stateless buy-point classifier.
#[derive(Debug, Clone)]
pub struct BuyPointClassifier {
    position: PositionConfig,
    labels: RuleTable<LabelContext, Verdict>,
    advice: RuleTable<AdviceContext, String>,
}

impl Default for BuyPointClassifier {
    fn default() -> Self {
        Self::new(PositionConfig::default())
    }
}

impl BuyPointClassifier {
    pub fn new(position: PositionConfig) -> Self {
        Self {
            position,
            labels: RuleTable::new(label_rules()),
            advice: RuleTable::new(advice_rules()),
        }
    }

    pub fn label_table(&self) -> &RuleTable<LabelContext, Verdict> {
        &self.labels
    }

    /// MA120 status for a deviation using the configured band.
    pub fn ma120_status(&self, deviation_pct: f64) -> Ma120Status {
        Ma120Status::from_deviation(deviation_pct, self.position.near_band_pct)
    }

    /// Label a signal/position pair.
    pub fn classify(
        &self,
        signal: ShortSignal,
        status: Ma120Status,
        deviation_pct: f64,
    ) -> Verdict {
        let ctx = LabelContext {
            signal,
            status,
            deviation_pct,
            value_zone_pct: self.position.value_zone_pct,
        };

        self.labels
            .first_match(&ctx)
            .map(|fired| fired.outcome)
            .unwrap_or(Verdict::plain(BuyPointLabel::Watch))
    }

    /// Advice sentence for a verdict.
    pub fn advice(
        &self,
        verdict: Verdict,
        signal: ShortSignal,
        status: Ma120Status,
        add_price: Option<f64>,
    ) -> String {
        let ctx = AdviceContext {
            verdict,
            signal,
            status,
            add_price,
        };

        self.advice
            .first_match(&ctx)
            .map(|fired| fired.outcome)
            .unwrap_or_else(|| "暂无明确信号，继续观察".to_string())
    }
}
