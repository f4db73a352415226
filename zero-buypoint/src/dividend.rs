//! Forward dividend-yield estimation.
//!
//! ```text
//! forecast EPS   = price / dynamic PE
//! payout         = mean of the latest annual payout ratios (default when absent)
//! expected yield = forecast EPS * payout / price * 100
//! ```
//!
//! Every estimate carries a trace string naming the forecast EPS, the payout
//! source and any correction applied, e.g.
//! `预测EPS 1.20 (基于PE动5.0) x 派息率 30.0% (无历史数据(默认))`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::PayoutConfig;
use crate::error::{Error, Result};
use crate::industry::{KeywordClassifier, KeywordRule, StockArchetype};

/// Reason reported when price or PE cannot produce an estimate.
pub const INVALID_INPUT_REASON: &str = "价格或PE数据无效";

/// Sentinel used by data sources for "no value".
pub const MISSING_PAYOUT: &str = "--";

// ============================================================================
// Dividend history
// ============================================================================

/// Report period category, from the period tag (`2023年报`, `2024中报`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Annual,
    Interim,
    Quarterly,
    Other,
}

impl ReportKind {
    pub fn from_period(period: &str) -> Self {
        if period.contains("年报") {
            Self::Annual
        } else if period.contains("中报") {
            Self::Interim
        } else if period.contains("季报") {
            Self::Quarterly
        } else {
            Self::Other
        }
    }
}

/// One row of dividend history as delivered by a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendRecord {
    /// e.g. `2023年报`
    pub report_period: String,
    /// Raw payout text, e.g. `30.5%` or `--`
    pub payout_ratio: String,
}

impl DividendRecord {
    pub fn new(report_period: impl Into<String>, payout_ratio: impl Into<String>) -> Self {
        Self {
            report_period: report_period.into(),
            payout_ratio: payout_ratio.into(),
        }
    }

    pub fn kind(&self) -> ReportKind {
        ReportKind::from_period(&self.report_period)
    }

    /// Payout as a fraction, `None` for the sentinel or unparseable text.
    pub fn payout(&self) -> Option<f64> {
        parse_payout_ratio(&self.payout_ratio)
    }
}

/// Parse payout text such as `30.5%` into a fraction (0.305).
pub fn parse_payout_ratio(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == MISSING_PAYOUT {
        return None;
    }
    raw.trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v / 100.0)
}

/// Source of dividend history rows.
///
/// Failures are foreign to the engine; the estimator logs them and carries
/// on with an empty history.
pub trait DividendHistoryProvider: Send + Sync {
    /// Dividend history for a stock code, in any order.
    fn dividend_history(&self, code: &str) -> anyhow::Result<Vec<DividendRecord>>;
}

impl<T: DividendHistoryProvider + ?Sized> DividendHistoryProvider for std::sync::Arc<T> {
    fn dividend_history(&self, code: &str) -> anyhow::Result<Vec<DividendRecord>> {
        (**self).dividend_history(code)
    }
}

/// In-memory history keyed by stock code.
#[derive(Debug, Clone, Default)]
pub struct StaticDividendHistory {
    records: HashMap<String, Vec<DividendRecord>>,
}

impl StaticDividendHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, records: Vec<DividendRecord>) {
        self.records.insert(code.into(), records);
    }

    pub fn with_records(mut self, code: impl Into<String>, records: Vec<DividendRecord>) -> Self {
        self.insert(code, records);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DividendHistoryProvider for StaticDividendHistory {
    fn dividend_history(&self, code: &str) -> anyhow::Result<Vec<DividendRecord>> {
        Ok(self.records.get(code).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Dividend profile
// ============================================================================

/// Stock category as far as dividend policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendProfile {
    Bank,
    Cyclical,
    Tech,
    Utility,
    Default,
}

impl DividendProfile {
    /// Classify from industry text (bank > cyclical > tech > utility).
    pub fn from_industry(industry: &str) -> Self {
        let industry = industry.trim();
        if industry.is_empty() {
            return Self::Default;
        }
        profile_rules().classify(industry).tag
    }

    /// Whether a missing history falls back to the default payout.
    pub const fn has_default_payout(&self) -> bool {
        matches!(self, Self::Bank | Self::Utility)
    }
}

impl From<StockArchetype> for DividendProfile {
    fn from(archetype: StockArchetype) -> Self {
        match archetype {
            StockArchetype::Banking => Self::Bank,
            StockArchetype::Cyclical => Self::Cyclical,
            StockArchetype::Tech => Self::Tech,
            StockArchetype::Consumer | StockArchetype::Default => Self::Default,
        }
    }
}

impl std::fmt::Display for DividendProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bank => write!(f, "银行"),
            Self::Cyclical => write!(f, "周期"),
            Self::Tech => write!(f, "科技"),
            Self::Utility => write!(f, "公用事业"),
            Self::Default => write!(f, "其他"),
        }
    }
}

fn profile_rules() -> KeywordClassifier<DividendProfile> {
    KeywordClassifier::new(
        vec![
            KeywordRule::new(DividendProfile::Bank, &["银行"]),
            KeywordRule::new(
                DividendProfile::Cyclical,
                &["煤炭", "有色", "钢铁", "石油", "化工", "海运"],
            ),
            KeywordRule::new(DividendProfile::Tech, &["科技", "软件", "半导体", "电子"]),
            KeywordRule::new(DividendProfile::Utility, &["电力", "水务", "燃气", "高速"]),
        ],
        DividendProfile::Default,
    )
}

// ============================================================================
// Payout ratio
// ============================================================================

/// Where the base payout ratio came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PayoutSource {
    /// Mean of the latest annual payout ratios
    History { average: f64, samples: usize },
    /// No usable history
    Default,
}

impl std::fmt::Display for PayoutSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::History { average, .. } => write!(f, "三年平均{:.1}%", average * 100.0),
            Self::Default => write!(f, "无历史数据(默认)"),
        }
    }
}

/// Payout ratio after corrections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutEstimate {
    pub base: f64,
    pub value: f64,
    pub source: PayoutSource,
    /// Corrections applied, e.g. `银行修正(底线30%)`
    pub corrections: Vec<String>,
}

// ============================================================================
// Estimate
// ============================================================================

/// Forward dividend-yield estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEstimate {
    pub code: String,
    /// Expected yield (%); 0.0 when the inputs were invalid
    pub expected_yield_pct: f64,
    /// Audit trail of the calculation
    pub reason: String,
    pub profile: DividendProfile,
    /// Forecast EPS, `None` when the inputs were invalid
    pub eps_forecast: Option<f64>,
    pub payout: Option<PayoutEstimate>,
}

impl DividendEstimate {
    fn invalid(code: &str, profile: DividendProfile) -> Self {
        Self {
            code: code.to_string(),
            expected_yield_pct: 0.0,
            reason: INVALID_INPUT_REASON.to_string(),
            profile,
            eps_forecast: None,
            payout: None,
        }
    }

    /// Whether the estimate was actually computed.
    pub fn is_valid(&self) -> bool {
        self.eps_forecast.is_some()
    }
}

/// Estimates forward dividend yield from PE and payout history.
pub struct DividendYieldEstimator<P> {
    provider: P,
    config: PayoutConfig,
}

impl<P: DividendHistoryProvider> DividendYieldEstimator<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, PayoutConfig::default())
    }

    pub fn with_config(provider: P, config: PayoutConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &PayoutConfig {
        &self.config
    }

    /// Fetch history, converting provider failures into an empty history.
    pub fn history(&self, code: &str) -> Vec<DividendRecord> {
        match self.provider.dividend_history(code) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(code, error = %e, "Failed to fetch dividend history");
                Vec::new()
            }
        }
    }

    /// Mean payout ratio of the latest annual reports.
    ///
    /// Values outside (0, max_valid_ratio) are one-off distributions or
    /// placeholders and are skipped. Returns `None` when nothing is usable.
    pub fn average_payout(&self, records: &[DividendRecord]) -> Option<(f64, usize)> {
        let mut annual: Vec<&DividendRecord> = records
            .iter()
            .filter(|r| r.kind() == ReportKind::Annual)
            .collect();
        annual.sort_by(|a, b| b.report_period.cmp(&a.report_period));

        let payouts: Vec<f64> = annual
            .into_iter()
            .take(self.config.history_years)
            .filter_map(DividendRecord::payout)
            .filter(|p| *p > 0.0 && *p < self.config.max_valid_ratio)
            .collect();

        if payouts.is_empty() {
            return None;
        }
        let avg = payouts.iter().sum::<f64>() / payouts.len() as f64;
        Some((avg, payouts.len()))
    }

    /// Base payout plus profile corrections.
    pub fn payout(&self, records: &[DividendRecord], profile: DividendProfile) -> PayoutEstimate {
        let (base, source) = match self.average_payout(records) {
            Some((average, samples)) => (average, PayoutSource::History { average, samples }),
            None if profile.has_default_payout() => {
                (self.config.default_payout, PayoutSource::Default)
            }
            None => (0.0, PayoutSource::Default),
        };

        let mut value = base;
        let mut corrections = Vec::new();

        if profile == DividendProfile::Bank && value < self.config.bank_floor {
            value = self.config.bank_floor;
            corrections.push(format!(
                "银行修正(底线{:.0}%)",
                self.config.bank_floor * 100.0
            ));
        }

        PayoutEstimate {
            base,
            value,
            source,
            corrections,
        }
    }

    /// Estimate, failing with `InvalidInput` on a non-positive price or PE.
    pub fn try_estimate(
        &self,
        code: &str,
        current_price: f64,
        pe_dynamic: Option<f64>,
        profile: DividendProfile,
    ) -> Result<DividendEstimate> {
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(Error::InvalidInput(format!("current price {}", current_price)));
        }
        let pe = pe_dynamic
            .filter(|pe| pe.is_finite() && *pe > 0.0)
            .ok_or_else(|| Error::InvalidInput(format!("dynamic PE {:?}", pe_dynamic)))?;

        let eps_forecast = current_price / pe;
        let records = self.history(code);
        let payout = self.payout(&records, profile);

        let expected_yield_pct = eps_forecast * payout.value / current_price * 100.0;
        let reason = format!(
            "预测EPS {:.2} (基于PE动{:.1}) x 派息率 {:.1}% ({}{})",
            eps_forecast,
            pe,
            payout.value * 100.0,
            payout.source,
            payout.corrections.join("")
        );

        tracing::debug!(
            code,
            profile = ?profile,
            eps_forecast,
            payout = payout.value,
            expected_yield_pct,
            "Dividend yield estimated"
        );

        Ok(DividendEstimate {
            code: code.to_string(),
            expected_yield_pct,
            reason,
            profile,
            eps_forecast: Some(eps_forecast),
            payout: Some(payout),
        })
    }

    /// Best-effort estimate: invalid price or PE yields `0.0` with the
    /// `价格或PE数据无效` reason.
    pub fn calculate_expected_yield(
        &self,
        code: &str,
        current_price: f64,
        pe_dynamic: Option<f64>,
        profile: DividendProfile,
    ) -> DividendEstimate {
        match self.try_estimate(code, current_price, pe_dynamic, profile) {
            Ok(estimate) => estimate,
            Err(e) => {
                tracing::debug!(code, error = %e, "Dividend estimate suppressed");
                DividendEstimate::invalid(code, profile)
            }
        }
    }
}
