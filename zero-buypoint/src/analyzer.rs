//! Per-stock facade over the three engines.
//!
//! Each stock is independent, so batches fan out across the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buy_point::{BuyPointAnalyzer, BuyPointResult};
use crate::config::EngineConfig;
use crate::dividend::{
    DividendEstimate, DividendHistoryProvider, DividendProfile, DividendYieldEstimator,
};
use crate::fundamental::{FundamentalAnalyzer, FundamentalAssessment, FundamentalInput};
use crate::market::{HistoricalSeries, RealtimeQuote};
use crate::narrative::NarrativeContext;

/// Inputs for one stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockInput {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub series: HistoricalSeries,
    #[serde(default)]
    pub quote: Option<RealtimeQuote>,
    /// Industry, PE, yield and price moves
    #[serde(default)]
    pub fundamentals: FundamentalInput,
}

impl StockInput {
    pub fn new(code: impl Into<String>, series: HistoricalSeries) -> Self {
        Self {
            code: code.into(),
            series,
            ..Default::default()
        }
    }

    /// Realtime price if quoted, else the latest close.
    pub fn current_price(&self) -> Option<f64> {
        self.quote
            .map(|q| q.current_price)
            .filter(|p| p.is_finite() && *p > 0.0)
            .or_else(|| self.series.latest().map(|b| b.close))
    }
}

/// Everything computed for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub code: String,
    pub name: Option<String>,
    /// `None` when the series is too short or MA120 cannot be resolved
    pub buy_point: Option<BuyPointResult>,
    pub fundamental: FundamentalAssessment,
    pub dividend: DividendEstimate,
}

impl StockReport {
    /// Context handed to the narrative layer.
    pub fn narrative_context(&self) -> NarrativeContext {
        NarrativeContext {
            code: self.code.clone(),
            name: self.name.clone(),
            buy_point: self.buy_point.clone(),
            fundamental: Some(self.fundamental.clone()),
            dividend: Some(self.dividend.clone()),
        }
    }
}

/// Runs buy-point, fundamental and dividend analysis.
pub struct StockAnalyzer<P> {
    buy_point: BuyPointAnalyzer,
    fundamental: FundamentalAnalyzer,
    dividend: DividendYieldEstimator<P>,
}

impl<P: DividendHistoryProvider> StockAnalyzer<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, &EngineConfig::default())
    }

    pub fn with_config(provider: P, config: &EngineConfig) -> Self {
        Self {
            buy_point: BuyPointAnalyzer::with_config(config),
            fundamental: FundamentalAnalyzer::with_config(config),
            dividend: DividendYieldEstimator::with_config(provider, config.payout),
        }
    }

    pub fn buy_point(&self) -> &BuyPointAnalyzer {
        &self.buy_point
    }

    pub fn fundamental(&self) -> &FundamentalAnalyzer {
        &self.fundamental
    }

    pub fn dividend(&self) -> &DividendYieldEstimator<P> {
        &self.dividend
    }

    /// Analyze a single stock.
    pub fn analyze_stock(&self, input: &StockInput) -> StockReport {
        let buy_point = self.buy_point.analyze(&input.series, input.quote.as_ref());
        let fundamental = self.fundamental.analyze(&input.fundamentals);

        let profile = DividendProfile::from_industry(&input.fundamentals.industry);
        let dividend = self.dividend.calculate_expected_yield(
            &input.code,
            input.current_price().unwrap_or(0.0),
            input.fundamentals.pe,
            profile,
        );

        tracing::info!(
            code = %input.code,
            label = ?buy_point.as_ref().map(|b| b.label_text.as_str()),
            fundamental_score = fundamental.fundamental_score,
            expected_yield = dividend.expected_yield_pct,
            "Stock analyzed"
        );

        StockReport {
            code: input.code.clone(),
            name: input.name.clone(),
            buy_point,
            fundamental,
            dividend,
        }
    }

    /// Analyze many stocks in parallel; output order follows input order.
    pub fn analyze_batch(&self, inputs: &[StockInput]) -> Vec<StockReport> {
        let start = std::time::Instant::now();
        let reports: Vec<StockReport> = inputs
            .par_iter()
            .map(|input| self.analyze_stock(input))
            .collect();

        tracing::info!(
            stocks = inputs.len(),
            with_buy_point = reports.iter().filter(|r| r.buy_point.is_some()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch analysis complete"
        );

        reports
    }
}
