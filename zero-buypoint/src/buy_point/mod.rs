//! Composite technical buy-point analysis.
//!
//! Combines the short-term signal (pullback / breakout / breakdown /
//! overextension) with the price position relative to MA120 ("half-year
//! line") into a labeled recommendation.
//!
//! # Labels
//!
//! | Short signal            | Price vs MA120 | Label        |
//! |-------------------------|----------------|--------------|
//! | breakdown               | any            | 🔴 规避       |
//! | overextended            | any            | 🟡 观望       |
//! | pullback / breakout     | below          | ⭐ 最佳买点   |
//! | pullback / breakout     | near / above   | 🟢 良好买点   |
//! | none                    | < -5%          | 🟡 观望(价值区) |
//! | otherwise               |                | 🟡 观望       |
//!
//! # Usage
//!
//! ```ignore
//! use zero_buypoint::buy_point::BuyPointAnalyzer;
//!
//! let analyzer = BuyPointAnalyzer::new();
//! if let Some(result) = analyzer.analyze(&series, None) {
//!     println!("{} {}: {}", result.label.emoji(), result.label_text, result.advice);
//! }
//! ```

pub mod classifier;
pub mod short_signal;
pub mod support;

pub use classifier::{BuyPointClassifier, BuyPointLabel, Ma120Status, Verdict};
pub use short_signal::{ShortSignal, ShortSignalDetector, ShortSignalReading, SignalInput};
pub use support::{KeyLevels, MaLevel, MaLine, SupportBasis, SupportLevel, SupportResistanceLocator};

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, PositionConfig};
use crate::error::{Error, Result};
use crate::market::{
    bias_pct, resolve_ma120, round2, HistoricalSeries, Ma120Source, PriceSnapshot, RealtimeQuote,
};

/// Buy-point analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyPointResult {
    pub label: BuyPointLabel,
    /// Label text, e.g. `最佳买点` or `观望(价值区)`
    pub label_text: String,
    pub value_zone: bool,

    pub short_signal: ShortSignal,
    pub short_signal_detail: String,

    pub ma120_status: Ma120Status,
    /// Deviation from MA120 (%)
    pub ma120_deviation_pct: f64,
    pub ma120: f64,
    pub ma120_source: Ma120Source,
    /// MA120 averaged over fewer than a full period of closes
    pub ma120_degraded: bool,

    /// Add-on price and its rationale tag
    pub add_price: Option<f64>,
    pub add_price_basis: Option<String>,
    pub take_profit_price: Option<f64>,
    pub stop_loss_price: Option<f64>,

    pub advice: String,

    pub current_price: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub volume_ratio: f64,
    pub bias_ma5: f64,
    pub bias_ma10: f64,
}

/// Composite buy-point analyzer.
#[derive(Debug, Clone)]
pub struct BuyPointAnalyzer {
    position: PositionConfig,
    detector: ShortSignalDetector,
    locator: SupportResistanceLocator,
    classifier: BuyPointClassifier,
}

impl Default for BuyPointAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BuyPointAnalyzer {
    /// Create an analyzer with default thresholds.
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Create with custom config.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            position: config.position,
            detector: ShortSignalDetector::new(config.signal),
            locator: SupportResistanceLocator::new(config.support.clone()),
            classifier: BuyPointClassifier::new(config.position),
        }
    }

    /// Analyze, returning `None` when the evaluation cannot proceed.
    pub fn analyze(
        &self,
        series: &HistoricalSeries,
        quote: Option<&RealtimeQuote>,
    ) -> Option<BuyPointResult> {
        match self.evaluate(series, quote) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, bars = series.len(), "Buy-point analysis skipped");
                None
            }
        }
    }

    /// Analyze, reporting why an evaluation could not proceed.
    ///
    /// Fails with `InsufficientData` below the minimum bar count and with
    /// `MissingField` when MA120 can be neither read nor computed.
    pub fn evaluate(
        &self,
        series: &HistoricalSeries,
        quote: Option<&RealtimeQuote>,
    ) -> Result<BuyPointResult> {
        series.require(self.position.min_bars)?;

        let snapshot = PriceSnapshot::from_series(series, quote)
            .ok_or_else(|| Error::insufficient(self.position.min_bars, 0))?;
        let price = snapshot.price();
        if !(price.is_finite() && price > 0.0) {
            return Err(Error::InvalidInput(format!("current price {}", price)));
        }

        let ma120 = resolve_ma120(&snapshot, series, self.position.ma120_period)?;

        // 1. MA120 position
        let deviation = bias_pct(price, ma120.value);
        let status = self.classifier.ma120_status(deviation);

        // 2. Short-term signal
        let recent_high = series
            .max_high(self.detector.thresholds().recent_high_window)
            .unwrap_or(0.0);
        let reading = self.detector.detect(&SignalInput {
            price,
            ma5: snapshot.ma5,
            ma10: snapshot.ma10,
            ma20: snapshot.ma20,
            volume_ratio: snapshot.volume_ratio,
            recent_high,
        });

        // 3. Label
        let verdict = self.classifier.classify(reading.signal, status, deviation);

        // 4. Key levels
        let mas = MaLevel::candidates(snapshot.ma5, snapshot.ma10, snapshot.ma20, ma120.value);
        let levels = self.locator.locate(price, &mas, snapshot.ma20, series);
        let add_price = levels.add.as_ref().map(|s| round2(s.price));

        // 5. Advice
        let advice = self
            .classifier
            .advice(verdict, reading.signal, status, add_price);

        tracing::info!(
            label = %verdict.text(),
            signal = %reading.signal,
            ma120_status = %status,
            deviation = round2(deviation),
            add_price = ?add_price,
            "Buy point evaluated"
        );

        Ok(BuyPointResult {
            label: verdict.label,
            label_text: verdict.text(),
            value_zone: verdict.value_zone,
            short_signal: reading.signal,
            short_signal_detail: reading.detail,
            ma120_status: status,
            ma120_deviation_pct: round2(deviation),
            ma120: round2(ma120.value),
            ma120_source: ma120.source,
            ma120_degraded: ma120.degraded,
            add_price,
            add_price_basis: levels.add.as_ref().map(SupportLevel::tag),
            take_profit_price: levels.take_profit.map(round2),
            stop_loss_price: levels.stop_loss.map(round2),
            advice,
            current_price: round2(price),
            ma5: round2(snapshot.ma5),
            ma10: round2(snapshot.ma10),
            ma20: round2(snapshot.ma20),
            volume_ratio: round2(snapshot.volume_ratio),
            bias_ma5: round2(reading.bias_ma5),
            bias_ma10: round2(reading.bias_ma10),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Bar;

    fn series_with_latest(n: usize, close: f64, latest: Bar) -> HistoricalSeries {
        let mut bars: Vec<Bar> = (0..n - 1)
            .map(|_| Bar::new(close, close * 1.01, close * 0.99, close, 1_000.0))
            .collect();
        bars.push(latest);
        HistoricalSeries::new(bars)
    }

    #[test]
    fn test_too_few_bars() {
        let analyzer = BuyPointAnalyzer::new();
        let series = series_with_latest(4, 10.0, Bar::new(10.0, 10.0, 10.0, 10.0, 1.0));
        assert!(analyzer.analyze(&series, None).is_none());
        assert!(analyzer
            .evaluate(&series, None)
            .unwrap_err()
            .is_insufficient_data());
    }

    #[test]
    fn test_breakdown_labels_avoid() {
        let analyzer = BuyPointAnalyzer::new();
        let latest = Bar::new(98.0, 98.0, 96.5, 97.0, 1.0)
            .with_mas(97.5, 98.0, 100.0)
            .with_volume_ratio(0.5);
        let series = series_with_latest(30, 100.0, latest);

        let result = analyzer.analyze(&series, None).unwrap();
        assert_eq!(result.short_signal, ShortSignal::Breakdown);
        assert_eq!(result.label, BuyPointLabel::Avoid);
        assert_eq!(result.stop_loss_price, Some(98.0));
        assert!(result.ma120_degraded);
    }

    #[test]
    fn test_realtime_quote_overrides_close() {
        let analyzer = BuyPointAnalyzer::new();
        let latest = Bar::new(10.0, 10.1, 9.9, 10.0, 1.0).with_mas(10.0, 10.0, 10.0);
        let series = series_with_latest(10, 10.0, latest);

        let quote = RealtimeQuote { current_price: 9.0 };
        let result = analyzer.analyze(&series, Some(&quote)).unwrap();
        assert_eq!(result.current_price, 9.0);
        assert_eq!(result.short_signal, ShortSignal::Breakdown);
    }

    #[test]
    fn test_value_zone_without_signal() {
        let analyzer = BuyPointAnalyzer::new();
        let latest = Bar::new(9.0, 9.0, 9.0, 9.0, 1.0)
            .with_mas(9.0, 9.0, 9.1)
            .with_ma120(10.0)
            .with_volume_ratio(1.0);
        let series = series_with_latest(10, 9.0, latest);

        let result = analyzer.analyze(&series, None).unwrap();
        assert_eq!(result.ma120_status, Ma120Status::Below);
        assert_eq!(result.ma120_deviation_pct, -10.0);
        assert_eq!(result.label_text, "观望(价值区)");
        assert_eq!(result.advice, "处于价值区，可等待短期买点信号");
        assert_eq!(result.ma120_source, Ma120Source::Stored);
    }
}
