//! Market data inputs.
//!
//! Daily bars (oldest first, most recent last) with optional precomputed
//! moving averages, plus the per-evaluation price snapshot derived from the
//! latest bar and an optional realtime quote.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Volume ratio assumed when a bar carries none (neither shrinking nor expanding).
pub const NEUTRAL_VOLUME_RATIO: f64 = 1.0;

/// A daily OHLCV bar with optional precomputed indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub ma5: Option<f64>,
    #[serde(default)]
    pub ma10: Option<f64>,
    #[serde(default)]
    pub ma20: Option<f64>,
    #[serde(default)]
    pub ma120: Option<f64>,
    /// Volume relative to the recent average volume
    #[serde(default)]
    pub volume_ratio: Option<f64>,
}

impl Bar {
    /// Create a plain OHLCV bar.
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            ..Default::default()
        }
    }

    /// Attach a trading date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Attach precomputed short moving averages.
    pub fn with_mas(mut self, ma5: f64, ma10: f64, ma20: f64) -> Self {
        self.ma5 = Some(ma5);
        self.ma10 = Some(ma10);
        self.ma20 = Some(ma20);
        self
    }

    /// Attach a precomputed MA120.
    pub fn with_ma120(mut self, ma120: f64) -> Self {
        self.ma120 = Some(ma120);
        self
    }

    /// Attach a volume ratio.
    pub fn with_volume_ratio(mut self, ratio: f64) -> Self {
        self.volume_ratio = Some(ratio);
        self
    }
}

/// Ordered sequence of bars, most recent last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    bars: Vec<Bar>,
}

impl HistoricalSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar.
    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The most recent `n` bars, or all bars if fewer exist.
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// Fail with `InsufficientData` unless at least `required` bars exist.
    pub fn require(&self, required: usize) -> Result<()> {
        if self.bars.len() < required {
            return Err(Error::insufficient(required, self.bars.len()));
        }
        Ok(())
    }

    /// Highest high over the trailing window.
    pub fn max_high(&self, window: usize) -> Option<f64> {
        fold_finite(self.tail(window).iter().map(|b| b.high), f64::max)
    }

    /// Lowest low over the trailing window.
    pub fn min_low(&self, window: usize) -> Option<f64> {
        fold_finite(self.tail(window).iter().map(|b| b.low), f64::min)
    }

    /// Mean of the most recent `period` usable closes.
    ///
    /// Returns the mean and the number of closes actually averaged, which is
    /// below `period` when history is short.
    pub fn close_mean(&self, period: usize) -> Option<(f64, usize)> {
        let closes: Vec<f64> = self
            .tail(period)
            .iter()
            .map(|b| b.close)
            .filter(|c| c.is_finite() && *c > 0.0)
            .collect();

        if closes.is_empty() {
            return None;
        }

        let mean = closes.iter().sum::<f64>() / closes.len() as f64;
        Some((mean, closes.len()))
    }
}

impl From<Vec<Bar>> for HistoricalSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

fn fold_finite(values: impl Iterator<Item = f64>, f: fn(f64, f64) -> f64) -> Option<f64> {
    values.filter(|v| v.is_finite()).reduce(f)
}

/// Realtime quote override for the current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuote {
    pub current_price: f64,
}

/// Immutable per-evaluation price snapshot.
///
/// Missing moving averages are 0; a missing volume ratio is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub ma120: f64,
    pub volume_ratio: f64,
    /// Realtime price overriding the close
    pub current_price: Option<f64>,
}

impl PriceSnapshot {
    /// Build the snapshot from the latest bar and an optional realtime quote.
    pub fn from_series(series: &HistoricalSeries, quote: Option<&RealtimeQuote>) -> Option<Self> {
        let latest = series.latest()?;
        let ma = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0).unwrap_or(0.0);

        Some(Self {
            close: latest.close,
            open: latest.open,
            high: latest.high,
            low: latest.low,
            ma5: ma(latest.ma5),
            ma10: ma(latest.ma10),
            ma20: ma(latest.ma20),
            ma120: ma(latest.ma120),
            volume_ratio: latest
                .volume_ratio
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(NEUTRAL_VOLUME_RATIO),
            current_price: quote
                .map(|q| q.current_price)
                .filter(|p| p.is_finite() && *p > 0.0),
        })
    }

    /// Price used for evaluation: realtime override, else the close.
    pub fn price(&self) -> f64 {
        self.current_price.unwrap_or(self.close)
    }
}

/// Where the MA120 value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Ma120Source {
    /// Precomputed on the latest bar
    Stored,
    /// Averaged from trailing closes
    Computed { samples: usize },
}

/// Resolved MA120 value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMa120 {
    pub value: f64,
    pub source: Ma120Source,
    /// True when fewer than a full period of closes were averaged
    pub degraded: bool,
}

/// Resolve MA120: stored value if positive, else the mean of up to `period`
/// trailing closes.
///
/// With fewer than `period` closes the mean of all of them is used; this is
/// not a true MA120 and the result is flagged `degraded`.
pub fn resolve_ma120(
    snapshot: &PriceSnapshot,
    series: &HistoricalSeries,
    period: usize,
) -> Result<ResolvedMa120> {
    if snapshot.ma120 > 0.0 {
        return Ok(ResolvedMa120 {
            value: snapshot.ma120,
            source: Ma120Source::Stored,
            degraded: false,
        });
    }

    let (value, samples) = series.close_mean(period).ok_or(Error::MissingField("ma120"))?;
    let degraded = samples < period;

    if degraded {
        tracing::info!(
            ma120 = value,
            samples,
            period,
            "MA120 computed from short history (degraded)"
        );
    } else {
        tracing::debug!(ma120 = value, samples, "MA120 computed from closes");
    }

    Ok(ResolvedMa120 {
        value,
        source: Ma120Source::Computed { samples },
        degraded,
    })
}

/// Round to 2 decimals for price display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage deviation of `price` from `base`, 0 when `base` is not positive.
pub fn bias_pct(price: f64, base: f64) -> f64 {
    if base > 0.0 {
        (price - base) / base * 100.0
    } else {
        0.0
    }
}
