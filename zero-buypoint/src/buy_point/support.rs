//! Support and resistance levels.
//!
//! Add-on (support) prices come from Fibonacci retracements of the 60-bar
//! range, strengthened when a moving average sits on the same level
//! ("resonance"), plus standalone moving averages below the price. The
//! closest candidate below the price wins.

use serde::{Deserialize, Serialize};

use crate::config::SupportConfig;
use crate::market::HistoricalSeries;

/// Moving-average line identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaLine {
    #[serde(rename = "MA5")]
    Ma5,
    #[serde(rename = "MA10")]
    Ma10,
    #[serde(rename = "MA20")]
    Ma20,
    #[serde(rename = "MA120")]
    Ma120,
}

impl std::fmt::Display for MaLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ma5 => write!(f, "MA5"),
            Self::Ma10 => write!(f, "MA10"),
            Self::Ma20 => write!(f, "MA20"),
            Self::Ma120 => write!(f, "MA120"),
        }
    }
}

/// A moving-average value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaLevel {
    pub line: MaLine,
    pub value: f64,
}

impl MaLevel {
    pub const fn new(line: MaLine, value: f64) -> Self {
        Self { line, value }
    }

    /// The four candidate MAs, skipping missing (non-positive) values.
    pub fn candidates(ma5: f64, ma10: f64, ma20: f64, ma120: f64) -> Vec<MaLevel> {
        [
            MaLevel::new(MaLine::Ma5, ma5),
            MaLevel::new(MaLine::Ma10, ma10),
            MaLevel::new(MaLine::Ma20, ma20),
            MaLevel::new(MaLine::Ma120, ma120),
        ]
        .into_iter()
        .filter(|m| m.value.is_finite() && m.value > 0.0)
        .collect()
    }
}

/// Why a price is considered support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SupportBasis {
    /// Fibonacci level confirmed by one or more MAs
    FibResonance { ratio: f64, lines: Vec<MaLine> },
    /// Bare Fibonacci level
    Fib { ratio: f64 },
    /// Moving average on its own
    MovingAverage { line: MaLine },
}

impl std::fmt::Display for SupportBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FibResonance { ratio, lines } => {
                let names: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
                write!(f, "fib{} + {} resonance", ratio, names.join("/"))
            }
            Self::Fib { ratio } => write!(f, "fib{} support", ratio),
            Self::MovingAverage { line } => write!(f, "{} support", line),
        }
    }
}

/// A candidate support price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportLevel {
    pub price: f64,
    pub basis: SupportBasis,
}

impl SupportLevel {
    /// Human-readable rationale tag, e.g. `fib0.382 + MA20 resonance`.
    pub fn tag(&self) -> String {
        self.basis.to_string()
    }
}

/// Key price levels for a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    pub add: Option<SupportLevel>,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

/// Computes add-on, take-profit and stop-loss prices.
#[derive(Debug, Clone, Default)]
pub struct SupportResistanceLocator {
    config: SupportConfig,
}

fn relative_distance(value: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        (value - reference).abs() / reference
    } else {
        f64::INFINITY
    }
}

impl SupportResistanceLocator {
    pub fn new(config: SupportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SupportConfig {
        &self.config
    }

    /// Prices at or above this are never add-on candidates.
    ///
    /// Strictly below the price on the MA-only path, `min_distance` below it
    /// on the Fibonacci path.
    pub fn ceiling(&self, price: f64, series: &HistoricalSeries) -> f64 {
        if series.len() < self.config.fib_window {
            price
        } else {
            price * (1.0 - self.config.min_distance)
        }
    }

    /// All support candidates below the ceiling.
    ///
    /// With fewer than `fib_window` bars only MAs strictly below the price
    /// are returned. A standalone MA is dropped only when it duplicates a
    /// Fibonacci level, never another MA.
    pub fn candidates(
        &self,
        price: f64,
        mas: &[MaLevel],
        series: &HistoricalSeries,
    ) -> Vec<SupportLevel> {
        let ceiling = self.ceiling(price, series);
        let below: Vec<&MaLevel> = mas.iter().filter(|m| m.value < ceiling).collect();

        if series.len() < self.config.fib_window {
            return below
                .into_iter()
                .map(|m| SupportLevel {
                    price: m.value,
                    basis: SupportBasis::MovingAverage { line: m.line },
                })
                .collect();
        }

        let (Some(high), Some(low)) = (
            series.max_high(self.config.fib_window),
            series.min_low(self.config.fib_window),
        ) else {
            return Vec::new();
        };
        let range = (high - low).max(0.0);
        let tolerance = self.config.resonance_tolerance;

        let mut levels = Vec::new();
        let mut resonating: Vec<MaLine> = Vec::new();

        for &ratio in &self.config.fib_ratios {
            let level = high - range * ratio;
            if level >= ceiling || level <= 0.0 {
                continue;
            }

            let lines: Vec<MaLine> = mas
                .iter()
                .filter(|m| relative_distance(m.value, level) <= tolerance)
                .map(|m| m.line)
                .collect();

            let basis = if lines.is_empty() {
                SupportBasis::Fib { ratio }
            } else {
                resonating.extend(lines.iter().copied());
                SupportBasis::FibResonance { ratio, lines }
            };

            levels.push(SupportLevel {
                price: level,
                basis,
            });
        }

        let fib_count = levels.len();
        for ma in below {
            if resonating.contains(&ma.line) {
                continue;
            }
            let duplicate = levels[..fib_count]
                .iter()
                .any(|l| relative_distance(ma.value, l.price) <= tolerance);
            if !duplicate {
                levels.push(SupportLevel {
                    price: ma.value,
                    basis: SupportBasis::MovingAverage { line: ma.line },
                });
            }
        }

        levels
    }

    /// Closest support below the ceiling.
    pub fn locate_support(
        &self,
        price: f64,
        mas: &[MaLevel],
        series: &HistoricalSeries,
    ) -> Option<SupportLevel> {
        let mut best: Option<SupportLevel> = None;
        for candidate in self.candidates(price, mas, series) {
            if best.as_ref().map_or(true, |b| candidate.price > b.price) {
                best = Some(candidate);
            }
        }

        tracing::debug!(
            price,
            support = ?best.as_ref().map(|s| s.price),
            basis = ?best.as_ref().map(|s| s.tag()),
            "Support located"
        );

        best
    }

    /// Highest high of the trailing window if it offers the minimum upside.
    pub fn take_profit(&self, price: f64, series: &HistoricalSeries) -> Option<f64> {
        if series.len() < self.config.take_profit_min_bars {
            return None;
        }
        let high = series.max_high(self.config.take_profit_window)?;
        (high > price * (1.0 + self.config.take_profit_min_upside)).then_some(high)
    }

    /// Stop-loss below MA20.
    pub fn stop_loss(&self, ma20: f64) -> Option<f64> {
        (ma20 > 0.0).then(|| ma20 * self.config.stop_loss_ratio)
    }

    /// All key levels at once.
    pub fn locate(
        &self,
        price: f64,
        mas: &[MaLevel],
        ma20: f64,
        series: &HistoricalSeries,
    ) -> KeyLevels {
        KeyLevels {
            add: self.locate_support(price, mas, series),
            take_profit: self.take_profit(price, series),
            stop_loss: self.stop_loss(ma20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Bar;

    /// `n` bars whose highs peak at `high` and lows bottom at `low`.
    fn ranged_series(n: usize, high: f64, low: f64) -> HistoricalSeries {
        let mid = (high + low) / 2.0;
        let mut bars: Vec<Bar> = (0..n).map(|_| Bar::new(mid, mid, mid, mid, 1.0)).collect();
        bars[0].high = high;
        bars[n / 2].low = low;
        HistoricalSeries::new(bars)
    }

    #[test]
    fn test_short_history_picks_highest_ma_below_price() {
        let locator = SupportResistanceLocator::default();
        let series = ranged_series(30, 12.0, 8.0);
        let mas = MaLevel::candidates(10.5, 9.8, 9.5, 11.0);

        let support = locator.locate_support(10.0, &mas, &series).unwrap();
        assert_eq!(support.price, 9.8);
        assert_eq!(support.tag(), "MA10 support");
    }

    #[test]
    fn test_short_history_no_ma_below() {
        let locator = SupportResistanceLocator::default();
        let series = ranged_series(30, 12.0, 8.0);
        let mas = MaLevel::candidates(10.5, 10.2, 0.0, 11.0);
        assert!(locator.locate_support(10.0, &mas, &series).is_none());
    }

    #[test]
    fn test_fib_levels_and_resonance() {
        let locator = SupportResistanceLocator::default();
        // Range 100 -> 0 is awkward; use 20 -> 10: levels 16.18, 15.0, 13.82
        let series = ranged_series(60, 20.0, 10.0);
        let mas = MaLevel::candidates(17.0, 16.0, 15.1, 12.0);

        let candidates = locator.candidates(16.5, &mas, &series);
        let tags: Vec<String> = candidates.iter().map(|c| c.tag()).collect();

        assert!(tags.contains(&"fib0.382 + MA10 resonance".to_string()));
        assert!(tags.contains(&"fib0.5 + MA20 resonance".to_string()));
        assert!(tags.contains(&"fib0.618 support".to_string()));
        assert!(tags.contains(&"MA120 support".to_string()));
        assert!(!tags.iter().any(|t| t.starts_with("MA10 ")));

        let support = locator.locate_support(16.5, &mas, &series).unwrap();
        assert!((support.price - 16.18).abs() < 1e-9);
    }

    #[test]
    fn test_min_distance_filter() {
        let locator = SupportResistanceLocator::default();
        let series = ranged_series(60, 20.0, 10.0);
        // fib0.382 = 16.18 sits within 0.5% of the price and is skipped
        let support = locator.locate_support(16.2, &[], &series).unwrap();
        assert_eq!(support.basis, SupportBasis::Fib { ratio: 0.5 });
    }

    #[test]
    fn test_standalone_ma_deduplicated_against_fib() {
        let locator = SupportResistanceLocator::default();
        let series = ranged_series(60, 20.0, 10.0);
        // MA5 at 15.1 resonates with fib0.5; nothing else near it
        let mas = MaLevel::candidates(15.1, 0.0, 0.0, 0.0);
        let candidates = locator.candidates(18.0, &mas, &series);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_ma_near_price_does_not_hide_lower_ma() {
        let locator = SupportResistanceLocator::default();
        // Every Fib level of 13.0 -> 12.0 sits above the price
        let series = ranged_series(60, 13.0, 12.0);
        // MA10 is within 0.5% of the price, MA20 within 1.5% of MA10
        let mas = MaLevel::candidates(0.0, 10.48, 10.39, 0.0);

        let candidates = locator.candidates(10.5, &mas, &series);
        assert_eq!(candidates.len(), 1);

        let support = locator.locate_support(10.5, &mas, &series).unwrap();
        assert_eq!(support.price, 10.39);
        assert_eq!(support.tag(), "MA20 support");
    }

    #[test]
    fn test_close_mas_are_both_candidates() {
        let locator = SupportResistanceLocator::default();
        let series = ranged_series(60, 13.0, 12.0);
        let mas = MaLevel::candidates(0.0, 10.30, 10.25, 0.0);
        let prices: Vec<f64> = locator
            .candidates(10.5, &mas, &series)
            .iter()
            .map(|c| c.price)
            .collect();
        assert_eq!(prices, vec![10.30, 10.25]);
    }

    #[test]
    fn test_take_profit_requires_upside_and_history() {
        let locator = SupportResistanceLocator::default();
        let series = ranged_series(60, 20.0, 10.0);
        assert_eq!(locator.take_profit(15.0, &series), Some(20.0));
        assert_eq!(locator.take_profit(19.8, &series), None);

        let short = ranged_series(10, 20.0, 10.0);
        assert_eq!(locator.take_profit(15.0, &short), None);
    }

    #[test]
    fn test_stop_loss() {
        let locator = SupportResistanceLocator::default();
        assert!((locator.stop_loss(100.0).unwrap() - 98.0).abs() < 1e-9);
        assert_eq!(locator.stop_loss(0.0), None);
    }
}
