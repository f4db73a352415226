//! Short-term technical signal detection.
//!
//! Classifies one price/volume snapshot into a single short-term signal.
//! Rules are evaluated in a fixed priority order and the first hit wins:
//!
//! | # | Rule              | Condition                                           | Signal      |
//! |---|-------------------|-----------------------------------------------------|-------------|
//! | 1 | `breakdown`       | MA20 > 0, price < MA20 × 0.98                       | 破位        |
//! | 2 | `pullback_ma10`   | vol ratio < 0.8, \|bias MA10\| < 3, MA5>MA10>MA20   | 缩量回踩    |
//! | 3 | `pullback_ma5`    | vol ratio < 0.8, \|bias MA5\| < 2                   | 缩量回踩    |
//! | 4 | `volume_breakout` | vol ratio > 1.5, 0 < bias MA5 < 5, near 20-bar high | 放量突破    |
//! | 5 | `volume_rising`   | vol ratio > 1.5, 0 < bias MA5 < 5                   | 放量上涨    |
//! | 6 | `overextended`    | bias MA5 > 5 or bias MA10 > 8                       | 乖离过大    |
//! | 7 | `none`            | otherwise                                           | 无信号      |
//!
//! Breakdown is checked first: no entry signal is reported below the MA20
//! stop line. The classic ordering ranks it fourth, after the pullback and
//! volume rules; a pullback or volume reading under the stop line is
//! reported as a breakdown here instead.

use serde::{Deserialize, Serialize};

use crate::config::SignalThresholds;
use crate::market::bias_pct;
use crate::rules::{Rule, RuleTable};

/// Short-term technical signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortSignal {
    /// Pullback to MA5/MA10 on shrinking volume (缩量回踩)
    PullbackLowVolume,
    /// Breakout near the recent high on expanding volume (放量突破)
    BreakoutHighVolume,
    /// Rising on expanding volume, still below the recent high (放量上涨)
    RisingHighVolume,
    /// Price broke below the MA20 stop line (破位)
    Breakdown,
    /// Price too far above the short MAs, chasing risk (乖离过大)
    Overextended,
    /// No clear signal (无信号)
    None,
}

impl ShortSignal {
    /// Signals that justify opening or adding to a position.
    pub fn is_entry(&self) -> bool {
        matches!(
            self,
            Self::PullbackLowVolume | Self::BreakoutHighVolume | Self::RisingHighVolume
        )
    }
}

impl std::fmt::Display for ShortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PullbackLowVolume => write!(f, "缩量回踩"),
            Self::BreakoutHighVolume => write!(f, "放量突破"),
            Self::RisingHighVolume => write!(f, "放量上涨"),
            Self::Breakdown => write!(f, "破位"),
            Self::Overextended => write!(f, "乖离过大"),
            Self::None => write!(f, "无信号"),
        }
    }
}

/// Raw inputs for signal detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInput {
    pub price: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub volume_ratio: f64,
    /// Highest high of the trailing window (0 when unknown)
    pub recent_high: f64,
}

/// Inputs plus derived biases and thresholds, as seen by the rules.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext {
    pub input: SignalInput,
    pub bias_ma5: f64,
    pub bias_ma10: f64,
    pub thresholds: SignalThresholds,
}

impl SignalContext {
    pub fn new(input: SignalInput, thresholds: SignalThresholds) -> Self {
        Self {
            bias_ma5: bias_pct(input.price, input.ma5),
            bias_ma10: bias_pct(input.price, input.ma10),
            input,
            thresholds,
        }
    }

    /// MA5 > MA10 > MA20 with all three present.
    pub fn is_bullish_aligned(&self) -> bool {
        let i = &self.input;
        i.ma5 > 0.0 && i.ma10 > 0.0 && i.ma20 > 0.0 && i.ma5 > i.ma10 && i.ma10 > i.ma20
    }

    fn is_low_volume(&self) -> bool {
        self.input.volume_ratio < self.thresholds.low_volume_ratio
    }

    fn is_high_volume(&self) -> bool {
        self.input.volume_ratio > self.thresholds.high_volume_ratio
    }

    fn breakdown_line(&self) -> f64 {
        self.input.ma20 * self.thresholds.breakdown_ma20_ratio
    }

    fn is_modest_advance(&self) -> bool {
        self.input.ma5 > 0.0 && self.bias_ma5 > 0.0 && self.bias_ma5 < self.thresholds.breakout_max_bias
    }
}

/// A detected signal with its numeric evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortSignalReading {
    pub signal: ShortSignal,
    pub detail: String,
    /// Name of the rule that fired
    pub rule: String,
    pub bias_ma5: f64,
    pub bias_ma10: f64,
}

type SignalRule = Rule<SignalContext, (ShortSignal, String)>;

/// Priority-ordered short-term signal rules.
pub fn signal_rules() -> Vec<SignalRule> {
    vec![
        Rule::new(
            "breakdown",
            |c: &SignalContext| c.input.ma20 > 0.0 && c.input.price < c.breakdown_line(),
            |c: &SignalContext| {
                (
                    ShortSignal::Breakdown,
                    format!(
                        "跌破MA20止损线{:.2}, 量比{:.2}",
                        c.breakdown_line(),
                        c.input.volume_ratio
                    ),
                )
            },
        ),
        Rule::new(
            "pullback_ma10",
            |c: &SignalContext| {
                c.is_low_volume()
                    && c.input.ma10 > 0.0
                    && c.bias_ma10.abs() < c.thresholds.pullback_ma10_bias
                    && c.is_bullish_aligned()
            },
            |c: &SignalContext| {
                (
                    ShortSignal::PullbackLowVolume,
                    format!(
                        "量比{:.2}, 回踩MA10(乖离{:.1}%), 均线多头",
                        c.input.volume_ratio, c.bias_ma10
                    ),
                )
            },
        ),
        Rule::new(
            "pullback_ma5",
            |c: &SignalContext| {
                c.is_low_volume()
                    && c.input.ma5 > 0.0
                    && c.bias_ma5.abs() < c.thresholds.pullback_ma5_bias
            },
            |c: &SignalContext| {
                (
                    ShortSignal::PullbackLowVolume,
                    format!(
                        "量比{:.2}, 回踩MA5(乖离{:.1}%)",
                        c.input.volume_ratio, c.bias_ma5
                    ),
                )
            },
        ),
        Rule::new(
            "volume_breakout",
            |c: &SignalContext| {
                c.is_high_volume()
                    && c.is_modest_advance()
                    && c.input.recent_high > 0.0
                    && c.input.price >= c.input.recent_high * c.thresholds.breakout_near_high_ratio
            },
            |c: &SignalContext| {
                (
                    ShortSignal::BreakoutHighVolume,
                    format!(
                        "量比{:.2}, 接近前高{:.2}",
                        c.input.volume_ratio, c.input.recent_high
                    ),
                )
            },
        ),
        Rule::new(
            "volume_rising",
            |c: &SignalContext| c.is_high_volume() && c.is_modest_advance(),
            |c: &SignalContext| {
                (
                    ShortSignal::RisingHighVolume,
                    format!(
                        "量比{:.2}, 放量上涨, MA5乖离{:.1}%",
                        c.input.volume_ratio, c.bias_ma5
                    ),
                )
            },
        ),
        Rule::new(
            "overextended",
            |c: &SignalContext| {
                c.bias_ma5 > c.thresholds.overextended_ma5_bias
                    || c.bias_ma10 > c.thresholds.overextended_ma10_bias
            },
            |c: &SignalContext| {
                (
                    ShortSignal::Overextended,
                    format!(
                        "MA5乖离{:.1}%, MA10乖离{:.1}%, 追高风险",
                        c.bias_ma5, c.bias_ma10
                    ),
                )
            },
        ),
        Rule::new(
            "none",
            |_: &SignalContext| true,
            |_: &SignalContext| (ShortSignal::None, "等待明确信号".to_string()),
        ),
    ]
}

/// Short-term signal detector.
#[derive(Debug, Clone)]
pub struct ShortSignalDetector {
    thresholds: SignalThresholds,
    rules: RuleTable<SignalContext, (ShortSignal, String)>,
}

impl Default for ShortSignalDetector {
    fn default() -> Self {
        Self::new(SignalThresholds::default())
    }
}

impl ShortSignalDetector {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self {
            thresholds,
            rules: RuleTable::new(signal_rules()),
        }
    }

    /// The rule table, in evaluation order.
    pub fn rules(&self) -> &RuleTable<SignalContext, (ShortSignal, String)> {
        &self.rules
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Classify a snapshot. Never fails; missing MAs degrade to `None`.
    pub fn detect(&self, input: &SignalInput) -> ShortSignalReading {
        let ctx = SignalContext::new(*input, self.thresholds);

        let (rule, (signal, detail)) = match self.rules.first_match(&ctx) {
            Some(fired) => (fired.rule, fired.outcome),
            None => ("none", (ShortSignal::None, "等待明确信号".to_string())),
        };

        tracing::debug!(
            rule,
            signal = ?signal,
            price = input.price,
            bias_ma5 = ctx.bias_ma5,
            bias_ma10 = ctx.bias_ma10,
            volume_ratio = input.volume_ratio,
            "Short signal detected"
        );

        ShortSignalReading {
            signal,
            detail,
            rule: rule.to_string(),
            bias_ma5: ctx.bias_ma5,
            bias_ma10: ctx.bias_ma10,
        }
    }
}
