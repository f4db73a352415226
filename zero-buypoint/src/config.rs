//! Engine configuration.
//!
//! Every threshold the rule engine consults lives here as plain data, so the
//! tables can be tuned from `~/.codecoder/buypoint.json` without touching
//! control flow. All sections default to the stock Dang-style values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::industry::{IndustryTier, StockArchetype};
use crate::validation::Validate;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ZERO_BUYPOINT_CONFIG";

/// Default config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "buypoint.json";

/// Get the config directory (`~/.codecoder`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codecoder")
}

/// Resolve the config file path, honouring `ZERO_BUYPOINT_CONFIG`.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join(CONFIG_FILE_NAME))
}

// ============================================================================
// Short-term signal thresholds
// ============================================================================

/// Thresholds for the short-term signal detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Volume ratio below which volume counts as "shrinking"
    pub low_volume_ratio: f64,
    /// Volume ratio above which volume counts as "expanding"
    pub high_volume_ratio: f64,
    /// Max |bias to MA10| (%) for a pullback to MA10
    pub pullback_ma10_bias: f64,
    /// Max |bias to MA5| (%) for a pullback to MA5
    pub pullback_ma5_bias: f64,
    /// Upper bound (%) of the MA5 bias for a volume breakout
    pub breakout_max_bias: f64,
    /// Price must reach this fraction of the recent high to count as a breakout
    pub breakout_near_high_ratio: f64,
    /// Bars used for the recent high
    pub recent_high_window: usize,
    /// Price below `MA20 * ratio` is a breakdown
    pub breakdown_ma20_ratio: f64,
    /// MA5 bias (%) above which the price is overextended
    pub overextended_ma5_bias: f64,
    /// MA10 bias (%) above which the price is overextended
    pub overextended_ma10_bias: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            low_volume_ratio: 0.8,
            high_volume_ratio: 1.5,
            pullback_ma10_bias: 3.0,
            pullback_ma5_bias: 2.0,
            breakout_max_bias: 5.0,
            breakout_near_high_ratio: 0.98,
            recent_high_window: 20,
            breakdown_ma20_ratio: 0.98,
            overextended_ma5_bias: 5.0,
            overextended_ma10_bias: 8.0,
        }
    }
}

// ============================================================================
// Support / resistance
// ============================================================================

/// Support and take-profit computation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    /// Fibonacci retracement ratios measured down from the window high
    pub fib_ratios: Vec<f64>,
    /// Bars required for the Fibonacci path
    pub fib_window: usize,
    /// Relative distance within which an MA resonates with a level (0.015 = 1.5%)
    pub resonance_tolerance: f64,
    /// Candidates must sit at least this far below the price (0.005 = 0.5%)
    pub min_distance: f64,
    /// Bars scanned for the take-profit high
    pub take_profit_window: usize,
    /// Bars required before a take-profit is reported
    pub take_profit_min_bars: usize,
    /// Minimum upside for the take-profit (0.03 = 3%)
    pub take_profit_min_upside: f64,
    /// Stop-loss as a fraction of MA20
    pub stop_loss_ratio: f64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            fib_ratios: vec![0.382, 0.5, 0.618],
            fib_window: 60,
            resonance_tolerance: 0.015,
            min_distance: 0.005,
            take_profit_window: 60,
            take_profit_min_bars: 20,
            take_profit_min_upside: 0.03,
            stop_loss_ratio: 0.98,
        }
    }
}

// ============================================================================
// MA120 positioning
// ============================================================================

/// MA120 positional analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Long-term MA period ("half-year line")
    pub ma120_period: usize,
    /// Deviation band (%) treated as "near" MA120, inclusive on both sides
    pub near_band_pct: f64,
    /// Deviation (%) below which a signal-less stock sits in the value zone
    pub value_zone_pct: f64,
    /// Minimum bars for any buy-point evaluation
    pub min_bars: usize,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            ma120_period: 120,
            near_band_pct: 3.0,
            value_zone_pct: -5.0,
            min_bars: 5,
        }
    }
}

// ============================================================================
// Valuation tables
// ============================================================================

/// Four-tier PE thresholds for one archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeThresholds {
    /// Ideal buying PE
    pub ideal: f64,
    /// Acceptable PE
    pub acceptable: f64,
    /// Warning PE ("挂旗杆" risk)
    pub warning: f64,
    /// Danger PE (walk away)
    pub danger: f64,
}

impl PeThresholds {
    pub const fn new(ideal: f64, acceptable: f64, warning: f64, danger: f64) -> Self {
        Self {
            ideal,
            acceptable,
            warning,
            danger,
        }
    }

    /// `ideal < acceptable < warning < danger`
    pub fn is_monotonic(&self) -> bool {
        self.ideal > 0.0
            && self.ideal < self.acceptable
            && self.acceptable < self.warning
            && self.warning < self.danger
    }
}

/// PE thresholds per valuation archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeThresholdTable {
    pub cyclical: PeThresholds,
    pub banking: PeThresholds,
    pub tech: PeThresholds,
    pub consumer: PeThresholds,
    pub default: PeThresholds,
}

impl PeThresholdTable {
    /// Thresholds for an archetype.
    pub fn for_archetype(&self, archetype: StockArchetype) -> &PeThresholds {
        match archetype {
            StockArchetype::Cyclical => &self.cyclical,
            StockArchetype::Banking => &self.banking,
            StockArchetype::Tech => &self.tech,
            StockArchetype::Consumer => &self.consumer,
            StockArchetype::Default => &self.default,
        }
    }

    /// Iterate over all rows of the table.
    pub fn rows(&self) -> [(StockArchetype, &PeThresholds); 5] {
        [
            (StockArchetype::Cyclical, &self.cyclical),
            (StockArchetype::Banking, &self.banking),
            (StockArchetype::Tech, &self.tech),
            (StockArchetype::Consumer, &self.consumer),
            (StockArchetype::Default, &self.default),
        ]
    }
}

impl Default for PeThresholdTable {
    fn default() -> Self {
        Self {
            cyclical: PeThresholds::new(10.0, 15.0, 20.0, 30.0),
            banking: PeThresholds::new(4.0, 6.0, 8.0, 12.0),
            tech: PeThresholds::new(20.0, 40.0, 100.0, 300.0),
            consumer: PeThresholds::new(15.0, 25.0, 35.0, 50.0),
            default: PeThresholds::new(12.0, 20.0, 30.0, 50.0),
        }
    }
}

/// Dividend yield bands (%), each inclusive at its lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividendBands {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
}

impl Default for DividendBands {
    fn default() -> Self {
        Self {
            excellent: 5.0,
            good: 3.0,
            acceptable: 1.0,
        }
    }
}

// ============================================================================
// Trading rules and scoring
// ============================================================================

/// Profit-take and rebuy trigger levels (%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeThresholds {
    /// Gain that triggers a soft profit-take
    pub profit_take_soft: f64,
    /// Gain that triggers a hard profit-take
    pub profit_take_hard: f64,
    /// Drop from high that allows a partial rebuy
    pub rebuy_partial: f64,
    /// Drop from high that is an ideal rebuy
    pub rebuy_ideal: f64,
}

impl Default for TradeThresholds {
    fn default() -> Self {
        Self {
            profit_take_soft: 30.0,
            profit_take_hard: 50.0,
            rebuy_partial: 10.0,
            rebuy_ideal: 15.0,
        }
    }
}

/// Risk penalty deltas (non-positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPenalties {
    pub profit_take: i32,
    pub shareholder_selling: i32,
    pub blacklist_industry: i32,
    pub pe_danger: i32,
    pub poor_dividend: i32,
}

impl Default for RiskPenalties {
    fn default() -> Self {
        Self {
            profit_take: -10,
            shareholder_selling: -5,
            blacklist_industry: -5,
            pe_danger: -5,
            poor_dividend: -3,
        }
    }
}

/// Business-model score per industry tier (0-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryScores {
    pub preferred: i32,
    pub normal: i32,
    pub caution: i32,
    pub blacklist: i32,
}

impl Default for IndustryScores {
    fn default() -> Self {
        Self {
            preferred: 15,
            normal: 10,
            caution: 5,
            blacklist: 0,
        }
    }
}

impl IndustryScores {
    pub fn for_tier(&self, tier: IndustryTier) -> i32 {
        match tier {
            IndustryTier::Preferred => self.preferred,
            IndustryTier::Normal => self.normal,
            IndustryTier::Caution => self.caution,
            IndustryTier::Blacklist => self.blacklist,
        }
    }
}

// ============================================================================
// Dividend estimation
// ============================================================================

/// Payout-ratio smoothing and correction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Most recent annual reports averaged
    pub history_years: usize,
    /// Payout ratios at or above this are one-off distributions and skipped
    pub max_valid_ratio: f64,
    /// Default payout for banks and utilities without history
    pub default_payout: f64,
    /// Payout floor enforced for banks
    pub bank_floor: f64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            history_years: 3,
            max_valid_ratio: 2.0,
            default_payout: 0.30,
            bank_floor: 0.30,
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Top-level configuration
// ============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub signal: SignalThresholds,
    #[serde(default)]
    pub support: SupportConfig,
    #[serde(default)]
    pub position: PositionConfig,
    #[serde(default)]
    pub pe_thresholds: PeThresholdTable,
    #[serde(default)]
    pub dividend_bands: DividendBands,
    #[serde(default)]
    pub trade: TradeThresholds,
    #[serde(default)]
    pub penalties: RiskPenalties,
    #[serde(default)]
    pub industry_scores: IndustryScores,
    #[serde(default)]
    pub payout: PayoutConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl EngineConfig {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// The threshold tables are validated before the config is returned.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ZERO_BUYPOINT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("ZERO_BUYPOINT_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}
