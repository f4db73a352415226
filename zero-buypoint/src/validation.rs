//! Configuration validation.
//!
//! Threshold tables must be strictly increasing.

use thiserror::Error;

use crate::config::{
    DividendBands, EngineConfig, PayoutConfig, PeThresholdTable, PositionConfig, SupportConfig,
    TradeThresholds,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Thresholds for {table} are not strictly increasing")]
    NotMonotonic { table: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl Validate for PeThresholdTable {
    fn validate(&self) -> ValidationResult<()> {
        for (archetype, thresholds) in self.rows() {
            if !thresholds.is_monotonic() {
                return Err(ValidationError::NotMonotonic {
                    table: format!("pe_thresholds.{:?}", archetype).to_lowercase(),
                });
            }
        }
        Ok(())
    }
}

impl Validate for DividendBands {
    fn validate(&self) -> ValidationResult<()> {
        if !(self.acceptable >= 0.0 && self.acceptable < self.good && self.good < self.excellent) {
            return Err(ValidationError::NotMonotonic {
                table: "dividend_bands".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for SupportConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.fib_ratios.is_empty() {
            return Err(invalid("support.fib_ratios", "at least one ratio is required"));
        }
        if let Some(bad) = self.fib_ratios.iter().find(|r| !(**r > 0.0 && **r < 1.0)) {
            return Err(invalid(
                "support.fib_ratios",
                format!("ratio {} is outside (0, 1)", bad),
            ));
        }
        if self.resonance_tolerance < 0.0 {
            return Err(invalid("support.resonance_tolerance", "must be non-negative"));
        }
        if self.min_distance < 0.0 {
            return Err(invalid("support.min_distance", "must be non-negative"));
        }
        if self.fib_window == 0 || self.take_profit_window == 0 {
            return Err(invalid("support", "windows must be positive"));
        }
        Ok(())
    }
}

impl Validate for PositionConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.ma120_period == 0 {
            return Err(invalid("position.ma120_period", "must be positive"));
        }
        if self.min_bars == 0 {
            return Err(invalid("position.min_bars", "must be positive"));
        }
        if self.near_band_pct < 0.0 {
            return Err(invalid("position.near_band_pct", "must be non-negative"));
        }
        Ok(())
    }
}

impl Validate for TradeThresholds {
    fn validate(&self) -> ValidationResult<()> {
        if self.profit_take_soft > self.profit_take_hard {
            return Err(invalid(
                "trade.profit_take_soft",
                "soft trigger must not exceed hard trigger",
            ));
        }
        if self.rebuy_partial > self.rebuy_ideal {
            return Err(invalid(
                "trade.rebuy_partial",
                "partial rebuy must not exceed ideal rebuy",
            ));
        }
        Ok(())
    }
}

impl Validate for PayoutConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.history_years == 0 {
            return Err(invalid("payout.history_years", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.bank_floor) {
            return Err(invalid("payout.bank_floor", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.default_payout) {
            return Err(invalid("payout.default_payout", "must be within [0, 1]"));
        }
        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> ValidationResult<()> {
        let results = [
            self.pe_thresholds.validate(),
            self.dividend_bands.validate(),
            self.support.validate(),
            self.position.validate(),
            self.trade.validate(),
            self.payout.validate(),
        ];

        let mut errors: Vec<ValidationError> =
            results.into_iter().filter_map(|r| r.err()).collect();

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeThresholds;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_non_monotonic_pe_rejected() {
        let mut config = EngineConfig::default();
        config.pe_thresholds.tech = PeThresholds::new(20.0, 10.0, 100.0, 300.0);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::NotMonotonic { ref table } if table == "pe_thresholds.tech"));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = EngineConfig::default();
        config.support.fib_ratios = vec![1.5];
        config.trade.profit_take_soft = 80.0;

        assert!(matches!(
            config.validate(),
            Err(ValidationError::Multiple(errors)) if errors.len() == 2
        ));
    }
}
