//! Zero Buy-Point Library
//!
//! Deterministic scoring engine for A-share stocks: technical buy points,
//! value-investing fundamentals and forward dividend yield. Every result is
//! computed from caller-supplied data; nothing here fetches quotes or calls
//! a model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        StockAnalyzer (batch)                        │
//! ├──────────────────────┬──────────────────────┬───────────────────────┤
//! │  BuyPointAnalyzer    │  FundamentalAnalyzer │  DividendYieldEstimator│
//! │  ├ ShortSignal       │  ├ IndustryClassifier│  ├ payout history      │
//! │  ├ SupportResistance │  ├ ValuationScorer   │  └ profile correction  │
//! │  └ BuyPointClassifier│  └ TradeSignals      │                       │
//! ├──────────────────────┴──────────────────────┴───────────────────────┤
//! │            narrative: inject computed values into dashboards        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Buy point
//! - Short-term signal: low-volume pullback, volume breakout, breakdown, overextension
//! - Position against MA120 (the "half-year line")
//! - Add-on price from Fibonacci levels resonating with moving averages
//!
//! ## Fundamentals
//! - Industry tier: preferred / normal / caution / blacklist
//! - PE judged per archetype (banks and tech have very different norms)
//! - Profit-take at +30% / +50%, rebuy after -10% / -15%
//!
//! ## Dividend
//! - Expected yield = (price / PE) * average payout / price
//! - Banks keep a 30% payout floor

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod analyzer;
pub mod buy_point;
pub mod config;
pub mod dividend;
pub mod error;
pub mod fundamental;
pub mod industry;
pub mod logging;
pub mod market;
pub mod narrative;
pub mod rules;
pub mod trade_signal;
pub mod validation;
pub mod valuation;

pub use analyzer::{StockAnalyzer, StockInput, StockReport};
pub use buy_point::{
    BuyPointAnalyzer, BuyPointClassifier, BuyPointLabel, BuyPointResult, Ma120Status,
    ShortSignal, ShortSignalDetector, SupportResistanceLocator,
};
pub use config::EngineConfig;
pub use dividend::{
    DividendEstimate, DividendHistoryProvider, DividendProfile, DividendRecord,
    DividendYieldEstimator, StaticDividendHistory,
};
pub use error::{Error, Result};
pub use fundamental::{FundamentalAnalyzer, FundamentalAssessment, FundamentalInput};
pub use industry::{IndustryClassification, IndustryClassifier, IndustryTier, StockArchetype};
pub use market::{Bar, HistoricalSeries, PriceSnapshot, RealtimeQuote};
pub use narrative::{NarrativeContext, NarrativeGenerator};
pub use trade_signal::{ProfitTakeSignal, RebuySignal, TradeSignalEvaluator};
pub use validation::Validate;
pub use valuation::{DividendStatus, PeStatus, ValuationScorer};
