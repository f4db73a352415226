//! Integration tests for the fundamental, dividend and narrative paths.
//!
//! Industry text + PE + yield + price moves → fundamental score, and
//! dividend history → expected yield → injected dashboard.

use std::io::Write;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use zero_buypoint::dividend::{DividendRecord, DividendProfile, StaticDividendHistory};
use zero_buypoint::fundamental::MAX_FUNDAMENTAL_SCORE;
use zero_buypoint::market::Bar;
use zero_buypoint::narrative::{generate_dashboard, NarrativeContext, NarrativeGenerator};
use zero_buypoint::{
    DividendYieldEstimator, EngineConfig, FundamentalAnalyzer, FundamentalInput,
    HistoricalSeries, IndustryClassifier, IndustryTier, StockAnalyzer, StockInput, Validate,
    ValuationScorer,
};

// ============================================================================
// Test Data Generators
// ============================================================================

fn flat_series(count: usize, price: f64) -> HistoricalSeries {
    HistoricalSeries::new(
        (0..count)
            .map(|_| Bar::new(price, price * 1.01, price * 0.99, price, 1_000.0))
            .collect(),
    )
}

fn bank_history() -> StaticDividendHistory {
    StaticDividendHistory::new()
        .with_records(
            "601398",
            vec![
                DividendRecord::new("2023年报", "31.2%"),
                DividendRecord::new("2023中报", "15.0%"),
                DividendRecord::new("2022年报", "30.8%"),
                DividendRecord::new("2021年报", "31.0%"),
                DividendRecord::new("2020年报", "--"),
            ],
        )
        .with_records("600900", vec![DividendRecord::new("2023年报", "--")])
}

/// Echoes the computed yield back with a wrong number, like a model would.
struct HallucinatingGenerator;

impl NarrativeGenerator for HallucinatingGenerator {
    fn generate(&self, context: &NarrativeContext) -> anyhow::Result<serde_json::Value> {
        Ok(json!({
            "analysis_summary": format!("{} 值得关注", context.code),
            "dividend_analysis": {"dividend_yield": 12.0, "dividend_comment": "高股息"},
            "buy_point": {"label": "best"}
        }))
    }
}

// ============================================================================
// Classification and scoring
// ============================================================================

#[test]
fn test_industry_tiers() {
    let classifier = IndustryClassifier::new();
    assert_eq!(classifier.classify_industry("光伏设备").tier, IndustryTier::Blacklist);
    assert_eq!(classifier.classify_industry("银行").tier, IndustryTier::Preferred);
    assert_eq!(classifier.classify_industry("造纸印刷").tier, IndustryTier::Normal);
}

#[test]
fn test_dividend_band_boundaries() {
    let scorer = ValuationScorer::default();
    assert_eq!(scorer.evaluate_dividend(Some(5.0)).score, 20);
    assert_eq!(scorer.evaluate_dividend(Some(4.99)).score, 15);
}

#[test]
fn test_default_config_tables_validate() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    for (_, row) in config.pe_thresholds.rows() {
        assert!(row.ideal < row.acceptable && row.acceptable < row.warning && row.warning < row.danger);
    }
}

#[test]
fn test_invalid_price_gives_sentinel() {
    let estimator = DividendYieldEstimator::new(bank_history());
    let estimate =
        estimator.calculate_expected_yield("601398", 0.0, Some(10.0), DividendProfile::Bank);
    assert_eq!(estimate.expected_yield_pct, 0.0);
    assert_eq!(estimate.reason, "价格或PE数据无效");
}

#[test]
fn test_bank_history_is_averaged() {
    let estimator = DividendYieldEstimator::new(bank_history());
    let estimate =
        estimator.calculate_expected_yield("601398", 5.0, Some(5.0), DividendProfile::Bank);
    // (31.2 + 30.8 + 31.0) / 3 = 31.0%, above the bank floor
    assert!((estimate.expected_yield_pct - 6.2).abs() < 1e-9);
    assert!(estimate.reason.contains("三年平均31.0%"));
    assert!(!estimate.reason.contains("银行修正"));
}

#[test]
fn test_sentinel_only_history_counts_as_missing() {
    let estimator = DividendYieldEstimator::new(Arc::new(bank_history()));
    let estimate =
        estimator.calculate_expected_yield("600900", 20.0, Some(20.0), DividendProfile::Utility);
    assert!(estimate.reason.ends_with("(无历史数据(默认))"));
    assert!((estimate.expected_yield_pct - 1.5).abs() < 1e-9);
}

proptest! {
    #[test]
    fn prop_fundamental_score_clamped(
        pe in prop::option::of(-100.0f64..2000.0),
        dividend_yield in prop::option::of(0.0f64..25.0),
        change in prop::option::of(-80.0f64..500.0),
        fall in prop::option::of(0.0f64..90.0),
        selling in any::<bool>(),
        industry in prop::sample::select(vec!["银行", "光伏设备", "证券", "软件开发", "", "未知行业"]),
    ) {
        let analyzer = FundamentalAnalyzer::new();
        let input = FundamentalInput {
            industry: industry.to_string(),
            pe,
            dividend_yield,
            price_change_pct: change,
            price_from_high_pct: fall,
            shareholder_selling: selling,
        };
        let first = analyzer.analyze(&input);
        prop_assert!(first.fundamental_score >= 0);
        prop_assert!(first.fundamental_score <= MAX_FUNDAMENTAL_SCORE);
        prop_assert_eq!(first, analyzer.analyze(&input));
    }
}

// ============================================================================
// Facade and narrative
// ============================================================================

#[test]
fn test_config_file_drives_the_facade() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "position": {{ "min_bars": 10 }},
            "payout": {{ "default_payout": 0.5 }}
        }}"#
    )
    .unwrap();

    let config = EngineConfig::load_from(file.path()).unwrap();
    assert_eq!(config.position.min_bars, 10);
    assert_eq!(config.position.ma120_period, 120);

    let analyzer = StockAnalyzer::with_config(StaticDividendHistory::new(), &config);
    let mut input = StockInput::new("600011", flat_series(8, 10.0));
    input.fundamentals = FundamentalInput::new("电力").with_pe(10.0);

    let report = analyzer.analyze_stock(&input);
    // Eight bars are below the configured minimum
    assert!(report.buy_point.is_none());
    // Utility without history uses the configured default payout
    assert_eq!(report.dividend.profile, DividendProfile::Utility);
    assert!((report.dividend.expected_yield_pct - 5.0).abs() < 1e-9);
}

#[test]
fn test_dashboard_shows_computed_numbers() {
    let analyzer = StockAnalyzer::new(bank_history());
    let mut input = StockInput::new("601398", flat_series(30, 5.0));
    input.name = Some("工商银行".to_string());
    input.fundamentals = FundamentalInput::new("银行")
        .with_pe(5.0)
        .with_dividend_yield(6.2);

    let report = analyzer.analyze_stock(&input);
    let context = report.narrative_context();
    let dashboard = generate_dashboard(&HallucinatingGenerator, &context);

    let computed = report.dividend.expected_yield_pct;
    assert_eq!(dashboard["dividend_analysis"]["dividend_yield"], json!(computed));
    let comment = dashboard["dividend_analysis"]["dividend_comment"].as_str().unwrap();
    assert!(comment.starts_with("高股息 [算法确证: 预测EPS 1.00"));

    let buy_point = report.buy_point.as_ref().unwrap();
    assert_eq!(dashboard["buy_point"]["label_text"], json!(buy_point.label_text));
    assert_eq!(dashboard["analysis_summary"], json!("601398 值得关注"));
}

#[test]
fn test_batch_matches_single_analysis() {
    let analyzer = StockAnalyzer::new(bank_history());
    let inputs: Vec<StockInput> = (0..16)
        .map(|i| {
            let mut input = StockInput::new(format!("60{:04}", i), flat_series(20 + i, 10.0 + i as f64));
            input.fundamentals = FundamentalInput::new("银行").with_pe(4.0 + i as f64);
            input
        })
        .collect();

    let batch = analyzer.analyze_batch(&inputs);
    assert_eq!(batch.len(), inputs.len());
    for (report, input) in batch.iter().zip(&inputs) {
        assert_eq!(report, &analyzer.analyze_stock(input));
    }
}
