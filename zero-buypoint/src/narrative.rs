//! Boundary with the narrative (LLM) layer.
//!
//! The generator is opaque: it receives every computed record and returns a
//! free-form JSON dashboard. Computed numbers are then written back over
//! whatever the generator produced, so the dividend yield and buy point on
//! display always come from this engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::buy_point::BuyPointResult;
use crate::dividend::DividendEstimate;
use crate::error::Result;
use crate::fundamental::FundamentalAssessment;

/// Dashboard key for the dividend section.
pub const DIVIDEND_SECTION: &str = "dividend_analysis";

/// Dashboard key for the buy-point section.
pub const BUY_POINT_SECTION: &str = "buy_point";

/// Everything computed for one stock, handed to the narrative layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeContext {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_point: Option<BuyPointResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundamental: Option<FundamentalAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend: Option<DividendEstimate>,
}

impl NarrativeContext {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }
}

/// Produces a narrative dashboard from computed records.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, context: &NarrativeContext) -> anyhow::Result<Value>;
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Overwrite the dashboard with computed values.
///
/// The dividend yield replaces the generator's figure and the calculation
/// trace is appended to its comment as `[算法确证: ...]`. The buy-point
/// record replaces the generator's section wholesale. A dashboard that is
/// not a JSON object is replaced by one.
pub fn inject_computed(dashboard: &mut Value, context: &NarrativeContext) -> Result<()> {
    let root = ensure_object(dashboard);

    if let Some(dividend) = &context.dividend {
        let section = ensure_object(
            root.entry(DIVIDEND_SECTION)
                .or_insert_with(|| Value::Object(Map::new())),
        );

        section.insert(
            "dividend_yield".to_string(),
            serde_json::to_value(dividend.expected_yield_pct)?,
        );

        let generated = section
            .get("dividend_comment")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let combined = format!("{} [算法确证: {}]", generated, dividend.reason)
            .trim()
            .to_string();
        section.insert("dividend_comment".to_string(), Value::String(combined));

        tracing::info!(
            code = %context.code,
            dividend_yield = dividend.expected_yield_pct,
            "Injected computed dividend yield"
        );
    }

    if let Some(buy_point) = &context.buy_point {
        root.insert(BUY_POINT_SECTION.to_string(), serde_json::to_value(buy_point)?);
        tracing::info!(
            code = %context.code,
            label = %buy_point.label_text,
            "Injected computed buy point"
        );
    }

    Ok(())
}

/// Run the generator and inject computed values into its output.
///
/// A failing generator yields a dashboard holding only computed values.
pub fn generate_dashboard<G>(generator: &G, context: &NarrativeContext) -> Value
where
    G: NarrativeGenerator + ?Sized,
{
    let mut dashboard = match generator.generate(context) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(code = %context.code, error = %e, "Narrative generation failed");
            Value::Object(Map::new())
        }
    };

    if let Err(e) = inject_computed(&mut dashboard, context) {
        tracing::warn!(code = %context.code, error = %e, "Failed to inject computed values");
    }

    dashboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dividend::DividendProfile;
    use serde_json::json;

    struct CannedGenerator(Value);

    impl NarrativeGenerator for CannedGenerator {
        fn generate(&self, _context: &NarrativeContext) -> anyhow::Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct BrokenGenerator;

    impl NarrativeGenerator for BrokenGenerator {
        fn generate(&self, _context: &NarrativeContext) -> anyhow::Result<Value> {
            anyhow::bail!("model quota exhausted")
        }
    }

    fn dividend(yield_pct: f64, reason: &str) -> DividendEstimate {
        DividendEstimate {
            code: "601398".to_string(),
            expected_yield_pct: yield_pct,
            reason: reason.to_string(),
            profile: DividendProfile::Bank,
            eps_forecast: Some(1.2),
            payout: None,
        }
    }

    #[test]
    fn test_dividend_overrides_model_figure() {
        let mut dashboard = json!({
            "dividend_analysis": {"dividend_yield": 9.9, "dividend_comment": "分红稳定"},
            "core_conclusion": {"one_sentence": "持有"}
        });
        let mut context = NarrativeContext::new("601398");
        context.dividend = Some(dividend(6.0, "预测EPS 1.20"));

        inject_computed(&mut dashboard, &context).unwrap();

        assert_eq!(dashboard["dividend_analysis"]["dividend_yield"], json!(6.0));
        assert_eq!(
            dashboard["dividend_analysis"]["dividend_comment"],
            json!("分红稳定 [算法确证: 预测EPS 1.20]")
        );
        assert_eq!(dashboard["core_conclusion"]["one_sentence"], json!("持有"));
    }

    #[test]
    fn test_missing_sections_are_created() {
        let mut dashboard = Value::Null;
        let mut context = NarrativeContext::new("601398");
        context.dividend = Some(dividend(0.0, "价格或PE数据无效"));

        inject_computed(&mut dashboard, &context).unwrap();
        assert_eq!(
            dashboard["dividend_analysis"]["dividend_comment"],
            json!("[算法确证: 价格或PE数据无效]")
        );
        assert!(dashboard.get(BUY_POINT_SECTION).is_none());
    }

    #[test]
    fn test_generator_output_is_kept_alongside_injection() {
        let generator = CannedGenerator(json!({"analysis_summary": "估值合理"}));
        let mut context = NarrativeContext::new("601398");
        context.dividend = Some(dividend(5.0, "ok"));

        let dashboard = generate_dashboard(&generator, &context);
        assert_eq!(dashboard["analysis_summary"], json!("估值合理"));
        assert_eq!(dashboard["dividend_analysis"]["dividend_yield"], json!(5.0));
    }

    #[test]
    fn test_failed_generator_still_carries_computed_values() {
        let mut context = NarrativeContext::new("601398");
        context.dividend = Some(dividend(4.2, "ok"));

        let dashboard = generate_dashboard(&BrokenGenerator, &context);
        assert_eq!(dashboard["dividend_analysis"]["dividend_yield"], json!(4.2));
    }
}
