//! The trust boundary between free-text model output and the execution path.
//!
//! Extraction is a total function returning an optional JSON candidate;
//! validation turns the candidate into a typed plan or fails with the
//! violated rule. No other component may act on unvalidated plan data.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

use crate::error::PlanError;

/// Fixed schema version literal every plan must carry.
pub const PLAN_SCHEMA_VERSION: &str = "1.0";

/// Hard cap on orders per plan.
pub const MAX_PLAN_ORDERS: usize = 25;

// ============================================================================
// Plan types
// ============================================================================

/// Proposed direction of a plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Buy,
    Sell,
}

/// Execution style of a plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

/// One proposed trade within a validated plan, prior to pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOrder {
    /// Upper-cased, non-empty ticker symbol.
    pub symbol: String,
    pub action: OrderAction,
    /// Whole-share quantity; always positive.
    pub quantity: u32,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// The validated structured trade-decision output of one LLM invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitragePlan {
    pub version: String,
    /// ISO-8601 generation timestamp as reported by the model.
    pub generated_at: String,
    pub arbitrages: Vec<PlanOrder>,
}

// ============================================================================
// Extraction
// ============================================================================

/// Recovers a JSON candidate from arbitrary model output.
///
/// Ordered attempts, first parse wins: strip code fences, parse the whole
/// trimmed text, slice from the first `{` to the last `}`. Returns `None`
/// when nothing parses; never fails.
pub fn extract_json_candidate(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut candidates: Vec<String> = Vec::new();

    if trimmed.starts_with("```") {
        candidates.push(strip_code_fences(trimmed));
    }

    candidates.push(trimmed.to_string());

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(trimmed[start..=end].to_string());
        }
    }

    candidates
        .into_iter()
        .find(|candidate| serde_json::from_str::<Value>(candidate).is_ok())
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ============================================================================
// Validation
// ============================================================================

/// Extracts and validates a plan from raw model output.
pub fn parse_plan(text: &str) -> Result<ArbitragePlan, PlanError> {
    let candidate = extract_json_candidate(text).ok_or(PlanError::Extraction)?;
    // The candidate parsed once already during extraction.
    let value: Value = serde_json::from_str(&candidate).map_err(|_| PlanError::Extraction)?;
    validate_plan(&value)
}

/// Validates a parsed JSON value against the plan schema.
pub fn validate_plan(value: &Value) -> Result<ArbitragePlan, PlanError> {
    let root = value
        .as_object()
        .ok_or_else(|| PlanError::Validation("plan must be a JSON object".to_string()))?;

    let version = root
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| PlanError::Validation("missing 'version'".to_string()))?;
    if version != PLAN_SCHEMA_VERSION {
        return Err(PlanError::Validation(format!(
            "unsupported plan version '{}', expected '{}'",
            version, PLAN_SCHEMA_VERSION
        )));
    }

    let generated_at = root
        .get("generatedAt")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let orders_value = root
        .get("arbitrages")
        .and_then(Value::as_array)
        .ok_or_else(|| PlanError::Validation("'arbitrages' must be an array".to_string()))?;
    if orders_value.len() > MAX_PLAN_ORDERS {
        return Err(PlanError::Validation(format!(
            "plan has {} orders, maximum is {}",
            orders_value.len(),
            MAX_PLAN_ORDERS
        )));
    }

    let arbitrages = orders_value
        .iter()
        .enumerate()
        .map(|(index, order)| validate_order(index, order))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArbitragePlan {
        version: version.to_string(),
        generated_at,
        arbitrages,
    })
}

fn validate_order(index: usize, value: &Value) -> Result<PlanOrder, PlanError> {
    let violation = |rule: &str| PlanError::Validation(format!("order {}: {}", index, rule));

    let order = value
        .as_object()
        .ok_or_else(|| violation("must be a JSON object"))?;

    let symbol = order
        .get("symbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| violation("'symbol' must be a non-empty string"))?
        .to_ascii_uppercase();

    let action = match order.get("action").and_then(Value::as_str) {
        Some(a) if a.eq_ignore_ascii_case("BUY") => OrderAction::Buy,
        Some(a) if a.eq_ignore_ascii_case("SELL") => OrderAction::Sell,
        _ => return Err(violation("'action' must be BUY or SELL")),
    };

    let quantity = order
        .get("quantity")
        .and_then(Value::as_u64)
        .filter(|q| *q > 0 && *q <= u32::MAX as u64)
        .ok_or_else(|| violation("'quantity' must be a positive integer"))?
        as u32;

    let order_type = match order.get("orderType").and_then(Value::as_str) {
        None => OrderType::Market,
        Some(t) if t.eq_ignore_ascii_case("market") => OrderType::Market,
        Some(t) if t.eq_ignore_ascii_case("limit") => OrderType::Limit,
        Some(_) => return Err(violation("'orderType' must be market or limit")),
    };

    let limit_price = match order.get("limitPrice") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            decimal_from_value(raw)
                .filter(|price| *price > Decimal::ZERO)
                .ok_or_else(|| violation("'limitPrice' must be a positive number"))?,
        ),
    };
    if order_type == OrderType::Limit && limit_price.is_none() {
        return Err(violation("limit orders require a 'limitPrice'"));
    }

    let confidence = match order.get("confidence") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            raw.as_f64()
                .filter(|c| (0.0..=1.0).contains(c))
                .ok_or_else(|| violation("'confidence' must be between 0 and 1"))?,
        ),
    };

    let rationale = order
        .get("rationale")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(PlanOrder {
        symbol,
        action,
        quantity,
        order_type,
        limit_price,
        confidence,
        rationale,
    })
}

/// Accepts JSON numbers and numeric strings, exactly.
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

// ============================================================================
// Machine-readable schema
// ============================================================================

/// The JSON Schema handed to providers in prompts and queryable by
/// administrative tooling.
pub fn plan_json_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "ArbitragePlan",
        "type": "object",
        "required": ["version", "generatedAt", "arbitrages"],
        "properties": {
            "version": {"type": "string", "const": PLAN_SCHEMA_VERSION},
            "generatedAt": {"type": "string", "format": "date-time"},
            "arbitrages": {
                "type": "array",
                "maxItems": MAX_PLAN_ORDERS,
                "items": {
                    "type": "object",
                    "required": ["symbol", "action", "quantity"],
                    "properties": {
                        "symbol": {"type": "string", "minLength": 1},
                        "action": {"type": "string", "enum": ["BUY", "SELL"]},
                        "quantity": {"type": "integer", "minimum": 1},
                        "orderType": {
                            "type": "string",
                            "enum": ["market", "limit"],
                            "default": "market"
                        },
                        "limitPrice": {
                            "type": "number",
                            "exclusiveMinimum": 0,
                            "description": "Required when orderType is limit"
                        },
                        "confidence": {"type": "number", "minimum": 0, "maximum": 1},
                        "rationale": {"type": "string"}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan_json() -> String {
        json!({
            "version": "1.0",
            "generatedAt": "2026-08-07T12:00:00Z",
            "arbitrages": [
                {"symbol": "aapl", "action": "BUY", "quantity": 10},
                {
                    "symbol": "MSFT",
                    "action": "SELL",
                    "quantity": 2,
                    "orderType": "limit",
                    "limitPrice": 410.5,
                    "confidence": 0.8,
                    "rationale": "overweight"
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn extracts_from_fenced_commented_and_raw_text() {
        let raw = plan_json();
        let fenced = format!("```json\n{}\n```", raw);
        let chatty = format!("Here is the plan you asked for:\n{}\nLet me know!", raw);

        let expected: Value = serde_json::from_str(&raw).unwrap();
        for text in [raw.as_str(), fenced.as_str(), chatty.as_str()] {
            let candidate = extract_json_candidate(text).expect("candidate");
            let parsed: Value = serde_json::from_str(&candidate).unwrap();
            assert_eq!(parsed, expected);
        }
    }

    #[test]
    fn extraction_fails_without_recoverable_json() {
        assert!(extract_json_candidate("no orders today, market is closed").is_none());
        assert!(extract_json_candidate("").is_none());
        assert!(matches!(
            parse_plan("nothing here"),
            Err(PlanError::Extraction)
        ));
    }

    #[test]
    fn valid_plan_parses_and_normalizes_symbols() {
        let plan = parse_plan(&plan_json()).unwrap();
        assert_eq!(plan.version, PLAN_SCHEMA_VERSION);
        assert_eq!(plan.arbitrages.len(), 2);
        assert_eq!(plan.arbitrages[0].symbol, "AAPL");
        assert_eq!(plan.arbitrages[0].order_type, OrderType::Market);
        assert_eq!(plan.arbitrages[1].limit_price, Some(dec!(410.5)));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let text = json!({"version": "2.0", "arbitrages": []}).to_string();
        assert!(matches!(parse_plan(&text), Err(PlanError::Validation(_))));
    }

    #[test]
    fn limit_order_without_limit_price_is_rejected() {
        let text = json!({
            "version": "1.0",
            "arbitrages": [
                {"symbol": "AAPL", "action": "BUY", "quantity": 1, "orderType": "limit"}
            ]
        })
        .to_string();
        let err = parse_plan(&text).unwrap_err();
        match err {
            PlanError::Validation(message) => assert!(message.contains("limitPrice")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for quantity in [json!(0), json!(-3), json!(1.5)] {
            let text = json!({
                "version": "1.0",
                "arbitrages": [{"symbol": "AAPL", "action": "BUY", "quantity": quantity}]
            })
            .to_string();
            assert!(matches!(parse_plan(&text), Err(PlanError::Validation(_))));
        }
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let text = json!({
            "version": "1.0",
            "arbitrages": [
                {"symbol": "AAPL", "action": "BUY", "quantity": 1, "confidence": 1.2}
            ]
        })
        .to_string();
        assert!(matches!(parse_plan(&text), Err(PlanError::Validation(_))));
    }

    #[test]
    fn too_many_orders_are_rejected() {
        let orders: Vec<Value> = (0..MAX_PLAN_ORDERS + 1)
            .map(|i| json!({"symbol": format!("SYM{}", i), "action": "BUY", "quantity": 1}))
            .collect();
        let text = json!({"version": "1.0", "arbitrages": orders}).to_string();
        assert!(matches!(parse_plan(&text), Err(PlanError::Validation(_))));
    }

    #[test]
    fn empty_plan_is_valid() {
        let text = json!({"version": "1.0", "arbitrages": []}).to_string();
        let plan = parse_plan(&text).unwrap();
        assert!(plan.arbitrages.is_empty());
    }

    #[test]
    fn schema_document_matches_the_validator() {
        let schema = plan_json_schema();
        assert_eq!(schema["properties"]["version"]["const"], PLAN_SCHEMA_VERSION);
        assert_eq!(
            schema["properties"]["arbitrages"]["maxItems"],
            json!(MAX_PLAN_ORDERS)
        );
    }
}
