//! Webhook payload validation
//!
//! Every field is checked and every problem recorded before anything is
//! returned, so one rejection lists everything wrong with a signal.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{ExpirySelector, StrikeSelector, TradeIntent};
use crate::common::errors::{Result, ValidationError, ValidationIssue};
use crate::common::types::{Direction, OptionKind, OrderType};

/// Routing field added by the webhook sender; never part of the intent
const ROUTING_KEY: &str = "key";

const WEBHOOK_DIRECTIONS: [Direction; 4] =
    [Direction::Bto, Direction::Sto, Direction::Btc, Direction::Stc];

/// Parse a JSON body and validate it
pub fn parse_trade_intent(body: &str) -> Result<TradeIntent> {
    let value: Value = serde_json::from_str(body)?;
    Ok(validate_payload(&value)?)
}

/// Validate an untyped payload into a [`TradeIntent`]
pub fn validate_payload(payload: &Value) -> std::result::Result<TradeIntent, ValidationError> {
    match payload {
        Value::Object(map) => validate_map(map),
        other => Err(ValidationError::new(vec![ValidationIssue::MalformedField {
            field: "Payload".to_string(),
            value: other.to_string(),
            expected: "a JSON object".to_string(),
        }])),
    }
}

/// Validate a key-value payload; keys match case-insensitively
pub fn validate_map(raw: &Map<String, Value>) -> std::result::Result<TradeIntent, ValidationError> {
    let mut fields: HashMap<String, &Value> = raw
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
        .collect();
    fields.remove(ROUTING_KEY);

    let mut issues = Vec::new();

    let ticker = match fields.get("ticker").map(|v| text(v)) {
        Some(t) if !t.trim().is_empty() => Some(t.trim().to_ascii_uppercase()),
        _ => {
            issues.push(missing("Ticker", None));
            None
        }
    };

    let price = match fields.get("price") {
        Some(v) => decimal_field("Price", v, &mut issues),
        None => {
            issues.push(missing("Price", None));
            None
        }
    };

    let timestamp = match fields.get("timestamp") {
        Some(v) => {
            let parsed = parse_timestamp(&text(v));
            if parsed.is_none() {
                issues.push(malformed("Timestamp", v, "an ISO-8601 timestamp"));
            }
            parsed
        }
        None => {
            issues.push(missing("Timestamp", None));
            None
        }
    };

    let option_kind = match fields.get("option_type") {
        Some(v) => {
            let parsed = OptionKind::from_label(&text(v));
            if parsed.is_none() {
                issues.push(invalid_enum("Option type", v, "CALL | PUT"));
            }
            parsed
        }
        None => {
            issues.push(missing("Option type", Some("Expected: CALL | PUT")));
            None
        }
    };

    let direction = match fields.get("action") {
        Some(v) => {
            let parsed = Direction::from_code(text(v).trim())
                .filter(|d| WEBHOOK_DIRECTIONS.contains(d));
            if parsed.is_none() {
                issues.push(invalid_enum("Trade action", v, "BTO | STO | BTC | STC"));
            }
            parsed
        }
        None => {
            issues.push(missing("Trade action", None));
            None
        }
    };

    let quantity = match fields.get("quantity") {
        Some(v) => match integer_field("Quantity", v, &mut issues) {
            Some(q) if q > 0 && q <= i64::from(u32::MAX) => Some(q as u32),
            Some(_) => {
                issues.push(out_of_range("Quantity", v, "a positive integer"));
                None
            }
            None => None,
        },
        None => {
            issues.push(missing("Quantity", None));
            None
        }
    };

    let expiration = fields.get("expiration").and_then(|v| {
        let parsed = NaiveDate::parse_from_str(text(v).trim(), "%Y-%m-%d").ok();
        if parsed.is_none() {
            issues.push(malformed("Expiration", v, "a date (YYYY-MM-DD)"));
        }
        parsed
    });

    let dte = fields
        .get("dte")
        .and_then(|v| match integer_field("dte", v, &mut issues) {
            Some(d) if d >= 0 => Some(d),
            Some(_) => {
                issues.push(out_of_range("dte", v, "zero or more days"));
                None
            }
            None => None,
        });

    let strike = fields
        .get("strike")
        .and_then(|v| decimal_field("Strike", v, &mut issues));

    let delta = fields
        .get("delta")
        .and_then(|v| match integer_field("Delta", v, &mut issues) {
            Some(d) if d != 0 && (-99..=99).contains(&d) => Some(d as i32),
            Some(_) => {
                issues.push(out_of_range("Delta", v, "between -99 and 99, excluding 0"));
                None
            }
            None => None,
        });

    let width = match fields.get("width") {
        Some(v) => match integer_field("Width", v, &mut issues) {
            Some(w) if w >= 0 => Some(w as usize),
            Some(_) => {
                issues.push(out_of_range("Width", v, "zero or a positive integer"));
                None
            }
            None => None,
        },
        None => Some(0),
    };

    let order_type = match fields.get("order_type") {
        Some(v) => {
            let parsed = OrderType::from_label(&text(v));
            if parsed.is_none() {
                issues.push(invalid_enum("Order type", v, "MARKET | LIMIT | STOP"));
            }
            parsed.map(Some)
        }
        None => Some(None),
    };

    let has = |key: &str| fields.contains_key(key);
    if !has("expiration") && !has("dte") {
        issues.push(ValidationIssue::Conflict(
            "Either expiration or dte must be provided.".to_string(),
        ));
    }

    match direction {
        Some(d) if d.is_opening() => {
            if !has("strike") && !has("delta") {
                issues.push(ValidationIssue::Conflict(
                    "Either strike or delta must be provided for opening positions.".to_string(),
                ));
            }
            if has("strike") && has("delta") {
                issues.push(ValidationIssue::Conflict(
                    "Provide strike or delta for opening positions, not both.".to_string(),
                ));
            }
            if has("expiration") && has("dte") {
                issues.push(ValidationIssue::Conflict(
                    "Provide expiration or dte for opening positions, not both.".to_string(),
                ));
            }
        }
        Some(d) if d.is_closing() => {
            if !has("strike") {
                issues.push(missing(
                    "Strike",
                    Some("Strike must be provided for closing positions."),
                ));
            }
            if !has("expiration") {
                issues.push(missing(
                    "Expiration",
                    Some("Expiration must be provided for closing positions."),
                ));
            }
            if has("delta") {
                issues.push(ValidationIssue::Conflict(
                    "Delta cannot be used for closing positions.".to_string(),
                ));
            }
            if has("dte") {
                issues.push(ValidationIssue::Conflict(
                    "dte cannot be used for closing positions.".to_string(),
                ));
            }
        }
        _ => {}
    }

    let strike_selector = match (strike, delta) {
        (Some(s), None) => Some(StrikeSelector::Strike(s)),
        (None, Some(d)) => Some(StrikeSelector::Delta(d)),
        _ => None,
    };
    let expiry_selector = match (expiration, dte) {
        (Some(e), None) => Some(ExpirySelector::Date(e)),
        (None, Some(d)) => Some(ExpirySelector::DaysToExpiration(d)),
        _ => None,
    };

    match (
        ticker,
        price,
        timestamp,
        option_kind,
        direction,
        quantity,
        strike_selector,
        expiry_selector,
        width,
        order_type,
    ) {
        (
            Some(ticker),
            Some(price),
            Some(timestamp),
            Some(option_kind),
            Some(direction),
            Some(quantity),
            Some(strike),
            Some(expiry),
            Some(width),
            Some(order_type),
        ) if issues.is_empty() => {
            debug!(%ticker, %direction, quantity, "Validated trade signal");
            Ok(TradeIntent {
                ticker,
                price,
                timestamp,
                option_kind,
                direction,
                quantity,
                strike,
                expiry,
                width,
                order_type,
            })
        }
        _ => Err(ValidationError::new(issues)),
    }
}

/// String form of a JSON value; strings lose their quotes
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = text(value);
    let raw = raw.trim();
    match value {
        Value::String(_) | Value::Number(_) => Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok(),
        _ => None,
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339, or a naive date-time taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn decimal_field(field: &str, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Decimal> {
    let parsed = parse_decimal(value);
    if parsed.is_none() {
        issues.push(malformed(field, value, "a number"));
    }
    parsed
}

fn integer_field(field: &str, value: &Value, issues: &mut Vec<ValidationIssue>) -> Option<i64> {
    let parsed = parse_integer(value);
    if parsed.is_none() {
        issues.push(malformed(field, value, "an integer"));
    }
    parsed
}

fn missing(field: &str, hint: Option<&str>) -> ValidationIssue {
    ValidationIssue::Missing {
        field: field.to_string(),
        hint: hint.map(str::to_string),
    }
}

fn malformed(field: &str, value: &Value, expected: &str) -> ValidationIssue {
    ValidationIssue::MalformedField {
        field: field.to_string(),
        value: text(value),
        expected: expected.to_string(),
    }
}

fn invalid_enum(field: &str, value: &Value, expected: &str) -> ValidationIssue {
    ValidationIssue::InvalidEnum {
        field: field.to_string(),
        value: text(value),
        expected: expected.to_string(),
    }
}

fn out_of_range(field: &str, value: &Value, expected: &str) -> ValidationIssue {
    ValidationIssue::InvalidRange {
        field: field.to_string(),
        value: text(value),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::TradeError;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn opening_payload() -> Value {
        json!({
            "key": "routing-secret",
            "ticker": "spy",
            "price": "601.25",
            "timestamp": "2025-08-01T14:30:00Z",
            "option_type": "call",
            "action": "BTO",
            "quantity": 2,
            "delta": 30,
            "dte": 14,
            "comment": "dropped"
        })
    }

    #[test]
    fn test_valid_opening_payload() {
        let intent = validate_payload(&opening_payload()).unwrap();
        assert_eq!(
            intent,
            TradeIntent {
                ticker: "SPY".to_string(),
                price: dec!(601.25),
                timestamp: Utc.with_ymd_and_hms(2025, 8, 1, 14, 30, 0).unwrap(),
                option_kind: OptionKind::Call,
                direction: Direction::Bto,
                quantity: 2,
                strike: StrikeSelector::Delta(30),
                expiry: ExpirySelector::DaysToExpiration(14),
                width: 0,
                order_type: None,
            }
        );
    }

    #[test]
    fn test_keys_are_case_insensitive_and_numbers_coerce() {
        let payload = json!({
            "Ticker": "QQQ",
            "PRICE": 480.5,
            "Timestamp": "2025-08-01 14:30:00",
            "Option_Type": "P",
            "Action": "STO",
            "Quantity": "3",
            "Strike": 470,
            "Expiration": "2025-08-15",
            "Width": "2",
            "Order_Type": "limit"
        });

        let intent = validate_payload(&payload).unwrap();
        assert_eq!(intent.price, dec!(480.5));
        assert_eq!(intent.option_kind, OptionKind::Put);
        assert_eq!(intent.strike, StrikeSelector::Strike(dec!(470)));
        assert_eq!(
            intent.expiry,
            ExpirySelector::Date(NaiveDate::from_ymd_opt(2025, 8, 15).unwrap())
        );
        assert_eq!(intent.width, 2);
        assert_eq!(intent.order_type, Some(OrderType::Limit));
        assert_eq!(intent.signed_quantity(), dec!(-3));
    }

    #[test]
    fn test_all_issues_are_reported_together() {
        let payload = json!({
            "price": "abc",
            "timestamp": "yesterday",
            "option_type": "straddle",
            "action": "HOLD",
            "quantity": 0,
            "dte": 7
        });

        let err = validate_payload(&payload).unwrap_err();
        let message = err.to_string();
        let lines: Vec<&str> = message.lines().collect();

        assert!(lines.contains(&"Ticker not found in data."));
        assert!(lines.contains(&"Price is not a number: abc."));
        assert!(lines.contains(&"Timestamp is not an ISO-8601 timestamp: yesterday."));
        assert!(lines.contains(&"Invalid Option type: straddle. Expected: CALL | PUT"));
        assert!(lines.contains(&"Invalid Trade action: HOLD. Expected: BTO | STO | BTC | STC"));
        assert!(lines.contains(&"Quantity must be a positive integer: 0."));
        assert_eq!(err.issues.len(), 6);
    }

    #[test]
    fn test_opening_requires_exactly_one_of_each_pair() {
        let mut payload = opening_payload();
        payload["strike"] = json!(600);
        payload["expiration"] = json!("2025-08-15");
        let err = validate_payload(&payload).unwrap_err();
        assert_eq!(err.issues.len(), 2);

        let mut payload = opening_payload();
        let map = payload.as_object_mut().unwrap();
        map.remove("delta");
        map.remove("dte");
        let err = validate_payload(&payload).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Either strike or delta must be provided for opening positions."));
        assert!(message.contains("Either expiration or dte must be provided."));
    }

    #[test]
    fn test_closing_requires_strike_and_expiration() {
        let payload = json!({
            "ticker": "SPY",
            "price": 600,
            "timestamp": "2025-08-01T14:30:00Z",
            "option_type": "C",
            "action": "STC",
            "quantity": 1,
            "expiration": "2025-08-15"
        });
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.mentions("Strike"));
        assert!(!err.mentions("Expiration"));

        let mut payload = payload;
        payload["strike"] = json!("600");
        payload.as_object_mut().unwrap().remove("expiration");
        payload["dte"] = json!(14);
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.mentions("Expiration"));
        assert!(err.to_string().contains("dte cannot be used for closing positions."));
    }

    #[test]
    fn test_buy_and_sell_are_rejected_on_webhook_path() {
        let mut payload = opening_payload();
        payload["action"] = json!("BUY");
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.mentions("Trade action"));
    }

    #[test]
    fn test_delta_range() {
        for bad in [0, 100, -150] {
            let mut payload = opening_payload();
            payload["delta"] = json!(bad);
            let err = validate_payload(&payload).unwrap_err();
            assert!(
                matches!(err.issues[0], ValidationIssue::InvalidRange { .. }),
                "delta {} should be out of range",
                bad
            );
        }
    }

    #[test]
    fn test_parse_trade_intent_reports_bad_json() {
        let result = parse_trade_intent("{not json");
        assert!(matches!(result, Err(TradeError::JsonParse(_))));

        let result = parse_trade_intent("[1, 2]");
        assert!(matches!(result, Err(TradeError::Validation(_))));
    }
}
