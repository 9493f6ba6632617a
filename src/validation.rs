//! Per-field input checks shared by the action schemas.

use crate::error::ActionError;
use alloy::primitives::Address;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::LazyLock;

pub const ADDRESS_PATTERN: &str = "^0x[a-fA-F0-9]{40}$";
pub const AMOUNT_PATTERN: &str = r"^[0-9]+(\.[0-9]+)?$";

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ADDRESS_PATTERN).expect("valid address regex"));
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(AMOUNT_PATTERN).expect("valid amount regex"));

/// Deserializes raw tool arguments into a typed input struct.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ActionError> {
    serde_json::from_value(args).map_err(|e| ActionError::invalid(e.to_string()))
}

pub fn parse_address(field: &str, value: &str) -> Result<Address, ActionError> {
    if !ADDRESS_RE.is_match(value) {
        return Err(ActionError::invalid(format!(
            "{field} must be a 0x-prefixed 40 character hex address, got '{value}'"
        )));
    }
    Address::from_str(value).map_err(|e| ActionError::invalid(format!("{field}: {e}")))
}

pub fn parse_optional_address(
    field: &str,
    value: Option<&str>,
    default: Address,
) -> Result<Address, ActionError> {
    value.map_or(Ok(default), |v| parse_address(field, v))
}

pub fn check_amount(field: &str, value: &str) -> Result<(), ActionError> {
    if !AMOUNT_RE.is_match(value.trim()) {
        return Err(ActionError::invalid(format!(
            "{field} must be a positive decimal number such as 1.5, got '{value}'"
        )));
    }
    Ok(())
}

/// Like [`check_amount`], but also rejects amounts equal to zero.
pub fn check_positive_amount(field: &str, value: &str) -> Result<(), ActionError> {
    check_amount(field, value)?;
    if value.trim().chars().all(|c| c == '0' || c == '.') {
        return Err(ActionError::invalid(format!(
            "{field} must be greater than zero, got '{value}'"
        )));
    }
    Ok(())
}

/// Checks that `value` lies in the inclusive range `[min, max]`.
pub fn check_percentage(
    field: &str,
    value: Decimal,
    min: Decimal,
    max: Decimal,
) -> Result<Decimal, ActionError> {
    if value < min || value > max {
        return Err(ActionError::invalid(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(value)
}

pub fn check_not_blank(field: &str, value: &str) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        return Err(ActionError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Accepts an amount given either as a JSON string or a JSON number.
pub fn amount_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected an amount string, got {other}"
        ))),
    }
}

pub fn optional_amount_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected an amount string, got {other}"
        ))),
    }
}

/// Accepts a percentage given as a JSON number or numeric string.
pub fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(de::Error::custom(format!("expected a number, got {other}")));
        }
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map(Some)
        .map_err(|e| de::Error::custom(format!("'{raw}' is not a number: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_addresses() {
        let addr = parse_address("vault", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").unwrap();
        assert_eq!(
            addr,
            Address::from_str("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap()
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "invalid-address",
            "A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB4",
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB488",
            "0xZ0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        ] {
            let err = parse_address("asset_address", bad).unwrap_err();
            assert!(err.is_invalid_input());
            assert!(err.to_string().contains("asset_address"));
        }
    }

    #[test]
    fn optional_address_falls_back_to_default() {
        let default = Address::repeat_byte(0x11);
        assert_eq!(
            parse_optional_address("receiver", None, default).unwrap(),
            default
        );
        assert!(parse_optional_address("receiver", Some("0x12"), default).is_err());
    }

    #[test]
    fn percentage_bounds_are_inclusive() {
        assert!(check_percentage("fee", dec!(0), dec!(0), dec!(20)).is_ok());
        assert!(check_percentage("fee", dec!(20), dec!(0), dec!(20)).is_ok());
        let err = check_percentage("fee", dec!(20.01), dec!(0), dec!(20)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: fee must be between 0 and 20, got 20.01"
        );
        assert!(check_percentage("fee", dec!(-1), dec!(0), dec!(20)).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct AmountFields {
        #[serde(deserialize_with = "amount_string")]
        amount: String,
        #[serde(default, deserialize_with = "optional_decimal")]
        slippage: Option<Decimal>,
    }

    #[test]
    fn amounts_accept_strings_and_numbers() {
        let fields: AmountFields = parse_args(json!({ "amount": "1.5" })).unwrap();
        assert_eq!(fields.amount, "1.5");
        assert_eq!(fields.slippage, None);

        let fields: AmountFields = parse_args(json!({ "amount": 3, "slippage": 0.5 })).unwrap();
        assert_eq!(fields.amount, "3");
        assert_eq!(fields.slippage, Some(dec!(0.5)));

        let err = parse_args::<AmountFields>(json!({ "amount": true })).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn amounts_must_be_plain_decimals() {
        assert!(check_amount("amount", "10").is_ok());
        assert!(check_amount("amount", "0.25").is_ok());
        for bad in ["", "-1", "1.", "1e3", "ten"] {
            assert!(check_amount("amount", bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn zero_amounts_are_not_positive() {
        assert!(check_positive_amount("amount", "0.000001").is_ok());
        assert!(check_positive_amount("amount", "10").is_ok());
        for zero in ["0", "0.0", "000.000"] {
            let err = check_positive_amount("amount", zero).unwrap_err();
            assert!(err.is_invalid_input());
            assert!(err.to_string().contains("amount must be greater than zero"));
        }
        assert!(check_positive_amount("amount", "-1").is_err());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(check_not_blank("name", "  ").is_err());
        assert!(check_not_blank("name", "Vault").is_ok());
    }
}
