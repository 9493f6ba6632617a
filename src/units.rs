//! Conversion between human-readable token amounts and base units.

use crate::error::ActionError;
use crate::validation::check_amount;
use alloy::primitives::utils::{self, Unit};
use alloy::primitives::{Address, U256};
use anyhow::Result;

/// Largest number of decimal digits a `U256` holds without overflow.
const MAX_U256_DIGITS: usize = 77;

/// Rejects token decimals that cannot be expressed as a unit.
pub fn checked_decimals(token: Address, decimals: u8) -> Result<u8> {
    if Unit::new(decimals).is_none() {
        anyhow::bail!("token {token} reports unsupported decimals {decimals}");
    }
    Ok(decimals)
}

/// Renders `value` base units as a decimal string with trailing zeros trimmed.
///
/// `decimals` must have passed [`checked_decimals`]; otherwise the raw base
/// units are returned.
pub fn format_units(value: U256, decimals: u8) -> String {
    match utils::format_units(value, decimals) {
        Ok(formatted) => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Err(_) => value.to_string(),
    }
}

/// Parses a decimal string such as `"1.25"` into base units.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    check_amount("amount", amount)?;

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if fraction.len() > usize::from(decimals) {
        return Err(ActionError::invalid(format!(
            "'{amount}' has more than {decimals} decimal places"
        ))
        .into());
    }
    if whole.trim_start_matches('0').len() + usize::from(decimals) > MAX_U256_DIGITS {
        return Err(ActionError::invalid(format!("'{amount}' is out of range")).into());
    }

    let parsed = utils::parse_units(amount, decimals)
        .map_err(|e| ActionError::invalid(format!("'{amount}' is not a valid amount: {e}")))?;
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional_amounts() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(10u64).pow(U256::from(18)), 18), "1");
        assert_eq!(format_units(U256::from(42u64), 18), "0.000000000000000042");
        assert_eq!(format_units(U256::ZERO, 6), "0");
        assert_eq!(format_units(U256::from(7u64), 0), "7");
        assert_eq!(format_units(U256::from(100u64), 0), "100");
    }

    #[test]
    fn formats_values_beyond_decimal_range() {
        assert_eq!(
            format_units(U256::MAX, 18),
            "115792089237316195423570985008687907853269984665640564039457.584007913129639935"
        );
    }

    #[test]
    fn parses_amounts_into_base_units() {
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units("100", 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(
            parse_units("0.000000000000000001", 18).unwrap(),
            U256::from(1u64)
        );
        assert_eq!(parse_units(" 2 ", 0).unwrap(), U256::from(2u64));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "abc", "-1", "1.", ".5", "1.2.3", "1e18"] {
            assert!(parse_units(bad, 18).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn rejects_excess_precision() {
        let err = parse_units("1.1234567", 6).unwrap_err();
        assert!(err.to_string().contains("more than 6 decimal places"));
    }

    #[test]
    fn rejects_amounts_that_overflow() {
        let huge = "9".repeat(70);
        let err = parse_units(&huge, 18).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn decimals_above_unit_range_are_rejected() {
        assert_eq!(checked_decimals(Address::ZERO, 18).unwrap(), 18);
        assert_eq!(checked_decimals(Address::ZERO, 77).unwrap(), 77);
        assert!(checked_decimals(Address::ZERO, 78).is_err());
    }
}
