//! Decimal scaling of raw token amounts.

use alloy_primitives::U256;

use crate::error::{DomainError, DomainResult};

/// Largest decimals count whose scale factor fits in a `U256` (10^77).
pub const MAX_DECIMALS: u8 = 77;

/// Render `value / 10^decimals` as a decimal string.
///
/// Trailing fractional zeros are dropped and a whole number carries no
/// decimal point, so `1500000000000000000` with 18 decimals gives `"1.5"`
/// and `2000000000000000000` gives `"2"`.
pub fn format_units(value: U256, decimals: u8) -> DomainResult<String> {
    if decimals > MAX_DECIMALS {
        return Err(DomainError::InvalidAmount(format!(
            "decimals {decimals} exceeds maximum of {MAX_DECIMALS}"
        )));
    }
    if decimals == 0 {
        return Ok(value.to_string());
    }

    let scale = U256::from(10u8).pow(U256::from(decimals));
    let integer = value / scale;
    let fraction = value % scale;

    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        Ok(integer.to_string())
    } else {
        Ok(format!("{integer}.{fraction}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> U256 {
        s.parse().unwrap()
    }

    #[test]
    fn large_value_keeps_every_digit() {
        let value = u("123456789012345678901234567890");
        assert_eq!(value.to_string(), "123456789012345678901234567890");
        assert_eq!(
            format_units(value, 18).unwrap(),
            "123456789012.34567890123456789"
        );
    }

    #[test]
    fn whole_amounts_have_no_point() {
        assert_eq!(format_units(u("2000000000000000000"), 18).unwrap(), "2");
        assert_eq!(format_units(U256::ZERO, 18).unwrap(), "0");
    }

    #[test]
    fn small_amounts_keep_leading_zeros() {
        assert_eq!(format_units(U256::from(1), 18).unwrap(), "0.000000000000000001");
        assert_eq!(format_units(U256::from(1500), 6).unwrap(), "0.0015");
    }

    #[test]
    fn zero_decimals_is_identity() {
        assert_eq!(format_units(U256::from(42), 0).unwrap(), "42");
    }

    #[test]
    fn max_uint256_formats() {
        assert_eq!(
            format_units(U256::MAX, 18).unwrap(),
            "115792089237316195423570985008687907853269984665640564039457.584007913129639935"
        );
    }

    #[test]
    fn too_many_decimals_is_rejected() {
        assert!(format_units(U256::from(1), MAX_DECIMALS).is_ok());
        assert!(matches!(
            format_units(U256::from(1), MAX_DECIMALS + 1),
            Err(DomainError::InvalidAmount(_))
        ));
    }
}
