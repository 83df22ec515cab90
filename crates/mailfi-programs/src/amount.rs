//! Decimal amount scaling.
//!
//! Amounts arrive as decimal numbers and are encoded as integer base units
//! (`amount * 10^decimals`), truncated toward zero. Scaling works on the
//! shortest decimal representation of the `f64` rather than on a float
//! multiply, so `1.9999995` becomes `1_999_999` and `0.29` becomes
//! `290_000` exactly.

use crate::error::EncodeError;

/// PYUSD carries six decimals.
pub const PYUSD_DECIMALS: u8 = 6;

/// Scale a positive decimal amount to base units, truncating extra digits.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64, EncodeError> {
    if !amount.is_finite() {
        return Err(EncodeError::InvalidAmount(format!("{amount} is not a finite number")));
    }
    if amount <= 0.0 {
        return Err(EncodeError::InvalidAmount(format!("{amount} must be positive")));
    }

    // `Display` for f64 never uses exponent notation.
    let text = amount.to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.extend(
        fraction
            .chars()
            .chain(std::iter::repeat('0'))
            .take(decimals as usize),
    );

    let units = digits
        .parse::<u128>()
        .ok()
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| EncodeError::InvalidAmount(format!("{amount} overflows u64 base units")))?;

    if units == 0 {
        return Err(EncodeError::InvalidAmount(format!(
            "{amount} is below the smallest unit (10^-{decimals})"
        )));
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(to_base_units(1.9999995, 6).unwrap(), 1_999_999);
    }

    #[test]
    fn exact_for_values_that_float_multiply_gets_wrong() {
        // 0.29 * 1e6 = 289999.99999999994 as f64
        assert_eq!(to_base_units(0.29, 6).unwrap(), 290_000);
        assert_eq!(to_base_units(1.005, 6).unwrap(), 1_005_000);
    }

    #[test]
    fn whole_and_small_amounts() {
        assert_eq!(to_base_units(10.0, 6).unwrap(), 10_000_000);
        assert_eq!(to_base_units(0.000001, 6).unwrap(), 1);
        assert_eq!(to_base_units(5.0, 0).unwrap(), 5);
    }

    #[test]
    fn rejects_non_positive_and_non_finite() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(to_base_units(bad, 6), Err(EncodeError::InvalidAmount(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_dust_below_one_unit() {
        let err = to_base_units(0.0000004, 6).unwrap_err();
        assert!(err.to_string().contains("smallest unit"));
    }

    #[test]
    fn rejects_overflow() {
        let err = to_base_units(1e20, 6).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn oversized_decimals_are_an_error_not_a_panic() {
        assert!(to_base_units(1.0, 19).is_ok());
        assert!(matches!(to_base_units(1.0, 20), Err(EncodeError::InvalidAmount(_))));
        assert!(matches!(to_base_units(0.5, u8::MAX), Err(EncodeError::InvalidAmount(_))));
    }
}
