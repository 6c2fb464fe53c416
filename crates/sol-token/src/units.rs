//! Conversion between human-entered token amounts and integer base units.
//!
//! Amounts are handled as decimal strings end to end, so no value is ever
//! created or lost through binary floating point. Extra fractional digits
//! beyond the mint's precision are truncated toward zero, never rounded up.

use crate::error::SolError;

/// Highest decimal precision accepted for mints created or used here.
pub const MAX_DECIMALS: u8 = 9;

/// Reject decimal precisions outside `0..=MAX_DECIMALS`.
pub fn check_decimals(decimals: u8) -> Result<(), SolError> {
    if decimals > MAX_DECIMALS {
        return Err(SolError::InvalidDecimals(decimals));
    }
    Ok(())
}

/// Convert a human-readable amount such as `"2.5"` into base units.
///
/// Accepted forms are `123`, `123.45`, `.5` and `5.` (surrounding whitespace
/// is ignored). Signs, exponents and anything non-numeric are rejected with
/// [`SolError::InvalidAmount`], as is a result that does not fit in a `u64`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<u64, SolError> {
    check_decimals(decimals)?;

    let s = amount.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err(SolError::InvalidAmount(format!(
            "expected a non-negative decimal number, got {amount:?}"
        )));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SolError::InvalidAmount(format!(
            "expected a non-negative decimal number, got {amount:?}"
        )));
    }

    let precision = decimals as usize;
    let kept = &frac[..frac.len().min(precision)];

    let overflow = || SolError::InvalidAmount(format!("{s} exceeds the representable range"));

    let mut value: u64 = 0;
    for digit in whole.bytes().chain(kept.bytes()) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(digit - b'0')))
            .ok_or_else(overflow)?;
    }
    for _ in kept.len()..precision {
        value = value.checked_mul(10).ok_or_else(overflow)?;
    }

    Ok(value)
}

/// Numeric variant of [`to_base_units`].
///
/// NaN, infinities and negative values fail with [`SolError::InvalidAmount`].
/// The float is rendered with Rust's shortest round-trip formatting (which
/// never uses exponent notation) and then converted exactly.
pub fn to_base_units_f64(amount: f64, decimals: u8) -> Result<u64, SolError> {
    if !amount.is_finite() {
        return Err(SolError::InvalidAmount(format!("{amount} is not finite")));
    }
    if amount < 0.0 {
        return Err(SolError::InvalidAmount(format!("{amount} is negative")));
    }
    // abs() folds -0.0 into 0.0
    to_base_units(&amount.abs().to_string(), decimals)
}

/// Render base units as a human-readable decimal string.
///
/// Trailing fractional zeros are trimmed: `2_500_000_000` at 9 decimals
/// renders as `"2.5"`, and `0` renders as `"0"`.
pub fn to_human_units(base_units: u64, decimals: u8) -> String {
    let digits = base_units.to_string();
    let precision = decimals as usize;
    if precision == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = precision + 1);
    let (whole, frac) = padded.split_at(padded.len() - precision);
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}
