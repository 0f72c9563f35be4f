//! Shared decimal helpers for the liability calculation and its output.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(21.634)), dec!(21.63));
/// assert_eq!(round_half_up(dec!(21.635)), dec!(21.64));
/// assert_eq!(round_half_up(dec!(-0.005)), dec!(-0.01));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps negative values to zero.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-250.00)), Decimal::ZERO);
/// assert_eq!(non_negative(dec!(250.00)), dec!(250.00));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    if value > Decimal::ZERO { value } else { Decimal::ZERO }
}

/// Renders a value with exactly two decimal places, rounding half-up.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::format_two_places;
///
/// assert_eq!(format_two_places(dec!(21.634)), "21.63");
/// assert_eq!(format_two_places(dec!(0)), "0.00");
/// assert_eq!(format_two_places(dec!(1677.0)), "1677.00");
/// ```
pub fn format_two_places(value: Decimal) -> String {
    let mut rounded = round_half_up(value);
    rounded.rescale(2);
    rounded.to_string()
}
