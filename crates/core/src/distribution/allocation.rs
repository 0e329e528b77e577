//! Even splitting of an amount into rounded daily shares.
//!
//! Uses the Largest Remainder Method so that the rounded shares still sum
//! to the (rounded) amount:
//! 1. Round every share down to the target precision
//! 2. Count the units left over
//! 3. Hand one extra unit to each of the first days until none remain

use rust_decimal::prelude::*;

/// Splits `amount` into `days` shares rounded to `decimal_places`.
///
/// The shares sum exactly to `amount` rounded to `decimal_places`; earlier
/// days receive the leftover units, so shares never increase over time.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use pokeria_core::distribution::split_evenly;
///
/// // 100 over 3 days = [33.34, 33.33, 33.33]
/// let shares = split_evenly(dec!(100), 3, 2);
/// assert_eq!(shares.iter().sum::<rust_decimal::Decimal>(), dec!(100));
/// ```
#[must_use]
pub fn split_evenly(amount: Decimal, days: usize, decimal_places: u32) -> Vec<Decimal> {
    if days == 0 {
        return vec![];
    }

    let total = amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven);
    if days == 1 {
        return vec![total];
    }

    let day_count = Decimal::from(days);
    let unit = Decimal::new(1, decimal_places);

    let base = (total / day_count).round_dp_with_strategy(decimal_places, RoundingStrategy::ToZero);
    let leftover = total - base * day_count;

    let extra_days = (leftover / unit)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_usize()
        .unwrap_or(0);

    (0..days)
        .map(|day| if day < extra_days { base + unit } else { base })
        .collect()
}
