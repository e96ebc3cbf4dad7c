// Stay pricing and refund computation. Everything here is pure.

use serde::{Deserialize, Serialize};

use crate::error::BookingError;
use crate::models::{CancellationPolicy, Money};
use crate::range::DateRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub nights: i64,
    pub nightly_rate: Money,
    pub subtotal: Money,
    pub fees: Money,
    pub total: Money,
}

pub fn price_breakdown(
    nightly_rate: Money,
    stay: &DateRange,
    fees: &[Money],
) -> Result<PriceBreakdown, BookingError> {
    let nights = stay.nights();
    if nights <= 0 {
        return Err(BookingError::InvalidRange(format!(
            "stay must cover at least one night, got {}",
            nights
        )));
    }

    let overflow = || BookingError::InvalidRequest("price exceeds representable range".to_string());

    let subtotal = nightly_rate.checked_mul(nights).ok_or_else(overflow)?;
    let fees = fees
        .iter()
        .try_fold(Money::ZERO, |acc, fee| acc.checked_add(*fee))
        .ok_or_else(overflow)?;
    let total = subtotal.checked_add(fees).ok_or_else(overflow)?;

    Ok(PriceBreakdown {
        nights,
        nightly_rate,
        subtotal,
        fees,
        total,
    })
}

/// `nights * nightly_rate + sum(fees)`
pub fn compute_total(
    nightly_rate: Money,
    stay: &DateRange,
    fees: &[Money],
) -> Result<Money, BookingError> {
    price_breakdown(nightly_rate, stay, fees).map(|breakdown| breakdown.total)
}

// Day thresholds of the refund table, checked top to bottom
const REFUND_THRESHOLDS: [i64; 4] = [30, 7, 5, 1];

// Percentages per policy for d>=30, d>=7, d>=5, d>=1, d<1
const REFUND_TABLE: [(CancellationPolicy, [u8; 5]); 4] = [
    (CancellationPolicy::Flexible, [100, 100, 100, 100, 0]),
    (CancellationPolicy::Moderate, [100, 100, 100, 50, 0]),
    (CancellationPolicy::Strict, [100, 100, 50, 50, 0]),
    (CancellationPolicy::SuperStrict, [100, 50, 50, 0, 0]),
];

pub fn refund_percentage(policy: CancellationPolicy, days_until_check_in: i64) -> u8 {
    let column = REFUND_THRESHOLDS
        .iter()
        .position(|threshold| days_until_check_in >= *threshold)
        .unwrap_or(REFUND_THRESHOLDS.len());

    REFUND_TABLE
        .iter()
        .find(|(p, _)| *p == policy)
        .map(|(_, row)| row[column])
        .unwrap_or(0)
}

// Rounds down to the cent
pub fn refund_amount(total: Money, percentage: u8) -> Money {
    Money::from_cents(total.cents() * i64::from(percentage) / 100)
}
