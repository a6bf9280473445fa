//! Referral code generation, commission arithmetic and attribution windows.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use crate::constants::{
    BOOKING_CODE_PREFIX, MAX_MONEY_AMOUNT, REFERRAL_CODE_ALPHABET, REFERRAL_CODE_LENGTH,
    REFERRAL_CODE_PREFIX,
};
use crate::error::AppError;
use crate::models::{CommissionType, Influencer};

/// Canonical form used for storage and lookups.
pub fn normalize_referral_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Draws a `NSV-XXXXXX` code from `rng`. Uniqueness is enforced by the store.
pub fn generate_referral_code_with<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..REFERRAL_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..REFERRAL_CODE_ALPHABET.len());
            REFERRAL_CODE_ALPHABET[idx] as char
        })
        .collect();
    format!("{}-{}", REFERRAL_CODE_PREFIX, suffix)
}

pub fn generate_referral_code() -> String {
    generate_referral_code_with(&mut rand::rng())
}

/// True when `code` has the generator's shape.
pub fn is_referral_code_shape(code: &str) -> bool {
    let Some(suffix) = code
        .strip_prefix(REFERRAL_CODE_PREFIX)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    suffix.len() == REFERRAL_CODE_LENGTH
        && suffix.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b))
}

/// Commission owed for `order_amount`.
///
/// Percent commissions scale with the order; fixed commissions ignore it.
/// Negative amounts and results that do not fit a money column are rejected.
pub fn calculate_commission(
    commission_type: CommissionType,
    commission_value: Decimal,
    order_amount: Decimal,
) -> Result<Decimal, AppError> {
    if order_amount.is_sign_negative() && !order_amount.is_zero() {
        return Err(AppError::InvalidInput(
            "Order amount cannot be negative".to_string(),
        ));
    }
    let commission = match commission_type {
        CommissionType::Percent => order_amount
            .checked_mul(commission_value)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED)),
        CommissionType::Fixed => Some(commission_value),
    }
    .map(|c| c.round_dp(2))
    .filter(|c| *c <= MAX_MONEY_AMOUNT)
    .ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Commission on {} is out of range (limit {})",
            order_amount, MAX_MONEY_AMOUNT
        ))
    })?;
    Ok(commission)
}

pub fn commission_for(influencer: &Influencer, order_amount: Decimal) -> Result<Decimal, AppError> {
    calculate_commission(
        influencer.commission_type,
        influencer.commission_value,
        order_amount,
    )
}

/// Booking reference: prefix, unix millis, then a zero-padded 3-digit random suffix.
pub fn generate_booking_code_with<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: u16 = rng.random_range(0..1000);
    format!("{}{}{:03}", BOOKING_CODE_PREFIX, now.timestamp_millis(), suffix)
}

pub fn generate_booking_code(now: DateTime<Utc>) -> String {
    generate_booking_code_with(now, &mut rand::rng())
}

/// Whether an event at `at` still falls inside the window opened at `attributed_at`.
pub fn within_attribution_window(
    attributed_at: DateTime<Utc>,
    window_days: i32,
    at: DateTime<Utc>,
) -> bool {
    at >= attributed_at && at - attributed_at <= Duration::days(i64::from(window_days))
}
