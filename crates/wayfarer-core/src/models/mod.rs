//! Domain models and request/response DTOs, grouped by feature area.

mod activity;
mod attribution;
mod audit;
mod booking;
mod enquiry;
mod influencer;
mod lead;
mod legal;
mod payout;
mod team;

pub use activity::*;
pub use attribution::*;
pub use audit::*;
pub use booking::*;
pub use enquiry::*;
pub use influencer::*;
pub use lead::*;
pub use legal::*;
pub use payout::*;
pub use team::*;

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::constants::MAX_MONEY_AMOUNT;

/// Money fields must be non-negative and fit the `NUMERIC(12, 2)` columns.
pub(crate) fn check_money(value: &Decimal, field: &str) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some(format!("{} cannot be negative", field).into());
        return Err(err);
    }
    if *value > MAX_MONEY_AMOUNT {
        let mut err = ValidationError::new("max");
        err.message = Some(format!("{} cannot exceed {}", field, MAX_MONEY_AMOUNT).into());
        return Err(err);
    }
    Ok(())
}
