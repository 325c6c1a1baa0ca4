//! Credit pricing
//!
//! The curve `9 * c^0.725` gives bulk discounts without a lookup table. The
//! result is rounded half away from zero *before* the division by four, so
//! every price is a whole multiple of 25 cents.

use crate::error::{ApiError, Result};

pub const MIN_CREDITS: i32 = 5;
pub const MAX_CREDITS: i32 = 250;

/// The only currency authorizations are created in and captures are accepted in
pub const SUPPORTED_CURRENCY: &str = "usd";

/// Price in cents for `credits`. Callers validate the domain first.
pub fn price_for_credits(credits: i32) -> i64 {
    // f64::round rounds half away from zero
    let units = (9.0 * f64::from(credits).powf(0.725)).round() as i64;
    units * 25
}

/// Reject credit counts outside `[MIN_CREDITS, MAX_CREDITS]`
pub fn validate_credits(credits: i32) -> Result<()> {
    if !(MIN_CREDITS..=MAX_CREDITS).contains(&credits) {
        return Err(ApiError::InvalidInput(format!(
            "credits must be between {} and {}",
            MIN_CREDITS, MAX_CREDITS
        )));
    }
    Ok(())
}
