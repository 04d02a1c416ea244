//! USD/NGN conversion arithmetic
//!
//! `rate` is NGN per 1 USD and must be positive; the cache never hands out
//! anything else.

/// Naira amount expressed in dollars
pub fn to_usd(ngn_amount: f64, rate: f64) -> f64 {
    ngn_amount / rate
}

/// Dollar amount expressed in naira
pub fn to_ngn(usd_amount: f64, rate: f64) -> f64 {
    usd_amount * rate
}
