//! Sample Aggregator - Turns scraped price labels into one rate
//!
//! Each price element on the page renders something like `1,520.50 NGN`.
//! The leading token is parsed with thousands separators stripped, and the
//! rate is the arithmetic mean of all parsed samples.

use super::FetchError;
use crate::types::PriceSnapshot;

/// Parse the leading numeric token of a price label
pub fn parse_price_text(text: &str) -> Result<f64, FetchError> {
    let parse_error = || FetchError::Parse {
        text: text.to_string(),
    };

    let token = text.split_whitespace().next().ok_or_else(parse_error)?;
    // Currency glyphs glued to the number (e.g. "₦1,520") are not part of it
    let token = token.trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-');
    let cleaned: String = token.chars().filter(|&c| c != ',').collect();

    let value: f64 = cleaned.parse().map_err(|_| parse_error())?;
    if !PriceSnapshot::is_valid_price(value) {
        return Err(parse_error());
    }
    Ok(value)
}

/// Arithmetic mean; `None` for an empty sample set
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Relative spread between the highest and lowest sample
pub fn spread(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (max - min) / min
}
