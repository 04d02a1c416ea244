//! Reply formatting: thousands grouping and Lagos wall-clock time

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Africa/Lagos: UTC+1, no daylight saving
const LAGOS_UTC_OFFSET_SECS: i32 = 3600;

/// `now` as wall-clock time in Lagos
pub fn lagos_time(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(LAGOS_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset)
}

/// Fixed-point formatting with `,` thousands separators
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

pub(super) fn rate_reply(rate: f64, now: DateTime<Utc>) -> String {
    format!(
        "{}\nUSD-NGN\n💵 1 USD => ₦{:.2}",
        lagos_time(now).format("%A, %d-%m-%Y  • %H:%M:%S"),
        rate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(0.5, 3), "0.500");
        assert_eq!(format_grouped(999.0, 2), "999.00");
        assert_eq!(format_grouped(1000.0, 2), "1,000.00");
        assert_eq!(format_grouped(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_grouped(-15000.0, 0), "-15,000");
    }

    #[test]
    fn test_lagos_time_is_utc_plus_one() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        let local = lagos_time(now);

        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2025-01-01 00:30");
    }

    #[test]
    fn test_rate_reply_layout() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 5).unwrap();

        assert_eq!(
            rate_reply(1520.5, now),
            "Wednesday, 01-05-2024  • 12:00:05\nUSD-NGN\n💵 1 USD => ₦1520.50"
        );
    }
}
