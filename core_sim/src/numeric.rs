//! Small numeric and formatting helpers shared by the model and its rationale text.

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Rounds a non-negative quantity to whole units.
pub fn round_units(value: f64) -> u32 {
    value.round().clamp(0.0, u32::MAX as f64) as u32
}

pub fn round_usd(value: f64) -> i64 {
    value.round() as i64
}

/// `12345` -> `"12,345"`.
pub fn format_units(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_usd(value: i64) -> String {
    if value < 0 {
        format!("-${}", format_units(-value))
    } else {
        format!("${}", format_units(value))
    }
}

/// Formats a 0..1 ratio as a percentage with the given precision.
pub fn format_percent(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.9876, 3), 0.988);
        assert_eq!(round_units(-3.0), 0);
        assert_eq!(round_units(2.5), 3);
        assert_eq!(round_usd(1999.5), 2000);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(999), "999");
        assert_eq!(format_units(1_000), "1,000");
        assert_eq!(format_units(1_234_567), "1,234,567");
        assert_eq!(format_usd(-2_500), "-$2,500");
        assert_eq!(format_percent(0.4567, 1), "45.7%");
    }
}
