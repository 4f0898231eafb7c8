//! Percentage helpers
//!
//! Aggregates are percentages in [0, 100]. Any two rates are compared only
//! after [`round4`] so that representation noise between tool runs does not
//! register as a change.

/// Round to four digits after the decimal point
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Signed change from `base` to `value`, rounded to four digits
pub fn change(value: f64, base: f64) -> f64 {
    round4(round4(value) - round4(base))
}

/// Whole-number percentage, truncated toward zero
pub fn of(value: f64) -> i64 {
    value.trunc() as i64
}

/// `87.6` -> `"88%"`; the sign is dropped
pub fn to_whole_no_sign_string(value: f64) -> String {
    format!("{}%", value.abs().round() as i64)
}

/// `-9.6` -> `"-10%"`, `3.0` -> `"+3%"`; the sign follows the unrounded value
pub fn to_signed_string(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "+" };
    format!("{}{}", sign, to_whole_no_sign_string(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(80.000_04), 80.0);
        assert_eq!(round4(-1.000_06), -1.0001);
    }

    #[test]
    fn test_round4_hides_representation_noise() {
        let a = 0.1 + 0.2;
        let b = 0.3;
        assert_ne!(a, b);
        assert_eq!(round4(a), round4(b));
    }

    #[test]
    fn test_change() {
        assert_eq!(change(80.0, 90.0), -10.0);
        assert_eq!(change(85.0, 80.0), 5.0);
        assert_eq!(change(80.000_01, 80.0), 0.0);
    }

    #[test]
    fn test_whole_strings() {
        assert_eq!(to_whole_no_sign_string(87.6), "88%");
        assert_eq!(to_whole_no_sign_string(-12.4), "12%");
        assert_eq!(to_signed_string(3.0), "+3%");
        assert_eq!(to_signed_string(-9.6), "-10%");
        assert_eq!(to_signed_string(0.0), "+0%");
        assert_eq!(to_signed_string(-0.2), "-0%");
    }

    #[test]
    fn test_of_truncates() {
        assert_eq!(of(79.99), 79);
        assert_eq!(of(80.0), 80);
        assert_eq!(of(0.4), 0);
    }
}
