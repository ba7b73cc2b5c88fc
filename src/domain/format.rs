//! Number formatting for the ranking table.
//!
//! Magnitudes use the Korean four-digit units: 만 (10^4), 억 (10^8) and
//! 조 (10^12). Every function is total over finite input, negatives included.

const MAN: f64 = 1_0000.0;
const EOK: f64 = 1_0000_0000.0;
const JO: f64 = 1_0000_0000_0000.0;

/// Display class for a signed change percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    Up,
    Down,
    Flat,
}

impl ChangeClass {
    pub fn of(pct: f64) -> Self {
        if pct > 0.0 {
            ChangeClass::Up
        } else if pct < 0.0 {
            ChangeClass::Down
        } else {
            ChangeClass::Flat
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ChangeClass::Up => "price-up",
            ChangeClass::Down => "price-down",
            ChangeClass::Flat => "price-flat",
        }
    }
}

/// Round to the nearest integer, ties toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Digits needed to print any `f64` fraction exactly.
const EXACT_FRACTION_DIGITS: usize = 1100;

/// Fixed-point rendering with `digits` decimals.
///
/// Rounds the exact binary value, so 1.45 (stored just below 1.45) gives
/// "1.4". Exact decimal ties such as 1.25 round away from zero.
pub fn to_fixed(value: f64, digits: u32) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let precision = digits as usize;
    if is_exact_tie(magnitude, precision) {
        let scale = 10f64.powi(digits as i32);
        let rounded_up = ((magnitude * scale).floor() + 1.0) / scale;
        return format!("{sign}{rounded_up:.precision$}");
    }
    format!("{sign}{magnitude:.precision$}")
}

/// Whether `magnitude` lies exactly halfway between two `precision`-digit values.
fn is_exact_tie(magnitude: f64, precision: usize) -> bool {
    if (magnitude * 10f64.powi(precision as i32)).fract() != 0.5 {
        return false;
    }
    let exact = format!("{:.*}", precision + EXACT_FRACTION_DIGITS, magnitude);
    let tail = &exact[exact.len() - EXACT_FRACTION_DIGITS..];
    tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_half_up_matches_math_round() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(2.4999), 2.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(0.0), 0.0);
    }

    #[test]
    fn to_fixed_rounds_ties_away_from_zero() {
        assert_eq!(to_fixed(1.25, 1), "1.3");
        assert_eq!(to_fixed(0.5, 0), "1");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(-1.25, 1), "-1.3");
        assert_eq!(to_fixed(3.0, 2), "3.00");
        assert_eq!(to_fixed(0.05, 0), "0");
        assert_eq!(to_fixed(12.345678, 2), "12.35");
    }

    #[test]
    fn to_fixed_rounds_the_stored_binary_value() {
        assert_eq!(to_fixed(1.45, 1), "1.4");
        assert_eq!(to_fixed(-1.45, 1), "-1.4");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(8.675, 2), "8.68");
    }

    #[test]
    fn volume_and_jo_tiers_follow_stored_value() {
        assert_eq!(format_volume(145_000_000.0), "1.4억");
        assert_eq!(format_trading_value(1_4500_0000_0000.0), "1.4조");
        assert_eq!(format_trading_value(1_2500_0000_0000.0), "1.3조");
    }

    #[test]
    fn to_fixed_keeps_sign_of_tiny_negatives() {
        assert_eq!(to_fixed(-0.001, 2), "-0.00");
        assert_eq!(to_fixed(-0.0, 2), "0.00");
    }

    #[test]
    fn group_digits_inserts_separators() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
        assert_eq!(group_digits(-1234567), "-1,234,567");
    }

    #[test]
    fn trading_value_tiers() {
        assert_eq!(format_trading_value(1_0000_0000_0000.0), "1.0조");
        assert_eq!(format_trading_value(1_2500_0000_0000.0), "1.3조");
        assert_eq!(format_trading_value(2_5000_0000.0), "3억");
        assert_eq!(format_trading_value(2_4999_9999.0), "2억");
        assert_eq!(format_trading_value(1234_5678_9012.0), "1,235억");
        assert_eq!(format_trading_value(5_5000.0), "6만");
        assert_eq!(format_trading_value(9999.0), "9,999");
        assert_eq!(format_trading_value(0.0), "0");
    }

    #[test]
    fn trading_value_below_man_equals_price() {
        for v in [0.0, 1.0, 999.0, 1000.0, 9999.0, -5.0] {
            assert_eq!(format_trading_value(v), format_price(v));
        }
    }

    #[test]
    fn volume_tiers() {
        assert_eq!(format_volume(1_2345_6789.0), "1.2억");
        assert_eq!(format_volume(2_1000_000.0), "2,100만");
        assert_eq!(format_volume(1_5000.0), "2만");
        assert_eq!(format_volume(512.0), "512");
    }

    #[test]
    fn price_is_grouped_integer() {
        assert_eq!(format_price(55000.0), "55,000");
        assert_eq!(format_price(1_234_567.0), "1,234,567");
    }

    #[test]
    fn change_pct_sign_handling() {
        assert_eq!(format_change_pct(1.5), "+1.50%");
        assert_eq!(format_change_pct(0.0), "0.00%");
        assert_eq!(format_change_pct(-3.456), "-3.46%");
    }

    #[test]
    fn change_class_tri_state() {
        assert_eq!(ChangeClass::of(0.01), ChangeClass::Up);
        assert_eq!(ChangeClass::of(-0.01), ChangeClass::Down);
        assert_eq!(ChangeClass::of(0.0), ChangeClass::Flat);
        assert_eq!(ChangeClass::Up.css_class(), "price-up");
        assert_eq!(ChangeClass::Down.css_class(), "price-down");
        assert_eq!(ChangeClass::Flat.css_class(), "price-flat");
    }

    #[test]
    fn compact_value_has_no_plain_tier() {
        assert_eq!(format_value_compact(3_0000_0000_0000.0), "3.0조");
        assert_eq!(format_value_compact(7_4900_0000.0), "7억");
        assert_eq!(format_value_compact(4_000.0), "0만");
        assert_eq!(format_value_compact(25_000.0), "3만");
    }
}
