// src/common/format.rs

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

// Thin space used by French number formatting
const GROUP_SEPARATOR: char = '\u{202f}';

/// "1234.5" -> "1 234,50 €"
pub fn format_eur(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    format!(
        "{}{},{} €",
        if negative { "-" } else { "" },
        group_digits(int_part),
        frac_part
    )
}

/// Integer with French digit grouping, "12500" -> "12 500".
pub fn format_grouped(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let sign = if value < 0 { "-" } else { "" };
    format!("{}{}", sign, group_digits(&digits))
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

/// Last 8 characters of the id, upper-cased, as printed on receipts.
pub fn short_receipt_id(id: Uuid) -> String {
    let text = id.simple().to_string();
    text[text.len() - 8..].to_uppercase()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_euros_the_french_way() {
        assert_eq!(format_eur(Decimal::new(123450, 2)), "1\u{202f}234,50 €");
        assert_eq!(format_eur(Decimal::new(5, 0)), "5,00 €");
        assert_eq!(format_eur(Decimal::new(-42999, 3)), "-43,00 €");
        assert_eq!(format_eur(Decimal::ZERO), "0,00 €");
    }

    #[test]
    fn groups_large_integers() {
        assert_eq!(format_grouped(12500), "12\u{202f}500");
        assert_eq!(format_grouped(999), "999");
        assert_eq!(format_grouped(-1_000_000), "-1\u{202f}000\u{202f}000");
    }

    #[test]
    fn short_id_is_the_uppercased_tail() {
        let id = Uuid::parse_str("8f14e45f-ceea-467f-a9f1-0c2b3d4e5a6b").unwrap();
        assert_eq!(short_receipt_id(id), "3D4E5A6B");
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(45.7029), 45.7);
        assert_eq!(round2(0.125), 0.13);
    }
}
