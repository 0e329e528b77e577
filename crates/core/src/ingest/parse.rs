//! Permissive field coercion.
//!
//! Both parsers return `None` instead of failing: an unparseable cell is
//! "absent", never an error.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Parses a calendar date, reading ambiguous forms day first.
///
/// Accepted: `dd/mm/yyyy`, `dd-mm-yyyy`, `dd.mm.yyyy`, `dd/mm/yy` and ISO
/// `yyyy-mm-dd` (a four-digit leading component is always a year). A trailing
/// time of day is ignored.
#[must_use]
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let token = raw.split(['T', ' ']).find(|part| !part.is_empty())?;

    let parts: Vec<&str> = token.split(['/', '-', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };

    if !parts
        .iter()
        .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()))
    {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)
    } else {
        (parse_year(c)?, b.parse().ok()?, a.parse().ok()?)
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Two-digit years pivot at 69: `00..=68` are 2000s, `69..=99` are 1900s.
fn parse_year(raw: &str) -> Option<i32> {
    let value: i32 = raw.parse().ok()?;
    match raw.len() {
        1 | 2 if value <= 68 => Some(2000 + value),
        1 | 2 => Some(1900 + value),
        4 => Some(value),
        _ => None,
    }
}

/// Coerces a cell to a decimal.
///
/// With `decimal_comma`, `1.234,50` and `12,50` are read the Italian way.
#[must_use]
pub fn parse_decimal(raw: &str, decimal_comma: bool) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if decimal_comma && trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    Decimal::from_str(&normalized)
        .ok()
        .or_else(|| parse_scientific(&normalized))
}

/// `1e3` style values, exponent limited to what a `Decimal` can scale.
fn parse_scientific(text: &str) -> Option<Decimal> {
    let (_, exponent) = text.split_once(['e', 'E'])?;
    let exponent: i32 = exponent.parse().ok()?;
    if exponent.abs() > 28 {
        return None;
    }
    Decimal::from_scientific(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("06/01/2024", date(2024, 1, 6))]
    #[case("6/1/2024", date(2024, 1, 6))]
    #[case("06-01-2024", date(2024, 1, 6))]
    #[case("06.01.2024", date(2024, 1, 6))]
    #[case("06/01/24", date(2024, 1, 6))]
    #[case("31/12/99", date(1999, 12, 31))]
    #[case("2024-01-06", date(2024, 1, 6))]
    #[case("06/01/2024 00:00", date(2024, 1, 6))]
    #[case("2024-01-06T12:30:00", date(2024, 1, 6))]
    #[case("  13/02/2024 ", date(2024, 2, 13))]
    fn test_parse_day_first_accepts(#[case] raw: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_day_first(raw), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not a date")]
    #[case("31/02/2024")]
    #[case("13/13/2024")]
    #[case("2024/01")]
    #[case("01/02/2024/03")]
    #[case("0x/01/2024")]
    #[case("01/02/202")]
    fn test_parse_day_first_rejects(#[case] raw: &str) {
        assert_eq!(parse_day_first(raw), None);
    }

    #[test]
    fn test_day_first_beats_month_first() {
        // 03/04 is 3 April, not 4 March.
        assert_eq!(parse_day_first("03/04/2024"), Some(date(2024, 4, 3)));
    }

    #[rstest]
    #[case("12.50", false, Some(dec!(12.50)))]
    #[case(" 300 ", false, Some(dec!(300)))]
    #[case("0", false, Some(dec!(0)))]
    #[case("-4.5", false, Some(dec!(-4.5)))]
    #[case("1e3", false, Some(dec!(1000)))]
    #[case("", false, None)]
    #[case("n/a", false, None)]
    #[case("12,50", false, None)]
    #[case("12,50", true, Some(dec!(12.50)))]
    #[case("1.234,50", true, Some(dec!(1234.50)))]
    #[case("12.50", true, Some(dec!(12.50)))]
    fn test_parse_decimal(
        #[case] raw: &str,
        #[case] decimal_comma: bool,
        #[case] expected: Option<Decimal>,
    ) {
        assert_eq!(parse_decimal(raw, decimal_comma), expected);
    }
}
