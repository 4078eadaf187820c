//! Decimal rendering and parsing of wei-scale amounts.

use thiserror::Error;
use vegauge_types::WAD;

const DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("empty amount")]
    Empty,

    #[error("invalid digit in amount {0:?}")]
    InvalidDigit(String),

    #[error("more than 18 decimal places in {0:?}")]
    TooPrecise(String),

    #[error("amount {0:?} overflows")]
    Overflow(String),
}

/// Render a raw amount as a decimal token count, trimming trailing zeros.
///
/// `1_500_000_000_000_000_000` becomes `"1.5"`.
pub fn format_amount(raw: u128) -> String {
    let whole = raw / WAD;
    let frac = raw % WAD;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = DECIMALS);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a decimal token count (`"1000"`, `"0.25"`) into raw units.
pub fn parse_amount(s: &str) -> Result<u128, AmountParseError> {
    let s = s.trim().replace('_', "");
    if s.is_empty() {
        return Err(AmountParseError::Empty);
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(AmountParseError::Empty);
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(AmountParseError::InvalidDigit(s.clone()));
    }
    if frac.len() > DECIMALS {
        return Err(AmountParseError::TooPrecise(s.clone()));
    }

    let overflow = || AmountParseError::Overflow(s.clone());
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = DECIMALS);
        padded.parse().map_err(|_| overflow())?
    };
    whole
        .checked_mul(WAD)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(1_000 * WAD), "1000");
        assert_eq!(format_amount(WAD + WAD / 2), "1.5");
        assert_eq!(format_amount(1), "0.000000000000000001");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!(parse_amount("1000"), Ok(1_000 * WAD));
        assert_eq!(parse_amount("0.25"), Ok(WAD / 4));
        assert_eq!(parse_amount(".5"), Ok(WAD / 2));
        assert_eq!(parse_amount("350_000_000"), Ok(350_000_000 * WAD));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_amount(""), Err(AmountParseError::Empty));
        assert_eq!(parse_amount("."), Err(AmountParseError::Empty));
        assert!(matches!(parse_amount("1e18"), Err(AmountParseError::InvalidDigit(_))));
        assert!(matches!(parse_amount("-1"), Err(AmountParseError::InvalidDigit(_))));
        assert!(matches!(
            parse_amount("0.0000000000000000001"),
            Err(AmountParseError::TooPrecise(_))
        ));
        assert!(matches!(
            parse_amount("340282366920938463463374607432"),
            Err(AmountParseError::Overflow(_))
        ));
    }
}
