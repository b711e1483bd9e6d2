use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits every amount is rendered with at the boundary.
pub const DISPLAY_PLACES: u32 = 2;

/// Default maximum number of fractional digits accepted when parsing money.
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// An exact decimal amount of money.
///
/// Money is stored as a base-10 `Decimal`, never as a binary float, so sums and
/// differences of parsed amounts carry no rounding error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoneyError {
    #[error("invalid money format: {0:?}")]
    InvalidFormat(String),

    #[error("{input:?} has more than {max_places} decimal places")]
    TooManyDecimalPlaces { input: String, max_places: u32 },

    #[error("{0:?} is too large to be represented with two decimal places")]
    OutOfRange(String),
}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_decimal(value: Decimal) -> Self {
        // "-0" and "0" must compare and render identically
        if value.is_zero() {
            Self::ZERO
        } else {
            Self(value.normalize())
        }
    }

    /// Whole units, e.g. `Money::from_units(50)` is `50.00`.
    pub fn from_units(units: i64) -> Self {
        Self::from_decimal(Decimal::from(units))
    }

    /// Amount expressed in hundredths, e.g. `Money::from_cents(1234)` is `12.34`.
    pub fn from_cents(cents: i64) -> Self {
        Self::from_decimal(Decimal::new(cents, 2))
    }

    /// Parse a decimal numeral with at most two fractional digits.
    pub fn parse(input: &str) -> Result<Self, ParseMoneyError> {
        parse_money(input, MAX_DECIMAL_PLACES)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `None` if the sum leaves the range that renders with two decimals.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0
            .checked_add(other.0)
            .filter(|sum| fits_display(*sum))
            .map(Self::from_decimal)
    }

    /// `None` if the difference leaves the range that renders with two decimals.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0
            .checked_sub(other.0)
            .filter(|difference| fits_display(*difference))
            .map(Self::from_decimal)
    }

    /// Render with exactly `places` fractional digits, never in scientific notation.
    pub fn format(&self, places: u32) -> String {
        let mut value = self
            .0
            .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(places);
        value.to_string()
    }
}

/// Whether `value` keeps `DISPLAY_PLACES` fractional digits within the 96-bit
/// mantissa. Near the top of the `Decimal` range, rescaling silently settles
/// for fewer places.
fn fits_display(value: Decimal) -> bool {
    let mut scaled = value;
    scaled.rescale(DISPLAY_PLACES);
    scaled.scale() == DISPLAY_PLACES
}

/// Parse a decimal numeral into `Money`, rejecting more than `max_places`
/// significant fractional digits.
///
/// Accepts an optional sign, an integer part and an optional fractional part
/// ("12", "12.5", ".50", "-3.00"). Trailing fractional zeros don't count
/// against the limit, so "1.500" is accepted as 1.5. Whitespace, exponents,
/// `NaN`, `Infinity` and magnitudes that cannot be rendered with two decimals
/// are rejected. Callers that read padded fields trim them first.
pub fn parse_money(input: &str, max_places: u32) -> Result<Money, ParseMoneyError> {
    let invalid = || ParseMoneyError::InvalidFormat(input.to_string());

    let (negative, digits) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        Some(_) => (false, input),
        None => return Err(invalid()),
    };

    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (digits, ""),
    };

    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(integer) || !all_digits(fraction) {
        return Err(invalid());
    }

    let significant = fraction.trim_end_matches('0');
    if significant.len() > max_places as usize {
        return Err(ParseMoneyError::TooManyDecimalPlaces {
            input: input.to_string(),
            max_places,
        });
    }

    let integer = if integer.is_empty() { "0" } else { integer };
    let canonical = if significant.is_empty() {
        format!("{}{}", if negative { "-" } else { "" }, integer)
    } else {
        format!(
            "{}{}.{}",
            if negative { "-" } else { "" },
            integer,
            significant
        )
    };

    let value = Decimal::from_str_exact(&canonical)
        .map_err(|_| ParseMoneyError::OutOfRange(input.to_string()))?;
    if !fits_display(value) {
        return Err(ParseMoneyError::OutOfRange(input.to_string()));
    }
    Ok(Money::from_decimal(value))
}

/// Format money as a two-decimal string, e.g. `1200.5` -> `"1200.50"`.
pub fn format_money(amount: Money) -> String {
    amount.format(DISPLAY_PLACES)
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(*self))
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_money(*self))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Money::from_cents(5000)), "50.00");
        assert_eq!(format_money(Money::from_cents(1234)), "12.34");
        assert_eq!(format_money(Money::from_cents(1)), "0.01");
        assert_eq!(format_money(Money::ZERO), "0.00");
        assert_eq!(format_money(Money::from_cents(-5000)), "-50.00");
        assert_eq!(format_money(Money::from_units(1000)), "1000.00");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        let value = Money::from_decimal(Decimal::new(12345, 3));
        assert_eq!(value.format(2), "12.35");
        assert_eq!(value.format(0), "12");
        assert_eq!(value.format(4), "12.3450");
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(Money::parse("50.00"), Ok(Money::from_cents(5000)));
        assert_eq!(Money::parse("50"), Ok(Money::from_cents(5000)));
        assert_eq!(Money::parse("12.34"), Ok(Money::from_cents(1234)));
        assert_eq!(Money::parse("12.5"), Ok(Money::from_cents(1250)));
        assert_eq!(Money::parse(".50"), Ok(Money::from_cents(50)));
        assert_eq!(Money::parse("7."), Ok(Money::from_units(7)));
        assert_eq!(Money::parse("-50.00"), Ok(Money::from_cents(-5000)));
        assert_eq!(Money::parse("+1"), Ok(Money::from_units(1)));
        assert_eq!(Money::parse("1.500"), Ok(Money::from_cents(150)));
    }

    #[test]
    fn test_parse_negative_zero_is_zero() {
        let zero = Money::parse("-0.00").unwrap();
        assert!(zero.is_zero());
        assert!(!zero.is_negative());
        assert_eq!(zero.to_string(), "0.00");
    }

    #[test]
    fn test_parse_money_invalid() {
        for input in [
            "", " ", "abc", "12.34.56", "NaN", "Infinity", "-Infinity", "1e5", "1,000", "--1",
            ".", "-", "0x10", "1 000", " 5", "5 ", "\t5", "5\u{a0}",
        ] {
            assert!(
                matches!(Money::parse(input), Err(ParseMoneyError::InvalidFormat(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_money_too_precise() {
        assert!(matches!(
            Money::parse("100.999"),
            Err(ParseMoneyError::TooManyDecimalPlaces { max_places: 2, .. })
        ));
        assert!(parse_money("1.5", 0).is_err());
        assert_eq!(parse_money("1.0", 0), Ok(Money::from_units(1)));
    }

    /// Largest magnitude that still renders with two decimals: 2^96 - 1 hundredths.
    const LARGEST: &str = "792281625142643375935439503.35";

    #[test]
    fn test_parse_money_out_of_range() {
        for input in [
            "99999999999999999999999999999999",
            "79228162514264337593543950335",
            "1000000000000000000000000000",
            "792281625142643375935439503.36",
            "-792281625142643375935439503.36",
        ] {
            assert!(
                matches!(Money::parse(input), Err(ParseMoneyError::OutOfRange(_))),
                "{input:?} should be out of range"
            );
        }
    }

    #[test]
    fn test_largest_amount_renders_with_two_decimals() {
        let largest = Money::parse(LARGEST).unwrap();
        assert_eq!(largest.to_string(), LARGEST);
        assert_eq!(
            Money::parse(&format!("-{LARGEST}")).unwrap().to_string(),
            format!("-{LARGEST}")
        );
        assert_eq!(
            Money::parse("100000000000000000000000000").unwrap().to_string(),
            "100000000000000000000000000.00"
        );
    }

    #[test]
    fn test_checked_arithmetic_stops_at_display_range() {
        let largest = Money::parse(LARGEST).unwrap();
        let cent = Money::from_cents(1);

        assert_eq!(largest.checked_add(cent), None);
        assert_eq!(largest.checked_add(largest), None);
        assert_eq!(
            Money::ZERO.checked_sub(largest).map(|m| m.to_string()),
            Some(format!("-{LARGEST}"))
        );
        assert_eq!(
            largest.checked_sub(cent).map(|m| m.to_string()),
            Some("792281625142643375935439503.34".to_string())
        );
        assert_eq!(
            Money::ZERO
                .checked_sub(largest)
                .and_then(|m| m.checked_sub(cent)),
            None
        );
    }

    #[test]
    fn test_exact_decimal_arithmetic() {
        let tenth = Money::parse("0.10").unwrap();
        let fifth = Money::parse("0.20").unwrap();
        assert_eq!(tenth.checked_add(fifth), Some(Money::parse("0.30").unwrap()));
        assert_eq!(
            Money::ZERO.checked_sub(tenth).map(|m| m.to_string()),
            Some("-0.10".to_string())
        );
    }

    #[test]
    fn test_ordering() {
        let small = Money::parse("9.99").unwrap();
        let big = Money::parse("10").unwrap();
        assert!(small < big);
        assert_eq!(Money::parse("10.00").unwrap(), big);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Money::from_cents(120050)).unwrap();
        assert_eq!(json, "\"1200.50\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Money::from_cents(120050));
        assert!(serde_json::from_str::<Money>("\"1.234\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_parse_format_is_identity(cents in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let value = Money::from_cents(cents);
            prop_assert_eq!(Money::parse(&value.format(2)), Ok(value));
        }
    }
}
