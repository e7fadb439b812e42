use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: '{0}'")]
    Invalid(String),
}

/// A monetary figure read off a document. Currency is not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Parse an amount token, dropping thousands separators (`1,234.50`).
    pub fn parse(token: &str) -> Result<Self, AmountError> {
        let clean = token.trim().replace(',', "");
        Decimal::from_str(&clean)
            .map(Amount)
            .map_err(|_| AmountError::Invalid(token.to_string()))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

/// Always two decimal places, no separators: `1234.50`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_thousands_separators() {
        let a = Amount::parse("1,234.50").unwrap();
        assert_eq!(a.as_decimal(), Decimal::from_str("1234.50").unwrap());
    }

    #[test]
    fn display_pads_to_two_places() {
        assert_eq!(Amount::parse("45.9").unwrap().to_string(), "45.90");
        assert_eq!(Amount::parse("1,000").unwrap().to_string(), "1000.00");
        assert_eq!(Amount::parse("8.50").unwrap().to_string(), "8.50");
    }

    #[test]
    fn ordering_is_numeric() {
        let small = Amount::parse("999.99").unwrap();
        let large = Amount::parse("1,000.00").unwrap();
        assert!(large > small);
    }

    #[test]
    fn parse_invalid() {
        assert!(Amount::parse("").is_err());
        assert!(Amount::parse("1.2.3").is_err());
        assert_eq!(
            Amount::parse("abc"),
            Err(AmountError::Invalid("abc".to_string()))
        );
    }

    #[test]
    fn parse_overflow_is_an_error() {
        let huge = "9".repeat(40) + ".00";
        assert!(Amount::parse(&huge).is_err());
    }
}
