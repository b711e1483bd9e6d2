//! Input checks run at the service boundary, before any account is touched.

use crate::domain::{Money, parse_money};

use super::{LedgerConfig, LedgerError};

pub fn parse_amount(input: &str, config: &LedgerConfig) -> Result<Money, LedgerError> {
    parse_money(input, config.max_decimal_places)
        .map_err(|err| LedgerError::InvalidAmount(err.to_string()))
}

/// Amount for a deposit, withdrawal or transfer: strictly positive.
pub fn parse_positive_amount(input: &str, config: &LedgerConfig) -> Result<Money, LedgerError> {
    let amount = parse_amount(input, config)?;
    if !amount.is_positive() {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

pub fn parse_starting_balance(input: &str, config: &LedgerConfig) -> Result<Money, LedgerError> {
    let amount = parse_amount(input, config)?;
    if amount.is_negative() {
        return Err(LedgerError::NegativeStartingBalance(amount));
    }
    Ok(amount)
}
