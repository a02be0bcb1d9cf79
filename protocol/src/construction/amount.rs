//! Reading Rosetta amounts into ledger quantities.
//!
//! Rosetta amounts are signed decimal strings; ledger quantities are
//! unsigned. Debits arrive negative and are read with `negate = true`, so
//! a debit of `"-100"` becomes the quantity `100`. Anything that would end
//! up negative after that is rejected.

use num::BigInt;
use std::str::FromStr;
use thiserror::Error;

use crate::rosetta::{Amount, Currency};
use crate::staking::{Quantity, QuantityError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("wrong currency: expected {expected}, got {actual}")]
    WrongCurrency { expected: String, actual: String },

    #[error("amount value is not an integer: '{0}'")]
    InvalidValue(String),

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// Convert `amount` into a quantity of `expected` currency, negating first
/// when `negate` is set.
pub fn read_amount(
    amount: &Amount,
    expected: &Currency,
    negate: bool,
) -> Result<Quantity, AmountError> {
    if !amount.currency.matches(expected) {
        return Err(AmountError::WrongCurrency {
            expected: format!("{}/{}", expected.symbol, expected.decimals),
            actual: format!("{}/{}", amount.currency.symbol, amount.currency.decimals),
        });
    }
    // num accepts `_` digit separators; Rosetta values never carry them.
    if amount.value.contains('_') {
        return Err(AmountError::InvalidValue(amount.value.clone()));
    }
    let mut value = BigInt::from_str(&amount.value)
        .map_err(|_| AmountError::InvalidValue(amount.value.clone()))?;
    if negate {
        value = -value;
    }
    Ok(Quantity::try_from(value)?)
}

/// Render a quantity as a Rosetta amount; debits get a leading `-`.
///
/// Zero debits render as `"-0"`, which is how the chain's own tooling
/// reports an absent fee.
pub fn write_amount(quantity: &Quantity, currency: Currency, debit: bool) -> Amount {
    let value = if debit {
        format!("-{}", quantity)
    } else {
        quantity.to_string()
    };
    Amount::new(value, currency)
}
