//! # Operation Mapper
//!
//! Translates between Rosetta operation lists and staking transactions, in
//! both directions, from a single table of [`PATTERNS`].
//!
//! Every operation list starts with the fee operation at index 0. It pays
//! the fee, and its account is the only signer. What follows the fee
//! operation selects the method:
//!
//! | Shape after the fee op                         | Method                  |
//! |------------------------------------------------|-------------------------|
//! | `Transfer/general` debit, `Transfer/general` credit | `staking.Transfer`      |
//! | `Burn/general` debit                            | `staking.Burn`          |
//! | `Transfer/general` debit, `Transfer/escrow` credit  | `staking.AddEscrow`     |
//! | `Transfer/escrow` debit (pool shares)           | `staking.ReclaimEscrow` |
//!
//! Debits are negative, credits positive. Building checks that the debited
//! account is the signer for every pattern except reclaim-escrow, where the
//! debited account is the escrow pool and no such check applies.
//!
//! Parsing is the exact inverse. For an unsigned transaction the signer is
//! not known yet and is reported as [`FROM_PLACEHOLDER`].

use thiserror::Error;

use super::amount::{read_amount, write_amount, AmountError};
use super::metadata::{FeeMetadata, MetadataError};
use crate::cbor::{self, CborError};
use crate::config::FROM_PLACEHOLDER;
use crate::rosetta::{AccountIdentifier, Currency, Operation, OperationType, SubAccount};
use crate::staking::{Address, AddressError, Quantity};
use crate::transaction::{
    Burn, Escrow, Fee, MethodBody, MethodName, ReclaimEscrow, Transaction, Transfer,
};

/// Why an operation list or transaction could not be mapped.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("operation list is empty: fee operation missing")]
    MissingFeeOperation,

    #[error("operation {index}: {reason}")]
    InvalidOperation { index: usize, reason: String },

    #[error("operation {index}: {source}")]
    Amount {
        index: usize,
        #[source]
        source: AmountError,
    },

    #[error("operation {index}: address '{address}': {source}")]
    Address {
        index: usize,
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("operation {index}: account {actual} does not match signer {signer}")]
    SignerMismatch {
        index: usize,
        actual: String,
        signer: String,
    },

    #[error("debit and credit differ: {debit} != {credit}")]
    AmountMismatch { debit: Quantity, credit: Quantity },

    #[error("fee operation metadata: {0}")]
    FeeMetadata(#[from] MetadataError),

    #[error("operation list matches no supported transaction")]
    UnsupportedOperations,

    #[error("unsupported method '{0}'")]
    UnsupportedMethod(MethodName),

    #[error("malformed {method} body: {source}")]
    Body {
        method: MethodName,
        #[source]
        source: CborError,
    },

    #[error(transparent)]
    Cbor(#[from] CborError),
}

impl MappingError {
    /// `true` when the input was well formed but describes something this
    /// gateway does not support.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOperations | Self::UnsupportedMethod(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Pattern table
// ---------------------------------------------------------------------------

/// One supported transaction kind.
pub struct Pattern {
    /// Method produced and recognised by this pattern.
    pub method: MethodName,
    /// Expected `(type, sub-account)` of each operation after the fee op.
    pub shape: &'static [(OperationType, SubAccount)],
    build: fn(&[Operation], &str) -> Result<Vec<u8>, MappingError>,
    expand: fn(&Transaction, &str) -> Result<Vec<Operation>, MappingError>,
}

impl Pattern {
    /// Does the operation list (fee op included) have this pattern's shape?
    pub fn matches(&self, ops: &[Operation]) -> bool {
        ops.len() == self.shape.len() + 1
            && ops[1..]
                .iter()
                .zip(self.shape)
                .all(|(op, (op_type, sub_account))| {
                    op.operation_type() == Some(*op_type)
                        && op.account.as_ref().and_then(AccountIdentifier::sub_account)
                            == Some(*sub_account)
                })
    }
}

/// Supported transaction kinds, in matching order.
pub static PATTERNS: [Pattern; 4] = [
    Pattern {
        method: MethodName::Transfer,
        shape: &[
            (OperationType::Transfer, SubAccount::General),
            (OperationType::Transfer, SubAccount::General),
        ],
        build: build_transfer,
        expand: expand_transfer,
    },
    Pattern {
        method: MethodName::Burn,
        shape: &[(OperationType::Burn, SubAccount::General)],
        build: build_burn,
        expand: expand_burn,
    },
    Pattern {
        method: MethodName::AddEscrow,
        shape: &[
            (OperationType::Transfer, SubAccount::General),
            (OperationType::Transfer, SubAccount::Escrow),
        ],
        build: build_add_escrow,
        expand: expand_add_escrow,
    },
    Pattern {
        method: MethodName::ReclaimEscrow,
        shape: &[(OperationType::Transfer, SubAccount::Escrow)],
        build: build_reclaim_escrow,
        expand: expand_reclaim_escrow,
    },
];

// ---------------------------------------------------------------------------
// Operations -> transaction
// ---------------------------------------------------------------------------

/// An unsigned transaction plus the address that has to sign it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construction {
    pub transaction: Transaction,
    pub signer: Address,
}

/// Build the unsigned transaction described by `ops`.
pub fn build_transaction(ops: &[Operation], nonce: u64) -> Result<Construction, MappingError> {
    let fee_op = ops.first().ok_or(MappingError::MissingFeeOperation)?;
    let (signer, fee) = read_fee_operation(fee_op)?;

    let pattern = PATTERNS
        .iter()
        .find(|p| p.matches(ops))
        .ok_or(MappingError::UnsupportedOperations)?;
    let body = (pattern.build)(ops, &account(fee_op, 0)?.address)?;

    Ok(Construction {
        transaction: Transaction {
            nonce,
            fee: Some(fee),
            method: pattern.method.clone(),
            body,
        },
        signer,
    })
}

fn read_fee_operation(op: &Operation) -> Result<(Address, Fee), MappingError> {
    if op.operation_type() != Some(OperationType::Transfer) {
        return Err(invalid(0, format!("fee operation has type '{}'", op.op_type)));
    }
    let acct = account(op, 0)?;
    if acct.sub_account() != Some(SubAccount::General) {
        return Err(invalid(0, "fee operation must use the general sub-account"));
    }
    let signer = parse_address(op, 0)?;
    let amount = read(op, 0, &Currency::native(), true)?;
    let gas = FeeMetadata::from_metadata(op.metadata.as_ref())?.gas();
    Ok((signer, Fee { amount, gas }))
}

fn build_transfer(ops: &[Operation], signer: &str) -> Result<Vec<u8>, MappingError> {
    let (debit, credit) = (op_at(ops, 1)?, op_at(ops, 2)?);
    check_signer(debit, 1, signer)?;
    let tokens = read(debit, 1, &Currency::native(), true)?;
    let to = parse_address(credit, 2)?;
    let credited = read(credit, 2, &Currency::native(), false)?;
    ensure_equal(&tokens, &credited)?;
    encode(&Transfer { to, tokens })
}

fn build_burn(ops: &[Operation], signer: &str) -> Result<Vec<u8>, MappingError> {
    let debit = op_at(ops, 1)?;
    check_signer(debit, 1, signer)?;
    let tokens = read(debit, 1, &Currency::native(), true)?;
    encode(&Burn { tokens })
}

fn build_add_escrow(ops: &[Operation], signer: &str) -> Result<Vec<u8>, MappingError> {
    let (debit, credit) = (op_at(ops, 1)?, op_at(ops, 2)?);
    check_signer(debit, 1, signer)?;
    let tokens = read(debit, 1, &Currency::native(), true)?;
    let account = parse_address(credit, 2)?;
    let credited = read(credit, 2, &Currency::native(), false)?;
    ensure_equal(&tokens, &credited)?;
    encode(&Escrow { account, tokens })
}

// No signer check: the debited account is the escrow pool, not the payer.
fn build_reclaim_escrow(ops: &[Operation], _signer: &str) -> Result<Vec<u8>, MappingError> {
    let debit = op_at(ops, 1)?;
    let account = parse_address(debit, 1)?;
    let shares = read(debit, 1, &Currency::pool_share(), true)?;
    encode(&ReclaimEscrow { account, shares })
}

// ---------------------------------------------------------------------------
// Transaction -> operations
// ---------------------------------------------------------------------------

/// Describe `tx` as an operation list.
///
/// `signer` is the verified signer of a signed transaction, or `None` for
/// an unsigned one.
pub fn parse_operations(
    tx: &Transaction,
    signer: Option<&Address>,
) -> Result<Vec<Operation>, MappingError> {
    let from = signer
        .map(Address::to_string)
        .unwrap_or_else(|| FROM_PLACEHOLDER.to_string());

    let (fee_amount, fee_gas) = match &tx.fee {
        Some(fee) => (fee.amount.clone(), fee.gas),
        None => (Quantity::zero(), 0),
    };
    let fee_op = Operation::new(
        0,
        OperationType::Transfer,
        AccountIdentifier::with_sub_account(from.as_str(), SubAccount::General),
        write_amount(&fee_amount, Currency::native(), true),
    )
    .with_metadata(FeeMetadata::for_gas(fee_gas));

    let pattern = PATTERNS
        .iter()
        .find(|p| p.method == tx.method)
        .ok_or_else(|| MappingError::UnsupportedMethod(tx.method.clone()))?;

    let mut ops = vec![fee_op];
    ops.extend((pattern.expand)(tx, &from)?);
    Ok(ops)
}

fn expand_transfer(tx: &Transaction, from: &str) -> Result<Vec<Operation>, MappingError> {
    let body: Transfer = decode(tx)?;
    Ok(vec![
        general_op(1, OperationType::Transfer, from, &body.tokens, true),
        general_op(2, OperationType::Transfer, &body.to.to_string(), &body.tokens, false),
    ])
}

fn expand_burn(tx: &Transaction, from: &str) -> Result<Vec<Operation>, MappingError> {
    let body: Burn = decode(tx)?;
    Ok(vec![general_op(1, OperationType::Burn, from, &body.tokens, true)])
}

fn expand_add_escrow(tx: &Transaction, from: &str) -> Result<Vec<Operation>, MappingError> {
    let body: Escrow = decode(tx)?;
    Ok(vec![
        general_op(1, OperationType::Transfer, from, &body.tokens, true),
        Operation::new(
            2,
            OperationType::Transfer,
            AccountIdentifier::with_sub_account(body.account.to_string(), SubAccount::Escrow),
            write_amount(&body.tokens, Currency::native(), false),
        ),
    ])
}

fn expand_reclaim_escrow(tx: &Transaction, _from: &str) -> Result<Vec<Operation>, MappingError> {
    let body: ReclaimEscrow = decode(tx)?;
    Ok(vec![Operation::new(
        1,
        OperationType::Transfer,
        AccountIdentifier::with_sub_account(body.account.to_string(), SubAccount::Escrow),
        write_amount(&body.shares, Currency::pool_share(), true),
    )])
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invalid(index: usize, reason: impl Into<String>) -> MappingError {
    MappingError::InvalidOperation {
        index,
        reason: reason.into(),
    }
}

fn op_at(ops: &[Operation], index: usize) -> Result<&Operation, MappingError> {
    ops.get(index)
        .ok_or_else(|| invalid(index, "operation missing"))
}

fn account(op: &Operation, index: usize) -> Result<&AccountIdentifier, MappingError> {
    op.account
        .as_ref()
        .ok_or_else(|| invalid(index, "account missing"))
}

fn parse_address(op: &Operation, index: usize) -> Result<Address, MappingError> {
    let address = &account(op, index)?.address;
    address.parse().map_err(|source| MappingError::Address {
        index,
        address: address.clone(),
        source,
    })
}

fn check_signer(op: &Operation, index: usize, signer: &str) -> Result<(), MappingError> {
    let actual = &account(op, index)?.address;
    if actual != signer {
        return Err(MappingError::SignerMismatch {
            index,
            actual: actual.clone(),
            signer: signer.to_string(),
        });
    }
    Ok(())
}

fn read(
    op: &Operation,
    index: usize,
    currency: &Currency,
    negate: bool,
) -> Result<Quantity, MappingError> {
    let amount = op
        .amount
        .as_ref()
        .ok_or_else(|| invalid(index, "amount missing"))?;
    read_amount(amount, currency, negate).map_err(|source| MappingError::Amount { index, source })
}

fn ensure_equal(debit: &Quantity, credit: &Quantity) -> Result<(), MappingError> {
    if debit != credit {
        return Err(MappingError::AmountMismatch {
            debit: debit.clone(),
            credit: credit.clone(),
        });
    }
    Ok(())
}

fn encode<B: MethodBody>(body: &B) -> Result<Vec<u8>, MappingError> {
    Ok(cbor::to_vec(body)?)
}

fn decode<B: MethodBody>(tx: &Transaction) -> Result<B, MappingError> {
    tx.decode_body().map_err(|source| MappingError::Body {
        method: tx.method.clone(),
        source,
    })
}

fn general_op(
    index: i64,
    op_type: OperationType,
    address: &str,
    tokens: &Quantity,
    debit: bool,
) -> Operation {
    Operation::new(
        index,
        op_type,
        AccountIdentifier::with_sub_account(address, SubAccount::General),
        write_amount(tokens, Currency::native(), debit),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
