//! # Staking Ledger Types
//!
//! The two value types every staking transaction is built from: account
//! addresses and token quantities.

pub mod address;
pub mod quantity;

pub use address::{Address, AddressError};
pub use quantity::{Quantity, QuantityError};
