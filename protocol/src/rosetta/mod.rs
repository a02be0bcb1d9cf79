//! # Rosetta API Model
//!
//! Request, response and error types shared by the construction service and
//! the HTTP layer.

pub mod errors;
pub mod types;

pub use errors::{ApiError, ErrorKind};
pub use types::*;
