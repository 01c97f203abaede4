//! CLI command implementations.

pub mod cart;

use baxoq_core::{IdError, QuantityError};
use baxoq_storefront::saleor::CartError;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The backend rejected or failed the operation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The operation failed; the message is what a shopper would see.
    #[error("{0}")]
    Failed(String),

    /// There is no cart to act on.
    #[error("No cart for channel {0}. Add an item or run `baxoq create` first.")]
    NoCart(String),

    /// The line is not in the cart.
    #[error("Line not found in cart: {0}")]
    UnknownLine(String),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IdError> for CliError {
    fn from(err: IdError) -> Self {
        Self::Cart(err.into())
    }
}

impl From<QuantityError> for CliError {
    fn from(err: QuantityError) -> Self {
        Self::Cart(err.into())
    }
}
