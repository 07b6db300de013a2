//! Command implementations.
//!
//! Commands print their results to stdout; logs and errors go to stderr.

pub mod auth;
pub mod books;
pub mod cart;

use bookstore_core::{CurrencyCode, Price};
use bookstore_storefront::StorefrontError;
use bookstore_storefront::api::ApiError;
use bookstore_storefront::cart::CartOutcome;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Storefront operation failed.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Reading input failed.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The cart could not be updated; the previous cart was kept.
    #[error("Cart update failed; your cart was not changed")]
    CartUpdateFailed,

    /// A book ID argument was empty.
    #[error("Book ID must not be empty")]
    EmptyBookId,
}

impl From<ApiError> for CommandError {
    fn from(err: ApiError) -> Self {
        Self::Storefront(err.into())
    }
}

/// Turn a failed cart outcome into an error.
fn check_outcome(outcome: CartOutcome) -> Result<CartOutcome, CommandError> {
    if outcome.is_failed() {
        return Err(CommandError::CartUpdateFailed);
    }
    Ok(outcome)
}

/// Format an amount in the store currency.
fn format_price(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).to_string()
}
