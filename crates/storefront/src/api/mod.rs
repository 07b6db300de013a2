//! Bookstore REST API client.
//!
//! # Architecture
//!
//! - The API is the source of truth for carts, pricing and inventory; the
//!   client never merges cart state itself when signed in
//! - Cart operations go through the [`CartApi`] port so the cart manager can
//!   run against in-memory fakes
//! - Book lookups are cached in memory via `moka` (5 minute TTL); cart
//!   requests are never cached
//! - Requests carry `Authorization: Bearer <token>` whenever the
//!   [`AuthSession`](crate::auth::AuthSession) holds a token
//!
//! # Routes
//!
//! All routes are relative to `BOOKSTORE_API_URL`:
//!
//! | Operation          | Route                         |
//! |--------------------|-------------------------------|
//! | fetch cart         | `GET cart`                    |
//! | add line           | `POST cart/items`             |
//! | update line        | `PATCH cart/items/{lineId}`   |
//! | remove line        | `DELETE cart/items/{lineId}`  |
//! | clear cart         | `DELETE cart`                 |
//! | book by id         | `GET books/{id}`              |
//! | book listing       | `GET books?page=N`            |
//! | sign in            | `POST auth/login`             |

mod cache;
mod client;
mod conversions;
pub mod types;

pub use client::BookstoreClient;
pub use types::*;

use async_trait::async_trait;
use bookstore_core::CartLineId;
use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of response body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Errors that can occur when talking to the bookstore API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token missing, expired, or rejected (401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request rejected as invalid (400/422).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot have path segments appended.
    #[error("API base URL cannot be used as a base")]
    InvalidBaseUrl,
}

impl ApiError {
    /// Map a non-success response to an error.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(message),
            _ => Self::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the error means the bearer token was not accepted.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Extract a human-readable message from an error body.
///
/// Prefers a `message` or `error` field of a JSON body, falling back to the
/// (truncated) raw text.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| json.get(*key).and_then(|v| v.as_str()).map(str::to_owned))
        });

    let message = from_json.unwrap_or_else(|| body.trim().to_owned());
    if message.is_empty() {
        return "(no error details provided)".to_string();
    }
    message.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Remote cart operations.
///
/// Mutations return nothing: callers re-fetch the cart afterwards because
/// the server decides how lines merge.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the signed-in customer's cart.
    async fn fetch_cart(&self) -> Result<RemoteCart, ApiError>;

    /// Add a line (or more of an existing product) to the cart.
    async fn add_line(&self, line: &AddCartLine) -> Result<(), ApiError>;

    /// Change the quantity of an existing line.
    async fn update_line(&self, line_id: &CartLineId, update: &UpdateCartLine)
    -> Result<(), ApiError>;

    /// Delete a line.
    async fn remove_line(&self, line_id: &CartLineId) -> Result<(), ApiError>;

    /// Delete every line.
    async fn clear_cart(&self) -> Result<(), ApiError>;
}
