//! Wire types for the bookstore API.
//!
//! Response types deserialize leniently (nullable strings, numeric or string
//! IDs and prices). Request types are validated when constructed, so a value
//! of a request type is always safe to send.

use bookstore_core::price::lenient;
use bookstore_core::{BookId, CartId, CartLineId, Email, EmailError, Quantity};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// =============================================================================
// Catalog
// =============================================================================

/// A book as returned by the catalog and cart endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Book ID.
    pub id: BookId,
    /// Title.
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    /// Author display name.
    #[serde(default, deserialize_with = "author_name")]
    pub author: String,
    /// Regular unit price.
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub price: Decimal,
    /// Discounted unit price, when a discount applies.
    #[serde(default, deserialize_with = "lenient::option::deserialize")]
    pub discounted_price: Option<Decimal>,
    /// Cover image reference.
    #[serde(default)]
    pub image: Option<String>,
}

impl Book {
    /// The price a customer pays for one copy.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discounted_price.unwrap_or(self.price)
    }
}

/// One page of the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    /// Books on this page.
    #[serde(default)]
    pub items: Vec<Book>,
    /// Page number (1-indexed).
    #[serde(default)]
    pub page: u32,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u32,
}

// =============================================================================
// Cart
// =============================================================================

/// The signed-in customer's cart as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RemoteCart {
    /// Cart ID.
    #[serde(default)]
    pub id: Option<CartId>,
    /// Cart lines.
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

/// A line of a [`RemoteCart`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCartItem {
    /// Server-side line ID, required to update or delete the line.
    pub id: CartLineId,
    /// Quantity as recorded by the server (may be zero for stale lines).
    #[serde(default)]
    pub quantity: i64,
    /// The book on this line.
    pub book: Book,
}

// =============================================================================
// Requests
// =============================================================================

/// Errors raised while building a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A required field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Quantity must be a positive integer.
    #[error("quantity must be a positive integer (got {0})")]
    InvalidQuantity(i64),

    /// Email address failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Body of `POST cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLine {
    book_id: BookId,
    quantity: Quantity,
}

impl AddCartLine {
    /// Build an add-line request.
    ///
    /// # Errors
    ///
    /// Returns an error if the book ID is blank or the quantity is zero.
    pub fn new(book_id: BookId, quantity: u32) -> Result<Self, RequestError> {
        if book_id.is_blank() {
            return Err(RequestError::MissingField("bookId"));
        }
        let quantity =
            Quantity::new(quantity).ok_or(RequestError::InvalidQuantity(i64::from(quantity)))?;
        Ok(Self { book_id, quantity })
    }

    /// The book being added.
    #[must_use]
    pub const fn book_id(&self) -> &BookId {
        &self.book_id
    }

    /// The number of copies being added.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }
}

/// Body of `PATCH cart/items/{lineId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateCartLine {
    quantity: Quantity,
}

impl UpdateCartLine {
    /// The new quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }
}

impl From<Quantity> for UpdateCartLine {
    fn from(quantity: Quantity) -> Self {
        Self { quantity }
    }
}

/// Credentials for `POST auth/login`.
///
/// Not `Serialize`: the client builds the body itself so the password is
/// only exposed for the duration of the request.
#[derive(Debug)]
pub struct LoginRequest {
    email: Email,
    password: SecretString,
}

impl LoginRequest {
    /// Build a login request.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is invalid or the password is empty.
    pub fn new(email: &str, password: SecretString) -> Result<Self, RequestError> {
        use secrecy::ExposeSecret;

        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(RequestError::MissingField("password"));
        }
        Ok(Self { email, password })
    }

    /// The account email.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// The account password.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }
}

/// Response of `POST auth/login`.
#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
}

// =============================================================================
// Lenient field helpers
// =============================================================================

/// Deserialize a string that may be `null`.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize an author given either as a name or as `{ "name": ... }`.
fn author_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Author {
        Name(String),
        Record {
            #[serde(default)]
            name: Option<String>,
        },
    }

    Ok(match Option::<Author>::deserialize(deserializer)? {
        Some(Author::Name(name)) => name,
        Some(Author::Record { name }) => name.unwrap_or_default(),
        None => String::new(),
    })
}
