//! Persisted guest cart format.
//!
//! The cart is stored under [`keys::CART`] as a JSON array:
//!
//! ```json
//! [
//!   {
//!     "productId": "b1",
//!     "title": "Mắt biếc",
//!     "author": "Nguyễn Nhật Ánh",
//!     "price": 90000,
//!     "discountedPrice": 72000,
//!     "image": "covers/b1.jpg",
//!     "quantity": 2,
//!     "cartItemId": "42"
//!   }
//! ]
//! ```
//!
//! Reading never fails on bad data. A value that is not a JSON array is
//! treated as no cart at all; individual malformed entries are skipped;
//! entries with a non-positive quantity are dropped; duplicate products are
//! merged. Entries written before discounts existed have no
//! `discountedPrice` key and are upgraded to use their regular price; an
//! explicit `null` means the line has no discount.

use bookstore_core::price::lenient;
use bookstore_core::{BookId, CartLineId, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use super::{CartLine, CartState};
use crate::storage::{KeyValueStore, StorageError, keys};

/// On-disk representation of a [`CartLine`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
struct StoredLine {
    product_id: BookId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, with = "lenient")]
    price: Decimal,
    /// Outer `None` when the key is missing.
    #[serde(
        default,
        deserialize_with = "present_price",
        serialize_with = "write_price"
    )]
    discounted_price: Option<Option<Decimal>>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cart_item_id: Option<CartLineId>,
}

impl From<&CartLine> for StoredLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            title: Some(line.title.clone()),
            author: Some(line.author.clone()),
            price: line.unit_price,
            discounted_price: Some(line.discounted_unit_price),
            image: line.image.clone(),
            quantity: i64::from(line.quantity.get()),
            cart_item_id: line.server_line_id.clone(),
        }
    }
}

impl StoredLine {
    /// Convert to a cart line, or `None` if the quantity is not positive.
    fn into_line(self) -> Option<CartLine> {
        let quantity = Quantity::from_signed(self.quantity)?;
        Some(CartLine {
            product_id: self.product_id,
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            unit_price: self.price,
            // Legacy entries predate discounts
            discounted_unit_price: self.discounted_price.unwrap_or(Some(self.price)),
            image: self.image,
            quantity,
            server_line_id: self.cart_item_id,
        })
    }
}

/// Only called when the key is present, so a `null` stays distinct from a
/// missing key.
#[allow(clippy::option_option)]
fn present_price<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient::option::deserialize(deserializer).map(Some)
}

#[allow(clippy::ref_option, clippy::option_option)] // serde passes `&Option<T>`
fn write_price<S>(amount: &Option<Option<Decimal>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    lenient::option::serialize(&amount.flatten(), serializer)
}

/// Read a count given as a number, a numeric string, or `null`.
fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let count = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(count)
}

/// Parse a serialized cart.
///
/// Returns `None` if `raw` is not a JSON array (including `null`).
#[must_use]
pub fn parse(raw: &str) -> Option<CartState> {
    let entries = match serde_json::from_str::<Option<Vec<Value>>>(raw) {
        Ok(entries) => entries?,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed persisted cart");
            return None;
        }
    };

    let state = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<StoredLine>(entry) {
            Ok(stored) => stored.into_line(),
            Err(e) => {
                warn!(error = %e, "Skipping malformed persisted cart line");
                None
            }
        })
        .collect();

    Some(state)
}

/// Serialize a cart for storage.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize(state: &CartState) -> Result<String, serde_json::Error> {
    let lines: Vec<StoredLine> = state.lines().iter().map(StoredLine::from).collect();
    serde_json::to_string(&lines)
}

/// Read the persisted cart.
///
/// Returns `Ok(None)` when nothing usable is stored.
///
/// # Errors
///
/// Returns an error only if the store itself cannot be read.
pub fn load(store: &dyn KeyValueStore) -> Result<Option<CartState>, StorageError> {
    let Some(raw) = store.get(keys::CART)? else {
        debug!("No persisted cart");
        return Ok(None);
    };
    Ok(parse(&raw))
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be serialized or written.
pub fn save(store: &dyn KeyValueStore, state: &CartState) -> Result<(), StorageError> {
    let raw = serialize(state)?;
    store.set(keys::CART, &raw)
}
