//! Bookstore storefront client library.
//!
//! Keeps the customer's shopping cart consistent across guest and signed-in
//! sessions: guest carts live in local storage, signed-in carts live on the
//! bookstore API and are re-fetched after every change.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;

pub use error::{Result, StorefrontError};
pub use state::Storefront;
