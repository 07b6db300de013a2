//! Bookstore Core - Shared types library.
//!
//! This crate provides common types used across the bookstore client crates:
//! - `storefront` - Cart state manager, API client, and storage adapters
//! - `cli` - Command-line front end for browsing books and managing the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, quantities, prices, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
