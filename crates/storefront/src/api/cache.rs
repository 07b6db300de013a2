//! Cache value types for catalog responses.

use super::types::{Book, BookPage};

/// Cached values (books and catalog pages).
#[derive(Clone)]
pub enum CacheValue {
    Book(Box<Book>),
    Books(BookPage),
}
