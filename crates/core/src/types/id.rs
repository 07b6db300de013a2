//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! The bookstore API is not consistent about ID encoding: some endpoints
//! return numeric IDs and others return strings. IDs are therefore stored
//! as strings and accept either form when deserialized.

use serde::{Deserialize, Deserializer};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string
/// - `Deserialize` from either a JSON string or a JSON integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `is_blank()`
/// - `From<String>`, `From<&str>`, `AsRef<str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use bookstore_core::define_id;
/// define_id!(ReviewId);
/// define_id!(ShelfId);
///
/// let review_id = ReviewId::new("r-1");
/// let shelf_id = ShelfId::new("r-1");
///
/// // These are different types, so this won't compile:
/// // let _: ReviewId = shelf_id;
/// # let _ = (review_id, shelf_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the ID is empty or whitespace only.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_id_string(deserializer).map(Self)
            }
        }
    };
}

/// Deserialize an ID that may be encoded as a string or an integer.
///
/// Used by [`define_id!`]; not intended to be called directly.
///
/// # Errors
///
/// Returns an error if the value is neither a string nor an integer.
#[doc(hidden)]
pub fn deserialize_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

// Define standard entity IDs
define_id!(BookId);
define_id!(CartId);
define_id!(CartLineId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_string() {
        let id: BookId = serde_json::from_str("\"b1\"").unwrap();
        assert_eq!(id.as_str(), "b1");
    }

    #[test]
    fn test_deserialize_from_integer() {
        let id: CartLineId = serde_json::from_str("42").unwrap();
        assert_eq!(id, CartLineId::new("42"));
    }

    #[test]
    fn test_deserialize_rejects_objects() {
        assert!(serde_json::from_str::<BookId>("{\"id\": 1}").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&BookId::new("b7")).unwrap();
        assert_eq!(json, "\"b7\"");
    }

    #[test]
    fn test_is_blank() {
        assert!(BookId::new("  ").is_blank());
        assert!(!BookId::new("b1").is_blank());
    }

    #[test]
    fn test_display() {
        assert_eq!(CartId::from("cart-9").to_string(), "cart-9");
    }
}
