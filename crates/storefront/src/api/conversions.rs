//! Remote cart to local cart conversion.

use bookstore_core::Quantity;
use tracing::warn;

use super::types::{RemoteCart, RemoteCartItem};
use crate::cart::{CartLine, CartState};

/// Convert a remote line, dropping it if its quantity is not positive.
pub fn convert_cart_line(item: RemoteCartItem) -> Option<CartLine> {
    let Some(quantity) = Quantity::from_signed(item.quantity) else {
        warn!(
            line_id = %item.id,
            quantity = item.quantity,
            "Dropping remote cart line with non-positive quantity"
        );
        return None;
    };

    let mut line = CartLine::from_book(&item.book, quantity);
    line.server_line_id = Some(item.id);
    Some(line)
}

impl From<RemoteCart> for CartState {
    fn from(cart: RemoteCart) -> Self {
        cart.items
            .into_iter()
            .filter_map(convert_cart_line)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::{BookId, CartLineId};
    use rust_decimal::Decimal;

    use super::*;

    fn remote(json: &str) -> RemoteCart {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_remote_lines_keep_server_ids() {
        let state = CartState::from(remote(
            r#"{"items": [
                {"id": 11, "quantity": 3, "book": {"id": "b1", "title": "A", "price": 100000, "discountedPrice": 80000}},
                {"id": 12, "quantity": 1, "book": {"id": "b2", "title": "B", "price": 50000}}
            ]}"#,
        ));

        assert_eq!(state.len(), 2);
        let first = state.get(&BookId::new("b1")).unwrap();
        assert_eq!(first.server_line_id, Some(CartLineId::new("11")));
        assert_eq!(state.total_items(), 4);
        assert_eq!(state.total_price(), Decimal::from(290_000));
    }

    #[test]
    fn test_non_positive_lines_are_dropped() {
        let state = CartState::from(remote(
            r#"{"items": [
                {"id": 1, "quantity": 0, "book": {"id": "b1"}},
                {"id": 2, "quantity": -2, "book": {"id": "b2"}}
            ]}"#,
        ));
        assert!(state.is_empty());
    }

    #[test]
    fn test_duplicate_products_merge() {
        let state = CartState::from(remote(
            r#"{"items": [
                {"id": 1, "quantity": 1, "book": {"id": "b1", "price": 10}},
                {"id": 2, "quantity": 2, "book": {"id": "b1", "price": 10}}
            ]}"#,
        ));
        assert_eq!(state.len(), 1);
        assert_eq!(state.total_items(), 3);
        assert_eq!(
            state.lines()[0].server_line_id,
            Some(CartLineId::new("1"))
        );
    }
}
