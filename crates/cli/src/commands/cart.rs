//! Cart commands.
//!
//! Every command runs after the cart has been loaded for the current auth
//! state, so guest and signed-in carts behave the same from here.

use bookstore_core::CurrencyCode;
use bookstore_storefront::Storefront;
use bookstore_storefront::cart::{CartOutcome, CartState};
use bookstore_storefront::error::add_breadcrumb;

use super::books::parse_book_id;
use super::{CommandError, check_outcome, format_price};

/// Print the cart with line and grand totals.
#[allow(clippy::print_stdout)]
pub fn show(storefront: &Storefront) {
    let cart = storefront.cart().snapshot();
    print!("{}", render(&cart, storefront.config().currency));
}

/// Add copies of a book, looking it up in the catalog first.
///
/// # Errors
///
/// Returns an error if the book cannot be fetched or the cart update fails.
#[allow(clippy::print_stdout)]
pub async fn add(storefront: &Storefront, book_id: &str, quantity: u32) -> Result<(), CommandError> {
    let id = parse_book_id(book_id)?;
    let book = storefront.client().get_book(&id).await?;

    add_breadcrumb("cart", "Add book", Some(&[("book_id", id.as_str())]));
    match check_outcome(storefront.cart().add(&book, quantity).await)? {
        CartOutcome::Applied => println!("Added {quantity} x {}", book.title),
        _ => println!("Nothing added"),
    }
    print_totals(storefront);
    Ok(())
}

/// Set a book's quantity; zero or less removes it.
///
/// # Errors
///
/// Returns an error if the cart update fails.
#[allow(clippy::print_stdout)]
pub async fn update(storefront: &Storefront, book_id: &str, quantity: i64) -> Result<(), CommandError> {
    let id = parse_book_id(book_id)?;

    add_breadcrumb("cart", "Update quantity", Some(&[("book_id", id.as_str())]));
    match check_outcome(storefront.cart().update_quantity(&id, quantity).await)? {
        CartOutcome::Applied if quantity > 0 => println!("Set {id} to {quantity}"),
        CartOutcome::Applied => println!("Removed {id}"),
        _ => println!("{id} is not in the cart"),
    }
    print_totals(storefront);
    Ok(())
}

/// Remove a book from the cart.
///
/// # Errors
///
/// Returns an error if the cart update fails.
#[allow(clippy::print_stdout)]
pub async fn remove(storefront: &Storefront, book_id: &str) -> Result<(), CommandError> {
    let id = parse_book_id(book_id)?;

    add_breadcrumb("cart", "Remove book", Some(&[("book_id", id.as_str())]));
    match check_outcome(storefront.cart().remove(&id).await)? {
        CartOutcome::Applied => println!("Removed {id}"),
        _ => println!("{id} is not in the cart"),
    }
    print_totals(storefront);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart update fails.
#[allow(clippy::print_stdout)]
pub async fn clear(storefront: &Storefront) -> Result<(), CommandError> {
    add_breadcrumb("cart", "Clear cart", None);
    match check_outcome(storefront.cart().clear().await)? {
        CartOutcome::Applied => println!("Cart cleared"),
        _ => println!("Cart is already empty"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_totals(storefront: &Storefront) {
    let cart = storefront.cart();
    println!(
        "Cart: {} item(s), {}",
        cart.total_items(),
        format_price(cart.total_price(), storefront.config().currency)
    );
}

fn render(cart: &CartState, currency: CurrencyCode) -> String {
    use std::fmt::Write;

    if cart.is_empty() {
        return "Your cart is empty\n".to_string();
    }

    let mut out = String::new();
    for line in cart.lines() {
        let _ = writeln!(
            out,
            "{:>3} x {:<40} {:>14}",
            line.quantity.get(),
            line.title,
            format_price(line.line_total(), currency)
        );
        if line.effective_unit_price() < line.unit_price {
            let _ = writeln!(
                out,
                "      {} each (was {})",
                format_price(line.effective_unit_price(), currency),
                format_price(line.unit_price, currency)
            );
        }
    }
    let _ = writeln!(
        out,
        "Total: {} item(s), {}",
        cart.total_items(),
        format_price(cart.total_price(), currency)
    );
    out
}

#[cfg(test)]
mod tests {
    use bookstore_core::{BookId, Quantity};
    use bookstore_storefront::cart::CartLine;
    use rust_decimal::Decimal;

    use super::*;

    fn line(id: &str, quantity: u32, price: i64, discounted: Option<i64>) -> CartLine {
        CartLine {
            product_id: BookId::new(id),
            title: format!("Book {id}"),
            author: String::new(),
            unit_price: Decimal::from(price),
            discounted_unit_price: discounted.map(Decimal::from),
            image: None,
            quantity: Quantity::new(quantity).unwrap_or(Quantity::ONE),
            server_line_id: None,
        }
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render(&CartState::new(), CurrencyCode::VND), "Your cart is empty\n");
    }

    #[test]
    fn test_render_totals_and_discounts() {
        let cart: CartState = [
            line("b1", 3, 100_000, Some(80_000)),
            line("b2", 2, 50_000, None),
        ]
        .into_iter()
        .collect();

        let out = render(&cart, CurrencyCode::VND);
        assert!(out.contains("240.000 ₫"));
        assert!(out.contains("80.000 ₫ each (was 100.000 ₫)"));
        assert!(out.ends_with("Total: 5 item(s), 340.000 ₫\n"));
        assert_eq!(out.matches("each").count(), 1);
    }
}
