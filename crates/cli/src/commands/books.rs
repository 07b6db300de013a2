//! Catalog commands.

use bookstore_core::BookId;
use bookstore_storefront::Storefront;
use bookstore_storefront::api::Book;

use super::{CommandError, format_price};

/// Print a single book.
///
/// # Errors
///
/// Returns an error if the book cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn show(storefront: &Storefront, book_id: &str) -> Result<(), CommandError> {
    let id = parse_book_id(book_id)?;
    let book = storefront.client().get_book(&id).await?;
    let currency = storefront.config().currency;

    println!("{}", book.title);
    if !book.author.is_empty() {
        println!("  by {}", book.author);
    }
    println!("  ID:    {}", book.id);
    match book.discounted_price {
        Some(discounted) if discounted < book.price => println!(
            "  Price: {} (was {})",
            format_price(discounted, currency),
            format_price(book.price, currency)
        ),
        _ => println!("  Price: {}", format_price(book.price, currency)),
    }
    if let Some(image) = &book.image {
        println!("  Cover: {image}");
    }
    Ok(())
}

/// Print one page of the catalog.
///
/// # Errors
///
/// Returns an error if the page cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn list(storefront: &Storefront, page: u32) -> Result<(), CommandError> {
    let listing = storefront.client().list_books(page.max(1)).await?;
    let currency = storefront.config().currency;

    if listing.items.is_empty() {
        println!("No books on page {page}");
        return Ok(());
    }

    for book in &listing.items {
        println!("{}", summary_line(book, currency));
    }
    if listing.total_pages > 0 {
        println!("Page {} of {}", listing.page, listing.total_pages);
    }
    Ok(())
}

/// Parse a book ID argument.
pub(super) fn parse_book_id(raw: &str) -> Result<BookId, CommandError> {
    let id = BookId::new(raw.trim());
    if id.is_blank() {
        return Err(CommandError::EmptyBookId);
    }
    Ok(id)
}

fn summary_line(book: &Book, currency: bookstore_core::CurrencyCode) -> String {
    format!(
        "{:<10} {} - {} ({})",
        book.id.as_str(),
        book.title,
        book.author,
        format_price(book.effective_price(), currency)
    )
}
