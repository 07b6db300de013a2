//! Shopping cart state.
//!
//! A cart is an ordered list of [`CartLine`]s keyed by book ID. The
//! [`CartManager`] owns the live cart and decides whether a change is applied
//! locally (guest) or sent to the API and re-fetched (signed in).

mod manager;
pub mod snapshot;

pub use manager::{CartManager, CartOutcome};

use bookstore_core::{BookId, CartLineId, Quantity};
use rust_decimal::Decimal;

use crate::api::Book;

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Stable external key.
    pub product_id: BookId,
    pub title: String,
    pub author: String,
    /// Regular unit price.
    pub unit_price: Decimal,
    /// Discounted unit price, preferred over `unit_price` when present.
    pub discounted_unit_price: Option<Decimal>,
    /// Cover image reference.
    pub image: Option<String>,
    pub quantity: Quantity,
    /// Server-side line ID; present only for lines backed by a remote record.
    pub server_line_id: Option<CartLineId>,
}

impl CartLine {
    /// Create a local line for `quantity` copies of `book`.
    #[must_use]
    pub fn from_book(book: &Book, quantity: Quantity) -> Self {
        Self {
            product_id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            unit_price: book.price,
            discounted_unit_price: book.discounted_price,
            image: book.image.clone(),
            quantity,
            server_line_id: None,
        }
    }

    /// The price paid for one copy.
    #[must_use]
    pub fn effective_unit_price(&self) -> Decimal {
        self.discounted_unit_price.unwrap_or(self.unit_price)
    }

    /// The price paid for the whole line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.effective_unit_price()
            .saturating_mul(Decimal::from(self.quantity.get()))
    }
}

/// The cart: ordered lines with unique product IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Find the line for a product.
    #[must_use]
    pub fn get(&self, product_id: &BookId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    /// Add a line, summing quantities if the product is already present.
    ///
    /// The existing line keeps its position and metadata.
    pub fn merge(&mut self, line: CartLine) {
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                if existing.server_line_id.is_none() {
                    existing.server_line_id = line.server_line_id;
                }
            }
            None => self.lines.push(line),
        }
    }

    /// Overwrite a line's quantity. Returns `false` if the product is absent.
    pub fn set_quantity(&mut self, product_id: &BookId, quantity: Quantity) -> bool {
        match self
            .lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
        {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a product's line. Returns `false` if the product is absent.
    pub fn remove(&mut self, product_id: &BookId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Drop server line IDs, turning remote-backed lines into guest lines.
    pub fn detach_from_server(&mut self) {
        for line in &mut self.lines {
            line.server_line_id = None;
        }
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of line totals, preferring discounted prices.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |total, line| {
                total.saturating_add(line.line_total())
            })
    }
}

impl FromIterator<CartLine> for CartState {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut state = Self::new();
        for line in iter {
            state.merge(line);
        }
        state
    }
}
