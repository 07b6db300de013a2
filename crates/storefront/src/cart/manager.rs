//! The cart state manager.
//!
//! Guest carts are mutated locally. Signed-in carts are mutated through the
//! API and then re-fetched, because the server decides how lines merge and
//! what they cost. Either way the resulting cart is mirrored to storage, so
//! a later sign-out falls back to the most recent cart the customer saw.
//!
//! Every failure is logged here and reported as [`CartOutcome::Failed`];
//! the in-memory cart is never left partially updated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bookstore_core::{BookId, CartLineId, Quantity};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use super::{CartLine, CartState, snapshot};
use crate::api::{AddCartLine, ApiError, Book, CartApi, UpdateCartLine};
use crate::auth::{AuthChange, AuthObserver, AuthSession, SubscriptionId};
use crate::storage::KeyValueStore;

/// Result of a cart mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOutcome {
    /// The cart changed (or was re-fetched after a successful remote write).
    Applied,
    /// Nothing to do: unknown product, invalid quantity, or no server line.
    Unchanged,
    /// A remote call failed; the previous cart is kept.
    Failed,
}

impl CartOutcome {
    /// Whether the operation failed.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Single source of truth for the shopping cart.
pub struct CartManager {
    state: Mutex<CartState>,
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn CartApi>,
    session: Arc<AuthSession>,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("state", &*self.lock())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl CartManager {
    /// Create a manager with an empty cart.
    ///
    /// Call [`CartManager::load`] to hydrate it and [`CartManager::attach`]
    /// to follow sign-in and sign-out.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn CartApi>,
        session: Arc<AuthSession>,
    ) -> Self {
        Self {
            state: Mutex::new(CartState::new()),
            store,
            api,
            session,
        }
    }

    /// Subscribe this manager to the session's auth changes.
    pub fn attach(self: &Arc<Self>) -> SubscriptionId {
        self.session.subscribe(self)
    }

    /// A copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.lock().clone()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lock().total_items()
    }

    /// Sum of line totals, preferring discounted prices.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lock().total_price()
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Hydrate the cart from the API (signed in) or storage (guest).
    ///
    /// Never fails: errors are logged and the previous cart is kept. A guest
    /// with nothing usable in storage gets an empty cart.
    #[instrument(skip(self), fields(authenticated = self.session.is_authenticated()))]
    pub async fn load(&self) {
        if self.session.is_authenticated() {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Failed to load remote cart");
            }
            return;
        }

        match snapshot::load(self.store.as_ref()) {
            Ok(stored) => {
                let mut state = stored.unwrap_or_default();
                // Persisted server line IDs belong to a session that has ended
                state.detach_from_server();
                debug!(lines = state.len(), "Loaded guest cart");
                *self.lock() = state;
            }
            Err(e) => warn!(error = %e, "Failed to read persisted cart"),
        }
    }

    /// Fetch the canonical cart and make it current.
    async fn refresh(&self) -> Result<(), ApiError> {
        let remote = self.api.fetch_cart().await?;
        let state = CartState::from(remote);
        debug!(lines = state.len(), "Replaced cart with remote copy");
        self.replace(state);
        Ok(())
    }

    /// Re-fetch after a successful remote write.
    async fn reconcile(&self) -> CartOutcome {
        match self.refresh().await {
            Ok(()) => CartOutcome::Applied,
            Err(e) => {
                warn!(error = %e, "Failed to re-fetch cart after update");
                CartOutcome::Failed
            }
        }
    }

    /// Swap in a new cart and mirror it to storage.
    ///
    /// Storage is written under the state lock so concurrent writers
    /// persist in the same order they update memory.
    fn replace(&self, state: CartState) {
        let mut current = self.lock();
        self.persist(&state);
        *current = state;
    }

    /// Apply a local edit and mirror the result to storage.
    fn edit(&self, f: impl FnOnce(&mut CartState) -> bool) -> CartOutcome {
        let mut state = self.lock();
        if !f(&mut state) {
            return CartOutcome::Unchanged;
        }
        self.persist(&state);
        CartOutcome::Applied
    }

    fn persist(&self, state: &CartState) {
        if let Err(e) = snapshot::save(self.store.as_ref(), state) {
            warn!(error = %e, "Failed to persist cart");
        }
    }

    fn server_line_id(&self, product_id: &BookId) -> Option<CartLineId> {
        self.lock()
            .get(product_id)
            .and_then(|line| line.server_line_id.clone())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` copies of `book`.
    ///
    /// A zero quantity is rejected without touching the cart.
    #[instrument(skip(self, book), fields(book_id = %book.id))]
    pub async fn add(&self, book: &Book, quantity: u32) -> CartOutcome {
        let Some(count) = Quantity::new(quantity) else {
            warn!("Ignoring add with zero quantity");
            return CartOutcome::Unchanged;
        };

        if !self.session.is_authenticated() {
            let line = CartLine::from_book(book, count);
            return self.edit(|state| {
                state.merge(line);
                true
            });
        }

        let request = match AddCartLine::new(book.id.clone(), quantity) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected add request");
                return CartOutcome::Unchanged;
            }
        };

        if let Err(e) = self.api.add_line(&request).await {
            warn!(error = %e, "Failed to add line to remote cart");
            return CartOutcome::Failed;
        }
        self.reconcile().await
    }

    /// Set a product's quantity. Zero or negative removes the line.
    #[instrument(skip(self), fields(book_id = %product_id))]
    pub async fn update_quantity(&self, product_id: &BookId, quantity: i64) -> CartOutcome {
        let Some(count) = Quantity::from_signed(quantity) else {
            return self.remove(product_id).await;
        };

        if !self.session.is_authenticated() {
            return self.edit(|state| state.set_quantity(product_id, count));
        }

        let Some(line_id) = self.server_line_id(product_id) else {
            debug!("No server line for product; skipping update");
            return CartOutcome::Unchanged;
        };

        if let Err(e) = self
            .api
            .update_line(&line_id, &UpdateCartLine::from(count))
            .await
        {
            warn!(error = %e, line_id = %line_id, "Failed to update remote cart line");
            return CartOutcome::Failed;
        }
        self.reconcile().await
    }

    /// Remove a product from the cart.
    #[instrument(skip(self), fields(book_id = %product_id))]
    pub async fn remove(&self, product_id: &BookId) -> CartOutcome {
        if !self.session.is_authenticated() {
            return self.edit(|state| state.remove(product_id));
        }

        let Some(line_id) = self.server_line_id(product_id) else {
            debug!("No server line for product; skipping remove");
            return CartOutcome::Unchanged;
        };

        if let Err(e) = self.api.remove_line(&line_id).await {
            warn!(error = %e, line_id = %line_id, "Failed to remove remote cart line");
            return CartOutcome::Failed;
        }
        self.reconcile().await
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> CartOutcome {
        if !self.session.is_authenticated() {
            return self.edit(|state| {
                let changed = !state.is_empty();
                state.clear();
                changed
            });
        }

        if let Err(e) = self.api.clear_cart().await {
            warn!(error = %e, "Failed to clear remote cart");
            return CartOutcome::Failed;
        }
        self.reconcile().await
    }
}

#[async_trait]
impl AuthObserver for CartManager {
    /// Drop whatever cart belonged to the previous auth state, then reload.
    ///
    /// Signing in does not merge the guest cart into the remote one.
    async fn on_auth_change(&self, change: AuthChange) {
        debug!(?change, "Auth changed; discarding in-memory cart");
        self.lock().clear();
        self.load().await;
    }
}
