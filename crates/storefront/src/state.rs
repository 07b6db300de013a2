//! Storefront state shared across commands.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument};

use crate::api::{BookstoreClient, LoginRequest};
use crate::auth::{AuthSession, SubscriptionId};
use crate::cart::CartManager;
use crate::config::ClientConfig;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::storage::{FileStore, KeyValueStore};

/// The wired-up storefront: session, API client, and cart.
///
/// This struct is cheaply cloneable via `Arc`. The cart manager is subscribed
/// to the session for as long as any clone is alive.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    session: Arc<AuthSession>,
    client: BookstoreClient,
    cart: Arc<CartManager>,
    subscription: SubscriptionId,
}

impl Drop for StorefrontInner {
    fn drop(&mut self) {
        self.session.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Wire up a storefront over `store`.
    ///
    /// Restores any persisted token but does not load the cart; call
    /// [`Storefront::start`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = Arc::new(AuthSession::restore(Arc::clone(&store))?);
        let client = BookstoreClient::new(&config.api, Arc::clone(&session))?;
        let cart = Arc::new(CartManager::new(
            store,
            Arc::new(client.clone()),
            Arc::clone(&session),
        ));
        let subscription = cart.attach();

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                session,
                client,
                cart,
                subscription,
            }),
        })
    }

    /// Wire up a storefront over the file store in `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or read.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let store = FileStore::open(&config.state_dir)?;
        Self::new(config, Arc::new(store))
    }

    /// Load the cart for the current auth state.
    pub async fn start(&self) {
        self.inner.cart.load().await;
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the auth session.
    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    /// Get a reference to the bookstore API client.
    #[must_use]
    pub fn client(&self) -> &BookstoreClient {
        &self.inner.client
    }

    /// Get a reference to the cart manager.
    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    /// Sign in and switch the cart to the customer's remote cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are malformed or rejected, or the
    /// token cannot be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<()> {
        let request = LoginRequest::new(email, password)?;
        let token = self.inner.client.login(&request).await?;
        self.inner.session.set_token(token).await?;

        set_sentry_user(request.email().as_str());
        add_breadcrumb("auth", "Signed in", None);
        info!(email = %request.email(), "Customer signed in");
        Ok(())
    }

    /// Sign out and fall back to the locally persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted token cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.inner.session.clear_token().await?;
        self.inner.client.invalidate_all().await;

        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        Ok(())
    }
}
