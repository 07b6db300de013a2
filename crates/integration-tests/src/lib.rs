//! Integration tests for the bookstore storefront client.
//!
//! Each test gets a [`TestContext`]: a mock bookstore API, a temporary state
//! directory, and a [`Storefront`] wired to both through the real
//! file-backed store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookstore-integration-tests
//! ```

use std::time::Duration;

use bookstore_core::CurrencyCode;
use bookstore_storefront::Storefront;
use bookstore_storefront::config::{ApiConfig, ClientConfig};
use bookstore_storefront::storage::{FileStore, KeyValueStore, keys};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A mock API plus a storefront pointed at it.
pub struct TestContext {
    pub server: MockServer,
    pub state_dir: TempDir,
}

impl TestContext {
    /// Start a mock API with an empty state directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            state_dir: tempfile::tempdir().expect("Failed to create state dir"),
        }
    }

    /// Client configuration pointing at the mock API and state directory.
    ///
    /// # Panics
    ///
    /// Panics if the mock server URI is not a valid base URL.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api: ApiConfig::new(&self.server.uri(), Duration::from_secs(5))
                .expect("Mock server URI is a valid base URL"),
            state_dir: self.state_dir.path().to_path_buf(),
            currency: CurrencyCode::VND,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Open a storefront over the state directory and load its cart.
    ///
    /// Opening twice simulates restarting the app.
    ///
    /// # Panics
    ///
    /// Panics if the state directory cannot be opened.
    pub async fn storefront(&self) -> Storefront {
        let storefront = Storefront::open(self.config()).expect("Failed to open storefront");
        storefront.start().await;
        storefront
    }

    /// Persist a token as if a previous run had signed in.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be written.
    pub fn seed_token(&self, token: &str) {
        self.store()
            .set(keys::AUTH_TOKEN, token)
            .expect("Failed to seed token");
    }

    /// Write raw cart JSON as if a previous run had saved it.
    ///
    /// # Panics
    ///
    /// Panics if the cart cannot be written.
    pub fn seed_cart(&self, raw: &str) {
        self.store()
            .set(keys::CART, raw)
            .expect("Failed to seed cart");
    }

    /// The raw persisted cart, if any.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be read.
    #[must_use]
    pub fn stored_cart(&self) -> Option<Value> {
        self.store()
            .get(keys::CART)
            .expect("Failed to read cart")
            .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::Null))
    }

    /// Requests received by the mock API, as `"METHOD /path"` strings.
    ///
    /// # Panics
    ///
    /// Panics if request recording is disabled.
    pub async fn requests(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .expect("Request recording is enabled")
            .iter()
            .map(describe)
            .collect()
    }

    /// Serve `GET /books/{id}`.
    pub async fn mock_book(&self, book: Value) {
        let id = book["id"].as_str().unwrap_or_default().to_string();
        Mock::given(method("GET"))
            .and(path(format!("/books/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(book))
            .mount(&self.server)
            .await;
    }

    /// Serve a successful `POST /auth/login` returning `token`.
    pub async fn mock_login(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
            .mount(&self.server)
            .await;
    }

    fn store(&self) -> FileStore {
        FileStore::open(self.state_dir.path()).expect("Failed to open state dir")
    }
}

/// A catalog book as the API returns it.
#[must_use]
pub fn book_json(id: &str, price: i64, discounted: Option<i64>) -> Value {
    json!({
        "id": id,
        "title": format!("Book {id}"),
        "author": { "name": "Nguyễn Nhật Ánh" },
        "price": price,
        "discountedPrice": discounted,
        "image": format!("covers/{id}.jpg"),
    })
}

/// A remote cart line.
#[must_use]
pub fn cart_item_json(line_id: i64, quantity: i64, book: Value) -> Value {
    json!({ "id": line_id, "quantity": quantity, "book": book })
}

fn describe(request: &Request) -> String {
    format!("{} {}", request.method, request.url.path())
}
