//! Bookstore REST API client implementation.
//!
//! Uses `reqwest` with JSON bodies and a fixed per-request timeout.
//! Caches books and catalog pages using `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookstore_core::{BookId, CartLineId};
use moka::future::Cache;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::cache::CacheValue;
use super::types::{
    AddCartLine, Book, BookPage, LoginRequest, LoginResponse, RemoteCart, UpdateCartLine,
};
use super::{ApiError, CartApi};
use crate::auth::AuthSession;
use crate::config::ApiConfig;

// =============================================================================
// BookstoreClient
// =============================================================================

/// Client for the bookstore REST API.
///
/// Cheap to clone. Attaches the session's bearer token to every request
/// made while signed in.
#[derive(Clone)]
pub struct BookstoreClient {
    inner: Arc<BookstoreClientInner>,
}

struct BookstoreClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<AuthSession>,
    cache: Cache<String, CacheValue>,
}

impl BookstoreClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig, session: Arc<AuthSession>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("bookstore-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(BookstoreClientInner {
                http,
                base_url: config.base_url.clone(),
                session,
                cache,
            }),
        })
    }

    /// Build the URL for a route given as path segments.
    ///
    /// Segments are percent-encoded, so IDs can never escape their route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the response body.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let request = match self.inner.session.bearer() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Bookstore API returned non-success status"
            );
            return Err(ApiError::from_status(status, &body));
        }

        Ok(body)
    }

    /// Send a request and parse a JSON response.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse bookstore API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn send_body<B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send(self.inner.http.request(method, url).json(body))
            .await
            .map(drop)
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get a book by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the book is not found or the API request fails.
    #[instrument(skip(self), fields(book_id = %id))]
    pub async fn get_book(&self, id: &BookId) -> Result<Book, ApiError> {
        let cache_key = format!("book:{id}");

        if let Some(CacheValue::Book(book)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for book");
            return Ok(*book);
        }

        let url = self.endpoint(&["books", id.as_str()])?;
        let book: Book = self.send_json(self.inner.http.get(url)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Book(Box::new(book.clone())))
            .await;

        Ok(book)
    }

    /// Get a page of the catalog (1-indexed).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_books(&self, page: u32) -> Result<BookPage, ApiError> {
        let page = page.max(1);
        let cache_key = format!("books:{page}");

        if let Some(CacheValue::Books(books)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for books");
            return Ok(books);
        }

        let mut url = self.endpoint(&["books"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());
        let books: BookPage = self.send_json(self.inner.http.get(url)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Books(books.clone()))
            .await;

        Ok(books)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// Does not store the token; pass it to
    /// [`AuthSession::set_token`](crate::auth::AuthSession::set_token).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for rejected credentials, or another
    /// error if the request fails.
    #[instrument(skip(self, request), fields(email = %request.email()))]
    pub async fn login(&self, request: &LoginRequest) -> Result<SecretString, ApiError> {
        #[derive(Serialize)]
        struct LoginBody<'a> {
            email: &'a str,
            password: &'a str,
        }

        let body = LoginBody {
            email: request.email().as_str(),
            password: request.password().expose_secret(),
        };

        let url = self.endpoint(&["auth", "login"])?;
        let response: LoginResponse = self
            .send_json(self.inner.http.post(url).json(&body))
            .await?;

        if response.token.trim().is_empty() {
            return Err(ApiError::Unauthorized("empty token in login response".to_string()));
        }
        Ok(SecretString::from(response.token))
    }
}

// =============================================================================
// Cart Methods (not cached - mutable state)
// =============================================================================

#[async_trait]
impl CartApi for BookstoreClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<RemoteCart, ApiError> {
        let url = self.endpoint(&["cart"])?;
        self.send_json(self.inner.http.get(url)).await
    }

    #[instrument(skip(self, line), fields(book_id = %line.book_id(), quantity = %line.quantity()))]
    async fn add_line(&self, line: &AddCartLine) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "items"])?;
        self.send_body(reqwest::Method::POST, url, line).await
    }

    #[instrument(skip(self, update), fields(line_id = %line_id, quantity = %update.quantity()))]
    async fn update_line(
        &self,
        line_id: &CartLineId,
        update: &UpdateCartLine,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "items", line_id.as_str()])?;
        self.send_body(reqwest::Method::PATCH, url, update).await
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_line(&self, line_id: &CartLineId) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "items", line_id.as_str()])?;
        self.send(self.inner.http.delete(url)).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart"])?;
        self.send(self.inner.http.delete(url)).await.map(drop)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::Quantity;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::storage::MemoryStore;

    async fn setup(token: Option<&str>) -> (BookstoreClient, MockServer) {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(AuthSession::new(store));
        if let Some(token) = token {
            session.set_token(SecretString::from(token)).await.unwrap();
        }

        let config = ApiConfig::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let client = BookstoreClient::new(&config, session).unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_fetch_cart_sends_bearer_token() {
        let (client, server) = setup(Some("reader-token")).await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .and(header("Authorization", "Bearer reader-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "c1",
                "items": [{"id": 5, "quantity": 2, "book": {"id": "b1", "price": 50000}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cart = client.fetch_cart().await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].id, CartLineId::new("5"));
    }

    #[tokio::test]
    async fn test_guest_requests_have_no_authorization() {
        let (client, server) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/books/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "b1"})))
            .mount(&server)
            .await;

        client.get_book(&BookId::new("b1")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("Authorization").is_none());
    }

    #[tokio::test]
    async fn test_add_line_posts_typed_body() {
        let (client, server) = setup(Some("t")).await;
        Mock::given(method("POST"))
            .and(path("/cart/items"))
            .and(body_json(json!({"bookId": "b1", "quantity": 2})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let line = AddCartLine::new(BookId::new("b1"), 2).unwrap();
        client.add_line(&line).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_remove_use_line_id() {
        let (client, server) = setup(Some("t")).await;
        Mock::given(method("PATCH"))
            .and(path("/cart/items/42"))
            .and(body_json(json!({"quantity": 4})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/cart/items/42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let line_id = CartLineId::new("42");
        client
            .update_line(&line_id, &UpdateCartLine::from(Quantity::new(4).unwrap()))
            .await
            .unwrap();
        client.remove_line(&line_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_ids_are_path_encoded() {
        let (client, server) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/books/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a/b"})))
            .expect(1)
            .mount(&server)
            .await;

        let book = client.get_book(&BookId::new("a/b")).await.unwrap();
        assert_eq!(book.id, BookId::new("a/b"));
    }

    #[tokio::test]
    async fn test_error_statuses_are_mapped() {
        let (client, server) = setup(Some("expired")).await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/cart"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client.fetch_cart().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Unauthorized: token expired");

        let err = client.clear_cart().await.unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let (client, server) = setup(Some("t")).await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert!(matches!(
            client.fetch_cart().await,
            Err(ApiError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_books_are_cached() {
        let (client, server) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/books/b1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "b1", "title": "Cho tôi xin một vé đi tuổi thơ", "price": 60000})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let first = client.get_book(&BookId::new("b1")).await.unwrap();
        let second = client.get_book(&BookId::new("b1")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.price, Decimal::from(60_000));
    }

    #[tokio::test]
    async fn test_list_books_sends_page() {
        let (client, server) = setup(None).await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "b3"}],
                "page": 2,
                "totalPages": 5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client.list_books(2).await.unwrap();
        assert_eq!(page.total_pages, 5);
        assert_eq!(page.items[0].id, BookId::new("b3"));
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let (client, server) = setup(None).await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "reader@example.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;

        let request =
            LoginRequest::new("reader@example.com", SecretString::from("pw")).unwrap();
        let token = client.login(&request).await.unwrap();
        assert_eq!(token.expose_secret(), "fresh");
    }
}
