//! Signed-in cart synchronization and auth transitions against a mock API.

#![allow(clippy::unwrap_used)]

use bookstore_core::BookId;
use bookstore_integration_tests::{TestContext, book_json, cart_item_json};
use bookstore_storefront::cart::CartOutcome;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mock_cart(ctx: &TestContext, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "items": items })))
        .mount(&ctx.server)
        .await;
}

#[tokio::test]
async fn test_login_discards_guest_cart_and_fetches_once() {
    let ctx = TestContext::new().await;
    ctx.mock_book(book_json("guest", 10_000, None)).await;
    ctx.mock_login("fresh-token").await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [cart_item_json(11, 2, book_json("b9", 20_000, None))]
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let storefront = ctx.storefront().await;
    let book = storefront.client().get_book(&BookId::new("guest")).await.unwrap();
    storefront.cart().add(&book, 1).await;

    storefront
        .login("reader@example.com", SecretString::from("secret"))
        .await
        .unwrap();

    let cart = storefront.cart().snapshot();
    assert!(cart.get(&BookId::new("guest")).is_none());
    assert_eq!(cart.total_items(), 2);
    assert_eq!(storefront.cart().total_price(), Decimal::from(40_000));
}

#[tokio::test]
async fn test_restart_with_token_loads_remote_cart() {
    let ctx = TestContext::new().await;
    ctx.seed_token("saved-token");
    ctx.seed_cart(r#"[{"productId": "stale", "price": 1, "quantity": 9}]"#);
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", "Bearer saved-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                cart_item_json(1, 1, book_json("b1", 30_000, Some(25_000))),
                cart_item_json(2, 0, book_json("b2", 10_000, None))
            ]
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let storefront = ctx.storefront().await;

    let cart = storefront.cart().snapshot();
    assert_eq!(cart.len(), 1);
    assert_eq!(storefront.cart().total_price(), Decimal::from(25_000));
    // The remote cart replaces the stored one
    assert_eq!(ctx.stored_cart().unwrap()[0]["productId"], "b1");
}

#[tokio::test]
async fn test_signed_in_add_posts_then_refetches() {
    let ctx = TestContext::new().await;
    ctx.seed_token("t");
    ctx.mock_book(book_json("b1", 50_000, None)).await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .and(body_json(json!({ "bookId": "b1", "quantity": 2 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&ctx.server)
        .await;
    mock_cart(&ctx, json!([cart_item_json(5, 2, book_json("b1", 50_000, None))])).await;

    let storefront = ctx.storefront().await;
    let book = storefront.client().get_book(&BookId::new("b1")).await.unwrap();
    assert_eq!(storefront.cart().add(&book, 2).await, CartOutcome::Applied);

    assert_eq!(
        ctx.requests().await,
        vec!["GET /cart", "GET /books/b1", "POST /cart/items", "GET /cart"]
    );
    assert_eq!(storefront.cart().total_items(), 2);
}

#[tokio::test]
async fn test_signed_in_update_to_zero_deletes_line() {
    let ctx = TestContext::new().await;
    ctx.seed_token("t");
    Mock::given(method("DELETE"))
        .and(path("/cart/items/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [cart_item_json(5, 3, book_json("b1", 50_000, None))]
        })))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    mock_cart(&ctx, json!([])).await;

    let storefront = ctx.storefront().await;
    assert_eq!(storefront.cart().total_items(), 3);

    let outcome = storefront
        .cart()
        .update_quantity(&BookId::new("b1"), 0)
        .await;
    assert_eq!(outcome, CartOutcome::Applied);
    assert!(storefront.cart().snapshot().is_empty());
    assert_eq!(
        ctx.requests().await,
        vec!["GET /cart", "DELETE /cart/items/5", "GET /cart"]
    );
}

#[tokio::test]
async fn test_signed_in_update_sends_patch() {
    let ctx = TestContext::new().await;
    ctx.seed_token("t");
    Mock::given(method("PATCH"))
        .and(path("/cart/items/5"))
        .and(body_json(json!({ "quantity": 4 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&ctx.server)
        .await;
    mock_cart(&ctx, json!([cart_item_json(5, 1, book_json("b1", 50_000, None))])).await;

    let storefront = ctx.storefront().await;
    let outcome = storefront
        .cart()
        .update_quantity(&BookId::new("b1"), 4)
        .await;
    assert_eq!(outcome, CartOutcome::Applied);
}

#[tokio::test]
async fn test_server_error_keeps_cart() {
    let ctx = TestContext::new().await;
    ctx.seed_token("t");
    mock_cart(&ctx, json!([cart_item_json(5, 2, book_json("b1", 50_000, None))])).await;
    Mock::given(method("DELETE"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let storefront = ctx.storefront().await;
    let before = storefront.cart().snapshot();

    assert_eq!(storefront.cart().clear().await, CartOutcome::Failed);
    assert_eq!(storefront.cart().snapshot(), before);
}

#[tokio::test]
async fn test_logout_falls_back_to_last_seen_cart_without_api_calls() {
    let ctx = TestContext::new().await;
    ctx.seed_token("t");
    mock_cart(&ctx, json!([cart_item_json(5, 2, book_json("b1", 50_000, None))])).await;

    let storefront = ctx.storefront().await;
    let calls_before = ctx.requests().await.len();

    storefront.logout().await.unwrap();

    assert_eq!(ctx.requests().await.len(), calls_before);
    let cart = storefront.cart().snapshot();
    assert_eq!(cart.total_items(), 2);
    assert_eq!(cart.get(&BookId::new("b1")).unwrap().server_line_id, None);

    // Guest edits now stay local
    assert_eq!(
        storefront.cart().update_quantity(&BookId::new("b1"), 1).await,
        CartOutcome::Applied
    );
    assert_eq!(ctx.requests().await.len(), calls_before);
}

#[tokio::test]
async fn test_rejected_token_keeps_previous_cart() {
    let ctx = TestContext::new().await;
    ctx.seed_token("expired");
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "token expired" })))
        .mount(&ctx.server)
        .await;

    let storefront = ctx.storefront().await;
    assert!(storefront.cart().snapshot().is_empty());
    assert!(storefront.session().is_authenticated());
}
