//! Integration tests for `StorefrontClient` against a mock Storefront API.
//!
//! Each test stands up a `wiremock` server and points the client at it with
//! `endpoint_override`, so no real network traffic is made.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;
use shopfront::cart::{AddItem, CartError, CartGateway, CartSynchronizer, GatewayError, MemoryHandleStore};
use shopfront::shopify::types::{CartLineInput, CartLineUpdateInput};
use shopfront::shopify::{ShopifyError, StorefrontClient};
use shopfront_core::{CartId, CartLineId, MerchandiseId};
use shopfront_integration_tests::{
    cart_json, mutation_json, product_json, storefront_config, user_errors_json,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "shpat_integration_test_token_9f3k";

async fn client_for(server: &MockServer) -> StorefrontClient {
    let config = storefront_config(&format!("{}/graphql.json", server.uri()));
    StorefrontClient::new(&config).unwrap()
}

/// Mount a 200 response for the named GraphQL operation.
async fn respond(server: &MockServer, operation: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .and(body_partial_json(json!({ "operationName": operation })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn lines(merchandise_id: &str, quantity: i64) -> Vec<CartLineInput> {
    vec![CartLineInput {
        merchandise_id: MerchandiseId::new(merchandise_id),
        quantity,
    }]
}

// =============================================================================
// Request shape
// =============================================================================

#[tokio::test]
async fn create_cart_sends_private_token_and_variables() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .and(header("Shopify-Storefront-Private-Token", TOKEN))
        .and(body_partial_json(json!({
            "operationName": "CreateCart",
            "variables": { "input": { "lines": [
                { "merchandiseId": "gid://shopify/ProductVariant/1", "quantity": 2 }
            ] } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mutation_json(
            "cartCreate",
            cart_json(
                "gid://shopify/Cart/c1?key=k",
                &[("gid://shopify/CartLine/1", "gid://shopify/ProductVariant/1", 2, "12.50")],
            ),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let cart = client_for(&server)
        .await
        .create_cart(lines("gid://shopify/ProductVariant/1", 2))
        .await
        .unwrap();

    assert_eq!(cart.id, CartId::new("gid://shopify/Cart/c1?key=k"));
    assert_eq!(cart.total_quantity, 2);
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].cost.amount_per_quantity.amount, "12.50");
    assert_eq!(cart.lines[0].merchandise.product.title, "Pineapple Soap");
}

// =============================================================================
// Cart reads and mutations
// =============================================================================

#[tokio::test]
async fn get_cart_returns_none_for_unknown_cart() {
    let server = MockServer::start().await;
    respond(&server, "GetCart", json!({ "data": { "cart": null } })).await;

    let cart = client_for(&server)
        .await
        .get_cart(&CartId::new("gid://shopify/Cart/gone"))
        .await
        .unwrap();

    assert!(cart.is_none());
}

#[tokio::test]
async fn update_and_remove_return_the_whole_cart() {
    let server = MockServer::start().await;
    respond(
        &server,
        "UpdateCartLines",
        mutation_json(
            "cartLinesUpdate",
            cart_json("c1", &[("L1", "V1", 5, "1.00"), ("L2", "V2", 1, "2.00")]),
        ),
    )
    .await;
    respond(
        &server,
        "RemoveCartLines",
        mutation_json("cartLinesRemove", cart_json("c1", &[("L1", "V1", 5, "1.00")])),
    )
    .await;
    let client = client_for(&server).await;
    let cart_id = CartId::new("c1");

    let updated = client
        .update_cart(
            &cart_id,
            vec![CartLineUpdateInput {
                id: CartLineId::new("L1"),
                quantity: 5,
            }],
        )
        .await
        .unwrap();
    assert_eq!(updated.lines.len(), 2);

    let removed = client
        .remove_from_cart(&cart_id, vec![CartLineId::new("L2")])
        .await
        .unwrap();
    assert_eq!(removed.lines.len(), 1);
    assert_eq!(removed.lines[0].id, CartLineId::new("L1"));
}

#[tokio::test]
async fn long_carts_are_fetched_page_by_page() {
    let server = MockServer::start().await;
    let mut first = cart_json("c1", &[("L1", "V1", 1, "1.00")]);
    first["totalQuantity"] = json!(3);
    first["lines"]["pageInfo"] = json!({ "hasNextPage": true, "endCursor": "after-L1" });
    respond(
        &server,
        "UpdateCartLines",
        mutation_json("cartLinesUpdate", first),
    )
    .await;

    let mut rest = cart_json("c1", &[("L2", "V2", 2, "2.00")])["lines"].clone();
    rest["pageInfo"] = json!({ "hasNextPage": false, "endCursor": "after-L2" });
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "operationName": "GetCartLines",
            "variables": { "cartId": "c1", "after": "after-L1" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "cart": { "lines": rest } } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cart = client_for(&server)
        .await
        .update_cart(
            &CartId::new("c1"),
            vec![CartLineUpdateInput {
                id: CartLineId::new("L1"),
                quantity: 1,
            }],
        )
        .await
        .unwrap();

    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.lines[0].id, CartLineId::new("L1"));
    assert_eq!(cart.lines[1].id, CartLineId::new("L2"));
}

#[tokio::test]
async fn cart_vanishing_between_line_pages_is_not_found() {
    let server = MockServer::start().await;
    let mut first = cart_json("c1", &[("L1", "V1", 1, "1.00")]);
    first["lines"]["pageInfo"] = json!({ "hasNextPage": true, "endCursor": "after-L1" });
    respond(&server, "GetCart", json!({ "data": { "cart": first } })).await;
    respond(&server, "GetCartLines", json!({ "data": { "cart": null } })).await;

    let err = CartGateway::get_cart(&client_for(&server).await, &CartId::new("c1"))
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::NotFound);
}

#[tokio::test]
async fn line_user_errors_become_domain_errors() {
    let server = MockServer::start().await;
    respond(
        &server,
        "AddCartLines",
        user_errors_json(
            "cartLinesAdd",
            &[(&["lines", "0", "merchandiseId"], "The merchandise is sold out.")],
        ),
    )
    .await;
    let client = client_for(&server).await;

    let err = CartGateway::add_lines(&client, &CartId::new("c1"), lines("V1", 1))
        .await
        .unwrap_err();

    let GatewayError::Domain(fields) = err else {
        panic!("expected domain error, got {err:?}");
    };
    assert_eq!(fields[0].field, "lines.0.merchandiseId");
    assert_eq!(fields[0].message, "The merchandise is sold out.");
}

#[tokio::test]
async fn invalid_cart_user_error_is_not_found() {
    let server = MockServer::start().await;
    respond(
        &server,
        "AddCartLines",
        user_errors_json(
            "cartLinesAdd",
            &[(&["cartId"], "The specified cart does not exist.")],
        ),
    )
    .await;
    let client = client_for(&server).await;

    let err = CartGateway::add_lines(&client, &CartId::new("gone"), lines("V1", 1))
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::NotFound);
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn too_many_requests_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .get_cart(&CartId::new("c1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ShopifyError::RateLimited(7)), "got {err:?}");
}

#[tokio::test]
async fn server_error_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let err = client.create_cart(lines("V1", 1)).await.unwrap_err();
    assert!(
        matches!(err, ShopifyError::Status { status: 500, ref body } if body == "upstream exploded")
    );

    let err = CartGateway::create_cart(&client, lines("V1", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(ref m) if m.contains("500")));
}

#[tokio::test]
async fn graphql_errors_are_reported() {
    let server = MockServer::start().await;
    respond(
        &server,
        "GetCart",
        json!({ "errors": [{ "message": "Throttled" }] }),
    )
    .await;

    let err = client_for(&server)
        .await
        .get_cart(&CartId::new("c1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "GraphQL errors: Throttled");
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn products_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "GetProductByHandle" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "product": product_json("pineapple-soap", "8.00") }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let first = client.get_product_by_handle("pineapple-soap").await.unwrap();
    let second = client.get_product_by_handle("pineapple-soap").await.unwrap();

    assert_eq!(first.handle, "pineapple-soap");
    assert_eq!(first.min_price.amount, "8.00");
    assert_eq!(first.variants.len(), 1);
    assert_eq!(second.id, first.id);
}

#[tokio::test]
async fn invalidate_all_forces_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "GetProducts" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "products": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "edges": []
            } }
        })))
        .expect(2)
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    client.get_products(10, None).await.unwrap();
    client.get_products(10, None).await.unwrap();
    client.invalidate_all().await;
    client.get_products(10, None).await.unwrap();
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let server = MockServer::start().await;
    respond(&server, "GetProductByHandle", json!({ "data": { "product": null } })).await;

    let err = client_for(&server)
        .await
        .get_product_by_handle("nope")
        .await
        .unwrap_err();

    assert!(matches!(err, ShopifyError::NotFound(_)));
}

#[tokio::test]
async fn product_page_carries_cursor() {
    let server = MockServer::start().await;
    respond(
        &server,
        "GetProducts",
        json!({ "data": { "products": {
            "pageInfo": { "hasNextPage": true, "endCursor": "abc" },
            "edges": [{ "node": product_json("pineapple-soap", "8.00") }]
        } } }),
    )
    .await;

    let page = client_for(&server)
        .await
        .get_products(1, None)
        .await
        .unwrap();

    assert_eq!(page.products.len(), 1);
    assert!(page.page_info.has_next_page);
    assert_eq!(page.page_info.end_cursor.as_deref(), Some("abc"));
}

// =============================================================================
// Synchronizer over HTTP
// =============================================================================

#[tokio::test]
async fn synchronizer_creates_cart_over_http() {
    let server = MockServer::start().await;
    respond(
        &server,
        "CreateCart",
        mutation_json(
            "cartCreate",
            cart_json("gid://shopify/Cart/c9?key=z", &[("L1", "V1", 1, "4.25")]),
        ),
    )
    .await;
    let sync = CartSynchronizer::new(client_for(&server).await, MemoryHandleStore::new());

    let view = sync.add_item(AddItem::new("V1")).await.unwrap();

    assert_eq!(view.cart_id, Some(CartId::new("gid://shopify/Cart/c9?key=z")));
    assert_eq!(view.items[0].display.product_title, "Pineapple Soap");
    assert_eq!(view.subtotal_display(), "$4.25");
    assert_eq!(
        view.checkout_url.as_deref(),
        Some("https://test.myshopify.com/cart/c/abc")
    );
}

#[tokio::test]
async fn synchronizer_surfaces_unreachable_platform() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let sync = CartSynchronizer::new(client_for(&server).await, MemoryHandleStore::new());

    let err = sync.add_item(AddItem::new("V1")).await.unwrap_err();

    assert!(matches!(err, CartError::Transport(_)));
    assert!(sync.store().raw().is_none());
}
