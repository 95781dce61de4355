//! HTTP route handlers for the REST proxy.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Health check
//! GET    /openapi.json                - OpenAPI document
//! GET    /swagger-ui/                 - Swagger UI
//!
//! # Products
//! GET    /products                    - Product page (?first=&after=)
//! GET    /products/{handle}           - Product detail
//!
//! # Cart (JSON, responses are CartView)
//! POST   /cart                        - Create cart
//! GET    /cart/{id}                   - Fetch cart (404 if gone)
//! POST   /cart/{id}/lines             - Add lines
//! PUT    /cart/{id}/lines             - Set line quantities
//! DELETE /cart/{id}/lines/{line_id}   - Remove line
//! ```

pub mod cart;
pub mod products;

use std::time::Duration;

use axum::{
    Router,
    http::{Method, Request, Response, header},
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cart::{CartView, DisplayMeta, FieldError, LineItem};
use crate::error::ErrorBody;
use crate::shopify::types::{Image, Money, PageInfo, Product, ProductConnection, ProductVariant};
use crate::state::AppState;

/// OpenAPI description of the proxy.
#[derive(OpenApi)]
#[openapi(
    info(title = "shopfront", description = "REST proxy over the Shopify Storefront API"),
    paths(
        health,
        products::index,
        products::show,
        cart::create,
        cart::show,
        cart::add_lines,
        cart::update_lines,
        cart::remove_line,
    ),
    components(schemas(
        CartView,
        LineItem,
        DisplayMeta,
        ErrorBody,
        FieldError,
        cart::LineInput,
        cart::LineUpdate,
        cart::AddLinesRequest,
        cart::UpdateLinesRequest,
        Product,
        ProductVariant,
        ProductConnection,
        PageInfo,
        Money,
        Image,
    )),
    tags(
        (name = "cart", description = "Cart mutations; every response is the whole cart"),
        (name = "products", description = "Cached catalog reads"),
    )
)]
pub struct ApiDoc;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::create))
        .route("/{id}", get(cart::show))
        .route("/{id}/lines", post(cart::add_lines).put(cart::update_lines))
        .route("/{id}/lines/{line_id}", delete(cart::remove_line))
}

/// Liveness health check.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Alive", body = String)))]
async fn health() -> &'static str {
    "ok"
}

/// Create all routes for the proxy.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
}

/// Build the application: routes, API docs, request tracing and CORS, bound
/// to `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    routes()
        .merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
