//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{AppError, ErrorBody, Result};
use crate::shopify::types::{Product, ProductConnection};
use crate::state::AppState;

/// Largest page the Storefront API serves.
const MAX_PAGE_SIZE: i64 = 250;
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Pagination query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Page size, 1 to 250 (default 20).
    pub first: Option<i64>,
    /// `endCursor` of the previous page.
    pub after: Option<String>,
}

/// List products.
///
/// GET /products?first=&after=
#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    params(PaginationQuery),
    responses(
        (status = 200, description = "One page of products", body = ProductConnection),
        (status = 400, description = "Page size out of range", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ProductConnection>> {
    let first = query.first.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&first) {
        return Err(AppError::BadRequest(format!(
            "first must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let after = query.after.filter(|c| !c.is_empty());

    Ok(Json(state.storefront().get_products(first, after).await?))
}

/// Show a product.
///
/// GET /products/{handle}
#[utoipa::path(
    get,
    path = "/products/{handle}",
    tag = "products",
    params(("handle" = String, Path, description = "Product URL handle")),
    responses(
        (status = 200, description = "Product detail", body = Product),
        (status = 404, description = "No product with this handle", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Product>> {
    if handle.trim().is_empty() {
        return Err(AppError::BadRequest("handle is required".to_string()));
    }
    Ok(Json(state.storefront().get_product_by_handle(&handle).await?))
}
