//! Cart route handlers.
//!
//! Thin JSON proxy over the Storefront cart mutations. Every response is the
//! [`CartView`] projection of the cart Shopify returned.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use shopfront_core::{CartId, CartLineId, MerchandiseId};
use tracing::instrument;
use utoipa::ToSchema;

use crate::cart::{CartGateway, CartView};
use crate::error::{AppError, ErrorBody, Result};
use crate::shopify::types::{CartLineInput, CartLineUpdateInput};
use crate::state::AppState;

/// A line to add.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
    #[schema(value_type = String, example = "gid://shopify/ProductVariant/1")]
    pub merchandise_id: MerchandiseId,
    #[schema(minimum = 1)]
    pub quantity: i64,
}

/// A line quantity to set. Zero removes the line.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LineUpdate {
    #[schema(value_type = String, example = "gid://shopify/CartLine/1")]
    pub id: CartLineId,
    #[schema(minimum = 0)]
    pub quantity: i64,
}

/// Body of `POST /cart` and `POST /cart/{id}/lines`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddLinesRequest {
    #[serde(default)]
    pub lines: Vec<LineInput>,
}

/// Body of `PUT /cart/{id}/lines`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLinesRequest {
    pub lines: Vec<LineUpdate>,
}

fn require_id(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{what} is required")));
    }
    Ok(())
}

fn validate_add(lines: Vec<LineInput>) -> Result<Vec<CartLineInput>> {
    lines
        .into_iter()
        .map(|line| {
            require_id(line.merchandise_id.as_str(), "merchandiseId")?;
            if line.quantity < 1 {
                return Err(AppError::BadRequest(
                    "quantity must be at least 1".to_string(),
                ));
            }
            Ok(CartLineInput {
                merchandise_id: line.merchandise_id,
                quantity: line.quantity,
            })
        })
        .collect()
}

fn validate_update(lines: Vec<LineUpdate>) -> Result<Vec<CartLineUpdateInput>> {
    lines
        .into_iter()
        .map(|line| {
            require_id(line.id.as_str(), "line id")?;
            // Zero removes the line upstream
            if line.quantity < 0 {
                return Err(AppError::BadRequest(
                    "quantity must not be negative".to_string(),
                ));
            }
            Ok(CartLineUpdateInput {
                id: line.id,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Create a cart.
///
/// POST /cart
#[utoipa::path(
    post,
    path = "/cart",
    tag = "cart",
    request_body = AddLinesRequest,
    responses(
        (status = 201, description = "Cart created", body = CartView),
        (status = 400, description = "Invalid lines", body = ErrorBody),
        (status = 422, description = "Lines rejected by Shopify", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<AddLinesRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let lines = validate_add(body.lines)?;
    let cart = CartGateway::create_cart(state.storefront(), lines).await?;
    Ok((StatusCode::CREATED, Json(CartView::project(&cart)?)))
}

/// Fetch a cart.
///
/// GET /cart/{id}
#[utoipa::path(
    get,
    path = "/cart/{id}",
    tag = "cart",
    params(("id" = String, Path, description = "Cart ID, percent-encoded")),
    responses(
        (status = 200, description = "Current cart", body = CartView),
        (status = 404, description = "Cart expired or unknown", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
#[instrument(skip(state), fields(cart_id = %cart_id))]
pub async fn show(
    State(state): State<AppState>,
    Path(cart_id): Path<CartId>,
) -> Result<Json<CartView>> {
    require_id(cart_id.as_str(), "cart id")?;
    let cart = CartGateway::get_cart(state.storefront(), &cart_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("cart {cart_id}")))?;
    Ok(Json(CartView::project(&cart)?))
}

/// Add lines to a cart.
///
/// POST /cart/{id}/lines
#[utoipa::path(
    post,
    path = "/cart/{id}/lines",
    tag = "cart",
    params(("id" = String, Path, description = "Cart ID, percent-encoded")),
    request_body = AddLinesRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 400, description = "Invalid lines", body = ErrorBody),
        (status = 404, description = "Cart expired or unknown", body = ErrorBody),
        (status = 422, description = "Lines rejected by Shopify", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
#[instrument(skip(state, body), fields(cart_id = %cart_id))]
pub async fn add_lines(
    State(state): State<AppState>,
    Path(cart_id): Path<CartId>,
    Json(body): Json<AddLinesRequest>,
) -> Result<Json<CartView>> {
    require_id(cart_id.as_str(), "cart id")?;
    let lines = validate_add(body.lines)?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("lines must not be empty".to_string()));
    }
    let cart = state.storefront().add_lines(&cart_id, lines).await?;
    Ok(Json(CartView::project(&cart)?))
}

/// Set line quantities.
///
/// PUT /cart/{id}/lines
#[utoipa::path(
    put,
    path = "/cart/{id}/lines",
    tag = "cart",
    params(("id" = String, Path, description = "Cart ID, percent-encoded")),
    request_body = UpdateLinesRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartView),
        (status = 400, description = "Invalid lines", body = ErrorBody),
        (status = 404, description = "Cart expired or unknown", body = ErrorBody),
        (status = 422, description = "Lines rejected by Shopify", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
#[instrument(skip(state, body), fields(cart_id = %cart_id))]
pub async fn update_lines(
    State(state): State<AppState>,
    Path(cart_id): Path<CartId>,
    Json(body): Json<UpdateLinesRequest>,
) -> Result<Json<CartView>> {
    require_id(cart_id.as_str(), "cart id")?;
    let lines = validate_update(body.lines)?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("lines must not be empty".to_string()));
    }
    let cart = state.storefront().update_lines(&cart_id, lines).await?;
    Ok(Json(CartView::project(&cart)?))
}

/// Remove a line.
///
/// DELETE /cart/{id}/lines/{line_id}
#[utoipa::path(
    delete,
    path = "/cart/{id}/lines/{line_id}",
    tag = "cart",
    params(
        ("id" = String, Path, description = "Cart ID, percent-encoded"),
        ("line_id" = String, Path, description = "Cart line ID, percent-encoded"),
    ),
    responses(
        (status = 200, description = "Remaining cart", body = CartView),
        (status = 404, description = "Cart expired or unknown", body = ErrorBody),
        (status = 502, description = "Shopify unavailable", body = ErrorBody),
    )
)]
#[instrument(skip(state), fields(cart_id = %cart_id, line_id = %line_id))]
pub async fn remove_line(
    State(state): State<AppState>,
    Path((cart_id, line_id)): Path<(CartId, CartLineId)>,
) -> Result<Json<CartView>> {
    require_id(cart_id.as_str(), "cart id")?;
    require_id(line_id.as_str(), "line id")?;
    let cart = state
        .storefront()
        .remove_lines(&cart_id, vec![line_id])
        .await?;
    Ok(Json(CartView::project(&cart)?))
}
