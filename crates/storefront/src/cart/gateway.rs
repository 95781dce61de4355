//! Remote cart gateway: the five cart operations the synchronizer depends on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopfront_core::{CartId, CartLineId};
use thiserror::Error;
use utoipa::ToSchema;

use crate::shopify::types::{Cart, CartLineInput, CartLineUpdateInput, CartUserError};
use crate::shopify::{ShopifyError, StorefrontClient};

/// A field-level rejection reported by the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Dotted input path (e.g., `lines.0.quantity`), empty when not field-specific.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl From<CartUserError> for FieldError {
    fn from(err: CartUserError) -> Self {
        Self {
            field: err.field.map(|f| f.join(".")).unwrap_or_default(),
            message: err.message,
        }
    }
}

/// Failure of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure, timeout, non-2xx status or an unreadable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform rejected the mutation.
    #[error("rejected: {}", .0.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; "))]
    Domain(Vec<FieldError>),

    /// The cart ID no longer resolves upstream.
    #[error("cart not found")]
    NotFound,
}

impl From<ShopifyError> for GatewayError {
    fn from(err: ShopifyError) -> Self {
        match err {
            ShopifyError::UserError(errors) if errors.iter().any(CartUserError::is_invalid_cart) => {
                Self::NotFound
            }
            ShopifyError::UserError(errors) => {
                Self::Domain(errors.into_iter().map(FieldError::from).collect())
            }
            ShopifyError::NotFound(_) => Self::NotFound,
            other @ (ShopifyError::Http(_)
            | ShopifyError::Status { .. }
            | ShopifyError::GraphQL(_)
            | ShopifyError::Parse(_)
            | ShopifyError::RateLimited(_)) => Self::Transport(other.to_string()),
        }
    }
}

/// Remote cart operations.
///
/// Every call may suspend on network I/O. Implementations own timeouts.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Create a cart containing `lines`.
    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, GatewayError>;

    /// Add lines to an existing cart. The platform merges same-variant lines.
    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, GatewayError>;

    /// Set line quantities.
    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, GatewayError>;

    /// Remove lines by ID.
    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, GatewayError>;

    /// Fetch a cart. `Ok(None)` means the ID no longer resolves, which is not an error.
    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, GatewayError>;
}

#[async_trait]
impl CartGateway for StorefrontClient {
    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, GatewayError> {
        Ok(Self::create_cart(self, lines).await?)
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, GatewayError> {
        Ok(self.add_to_cart(cart_id, lines).await?)
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, GatewayError> {
        Ok(self.update_cart(cart_id, lines).await?)
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, GatewayError> {
        Ok(self.remove_from_cart(cart_id, line_ids).await?)
    }

    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, GatewayError> {
        Ok(Self::get_cart(self, cart_id).await?)
    }
}

/// A shared gateway, e.g. one client behind several sessions.
#[async_trait]
impl<G: CartGateway + ?Sized> CartGateway for Arc<G> {
    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, GatewayError> {
        (**self).create_cart(lines).await
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, GatewayError> {
        (**self).add_lines(cart_id, lines).await
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, GatewayError> {
        (**self).update_lines(cart_id, lines).await
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, GatewayError> {
        (**self).remove_lines(cart_id, line_ids).await
    }

    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, GatewayError> {
        (**self).get_cart(cart_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_error(field: &[&str], message: &str) -> CartUserError {
        CartUserError {
            code: Some("INVALID".to_string()),
            field: Some(field.iter().map(ToString::to_string).collect()),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_invalid_cart_user_error_maps_to_not_found() {
        let err = ShopifyError::UserError(vec![user_error(
            &["cartId"],
            "The specified cart does not exist.",
        )]);
        assert_eq!(GatewayError::from(err), GatewayError::NotFound);
    }

    #[test]
    fn test_line_user_error_maps_to_domain() {
        let err = ShopifyError::UserError(vec![user_error(
            &["lines", "0", "merchandiseId"],
            "The merchandise is sold out.",
        )]);
        assert_eq!(
            GatewayError::from(err),
            GatewayError::Domain(vec![FieldError {
                field: "lines.0.merchandiseId".to_string(),
                message: "The merchandise is sold out.".to_string(),
            }])
        );
    }

    #[test]
    fn test_status_and_rate_limit_map_to_transport() {
        let err = ShopifyError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(matches!(GatewayError::from(err), GatewayError::Transport(m) if m.contains("502")));
        assert!(matches!(
            GatewayError::from(ShopifyError::RateLimited(3)),
            GatewayError::Transport(_)
        ));
    }

    #[test]
    fn test_domain_error_display_joins_messages() {
        let err = GatewayError::Domain(vec![
            FieldError {
                field: "lines.0".to_string(),
                message: "Sold out".to_string(),
            },
            FieldError {
                field: String::new(),
                message: "Try again".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "rejected: Sold out; Try again");
    }
}
