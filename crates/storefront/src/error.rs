//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::cart::{FieldError, GatewayError, ViewError};
use crate::shopify::ShopifyError;

/// Application-level error type for the proxy.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed upstream.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Catalog operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        Self::Gateway(GatewayError::Transport(format!(
            "malformed cart response: {err}"
        )))
    }
}

/// JSON error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Gateway(GatewayError::NotFound)
            | Self::Shopify(ShopifyError::NotFound(_))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Gateway(GatewayError::Domain(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Shopify(ShopifyError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Gateway(GatewayError::Transport(_)) | Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose upstream error details to clients
        let body = match self {
            Self::Gateway(GatewayError::Domain(fields)) => ErrorBody {
                error: "Cart update rejected".to_string(),
                fields,
            },
            Self::Gateway(GatewayError::NotFound) => ErrorBody {
                error: "Cart not found".to_string(),
                fields: Vec::new(),
            },
            Self::Shopify(ShopifyError::NotFound(what)) | Self::NotFound(what) => ErrorBody {
                error: format!("Not found: {what}"),
                fields: Vec::new(),
            },
            Self::Shopify(ShopifyError::RateLimited(_)) => ErrorBody {
                error: "Rate limited".to_string(),
                fields: Vec::new(),
            },
            Self::Gateway(_) | Self::Shopify(_) => ErrorBody {
                error: "External service error".to_string(),
                fields: Vec::new(),
            },
            Self::BadRequest(msg) => ErrorBody {
                error: msg,
                fields: Vec::new(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
