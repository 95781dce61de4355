//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::{ShopifyError, StorefrontClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storefront: StorefrontClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(shopify: &ShopifyStorefrontConfig) -> Result<Self, ShopifyError> {
        let storefront = StorefrontClient::new(shopify)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { storefront }),
        })
    }

    /// Get a reference to the Shopify Storefront API client.
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }
}
