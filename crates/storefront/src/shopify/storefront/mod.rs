//! Shopify Storefront API client implementation.
//!
//! Uses `graphql_client` envelopes with `reqwest` 0.13 for HTTP.
//! Caches products using `moka` (5-minute TTL). Carts are never cached.

mod cache;
mod conversions;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use secrecy::ExposeSecret;
use shopfront_core::{CartId, CartLineId};
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{
    Cart, CartLineInput, CartLineUpdateInput, Product, ProductConnection,
};
use crate::shopify::{GraphQLError, GraphQLErrorLocation, ShopifyError};

use cache::{CacheKey, CacheValue};
use conversions::{convert_cart, convert_product, convert_product_connection};
use queries::{
    AddCartLines, AddCartLinesVariables, CartFields, CartInput, CartMutationPayload, CreateCart,
    CreateCartVariables, GetCart, GetCartLines, GetCartLinesVariables, GetCartVariables,
    GetProductByHandle,
    GetProductByHandleVariables, GetProducts, GetProductsVariables, RemoveCartLines,
    RemoveCartLinesVariables, UpdateCartLines, UpdateCartLinesVariables,
};

/// Upper bound on follow-up line pages for one cart. Shopify caps carts at
/// 500 lines.
const MAX_CART_LINE_PAGES: usize = 10;

/// Maximum characters of an upstream body kept in logs and errors.
const BODY_SNIPPET_CHARS: usize = 500;

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides type-safe access to products and cart operations.
/// Products are cached for 5 minutes.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ShopifyStorefrontConfig) -> Result<Self, ShopifyError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(StorefrontClientInner {
                client,
                endpoint: config.endpoint(),
                access_token: config.storefront_private_token.expose_secret().to_string(),
                cache,
            }),
        })
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %snippet(&response_text),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body: snippet(&response_text),
            });
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %snippet(&response_text),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");

            return Err(ShopifyError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        locations: e.locations.map_or_else(Vec::new, |locs| {
                            locs.into_iter()
                                .map(|l| GraphQLErrorLocation {
                                    line: i64::from(l.line),
                                    column: i64::from(l.column),
                                })
                                .collect()
                        }),
                        path: e.path.map_or_else(Vec::new, |p| {
                            p.into_iter()
                                .map(|fragment| match fragment {
                                    graphql_client::PathFragment::Key(s) => {
                                        serde_json::Value::String(s)
                                    }
                                    graphql_client::PathFragment::Index(i) => {
                                        serde_json::Value::Number(i.into())
                                    }
                                })
                                .collect()
                        }),
                    })
                    .collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %snippet(&response_text),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = CacheKey::Product(handle.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data = self
            .execute::<GetProductByHandle>(GetProductByHandleVariables {
                handle: handle.to_string(),
            })
            .await?;

        let product = data
            .product
            .map(convert_product)
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        first: i64,
        after: Option<String>,
    ) -> Result<ProductConnection, ShopifyError> {
        let cache_key = CacheKey::Products {
            first,
            after: after.clone(),
        };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let data = self
            .execute::<GetProducts>(GetProductsVariables { first, after })
            .await?;

        let connection = convert_product_connection(data.products);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(connection.clone()))
            .await;

        Ok(connection)
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Create a new cart with initial lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart creation fails or user errors are returned.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<CreateCart>(CreateCartVariables {
                input: CartInput { lines },
            })
            .await?;

        self.complete_cart(cart_from_payload(data.cart_create, "cartCreate")?)
            .await
    }

    /// Get an existing cart.
    ///
    /// Returns `Ok(None)` when Shopify no longer recognises the cart ID
    /// (expired, completed, or never existed).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, ShopifyError> {
        let data = self
            .execute::<GetCart>(GetCartVariables {
                cart_id: cart_id.clone(),
            })
            .await?;

        match data.cart {
            Some(cart) => self.complete_cart(cart).await.map(Some),
            None => Ok(None),
        }
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    pub async fn add_to_cart(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<AddCartLines>(AddCartLinesVariables {
                cart_id: cart_id.clone(),
                lines,
            })
            .await?;

        self.complete_cart(cart_from_payload(data.cart_lines_add, "cartLinesAdd")?)
            .await
    }

    /// Update cart line quantities.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    pub async fn update_cart(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<UpdateCartLines>(UpdateCartLinesVariables {
                cart_id: cart_id.clone(),
                lines,
            })
            .await?;

        self.complete_cart(cart_from_payload(data.cart_lines_update, "cartLinesUpdate")?)
            .await
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    pub async fn remove_from_cart(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<RemoveCartLines>(RemoveCartLinesVariables {
                cart_id: cart_id.clone(),
                line_ids,
            })
            .await?;

        self.complete_cart(cart_from_payload(data.cart_lines_remove, "cartLinesRemove")?)
            .await
    }

    /// Fetch any lines past the first page and convert the cart.
    ///
    /// A cart that disappears between pages is reported as not found.
    async fn complete_cart(&self, mut cart: CartFields) -> Result<Cart, ShopifyError> {
        let mut pages = 0;
        while cart.lines.page_info.has_next_page {
            let Some(after) = cart.lines.page_info.end_cursor.take() else {
                return Err(ShopifyError::GraphQL(vec![GraphQLError::message(
                    "cart lines have a next page but no end cursor",
                )]));
            };
            pages += 1;
            if pages > MAX_CART_LINE_PAGES {
                return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                    "cart has more than {MAX_CART_LINE_PAGES} extra pages of lines"
                ))]));
            }

            debug!(cart_id = %cart.id, page = pages, "Fetching next page of cart lines");
            let data = self
                .execute::<GetCartLines>(GetCartLinesVariables {
                    cart_id: cart.id.clone(),
                    after,
                })
                .await?;
            let Some(page) = data.cart else {
                return Err(ShopifyError::NotFound(format!(
                    "cart {} vanished while paging lines",
                    cart.id
                )));
            };

            cart.lines.edges.extend(page.lines.edges);
            cart.lines.page_info = page.lines.page_info;
        }

        Ok(convert_cart(cart))
    }
}

/// Unwrap a cart mutation payload: user errors win, then the cart.
///
/// A payload with neither errors nor a cart means Shopify dropped the cart.
fn cart_from_payload(
    payload: Option<CartMutationPayload>,
    mutation: &str,
) -> Result<CartFields, ShopifyError> {
    let Some(payload) = payload else {
        return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
            "{mutation} returned no payload"
        ))]));
    };

    if !payload.user_errors.is_empty() {
        return Err(ShopifyError::UserError(payload.user_errors));
    }

    payload
        .cart
        .ok_or_else(|| ShopifyError::NotFound(format!("{mutation} returned no cart")))
}
