//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_synchronizer` - Synchronizer behaviour against an in-memory shop
//! - `storefront_client` - GraphQL gateway against a mock HTTP server
//! - `proxy_routes` - REST proxy routes against a mock HTTP server
//!
//! No test talks to a real Shopify store.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use shopfront::cart::{CartGateway, GatewayError};
use shopfront::config::ShopifyStorefrontConfig;
use shopfront::shopify::types::{
    Cart, CartCost, CartLine, CartLineCost, CartLineInput, CartLineUpdateInput, CartMerchandise,
    CartMerchandiseProduct, Money,
};
use shopfront_core::{CartId, CartLineId, MerchandiseId, Price, ProductId};
use tokio::sync::Semaphore;

// =============================================================================
// In-memory shop
// =============================================================================

/// A gateway call, as the shop saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(Vec<CartLineInput>),
    Add(CartId, Vec<CartLineInput>),
    Update(CartId, Vec<CartLineUpdateInput>),
    Remove(CartId, Vec<CartLineId>),
    Get(CartId),
}

impl Call {
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

#[derive(Debug, Default)]
struct Shop {
    carts: HashMap<CartId, Vec<CartLine>>,
    prices: HashMap<MerchandiseId, String>,
    next_cart: u32,
    next_line: u32,
    calls: Vec<Call>,
    failures: VecDeque<GatewayError>,
}

impl Shop {
    fn price_of(&self, merchandise_id: &MerchandiseId) -> String {
        self.prices
            .get(merchandise_id)
            .cloned()
            .unwrap_or_else(|| "10.00".to_string())
    }

    fn snapshot(&self, cart_id: &CartId) -> Option<Cart> {
        self.carts
            .get(cart_id)
            .map(|lines| cart(cart_id.as_str(), lines.clone()))
    }

    /// Add lines the way Shopify does: same merchandise merges into one line.
    fn add(&mut self, cart_id: &CartId, inputs: &[CartLineInput]) -> Result<Cart, GatewayError> {
        let mut new_lines = Vec::new();
        for input in inputs {
            self.next_line += 1;
            let id = format!("gid://shopify/CartLine/{}", self.next_line);
            new_lines.push((id, input.clone(), self.price_of(&input.merchandise_id)));
        }

        let lines = self.carts.get_mut(cart_id).ok_or(GatewayError::NotFound)?;
        for (id, input, price) in new_lines {
            if let Some(existing) = lines
                .iter_mut()
                .find(|l| l.merchandise.id == input.merchandise_id)
            {
                existing.quantity += input.quantity;
            } else {
                lines.push(line(
                    &id,
                    input.merchandise_id.as_str(),
                    input.quantity,
                    &price,
                ));
            }
        }
        self.snapshot(cart_id).ok_or(GatewayError::NotFound)
    }
}

/// A fake commerce platform implementing [`CartGateway`] in memory.
///
/// Merges same-variant lines, drops zero-quantity lines, forgets expired
/// carts and records every call. Failures can be queued with
/// [`FakeShop::fail_next`]. A gated shop holds every call until
/// [`FakeShop::release`] hands out permits.
#[derive(Debug, Default)]
pub struct FakeShop {
    shop: Mutex<Shop>,
    gate: Option<Semaphore>,
}

impl FakeShop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A shop whose calls block until released.
    #[must_use]
    pub fn gated() -> Self {
        Self {
            shop: Mutex::default(),
            gate: Some(Semaphore::new(0)),
        }
    }

    /// Let `n` held calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Set a variant's unit price.
    #[must_use]
    pub fn with_price(self, merchandise_id: &str, amount: &str) -> Self {
        self.lock()
            .prices
            .insert(MerchandiseId::new(merchandise_id), amount.to_string());
        self
    }

    /// Seed an existing cart.
    pub fn seed_cart(&self, cart_id: &str, lines: Vec<CartLine>) {
        self.lock().carts.insert(CartId::new(cart_id), lines);
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: GatewayError) {
        self.lock().failures.push_back(err);
    }

    /// Drop a cart, as Shopify does when a cart expires.
    pub fn expire(&self, cart_id: &CartId) {
        self.lock().carts.remove(cart_id);
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of create-cart calls received.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_create()).count()
    }

    /// Current contents of a cart.
    #[must_use]
    pub fn cart(&self, cart_id: &CartId) -> Option<Cart> {
        self.lock().snapshot(cart_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shop> {
        self.shop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, wait for the gate, then pop any queued failure.
    async fn enter(&self, call: Call) -> Result<(), GatewayError> {
        self.lock().calls.push(call);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.lock().failures.pop_front().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl CartGateway for FakeShop {
    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, GatewayError> {
        self.enter(Call::Create(lines.clone())).await?;
        let mut shop = self.lock();
        shop.next_cart += 1;
        let n = shop.next_cart;
        let cart_id = CartId::new(format!("gid://shopify/Cart/{n}?key=k{n}"));
        shop.carts.insert(cart_id.clone(), Vec::new());
        shop.add(&cart_id, &lines)
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, GatewayError> {
        self.enter(Call::Add(cart_id.clone(), lines.clone())).await?;
        self.lock().add(cart_id, &lines)
    }

    async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, GatewayError> {
        self.enter(Call::Update(cart_id.clone(), lines.clone()))
            .await?;
        let mut shop = self.lock();
        let cart_lines = shop.carts.get_mut(cart_id).ok_or(GatewayError::NotFound)?;
        for update in &lines {
            let line = cart_lines
                .iter_mut()
                .find(|l| l.id == update.id)
                .ok_or_else(|| line_not_found(&update.id))?;
            line.quantity = update.quantity;
        }
        cart_lines.retain(|l| l.quantity > 0);
        shop.snapshot(cart_id).ok_or(GatewayError::NotFound)
    }

    async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, GatewayError> {
        self.enter(Call::Remove(cart_id.clone(), line_ids.clone()))
            .await?;
        let mut shop = self.lock();
        let cart_lines = shop.carts.get_mut(cart_id).ok_or(GatewayError::NotFound)?;
        if let Some(missing) = line_ids
            .iter()
            .find(|id| !cart_lines.iter().any(|l| &l.id == *id))
        {
            return Err(line_not_found(missing));
        }
        cart_lines.retain(|l| !line_ids.contains(&l.id));
        shop.snapshot(cart_id).ok_or(GatewayError::NotFound)
    }

    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, GatewayError> {
        self.enter(Call::Get(cart_id.clone())).await?;
        Ok(self.lock().snapshot(cart_id))
    }
}

fn line_not_found(line_id: &CartLineId) -> GatewayError {
    GatewayError::Domain(vec![shopfront::cart::FieldError {
        field: "lines".to_string(),
        message: format!("The merchandise line with id {line_id} does not exist."),
    }])
}

// =============================================================================
// Fixtures
// =============================================================================

fn money(amount: &str) -> Money {
    Money {
        amount: amount.to_string(),
        currency_code: "USD".to_string(),
    }
}

/// A cart line for variant `merchandise_id` at `unit_price` USD.
#[must_use]
pub fn line(line_id: &str, merchandise_id: &str, quantity: i64, unit_price: &str) -> CartLine {
    let total = Price::parse(unit_price, "USD")
        .and_then(|p| p.times(u32::try_from(quantity).unwrap_or(0)))
        .map_or_else(|_| unit_price.to_string(), |p| p.amount.to_string());
    CartLine {
        id: CartLineId::new(line_id),
        quantity,
        cost: CartLineCost {
            amount_per_quantity: money(unit_price),
            total_amount: money(&total),
        },
        merchandise: CartMerchandise {
            id: MerchandiseId::new(merchandise_id),
            title: "Default Title".to_string(),
            price: money(unit_price),
            image: None,
            product: CartMerchandiseProduct {
                id: ProductId::new(format!("gid://shopify/Product/{merchandise_id}")),
                handle: merchandise_id.to_lowercase(),
                title: format!("Product {merchandise_id}"),
            },
        },
    }
}

/// A cart holding `lines`.
#[must_use]
pub fn cart(cart_id: &str, lines: Vec<CartLine>) -> Cart {
    Cart {
        id: CartId::new(cart_id),
        checkout_url: format!("https://shop.example/checkout?cart={cart_id}"),
        total_quantity: lines.iter().map(|l| l.quantity).sum(),
        cost: CartCost {
            subtotal: money("0.00"),
            total: money("0.00"),
        },
        lines,
    }
}

/// Storefront configuration pointing at `endpoint` (usually a mock server).
#[must_use]
pub fn storefront_config(endpoint: &str) -> ShopifyStorefrontConfig {
    ShopifyStorefrontConfig {
        store: "test.myshopify.com".to_string(),
        api_version: "2026-01".to_string(),
        storefront_private_token: SecretString::from("shpat_integration_test_token_9f3k"),
        endpoint_override: Some(endpoint.to_string()),
        timeout: Duration::from_secs(5),
    }
}

// =============================================================================
// Storefront API JSON fixtures
// =============================================================================

/// A `CartFields` JSON object. Lines are `(line_id, merchandise_id, quantity, unit_price)`.
#[must_use]
pub fn cart_json(cart_id: &str, lines: &[(&str, &str, i64, &str)]) -> Value {
    let edges: Vec<Value> = lines
        .iter()
        .map(|(line_id, merchandise_id, quantity, price)| {
            json!({
                "node": {
                    "id": line_id,
                    "quantity": quantity,
                    "cost": {
                        "amountPerQuantity": { "amount": price, "currencyCode": "USD" },
                        "totalAmount": { "amount": price, "currencyCode": "USD" }
                    },
                    "merchandise": {
                        "id": merchandise_id,
                        "title": "Default Title",
                        "price": { "amount": price, "currencyCode": "USD" },
                        "image": { "url": format!("https://cdn.shopify.com/{merchandise_id}.jpg"), "altText": null },
                        "product": {
                            "id": format!("gid://shopify/Product/{merchandise_id}"),
                            "handle": "pineapple-soap",
                            "title": "Pineapple Soap"
                        }
                    }
                }
            })
        })
        .collect();

    json!({
        "id": cart_id,
        "checkoutUrl": "https://test.myshopify.com/cart/c/abc",
        "totalQuantity": lines.iter().map(|l| l.2).sum::<i64>(),
        "cost": {
            "subtotalAmount": { "amount": "0.00", "currencyCode": "USD" },
            "totalAmount": { "amount": "0.00", "currencyCode": "USD" }
        },
        "lines": { "edges": edges }
    })
}

/// A successful mutation response for `field` (e.g. `cartLinesAdd`).
#[must_use]
pub fn mutation_json(field: &str, cart: Value) -> Value {
    let mut data = Map::new();
    data.insert(field.to_string(), json!({ "cart": cart, "userErrors": [] }));
    json!({ "data": data })
}

/// A mutation response carrying user errors and no cart.
#[must_use]
pub fn user_errors_json(field: &str, errors: &[(&[&str], &str)]) -> Value {
    let errors: Vec<Value> = errors
        .iter()
        .map(|(path, message)| json!({ "code": "INVALID", "field": path, "message": message }))
        .collect();
    let mut data = Map::new();
    data.insert(field.to_string(), json!({ "cart": null, "userErrors": errors }));
    json!({ "data": data })
}

/// A product JSON object matching `ProductFields`.
#[must_use]
pub fn product_json(handle: &str, price: &str) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{handle}"),
        "handle": handle,
        "title": "Pineapple Soap",
        "description": "Smells like summer.",
        "availableForSale": true,
        "featuredImage": null,
        "priceRange": { "minVariantPrice": { "amount": price, "currencyCode": "USD" } },
        "variants": { "edges": [{
            "node": {
                "id": format!("gid://shopify/ProductVariant/{handle}"),
                "title": "Default Title",
                "availableForSale": true,
                "price": { "amount": price, "currencyCode": "USD" }
            }
        }] }
    })
}
