//! Cart commands.
//!
//! Each run restores the stored handle, performs one operation through the
//! synchronizer and prints the resulting cart.
//!
//! # Environment Variables
//!
//! - `SHOPIFY_STORE`, `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API access
//! - `SHOPFRONT_CART_FILE` - Where the cart handle is stored

use std::io::Write;
use std::path::PathBuf;

use shopfront::cart::{AddItem, CartError, CartSynchronizer, CartView, FileHandleStore};
use shopfront::config::ShopifyStorefrontConfig;
use shopfront::shopify::StorefrontClient;
use shopfront_core::{CartLineId, Price};

use super::{CliError, Output};

/// Synchronizer backed by the live Storefront API and a handle file.
pub type Synchronizer = CartSynchronizer<StorefrontClient, FileHandleStore>;

/// Restore the session's cart from `cart_file`.
///
/// # Errors
///
/// Returns `CliError` if configuration is missing or the HTTP client can't be built.
pub async fn open(cart_file: PathBuf) -> Result<Synchronizer, CliError> {
    let config = ShopifyStorefrontConfig::from_env()?;
    let client = StorefrontClient::new(&config)?;
    Ok(CartSynchronizer::restore(client, FileHandleStore::new(cart_file)).await)
}

/// Fetch and print the cart.
///
/// # Errors
///
/// Returns `CliError` if the cart can't be fetched.
pub async fn show(sync: &Synchronizer, output: Output) -> Result<(), CliError> {
    let view = match sync.refresh().await {
        Ok(view) => view,
        Err(CartError::StaleHandle) => {
            tracing::warn!("Stored cart has expired; starting fresh");
            CartView::empty()
        }
        Err(e) => return Err(e.into()),
    };
    output.emit(&view, render_cart)
}

/// Add a variant and print the cart.
///
/// # Errors
///
/// Returns `CliError` if the add is rejected.
pub async fn add(
    sync: &Synchronizer,
    merchandise_id: &str,
    quantity: u32,
    output: Output,
) -> Result<(), CliError> {
    let view = sync
        .add_item(AddItem::new(merchandise_id).quantity(quantity))
        .await?;
    tracing::info!(cart_id = ?view.cart_id, "Added {quantity} × {merchandise_id}");
    report_warning(sync);
    output.emit(&view, render_cart)
}

/// Set a line's quantity and print the cart.
///
/// # Errors
///
/// Returns `CliError` if the update is rejected.
pub async fn update(
    sync: &Synchronizer,
    line_id: &str,
    quantity: i64,
    output: Output,
) -> Result<(), CliError> {
    let view = sync
        .update_quantity(&CartLineId::new(line_id), quantity)
        .await?;
    report_warning(sync);
    output.emit(&view, render_cart)
}

/// Remove a line and print the cart.
///
/// # Errors
///
/// Returns `CliError` if the removal is rejected.
pub async fn remove(sync: &Synchronizer, line_id: &str, output: Output) -> Result<(), CliError> {
    let view = sync.remove_item(&CartLineId::new(line_id)).await?;
    report_warning(sync);
    output.emit(&view, render_cart)
}

/// Forget the stored cart.
///
/// # Errors
///
/// Returns `CliError` if the handle file can't be removed.
pub async fn clear(sync: &Synchronizer) -> Result<(), CliError> {
    sync.clear().await?;
    tracing::info!(path = %sync.store().path().display(), "Cart forgotten");
    Ok(())
}

/// Surface a non-fatal failure left behind by a successful operation.
fn report_warning(sync: &Synchronizer) {
    if let Some(err) = sync.snapshot().last_error {
        tracing::warn!(kind = err.kind(), "{err}");
    }
}

/// Render a cart as a plain-text table.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn render_cart(view: &CartView, out: &mut dyn Write) -> std::io::Result<()> {
    if view.is_empty() {
        return writeln!(out, "Cart is empty");
    }

    let count = view.item_count;
    writeln!(
        out,
        "{count} item{}",
        if count == 1 { "" } else { "s" }
    )?;

    for item in &view.items {
        let title = match &item.display.variant_title {
            Some(variant) => format!("{} ({variant})", item.display.product_title),
            None => item.display.product_title.clone(),
        };
        writeln!(
            out,
            "  {:>3} × {title}  {} each  {}",
            item.quantity,
            Price::new(item.unit_price, item.currency_code).display(),
            Price::new(item.line_total, item.currency_code).display(),
        )?;
        writeln!(out, "        line {}", item.line_id)?;
    }

    writeln!(out, "Subtotal: {}", view.subtotal_display())?;
    if let Some(url) = &view.checkout_url {
        writeln!(out, "Checkout: {url}")?;
    }
    Ok(())
}
