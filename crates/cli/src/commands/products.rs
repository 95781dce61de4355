//! Catalog commands.

use std::io::Write;

use shopfront::config::ShopifyStorefrontConfig;
use shopfront::shopify::StorefrontClient;
use shopfront::shopify::types::{Money, Product, ProductConnection};

use super::{CliError, Output};

fn client() -> Result<StorefrontClient, CliError> {
    let config = ShopifyStorefrontConfig::from_env()?;
    Ok(StorefrontClient::new(&config)?)
}

/// Print a page of products.
///
/// # Errors
///
/// Returns `CliError` if the request fails.
pub async fn list(first: i64, after: Option<String>, output: Output) -> Result<(), CliError> {
    let page = client()?.get_products(first, after).await?;
    output.emit(&page, render_page)
}

/// Print one product with its variants.
///
/// # Errors
///
/// Returns `CliError` if the product doesn't exist or the request fails.
pub async fn show(handle: &str, output: Output) -> Result<(), CliError> {
    let product = client()?.get_product_by_handle(handle).await?;
    output.emit(&product, render_product)
}

fn money(money: &Money) -> String {
    money.to_price().map_or_else(
        |_| format!("{} {}", money.amount, money.currency_code),
        |price| price.display(),
    )
}

/// Render a product page as one line per product.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn render_page(page: &ProductConnection, out: &mut dyn Write) -> std::io::Result<()> {
    for product in &page.products {
        let stock = if product.available_for_sale { "" } else { "  (sold out)" };
        writeln!(
            out,
            "{:<32} {:>10}  {}{stock}",
            product.handle,
            money(&product.min_price),
            product.title,
        )?;
    }
    if page.page_info.has_next_page
        && let Some(cursor) = &page.page_info.end_cursor
    {
        writeln!(out, "More: --after {cursor}")?;
    }
    Ok(())
}

/// Render a product and its variants.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn render_product(product: &Product, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{} ({})", product.title, product.handle)?;
    if !product.description.is_empty() {
        writeln!(out, "{}", product.description)?;
    }
    for variant in &product.variants {
        let stock = if variant.available_for_sale { "" } else { "  (sold out)" };
        writeln!(
            out,
            "  {:<24} {:>10}  {}{stock}",
            variant.title,
            money(&variant.price),
            variant.id,
        )?;
    }
    Ok(())
}
