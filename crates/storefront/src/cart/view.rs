//! Flat view model derived from a remote cart.
//!
//! A [`CartView`] is recomputed wholesale from every cart Shopify returns;
//! nothing in it is patched incrementally.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopfront_core::{CartId, CartLineId, CurrencyCode, MerchandiseId, Price, PriceError};
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

use crate::shopify::types::{Cart, CartLine};

/// Shopify's title for the only variant of a product without options.
const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// A cart response that cannot be projected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("line {line_id}: {source}")]
    Price {
        line_id: CartLineId,
        #[source]
        source: PriceError,
    },
    #[error("cart mixes currencies: {0}")]
    MixedCurrency(#[source] PriceError),
    #[error("cart subtotal out of range")]
    SubtotalOverflow,
}

/// Display metadata copied from the remote response (or from the caller, for
/// optimistic previews). Never validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMeta {
    pub product_title: String,
    pub product_handle: String,
    pub variant_title: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
}

/// One line of the cart view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[schema(value_type = String)]
    pub line_id: CartLineId,
    #[schema(value_type = String)]
    pub merchandise_id: MerchandiseId,
    /// Always positive; non-positive lines do not exist.
    pub quantity: u32,
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "USD")]
    pub currency_code: CurrencyCode,
    /// `unit_price × quantity`.
    #[schema(value_type = String)]
    pub line_total: Decimal,
    #[serde(flatten)]
    pub display: DisplayMeta,
}

impl LineItem {
    fn project(line: &CartLine) -> Result<Option<Self>, ViewError> {
        let Some(quantity) = u32::try_from(line.quantity).ok().filter(|q| *q > 0) else {
            warn!(line_id = %line.id, quantity = line.quantity, "Dropping cart line with invalid quantity");
            return Ok(None);
        };

        let unit: Price = line
            .cost
            .amount_per_quantity
            .to_price()
            .map_err(|source| ViewError::Price {
                line_id: line.id.clone(),
                source,
            })?;

        let line_total = unit.times(quantity).map_err(|source| ViewError::Price {
            line_id: line.id.clone(),
            source,
        })?;

        let merch = &line.merchandise;
        Ok(Some(Self {
            line_id: line.id.clone(),
            merchandise_id: merch.id.clone(),
            quantity,
            unit_price: unit.amount,
            currency_code: unit.currency_code,
            line_total: line_total.amount,
            display: DisplayMeta {
                product_title: merch.product.title.clone(),
                product_handle: merch.product.handle.clone(),
                variant_title: (merch.title != DEFAULT_VARIANT_TITLE).then(|| merch.title.clone()),
                image_url: merch.image.as_ref().map(|i| i.url.clone()),
                image_alt: merch.image.as_ref().and_then(|i| i.alt_text.clone()),
            },
        }))
    }
}

/// The cart as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[schema(value_type = Option<String>)]
    pub cart_id: Option<CartId>,
    pub checkout_url: Option<String>,
    /// Remote order, preserved.
    pub items: Vec<LineItem>,
    pub item_count: u32,
    #[schema(value_type = String, example = "20.00")]
    pub subtotal: Decimal,
    /// First line's currency; `USD` for an empty cart.
    #[schema(value_type = String, example = "USD")]
    pub currency_code: CurrencyCode,
}

impl Default for CartView {
    fn default() -> Self {
        Self::empty()
    }
}

impl CartView {
    /// No cart at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            checkout_url: None,
            items: Vec::new(),
            item_count: 0,
            subtotal: Decimal::ZERO,
            currency_code: CurrencyCode::default(),
        }
    }

    /// A known handle whose contents have not been fetched yet.
    #[must_use]
    pub fn placeholder(cart_id: CartId) -> Self {
        Self {
            cart_id: Some(cart_id),
            ..Self::empty()
        }
    }

    /// Project a remote cart into a view.
    ///
    /// # Errors
    ///
    /// Returns `ViewError` if a line price is malformed or out of range, or if
    /// lines disagree on currency.
    pub fn project(cart: &Cart) -> Result<Self, ViewError> {
        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            if let Some(item) = LineItem::project(line)? {
                items.push(item);
            }
        }

        let currency_code = items
            .first()
            .map_or_else(CurrencyCode::default, |i| i.currency_code);

        let mut subtotal = Price::zero(currency_code);
        for item in &items {
            subtotal = subtotal
                .checked_add(&Price::new(item.line_total, item.currency_code))
                .map_err(|err| match err {
                    PriceError::Overflow => ViewError::SubtotalOverflow,
                    other => ViewError::MixedCurrency(other),
                })?;
        }

        Ok(Self {
            cart_id: Some(cart.id.clone()),
            checkout_url: Some(cart.checkout_url.clone()),
            item_count: items.iter().fold(0u32, |n, i| n.saturating_add(i.quantity)),
            subtotal: subtotal.amount,
            currency_code,
            items,
        })
    }

    /// Whether the view has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Subtotal formatted for display (e.g., "$20.00").
    #[must_use]
    pub fn subtotal_display(&self) -> String {
        Price::new(self.subtotal, self.currency_code).display()
    }
}
