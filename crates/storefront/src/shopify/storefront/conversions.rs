//! Conversions from raw GraphQL response shapes to domain types.
//!
//! Flattens `lines.edges[].node.merchandise.product` into [`CartLine`] and
//! `variants.edges[].node` into [`ProductVariant`].

use tracing::warn;

use crate::shopify::types::{
    Cart, CartCost, CartLine, CartLineCost, CartMerchandise, CartMerchandiseProduct, PageInfo,
    Product, ProductConnection, ProductVariant,
};

use super::queries::{CartFields, CartLineFields, ProductConnectionFields, ProductFields};

pub fn convert_cart(cart: CartFields) -> Cart {
    let lines: Vec<CartLine> = cart
        .lines
        .into_nodes()
        .filter_map(convert_cart_line)
        .collect();

    Cart {
        id: cart.id,
        checkout_url: cart.checkout_url,
        total_quantity: cart.total_quantity,
        cost: CartCost {
            subtotal: cart.cost.subtotal_amount,
            total: cart.cost.total_amount,
        },
        lines,
    }
}

fn convert_cart_line(line: CartLineFields) -> Option<CartLine> {
    let merch = line.merchandise;
    let (Some(id), Some(title), Some(price), Some(product)) =
        (merch.id, merch.title, merch.price, merch.product)
    else {
        warn!(line_id = %line.id, "Cart line merchandise is not a ProductVariant; skipping");
        return None;
    };

    Some(CartLine {
        id: line.id,
        quantity: line.quantity,
        cost: CartLineCost {
            amount_per_quantity: line.cost.amount_per_quantity,
            total_amount: line.cost.total_amount,
        },
        merchandise: CartMerchandise {
            id,
            title,
            price,
            image: merch.image,
            product: CartMerchandiseProduct {
                id: product.id,
                handle: product.handle,
                title: product.title,
            },
        },
    })
}

pub fn convert_product(product: ProductFields) -> Product {
    Product {
        id: product.id,
        handle: product.handle,
        title: product.title,
        description: product.description,
        available_for_sale: product.available_for_sale,
        featured_image: product.featured_image,
        min_price: product.price_range.min_variant_price,
        variants: product
            .variants
            .into_nodes()
            .map(|v| ProductVariant {
                id: v.id,
                title: v.title,
                available_for_sale: v.available_for_sale,
                price: v.price,
            })
            .collect(),
    }
}

pub fn convert_product_connection(connection: ProductConnectionFields) -> ProductConnection {
    ProductConnection {
        products: connection
            .edges
            .into_iter()
            .map(|e| convert_product(e.node))
            .collect(),
        page_info: PageInfo {
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        },
    }
}
