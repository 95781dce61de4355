//! GraphQL operations for the Shopify Storefront API.
//!
//! Each operation implements `graphql_client::GraphQLQuery` by hand: the
//! document is a string constant and the response is a serde struct mirroring
//! the selection set. Cart operations share the `CartFields` fragment so every
//! mutation returns the full cart.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};
use shopfront_core::{CartId, CartLineId, MerchandiseId, ProductId};

use crate::shopify::types::{CartLineInput, CartLineUpdateInput, CartUserError, Image, Money};

/// Number of cart lines fetched per request. Longer carts are completed with
/// [`GetCartLines`] pages.
pub const CART_LINES_PAGE: i64 = 100;

macro_rules! cart_line_fields {
    () => {
        r"
fragment CartLineFields on BaseCartLine {
  id
  quantity
  cost {
    amountPerQuantity { amount currencyCode }
    totalAmount { amount currencyCode }
  }
  merchandise {
    ... on ProductVariant {
      id
      title
      price { amount currencyCode }
      image { url altText }
      product { id handle title }
    }
  }
}
"
    };
}

macro_rules! cart_fields {
    () => {
        concat!(
            r"
fragment CartFields on Cart {
  id
  checkoutUrl
  totalQuantity
  cost {
    subtotalAmount { amount currencyCode }
    totalAmount { amount currencyCode }
  }
  lines(first: 100) {
    pageInfo { hasNextPage endCursor }
    edges { node { ...CartLineFields } }
  }
}
",
            cart_line_fields!()
        )
    };
}

macro_rules! product_fields {
    () => {
        r"
fragment ProductFields on Product {
  id
  handle
  title
  description
  availableForSale
  featuredImage { url altText }
  priceRange { minVariantPrice { amount currencyCode } }
  variants(first: 50) {
    edges {
      node {
        id
        title
        availableForSale
        price { amount currencyCode }
      }
    }
  }
}
"
    };
}

/// Implements `GraphQLQuery` for a unit struct.
macro_rules! storefront_operation {
    ($name:ident, $operation:literal, $document:expr, $vars:ty, $data:ty) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $vars;
            type ResponseData = $data;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $document,
                    operation_name: $operation,
                }
            }
        }
    };
}

// =============================================================================
// Shared response shapes
// =============================================================================

/// Relay-style connection (`{ edges: [{ node }] }`).
#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|e| e.node)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartFields {
    pub id: CartId,
    pub checkout_url: String,
    pub total_quantity: i64,
    pub cost: CartCostFields,
    pub lines: CartLineConnection,
}

/// One page of cart lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineConnection {
    #[serde(default)]
    pub page_info: PageInfoFields,
    pub edges: Vec<Edge<CartLineFields>>,
}

impl CartLineConnection {
    pub fn into_nodes(self) -> impl Iterator<Item = CartLineFields> {
        self.edges.into_iter().map(|e| e.node)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCostFields {
    pub subtotal_amount: Money,
    pub total_amount: Money,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineFields {
    pub id: CartLineId,
    pub quantity: i64,
    pub cost: CartLineCostFields,
    pub merchandise: MerchandiseFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineCostFields {
    pub amount_per_quantity: Money,
    pub total_amount: Money,
}

/// `... on ProductVariant` selection. Merchandise of any other type comes
/// back as `{}`, which leaves every field `None`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseFields {
    pub id: Option<MerchandiseId>,
    pub title: Option<String>,
    pub price: Option<Money>,
    pub image: Option<Image>,
    pub product: Option<MerchandiseProductFields>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerchandiseProductFields {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
}

/// Payload common to every cart mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationPayload {
    pub cart: Option<CartFields>,
    #[serde(default)]
    pub user_errors: Vec<CartUserError>,
}

// =============================================================================
// Cart operations
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CartInput {
    pub lines: Vec<CartLineInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCartVariables {
    pub input: CartInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartData {
    pub cart_create: Option<CartMutationPayload>,
}

storefront_operation!(
    CreateCart,
    "CreateCart",
    concat!(
        "mutation CreateCart($input: CartInput!) {\n",
        "  cartCreate(input: $input) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    ),
    CreateCartVariables,
    CreateCartData
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCartVariables {
    pub cart_id: CartId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetCartData {
    pub cart: Option<CartFields>,
}

storefront_operation!(
    GetCart,
    "GetCart",
    concat!(
        "query GetCart($cartId: ID!) {\n",
        "  cart(id: $cartId) { ...CartFields }\n",
        "}\n",
        cart_fields!()
    ),
    GetCartVariables,
    GetCartData
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLinesVariables {
    pub cart_id: CartId,
    pub lines: Vec<CartLineInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLinesData {
    pub cart_lines_add: Option<CartMutationPayload>,
}

storefront_operation!(
    AddCartLines,
    "AddCartLines",
    concat!(
        "mutation AddCartLines($cartId: ID!, $lines: [CartLineInput!]!) {\n",
        "  cartLinesAdd(cartId: $cartId, lines: $lines) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    ),
    AddCartLinesVariables,
    AddCartLinesData
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLinesVariables {
    pub cart_id: CartId,
    pub lines: Vec<CartLineUpdateInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLinesData {
    pub cart_lines_update: Option<CartMutationPayload>,
}

storefront_operation!(
    UpdateCartLines,
    "UpdateCartLines",
    concat!(
        "mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {\n",
        "  cartLinesUpdate(cartId: $cartId, lines: $lines) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    ),
    UpdateCartLinesVariables,
    UpdateCartLinesData
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartLinesVariables {
    pub cart_id: CartId,
    pub line_ids: Vec<CartLineId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartLinesData {
    pub cart_lines_remove: Option<CartMutationPayload>,
}

storefront_operation!(
    RemoveCartLines,
    "RemoveCartLines",
    concat!(
        "mutation RemoveCartLines($cartId: ID!, $lineIds: [ID!]!) {\n",
        "  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    ),
    RemoveCartLinesVariables,
    RemoveCartLinesData
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCartLinesVariables {
    pub cart_id: CartId,
    pub after: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartLinesPage {
    pub lines: CartLineConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetCartLinesData {
    pub cart: Option<CartLinesPage>,
}

storefront_operation!(
    GetCartLines,
    "GetCartLines",
    concat!(
        "query GetCartLines($cartId: ID!, $after: String!) {\n",
        "  cart(id: $cartId) {\n",
        "    lines(first: 100, after: $after) {\n",
        "      pageInfo { hasNextPage endCursor }\n",
        "      edges { node { ...CartLineFields } }\n",
        "    }\n",
        "  }\n",
        "}\n",
        cart_line_fields!()
    ),
    GetCartLinesVariables,
    GetCartLinesData
);

// =============================================================================
// Catalog operations
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub available_for_sale: bool,
    pub featured_image: Option<Image>,
    pub price_range: PriceRangeFields,
    pub variants: Connection<VariantFields>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeFields {
    pub min_variant_price: Money,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantFields {
    pub id: MerchandiseId,
    pub title: String,
    pub available_for_sale: bool,
    pub price: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetProductByHandleVariables {
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetProductByHandleData {
    pub product: Option<ProductFields>,
}

storefront_operation!(
    GetProductByHandle,
    "GetProductByHandle",
    concat!(
        "query GetProductByHandle($handle: String!) {\n",
        "  product(handle: $handle) { ...ProductFields }\n",
        "}\n",
        product_fields!()
    ),
    GetProductByHandleVariables,
    GetProductByHandleData
);

#[derive(Debug, Clone, Serialize)]
pub struct GetProductsVariables {
    pub first: i64,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfoFields {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnectionFields {
    pub page_info: PageInfoFields,
    pub edges: Vec<Edge<ProductFields>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetProductsData {
    pub products: ProductConnectionFields,
}

storefront_operation!(
    GetProducts,
    "GetProducts",
    concat!(
        "query GetProducts($first: Int!, $after: String) {\n",
        "  products(first: $first, after: $after) {\n",
        "    pageInfo { hasNextPage endCursor }\n",
        "    edges { node { ...ProductFields } }\n",
        "  }\n",
        "}\n",
        product_fields!()
    ),
    GetProductsVariables,
    GetProductsData
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_documents_include_fragment() {
        let body = CreateCart::build_query(CreateCartVariables {
            input: CartInput { lines: vec![] },
        });
        assert_eq!(body.operation_name, "CreateCart");
        assert!(body.query.contains("cartCreate(input: $input)"));
        assert!(body.query.contains("fragment CartFields on Cart"));
        assert!(body.query.contains(&format!("lines(first: {CART_LINES_PAGE})")));
        assert!(body.query.contains("fragment CartLineFields on BaseCartLine"));
    }

    #[test]
    fn test_cart_lines_page_continues_after_cursor() {
        let body = GetCartLines::build_query(GetCartLinesVariables {
            cart_id: CartId::new("gid://shopify/Cart/1"),
            after: "cursor-100".to_string(),
        });
        assert!(body.query.contains(&format!("lines(first: {CART_LINES_PAGE}, after: $after)")));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["variables"]["after"], "cursor-100");
        assert_eq!(json["operationName"], "GetCartLines");
    }

    #[test]
    fn test_cart_lines_without_page_info_are_complete() {
        let lines: CartLineConnection = serde_json::from_str(r#"{"edges": []}"#).unwrap();
        assert!(!lines.page_info.has_next_page);
    }

    #[test]
    fn test_remove_variables_serialize_camel_case() {
        let body = RemoveCartLines::build_query(RemoveCartLinesVariables {
            cart_id: CartId::new("gid://shopify/Cart/1"),
            line_ids: vec![CartLineId::new("gid://shopify/CartLine/2")],
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["variables"]["cartId"], "gid://shopify/Cart/1");
        assert_eq!(json["variables"]["lineIds"][0], "gid://shopify/CartLine/2");
        assert_eq!(json["operationName"], "RemoveCartLines");
    }

    #[test]
    fn test_merchandise_of_unknown_type_deserializes_empty() {
        let merch: MerchandiseFields = serde_json::from_str("{}").unwrap();
        assert!(merch.id.is_none());
        assert!(merch.product.is_none());
    }
}
