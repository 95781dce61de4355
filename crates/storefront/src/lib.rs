//! Shopfront library.
//!
//! Cart synchronization against the Shopify Storefront API, plus the JSON
//! REST proxy served by the `shopfront` binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod routes;
pub mod shopify;
pub mod state;
