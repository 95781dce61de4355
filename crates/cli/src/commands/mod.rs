//! CLI subcommands.

pub mod cart;
pub mod products;

use std::io::Write;

use serde::Serialize;
use shopfront::cart::CartError;
use shopfront::config::ConfigError;
use shopfront::shopify::ShopifyError;
use thiserror::Error;

/// Errors that can occur running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog request failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Cart operation failed.
    #[error("Cart error ({kind}): {0}", kind = .0.kind())]
    Cart(#[from] CartError),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How results are written to stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Write `value` as JSON, or through `render` as text.
    pub fn emit<T: Serialize>(
        self,
        value: &T,
        render: impl FnOnce(&T, &mut dyn Write) -> std::io::Result<()>,
    ) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if self.json {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        } else {
            render(value, &mut out)?;
        }
        Ok(())
    }
}
