//! Shopfront CLI - cart and catalog from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart (fetches it from Shopify)
//! shopfront-cli cart show
//!
//! # Add two of a variant, creating the cart on first use
//! shopfront-cli cart add gid://shopify/ProductVariant/123 -q 2
//!
//! # Set a line's quantity (0 or less removes it)
//! shopfront-cli cart update gid://shopify/CartLine/abc 3
//!
//! # Browse the catalog
//! shopfront-cli products --first 10
//! shopfront-cli products --handle pineapple-soap
//! ```
//!
//! The cart handle is kept in `.shopfront/cart.json` (override with
//! `--cart-file` or `SHOPFRONT_CART_FILE`), so the same cart is picked up
//! across runs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shopfront-cli")]
#[command(author, version, about = "Shopfront cart and catalog CLI")]
struct Cli {
    /// Where the cart handle is stored
    #[arg(
        long,
        global = true,
        env = "SHOPFRONT_CART_FILE",
        default_value = ".shopfront/cart.json"
    )]
    cart_file: PathBuf,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse products
    Products {
        /// Show a single product
        #[arg(long)]
        handle: Option<String>,

        /// Page size
        #[arg(long, default_value_t = 20)]
        first: i64,

        /// Cursor from a previous page
        #[arg(long)]
        after: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a variant
    Add {
        /// Variant (merchandise) ID
        merchandise_id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Update {
        /// Cart line ID
        line_id: String,

        /// New quantity; 0 or less removes the line
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        line_id: String,
    },
    /// Forget the stored cart
    Clear,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront=warn,shopfront_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let output = commands::Output { json: cli.json };

    match cli.command {
        Commands::Cart { action } => {
            let sync = commands::cart::open(cli.cart_file).await?;
            match action {
                CartAction::Show => commands::cart::show(&sync, output).await?,
                CartAction::Add {
                    merchandise_id,
                    quantity,
                } => commands::cart::add(&sync, &merchandise_id, quantity, output).await?,
                CartAction::Update { line_id, quantity } => {
                    commands::cart::update(&sync, &line_id, quantity, output).await?;
                }
                CartAction::Remove { line_id } => {
                    commands::cart::remove(&sync, &line_id, output).await?;
                }
                CartAction::Clear => commands::cart::clear(&sync).await?,
            }
        }
        Commands::Products {
            handle,
            first,
            after,
        } => match handle {
            Some(handle) => commands::products::show(&handle, output).await?,
            None => commands::products::list(first, after, output).await?,
        },
    }
    Ok(())
}
