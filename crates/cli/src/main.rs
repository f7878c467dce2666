//! Ferramas CLI - Drive the storefront client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Fill the cart
//! ferramas cart add p1 Martillo 1000
//! ferramas cart add p2 Clavos 500
//! ferramas cart update p2 3
//! ferramas cart show
//!
//! # Pay as a logged-in customer, or as a guest
//! ferramas checkout --method tarjeta --csrf "$TOKEN"
//! ferramas checkout --method transferencia --name "Ana" --email ana@example.com
//!
//! # Show the receipt of the last payment
//! ferramas voucher
//! ```
//!
//! # Commands
//!
//! - `cart` - Inspect and edit the cart
//! - `checkout` - Submit the cart to the payment endpoint
//! - `voucher` - Show the receipt left by the last successful payment
//!
//! Browser storage is emulated with two JSON files in `--storage-dir`:
//! `local.json` (cart, pop-up flag) and `session.json` (receipt slot).
//! Endpoint and storage keys come from `FERRAMAS_*` environment variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ferramas_core::{PaymentMethod, Price};
use ferramas_storefront::ClientConfig;
use ferramas_storefront::telemetry::{self, LogFormat};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "ferramas")]
#[command(author, version, about = "Ferramas storefront client")]
struct Cli {
    /// Directory holding the emulated browser storage
    #[arg(long, global = true, default_value = ".ferramas")]
    storage_dir: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Pay for the cart contents
    Checkout {
        /// Payment method (`tarjeta` or `transferencia`)
        #[arg(short, long)]
        method: PaymentMethod,

        /// Buyer name; checks out as a guest when given
        #[arg(short, long)]
        name: Option<String>,

        /// Buyer email (guests only)
        #[arg(short, long, requires = "name")]
        email: Option<String>,

        /// CSRF token sent with the payment request
        #[arg(long)]
        csrf: Option<String>,

        /// Discount percentage granted to the buyer
        #[arg(long, default_value = "0")]
        discount: Decimal,
    },
    /// Show the receipt of the last payment (consumes it)
    Voucher {
        /// Print the raw receipt data as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List the cart contents
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        id: String,
        /// Product name
        name: String,
        /// Unit price
        price: Price,
    },
    /// Remove a product line
    Remove {
        /// Product id
        id: String,
    },
    /// Set the quantity of a product line (zero or less removes it)
    Update {
        /// Product id
        id: String,
        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = ClientConfig::from_env();
    let fallback = ClientConfig::default();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    let telemetry = telemetry::init(config.as_ref().unwrap_or(&fallback), format);

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(telemetry);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::open(&cli.storage_dir, config);

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx),
            CartAction::Add { id, name, price } => commands::cart::add(&ctx, &id, &name, price),
            CartAction::Remove { id } => commands::cart::remove(&ctx, &id)?,
            CartAction::Update { id, quantity } => {
                commands::cart::update(&ctx, &id, quantity)?;
            }
            CartAction::Clear => commands::cart::clear(&ctx),
        },
        Commands::Checkout {
            method,
            name,
            email,
            csrf,
            discount,
        } => {
            let args = commands::checkout::CheckoutArgs {
                method,
                guest_name: name,
                guest_email: email,
                csrf_token: csrf.map(Into::into),
                discount_percentage: discount,
            };
            commands::checkout::run(&ctx, args).await?;
        }
        Commands::Voucher { json } => commands::voucher::show(&ctx, json)?,
    }
    Ok(())
}
