//! Service Bay CLI - Migrations, stock management and allocation planning.
//!
//! # Usage
//!
//! ```bash
//! # Run inventory database migrations
//! bay-cli migrate
//!
//! # Plan a FIFO allocation offline from a YAML batch snapshot
//! bay-cli plan --file batches.yaml --quantity 7
//!
//! # Register a part and receive stock for it
//! bay-cli item create --part-number OIL-5W30 --name "5W-30 engine oil (1L)"
//! bay-cli stock receive --part-number OIL-5W30 --quantity 24 --unit-price 6.40 --purchase-ref PO-1182
//!
//! # Show an item's batches
//! bay-cli stock list --part-number OIL-5W30
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `plan` - Offline FIFO allocation from a snapshot file
//! - `item create` - Register an inventory item
//! - `stock list` / `stock receive` - Inspect and receive stock batches

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use service_bay_core::RequestedQuantity;

mod commands;

#[derive(Parser)]
#[command(name = "bay-cli")]
#[command(author, version, about = "Service Bay CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Plan a FIFO allocation from a YAML batch snapshot (no database)
    Plan {
        /// Snapshot file listing the item's batches
        #[arg(short, long)]
        file: PathBuf,

        /// Quantity to allocate (must be positive)
        #[arg(short, long)]
        quantity: RequestedQuantity,
    },
    /// Manage inventory items
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Inspect and receive stock batches
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Register a new inventory item
    Create {
        /// Unique part number
        #[arg(short, long)]
        part_number: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// List an item's batches, oldest first
    List {
        /// Part number of the item
        #[arg(short, long)]
        part_number: String,
    },
    /// Record stock received from a purchase
    Receive {
        /// Part number of the item
        #[arg(short, long)]
        part_number: String,

        /// Units received
        #[arg(short, long)]
        quantity: Decimal,

        /// Price per unit
        #[arg(short, long)]
        unit_price: Decimal,

        /// Purchase order or supplier invoice reference
        #[arg(long)]
        purchase_ref: Option<String>,

        /// Purchase timestamp (RFC 3339), defaults to now
        #[arg(long)]
        purchase_date: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Plan { file, quantity } => commands::plan::run(&file, quantity).await?,
        Commands::Item { action } => match action {
            ItemAction::Create { part_number, name } => {
                commands::stock::create_item(&part_number, &name).await?;
            }
        },
        Commands::Stock { action } => match action {
            StockAction::List { part_number } => commands::stock::list(&part_number).await?,
            StockAction::Receive {
                part_number,
                quantity,
                unit_price,
                purchase_ref,
                purchase_date,
            } => {
                commands::stock::receive(commands::stock::ReceiveArgs {
                    part_number,
                    quantity,
                    unit_price,
                    purchase_reference: purchase_ref,
                    purchase_date: purchase_date.unwrap_or_else(Utc::now),
                })
                .await?;
            }
        },
    }
    Ok(())
}
