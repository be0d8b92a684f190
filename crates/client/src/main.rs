//! `storefront-cart`: terminal front-end for the cart store.
//!
//! ```text
//! storefront-cart show
//! storefront-cart add <product-id>
//! storefront-cart remove <product-id>
//! storefront-cart update <product-id> <amount>
//! ```

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use storefront_core::ProductId;

use storefront_client::{
    CartStore, ClientConfig, FileStorage, HttpCatalog, Notifier, StderrNotifier, TracingNotifier,
};

/// Storefront shopping cart.
#[derive(Debug, Parser)]
#[command(name = "storefront-cart", version)]
struct Cli {
    /// Defaults to `show`.
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Print the cart.
    Show,
    /// Add one unit of a product.
    Add { product_id: ProductId },
    /// Remove a product's line.
    Remove { product_id: ProductId },
    /// Set a product's amount.
    Update {
        product_id: ProductId,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

/// Shows the message on the terminal and records it in the logs.
struct CliNotifier;

impl Notifier for CliNotifier {
    fn error(&self, message: &str) {
        StderrNotifier.error(message);
        TracingNotifier.error(message);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command.unwrap_or(CliCommand::Show)).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(command: CliCommand) -> anyhow::Result<ExitCode> {
    let config = ClientConfig::from_env()?;
    storefront_observability::init_with(config.log_format);

    let storage = match &config.data_dir {
        Some(dir) => FileStorage::open(dir)?,
        None => FileStorage::open_default()?,
    };
    tracing::debug!(dir = ?storage.dir(), api_url = %config.api_url, "starting");

    let catalog = HttpCatalog::with_timeout(&config.api_url, config.request_timeout)
        .context("failed to build HTTP client")?;
    let store = CartStore::load(catalog, storage, CliNotifier);

    let outcome = match command {
        CliCommand::Show => Ok(()),
        CliCommand::Add { product_id } => store.add_product(product_id).await,
        CliCommand::Remove { product_id } => store.remove_product(product_id).await,
        CliCommand::Update { product_id, amount } => {
            store.update_product_amount(product_id, amount).await
        }
    };

    print_cart(&store.cart().await);

    // The notifier already told the user what went wrong.
    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_cart(cart: &storefront_cart::Cart) {
    if cart.is_empty() {
        println!("cart is empty");
        return;
    }

    for line in cart.lines() {
        let title = line.title().unwrap_or("-");
        match line.field("price").and_then(serde_json::Value::as_f64) {
            Some(price) => println!("{:>6}  x{:<3} {title}  ({price:.2} each)", line.id, line.amount),
            None => println!("{:>6}  x{:<3} {title}", line.id, line.amount),
        }
    }
    println!("{} product(s), {} unit(s)", cart.len(), cart.total_units());
}
