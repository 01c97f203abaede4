//! Baxoq CLI - drive a Saleor cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! baxoq show
//!
//! # Add two of a variant (creates the cart if needed)
//! baxoq add --variant UHJvZHVjdFZhcmlhbnQ6Mjk3 -q 2
//!
//! # Add a product's first variant on another channel
//! baxoq --channel channel-pln add --product UHJvZHVjdDo3Mg==
//!
//! # Adjust lines
//! baxoq inc <line-id>
//! baxoq set <line-id> 5
//! baxoq remove <line-id>
//!
//! # Print the hosted checkout link
//! baxoq checkout-url
//! ```
//!
//! # Environment Variables
//!
//! - `SALEOR_API_URL` - Saleor GraphQL endpoint (required)
//! - `SALEOR_APP_TOKEN` / `SALEOR_ACCESS_TOKEN` - Optional bearer tokens
//! - `DEFAULT_CHANNEL` - Channel to use (default: default-channel)
//! - `BAXOQ_STATE_FILE` - Where checkout IDs are kept (default: .baxoq-cart.json)
//! - `CHECKOUT_URL` - Hosted checkout base URL, for `checkout-url`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use baxoq_core::{ChannelSlug, LineId, ProductId, Quantity, VariantId};
use baxoq_storefront::cart::{CartEvents, CartService, CheckoutIdStore, LocalCartCache};
use baxoq_storefront::config::SaleorConfig;
use baxoq_storefront::saleor::SaleorClient;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use url::Url;

mod commands;
mod store;

use commands::CliError;
use commands::cart::{Item, Shopper};
use store::FileCheckoutIds;

#[derive(Parser)]
#[command(name = "baxoq")]
#[command(author, version, about = "Baxoq cart tools")]
struct Cli {
    /// Saleor GraphQL endpoint
    #[arg(long, env = "SALEOR_API_URL")]
    api_url: Url,

    /// Sales channel
    #[arg(long, env = "DEFAULT_CHANNEL", default_value = "default-channel")]
    channel: String,

    /// File holding the checkout ID for each channel
    #[arg(long, env = "BAXOQ_STATE_FILE", default_value = ".baxoq-cart.json")]
    state_file: PathBuf,

    /// Server-side app token
    #[arg(long, env = "SALEOR_APP_TOKEN", hide_env_values = true)]
    app_token: Option<String>,

    /// Shopper access token (takes precedence over the app token)
    #[arg(long, env = "SALEOR_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Start a new, empty cart
    Create,
    /// Add an item to the cart
    Add(AddArgs),
    /// Set a line's quantity
    Set {
        /// Line ID
        line: String,
        /// New quantity (at least 1)
        quantity: u32,
    },
    /// Increase a line's quantity by one
    Inc {
        /// Line ID
        line: String,
    },
    /// Decrease a line's quantity by one (never below 1)
    Dec {
        /// Line ID
        line: String,
    },
    /// Remove a line
    Remove {
        /// Line ID
        line: String,
    },
    /// Print the hosted checkout URL
    CheckoutUrl {
        /// Hosted checkout base URL
        #[arg(long, env = "CHECKOUT_URL")]
        base: Url,
    },
    /// Forget the stored cart for the channel
    Forget,
}

#[derive(Args)]
struct AddArgs {
    /// Variant ID
    #[arg(long, required_unless_present = "product", conflicts_with = "product")]
    variant: Option<String>,

    /// Product ID (its first variant is added)
    #[arg(long)]
    product: Option<String>,

    /// Quantity
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so env-backed arguments see it
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "baxoq_cli=warn,baxoq_storefront=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let channel = ChannelSlug::parse(cli.channel)?;

    let saleor = SaleorClient::new(&SaleorConfig {
        api_url: cli.api_url,
        app_token: cli.app_token.map(SecretString::from),
    })
    .authorized(cli.access_token.map(SecretString::from));

    let service = CartService::new(
        Arc::new(saleor),
        LocalCartCache::new(Duration::from_secs(30)),
        CartEvents::new(),
    );
    let store: Arc<dyn CheckoutIdStore> = Arc::new(FileCheckoutIds::new(cli.state_file));
    let shopper = Shopper::new(service, store, channel);

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Show => shopper.show(&mut out).await,
        Commands::Create => shopper.create(&mut out).await,
        Commands::Add(args) => {
            let item = match (args.variant, args.product) {
                (Some(variant), _) => Item::Variant(VariantId::parse(variant)?),
                (None, Some(product)) => Item::Product(ProductId::parse(product)?),
                (None, None) => {
                    return Err(CliError::Failed(
                        "Either --variant or --product is required".to_string(),
                    ));
                }
            };
            shopper.add(item, Quantity::new(args.quantity)?, &mut out).await
        }
        Commands::Set { line, quantity } => {
            shopper
                .set(&LineId::parse(line)?, Quantity::new(quantity)?, &mut out)
                .await
        }
        Commands::Inc { line } => shopper.increment(&LineId::parse(line)?, &mut out).await,
        Commands::Dec { line } => shopper.decrement(&LineId::parse(line)?, &mut out).await,
        Commands::Remove { line } => shopper.remove(&LineId::parse(line)?, &mut out).await,
        Commands::CheckoutUrl { base } => shopper.checkout_url(&base, &mut out).await,
        Commands::Forget => shopper.forget(&mut out),
    }
}
