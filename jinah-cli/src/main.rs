//! Jinah CLI - test charges, service routing and webhook verification.
//!
//! # Commands
//!
//! - `jinah test-charge` - Start a test payment on a service
//! - `jinah test-inquiry` - Look up a transaction
//! - `jinah test-cancel` - Cancel a transaction
//! - `jinah list-services` - List configured services
//! - `jinah switch-service <name>` - Resolve a service for this run
//! - `jinah payment-methods` - List channels routed by a meta service
//! - `jinah webhook-info` - Show webhook endpoints and security settings
//! - `jinah verify-webhook` - Run a stored webhook through the receiver
//! - `jinah health` - Print the webhook health report

use clap::{Parser, Subcommand};
use colored::Colorize;
use jinah_payments::{JinahConfig, MemoryStore, ProviderRouter};
use jinah_webhooks::{LoggingListener, WebhookReceiver};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

mod commands;
mod error;
mod logging;

use commands::{payment, services, webhook};
use error::CliResult;

/// Jinah CLI - Payment gateway testing tools
#[derive(Parser)]
#[command(name = "jinah")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "CLI tool for testing Jinah payment services and webhooks")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} jinah list-services\n  {} jinah test-charge --amount 25000 --channel vabca\n  {} jinah verify-webhook --body notify.json --header client-id:FINPAY",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true, env = "JINAH_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a test payment
    #[command(visible_alias = "charge")]
    TestCharge {
        /// Merchant order id (defaults to ORDER-<timestamp>)
        #[arg(long)]
        order_id: Option<String>,

        /// Amount in the default currency
        #[arg(long, default_value = "10000")]
        amount: Decimal,

        /// Service to charge through
        #[arg(short, long)]
        service: Option<String>,

        /// Channel code for a direct channel charge, e.g. vabca or qris
        #[arg(long)]
        channel: Option<String>,
    },

    /// Look up a transaction
    #[command(visible_alias = "inquiry")]
    TestInquiry {
        /// Gateway transaction id
        #[arg(long, conflicts_with = "order_id")]
        transaction_id: Option<String>,

        /// Merchant order id
        #[arg(long)]
        order_id: Option<String>,

        #[arg(short, long)]
        service: Option<String>,
    },

    /// Cancel a transaction
    TestCancel {
        #[arg(long)]
        transaction_id: String,

        #[arg(short, long)]
        service: Option<String>,
    },

    /// List configured services
    #[command(visible_alias = "services")]
    ListServices,

    /// Resolve a service for this run
    SwitchService {
        /// Service name
        name: String,
    },

    /// List channels routed by a meta service
    PaymentMethods {
        #[arg(short, long, default_value = "jinah")]
        service: String,
    },

    /// Show webhook endpoints and security settings
    WebhookInfo,

    /// Run a stored webhook body through verification, normalization and dispatch
    VerifyWebhook {
        /// Service named in the URL; auto-detected when omitted
        #[arg(short, long)]
        service: Option<String>,

        /// File holding the raw request body
        #[arg(long)]
        body: PathBuf,

        /// Request header as Name:value (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Client IP address
        #[arg(long)]
        ip: Option<String>,
    },

    /// Print the webhook health report
    Health,
}

fn receiver(config: &Arc<JinahConfig>) -> WebhookReceiver {
    let receiver = WebhookReceiver::new(config.clone());
    receiver.dispatcher().subscribe_all(LoggingListener);
    receiver
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = JinahConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose);

    debug!(
        config = ?cli.config,
        default_service = %config.default_service,
        environment = ?config.environment,
        "Configuration loaded"
    );

    let config = Arc::new(config);
    let router = ProviderRouter::with_store(config.clone(), Arc::new(MemoryStore::new()));

    match cli.command {
        Commands::TestCharge {
            order_id,
            amount,
            service,
            channel,
        } => {
            payment::test_charge(
                &router,
                payment::ChargeOptions {
                    order_id,
                    amount,
                    service,
                    channel,
                },
            )
            .await
        }

        Commands::TestInquiry {
            transaction_id,
            order_id,
            service,
        } => {
            payment::test_inquiry(
                &router,
                transaction_id.as_deref(),
                order_id.as_deref(),
                service.as_deref(),
            )
            .await
        }

        Commands::TestCancel {
            transaction_id,
            service,
        } => payment::test_cancel(&router, &transaction_id, service.as_deref()).await,

        Commands::ListServices => services::list_services(&router),

        Commands::SwitchService { name } => services::switch_service(&router, &name),

        Commands::PaymentMethods { service } => services::payment_methods(&config, &service),

        Commands::WebhookInfo => webhook::webhook_info(&config, &receiver(&config)),

        Commands::VerifyWebhook {
            service,
            body,
            headers,
            ip,
        } => {
            webhook::verify_webhook(
                &config,
                &receiver(&config),
                webhook::VerifyOptions {
                    service: service.as_deref(),
                    body: &body,
                    headers: &headers,
                    ip: ip.as_deref(),
                },
            )
            .await
        }

        Commands::Health => webhook::health(&receiver(&config)),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
