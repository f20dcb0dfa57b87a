//! Reservio CLI - Seed checks, POS quotes and webhook testing.
//!
//! # Usage
//!
//! ```bash
//! # Validate a seed file before starting the server with it
//! rsv-cli seed check seed.yaml
//!
//! # Price a cart described in YAML
//! rsv-cli quote cart.yaml
//!
//! # Preview the bookings a weekly series would create
//! rsv-cli recurrence --start 2024-01-01T09:00:00Z --duration 30 --rule weekly --until 2024-01-22
//!
//! # Sign a webhook payload for local testing
//! rsv-cli stripe-sign --secret-env RESERVIO_STRIPE_WEBHOOK_SECRET --payload event.json
//! ```
//!
//! # Commands
//!
//! - `seed check` - Parse a seed file and report counts and dangling references
//! - `quote` - Compute cart totals with the POS calculator
//! - `recurrence` - List the occurrences of a recurring booking
//! - `stripe-sign` - Produce a `Stripe-Signature` header value

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

mod commands;

use commands::recurrence::RuleArg;

#[derive(Parser)]
#[command(name = "rsv-cli")]
#[command(author, version, about = "Reservio CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed file tools
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Price a YAML cart with the POS calculator
    Quote {
        /// Cart file (items and optional discount)
        file: PathBuf,
    },
    /// Print the occurrences a recurring booking would create
    Recurrence {
        /// First occurrence (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Service duration in minutes
        #[arg(long, default_value_t = 60)]
        duration: u32,

        /// Recurrence rule
        #[arg(long, value_enum)]
        rule: RuleArg,

        /// Last date a booking may fall on (inclusive)
        #[arg(long)]
        until: NaiveDate,
    },
    /// Print a Stripe-Signature header value for a payload
    StripeSign {
        /// Environment variable holding the webhook signing secret
        #[arg(long, default_value = "RESERVIO_STRIPE_WEBHOOK_SECRET")]
        secret_env: String,

        /// File with the exact request body to sign
        #[arg(long)]
        payload: PathBuf,

        /// Unix timestamp to sign with (defaults to now)
        #[arg(long)]
        timestamp: Option<i64>,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Parse a seed file and report what it contains
    Check {
        /// Seed file (YAML)
        file: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed { action } => match action {
            SeedAction::Check { file } => commands::seed::check(&file)?,
        },
        Commands::Quote { file } => commands::quote::run(&file)?,
        Commands::Recurrence {
            start,
            duration,
            rule,
            until,
        } => commands::recurrence::run(start, duration, rule, until)?,
        Commands::StripeSign {
            secret_env,
            payload,
            timestamp,
        } => commands::stripe::sign(&secret_env, &payload, timestamp)?,
    }
    Ok(())
}
