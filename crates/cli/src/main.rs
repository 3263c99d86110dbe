//! Voltparts CLI - a terminal storefront on top of `voltparts-storefront`.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password can also come from VOLTPARTS_PASSWORD)
//! vp-cli login -e priya@example.com
//!
//! # Order history and a single order
//! vp-cli orders list --limit 10 --page 1
//! vp-cli orders show 1042
//! vp-cli orders track 1042
//! vp-cli orders cancel 1042 --reason "ordered twice"
//!
//! # Cart and checkout
//! vp-cli cart add arduino-uno --name "Arduino Uno R3" --price 649.50 -q 2
//! vp-cli checkout --name "Priya Shah" --email priya@example.com --phone 9876543210 \
//!     --line1 "12 MG Road" --city Pune --state Maharashtra --pincode 411001
//!
//! # Quote requests
//! vp-cli quote add stepper-nema17 --name "NEMA 17 Stepper" --price 900 -q 50
//! vp-cli quote submit --name "Priya Shah" ...
//! ```
//!
//! # Environment Variables
//!
//! Read through `StorefrontConfig::from_env` (`VOLTPARTS_API_URL` is required).
//! `RUST_LOG` controls log output.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voltparts_storefront::{Storefront, StorefrontConfig};

mod commands;

use commands::CliError;
use commands::basket::{BasketAction, BasketTarget};
use commands::checkout::AddressArgs;
use commands::orders::OrdersAction;

#[derive(Parser)]
#[command(name = "vp-cli")]
#[command(author, version, about = "Voltparts storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "VOLTPARTS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Mobile number
        #[arg(long)]
        phone: Option<String>,

        /// Account password
        #[arg(short, long, env = "VOLTPARTS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in customer
    Whoami,
    /// Order history, details, tracking and cancellation
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: BasketAction,
    },
    /// Manage the quote list
    Quote {
        #[command(subcommand)]
        action: QuoteAction,
    },
    /// Place an order for everything in the cart
    Checkout {
        #[command(flatten)]
        address: AddressArgs,
    },
}

#[derive(Subcommand)]
enum QuoteAction {
    #[command(flatten)]
    Basket(BasketAction),
    /// Review and submit the quote list
    Submit {
        #[command(flatten)]
        address: AddressArgs,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Errors become Sentry events, info and debug logs become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO | tracing::Level::DEBUG => {
            sentry_tracing::EventFilter::Breadcrumb
        }
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let _ = writeln!(std::io::stderr().lock(), "error: {e}");
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voltparts_storefront=warn,vp_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        let message = match &e {
            CliError::App(app) => {
                app.report();
                app.user_message()
            }
            CliError::Io(io) => {
                tracing::error!(error = %io, "Failed to write output");
                io.to_string()
            }
        };
        let _ = writeln!(std::io::stderr().lock(), "error: {message}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let storefront = Storefront::new(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::session::login(&storefront, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            phone,
            password,
        } => commands::session::register(&storefront, name, email, phone, password).await?,
        Commands::Logout => commands::session::logout(&storefront)?,
        Commands::Whoami => commands::session::whoami(&storefront)?,
        Commands::Orders { action } => commands::orders::run(&storefront, action).await?,
        Commands::Cart { action } => {
            commands::basket::run(&storefront, BasketTarget::Cart, action)?;
        }
        Commands::Quote { action } => match action {
            QuoteAction::Basket(action) => {
                commands::basket::run(&storefront, BasketTarget::Quote, action)?;
            }
            QuoteAction::Submit { address } => {
                commands::checkout::submit_quote(&storefront, address).await?;
            }
        },
        Commands::Checkout { address } => {
            commands::checkout::place_order(&storefront, address).await?;
        }
    }
    Ok(())
}
