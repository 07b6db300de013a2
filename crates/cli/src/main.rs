//! Bookstore CLI - browse the catalog and manage the shopping cart.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! bookstore books list --page 2
//! bookstore books show 42
//!
//! # Manage the cart (guest carts are kept in BOOKSTORE_STATE_DIR)
//! bookstore cart add 42 --quantity 2
//! bookstore cart update 42 5
//! bookstore cart remove 42
//! bookstore cart show
//!
//! # Sign in to switch to the account's cart
//! bookstore login -e reader@example.com
//! bookstore logout
//! ```
//!
//! # Environment Variables
//!
//! See `bookstore_storefront::config` for the full list. `RUST_LOG`
//! overrides the default log filter.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bookstore_storefront::Storefront;
use bookstore_storefront::config::ClientConfig;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(author, version, about = "Bookstore storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and switch to the account's cart
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and switch back to the guest cart
    Logout,
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog
    Books {
        #[command(subcommand)]
        action: BooksAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a book to the cart
    Add {
        /// Book ID
        book_id: String,

        /// Number of copies
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a book (0 or less removes it)
    Update {
        /// Book ID
        book_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a book from the cart
    Remove {
        /// Book ID
        book_id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum BooksAction {
    /// Show a single book
    Show {
        /// Book ID
        book_id: String,
    },
    /// List a page of the catalog
    List {
        /// Page number (1-indexed)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main(flavor = "current_thread")]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookstore_storefront=warn,bookstore_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        match &e {
            CommandError::Storefront(err) => err.report(),
            _ => tracing::error!("Command failed: {e}"),
        }
        eprintln!("Error: {e}");
        // `process::exit` skips destructors; flush pending Sentry events first
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CommandError> {
    let storefront = Storefront::open(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&storefront, &email, password).await?;
        }
        Commands::Logout => commands::auth::logout(&storefront).await?,
        Commands::Cart { action } => {
            storefront.start().await;
            match action {
                CartAction::Show => commands::cart::show(&storefront),
                CartAction::Add { book_id, quantity } => {
                    commands::cart::add(&storefront, &book_id, quantity).await?;
                }
                CartAction::Update { book_id, quantity } => {
                    commands::cart::update(&storefront, &book_id, quantity).await?;
                }
                CartAction::Remove { book_id } => {
                    commands::cart::remove(&storefront, &book_id).await?;
                }
                CartAction::Clear => commands::cart::clear(&storefront).await?,
            }
        }
        Commands::Books { action } => match action {
            BooksAction::Show { book_id } => commands::books::show(&storefront, &book_id).await?,
            BooksAction::List { page } => commands::books::list(&storefront, page).await?,
        },
    }
    Ok(())
}
