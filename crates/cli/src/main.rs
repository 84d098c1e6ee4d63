//! Souq CLI - Database migrations and store management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! souq-cli migrate
//!
//! # Load the catalog from YAML
//! souq-cli seed products -f catalog.yaml
//!
//! # Inspect or reset the order counter
//! souq-cli orders next-number
//! souq-cli orders reset-counter --yes
//!
//! # Create a shopper account
//! souq-cli users create -e shopper@example.com -p 'long password'
//!
//! # Delete abandoned guest carts
//! souq-cli carts prune --older-than-days 30
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "souq-cli")]
#[command(author, version, about = "Souq CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Order counter maintenance
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Manage shopper accounts
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert products from a YAML file
    Products {
        /// Path to the YAML product list
        #[arg(short, long)]
        file: String,

        /// Deactivate products missing from the file
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Show the order number the next checkout would get
    NextNumber,
    /// Reset the order counter to zero
    ResetCounter {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// Create a new shopper account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (8-128 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Delete guest carts older than the given age
    Prune {
        /// Age in days
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, clear } => commands::seed::products(&file, clear).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::NextNumber => commands::orders::next_number().await?,
            OrdersAction::ResetCounter { yes } => commands::orders::reset_counter(yes).await?,
        },
        Commands::Users { action } => match action {
            UsersAction::Create { email, password } => {
                commands::users::create(&email, &password).await?;
            }
        },
        Commands::Carts { action } => match action {
            CartsAction::Prune { older_than_days } => {
                commands::carts::prune(older_than_days).await?;
            }
        },
    }
    Ok(())
}
