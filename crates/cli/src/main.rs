//! `traderdb` CLI entry-point.
//!
//! Available sub-commands:
//! - `list`    — watchlists of a user that hold at least one stock.
//! - `stocks`  — distinct stocks across a user's watchlists.
//! - `exists`  — whether a watchlist belongs to a user.
//! - `get`     — a single watchlist by id.
//! - `create`  — create a watchlist.
//! - `update`  — rename a watchlist and replace its stocks.
//! - `delete`  — delete a watchlist.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use traderdb::{
    BulkInsertMode, Deadline, StockId, StoreConfig, UserId, WatchlistId, WatchlistRepository,
    WatchlistStore,
};

#[derive(Parser)]
#[command(
    name = "traderdb",
    about = "Inspect and edit user watchlists",
    version
)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Abort the call if it has not finished after this many milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Write memberships with multi-row INSERT instead of COPY.
    #[arg(long, global = true)]
    no_copy: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a user's watchlists (empty watchlists are not shown).
    List {
        #[arg(long)]
        user: UserId,
    },
    /// List every stock on any of a user's watchlists.
    Stocks {
        #[arg(long)]
        user: UserId,
    },
    /// Check that a watchlist belongs to a user.
    Exists {
        #[arg(long)]
        id: WatchlistId,
        #[arg(long)]
        user: UserId,
    },
    /// Show one watchlist.
    Get {
        #[arg(long)]
        id: WatchlistId,
    },
    /// Create a watchlist and print its id.
    Create {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        name: String,
        /// Stock id to add; repeat for several.
        #[arg(long = "stock")]
        stocks: Vec<StockId>,
    },
    /// Rename a watchlist and replace its stocks.
    Update {
        #[arg(long)]
        id: WatchlistId,
        #[arg(long)]
        name: String,
        /// Stock id to keep; repeat for several. None clears the watchlist.
        #[arg(long = "stock")]
        stocks: Vec<StockId>,
    },
    /// Delete a watchlist and its stocks.
    Delete {
        #[arg(long)]
        id: WatchlistId,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn store_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = StoreConfig::from_env().context("reading store configuration")?;
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if cli.no_copy {
        config.bulk_insert = BulkInsertMode::Values;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<serde_json::Value> {
    let config = store_config(&cli)?;
    let store = WatchlistStore::connect(&config)
        .await
        .context("failed to connect to database")?;
    let deadline = Deadline::from_timeout(cli.timeout_ms.map(Duration::from_millis));
    let store = store.with_deadline(deadline);
    debug!(?deadline, "store ready");

    let out = match cli.command {
        Command::List { user } => json!(store.list_by_user(user).await?),
        Command::Stocks { user } => json!(store.list_distinct_stocks_by_user(user).await?),
        Command::Exists { id, user } => json!({ "exists": store.exists(id, user).await? }),
        Command::Get { id } => json!(store.get_by_id(id).await?),
        Command::Create { user, name, stocks } => {
            let id = store.create(user, &name, &stocks).await?;
            info!("Created watchlist {id} for user {user}");
            json!({ "id": id })
        }
        Command::Update { id, name, stocks } => {
            store.update(id, &name, &stocks).await?;
            info!("Updated watchlist {id}");
            json!({ "id": id })
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            info!("Deleted watchlist {id}");
            json!({ "id": id })
        }
    };
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out = run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
