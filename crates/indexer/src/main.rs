//! NetSepio Indexer - review and role event ingestion
//!
//! This binary provides:
//! - Event listening for the NetSepio review contract
//! - Review and User materialization into SQLite
//! - Cursor inspection and replay
//! - Point lookups of indexed entities

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netsepio_indexer::config::{Config, LoggingConfig};
use netsepio_indexer::storage::{CursorStore, EntityReader, Storage};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "netsepio-indexer")]
#[command(version, about = "Indexer for NetSepio review and role events", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "indexer.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the indexer service
    Run,

    /// Show indexer status and sync progress
    Status,

    /// Initialize the database
    InitDb {
        /// Database URL
        #[arg(long, default_value = "sqlite://netsepio.db")]
        database_url: String,
    },

    /// Rewind the sync cursor so the next run re-applies events from a block
    ///
    /// Stop a running indexer first. The block must not be past the cursor.
    Replay {
        /// First block to re-apply (at most one past the last processed block)
        #[arg(long)]
        from_block: u64,
    },

    /// Print a review as JSON
    Review {
        /// Token id in decimal form
        token_id: String,
    },

    /// Print a user as JSON
    User {
        /// Account address
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = Config::from_file(&cli.config).context("Failed to load configuration")?;
            init_logging(cli.debug, &config.logging)?;
            run_indexer(config).await?
        }
        Commands::Status => {
            init_logging(cli.debug, &LoggingConfig::default())?;
            show_status(&cli.config).await?
        }
        Commands::InitDb { database_url } => {
            init_logging(cli.debug, &LoggingConfig::default())?;
            init_database(&database_url).await?
        }
        Commands::Replay { from_block } => {
            let config = Config::from_file(&cli.config).context("Failed to load configuration")?;
            init_logging(cli.debug, &config.logging)?;
            replay_from(config, from_block).await?
        }
        Commands::Review { token_id } => {
            let config = Config::from_file(&cli.config).context("Failed to load configuration")?;
            init_logging(cli.debug, &config.logging)?;
            let storage = open_storage(&config).await?;
            let review = storage.get_review(&token_id).await;
            storage.close().await;
            print_json(&review.context("Review lookup failed")?)?
        }
        Commands::User { address } => {
            let config = Config::from_file(&cli.config).context("Failed to load configuration")?;
            init_logging(cli.debug, &config.logging)?;
            let storage = open_storage(&config).await?;
            let user = storage.get_user(&address).await;
            storage.close().await;
            print_json(&user.context("User lookup failed")?)?
        }
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(debug: bool, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("netsepio_indexer=debug,sqlx=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("netsepio_indexer={}", logging.level)))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .context("Failed to install log subscriber")?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    Ok(())
}

async fn open_storage(config: &Config) -> Result<Storage> {
    let storage = Storage::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    Ok(storage)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
    println!("{json}");
    Ok(())
}

/// Main indexer service
async fn run_indexer(config: Config) -> Result<()> {
    use netsepio_indexer::listener::{RpcProvider, SyncEngine};

    info!("NetSepio Indexer starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("  Chain ID: {}", config.network.chain_id);
    info!("  RPC URL: {}", config.network.rpc_url);
    info!("  Contract: {}", config.contracts.netsepio);
    info!("  Database: {}", config.database.url);
    info!("  Start block: {}", config.sync.start_block);

    let storage = open_storage(&config).await?;
    info!("Database initialized");

    let provider = RpcProvider::new(&config.network.rpc_url, config.contracts.netsepio)
        .context("Failed to create RPC provider")?;

    match provider.chain_id().await {
        Ok(chain_id) if chain_id != config.network.chain_id => {
            anyhow::bail!(
                "RPC endpoint serves chain {}, configuration expects {}",
                chain_id,
                config.network.chain_id
            );
        }
        Ok(_) => {}
        Err(e) => warn!("Could not verify chain id: {:#}", e),
    }

    info!("RPC provider initialized");

    let sync_engine = SyncEngine::new(
        provider,
        storage.clone(),
        config.sync.clone(),
        config.network.chain_id,
    );

    let sync_handle = tokio::spawn(async move { sync_engine.run().await });

    info!("Event listener started");

    tokio::select! {
        result = sync_handle => {
            storage.close().await;
            match result {
                Ok(Ok(())) => {
                    warn!("Sync engine exited unexpectedly");
                    Ok(())
                }
                Ok(Err(e)) => {
                    Err(e).context("Sync engine failed")
                }
                Err(e) => {
                    Err(anyhow::anyhow!("Sync task panicked: {}", e))
                }
            }
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Received shutdown signal, gracefully shutting down...");
            storage.close().await;
            Ok(())
        }
    }
}

/// Show indexer status and sync progress
async fn show_status(config_path: &str) -> Result<()> {
    info!("Checking indexer status");

    // Fall back to the default database ONLY if the config file doesn't exist
    let storage = match Config::from_file(config_path) {
        Ok(config) => {
            info!("Using database from config: {}", config.database.url);
            open_storage(&config).await?
        }
        Err(e) => {
            let is_not_found = e.chain().any(|cause| {
                cause
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
            });

            if !is_not_found {
                return Err(e).context("Failed to load config file");
            }

            info!("Config file not found, using default database: sqlite://netsepio.db");
            let storage = Storage::new("sqlite://netsepio.db", None, None)
                .await
                .context("Failed to connect to database")?;
            storage
                .run_migrations()
                .await
                .context("Failed to run migrations")?;
            storage
        }
    };

    let sync_state = storage.get_sync_state().await?;
    let stats = storage.stats().await?;

    println!("\n=== NetSepio Indexer Status ===\n");
    println!("Sync Progress:");
    println!("  Chain ID: {}", sync_state.chain_id);
    println!("  Last Block: {}", sync_state.last_block_number);
    println!(
        "  Last Updated: {}",
        chrono::DateTime::from_timestamp(sync_state.updated_at, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    );

    println!("\nDatabase Statistics:");
    println!("  Reviews: {}", stats.review_count);
    println!("  Deleted Reviews: {}", stats.deleted_review_count);
    println!("  Users: {}", stats.user_count);
    println!();

    storage.close().await;

    Ok(())
}

/// Initialize the database
async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database: {}", database_url);

    let storage = Storage::new(database_url, None, None)
        .await
        .context("Failed to connect to database")?;

    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    storage
        .health_check()
        .await
        .context("Database health check failed")?;

    let stats = storage.stats().await?;
    info!("Database initialized successfully!");
    info!("  Reviews: {}", stats.review_count);
    info!("  Users: {}", stats.user_count);
    info!("  Last block: {}", stats.last_block_number);

    storage.close().await;

    Ok(())
}

/// Rewind the cursor for a replay
async fn replay_from(config: Config, from_block: u64) -> Result<()> {
    let storage = open_storage(&config).await?;

    let rewound =
        netsepio_indexer::listener::rewind(&storage, from_block, config.network.chain_id).await;
    storage.close().await;

    let state = rewound.context("Failed to rewind the sync cursor")?;
    info!(
        "The next run re-applies events from block {}",
        state.last_block_number + 1
    );

    Ok(())
}
