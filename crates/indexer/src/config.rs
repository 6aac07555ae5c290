//! Configuration management for the NetSepio indexer.
//!
//! This module handles loading configuration from:
//! - TOML files
//! - Environment variables referenced as `${VAR_NAME}`
//! - Default values (fallbacks)

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Contract addresses
    pub contracts: ContractsConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Sync configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ethereum RPC URL
    pub rpc_url: String,

    /// Chain ID (e.g., 80002 for Polygon Amoy)
    pub chain_id: u64,
}

/// Contract addresses configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// NetSepio review contract (review and role events)
    pub netsepio: Address,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://netsepio.db")
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Upper bound on every store call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// What the sync engine does with a routed log it cannot decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Stop processing and leave the cursor where it is.
    #[default]
    Halt,
    /// Log the record at error level and continue.
    Skip,
}

/// Sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Block number to start syncing from (0 = from genesis)
    #[serde(default)]
    pub start_block: u64,

    /// Polling interval in seconds for new blocks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Batch size for historical sync (number of blocks per batch)
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Number of confirmations to wait before processing blocks
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Handling of undecodable routed logs
    #[serde(default)]
    pub on_decode_error: DecodeErrorPolicy,

    /// Retries of a retryable store failure before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubles on every attempt
    #[serde(default = "default_retry_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,

    /// Ceiling on the retry delay
    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,
}

impl SyncConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self
            .retry_initial_backoff_ms
            .saturating_mul(factor)
            .min(self.retry_max_backoff_ms);
        Duration::from_millis(millis)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
            confirmations: default_confirmations(),
            on_decode_error: DecodeErrorPolicy::default(),
            max_retries: default_max_retries(),
            retry_initial_backoff_ms: default_retry_initial_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_confirmations() -> u64 {
    6
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_secs() -> u64 {
    12
}

fn default_batch_size() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_initial_backoff_ms() -> u64 {
    200
}

fn default_retry_max_backoff_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax.
    /// For example: `rpc_url = "https://polygon-amoy.infura.io/v3/${INFURA_KEY}"`
    ///
    /// # Example
    /// ```no_run
    /// # use netsepio_indexer::config::Config;
    /// let config = Config::from_file("indexer.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let expanded = expand_env_vars(toml)?;
        let config: Config =
            toml::from_str(&expanded).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            anyhow::bail!("Network RPC URL cannot be empty");
        }

        if self.network.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }

        if self.contracts.netsepio.is_zero() {
            anyhow::bail!("Contracts netsepio must be a non-zero address");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot exceed max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.database.timeout_ms == 0 {
            anyhow::bail!("Database timeout_ms must be greater than 0");
        }

        if self.sync.batch_size == 0 {
            anyhow::bail!("Sync batch_size must be greater than 0");
        }

        if self.sync.poll_interval_secs == 0 {
            anyhow::bail!("Sync poll_interval_secs must be greater than 0");
        }

        if self.sync.retry_initial_backoff_ms > self.sync.retry_max_backoff_ms {
            anyhow::bail!(
                "Sync retry_initial_backoff_ms ({}) cannot exceed retry_max_backoff_ms ({})",
                self.sync.retry_initial_backoff_ms,
                self.sync.retry_max_backoff_ms
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }
}

/// Expand `${VAR_NAME}` placeholders.
///
/// Placeholders inside TOML comments are left alone, and a `#` inside a
/// quoted string does not start a comment.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());

    for (line_no, line) in input.split_inclusive('\n').enumerate() {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut chars = line.char_indices().peekable();

        while let Some((col, ch)) = chars.next() {
            if escaped {
                escaped = false;
                result.push(ch);
                continue;
            }

            match (quote, ch) {
                (Some('"'), '\\') => escaped = true,
                (Some(q), c) if c == q => quote = None,
                (None, '"' | '\'') => quote = Some(ch),
                (None, '#') => {
                    result.push_str(&line[col..]);
                    break;
                }
                (_, '$') if matches!(chars.peek(), Some((_, '{'))) => {
                    let rest = &line[col + 2..];
                    let Some(end) = rest.find('}') else {
                        anyhow::bail!(
                            "Unclosed environment variable placeholder at line {}",
                            line_no + 1
                        );
                    };
                    let name = &rest[..end];
                    if name.is_empty() {
                        anyhow::bail!("Empty environment variable name at line {}", line_no + 1);
                    }

                    let value = std::env::var(name).map_err(|_| {
                        anyhow::anyhow!(
                            "Environment variable '{}' is not set (referenced at line {})",
                            name,
                            line_no + 1
                        )
                    })?;
                    result.push_str(&value);

                    // Skip past "{name}"
                    let skip_to = col + 2 + end;
                    while chars.next_if(|(i, _)| *i <= skip_to).is_some() {}
                    continue;
                }
                _ => {}
            }

            result.push(ch);
        }
    }

    Ok(result)
}
