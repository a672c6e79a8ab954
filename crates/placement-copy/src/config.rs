//! Configuration management

use placement_common::types::Namespace;
use serde::{Deserialize, Serialize};

// ============================================================================
// Copy Configuration Constants
// ============================================================================

/// Default transfer service data-service URL.
pub const DEFAULT_TRANSFER_URL: &str = "https://cmsweb.cern.ch/phedex/datasvc";

/// Default transfer service instance.
pub const DEFAULT_TRANSFER_INSTANCE: &str = "prod";

/// Default DBS instance named in request catalogs.
pub const DEFAULT_DBS_NAME: &str = "https://cmsweb.cern.ch/dbs/prod/global/DBSReader";

/// Default timeout for transfer service calls in seconds.
pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 300;

/// Default history database URL for local development.
pub const DEFAULT_HISTORY_DATABASE_URL: &str = "postgresql://localhost/placement_history";

/// Default maximum history database connections in the pool.
pub const DEFAULT_HISTORY_MAX_CONNECTIONS: u32 = 5;

/// Default request size budget, in TB.
pub const DEFAULT_CHUNK_SIZE_TB: f64 = 50.0;

/// Bytes per TB as used for the request size budget.
pub const BYTES_PER_TB: f64 = 1.0e12;

/// Default naming rules.
pub const DEFAULT_NAMESPACE: &str = "standard";

/// Copy interface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    pub transfer: TransferServiceConfig,
    pub history: HistoryConfig,

    /// Upper bound on the summed size of one subscription request, in TB
    pub chunk_size_tb: f64,

    /// Build requests and log them, but never call the service or the history store
    pub dry_run: bool,

    /// Label of the naming rules used to validate entity names
    pub namespace: String,
}

/// Transfer service connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferServiceConfig {
    pub url: String,
    pub instance: String,
    pub dbs_name: String,
    pub timeout_secs: u64,
}

/// History store connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl CopyConfig {
    /// Load configuration from `.env`, environment variables and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = CopyConfig {
            transfer: TransferServiceConfig {
                url: std::env::var("PLACEMENT_TRANSFER_URL")
                    .unwrap_or_else(|_| DEFAULT_TRANSFER_URL.to_string()),
                instance: std::env::var("PLACEMENT_TRANSFER_INSTANCE")
                    .unwrap_or_else(|_| DEFAULT_TRANSFER_INSTANCE.to_string()),
                dbs_name: std::env::var("PLACEMENT_DBS_NAME")
                    .unwrap_or_else(|_| DEFAULT_DBS_NAME.to_string()),
                timeout_secs: std::env::var("PLACEMENT_TRANSFER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_SECS),
            },
            history: HistoryConfig {
                database_url: std::env::var("PLACEMENT_HISTORY_DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_HISTORY_DATABASE_URL.to_string()),
                max_connections: std::env::var("PLACEMENT_HISTORY_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_HISTORY_MAX_CONNECTIONS),
            },
            chunk_size_tb: std::env::var("PLACEMENT_CHUNK_SIZE_TB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_SIZE_TB),
            dry_run: std::env::var("PLACEMENT_DRY_RUN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            namespace: std::env::var("PLACEMENT_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transfer.url.is_empty() {
            anyhow::bail!("Transfer service URL cannot be empty");
        }

        if self.transfer.instance.is_empty() {
            anyhow::bail!("Transfer service instance cannot be empty");
        }

        if !(self.chunk_size_tb.is_finite() && self.chunk_size_tb > 0.0) {
            anyhow::bail!(
                "Chunk size must be a positive number of TB, got {}",
                self.chunk_size_tb
            );
        }

        if self.history.max_connections == 0 {
            anyhow::bail!("History max_connections must be greater than 0");
        }

        if self.history.database_url.is_empty() && !self.dry_run {
            anyhow::bail!("History database URL cannot be empty");
        }

        Namespace::by_label(&self.namespace)?;

        Ok(())
    }

    /// Request size budget in bytes
    pub fn chunk_size_bytes(&self) -> u64 {
        (self.chunk_size_tb * BYTES_PER_TB) as u64
    }
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            transfer: TransferServiceConfig {
                url: DEFAULT_TRANSFER_URL.to_string(),
                instance: DEFAULT_TRANSFER_INSTANCE.to_string(),
                dbs_name: DEFAULT_DBS_NAME.to_string(),
                timeout_secs: DEFAULT_TRANSFER_TIMEOUT_SECS,
            },
            history: HistoryConfig {
                database_url: DEFAULT_HISTORY_DATABASE_URL.to_string(),
                max_connections: DEFAULT_HISTORY_MAX_CONNECTIONS,
            },
            chunk_size_tb: DEFAULT_CHUNK_SIZE_TB,
            dry_run: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}
