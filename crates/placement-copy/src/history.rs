//! History of submitted transfer requests
//!
//! Every request accepted by the transfer service is recorded with the
//! operation that produced it, so later bookkeeping can map service request
//! ids back to placement operations.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use crate::config::HistoryConfig;

/// Errors raised by a history store
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value does not fit the BIGINT column it is stored in
    #[error("{field} {value} does not fit a BIGINT column")]
    OutOfRange { field: &'static str, value: u64 },
}

fn to_bigint(field: &'static str, value: u64) -> Result<i64, HistoryError> {
    i64::try_from(value).map_err(|_| HistoryError::OutOfRange { field, value })
}

/// Kind of operation a request was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Copy,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Copy => "copy",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub request_id: u64,
    pub operation_type: OperationType,
    pub operation_id: u64,
    pub approved: bool,
}

impl RequestRecord {
    /// An auto-approved copy request
    pub fn copy(request_id: u64, operation_id: u64) -> Self {
        Self {
            request_id,
            operation_type: OperationType::Copy,
            operation_id,
            approved: true,
        }
    }
}

/// Durable log of submitted requests
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record_request(&self, record: &RequestRecord) -> Result<(), HistoryError>;
}

/// History store backed by a Postgres table
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool lazily; no connection is made until the first write.
    pub fn connect_lazy(config: &HistoryConfig) -> Result<Self, HistoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(&config.database_url)?;
        Ok(Self::new(pool))
    }

    /// Create the request table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transfer_requests (
                id BIGINT PRIMARY KEY,
                operation_type TEXT NOT NULL,
                operation_id BIGINT NOT NULL,
                approved BOOLEAN NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn record_request(&self, record: &RequestRecord) -> Result<(), HistoryError> {
        let request_id = to_bigint("request_id", record.request_id)?;
        let operation_id = to_bigint("operation_id", record.operation_id)?;

        sqlx::query(
            r#"
            INSERT INTO transfer_requests (id, operation_type, operation_id, approved)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(request_id)
        .bind(record.operation_type.as_str())
        .bind(operation_id)
        .bind(record.approved)
        .execute(&self.pool)
        .await?;

        debug!(
            request_id = record.request_id,
            operation_id = record.operation_id,
            "Recorded transfer request"
        );

        Ok(())
    }
}
