//! Error types for copy scheduling and status reconciliation

use placement_common::PlacementError;
use thiserror::Error;

use crate::history::HistoryError;
use crate::transfer::TransferError;

/// Result type alias for copy operations
pub type CopyResult<T> = std::result::Result<T, CopyError>;

/// Errors surfaced by [`crate::CopyInterface`]
///
/// Scheduling only fails on contract violations; per-request submission
/// failures are logged and skipped. Status reconciliation propagates
/// transfer service failures.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
