//! Placement Copy Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Submits replica copies to the external transfer-request service and
//! reconciles the progress it reports.
//!
//! - [`classify`]: split replica requests into dataset- and block-level buckets
//! - [`chunking`]: cut each bucket into requests under a byte budget
//! - [`CopyInterface::schedule_copies`]: submit the requests and book replicas
//! - [`CopyInterface::copy_status`]: per (site, item) progress of a request
//!
//! # Example
//!
//! ```no_run
//! use placement_copy::{config::CopyConfig, CopyInterface};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CopyConfig::load()?;
//!     let copy = CopyInterface::from_config(&config)?;
//!
//!     for ((site, item), progress) in copy.copy_status(1234567).await? {
//!         tracing::info!(%site, %item, ?progress, "status");
//!     }
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod classify;
pub mod config;
pub mod error;
pub mod history;
pub mod reconcile;
pub mod scheduler;
pub mod transfer;

pub use error::{CopyError, CopyResult};
pub use reconcile::{CopyStatus, TransferProgress};
pub use scheduler::CopyInterface;
