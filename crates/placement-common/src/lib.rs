//! Placement Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared entity types, naming rules and error handling for the replica
//! placement workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`PlacementError`] and the crate [`Result`] alias
//! - **Types**: datasets, blocks, sites, groups and their replicas
//! - **Identity**: the block display-name codec and full-name composition
//! - **Namespace**: per-deployment naming rules injected into constructors
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use placement_common::types::identity;
//! use placement_common::Result;
//!
//! fn block_id(full_name: &str) -> Result<u128> {
//!     let (_dataset, id) = identity::decompose(full_name)?;
//!     Ok(id)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PlacementError, Result};
