//! Subcommand implementations
//!
//! `schedule` and `status` print JSON to stdout; logs go to stderr.

use anyhow::Result;
use placement_common::types::{DatasetReplica, Namespace};
use placement_copy::config::CopyConfig;
use placement_copy::history::PgHistoryStore;
use placement_copy::{CopyInterface, CopyStatus, TransferProgress};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::plan::ReplicaPlan;

/// One booked replica in the `schedule` output
#[derive(Debug, Serialize)]
pub struct BookedReplica {
    pub dataset: String,
    pub site: String,
    pub growing: bool,
    pub group: Option<String>,
    pub blocks: usize,
}

impl From<&DatasetReplica> for BookedReplica {
    fn from(replica: &DatasetReplica) -> Self {
        Self {
            dataset: replica.dataset.name.clone(),
            site: replica.site.name.clone(),
            growing: replica.growing,
            group: replica.group.as_ref().map(|g| g.name.clone()),
            blocks: replica.block_replicas.len(),
        }
    }
}

/// One (site, item) line in the `status` output
#[derive(Debug, Serialize)]
pub struct StatusEntry {
    pub site: String,
    pub item: String,
    pub progress: Option<TransferProgress>,
}

pub fn status_entries(status: CopyStatus) -> Vec<StatusEntry> {
    status
        .into_iter()
        .map(|((site, item), progress)| StatusEntry {
            site,
            item,
            progress,
        })
        .collect()
}

/// Submit the replicas of a plan file and print what was booked.
pub async fn schedule(
    config: &CopyConfig,
    plan_path: &Path,
    operation_id: u64,
    comments: &str,
) -> Result<()> {
    let namespace = Namespace::by_label(&config.namespace)?;
    let replicas = ReplicaPlan::from_file(plan_path)?.into_replicas(&namespace)?;

    let copy = CopyInterface::from_config(config)?;
    let booked = copy.schedule_copies(&replicas, operation_id, comments).await?;

    info!(
        requested = replicas.len(),
        booked = booked.len(),
        "Copy scheduling finished"
    );

    let output: Vec<BookedReplica> = booked.iter().map(BookedReplica::from).collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print the reconciled status of one request.
pub async fn status(config: &CopyConfig, request_id: u64) -> Result<()> {
    let copy = CopyInterface::from_config(config)?;
    let status = copy.copy_status(request_id).await?;

    info!(request_id, items = status.len(), "Status reconciled");

    println!("{}", serde_json::to_string_pretty(&status_entries(status))?);
    Ok(())
}

/// Create the history table used to record accepted requests.
pub async fn init_history(config: &CopyConfig) -> Result<()> {
    let store = PgHistoryStore::connect_lazy(&config.history)?;
    store.ensure_schema().await?;

    info!("History schema is in place");
    Ok(())
}
