//! Copy scheduling
//!
//! Replica requests for one site are classified, cut into size-bounded
//! chunks and submitted one chunk at a time. Each chunk succeeds or fails on
//! its own; the caller gets back the replicas of the chunks that were
//! accepted and compares them with what it asked for.

use chrono::Utc;
use placement_common::types::{BlockReplica, DatasetReplica, Group, Site};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::chunking::{build_chunks, RequestChunk};
use crate::classify::{self, classify};
use crate::config::CopyConfig;
use crate::error::CopyResult;
use crate::history::{HistoryStore, PgHistoryStore, RequestRecord};
use crate::transfer::{HttpTransferService, SubscribeRequest, SubscriptionLevel, TransferService};

/// Request id reported for submissions skipped in dry-run mode.
pub const DRY_RUN_REQUEST_ID: u64 = 0;

/// Copy scheduling and status reconciliation against the transfer service
///
/// Holds only read-only settings, so one instance can serve concurrent
/// calls for different operations.
pub struct CopyInterface {
    pub(crate) transfer: Arc<dyn TransferService>,
    history: Arc<dyn HistoryStore>,
    chunk_size: u64,
    dry_run: bool,
}

impl CopyInterface {
    pub fn new(
        transfer: Arc<dyn TransferService>,
        history: Arc<dyn HistoryStore>,
        chunk_size: u64,
        dry_run: bool,
    ) -> Self {
        Self {
            transfer,
            history,
            chunk_size,
            dry_run,
        }
    }

    /// HTTP transfer service and Postgres history from configuration
    pub fn from_config(config: &CopyConfig) -> CopyResult<Self> {
        let transfer = HttpTransferService::new(&config.transfer)?;
        let history = PgHistoryStore::connect_lazy(&config.history)?;

        Ok(Self::new(
            Arc::new(transfer),
            Arc::new(history),
            config.chunk_size_bytes(),
            config.dry_run,
        ))
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Submit copies of the given replicas, which must all be at one site.
    ///
    /// Returns one replica per dataset that had at least one accepted
    /// request. Growing replicas come back with a zero-size block replica
    /// for every block of the dataset; fixed replicas with one per requested
    /// block.
    #[instrument(skip(self, replicas, comments), fields(replicas = replicas.len()))]
    pub async fn schedule_copies(
        &self,
        replicas: &[DatasetReplica],
        operation_id: u64,
        comments: &str,
    ) -> CopyResult<Vec<DatasetReplica>> {
        let site = classify::single_site(replicas)?;

        info!(
            site = %site.name,
            operation_id,
            dry_run = self.dry_run,
            "Scheduling copy of {} replicas",
            replicas.len()
        );

        let classification = classify(replicas)?;

        let mut booked: BTreeMap<String, DatasetReplica> = BTreeMap::new();

        for (level, group, items) in classification.buckets() {
            for chunk in build_chunks(level, group, items, self.chunk_size) {
                let Some(accepted) = self.submit(&site, chunk, operation_id, comments).await else {
                    continue;
                };

                for replica in accepted {
                    match booked.get_mut(&replica.dataset.name) {
                        Some(existing) => {
                            existing.merge(replica)?;
                        },
                        None => {
                            booked.insert(replica.dataset.name.clone(), replica);
                        },
                    }
                }
            }
        }

        Ok(booked.into_values().collect())
    }

    /// Submit one chunk. `None` when the service did not accept it.
    async fn submit(
        &self,
        site: &Arc<Site>,
        chunk: RequestChunk,
        operation_id: u64,
        comments: &str,
    ) -> Option<Vec<DatasetReplica>> {
        let data = match self.transfer.catalog_data(&chunk.catalog) {
            Ok(data) => data,
            Err(err) => {
                error!(
                    error = %err,
                    kind = err.kind(),
                    site = %site.name,
                    group = %chunk.group,
                    level = %chunk.level,
                    "Copy request could not be built"
                );
                return None;
            },
        };

        let request = SubscribeRequest::copy(
            site.name.clone(),
            data,
            chunk.level,
            chunk.group.name.clone(),
            comments,
        );

        let request_id = if self.dry_run {
            DRY_RUN_REQUEST_ID
        } else {
            match self.transfer.subscribe(&request).await {
                Ok(id) => id,
                Err(err) => {
                    // TODO: retry network errors once the service tolerates duplicate submissions
                    error!(error = %err, kind = err.kind(), request = ?request, "Copy request failed");
                    return None;
                },
            }
        };

        warn!(
            request_id,
            site = %site.name,
            group = %chunk.group,
            level = %chunk.level,
            items = chunk.items,
            bytes = chunk.size,
            "Subscription request accepted"
        );

        if !self.dry_run {
            let record = RequestRecord::copy(request_id, operation_id);
            if let Err(err) = self.history.record_request(&record).await {
                error!(
                    error = %err,
                    request_id,
                    operation_id,
                    "Failed to record accepted request in history"
                );
            }
        }

        Some(book_replicas(site, chunk))
    }
}

/// Placeholder replicas for every entry of an accepted chunk
fn book_replicas(site: &Arc<Site>, chunk: RequestChunk) -> Vec<DatasetReplica> {
    let now = Utc::now();
    let group: Group = chunk.group;

    chunk
        .catalog
        .into_entries()
        .map(|entry| {
            let (growing, owner, blocks) = match chunk.level {
                SubscriptionLevel::Dataset => {
                    (true, Some(group.clone()), entry.dataset.blocks.clone())
                },
                SubscriptionLevel::Block => (false, None, entry.blocks),
            };

            let mut replica = DatasetReplica::new(entry.dataset, site.clone(), growing, owner);
            for block in blocks {
                let mut block_replica = BlockReplica::placeholder(block, site.clone(), group.clone());
                block_replica.last_update = now;
                replica.add_block_replica(block_replica);
            }
            replica
        })
        .collect()
}
