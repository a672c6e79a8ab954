//! Status reconciliation of submitted copy requests
//!
//! The transfer service reports progress per subscription, and a block-level
//! request may since have been subsumed by a dataset-level subscription of
//! the same dataset at the same site. In that case the subscriptions query no
//! longer lists the requested blocks, and their progress has to be read from
//! the site's block replicas instead.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, error, instrument};

use crate::error::CopyResult;
use crate::scheduler::CopyInterface;
use crate::transfer::{SubscriptionDataset, SubscriptionLevel, SUBSCRIPTION_QUERY_CHUNK};

/// Progress of one requested item at one site
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferProgress {
    /// Bytes the site should end up with
    pub expected_bytes: u64,

    /// Bytes already at the site
    pub transferred_bytes: u64,

    /// Unix time of the last update reported by the service
    pub last_update: f64,
}

/// (site name, dataset or block name) -> progress.
///
/// `None` marks a requested item for which the service has no subscription
/// at that site, which is different from a subscription with no progress.
pub type CopyStatus = BTreeMap<(String, String), Option<TransferProgress>>;

impl CopyInterface {
    /// Current status of every (destination, item) pair of a request.
    ///
    /// An unknown request id gives an empty map.
    #[instrument(skip(self))]
    pub async fn copy_status(&self, request_id: u64) -> CopyResult<CopyStatus> {
        let mut status = CopyStatus::new();

        let requests = self.transfer.transfer_requests(request_id).await?;
        let Some(request) = requests.first() else {
            debug!(request_id, "Request not known to the transfer service");
            return Ok(status);
        };

        // a single request can have multiple destinations
        let site_names = request.site_names();
        let dataset_names = request.dataset_names();
        let block_names = request.block_names();

        if !dataset_names.is_empty() {
            self.dataset_status(&site_names, &dataset_names, &mut status)
                .await?;
        }

        if !block_names.is_empty() {
            self.block_status(&site_names, &block_names, &mut status)
                .await?;
        }

        // whatever did not appear in the subscriptions
        for site_name in &site_names {
            for name in dataset_names.iter().chain(block_names.iter()) {
                status
                    .entry((site_name.clone(), name.clone()))
                    .or_insert(None);
            }
        }

        Ok(status)
    }

    async fn query_subscriptions(
        &self,
        site_names: &[String],
        level: SubscriptionLevel,
        names: &[String],
    ) -> CopyResult<Vec<SubscriptionDataset>> {
        let mut subscriptions = Vec::new();
        for site_name in site_names {
            for chunk in names.chunks(SUBSCRIPTION_QUERY_CHUNK) {
                subscriptions.extend(self.transfer.subscriptions(site_name, level, chunk).await?);
            }
        }
        Ok(subscriptions)
    }

    async fn dataset_status(
        &self,
        site_names: &[String],
        dataset_names: &[String],
        status: &mut CopyStatus,
    ) -> CopyResult<()> {
        let subscriptions = self
            .query_subscriptions(site_names, SubscriptionLevel::Dataset, dataset_names)
            .await?;

        for dataset in subscriptions {
            let Some(record) = dataset.dataset_subscription() else {
                error!(dataset = %dataset.name, "Subscription should exist but doesn't");
                continue;
            };

            let mut expected_bytes = dataset.bytes;
            let transferred_bytes = match record.node_bytes {
                None => 0,
                Some(node_bytes) => {
                    if node_bytes != expected_bytes {
                        // blocks may have been deleted since the subscription was made
                        let blocks = self
                            .transfer
                            .block_replicas(&record.node, &dataset.name)
                            .await?;
                        expected_bytes = blocks.iter().map(|b| b.bytes).sum();
                    }
                    node_bytes
                },
            };

            status.insert(
                (record.node.clone(), dataset.name.clone()),
                Some(TransferProgress {
                    expected_bytes,
                    transferred_bytes,
                    last_update: record.time_update,
                }),
            );
        }

        Ok(())
    }

    async fn block_status(
        &self,
        site_names: &[String],
        block_names: &[String],
        status: &mut CopyStatus,
    ) -> CopyResult<()> {
        let subscriptions = self
            .query_subscriptions(site_names, SubscriptionLevel::Block, block_names)
            .await?;

        let mut overridden: HashSet<(String, String)> = HashSet::new();

        for dataset in subscriptions {
            let Some(blocks) = &dataset.block else {
                self.expand_override(&dataset, block_names, &mut overridden, status)
                    .await?;
                continue;
            };

            for block in blocks {
                let Some(record) = block.block_subscription() else {
                    error!(block = %block.name, "Subscription should exist but doesn't");
                    continue;
                };

                status.insert(
                    (record.node.clone(), block.name.clone()),
                    Some(TransferProgress {
                        expected_bytes: block.bytes,
                        transferred_bytes: record.node_bytes.unwrap_or(0),
                        last_update: record.time_update,
                    }),
                );
            }
        }

        Ok(())
    }

    /// A dataset entry without block records in a block-level query: a
    /// dataset-level subscription has taken over the requested blocks.
    /// Their progress comes from the site's block replicas.
    async fn expand_override(
        &self,
        dataset: &SubscriptionDataset,
        block_names: &[String],
        overridden: &mut HashSet<(String, String)>,
        status: &mut CopyStatus,
    ) -> CopyResult<()> {
        let Some(record) = dataset.dataset_subscription() else {
            error!(
                dataset = %dataset.name,
                "Subscription is neither block-level nor dataset-level"
            );
            return Ok(());
        };

        if !overridden.insert((record.node.clone(), dataset.name.clone())) {
            // already expanded for this site
            return Ok(());
        }

        debug!(
            dataset = %dataset.name,
            site = %record.node,
            "Block-level subscription is overridden"
        );

        let prefix = format!("{}#", dataset.name);
        let requested: HashSet<&str> = block_names
            .iter()
            .filter(|name| name.starts_with(&prefix))
            .map(String::as_str)
            .collect();

        let replicas = self
            .transfer
            .block_replicas(&record.node, &dataset.name)
            .await?;

        for block in replicas {
            if !requested.contains(block.name.as_str()) {
                continue;
            }

            let Some(replica) = block.first_replica() else {
                error!(block = %block.name, site = %record.node, "Block replica should exist but doesn't");
                continue;
            };

            status.insert(
                (record.node.clone(), block.name.clone()),
                Some(TransferProgress {
                    expected_bytes: block.bytes,
                    transferred_bytes: replica.bytes,
                    last_update: replica.time_update,
                }),
            );
        }

        Ok(())
    }
}
