//! Sorting replica requests into subscription buckets
//!
//! Growing replicas become dataset-level subscriptions owned by the
//! replica's group. Fixed replicas become block-level subscriptions, bucketed
//! by the group of each block replica, so one dataset replica can feed
//! several groups.

use placement_common::types::{Block, Dataset, DatasetReplica, Group, Site};
use placement_common::{PlacementError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::transfer::SubscriptionLevel;

/// One unit of a subscription request
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionItem {
    /// The whole dataset, including blocks added later
    Dataset(Arc<Dataset>),

    /// A single block of a dataset
    Block(Arc<Dataset>, Block),
}

impl SubscriptionItem {
    /// Size counted against the request budget
    pub fn size(&self) -> u64 {
        match self {
            SubscriptionItem::Dataset(dataset) => dataset.size,
            SubscriptionItem::Block(_, block) => block.size,
        }
    }
}

/// Replica requests of one site, split by level and group
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Group -> whole datasets
    pub datasets: BTreeMap<Group, Vec<SubscriptionItem>>,

    /// Group -> individual blocks
    pub blocks: BTreeMap<Group, Vec<SubscriptionItem>>,
}

impl Classification {
    /// Buckets in submission order: dataset level first, groups by name.
    pub fn buckets(&self) -> impl Iterator<Item = (SubscriptionLevel, &Group, &[SubscriptionItem])> {
        let datasets = self
            .datasets
            .iter()
            .map(|(group, items)| (SubscriptionLevel::Dataset, group, items.as_slice()));
        let blocks = self
            .blocks
            .iter()
            .map(|(group, items)| (SubscriptionLevel::Block, group, items.as_slice()));
        datasets.chain(blocks)
    }

    pub fn item_count(&self) -> usize {
        self.datasets.values().chain(self.blocks.values()).map(Vec::len).sum()
    }
}

/// The one site every replica in the list targets.
///
/// Empty and mixed-site lists are rejected.
pub fn single_site(replicas: &[DatasetReplica]) -> Result<Arc<Site>> {
    let first = replicas.first().ok_or_else(|| {
        PlacementError::operation("Copy scheduling requires at least one replica")
    })?;

    if let Some(other) = replicas.iter().find(|r| r.site.name != first.site.name) {
        return Err(PlacementError::operation(format!(
            "Copy scheduling should be called with replicas at a single site, got {} and {}",
            first.site.name, other.site.name
        )));
    }

    Ok(first.site.clone())
}

/// Split single-site replica requests into dataset- and block-level buckets.
pub fn classify(replicas: &[DatasetReplica]) -> Result<Classification> {
    single_site(replicas)?;

    let mut classification = Classification::default();

    for replica in replicas {
        if replica.growing {
            let group = replica.group.clone().ok_or_else(|| {
                PlacementError::operation(format!(
                    "Growing replica of {} at {} has no owning group",
                    replica.dataset.name, replica.site.name
                ))
            })?;

            classification
                .datasets
                .entry(group)
                .or_default()
                .push(SubscriptionItem::Dataset(replica.dataset.clone()));
            continue;
        }

        let mut blocks_by_group: BTreeMap<&Group, Vec<&Block>> = BTreeMap::new();
        for block_replica in &replica.block_replicas {
            let blocks = blocks_by_group.entry(&block_replica.group).or_default();
            if !blocks.iter().any(|b| b.id == block_replica.block.id) {
                blocks.push(&block_replica.block);
            }
        }

        for (group, blocks) in blocks_by_group {
            classification
                .blocks
                .entry(group.clone())
                .or_default()
                .extend(
                    blocks
                        .into_iter()
                        .map(|b| SubscriptionItem::Block(replica.dataset.clone(), b.clone())),
                );
        }
    }

    Ok(classification)
}
