//! Splitting a subscription bucket into size-bounded requests

use placement_common::types::Group;

use crate::classify::SubscriptionItem;
use crate::transfer::{Catalog, SubscriptionLevel};

/// One request to submit: a catalog for a single (level, group)
#[derive(Debug, Clone, PartialEq)]
pub struct RequestChunk {
    pub catalog: Catalog,
    pub level: SubscriptionLevel,
    pub group: Group,

    /// Summed size of the items in the catalog
    pub size: u64,

    /// Number of items (datasets or blocks) in the catalog
    pub items: usize,
}

/// Split the items of one (level, group) bucket into requests.
///
/// Items are added in order. Once the running size reaches `budget` and more
/// items remain, the current request is closed and a new one started. The
/// last request is emitted even when it is under budget. An item larger than
/// the budget is never split; it simply closes its request.
pub fn build_chunks(
    level: SubscriptionLevel,
    group: &Group,
    items: &[SubscriptionItem],
    budget: u64,
) -> Vec<RequestChunk> {
    let mut chunks = Vec::new();
    let mut catalog = Catalog::new();
    let mut size = 0u64;
    let mut count = 0usize;

    for (index, item) in items.iter().enumerate() {
        match item {
            SubscriptionItem::Dataset(dataset) => catalog.insert_dataset(dataset.clone()),
            SubscriptionItem::Block(dataset, block) => {
                catalog.insert_block(dataset.clone(), block.clone())
            },
        }
        size = size.saturating_add(item.size());
        count += 1;

        let remaining = items.len() - index - 1;
        if size < budget && remaining != 0 {
            continue;
        }

        chunks.push(RequestChunk {
            catalog: std::mem::take(&mut catalog),
            level,
            group: group.clone(),
            size,
            items: count,
        });
        size = 0;
        count = 0;
    }

    chunks
}
