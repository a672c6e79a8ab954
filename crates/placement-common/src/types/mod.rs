//! Entity types shared across the placement workspace
//!
//! Datasets own their blocks. Replicas associate datasets and blocks with a
//! storage site and an ownership group.

pub mod identity;
pub mod namespace;
pub mod software_version;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{PlacementError, Result};

pub use namespace::{DataType, Namespace};
pub use software_version::{SoftwareVersion, VersionField};

// ============================================================================
// Catalog entities
// ============================================================================

/// A named collection of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Hierarchical name, e.g. `/Primary/Processed/TIER`
    pub name: String,

    /// Total size in bytes
    pub size: u64,

    /// Member blocks
    pub blocks: Vec<Block>,

    pub software_version: Option<SoftwareVersion>,

    pub data_type: DataType,

    /// Whether the dataset still accepts new blocks
    pub is_open: bool,
}

impl Dataset {
    /// Create an empty dataset, validating the name against the namespace.
    pub fn new(namespace: &Namespace, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        namespace.validate_dataset_name(&name)?;

        Ok(Self {
            name,
            size: 0,
            blocks: Vec::new(),
            software_version: None,
            data_type: DataType::default(),
            is_open: true,
        })
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_software_version(mut self, version: SoftwareVersion) -> Self {
        self.software_version = Some(version);
        self
    }

    /// Add a block by display name. The dataset size grows by the block size.
    pub fn add_block(
        &mut self,
        namespace: &Namespace,
        display_name: &str,
        size: u64,
    ) -> Result<&Block> {
        namespace.validate_block_name(display_name)?;
        let id = identity::encode(display_name)?;

        if self.find_block(id).is_some() {
            return Err(PlacementError::operation(format!(
                "Block {} already exists",
                identity::compose(&self.name, display_name)
            )));
        }

        self.blocks.push(Block {
            dataset: self.name.clone(),
            id,
            size,
            is_open: false,
        });
        self.size += size;

        let index = self.blocks.len() - 1;
        Ok(&self.blocks[index])
    }

    pub fn find_block(&self, id: u128) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Mark the dataset open or closed to new blocks.
    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    /// Mark one block open or closed. Blocks are added closed.
    pub fn set_block_open(&mut self, id: u128, is_open: bool) -> Result<()> {
        let dataset = &self.name;
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| {
                PlacementError::operation(format!(
                    "Block {} is not part of {}",
                    identity::decode(id),
                    dataset
                ))
            })?;
        block.is_open = is_open;
        Ok(())
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A unit of data transfer inside a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    /// Name of the owning dataset
    pub dataset: String,

    /// Internal 128-bit identity
    pub id: u128,

    /// Size in bytes
    pub size: u64,

    pub is_open: bool,
}

impl Block {
    /// Dashed-hex display name
    pub fn name(&self) -> String {
        identity::decode(self.id)
    }

    /// `<dataset>#<display name>`
    pub fn full_name(&self) -> String {
        identity::compose(&self.dataset, &self.name())
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A storage endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    pub name: String,

    /// Prefix prepended to logical file names to form site-local paths
    #[serde(default)]
    pub backend: String,
}

impl Site {
    pub fn new(name: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
        }
    }

    /// Logical file name to physical file name
    pub fn to_pfn(&self, lfn: &str) -> String {
        format!("{}{}", self.backend, lfn)
    }

    /// Physical file name to logical file name
    pub fn to_lfn<'a>(&self, pfn: &'a str) -> &'a str {
        pfn.strip_prefix(self.backend.as_str()).unwrap_or(pfn)
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ownership / accounting label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Replicas
// ============================================================================

/// A block placed at a site on behalf of a group
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReplica {
    pub block: Block,
    pub site: Arc<Site>,
    pub group: Group,

    /// Bytes present at the site; 0 until the transfer has been observed
    pub size: u64,

    pub last_update: DateTime<Utc>,
}

impl BlockReplica {
    pub fn new(block: Block, site: Arc<Site>, group: Group, size: u64) -> Self {
        Self {
            block,
            site,
            group,
            size,
            last_update: Utc::now(),
        }
    }

    /// Zero-size replica recorded right after a subscription is accepted.
    pub fn placeholder(block: Block, site: Arc<Site>, group: Group) -> Self {
        Self::new(block, site, group, 0)
    }
}

/// A dataset placed at a site
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReplica {
    pub dataset: Arc<Dataset>,
    pub site: Arc<Site>,

    /// Whole-dataset replica that also covers blocks added later
    pub growing: bool,

    /// Owning group of a growing replica. Fixed replicas carry the group on
    /// each block replica instead.
    pub group: Option<Group>,

    pub block_replicas: Vec<BlockReplica>,
}

impl DatasetReplica {
    pub fn new(dataset: Arc<Dataset>, site: Arc<Site>, growing: bool, group: Option<Group>) -> Self {
        Self {
            dataset,
            site,
            growing,
            group,
            block_replicas: Vec::new(),
        }
    }

    pub fn find_block_replica(&self, block_id: u128) -> Option<&BlockReplica> {
        self.block_replicas.iter().find(|r| r.block.id == block_id)
    }

    /// Add a block replica unless one already exists for the same block.
    /// Returns whether the replica was added.
    pub fn add_block_replica(&mut self, replica: BlockReplica) -> bool {
        if self.find_block_replica(replica.block.id).is_some() {
            return false;
        }
        self.block_replicas.push(replica);
        true
    }

    /// Fold another replica of the same dataset at the same site into this
    /// one. Returns the number of block replicas added.
    pub fn merge(&mut self, other: DatasetReplica) -> Result<usize> {
        if other.dataset.name != self.dataset.name || other.site.name != self.site.name {
            return Err(PlacementError::operation(format!(
                "Cannot merge replica of {} at {} into replica of {} at {}",
                other.dataset.name, other.site.name, self.dataset.name, self.site.name
            )));
        }

        let mut added = 0;
        for replica in other.block_replicas {
            if self.add_block_replica(replica) {
                added += 1;
            }
        }

        Ok(added)
    }

    /// Bytes present at the site across all block replicas
    pub fn size(&self) -> u64 {
        self.block_replicas.iter().map(|r| r.size).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn dataset_with_blocks(n: u128) -> Dataset {
        let ns = Namespace::standard().unwrap();
        let mut dataset = Dataset::new(&ns, "/Prim/Proc/RAW").unwrap();
        for i in 1..=n {
            dataset.add_block(&ns, &identity::decode(i), 10).unwrap();
        }
        dataset
    }

    #[test]
    fn test_dataset_rejects_bad_name() {
        let ns = Namespace::standard().unwrap();
        assert!(matches!(
            Dataset::new(&ns, "not-a-dataset"),
            Err(PlacementError::Format(_))
        ));
    }

    #[test]
    fn test_add_block_tracks_size_and_owner() {
        let dataset = dataset_with_blocks(3);
        assert_eq!(dataset.size, 30);
        assert_eq!(dataset.blocks.len(), 3);
        assert_eq!(
            dataset.blocks[0].full_name(),
            "/Prim/Proc/RAW#00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn test_add_block_rejects_duplicate() {
        let ns = Namespace::standard().unwrap();
        let mut dataset = dataset_with_blocks(1);
        assert!(dataset.add_block(&ns, &identity::decode(1), 5).is_err());
        assert_eq!(dataset.size, 10);
    }

    #[test]
    fn test_open_flags() {
        let mut dataset = dataset_with_blocks(2).with_open(false);
        assert!(!dataset.is_open);
        assert!(dataset.blocks.iter().all(|b| !b.is_open));

        dataset.set_block_open(2, true).unwrap();
        assert!(!dataset.find_block(1).unwrap().is_open);
        assert!(dataset.find_block(2).unwrap().is_open);

        assert!(matches!(
            dataset.set_block_open(9, true),
            Err(PlacementError::Operation(_))
        ));
    }

    #[test]
    fn test_site_path_translation() {
        let site = Site::new("T2_XX_Site", "davs://storage.example.org:2880/store");
        let pfn = site.to_pfn("/data/file.root");
        assert_eq!(pfn, "davs://storage.example.org:2880/store/data/file.root");
        assert_eq!(site.to_lfn(&pfn), "/data/file.root");
        assert_eq!(site.to_lfn("/unrelated/path"), "/unrelated/path");
    }

    #[test]
    fn test_merge_unions_without_duplicates() {
        let dataset = Arc::new(dataset_with_blocks(3));
        let site = Arc::new(Site::new("T1_XX_Site", ""));
        let group = Group::new("analysis");

        let mut first = DatasetReplica::new(dataset.clone(), site.clone(), false, None);
        for block in &dataset.blocks[..2] {
            first.add_block_replica(BlockReplica::placeholder(block.clone(), site.clone(), group.clone()));
        }

        let mut second = DatasetReplica::new(dataset.clone(), site.clone(), false, None);
        for block in &dataset.blocks[1..] {
            second.add_block_replica(BlockReplica::placeholder(
                block.clone(),
                site.clone(),
                Group::new("production"),
            ));
        }

        let added = first.merge(second).unwrap();
        assert_eq!(added, 1);
        assert_eq!(first.block_replicas.len(), 3);
        // the block present in both keeps its original replica
        assert_eq!(
            first.find_block_replica(dataset.blocks[1].id).unwrap().group,
            group
        );
    }

    #[test]
    fn test_merge_rejects_other_site() {
        let dataset = Arc::new(dataset_with_blocks(1));
        let mut a = DatasetReplica::new(dataset.clone(), Arc::new(Site::new("A", "")), true, None);
        let b = DatasetReplica::new(dataset, Arc::new(Site::new("B", "")), true, None);
        assert!(a.merge(b).is_err());
    }
}
