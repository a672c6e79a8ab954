//! Request catalogs
//!
//! A catalog maps each dataset of a request to the blocks requested from it.
//! An empty block list means the whole dataset. The transfer service takes
//! the catalog as an XML document:
//!
//! ```xml
//! <data version="2.0">
//!   <dbs name="https://dbs.example.org/DBSReader">
//!     <dataset name="/A/B/C" is-open="y">
//!       <block name="/A/B/C#0000...0001" is-open="n"/>
//!     </dataset>
//!   </dbs>
//! </data>
//! ```

use placement_common::types::{Block, Dataset};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::TransferError;

/// Datasets of one entry and the blocks requested from it
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub dataset: Arc<Dataset>,

    /// Empty for a whole-dataset request
    pub blocks: Vec<Block>,
}

/// Dataset name -> requested blocks, ordered by dataset name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the whole dataset.
    pub fn insert_dataset(&mut self, dataset: Arc<Dataset>) {
        self.entries
            .entry(dataset.name.clone())
            .or_insert_with(|| CatalogEntry {
                dataset,
                blocks: Vec::new(),
            });
    }

    /// Request one block of a dataset.
    pub fn insert_block(&mut self, dataset: Arc<Dataset>, block: Block) {
        let entry = self
            .entries
            .entry(dataset.name.clone())
            .or_insert_with(|| CatalogEntry {
                dataset,
                blocks: Vec::new(),
            });

        if !entry.blocks.iter().any(|b| b.id == block.id) {
            entry.blocks.push(block);
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn into_entries(self) -> impl Iterator<Item = CatalogEntry> {
        self.entries.into_values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of blocks listed across all entries
    pub fn block_count(&self) -> usize {
        self.entries.values().map(|e| e.blocks.len()).sum()
    }

    /// Serialize as the service's XML catalog under the given DBS instance.
    pub fn to_xml(&self, dbs_name: &str) -> Result<String, TransferError> {
        let document = DataXml {
            version: "2.0",
            dbs: DbsXml {
                name: dbs_name.to_string(),
                dataset: self
                    .entries
                    .values()
                    .map(|entry| DatasetXml {
                        name: entry.dataset.name.clone(),
                        is_open: yes_no(entry.dataset.is_open),
                        block: entry
                            .blocks
                            .iter()
                            .map(|block| BlockXml {
                                name: block.full_name(),
                                is_open: yes_no(block.is_open),
                            })
                            .collect(),
                    })
                    .collect(),
            },
        };

        quick_xml::se::to_string(&document).map_err(|e| TransferError::Catalog(e.to_string()))
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "y"
    } else {
        "n"
    }
}

#[derive(Serialize)]
#[serde(rename = "data")]
struct DataXml {
    #[serde(rename = "@version")]
    version: &'static str,
    dbs: DbsXml,
}

#[derive(Serialize)]
struct DbsXml {
    #[serde(rename = "@name")]
    name: String,
    dataset: Vec<DatasetXml>,
}

#[derive(Serialize)]
struct DatasetXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@is-open")]
    is_open: &'static str,
    block: Vec<BlockXml>,
}

#[derive(Serialize)]
struct BlockXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@is-open")]
    is_open: &'static str,
}
