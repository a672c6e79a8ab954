//! Replica plans
//!
//! A plan is a JSON document naming one destination site, the datasets the
//! replicas refer to, and the replicas to create:
//!
//! ```json
//! {
//!   "site": {"name": "T2_XX_Test"},
//!   "datasets": [
//!     {"name": "/A/B/AOD", "data_type": "data", "is_open": false,
//!      "blocks": [{"name": "00000000-0000-0000-0000-000000000001", "size": 1000}]}
//!   ],
//!   "replicas": [
//!     {"dataset": "/A/B/AOD", "growing": true, "group": "DataOps"},
//!     {"dataset": "/A/B/AOD", "group": "AnalysisOps",
//!      "blocks": ["00000000-0000-0000-0000-000000000001"]}
//!   ]
//! }
//! ```
//!
//! A fixed replica with no `blocks` list asks for every block of the dataset.
//! Datasets are open and blocks closed unless `is_open` says otherwise.

use anyhow::{anyhow, Context, Result};
use placement_common::types::{
    identity, BlockReplica, Dataset, DatasetReplica, Group, Namespace, Site, SoftwareVersion,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ReplicaPlan {
    pub site: Site,
    pub datasets: Vec<DatasetPlan>,
    pub replicas: Vec<ReplicaEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetPlan {
    pub name: String,

    #[serde(default)]
    pub data_type: Option<String>,

    /// Tuple literal, e.g. `(8, 0, 21, 'patch1')`
    #[serde(default)]
    pub software_version: Option<String>,

    #[serde(default)]
    pub is_open: Option<bool>,

    #[serde(default)]
    pub blocks: Vec<BlockPlan>,
}

#[derive(Debug, Deserialize)]
pub struct BlockPlan {
    /// Display name
    pub name: String,
    pub size: u64,

    #[serde(default)]
    pub is_open: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplicaEntry {
    pub dataset: String,

    #[serde(default)]
    pub growing: bool,

    pub group: String,

    /// Block display names; empty means all blocks
    #[serde(default)]
    pub blocks: Vec<String>,
}

impl ReplicaPlan {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse plan {}", path.display()))
    }

    /// Build the replica requests, validating every name against `namespace`.
    pub fn into_replicas(self, namespace: &Namespace) -> Result<Vec<DatasetReplica>> {
        let site = Arc::new(self.site);

        let mut datasets: HashMap<String, Arc<Dataset>> = HashMap::new();
        for plan in self.datasets {
            let dataset = plan.build(namespace)?;
            datasets.insert(dataset.name.clone(), Arc::new(dataset));
        }

        self.replicas
            .into_iter()
            .map(|entry| {
                let dataset = datasets
                    .get(&entry.dataset)
                    .ok_or_else(|| anyhow!("Replica refers to unknown dataset {}", entry.dataset))?;
                entry.build(dataset, &site)
            })
            .collect()
    }
}

impl DatasetPlan {
    fn build(self, namespace: &Namespace) -> Result<Dataset> {
        let mut dataset = Dataset::new(namespace, self.name)?;

        if let Some(data_type) = self.data_type {
            dataset = dataset.with_data_type(namespace.data_type(&data_type)?);
        }

        if let Some(version) = self.software_version {
            dataset = dataset.with_software_version(version.parse::<SoftwareVersion>()?);
        }

        if let Some(is_open) = self.is_open {
            dataset = dataset.with_open(is_open);
        }

        for block in self.blocks {
            let id = dataset.add_block(namespace, &block.name, block.size)?.id;
            if block.is_open {
                dataset.set_block_open(id, true)?;
            }
        }

        Ok(dataset)
    }
}

impl ReplicaEntry {
    fn build(self, dataset: &Arc<Dataset>, site: &Arc<Site>) -> Result<DatasetReplica> {
        let group = Group::new(self.group);

        if self.growing {
            return Ok(DatasetReplica::new(dataset.clone(), site.clone(), true, Some(group)));
        }

        let mut replica = DatasetReplica::new(dataset.clone(), site.clone(), false, None);

        if self.blocks.is_empty() {
            for block in &dataset.blocks {
                replica.add_block_replica(BlockReplica::placeholder(
                    block.clone(),
                    site.clone(),
                    group.clone(),
                ));
            }
            return Ok(replica);
        }

        for display_name in &self.blocks {
            let id = identity::encode(display_name)?;
            let block = dataset.find_block(id).ok_or_else(|| {
                anyhow!(
                    "Block {} is not part of the plan",
                    identity::compose(&dataset.name, display_name)
                )
            })?;
            replica.add_block_replica(BlockReplica::placeholder(
                block.clone(),
                site.clone(),
                group.clone(),
            ));
        }

        Ok(replica)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use placement_common::types::DataType;
    use serde_json::json;

    fn plan(value: serde_json::Value) -> ReplicaPlan {
        serde_json::from_value(value).unwrap()
    }

    fn namespace() -> Namespace {
        Namespace::standard().unwrap()
    }

    #[test]
    fn test_fixed_replica_defaults_to_all_blocks() {
        let replicas = plan(json!({
            "site": {"name": "T2_XX_Test"},
            "datasets": [{"name": "/A/B/AOD", "blocks": [
                {"name": "00000000-0000-0000-0000-000000000001", "size": 10},
                {"name": "00000000-0000-0000-0000-000000000002", "size": 20}
            ]}],
            "replicas": [{"dataset": "/A/B/AOD", "group": "AnalysisOps"}]
        }))
        .into_replicas(&namespace())
        .unwrap();

        assert_eq!(replicas.len(), 1);
        assert!(!replicas[0].growing);
        assert_eq!(replicas[0].block_replicas.len(), 2);
        assert_eq!(replicas[0].dataset.size, 30);
        assert_eq!(replicas[0].site.name, "T2_XX_Test");
    }

    #[test]
    fn test_growing_replica_and_dataset_attributes() {
        let replicas = plan(json!({
            "site": {"name": "T1_XX_Test", "backend": "/store/test"},
            "datasets": [{"name": "/A/B/AOD", "data_type": "mc", "software_version": "(8, 0, 21, 'patch1')"}],
            "replicas": [{"dataset": "/A/B/AOD", "growing": true, "group": "DataOps"}]
        }))
        .into_replicas(&namespace())
        .unwrap();

        let replica = &replicas[0];
        assert!(replica.growing);
        assert_eq!(replica.group, Some(Group::new("DataOps")));
        assert_eq!(replica.dataset.data_type, DataType::Mc);
        assert!(replica.dataset.software_version.is_some());
        assert_eq!(replica.site.backend, "/store/test");
    }

    #[test]
    fn test_data_type_outside_namespace_is_rejected() {
        let result = plan(json!({
            "site": {"name": "T2_XX_Test"},
            "datasets": [{"name": "/A/B/AOD", "data_type": "simulation"}],
            "replicas": []
        }))
        .into_replicas(&namespace());

        assert!(result.unwrap_err().to_string().contains("simulation"));
    }

    #[test]
    fn test_open_flags_from_plan() {
        let replicas = plan(json!({
            "site": {"name": "T2_XX_Test"},
            "datasets": [{"name": "/A/B/AOD", "is_open": false, "blocks": [
                {"name": "00000000-0000-0000-0000-000000000001", "size": 10},
                {"name": "00000000-0000-0000-0000-000000000002", "size": 20, "is_open": true}
            ]}],
            "replicas": [{"dataset": "/A/B/AOD", "group": "AnalysisOps"}]
        }))
        .into_replicas(&namespace())
        .unwrap();

        let dataset = &replicas[0].dataset;
        assert!(!dataset.is_open);
        assert!(!dataset.blocks[0].is_open);
        assert!(dataset.blocks[1].is_open);
    }

    #[test]
    fn test_listed_block_must_exist() {
        let result = plan(json!({
            "site": {"name": "T2_XX_Test"},
            "datasets": [{"name": "/A/B/AOD", "blocks": [
                {"name": "00000000-0000-0000-0000-000000000001", "size": 10}
            ]}],
            "replicas": [{"dataset": "/A/B/AOD", "group": "AnalysisOps",
                          "blocks": ["00000000-0000-0000-0000-000000000009"]}]
        }))
        .into_replicas(&namespace());

        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_dataset_is_rejected() {
        let result = plan(json!({
            "site": {"name": "T2_XX_Test"},
            "datasets": [],
            "replicas": [{"dataset": "/A/B/AOD", "group": "AnalysisOps"}]
        }))
        .into_replicas(&namespace());

        assert!(result.unwrap_err().to_string().contains("unknown dataset"));
    }

    #[test]
    fn test_invalid_dataset_name_is_rejected() {
        let result = plan(json!({
            "site": {"name": "T2_XX_Test"},
            "datasets": [{"name": "not-a-dataset"}],
            "replicas": []
        }))
        .into_replicas(&namespace());

        assert!(result.is_err());
    }
}
