//! Shared fixtures for placement-copy integration tests
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use placement_common::types::{identity, Dataset, Namespace, Site};
use placement_copy::history::{HistoryError, HistoryStore, RequestRecord};
use placement_copy::transfer::{
    BlockReplicaEntry, Catalog, SubscribeRequest, SubscriptionDataset, SubscriptionLevel,
    TransferError, TransferRequest, TransferService,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const TB: u64 = 1_000_000_000_000;

pub fn namespace() -> Namespace {
    Namespace::standard().unwrap()
}

/// Dataset with blocks numbered from 1, each of the given size
pub fn dataset(name: &str, blocks: usize, block_size: u64) -> Arc<Dataset> {
    let ns = namespace();
    let mut dataset = Dataset::new(&ns, name).unwrap();
    for i in 1..=blocks {
        dataset
            .add_block(&ns, &identity::decode(i as u128), block_size)
            .unwrap();
    }
    Arc::new(dataset)
}

pub fn site(name: &str) -> Arc<Site> {
    Arc::new(Site::new(name, ""))
}

pub fn block_name(dataset: &str, n: u128) -> String {
    identity::compose(dataset, &identity::decode(n))
}

/// In-process transfer service with scripted answers
#[derive(Default)]
pub struct FakeTransferService {
    next_id: Mutex<u64>,
    failing_submissions: Mutex<HashSet<usize>>,
    submitted: Mutex<Vec<SubscribeRequest>>,

    requests: Mutex<HashMap<u64, Value>>,
    subscriptions: Mutex<HashMap<String, Vec<Value>>>,
    block_replicas: Mutex<HashMap<(String, String), Vec<Value>>>,

    subscription_calls: Mutex<Vec<(String, SubscriptionLevel, usize)>>,
    block_replica_calls: Mutex<Vec<(String, String)>>,
}

impl FakeTransferService {
    pub fn new() -> Arc<Self> {
        let service = Self::default();
        *service.next_id.lock().unwrap() = 1000;
        Arc::new(service)
    }

    /// Make the n-th subscribe call (0-based) fail with a service error.
    pub fn fail_submission(&self, n: usize) {
        self.failing_submissions.lock().unwrap().insert(n);
    }

    pub fn submitted(&self) -> Vec<SubscribeRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn add_request(&self, id: u64, sites: &[&str], datasets: &[&str], blocks: &[String]) {
        let request = serde_json::json!({
            "id": id,
            "destinations": {"node": sites.iter().map(|s| serde_json::json!({"name": s})).collect::<Vec<_>>()},
            "data": {"dbs": {
                "name": "test-dbs",
                "dataset": datasets.iter().map(|d| serde_json::json!({"name": d})).collect::<Vec<_>>(),
                "block": blocks.iter().map(|b| serde_json::json!({"name": b})).collect::<Vec<_>>(),
            }}
        });
        self.requests.lock().unwrap().insert(id, request);
    }

    /// Dataset entry returned by `subscriptions` at `node`
    pub fn add_subscription(&self, node: &str, entry: Value) {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(node.to_string())
            .or_default()
            .push(entry);
    }

    pub fn add_block_replicas(&self, node: &str, dataset: &str, entries: Vec<Value>) {
        self.block_replicas
            .lock()
            .unwrap()
            .insert((node.to_string(), dataset.to_string()), entries);
    }

    pub fn subscription_calls(&self) -> Vec<(String, SubscriptionLevel, usize)> {
        self.subscription_calls.lock().unwrap().clone()
    }

    pub fn block_replica_calls(&self) -> Vec<(String, String)> {
        self.block_replica_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferService for FakeTransferService {
    fn catalog_data(&self, catalog: &Catalog) -> Result<String, TransferError> {
        catalog.to_xml("test-dbs")
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> Result<u64, TransferError> {
        let call = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(request.clone());
            submitted.len() - 1
        };

        if self.failing_submissions.lock().unwrap().contains(&call) {
            return Err(TransferError::Service {
                verb: "subscribe",
                status: 503,
                body: "service unavailable".to_string(),
            });
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        Ok(*next_id)
    }

    async fn transfer_requests(
        &self,
        request_id: u64,
    ) -> Result<Vec<TransferRequest>, TransferError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .get(&request_id)
            .map(|value| vec![serde_json::from_value(value.clone()).unwrap()])
            .unwrap_or_default())
    }

    async fn subscriptions(
        &self,
        node: &str,
        level: SubscriptionLevel,
        names: &[String],
    ) -> Result<Vec<SubscriptionDataset>, TransferError> {
        self.subscription_calls
            .lock()
            .unwrap()
            .push((node.to_string(), level, names.len()));

        let subscriptions = self.subscriptions.lock().unwrap();
        let entries = subscriptions.get(node).cloned().unwrap_or_default();

        Ok(entries
            .into_iter()
            .map(|value| serde_json::from_value::<SubscriptionDataset>(value).unwrap())
            .filter(|entry| match level {
                SubscriptionLevel::Dataset => names.contains(&entry.name),
                SubscriptionLevel::Block => {
                    let prefix = format!("{}#", entry.name);
                    names.iter().any(|n| n.starts_with(&prefix))
                },
            })
            .collect())
    }

    async fn block_replicas(
        &self,
        node: &str,
        dataset: &str,
    ) -> Result<Vec<BlockReplicaEntry>, TransferError> {
        self.block_replica_calls
            .lock()
            .unwrap()
            .push((node.to_string(), dataset.to_string()));

        let replicas = self.block_replicas.lock().unwrap();
        Ok(replicas
            .get(&(node.to_string(), dataset.to_string()))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|value| serde_json::from_value(value).unwrap())
            .collect())
    }
}

/// History store that keeps records in memory
#[derive(Default)]
pub struct RecordingHistory {
    records: Mutex<Vec<RequestRecord>>,
    unavailable: bool,
}

impl RecordingHistory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            unavailable: true,
        })
    }

    pub fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for RecordingHistory {
    async fn record_request(&self, record: &RequestRecord) -> Result<(), HistoryError> {
        if self.unavailable {
            return Err(HistoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
