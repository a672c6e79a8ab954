//! Typed response records for the transfer service verbs
//!
//! The service is loose about number encoding: byte counts and timestamps
//! arrive either as JSON numbers or as numeric strings. Both are accepted;
//! anything else fails decoding.

use serde::{de, Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

/// Every response is wrapped in a single top-level object.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub phedex: T,
}

// ============================================================================
// subscribe
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub request_created: Vec<RequestCreated>,
}

#[derive(Debug, Deserialize)]
pub struct RequestCreated {
    #[serde(deserialize_with = "loose")]
    pub id: u64,
}

// ============================================================================
// transferrequests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TransferRequestsBody {
    #[serde(default)]
    pub request: Vec<TransferRequest>,
}

/// A submitted request: where it goes and what it asked for
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub destinations: Destinations,
    pub data: RequestedData,
}

impl TransferRequest {
    pub fn site_names(&self) -> Vec<String> {
        self.destinations.node.iter().map(|n| n.name.clone()).collect()
    }

    pub fn dataset_names(&self) -> Vec<String> {
        self.data.dbs.dataset.iter().map(|d| d.name.clone()).collect()
    }

    pub fn block_names(&self) -> Vec<String> {
        self.data.dbs.block.iter().map(|b| b.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Destinations {
    #[serde(default)]
    pub node: Vec<Named>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestedData {
    pub dbs: RequestedDbs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestedDbs {
    #[serde(default)]
    pub dataset: Vec<Named>,
    #[serde(default)]
    pub block: Vec<Named>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

// ============================================================================
// subscriptions
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubscriptionsBody {
    #[serde(default)]
    pub dataset: Vec<SubscriptionDataset>,
}

/// One dataset in a `subscriptions` answer.
///
/// A dataset-level subscription carries `subscription`; block-level
/// subscriptions carry `block` entries with their own records.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionDataset {
    pub name: String,

    #[serde(deserialize_with = "loose")]
    pub bytes: u64,

    #[serde(default)]
    pub subscription: Option<Vec<SubscriptionRecord>>,

    #[serde(default)]
    pub block: Option<Vec<SubscriptionBlock>>,
}

impl SubscriptionDataset {
    /// First dataset-level subscription record, if any
    pub fn dataset_subscription(&self) -> Option<&SubscriptionRecord> {
        self.subscription.as_ref().and_then(|s| s.first())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionBlock {
    pub name: String,

    #[serde(deserialize_with = "loose")]
    pub bytes: u64,

    #[serde(default)]
    pub subscription: Option<Vec<SubscriptionRecord>>,
}

impl SubscriptionBlock {
    pub fn block_subscription(&self) -> Option<&SubscriptionRecord> {
        self.subscription.as_ref().and_then(|s| s.first())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRecord {
    pub node: String,

    /// Bytes already at the node; null before anything arrived
    #[serde(default, deserialize_with = "loose_option")]
    pub node_bytes: Option<u64>,

    /// Unix time of the last update, in seconds
    #[serde(deserialize_with = "loose")]
    pub time_update: f64,
}

// ============================================================================
// blockreplicas
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BlockReplicasBody {
    #[serde(default)]
    pub block: Vec<BlockReplicaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockReplicaEntry {
    pub name: String,

    /// Total size of the block
    #[serde(deserialize_with = "loose")]
    pub bytes: u64,

    #[serde(default)]
    pub replica: Option<Vec<ReplicaRecord>>,
}

impl BlockReplicaEntry {
    pub fn first_replica(&self) -> Option<&ReplicaRecord> {
        self.replica.as_ref().and_then(|r| r.first())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplicaRecord {
    #[serde(default)]
    pub node: Option<String>,

    /// Bytes of the block present at the node
    #[serde(deserialize_with = "loose")]
    pub bytes: u64,

    #[serde(deserialize_with = "loose")]
    pub time_update: f64,
}

// ============================================================================
// Number decoding
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Value(T),
    Text(String),
}

fn loose<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Loose::<T>::deserialize(deserializer)? {
        Loose::Value(value) => Ok(value),
        Loose::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

fn loose_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Loose<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Value(value)) => Ok(Some(value)),
        Some(Loose::Text(text)) => text.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_created_id_as_string() {
        let body: Envelope<SubscribeBody> =
            serde_json::from_value(json!({"phedex": {"request_created": [{"id": "1234567"}]}}))
                .unwrap();
        assert_eq!(body.phedex.request_created[0].id, 1234567);
    }

    #[test]
    fn test_request_created_rejects_non_numeric() {
        let result: Result<Envelope<SubscribeBody>, _> =
            serde_json::from_value(json!({"phedex": {"request_created": [{"id": "abc"}]}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_transfer_request_names() {
        let body: Envelope<TransferRequestsBody> = serde_json::from_value(json!({
            "phedex": {"request": [{
                "id": 42,
                "destinations": {"node": [{"name": "T1_A"}, {"name": "T2_B"}]},
                "data": {"dbs": {
                    "name": "https://dbs.example.org/DBSReader",
                    "dataset": [{"name": "/A/B/C", "bytes": 10}],
                    "block": []
                }}
            }]}
        }))
        .unwrap();

        let request = &body.phedex.request[0];
        assert_eq!(request.site_names(), vec!["T1_A", "T2_B"]);
        assert_eq!(request.dataset_names(), vec!["/A/B/C"]);
        assert!(request.block_names().is_empty());
    }

    #[test]
    fn test_transfer_request_missing_destinations() {
        let result: Result<Envelope<TransferRequestsBody>, _> = serde_json::from_value(json!({
            "phedex": {"request": [{"data": {"dbs": {}}}]}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_subscription_dataset_shapes() {
        let body: Envelope<SubscriptionsBody> = serde_json::from_value(json!({
            "phedex": {"dataset": [
                {
                    "name": "/A/B/C",
                    "bytes": "2000",
                    "subscription": [{"node": "T1_A", "node_bytes": null, "time_update": "1500000000.5"}]
                },
                {
                    "name": "/D/E/F",
                    "bytes": 300,
                    "block": [{
                        "name": "/D/E/F#00000000-0000-0000-0000-000000000001",
                        "bytes": 300,
                        "subscription": [{"node": "T1_A", "node_bytes": 100, "time_update": 1500000001}]
                    }]
                }
            ]}
        }))
        .unwrap();

        let datasets = body.phedex.dataset;
        let whole = datasets[0].dataset_subscription().unwrap();
        assert_eq!(datasets[0].bytes, 2000);
        assert_eq!(whole.node_bytes, None);
        assert_eq!(whole.time_update, 1500000000.5);
        assert!(datasets[0].block.is_none());

        assert!(datasets[1].dataset_subscription().is_none());
        let blocks = datasets[1].block.as_ref().unwrap();
        assert_eq!(blocks[0].block_subscription().unwrap().node_bytes, Some(100));
    }

    #[test]
    fn test_block_replica_without_replica_record() {
        let entry: BlockReplicaEntry = serde_json::from_value(json!({
            "name": "/A/B/C#00000000-0000-0000-0000-000000000001",
            "bytes": 5
        }))
        .unwrap();
        assert!(entry.first_replica().is_none());
    }
}
