//! Transfer-request service interface
//!
//! The scheduler and the reconciler talk to the external transfer-request
//! service through [`TransferService`]. Responses are decoded into the typed
//! records of [`schema`]; a response missing a required key is a
//! [`TransferError::MalformedResponse`].

pub mod catalog;
pub mod client;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;

pub use catalog::{Catalog, CatalogEntry};
pub use client::HttpTransferService;
pub use schema::{
    BlockReplicaEntry, ReplicaRecord, SubscriptionBlock, SubscriptionDataset, SubscriptionRecord,
    TransferRequest,
};

/// Maximum number of dataset or block names sent in one `subscriptions` call.
pub const SUBSCRIPTION_QUERY_CHUNK: usize = 35;

/// Errors returned by a transfer service call
#[derive(Error, Debug)]
pub enum TransferError {
    /// The request never produced an HTTP response (connect, timeout, ...)
    #[error("Network error calling {verb}: {source}")]
    Network {
        verb: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("Service error calling {verb}: HTTP {status}: {body}")]
    Service {
        verb: &'static str,
        status: u16,
        body: String,
    },

    /// The response body does not match the expected schema
    #[error("Malformed response to {verb}: {reason}")]
    MalformedResponse { verb: &'static str, reason: String },

    /// The request catalog could not be serialized
    #[error("Catalog serialization failed: {0}")]
    Catalog(String),
}

impl TransferError {
    pub fn malformed(verb: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            verb,
            reason: reason.into(),
        }
    }

    /// Short label of the error kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Network { .. } => "network",
            TransferError::Service { .. } => "service",
            TransferError::MalformedResponse { .. } => "malformed_response",
            TransferError::Catalog(_) => "catalog",
        }
    }
}

/// Granularity of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubscriptionLevel {
    Dataset,
    Block,
}

impl SubscriptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionLevel::Dataset => "dataset",
            SubscriptionLevel::Block => "block",
        }
    }
}

impl std::fmt::Display for SubscriptionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `subscribe` call. Policy flags are fixed for copies made by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRequest {
    /// Destination site name
    pub node: String,

    /// Serialized request catalog
    pub data: String,

    pub level: SubscriptionLevel,
    pub group: String,
    pub comments: String,

    pub priority: &'static str,
    pub is_move: bool,
    pub is_static: bool,
    pub custodial: bool,
    pub request_only: bool,
    pub no_mail: bool,
}

impl SubscribeRequest {
    /// Low-priority, non-custodial, auto-approved copy request
    pub fn copy(
        node: impl Into<String>,
        data: String,
        level: SubscriptionLevel,
        group: impl Into<String>,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            data,
            level,
            group: group.into(),
            comments: comments.into(),
            priority: "low",
            is_move: false,
            is_static: false,
            custodial: false,
            request_only: false,
            no_mail: false,
        }
    }

    /// Form fields in the order the service documents them
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("node", self.node.clone()),
            ("data", self.data.clone()),
            ("level", self.level.as_str().to_string()),
            ("priority", self.priority.to_string()),
            ("move", yes_no(self.is_move)),
            ("static", yes_no(self.is_static)),
            ("custodial", yes_no(self.custodial)),
            ("group", self.group.clone()),
            ("request_only", yes_no(self.request_only)),
            ("no_mail", yes_no(self.no_mail)),
            ("comments", self.comments.clone()),
        ]
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "y" } else { "n" }.to_string()
}

/// Operations of the external transfer-request service
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Serialize a request catalog into the `data` field of a subscription.
    fn catalog_data(&self, catalog: &Catalog) -> Result<String, TransferError>;

    /// Submit a subscription; returns the service-assigned request id.
    async fn subscribe(&self, request: &SubscribeRequest) -> Result<u64, TransferError>;

    /// Look up a previously submitted request. Unknown ids yield an empty list.
    async fn transfer_requests(&self, request_id: u64)
        -> Result<Vec<TransferRequest>, TransferError>;

    /// Subscription state at `node` for the given dataset or block names.
    async fn subscriptions(
        &self,
        node: &str,
        level: SubscriptionLevel,
        names: &[String],
    ) -> Result<Vec<SubscriptionDataset>, TransferError>;

    /// Block replicas of one dataset at `node`.
    async fn block_replicas(
        &self,
        node: &str,
        dataset: &str,
    ) -> Result<Vec<BlockReplicaEntry>, TransferError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_request_policy_flags() {
        let request = SubscribeRequest::copy(
            "T2_XX_Site",
            "<data/>".to_string(),
            SubscriptionLevel::Block,
            "analysis",
            "operation 7",
        );

        let fields = request.form_fields();
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("node"), "T2_XX_Site");
        assert_eq!(get("level"), "block");
        assert_eq!(get("priority"), "low");
        assert_eq!(get("move"), "n");
        assert_eq!(get("static"), "n");
        assert_eq!(get("custodial"), "n");
        assert_eq!(get("request_only"), "n");
        assert_eq!(get("no_mail"), "n");
        assert_eq!(get("group"), "analysis");
        assert_eq!(get("comments"), "operation 7");
        assert_eq!(fields.len(), 11);
    }
}
