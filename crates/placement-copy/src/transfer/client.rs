//! HTTP client for the transfer-request data service
//!
//! Calls go to `{base_url}/json/{instance}/{verb}`. Read verbs are GETs with
//! repeated query parameters for list-valued fields; `subscribe` is a form
//! POST. Every response is a JSON envelope `{"phedex": {...}}`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::schema::{
    BlockReplicaEntry, BlockReplicasBody, Envelope, SubscribeBody, SubscriptionDataset,
    SubscriptionsBody, TransferRequest, TransferRequestsBody,
};
use super::{Catalog, SubscribeRequest, SubscriptionLevel, TransferError, TransferService};
use crate::config::TransferServiceConfig;

/// Transfer service reached over HTTP
pub struct HttpTransferService {
    client: Client,
    base_url: String,
    instance: String,
    dbs_name: String,
}

impl HttpTransferService {
    pub fn new(config: &TransferServiceConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| TransferError::Network {
                verb: "connect",
                source,
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            instance: config.instance.clone(),
            dbs_name: config.dbs_name.clone(),
        })
    }

    fn verb_url(&self, verb: &str) -> String {
        format!("{}/json/{}/{}", self.base_url, self.instance, verb)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        verb: &'static str,
        request: RequestBuilder,
    ) -> Result<T, TransferError> {
        let response = request
            .send()
            .await
            .map_err(|source| TransferError::Network { verb, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| TransferError::Network { verb, source })?;

        if !status.is_success() {
            return Err(TransferError::Service {
                verb,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| TransferError::malformed(verb, e.to_string()))?;

        Ok(envelope.phedex)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        verb: &'static str,
        params: &[(&str, String)],
    ) -> Result<T, TransferError> {
        debug!(verb, params = ?params, "Transfer service query");
        let request = self.client.get(self.verb_url(verb)).query(params);
        self.call(verb, request).await
    }
}

#[async_trait]
impl TransferService for HttpTransferService {
    fn catalog_data(&self, catalog: &Catalog) -> Result<String, TransferError> {
        catalog.to_xml(&self.dbs_name)
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> Result<u64, TransferError> {
        let verb = "subscribe";
        let builder = self
            .client
            .post(self.verb_url(verb))
            .form(&request.form_fields());

        let body: SubscribeBody = self.call(verb, builder).await?;

        body.request_created
            .first()
            .map(|created| created.id)
            .ok_or_else(|| TransferError::malformed(verb, "no request_created entry"))
    }

    async fn transfer_requests(
        &self,
        request_id: u64,
    ) -> Result<Vec<TransferRequest>, TransferError> {
        let body: TransferRequestsBody = self
            .get("transferrequests", &[("request", request_id.to_string())])
            .await?;
        Ok(body.request)
    }

    async fn subscriptions(
        &self,
        node: &str,
        level: SubscriptionLevel,
        names: &[String],
    ) -> Result<Vec<SubscriptionDataset>, TransferError> {
        let mut params = Vec::with_capacity(names.len() + 1);
        params.push(("node", node.to_string()));
        params.extend(names.iter().map(|name| (level.as_str(), name.clone())));

        let body: SubscriptionsBody = self.get("subscriptions", &params).await?;
        Ok(body.dataset)
    }

    async fn block_replicas(
        &self,
        node: &str,
        dataset: &str,
    ) -> Result<Vec<BlockReplicaEntry>, TransferError> {
        let params = [("node", node.to_string()), ("dataset", dataset.to_string())];
        let body: BlockReplicasBody = self.get("blockreplicas", &params).await?;
        Ok(body.block)
    }
}
