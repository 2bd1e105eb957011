//! Client for the dYdX chain REST (Cosmos LCD) API.
//!
//! Only two read endpoints are used: the latest block header, which gives the
//! chain head used as the estimation baseline, and the full list of delayed
//! complete-bridge messages. Neither call is retried.

pub mod cache;
pub mod error;
pub mod types;

use anyhow::Error;
use async_trait::async_trait;
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::debug;

use crate::metrics::Metrics;
pub use cache::EventCache;
pub use error::GatewayError;
use types::DelayedMessagesResponse;
pub use types::{BridgeEvent, ChainHead};

const LATEST_BLOCK_PATH: &str = "cosmos/base/tendermint/v1beta1/blocks/latest";
const DELAYED_MESSAGES_PATH: &str = "dydxprotocol/v4/bridge/delayed_complete_bridge_messages";

const LATEST_BLOCK_LABEL: &str = "latest_block";
const DELAYED_MESSAGES_LABEL: &str = "delayed_messages";

/// Source of the full delayed bridge event list.
#[async_trait]
pub trait BridgeEventSource: Send + Sync {
    async fn fetch_all_bridge_events(&self) -> Result<Vec<BridgeEvent>, GatewayError>;
}

pub struct DydxRestClient {
    client: reqwest::Client,
    base_url: String,
    metrics: Arc<Metrics>,
}

impl DydxRestClient {
    /// A zero `timeout` leaves requests without a transport timeout.
    pub fn new(base_url: &str, timeout: Duration, metrics: Arc<Metrics>) -> Result<Self, Error> {
        if base_url.is_empty() {
            return Err(anyhow::anyhow!("URL is empty"));
        }

        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            metrics,
        })
    }

    pub async fn fetch_chain_head(&self) -> Result<ChainHead, GatewayError> {
        self.instrumented(LATEST_BLOCK_LABEL, async {
            let value = self.get_json(LATEST_BLOCK_PATH).await?;
            let head = ChainHead::new_from_value(&value)?;
            debug!("Chain head: height {}, time {}", head.height, head.time);
            Ok(head)
        })
        .await
    }

    pub async fn fetch_all_bridge_events(&self) -> Result<Vec<BridgeEvent>, GatewayError> {
        self.instrumented(DELAYED_MESSAGES_LABEL, async {
            let value = self.get_json(DELAYED_MESSAGES_PATH).await?;
            let response: DelayedMessagesResponse = serde_json::from_value(value)
                .map_err(|e| GatewayError::parse(format!("unexpected delayed messages: {e}")))?;

            let events = response
                .messages
                .into_iter()
                .map(BridgeEvent::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            debug!("Fetched {} delayed bridge events", events.len());
            Ok(events)
        })
        .await
    }

    async fn instrumented<T, F>(&self, label: &str, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let start_time = std::time::Instant::now();
        self.metrics.inc_rest_call(label);

        let result = call.await;

        if let Err(err) = &result {
            tracing::error!("dYdX REST call '{}' failed: {}", label, err);
            self.metrics.inc_rest_call_error(label);
        }
        self.metrics
            .observe_rest_call_duration(label, start_time.elapsed().as_secs_f64());
        result
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, GatewayError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("failed to send request to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::network(format!(
                "request to {url} failed with status: {status}, body: {}",
                response.text().await.unwrap_or_default()
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                GatewayError::parse(format!("response from {url} is not valid JSON: {e}"))
            } else {
                GatewayError::network(format!("failed to read response from {url}: {e}"))
            }
        })
    }
}

#[async_trait]
impl BridgeEventSource for DydxRestClient {
    async fn fetch_all_bridge_events(&self) -> Result<Vec<BridgeEvent>, GatewayError> {
        DydxRestClient::fetch_all_bridge_events(self).await
    }
}
