pub mod estimator;
pub mod session;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    dydx::{BridgeEvent, ChainHead, DydxRestClient, EventCache, GatewayError},
    metrics::Metrics,
};
pub use estimator::estimate_release_time;
pub use session::{SearchSession, SearchState, SearchTicket};

/// A matching event with its projected release time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedEvent {
    pub event: BridgeEvent,
    /// Unix seconds.
    pub estimated_release_time: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub address: String,
    pub chain_head: ChainHead,
    /// Same order as the upstream list.
    pub events: Vec<AnnotatedEvent>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Keeps the events whose target address is exactly `address`.
///
/// Comparison is case sensitive with no trimming, and the input order is
/// preserved.
pub fn filter_by_address(events: &[BridgeEvent], address: &str) -> Vec<BridgeEvent> {
    events
        .iter()
        .filter(|event| event.target_address == address)
        .cloned()
        .collect()
}

/// Runs address searches against one event cache.
pub struct BridgeSearch {
    gateway: Arc<DydxRestClient>,
    cache: EventCache,
    avg_block_time_sec: f64,
    metrics: Arc<Metrics>,
}

impl BridgeSearch {
    pub fn new(gateway: Arc<DydxRestClient>, avg_block_time_sec: f64, metrics: Arc<Metrics>) -> Self {
        Self {
            cache: EventCache::new(gateway.clone(), metrics.clone()),
            gateway,
            avg_block_time_sec,
            metrics,
        }
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    /// Fetches the chain head, then the (cached) event list, and returns the
    /// events addressed to `address` with their estimated release times.
    pub async fn search(&self, address: &str) -> Result<SearchResult, GatewayError> {
        self.metrics.inc_searches();

        let result = self.run(address).await;
        match &result {
            Ok(result) => self.metrics.observe_search_matches(result.events.len()),
            Err(_) => self.metrics.inc_searches_failed(),
        }
        result
    }

    async fn run(&self, address: &str) -> Result<SearchResult, GatewayError> {
        let chain_head = self.gateway.fetch_chain_head().await?;

        if address.is_empty() {
            warn!("Empty address searched, treating it as no match");
            return Ok(SearchResult {
                address: String::new(),
                chain_head,
                events: Vec::new(),
            });
        }

        let events = self.cache.get().await?;
        let events: Vec<AnnotatedEvent> = filter_by_address(&events, address)
            .into_iter()
            .map(|event| AnnotatedEvent {
                estimated_release_time: estimate_release_time(
                    &chain_head,
                    event.release_block_height,
                    self.avg_block_time_sec,
                ),
                event,
            })
            .collect();
        debug!("Found {} delayed bridge events for {}", events.len(), address);

        Ok(SearchResult {
            address: address.to_string(),
            chain_head,
            events,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::dydx::tests::{setup_server, test_client};
    use alloy::primitives::U256;

    pub const AVG_BLOCK_TIME_SEC: f64 = 6.5;

    fn event(id: u32, address: &str) -> BridgeEvent {
        BridgeEvent {
            event_id: id,
            authority: "dydx1auth".to_string(),
            coin_denom: "adydx".to_string(),
            coin_amount: U256::from(u64::from(id)),
            target_address: address.to_string(),
            eth_block_height: "1".to_string(),
            release_block_height: u64::from(id),
        }
    }

    pub fn test_search(url: &str) -> BridgeSearch {
        BridgeSearch::new(
            Arc::new(test_client(url)),
            AVG_BLOCK_TIME_SEC,
            Arc::new(Metrics::new()),
        )
    }

    #[test]
    fn test_filter_keeps_exact_matches_in_order() {
        let events = vec![
            event(5, "dydx1abc"),
            event(1, "dydx1def"),
            event(3, "dydx1abc"),
            event(2, "DYDX1ABC"),
            event(4, " dydx1abc"),
        ];

        let matches = filter_by_address(&events, "dydx1abc");
        let ids: Vec<u32> = matches.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![5, 3]);
        assert!(matches.len() <= events.len());
    }

    #[test]
    fn test_filter_is_idempotent_and_pure() {
        let events = vec![event(1, "dydx1abc"), event(2, "dydx1def"), event(3, "dydx1abc")];

        let once = filter_by_address(&events, "dydx1abc");
        let twice = filter_by_address(&once, "dydx1abc");
        assert_eq!(once, twice);
        assert_eq!(once, filter_by_address(&events, "dydx1abc"));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_filter_without_match_is_empty() {
        let events = vec![event(1, "dydx1abc")];
        assert!(filter_by_address(&events, "dydx1zzz").is_empty());
        assert!(filter_by_address(&[], "dydx1abc").is_empty());
    }

    #[test]
    fn test_filter_empty_address_matches_only_empty_targets() {
        let events = vec![event(1, "dydx1abc"), event(2, "")];
        let matches = filter_by_address(&events, "");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].event_id, 2);
    }

    #[tokio::test]
    async fn test_search_end_to_end() {
        let server = setup_server().await;
        let search = test_search(server.url().as_str());

        let result = search.search("dydx1abc").await.unwrap();

        assert_eq!(result.address, "dydx1abc");
        assert_eq!(result.chain_head.height, 1000);
        assert_eq!(result.chain_head.time, 1700000000);
        assert_eq!(result.events.len(), 2);

        let first = &result.events[0];
        assert_eq!(first.event.event_id, 17);
        assert_eq!(first.event.release_block_height, 1010);
        assert_eq!(
            first.event.coin_amount,
            U256::from(2_000_000_000_000_000_000u128)
        );
        assert_eq!(first.estimated_release_time, 1700000065);

        // 200 blocks * 6.5s
        assert_eq!(result.events[1].estimated_release_time, 1700001300);
    }

    #[tokio::test]
    async fn test_search_without_match_is_searched_empty() {
        let server = setup_server().await;
        let search = test_search(server.url().as_str());

        let result = search.search("dydx1nobody").await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.chain_head.height, 1000);
    }

    #[tokio::test]
    async fn test_empty_address_is_no_match() {
        let server = setup_server().await;
        let search = test_search(server.url().as_str());

        let result = search.search("").await.unwrap();
        assert!(result.is_empty());
        assert!(!search.cache().is_populated());
    }

    #[tokio::test]
    async fn test_repeated_searches_fetch_events_once() {
        let mut server = mockito::Server::new_async().await;
        let head_mock = server
            .mock("GET", "/cosmos/base/tendermint/v1beta1/blocks/latest")
            .with_body(include_str!("../dydx/latest_block_test_response.json"))
            .expect(4)
            .create_async()
            .await;
        let events_mock = server
            .mock(
                "GET",
                "/dydxprotocol/v4/bridge/delayed_complete_bridge_messages",
            )
            .with_body(include_str!("../dydx/delayed_messages_test_response.json"))
            .expect(1)
            .create_async()
            .await;
        let search = test_search(server.url().as_str());

        search.search("dydx1abc").await.unwrap();
        search.search("dydx1other").await.unwrap();
        let (a, b) = tokio::join!(search.search("dydx1abc"), search.search("dydx1abc"));
        assert_eq!(a.unwrap(), b.unwrap());

        // The chain head is refreshed on every search.
        head_mock.assert_async().await;
        events_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_head_fetch_fails_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cosmos/base/tendermint/v1beta1/blocks/latest")
            .with_status(500)
            .create_async()
            .await;
        let search = test_search(server.url().as_str());

        let err = search.search("dydx1abc").await.unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)));
    }
}
