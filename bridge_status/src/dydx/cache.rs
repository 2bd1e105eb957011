use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{BridgeEvent, BridgeEventSource, DydxRestClient, GatewayError};
use crate::metrics::Metrics;

type EventList = Arc<Vec<BridgeEvent>>;
type SharedFetch = Shared<BoxFuture<'static, Result<EventList, GatewayError>>>;

enum Slot {
    Empty,
    Fetching(SharedFetch),
    Ready(EventList),
}

/// Holds the delayed bridge event list for the lifetime of a session.
///
/// The list is downloaded by the first `get` and handed out as the same
/// `Arc` afterwards. Callers arriving while that download is in flight await
/// the same download and get its outcome, errors included. A failed download
/// leaves the cache empty so a later search fetches again. There is no
/// expiry: entries added upstream after the first fetch are not seen until a
/// new cache is built.
pub struct EventCache<S = DydxRestClient> {
    source: Arc<S>,
    slot: Mutex<Slot>,
    metrics: Arc<Metrics>,
}

impl<S: BridgeEventSource + 'static> EventCache<S> {
    pub fn new(source: Arc<S>, metrics: Arc<Metrics>) -> Self {
        Self {
            source,
            slot: Mutex::new(Slot::Empty),
            metrics,
        }
    }

    pub async fn get(&self) -> Result<EventList, GatewayError> {
        let fetch = {
            let mut slot = self.lock();
            match &*slot {
                Slot::Ready(events) => return Ok(events.clone()),
                Slot::Fetching(fetch) => fetch.clone(),
                Slot::Empty => {
                    let fetch = self.start_fetch();
                    *slot = Slot::Fetching(fetch.clone());
                    fetch
                }
            }
        };

        let outcome = fetch.clone().await;

        let mut slot = self.lock();
        // Only the download this caller waited on may settle the slot.
        if matches!(&*slot, Slot::Fetching(current) if current.ptr_eq(&fetch)) {
            *slot = match &outcome {
                Ok(events) => Slot::Ready(events.clone()),
                Err(err) => {
                    debug!("Delayed bridge event download failed, not caching: {}", err);
                    Slot::Empty
                }
            };
        }
        outcome
    }

    pub fn is_populated(&self) -> bool {
        matches!(&*self.lock(), Slot::Ready(_))
    }

    fn start_fetch(&self) -> SharedFetch {
        let source = self.source.clone();
        let metrics = self.metrics.clone();
        async move {
            info!("Fetching delayed bridge events");
            let events = source.fetch_all_bridge_events().await?;
            info!("Cached {} delayed bridge events", events.len());
            metrics.set_cached_bridge_events(events.len());
            Ok(Arc::new(events))
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
