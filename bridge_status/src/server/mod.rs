//! JSON search API.
//!
//! All requests share one `BridgeSearch`, so the event list is downloaded
//! once per process.

use serde::Serialize;
use std::{convert::Infallible, sync::Arc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warp::{
    http::StatusCode,
    reply::{json, with_status, Reply, Response},
    Filter, Rejection,
};

use crate::{presentation::SearchResponse, search::BridgeSearch};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn routes(
    search: Arc<BridgeSearch>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let search_route = warp::get()
        .and(warp::path!("search" / String))
        .and(warp::any().map(move || search.clone()))
        .and_then(handle_search);

    let health_route = warp::get().and(warp::path!("health")).map(|| "ok");

    search_route.or(health_route)
}

async fn handle_search(
    address: String,
    search: Arc<BridgeSearch>,
) -> Result<Response, Infallible> {
    match search.search(&address).await {
        Ok(result) => {
            Ok(with_status(json(&SearchResponse::from(&result)), StatusCode::OK).into_response())
        }
        Err(err) => {
            warn!("Search for {} failed: {}", address, err);
            let body = ErrorResponse {
                error: err.to_string(),
            };
            Ok(with_status(json(&body), StatusCode::BAD_GATEWAY).into_response())
        }
    }
}

pub fn serve_api(
    search: Arc<BridgeSearch>,
    port: u16,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (addr, server) = warp::serve(routes(search)).bind_with_graceful_shutdown(
            ([0, 0, 0, 0], port),
            async move {
                cancel_token.cancelled().await;
                info!("Shutdown signal received, stopping API server...");
            },
        );

        info!("Search API listening on {}", addr);
        server.await;
    })
}
