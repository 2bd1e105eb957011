use anyhow::Error;
use clap::{Parser, Subcommand};
use dydx_bridge_status::{
    dydx::DydxRestClient,
    metrics::{self, Metrics},
    presentation::{render_state, render_table},
    search::{BridgeSearch, SearchSession, SearchState},
    server,
    utils::{config::Config, logging::init_logging},
};
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal::unix::{signal, SignalKind},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about = "Look up delayed dYdX bridge completions for an address")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search one address and print its delayed bridge events
    Search {
        /// dYdX address, matched exactly
        address: String,
    },
    /// Read addresses from stdin, one search per line; an empty line goes back
    Interactive,
    /// Serve the JSON search API and the metrics endpoint
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = Args::parse();
    info!("Starting dYdX bridge status v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::read_env_variables()?;
    let metrics = Arc::new(Metrics::new());

    let gateway = Arc::new(
        DydxRestClient::new(
            &config.dydx_rest_url,
            config.rest_request_timeout,
            metrics.clone(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create dYdX REST client: {}", e))?,
    );
    let search = Arc::new(BridgeSearch::new(
        gateway,
        config.avg_block_time_sec,
        metrics.clone(),
    ));

    match args.command {
        Command::Search { address } => search_once(&search, &address).await,
        Command::Interactive => interactive(search).await,
        Command::Serve => serve(search, metrics, &config).await,
    }
}

async fn search_once(search: &BridgeSearch, address: &str) -> Result<(), Error> {
    let result = search
        .search(address)
        .await
        .map_err(|e| anyhow::anyhow!("Search for {} failed: {}", address, e))?;
    println!("{}", render_table(&result));
    Ok(())
}

async fn interactive(search: Arc<BridgeSearch>) -> Result<(), Error> {
    let session = Arc::new(SearchSession::new());
    let mut searches = JoinSet::new();
    println!("{}", render_state(&session.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(address) = lines.next_line().await? {
        if address.is_empty() {
            session.reset();
            println!("{}", render_state(&SearchState::NotSearched));
            continue;
        }

        // Taken before spawning: any later line supersedes this search.
        let ticket = session.begin(&address);
        println!("{}", render_state(&session.state()));
        let session = session.clone();
        let search = search.clone();
        searches.spawn(async move {
            if let Some(state) = session.run(ticket, &search, &address).await {
                println!("{}", render_state(&state));
            }
        });
    }

    while let Some(joined) = searches.join_next().await {
        if let Err(e) = joined {
            error!("Search task failed: {}", e);
        }
    }
    Ok(())
}

async fn serve(
    search: Arc<BridgeSearch>,
    metrics: Arc<Metrics>,
    config: &Config,
) -> Result<(), Error> {
    let cancel_token = CancellationToken::new();

    let metrics_server =
        metrics::server::serve_metrics(metrics, config.metrics_port, cancel_token.clone());
    let api_server = server::serve_api(search, config.api_server_port, cancel_token.clone());

    wait_for_the_termination(cancel_token).await?;

    let (metrics_result, api_result) = tokio::join!(metrics_server, api_server);
    metrics_result.map_err(|e| anyhow::anyhow!("Metrics server task failed: {}", e))?;
    api_result.map_err(|e| anyhow::anyhow!("API server task failed: {}", e))?;
    Ok(())
}

async fn wait_for_the_termination(cancel_token: CancellationToken) -> Result<(), Error> {
    info!("Starting signal handler...");
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to set up SIGTERM handler: {}", e))?;
    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }
    cancel_token.cancel();
    Ok(())
}
