use anyhow::{anyhow, Error};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_DYDX_REST_URL: &str = "https://dydx-dao-api-1.polkachu.com";
/// Historical average dYdX block interval.
pub const DEFAULT_AVG_BLOCK_TIME_SEC: &str = "6.5";

#[derive(Debug, Clone)]
pub struct Config {
    pub dydx_rest_url: String,
    pub avg_block_time_sec: f64,
    pub rest_request_timeout: Duration,
    pub api_server_port: u16,
    pub metrics_port: u16,
}

impl Config {
    pub fn read_env_variables() -> Result<Self, Error> {
        // Load environment variables from .env file
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        info!(
            r#"
Configuration:
dYdX REST URL: {},
average block time: {}s
REST request timeout: {}ms
API server port: {}
metrics port: {}
"#,
            config.dydx_rest_url,
            config.avg_block_time_sec,
            config.rest_request_timeout.as_millis(),
            config.api_server_port,
            config.metrics_port,
        );

        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        const DYDX_REST_URL: &str = "DYDX_REST_URL";
        let dydx_rest_url = lookup(DYDX_REST_URL).unwrap_or_else(|| {
            warn!(
                "No dYdX REST URL found in {} env var, using default",
                DYDX_REST_URL
            );
            DEFAULT_DYDX_REST_URL.to_string()
        });
        if dydx_rest_url.is_empty() {
            return Err(anyhow!("{DYDX_REST_URL} must not be empty"));
        }

        let avg_block_time_sec = lookup("AVG_BLOCK_TIME_SEC")
            .unwrap_or(DEFAULT_AVG_BLOCK_TIME_SEC.to_string())
            .parse::<f64>()
            .map_err(|e| anyhow!("AVG_BLOCK_TIME_SEC must be a number: {e}"))?;
        if !avg_block_time_sec.is_finite() || avg_block_time_sec <= 0.0 {
            return Err(anyhow!(
                "AVG_BLOCK_TIME_SEC must be a positive number, got {avg_block_time_sec}"
            ));
        }

        // 0 disables the transport timeout.
        let rest_request_timeout = lookup("REST_REQUEST_TIMEOUT_MS")
            .unwrap_or("30000".to_string())
            .parse::<u64>()
            .map_err(|e| anyhow!("REST_REQUEST_TIMEOUT_MS must be a number: {e}"))?;
        let rest_request_timeout = Duration::from_millis(rest_request_timeout);

        let api_server_port = lookup("API_SERVER_PORT")
            .unwrap_or("3000".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow!("API_SERVER_PORT must be a port number: {e}"))?;

        let metrics_port = lookup("METRICS_PORT")
            .unwrap_or("9898".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow!("METRICS_PORT must be a port number: {e}"))?;

        Ok(Self {
            dydx_rest_url,
            avg_block_time_sec,
            rest_request_timeout,
            api_server_port,
            metrics_port,
        })
    }
}
