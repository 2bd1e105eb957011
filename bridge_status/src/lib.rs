// Shared modules for the bridge status CLI and API server
pub mod dydx;
pub mod metrics;
pub mod presentation;
pub mod search;
pub mod server;
pub mod utils;
