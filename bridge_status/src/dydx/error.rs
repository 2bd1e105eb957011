use thiserror::Error;

/// Failure of a call to the dYdX REST gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport failure or a non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// The response body does not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl GatewayError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse(err.to_string())
    }
}
