use thiserror::Error;

/// Errors surfaced by `ChainClient`. Every variant maps to one of the five
/// kinds callers branch on: unreachable, rate-limited, reverted, timed out,
/// or undecodable.
#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("rpc unreachable for network {network}")]
    RpcUnreachable {
        network: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("rate limited by {network}")]
    RateLimited { network: String },

    #[error("transaction reverted on {network}: {reason}")]
    Revert { network: String, reason: String },

    #[error("call to {network} timed out")]
    Timeout { network: String },

    #[error("failed to decode response from {network}")]
    Decode {
        network: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown network {0}")]
    UnknownNetwork(String),

    #[error("unknown token {token} on {network}")]
    UnknownToken { network: String, token: String },
}

impl ChainClientError {
    /// A short machine-stable label, useful in logs and API error bodies
    /// without leaking the underlying RPC error text.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainClientError::RpcUnreachable { .. } => "rpc_unreachable",
            ChainClientError::RateLimited { .. } => "rate_limited",
            ChainClientError::Revert { .. } => "revert",
            ChainClientError::Timeout { .. } => "timeout",
            ChainClientError::Decode { .. } => "decode",
            ChainClientError::UnknownNetwork(_) => "unknown_network",
            ChainClientError::UnknownToken { .. } => "unknown_token",
        }
    }

    /// Whether a retry is worth attempting: transient RPC conditions are,
    /// reverts and decode/config errors never are (the same inputs would
    /// just fail the same way again).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainClientError::RpcUnreachable { .. } | ChainClientError::RateLimited { .. } | ChainClientError::Timeout { .. }
        )
    }
}
