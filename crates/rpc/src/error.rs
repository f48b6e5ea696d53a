//! RPC and client error types.

use thiserror::Error;

/// Failures talking to a single node.
///
/// Retried by [`NodeClient::with_retry`](crate::NodeClient::with_retry) up
/// to its budget, then returned as-is.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Node answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Node rejected the request with a structured error.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    /// Request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Transaction could not be signed.
    #[error("signing error: {0}")]
    Signing(String),

    /// String is not a valid account or action name.
    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<valforge_crypto::CryptoError> for RpcError {
    fn from(err: valforge_crypto::CryptoError) -> Self {
        Self::Signing(err.to_string())
    }
}

/// RPC result type alias.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors surfaced by [`NodeClient`](crate::NodeClient) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No configured node passed the health check during selection.
    #[error("no healthy node among {0} configured endpoints")]
    NoHealthyNode(usize),

    /// Reward address is not 40 hex characters (optionally `0x`-prefixed).
    #[error("invalid reward address: {0}")]
    InvalidRewardAddress(String),

    /// Submission attempted on a client connected without a key.
    #[error("client has no signing key")]
    NoSigner,

    /// Operation failed after the retry budget was spent.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Client result type alias.
pub type ClientResult<T> = Result<T, ClientError>;
