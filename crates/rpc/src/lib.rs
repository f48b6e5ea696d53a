//! Resilient Antelope node client for valforge
//!
//! Talks to a pool of candidate RPC nodes, any of which may be down, stale
//! or on a different chain.
//!
//! # Features
//!
//! - Health probing by `get_info` with a head block clock-skew bound
//! - Node selection, rotation on failure and backoff under total outage
//! - Transaction packing and signing with Antelope keys
//! - Action submission, table reads and account lookups
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use valforge_rpc::{HttpConnector, NodeClient, NodeClientConfig, Signer};
//!
//! let config = NodeClientConfig::with_nodes(["https://rpc.example.com"]);
//! let signer = Signer::new("val1.sat", private_key)?;
//! let mut client = NodeClient::connect(config, Arc::new(HttpConnector::default()), signer).await?;
//! client.register_validator("val1.sat", "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod name;
pub mod submitter;
pub mod traits;
pub mod transaction;
pub mod types;

// Re-export main types
pub use client::{NodeClient, Session};
pub use config::NodeClientConfig;
pub use error::{ClientError, ClientResult, RpcError, RpcResult};
pub use health::{HealthMonitor, HealthReport};
pub use http::{HttpChainApi, HttpConnector};
pub use name::Name;
pub use submitter::{truncate_payload, validate_reward_address};
pub use traits::{ChainApi, Connector};
pub use transaction::{Action, PermissionLevel, SignedTransaction, Signer, Transaction};
pub use types::{AccountInfo, ChainInfo, PushTransactionResponse, TableQuery, TableRows};
