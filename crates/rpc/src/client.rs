//! Resilient node client.
//!
//! Keeps one node bound at a time. On failure the client backs off, moves
//! to the next healthy node in the list and tries again; when no node is
//! healthy it sleeps with a capped exponential backoff and rescans until
//! one comes back.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::NodeClientConfig;
use crate::error::{ClientError, ClientResult, RpcResult};
use crate::health::{HealthMonitor, HealthReport};
use crate::traits::{ChainApi, Connector};
use crate::transaction::Signer;

/// The node an operation runs against.
#[derive(Clone)]
pub struct Session {
    endpoint: String,
    chain_id: String,
    api: Arc<dyn ChainApi>,
}

impl Session {
    /// Endpoint URL of the bound node.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Chain id pinned at selection time.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// API handle of the bound node.
    pub fn api(&self) -> &dyn ChainApi {
        self.api.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// Client over an ordered pool of candidate nodes.
///
/// Methods take `&mut self`; one client serves one identity sequentially.
pub struct NodeClient {
    pub(crate) config: NodeClientConfig,
    connector: Arc<dyn Connector>,
    monitor: HealthMonitor,
    pub(crate) signer: Option<Arc<Signer>>,
    current: usize,
    session: Session,
}

impl NodeClient {
    /// Select the first healthy node, scanning from the start of the list.
    ///
    /// Fails with [`ClientError::NoHealthyNode`] if none qualifies; there is
    /// no retry at this stage.
    pub async fn connect(
        config: NodeClientConfig,
        connector: Arc<dyn Connector>,
        signer: Signer,
    ) -> ClientResult<Self> {
        Self::select(config, connector, Some(Arc::new(signer))).await
    }

    /// Like [`connect`](Self::connect), for a client that only reads.
    /// Submissions fail with [`ClientError::NoSigner`].
    pub async fn connect_read_only(
        config: NodeClientConfig,
        connector: Arc<dyn Connector>,
    ) -> ClientResult<Self> {
        Self::select(config, connector, None).await
    }

    async fn select(
        config: NodeClientConfig,
        connector: Arc<dyn Connector>,
        signer: Option<Arc<Signer>>,
    ) -> ClientResult<Self> {
        let monitor = HealthMonitor::new(
            Arc::clone(&connector),
            config.health_timeout,
            config.max_head_drift,
        );

        for (index, endpoint) in config.nodes.iter().enumerate() {
            let (report, api) = probe(connector.as_ref(), &monitor, endpoint).await;
            if let (HealthReport::Healthy { chain_id, .. }, Some(api)) = (report, api) {
                info!(endpoint = %endpoint, chain_id = %chain_id, "Using node");
                let session = Session {
                    endpoint: endpoint.clone(),
                    chain_id,
                    api,
                };
                return Ok(Self {
                    config,
                    connector,
                    monitor,
                    signer,
                    current: index,
                    session,
                });
            }
        }

        Err(ClientError::NoHealthyNode(config.nodes.len()))
    }

    /// Currently bound session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Endpoint of the bound node.
    pub fn current_endpoint(&self) -> &str {
        &self.session.endpoint
    }

    /// Pinned chain id.
    pub fn chain_id(&self) -> &str {
        &self.session.chain_id
    }

    /// Signer used for submissions, if any.
    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_deref()
    }

    /// Client configuration.
    pub fn config(&self) -> &NodeClientConfig {
        &self.config
    }

    /// Advance circularly through the pool, probing each node once.
    ///
    /// Binds the first healthy node on the pinned chain and returns `true`.
    /// Returns `false` if a full pass finds none; the binding and the
    /// pinned chain id are left as they were.
    pub async fn rotate(&mut self) -> bool {
        let len = self.config.nodes.len();
        for _ in 0..len {
            self.current = (self.current + 1) % len;
            let endpoint = self.config.nodes[self.current].clone();

            let (report, api) = probe(self.connector.as_ref(), &self.monitor, &endpoint).await;
            let (chain_id, api) = match (report, api) {
                (HealthReport::Healthy { chain_id, .. }, Some(api)) => (chain_id, api),
                _ => continue,
            };

            if chain_id != self.session.chain_id {
                warn!(
                    endpoint = %endpoint,
                    chain_id = %chain_id,
                    expected = %self.session.chain_id,
                    "Node is on a different chain, skipping"
                );
                continue;
            }

            info!(endpoint = %endpoint, "Switched to node");
            self.session = Session {
                endpoint,
                chain_id,
                api,
            };
            return true;
        }
        false
    }

    /// Rotate until a node is bound, sleeping between full passes.
    ///
    /// Waits `min(base * 2^n, max)` after the n-th empty pass. Does not
    /// give up.
    pub async fn rotate_until_ready(&mut self) {
        let mut cycle = 0u32;
        while !self.rotate().await {
            let delay = self.config.starvation_delay(cycle);
            warn!(
                nodes = self.config.nodes.len(),
                cycle,
                delay_ms = delay.as_millis() as u64,
                "All nodes are unavailable, sleeping"
            );
            tokio::time::sleep(delay).await;
            cycle = cycle.saturating_add(1);
        }
    }

    /// Run `op` against the bound node, rotating between failed attempts.
    ///
    /// After the first failure up to `max_retries` more attempts are made.
    /// Each retry waits `retry_base_delay * 2^attempt` and then rotates to
    /// a healthy node. The last error is returned unchanged.
    ///
    /// `op` may run more than once and must be safe to repeat.
    pub async fn with_retry<T, F, Fut>(&mut self, mut op: F) -> RpcResult<T>
    where
        F: FnMut(Session) -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let err = match op(self.session.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= self.config.max_retries {
                return Err(err);
            }

            let delay = self.config.retry_delay(attempt);
            warn!(
                endpoint = %self.session.endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Operation failed, retrying"
            );
            tokio::time::sleep(delay).await;

            self.rotate_until_ready().await;
            attempt += 1;
        }
    }
}

impl fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClient")
            .field("nodes", &self.config.nodes)
            .field("current", &self.current)
            .field("session", &self.session)
            .finish()
    }
}

async fn probe(
    connector: &dyn Connector,
    monitor: &HealthMonitor,
    endpoint: &str,
) -> (HealthReport, Option<Arc<dyn ChainApi>>) {
    match connector.connect(endpoint) {
        Ok(api) => (monitor.check_api(api.as_ref()).await, Some(api)),
        Err(e) => {
            warn!(endpoint, error = %e, "Failed to build node handle");
            (
                HealthReport::Unreachable {
                    reason: e.to_string(),
                },
                None,
            )
        }
    }
}
