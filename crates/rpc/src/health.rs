//! Node health probing.
//!
//! A node is healthy when `get_info` answers within the probe timeout and
//! its head block time is within the drift bound of local wall-clock time.
//! A node that answers but lags is reported as stale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::traits::{ChainApi, Connector};

/// Timestamp layout of `head_block_time` (no zone suffix, always UTC)
const HEAD_BLOCK_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Outcome of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthReport {
    /// Reachable and in sync.
    Healthy {
        /// Chain id reported by the node
        chain_id: String,
        /// `head_block_time - now` in milliseconds
        drift_ms: i64,
    },
    /// Reachable but its head block is too far from now.
    Stale {
        /// `head_block_time - now` in milliseconds
        drift_ms: i64,
    },
    /// Probe failed or timed out.
    Unreachable {
        /// Failure description
        reason: String,
    },
}

impl HealthReport {
    /// Whether the node can be used.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    /// Chain id of a healthy node.
    pub fn chain_id(&self) -> Option<&str> {
        match self {
            Self::Healthy { chain_id, .. } => Some(chain_id),
            _ => None,
        }
    }
}

/// Parse `head_block_time` as UTC.
///
/// Nodes omit the zone suffix; the value is UTC regardless of the local
/// offset. RFC 3339 input is accepted as well.
pub fn parse_head_block_time(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, HEAD_BLOCK_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Probes nodes with `get_info`.
#[derive(Clone)]
pub struct HealthMonitor {
    connector: Arc<dyn Connector>,
    timeout: Duration,
    max_drift: Duration,
}

impl HealthMonitor {
    /// Create a monitor with the probe timeout and drift bound.
    pub fn new(connector: Arc<dyn Connector>, timeout: Duration, max_drift: Duration) -> Self {
        Self {
            connector,
            timeout,
            max_drift,
        }
    }

    /// Probe `endpoint`. Never fails; problems become
    /// [`HealthReport::Unreachable`].
    pub async fn check(&self, endpoint: &str) -> HealthReport {
        match self.connector.connect(endpoint) {
            Ok(api) => self.check_api(api.as_ref()).await,
            Err(e) => {
                warn!(endpoint, error = %e, "Failed to build node handle");
                HealthReport::Unreachable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Probe an existing handle.
    pub async fn check_api(&self, api: &dyn ChainApi) -> HealthReport {
        let endpoint = api.endpoint();

        let info = match tokio::time::timeout(self.timeout, api.get_info()).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                warn!(endpoint, error = %e, "get_info from node failed");
                return HealthReport::Unreachable {
                    reason: e.to_string(),
                };
            }
            Err(_) => {
                warn!(endpoint, timeout_ms = self.timeout.as_millis() as u64, "get_info timed out");
                return HealthReport::Unreachable {
                    reason: format!("timed out after {:?}", self.timeout),
                };
            }
        };

        let Some(head_time) = parse_head_block_time(&info.head_block_time) else {
            warn!(endpoint, head_block_time = %info.head_block_time, "Unparseable head block time");
            return HealthReport::Unreachable {
                reason: format!("invalid head_block_time {:?}", info.head_block_time),
            };
        };

        let drift_ms = (head_time - Utc::now()).num_milliseconds();
        if drift_ms.unsigned_abs() > self.max_drift.as_millis() as u64 {
            warn!(endpoint, drift_ms, "Node head block is stale");
            return HealthReport::Stale { drift_ms };
        }

        debug!(endpoint, drift_ms, chain_id = %info.chain_id, "Node healthy");
        HealthReport::Healthy {
            chain_id: info.chain_id,
            drift_ms,
        }
    }
}
