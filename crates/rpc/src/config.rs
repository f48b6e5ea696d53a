//! Node client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default bound on `|head_block_time - now|` for a healthy node.
pub const DEFAULT_MAX_HEAD_DRIFT: Duration = Duration::from_millis(300_000);

/// Default health probe timeout.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Default account paying CPU/NET for submitted transactions.
pub const DEFAULT_RESOURCE_PAYER: &str = "res.xsat";

/// Default permission of the resource payer.
pub const DEFAULT_RESOURCE_PERMISSION: &str = "res";

/// Configuration for [`NodeClient`](crate::NodeClient).
///
/// Durations are (de)serialized as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NodeClientConfig {
    /// Candidate endpoints in priority order.
    pub nodes: Vec<String>,

    /// Retries after the first failed attempt (default: 3).
    pub max_retries: u32,

    /// Base of the per-retry backoff `base * 2^attempt` (default: 1s).
    #[serde(with = "millis")]
    pub retry_base_delay: Duration,

    /// Base of the starvation backoff `base * 2^cycle` (default: 1s).
    #[serde(with = "millis")]
    pub starvation_base_delay: Duration,

    /// Cap of the starvation backoff (default: 10s).
    #[serde(with = "millis")]
    pub starvation_max_delay: Duration,

    /// Timeout of a single health probe (default: 3s).
    #[serde(with = "millis")]
    pub health_timeout: Duration,

    /// Largest accepted head block clock skew (default: 300s).
    #[serde(with = "millis")]
    pub max_head_drift: Duration,

    /// Transaction lifetime past the head block time (default: 30).
    pub expire_seconds: u32,

    /// Account paying CPU/NET, authorized first (default: res.xsat).
    pub resource_payer: String,

    /// Permission used for the resource payer (default: res).
    pub resource_permission: String,
}

impl Default for NodeClientConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(1000),
            starvation_base_delay: Duration::from_millis(1000),
            starvation_max_delay: Duration::from_millis(10_000),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            max_head_drift: DEFAULT_MAX_HEAD_DRIFT,
            expire_seconds: 30,
            resource_payer: DEFAULT_RESOURCE_PAYER.to_string(),
            resource_permission: DEFAULT_RESOURCE_PERMISSION.to_string(),
        }
    }
}

impl NodeClientConfig {
    /// Create a config for the given endpoints with default policy.
    pub fn with_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt` (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Sleep after starvation cycle `cycle` (0-based), capped.
    pub fn starvation_delay(&self, cycle: u32) -> Duration {
        self.starvation_base_delay
            .saturating_mul(2u32.saturating_pow(cycle))
            .min(self.starvation_max_delay)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("at least one node endpoint is required".to_string());
        }
        if let Some(node) = self.nodes.iter().find(|n| n.trim().is_empty()) {
            return Err(format!("empty node endpoint: {:?}", node));
        }
        if self.health_timeout.is_zero() {
            return Err("health-timeout must be > 0".to_string());
        }
        if self.expire_seconds == 0 {
            return Err("expire-seconds must be > 0".to_string());
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
