//! Node check command implementation

use crate::config::ProvisionConfig;
use anyhow::{anyhow, Result};
use serde_json::json;
use std::sync::Arc;
use valforge_rpc::{Connector, HealthMonitor, HealthReport, HttpConnector, NodeClientConfig};

/// Probe every configured node once, in configuration order.
pub async fn check_nodes(
    config: &NodeClientConfig,
    connector: Arc<dyn Connector>,
) -> Vec<(String, HealthReport)> {
    let monitor = HealthMonitor::new(connector, config.health_timeout, config.max_head_drift);

    let mut reports = Vec::with_capacity(config.nodes.len());
    for endpoint in &config.nodes {
        let report = monitor.check(endpoint).await;
        reports.push((endpoint.clone(), report));
    }
    reports
}

/// Execute the nodes check command.
///
/// Fails when no node is healthy.
pub async fn execute_nodes_check(config: &ProvisionConfig, format: &str) -> Result<()> {
    let node_config = config.node_client_config()?;
    let reports = check_nodes(&node_config, Arc::new(HttpConnector::default())).await;

    match format {
        "json" => {
            let output: Vec<_> = reports
                .iter()
                .map(|(endpoint, report)| match report {
                    HealthReport::Healthy { chain_id, drift_ms } => json!({
                        "endpoint": endpoint,
                        "status": "healthy",
                        "chain_id": chain_id,
                        "drift_ms": drift_ms,
                    }),
                    HealthReport::Stale { drift_ms } => json!({
                        "endpoint": endpoint,
                        "status": "stale",
                        "drift_ms": drift_ms,
                    }),
                    HealthReport::Unreachable { reason } => json!({
                        "endpoint": endpoint,
                        "status": "unreachable",
                        "reason": reason,
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for (endpoint, report) in &reports {
                match report {
                    HealthReport::Healthy { chain_id, drift_ms } => println!(
                        "{:<40} healthy      drift {:>7} ms  chain {}",
                        endpoint, drift_ms, chain_id
                    ),
                    HealthReport::Stale { drift_ms } => {
                        println!("{:<40} stale        drift {:>7} ms", endpoint, drift_ms)
                    }
                    HealthReport::Unreachable { reason } => {
                        println!("{:<40} unreachable  {}", endpoint, reason)
                    }
                }
            }
        }
    }

    let mut chains: Vec<&str> = reports.iter().filter_map(|(_, r)| r.chain_id()).collect();
    chains.sort_unstable();
    chains.dedup();

    match chains.len() {
        0 => Err(anyhow!(
            "No healthy node among {} configured endpoints",
            reports.len()
        )),
        1 => Ok(()),
        n => {
            eprintln!("Warning: healthy nodes report {} different chain ids", n);
            Ok(())
        }
    }
}
