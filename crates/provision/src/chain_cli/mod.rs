//! Chain-facing commands
//!
//! - `account`: Look up an identity's account and registration state
//! - `register`: Register an identity as a validator
//! - `nodes`: Probe every configured node

pub mod account;
pub mod nodes;
pub mod register;

pub use account::{check_account, execute_account_check, AccountStatus};
pub use nodes::{check_nodes, execute_nodes_check};
pub use register::{execute_register, register_identity, RegistrationOutcome};

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};
use valforge_rpc::{ClientError, RpcError};

/// Run the whole processing of one identity, retrying it after failures.
///
/// `op` runs at most `retries + 1` times. Before retry `n` (1-based) the
/// task sleeps `delay(n)`. The last error is returned with the attempt
/// count attached.
pub async fn retry_identity<T, F, Fut, D>(
    identity: &str,
    retries: u32,
    delay: D,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    D: Fn(u32) -> Duration,
{
    let mut failures = 0u32;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        failures += 1;
        if failures > retries {
            error!(identity, attempts = failures, error = %err, "Giving up on identity");
            return Err(err.context(format!(
                "Processing {} failed after {} attempts",
                identity, failures
            )));
        }

        let wait = delay(failures);
        warn!(
            identity,
            attempt = failures,
            retries,
            delay_ms = wait.as_millis() as u64,
            error = %err,
            "Identity processing failed, retrying"
        );
        tokio::time::sleep(wait).await;
    }
}

/// Whether a `get_account` failure means the account does not exist.
pub fn is_unknown_account(err: &ClientError) -> bool {
    let text = match err {
        ClientError::Rpc(RpcError::Node { message, .. }) => message,
        ClientError::Rpc(RpcError::HttpStatus { body, .. }) => body,
        _ => return false,
    };
    text.contains("unknown key") || text.contains("Account lookup")
}
