//! Transaction submission and chain queries through [`NodeClient`].
//!
//! Every call here goes through [`NodeClient::with_retry`], so a
//! submission may reach the chain more than once if a node accepted it but
//! the response was lost. Callers must only submit actions that are safe
//! to repeat.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::client::{NodeClient, Session};
use crate::error::{ClientError, ClientResult, RpcError, RpcResult};
use crate::name::Name;
use crate::transaction::{Action, PermissionLevel, Signer, Transaction};
use crate::types::{AbiJsonToBinRequest, AccountInfo, PushTransactionResponse, TableQuery};

/// Contract managing validator registration
pub const VALIDATOR_CONTRACT: &str = "endrmng.xsat";

/// Action registering a validator
pub const REGISTER_VALIDATOR_ACTION: &str = "newregvldtor";

/// Table of registered validators
pub const VALIDATORS_TABLE: &str = "validators";

/// `role` value for a validator
pub const VALIDATOR_ROLE: &str = "1";

/// Longest payload text written to error logs
pub const MAX_LOGGED_PAYLOAD: usize = 500;

/// Payload JSON for logs, cut to [`MAX_LOGGED_PAYLOAD`] characters with a
/// trailing `...`.
pub fn truncate_payload(payload: &Value) -> String {
    let text = payload.to_string();
    match text.char_indices().nth(MAX_LOGGED_PAYLOAD) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

/// Check `^(0x)?[0-9a-fA-F]{40}$` and return the address without `0x`.
pub fn validate_reward_address(address: &str) -> ClientResult<String> {
    let body = address.strip_prefix("0x").unwrap_or(address);
    if body.len() == 40 && body.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(body.to_string())
    } else {
        Err(ClientError::InvalidRewardAddress(address.to_string()))
    }
}

impl NodeClient {
    /// Sign and push a single action as the signer's account.
    ///
    /// Authorization is the resource payer followed by `actor@active`. On
    /// final failure the contract, action and truncated payload are logged
    /// and the error is returned unchanged.
    pub async fn submit_action(
        &mut self,
        contract: &str,
        action: &str,
        payload: Value,
    ) -> ClientResult<PushTransactionResponse> {
        let signer = self.signer.clone().ok_or(ClientError::NoSigner)?;
        let account: Name = contract.parse()?;
        let name: Name = action.parse()?;
        let authorization = vec![
            PermissionLevel::new(&self.config.resource_payer, &self.config.resource_permission)?,
            PermissionLevel {
                actor: signer.actor(),
                permission: "active".parse()?,
            },
        ];
        let expire_seconds = self.config.expire_seconds;

        let result = self
            .with_retry(|session| {
                let signer = Arc::clone(&signer);
                let authorization = authorization.clone();
                let payload = payload.clone();
                async move {
                    push_action(
                        &session,
                        &signer,
                        account,
                        name,
                        authorization,
                        payload,
                        expire_seconds,
                    )
                    .await
                }
            })
            .await;

        match result {
            Ok(response) => {
                info!(
                    contract,
                    action,
                    transaction_id = %response.transaction_id,
                    "Transaction executed"
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    contract,
                    action,
                    payload = %truncate_payload(&payload),
                    error = %e,
                    "Transaction failed"
                );
                Err(e.into())
            }
        }
    }

    /// Register `identity` as a validator paying rewards to
    /// `reward_address`.
    pub async fn register_validator(
        &mut self,
        identity: &str,
        reward_address: &str,
    ) -> ClientResult<PushTransactionResponse> {
        let address = validate_reward_address(reward_address)?;
        let payload = json!({
            "validator": identity,
            "role": VALIDATOR_ROLE,
            "stake_addr": address,
            "reward_addr": address,
            "commission_rate": null,
        });

        self.submit_action(VALIDATOR_CONTRACT, REGISTER_VALIDATOR_ACTION, payload)
            .await
    }

    /// Read rows of `code`/`scope`/`table`.
    ///
    /// With `fetch_all` the pages are followed by `next_key` until the node
    /// reports no more rows. The whole read is retried as one unit.
    pub async fn get_table_rows<T: DeserializeOwned>(
        &mut self,
        code: &str,
        scope: &str,
        table: &str,
        query: &TableQuery,
    ) -> ClientResult<Vec<T>> {
        let code: Name = code.parse()?;
        let table: Name = table.parse()?;

        let rows = self
            .with_retry(|session| {
                let query = query.clone();
                let scope = scope.to_string();
                async move { fetch_rows(&session, code, &scope, table, &query).await }
            })
            .await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ClientError::Rpc(RpcError::Decode(e.to_string())))
            })
            .collect()
    }

    /// Account permissions of `account`.
    pub async fn get_account(&mut self, account: &str) -> ClientResult<AccountInfo> {
        let info = self
            .with_retry(|session| {
                let account = account.to_string();
                async move { session.api().get_account(&account).await }
            })
            .await?;
        Ok(info)
    }

    /// Whether `account` already has a row in the validators table.
    pub async fn is_validator_registered(&mut self, account: &str) -> ClientResult<bool> {
        let rows: Vec<Value> = self
            .get_table_rows(
                VALIDATOR_CONTRACT,
                VALIDATOR_CONTRACT,
                VALIDATORS_TABLE,
                &TableQuery::bounded(account, account).with_limit(1),
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

async fn push_action(
    session: &Session,
    signer: &Signer,
    account: Name,
    name: Name,
    authorization: Vec<PermissionLevel>,
    payload: Value,
    expire_seconds: u32,
) -> RpcResult<PushTransactionResponse> {
    let api = session.api();

    let request = AbiJsonToBinRequest {
        code: account,
        action: name,
        args: payload,
    };
    let binargs = api.abi_json_to_bin(&request).await?.binargs;
    let data = hex::decode(&binargs)
        .map_err(|e| RpcError::Decode(format!("invalid binargs: {}", e)))?;

    let info = api.get_info().await?;
    let transaction = Transaction::new(
        &info,
        expire_seconds,
        vec![Action {
            account,
            name,
            authorization,
            data,
        }],
    )?;

    let signed = signer.sign(transaction, session.chain_id())?;
    debug!(
        endpoint = session.endpoint(),
        transaction_id = %signed.id(),
        "Pushing transaction"
    );
    api.push_transaction(&signed.to_push_request()).await
}

async fn fetch_rows(
    session: &Session,
    code: Name,
    scope: &str,
    table: Name,
    query: &TableQuery,
) -> RpcResult<Vec<Value>> {
    let mut rows = Vec::new();
    let mut lower_bound = query.lower_bound.clone();

    loop {
        let request = query.page(code, scope, table, lower_bound.take());
        let page = session.api().get_table_rows(&request).await?;
        rows.extend(page.rows);

        if !(query.fetch_all && page.more) {
            break;
        }
        if page.next_key.is_empty() {
            return Err(RpcError::Decode(format!(
                "{} reported more rows of {}/{} without next_key",
                session.endpoint(),
                code,
                table
            )));
        }
        if request.lower_bound.as_deref() == Some(page.next_key.as_str()) {
            return Err(RpcError::Decode(format!(
                "{} repeated next_key {:?} for {}/{}",
                session.endpoint(),
                page.next_key,
                code,
                table
            )));
        }
        lower_bound = Some(page.next_key);
    }

    Ok(rows)
}
