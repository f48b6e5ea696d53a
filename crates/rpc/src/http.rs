//! HTTP transport for the chain API, built on `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::{RpcError, RpcResult};
use crate::traits::{ChainApi, Connector};
use crate::types::{
    AbiJsonToBinRequest, AbiJsonToBinResponse, AccountInfo, AccountRequest, ChainInfo,
    NodeErrorResponse, PushTransactionRequest, PushTransactionResponse, TableRows,
    TableRowsRequest,
};

/// Default per-request timeout for non-probe calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Chain API over HTTP for a single node.
#[derive(Clone)]
pub struct HttpChainApi {
    inner: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpChainApi {
    /// Build a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> RpcResult<Self> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/chain/{}", self.endpoint, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> RpcResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        trace!(%url, "POST");

        let response = self
            .inner
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<NodeErrorResponse>(&bytes) {
                Ok(node_error) => RpcError::Node {
                    code: node_error.code,
                    message: node_error.describe(),
                },
                Err(_) => RpcError::HttpStatus {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                },
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn map_transport(&self, err: reqwest::Error) -> RpcError {
        if err.is_timeout() {
            RpcError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl ChainApi for HttpChainApi {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_info(&self) -> RpcResult<ChainInfo> {
        self.post("get_info", &serde_json::json!({})).await
    }

    async fn get_table_rows(&self, request: &TableRowsRequest) -> RpcResult<TableRows> {
        self.post("get_table_rows", request).await
    }

    async fn get_account(&self, account: &str) -> RpcResult<AccountInfo> {
        let request = AccountRequest {
            account_name: account.parse()?,
        };
        self.post("get_account", &request).await
    }

    async fn abi_json_to_bin(
        &self,
        request: &AbiJsonToBinRequest,
    ) -> RpcResult<AbiJsonToBinResponse> {
        self.post("abi_json_to_bin", request).await
    }

    async fn push_transaction(
        &self,
        request: &PushTransactionRequest,
    ) -> RpcResult<PushTransactionResponse> {
        self.post("push_transaction", request).await
    }
}

/// [`Connector`] producing [`HttpChainApi`] handles.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    /// Connector whose handles use `timeout` per request.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Connector for HttpConnector {
    fn connect(&self, endpoint: &str) -> RpcResult<Arc<dyn ChainApi>> {
        Ok(Arc::new(HttpChainApi::new(endpoint, self.timeout)?))
    }
}
