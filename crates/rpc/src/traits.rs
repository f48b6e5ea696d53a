//! Trait seams between the node client and the transport.
//!
//! The client only talks to nodes through [`ChainApi`], and only obtains a
//! [`ChainApi`] through a [`Connector`]. Tests swap both for scripted
//! in-memory implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RpcResult;
use crate::types::{
    AbiJsonToBinRequest, AbiJsonToBinResponse, AccountInfo, ChainInfo, PushTransactionRequest,
    PushTransactionResponse, TableRows, TableRowsRequest,
};

/// Chain API endpoints used by the client, bound to one node.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Endpoint this handle talks to.
    fn endpoint(&self) -> &str;

    /// `/v1/chain/get_info`
    async fn get_info(&self) -> RpcResult<ChainInfo>;

    /// `/v1/chain/get_table_rows`, one page.
    async fn get_table_rows(&self, request: &TableRowsRequest) -> RpcResult<TableRows>;

    /// `/v1/chain/get_account`
    async fn get_account(&self, account: &str) -> RpcResult<AccountInfo>;

    /// `/v1/chain/abi_json_to_bin`
    async fn abi_json_to_bin(&self, request: &AbiJsonToBinRequest)
        -> RpcResult<AbiJsonToBinResponse>;

    /// `/v1/chain/push_transaction`
    async fn push_transaction(
        &self,
        request: &PushTransactionRequest,
    ) -> RpcResult<PushTransactionResponse>;
}

/// Factory for [`ChainApi`] handles.
pub trait Connector: Send + Sync {
    /// Build a handle for `endpoint`. Must not perform network I/O.
    fn connect(&self, endpoint: &str) -> RpcResult<Arc<dyn ChainApi>>;
}
