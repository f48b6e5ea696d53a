//! Request and response bodies of the chain HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::name::Name;

/// `/v1/chain/get_info` response (fields used by the client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Hex chain id, pinned by the client
    pub chain_id: String,
    /// Head block number
    pub head_block_num: u32,
    /// Head block id
    #[serde(default)]
    pub head_block_id: String,
    /// Head block timestamp, UTC without zone suffix
    pub head_block_time: String,
    /// Last irreversible block number
    pub last_irreversible_block_num: u32,
    /// Last irreversible block id, used as the transaction reference block
    pub last_irreversible_block_id: String,
}

/// Options for [`NodeClient::get_table_rows`](crate::NodeClient::get_table_rows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    /// Rows per page (default: 10)
    pub limit: u32,
    /// Inclusive lower bound of the index key
    pub lower_bound: Option<String>,
    /// Inclusive upper bound of the index key
    pub upper_bound: Option<String>,
    /// Index to read (`primary`, `secondary`, ...)
    pub index_position: Option<String>,
    /// Key type of the index (`name`, `i64`, `sha256`, ...)
    pub key_type: Option<String>,
    /// Follow `next_key` until the table is exhausted
    pub fetch_all: bool,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            lower_bound: None,
            upper_bound: None,
            index_position: None,
            key_type: None,
            fetch_all: false,
        }
    }
}

impl TableQuery {
    /// Query every row, paging by `limit`.
    pub fn all() -> Self {
        Self {
            fetch_all: true,
            ..Default::default()
        }
    }

    /// Query rows whose key lies in `[lower, upper]`.
    pub fn bounded(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            lower_bound: Some(lower.into()),
            upper_bound: Some(upper.into()),
            ..Default::default()
        }
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Build the request for one page starting at `lower_bound`.
    pub fn page(
        &self,
        code: Name,
        scope: &str,
        table: Name,
        lower_bound: Option<String>,
    ) -> TableRowsRequest {
        TableRowsRequest {
            json: true,
            code,
            scope: scope.to_string(),
            table,
            limit: self.limit,
            lower_bound,
            upper_bound: self.upper_bound.clone(),
            index_position: self.index_position.clone(),
            key_type: self.key_type.clone(),
            reverse: false,
            show_payer: false,
        }
    }
}

/// `/v1/chain/get_table_rows` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowsRequest {
    pub json: bool,
    pub code: Name,
    pub scope: String,
    pub table: Name,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    pub reverse: bool,
    pub show_payer: bool,
}

/// `/v1/chain/get_table_rows` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub next_key: String,
}

/// `/v1/chain/get_account` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    pub account_name: Name,
}

/// `/v1/chain/get_account` response (fields used by the client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_name: Name,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl AccountInfo {
    /// First key of the `owner` permission.
    pub fn owner_key(&self) -> Option<&str> {
        self.permission_key("owner")
    }

    /// First key of the named permission.
    pub fn permission_key(&self, perm_name: &str) -> Option<&str> {
        self.permissions
            .iter()
            .find(|p| p.perm_name == perm_name)
            .and_then(|p| p.required_auth.keys.first())
            .map(|k| k.key.as_str())
    }
}

/// Account permission entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub perm_name: String,
    #[serde(default)]
    pub parent: String,
    pub required_auth: Authority,
}

/// Threshold authority of a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub threshold: u32,
    #[serde(default)]
    pub keys: Vec<KeyWeight>,
}

/// Weighted key in an authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: String,
    pub weight: u16,
}

/// `/v1/chain/abi_json_to_bin` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiJsonToBinRequest {
    pub code: Name,
    pub action: Name,
    pub args: Value,
}

/// `/v1/chain/abi_json_to_bin` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiJsonToBinResponse {
    /// Hex-encoded action data
    pub binargs: String,
}

/// `/v1/chain/push_transaction` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTransactionRequest {
    pub signatures: Vec<String>,
    pub compression: u8,
    pub packed_context_free_data: String,
    pub packed_trx: String,
}

/// `/v1/chain/push_transaction` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTransactionResponse {
    pub transaction_id: String,
    #[serde(default)]
    pub processed: Value,
}

/// Error body returned by nodes on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeErrorResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error: Option<NodeErrorDetail>,
}

/// Nested error detail of [`NodeErrorResponse`].
#[derive(Debug, Clone, Deserialize)]
pub struct NodeErrorDetail {
    #[serde(default)]
    pub what: String,
    #[serde(default)]
    pub details: Vec<Value>,
}

impl NodeErrorResponse {
    /// Most specific message available.
    pub fn describe(&self) -> String {
        let detail = self.error.as_ref().and_then(|e| {
            e.details
                .first()
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| (!e.what.is_empty()).then(|| e.what.clone()))
        });
        match detail {
            Some(detail) => format!("{}: {}", self.message, detail),
            None => self.message.clone(),
        }
    }
}
