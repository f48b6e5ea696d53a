//! Node client tests against a scripted in-memory chain.
//!
//! Each mock node can be switched between healthy, stale and down, can be
//! told to fail a number of operations, and records every request it
//! serves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use valforge_crypto::{AntelopePrivateKey, AntelopeSignature};
use valforge_rpc::types::{
    AbiJsonToBinRequest, AbiJsonToBinResponse, Authority, KeyWeight, Permission,
    PushTransactionRequest, TableRowsRequest,
};
use valforge_rpc::{
    AccountInfo, ChainApi, ChainInfo, ClientError, Connector, NodeClient, NodeClientConfig,
    PushTransactionResponse, RpcError, RpcResult, Signer, TableQuery, TableRows,
};

const CHAIN_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const CHAIN_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const REWARD: &str = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Healthy,
    Stale,
    Down,
}

struct MockNode {
    endpoint: String,
    chain_id: String,
    mode: Mutex<Mode>,
    info_calls: AtomicUsize,
    op_calls: AtomicUsize,
    op_failures: AtomicUsize,
    outage: Arc<AtomicUsize>,
    rows: Vec<Value>,
    /// Fixed `next_key` served with `more: true` on every page
    stuck_cursor: Mutex<Option<String>>,
    validators: Vec<String>,
    table_requests: Mutex<Vec<TableRowsRequest>>,
    abi_requests: Mutex<Vec<AbiJsonToBinRequest>>,
    pushed: Mutex<Vec<PushTransactionRequest>>,
}

impl MockNode {
    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn fail_ops(&self, count: usize) {
        self.op_failures.store(count, Ordering::SeqCst);
    }

    fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    fn op_calls(&self) -> usize {
        self.op_calls.load(Ordering::SeqCst)
    }

    /// Count an operation and fail it if failures are scheduled.
    fn begin_op(&self) -> RpcResult<()> {
        self.op_calls.fetch_add(1, Ordering::SeqCst);
        let scheduled = self
            .op_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scheduled {
            return Err(RpcError::Http(format!("injected failure from {}", self.endpoint)));
        }
        Ok(())
    }

    fn chain_info(&self, lag: chrono::Duration) -> ChainInfo {
        let head = Utc::now() - lag;
        ChainInfo {
            chain_id: self.chain_id.clone(),
            head_block_num: 1000,
            head_block_id: format!("000003e8{}", "22".repeat(28)),
            head_block_time: head.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            last_irreversible_block_num: 1000,
            last_irreversible_block_id: format!("000003e8{}", "11".repeat(28)),
        }
    }
}

#[async_trait]
impl ChainApi for MockNode {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_info(&self) -> RpcResult<ChainInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .outage
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RpcError::Http("network outage".to_string()));
        }

        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Healthy => Ok(self.chain_info(chrono::Duration::zero())),
            Mode::Stale => Ok(self.chain_info(chrono::Duration::minutes(10))),
            Mode::Down => Err(RpcError::Http(format!("{} is down", self.endpoint))),
        }
    }

    async fn get_table_rows(&self, request: &TableRowsRequest) -> RpcResult<TableRows> {
        self.begin_op()?;
        self.table_requests.lock().unwrap().push(request.clone());

        if request.table.to_string() == "validators" {
            let lower = request.lower_bound.clone().unwrap_or_default();
            let upper = request.upper_bound.clone().unwrap_or_else(|| "zzzzzzzzzzzzj".into());
            let rows = self
                .validators
                .iter()
                .filter(|v| **v >= lower && **v <= upper)
                .map(|v| json!({"owner": v}))
                .collect();
            return Ok(TableRows {
                rows,
                more: false,
                next_key: String::new(),
            });
        }

        if let Some(cursor) = self.stuck_cursor.lock().unwrap().clone() {
            return Ok(TableRows {
                rows: self.rows.iter().take(request.limit as usize).cloned().collect(),
                more: true,
                next_key: cursor,
            });
        }

        let start: usize = match &request.lower_bound {
            Some(key) => key.parse().unwrap(),
            None => 0,
        };
        let end = (start + request.limit as usize).min(self.rows.len());
        let more = end < self.rows.len();
        Ok(TableRows {
            rows: self.rows[start..end].to_vec(),
            more,
            next_key: if more { end.to_string() } else { String::new() },
        })
    }

    async fn get_account(&self, account: &str) -> RpcResult<AccountInfo> {
        self.begin_op()?;
        Ok(AccountInfo {
            account_name: account.parse()?,
            permissions: vec![Permission {
                perm_name: "owner".to_string(),
                parent: String::new(),
                required_auth: Authority {
                    threshold: 1,
                    keys: vec![KeyWeight {
                        key: "PUB_K1_owner".to_string(),
                        weight: 1,
                    }],
                },
            }],
        })
    }

    async fn abi_json_to_bin(
        &self,
        request: &AbiJsonToBinRequest,
    ) -> RpcResult<AbiJsonToBinResponse> {
        self.begin_op()?;
        self.abi_requests.lock().unwrap().push(request.clone());
        Ok(AbiJsonToBinResponse {
            binargs: "0102030405".to_string(),
        })
    }

    async fn push_transaction(
        &self,
        request: &PushTransactionRequest,
    ) -> RpcResult<PushTransactionResponse> {
        self.begin_op()?;
        self.pushed.lock().unwrap().push(request.clone());
        Ok(PushTransactionResponse {
            transaction_id: hex::encode(Sha256::digest(hex::decode(&request.packed_trx).unwrap())),
            processed: json!({}),
        })
    }
}

#[derive(Default)]
struct MockNetwork {
    nodes: HashMap<String, Arc<MockNode>>,
    order: Vec<String>,
    outage: Arc<AtomicUsize>,
}

impl MockNetwork {
    fn add(&mut self, endpoint: &str, chain_id: &str, mode: Mode) -> Arc<MockNode> {
        self.add_with_rows(endpoint, chain_id, mode, Vec::new())
    }

    fn add_with_rows(
        &mut self,
        endpoint: &str,
        chain_id: &str,
        mode: Mode,
        rows: Vec<Value>,
    ) -> Arc<MockNode> {
        let node = Arc::new(MockNode {
            endpoint: endpoint.to_string(),
            chain_id: chain_id.to_string(),
            mode: Mutex::new(mode),
            info_calls: AtomicUsize::new(0),
            op_calls: AtomicUsize::new(0),
            op_failures: AtomicUsize::new(0),
            outage: Arc::clone(&self.outage),
            rows,
            stuck_cursor: Mutex::new(None),
            validators: vec!["val1.sat".to_string(), "val3.sat".to_string()],
            table_requests: Mutex::new(Vec::new()),
            abi_requests: Mutex::new(Vec::new()),
            pushed: Mutex::new(Vec::new()),
        });
        self.nodes.insert(endpoint.to_string(), Arc::clone(&node));
        self.order.push(endpoint.to_string());
        node
    }

    fn config(&self) -> NodeClientConfig {
        NodeClientConfig {
            retry_base_delay: Duration::from_millis(1),
            starvation_base_delay: Duration::from_millis(1),
            starvation_max_delay: Duration::from_millis(4),
            health_timeout: Duration::from_secs(1),
            ..NodeClientConfig::with_nodes(self.order.clone())
        }
    }
}

impl Connector for MockNetwork {
    fn connect(&self, endpoint: &str) -> RpcResult<Arc<dyn ChainApi>> {
        match self.nodes.get(endpoint) {
            Some(node) => Ok(Arc::clone(node) as Arc<dyn ChainApi>),
            None => Err(RpcError::Http(format!("unknown endpoint {}", endpoint))),
        }
    }
}

fn signing_key() -> AntelopePrivateKey {
    AntelopePrivateKey::from_bytes(&[0x11; 32]).unwrap()
}

fn signer() -> Signer {
    Signer::new("val1.sat", signing_key()).unwrap()
}

async fn connect(network: MockNetwork) -> (NodeClient, Arc<MockNetwork>) {
    let network = Arc::new(network);
    let config = network.config();
    let client = NodeClient::connect(config, network.clone(), signer())
        .await
        .expect("connect");
    (client, network)
}

#[tokio::test]
async fn test_selection_skips_stale_node() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Stale);
    let b = network.add("http://b", CHAIN_A, Mode::Healthy);
    let c = network.add("http://c", CHAIN_A, Mode::Healthy);

    let (client, _network) = connect(network).await;

    assert_eq!(client.current_endpoint(), "http://b");
    assert_eq!(client.chain_id(), CHAIN_A);
    assert_eq!(a.info_calls(), 1);
    assert_eq!(b.info_calls(), 1);
    assert_eq!(c.info_calls(), 0);
}

#[tokio::test]
async fn test_no_healthy_node() {
    let mut network = MockNetwork::default();
    network.add("http://a", CHAIN_A, Mode::Down);
    network.add("http://b", CHAIN_A, Mode::Stale);
    let network = Arc::new(network);

    let result = NodeClient::connect(network.config(), network.clone(), signer()).await;
    assert!(matches!(result, Err(ClientError::NoHealthyNode(2))));
}

#[tokio::test]
async fn test_empty_pool_has_no_healthy_node() {
    let network = Arc::new(MockNetwork::default());
    let result = NodeClient::connect(network.config(), network.clone(), signer()).await;
    assert!(matches!(result, Err(ClientError::NoHealthyNode(0))));
}

#[tokio::test]
async fn test_rotation_to_healthy_node_before_retry() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let b = network.add("http://b", CHAIN_A, Mode::Healthy);
    let c = network.add("http://c", CHAIN_A, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    assert_eq!(client.current_endpoint(), "http://a");

    a.fail_ops(1);
    a.set_mode(Mode::Down);
    b.set_mode(Mode::Stale);

    let account = client.get_account("val1.sat").await.unwrap();
    assert_eq!(account.owner_key(), Some("PUB_K1_owner"));

    assert_eq!(client.current_endpoint(), "http://c");
    assert_eq!(a.op_calls(), 1);
    assert_eq!(b.op_calls(), 0);
    assert_eq!(b.info_calls(), 1);
    assert_eq!(c.op_calls(), 1);
}

#[tokio::test]
async fn test_starvation_then_recovery() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let b = network.add("http://b", CHAIN_A, Mode::Healthy);

    let (mut client, network) = connect(network).await;
    assert_eq!(a.info_calls(), 1);

    // Three full passes over both nodes fail, then the network returns
    a.fail_ops(1);
    network.outage.store(6, Ordering::SeqCst);

    let account = client.get_account("val1.sat").await.unwrap();
    assert_eq!(account.account_name.to_string(), "val1.sat");

    assert_eq!(network.outage.load(Ordering::SeqCst), 0);
    assert_eq!(client.current_endpoint(), "http://b");
    assert_eq!(a.info_calls(), 1 + 3);
    assert_eq!(b.info_calls(), 3 + 1);
    assert_eq!(b.op_calls(), 1);
}

#[tokio::test]
async fn test_retry_budget_returns_original_error() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let b = network.add("http://b", CHAIN_A, Mode::Healthy);
    a.fail_ops(10);
    b.fail_ops(10);

    let (mut client, _network) = connect(network).await;
    let err = client.get_account("val1.sat").await.unwrap_err();

    // first attempt plus three retries, alternating a, b, a, b
    assert_eq!(a.op_calls() + b.op_calls(), 4);
    match err {
        ClientError::Rpc(RpcError::Http(message)) => {
            assert_eq!(message, "injected failure from http://b");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_retries_fails_once() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    network.add("http://b", CHAIN_A, Mode::Healthy);
    a.fail_ops(1);

    let network = Arc::new(network);
    let config = NodeClientConfig {
        max_retries: 0,
        ..network.config()
    };
    let mut client = NodeClient::connect(config, network.clone(), signer())
        .await
        .unwrap();

    assert!(client.get_account("val1.sat").await.is_err());
    assert_eq!(a.op_calls(), 1);
    assert_eq!(client.current_endpoint(), "http://a");
}

#[tokio::test]
async fn test_rotation_skips_other_chain() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let b = network.add("http://b", CHAIN_B, Mode::Healthy);
    let c = network.add("http://c", CHAIN_A, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    a.fail_ops(1);

    client.get_account("val1.sat").await.unwrap();

    assert_eq!(client.current_endpoint(), "http://c");
    assert_eq!(client.chain_id(), CHAIN_A);
    assert_eq!(b.info_calls(), 1);
    assert_eq!(b.op_calls(), 0);
    assert_eq!(c.op_calls(), 1);
}

#[tokio::test]
async fn test_failed_rotation_keeps_chain_id() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let b = network.add("http://b", CHAIN_B, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    a.set_mode(Mode::Down);
    b.set_mode(Mode::Down);

    assert!(!client.rotate().await);
    assert_eq!(client.chain_id(), CHAIN_A);
    assert_eq!(client.current_endpoint(), "http://a");
}

#[tokio::test]
async fn test_fetch_all_pagination() {
    let rows: Vec<Value> = (0..5).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    let a = network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows);

    let (mut client, _network) = connect(network).await;
    let fetched: Vec<Value> = client
        .get_table_rows(
            "endrmng.xsat",
            "endrmng.xsat",
            "rewards",
            &TableQuery::all().with_limit(2),
        )
        .await
        .unwrap();

    let ids: Vec<i64> = fetched.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    let requests = a.table_requests.lock().unwrap();
    let bounds: Vec<Option<String>> = requests.iter().map(|r| r.lower_bound.clone()).collect();
    assert_eq!(bounds, vec![None, Some("2".to_string()), Some("4".to_string())]);
}

#[tokio::test]
async fn test_single_page_without_fetch_all() {
    let rows: Vec<Value> = (0..5).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    let a = network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows);

    let (mut client, _network) = connect(network).await;
    let fetched: Vec<Value> = client
        .get_table_rows(
            "endrmng.xsat",
            "endrmng.xsat",
            "rewards",
            &TableQuery::default().with_limit(2),
        )
        .await
        .unwrap();

    assert_eq!(fetched.len(), 2);
    assert_eq!(a.table_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_pagination_retried_as_one_unit() {
    let rows: Vec<Value> = (0..5).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    let a = network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows.clone());
    let b = network.add_with_rows("http://b", CHAIN_A, Mode::Healthy, rows);

    let (mut client, _network) = connect(network).await;
    a.fail_ops(1);

    let fetched: Vec<Value> = client
        .get_table_rows("endrmng.xsat", "endrmng.xsat", "rewards", &TableQuery::all().with_limit(2))
        .await
        .unwrap();

    assert_eq!(fetched.len(), 5);
    assert_eq!(b.table_requests.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_typed_rows() {
    #[derive(serde::Deserialize)]
    struct Row {
        id: u32,
    }

    let rows: Vec<Value> = (0..3).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows);

    let (mut client, _network) = connect(network).await;
    let fetched: Vec<Row> = client
        .get_table_rows("endrmng.xsat", "endrmng.xsat", "rewards", &TableQuery::all())
        .await
        .unwrap();
    assert_eq!(fetched.iter().map(|r| r.id).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_register_validator_submits_signed_action() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    let response = client.register_validator("val1.sat", REWARD).await.unwrap();

    let abi_requests = a.abi_requests.lock().unwrap();
    assert_eq!(abi_requests.len(), 1);
    assert_eq!(abi_requests[0].code.to_string(), "endrmng.xsat");
    assert_eq!(abi_requests[0].action.to_string(), "newregvldtor");
    assert_eq!(
        abi_requests[0].args,
        json!({
            "validator": "val1.sat",
            "role": "1",
            "stake_addr": "5B38Da6a701c568545dCfcB03FcB875f56beddC4",
            "reward_addr": "5B38Da6a701c568545dCfcB03FcB875f56beddC4",
            "commission_rate": null,
        })
    );

    let pushed = a.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    let request = &pushed[0];
    assert_eq!(request.compression, 0);
    assert_eq!(response.transaction_id.len(), 64);

    // signature recovers to the signer over sha256(chain_id || trx || zeros)
    let packed = hex::decode(&request.packed_trx).unwrap();
    let mut hasher = Sha256::new();
    hasher.update(hex::decode(CHAIN_A).unwrap());
    hasher.update(&packed);
    hasher.update([0u8; 32]);
    let digest: [u8; 32] = hasher.finalize().into();

    let signature: AntelopeSignature = request.signatures[0].parse().unwrap();
    assert!(signature.is_canonical());
    assert_eq!(signature.recover(&digest).unwrap(), signing_key().public_key());

    // action data from abi_json_to_bin is embedded verbatim
    assert!(request.packed_trx.contains("050102030405"));
}

#[tokio::test]
async fn test_register_validator_rejects_bad_address() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    let bad_addresses = ["0x1234".to_string(), "a".repeat(39), "a".repeat(41)];
    for bad in &bad_addresses {
        let result = client.register_validator("val1.sat", bad).await;
        assert!(matches!(result, Err(ClientError::InvalidRewardAddress(_))));
    }
    assert_eq!(a.op_calls(), 0);
}

#[tokio::test]
async fn test_submission_retries_on_next_node() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let b = network.add("http://b", CHAIN_A, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    a.fail_ops(1);

    client.register_validator("val1.sat", REWARD).await.unwrap();
    assert!(a.pushed.lock().unwrap().is_empty());
    assert_eq!(b.pushed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_is_validator_registered() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);

    let (mut client, _network) = connect(network).await;
    assert!(client.is_validator_registered("val1.sat").await.unwrap());
    assert!(!client.is_validator_registered("val2.sat").await.unwrap());

    let requests = a.table_requests.lock().unwrap();
    assert_eq!(requests[0].lower_bound.as_deref(), Some("val1.sat"));
    assert_eq!(requests[0].upper_bound.as_deref(), Some("val1.sat"));
    assert_eq!(requests[0].limit, 1);
}

#[tokio::test]
async fn test_read_only_client_cannot_submit() {
    let mut network = MockNetwork::default();
    let a = network.add("http://a", CHAIN_A, Mode::Healthy);
    let network = Arc::new(network);

    let mut client = NodeClient::connect_read_only(network.config(), network.clone())
        .await
        .unwrap();
    assert!(client.signer().is_none());
    assert!(client.is_validator_registered("val3.sat").await.unwrap());

    let result = client.register_validator("val1.sat", REWARD).await;
    assert!(matches!(result, Err(ClientError::NoSigner)));
    assert!(a.pushed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_more_without_next_key_is_an_error() {
    let rows: Vec<Value> = (0..5).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    let a = network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows);
    *a.stuck_cursor.lock().unwrap() = Some(String::new());

    let (mut client, _network) = connect(network).await;
    let result: Result<Vec<Value>, _> = client
        .get_table_rows("endrmng.xsat", "endrmng.xsat", "rewards", &TableQuery::all().with_limit(2))
        .await;

    assert!(matches!(result, Err(ClientError::Rpc(RpcError::Decode(_)))));
    // one page per attempt, four attempts
    assert_eq!(a.table_requests.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_repeated_next_key_is_an_error() {
    let rows: Vec<Value> = (0..5).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    let a = network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows);
    *a.stuck_cursor.lock().unwrap() = Some("2".to_string());

    let (mut client, _network) = connect(network).await;
    let result: Result<Vec<Value>, _> = client
        .get_table_rows("endrmng.xsat", "endrmng.xsat", "rewards", &TableQuery::all().with_limit(2))
        .await;

    assert!(matches!(result, Err(ClientError::Rpc(RpcError::Decode(_)))));
    // None, then "2" twice before the repeat is noticed
    assert_eq!(a.table_requests.lock().unwrap().len(), 8);
}

#[tokio::test]
async fn test_broken_cursor_rotates_to_next_node() {
    let rows: Vec<Value> = (0..5).map(|i| json!({"id": i})).collect();
    let mut network = MockNetwork::default();
    let a = network.add_with_rows("http://a", CHAIN_A, Mode::Healthy, rows.clone());
    let b = network.add_with_rows("http://b", CHAIN_A, Mode::Healthy, rows);
    *a.stuck_cursor.lock().unwrap() = Some("2".to_string());

    let (mut client, _network) = connect(network).await;
    let fetched: Vec<Value> = client
        .get_table_rows("endrmng.xsat", "endrmng.xsat", "rewards", &TableQuery::all().with_limit(2))
        .await
        .unwrap();

    assert_eq!(fetched.len(), 5);
    assert_eq!(client.current_endpoint(), "http://b");
    assert_eq!(a.table_requests.lock().unwrap().len(), 2);
    assert_eq!(b.table_requests.lock().unwrap().len(), 3);
}
