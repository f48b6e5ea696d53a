//! Antelope transaction packing and signing.

use std::fmt;

use sha2::{Digest, Sha256};
use tracing::debug;
use valforge_crypto::{AntelopePrivateKey, AntelopePublicKey, AntelopeSignature};

use crate::error::{RpcError, RpcResult};
use crate::health::parse_head_block_time;
use crate::name::Name;
use crate::types::{ChainInfo, PushTransactionRequest};

/// Re-signing attempts before giving up on a canonical signature
const MAX_SIGN_ATTEMPTS: u32 = 64;

/// `actor@permission` authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    /// Parse both names.
    pub fn new(actor: &str, permission: &str) -> RpcResult<Self> {
        Ok(Self {
            actor: actor.parse()?,
            permission: permission.parse()?,
        })
    }
}

/// A contract action with already-serialized data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: Vec<u8>,
}

/// Unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Unix seconds after which the transaction is rejected
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// Header referencing the last irreversible block, expiring
    /// `expire_seconds` after the head block time.
    pub fn new(info: &ChainInfo, expire_seconds: u32, actions: Vec<Action>) -> RpcResult<Self> {
        let head_time = parse_head_block_time(&info.head_block_time).ok_or_else(|| {
            RpcError::Decode(format!("invalid head_block_time {:?}", info.head_block_time))
        })?;
        let head_secs = u32::try_from(head_time.timestamp())
            .map_err(|_| RpcError::Decode(format!("head_block_time out of range: {}", head_time)))?;

        let block_id = hex::decode(&info.last_irreversible_block_id)
            .map_err(|e| RpcError::Decode(format!("invalid block id: {}", e)))?;
        if block_id.len() < 12 {
            return Err(RpcError::Decode(format!(
                "block id too short: {} bytes",
                block_id.len()
            )));
        }

        // Block number is the big-endian first word of the id
        let ref_block_num = u16::from_be_bytes([block_id[2], block_id[3]]);
        let ref_block_prefix =
            u32::from_le_bytes([block_id[8], block_id[9], block_id[10], block_id[11]]);

        Ok(Self {
            expiration: head_secs.saturating_add(expire_seconds),
            ref_block_num,
            ref_block_prefix,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
            context_free_actions: Vec::new(),
            actions,
        })
    }

    /// Binary serialization.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.expiration.to_le_bytes());
        buf.extend_from_slice(&self.ref_block_num.to_le_bytes());
        buf.extend_from_slice(&self.ref_block_prefix.to_le_bytes());
        write_varuint32(&mut buf, self.max_net_usage_words);
        buf.push(self.max_cpu_usage_ms);
        write_varuint32(&mut buf, self.delay_sec);
        pack_actions(&mut buf, &self.context_free_actions);
        pack_actions(&mut buf, &self.actions);
        // transaction_extensions
        write_varuint32(&mut buf, 0);
        buf
    }

    /// `sha256(chain_id || packed || zeros(32))`; the trailing zeros stand
    /// for the hash of the empty context-free data.
    pub fn signing_digest(&self, chain_id: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(chain_id);
        hasher.update(self.pack());
        hasher.update([0u8; 32]);
        hasher.finalize().into()
    }
}

fn pack_actions(buf: &mut Vec<u8>, actions: &[Action]) {
    write_varuint32(buf, actions.len() as u32);
    for action in actions {
        buf.extend_from_slice(&action.account.to_le_bytes());
        buf.extend_from_slice(&action.name.to_le_bytes());
        write_varuint32(buf, action.authorization.len() as u32);
        for level in &action.authorization {
            buf.extend_from_slice(&level.actor.to_le_bytes());
            buf.extend_from_slice(&level.permission.to_le_bytes());
        }
        write_varuint32(buf, action.data.len() as u32);
        buf.extend_from_slice(&action.data);
    }
}

/// LEB128 unsigned encoding
pub fn write_varuint32(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a hex chain id into its 32 bytes.
pub fn decode_chain_id(chain_id: &str) -> RpcResult<[u8; 32]> {
    let bytes =
        hex::decode(chain_id).map_err(|e| RpcError::Signing(format!("invalid chain id: {}", e)))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| RpcError::Signing(format!("chain id must be 32 bytes, got {}", b.len())))
}

/// Transaction with its signatures and packed form.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<AntelopeSignature>,
}

impl SignedTransaction {
    /// Transaction id: `sha256(packed)` in hex.
    pub fn id(&self) -> String {
        hex::encode(Sha256::digest(self.transaction.pack()))
    }

    /// Body for `/v1/chain/push_transaction`.
    pub fn to_push_request(&self) -> PushTransactionRequest {
        PushTransactionRequest {
            signatures: self.signatures.iter().map(ToString::to_string).collect(),
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: hex::encode(self.transaction.pack()),
        }
    }
}

/// Signs transactions on behalf of one account with its `active` key.
#[derive(Clone)]
pub struct Signer {
    actor: Name,
    key: AntelopePrivateKey,
}

impl Signer {
    /// Signer for `actor` holding `key`.
    pub fn new(actor: &str, key: AntelopePrivateKey) -> RpcResult<Self> {
        Ok(Self {
            actor: actor.parse()?,
            key,
        })
    }

    /// Account this signer acts for.
    pub fn actor(&self) -> Name {
        self.actor
    }

    /// Public key of the signing key.
    pub fn public_key(&self) -> AntelopePublicKey {
        self.key.public_key()
    }

    /// Sign `transaction` for `chain_id`.
    ///
    /// Nodes only accept canonical signatures; when one is not canonical
    /// the expiration moves forward one second and the digest is signed
    /// again.
    pub fn sign(&self, mut transaction: Transaction, chain_id: &str) -> RpcResult<SignedTransaction> {
        let chain_id = decode_chain_id(chain_id)?;

        for attempt in 0..MAX_SIGN_ATTEMPTS {
            let digest = transaction.signing_digest(&chain_id);
            let signature = self.key.sign_digest(&digest)?;
            if signature.is_canonical() {
                return Ok(SignedTransaction {
                    transaction,
                    signatures: vec![signature],
                });
            }

            debug!(attempt, "Non-canonical signature, bumping expiration");
            transaction.expiration = transaction.expiration.saturating_add(1);
        }

        Err(RpcError::Signing(format!(
            "no canonical signature after {} attempts",
            MAX_SIGN_ATTEMPTS
        )))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("actor", &self.actor)
            .field("public_key", &self.public_key())
            .finish()
    }
}
