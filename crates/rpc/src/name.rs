//! Antelope names: up to 13 characters of `.12345a-z` packed into a u64.
//!
//! The first 12 characters take 5 bits each from the top of the word; a
//! 13th character takes the low 4 bits and must be in `.1-5a-j`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RpcError, RpcResult};

/// Longest encodable name
pub const MAX_NAME_LENGTH: usize = 13;

/// Prefix of the EVM address that mirrors a native account
pub const EVM_ADDRESS_PREFIX: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbb";

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// A packed account, action, table or permission name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(u64);

impl Name {
    /// Wrap an already packed value
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// The packed value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Little-endian bytes as serialized in transactions
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// EVM address bridged to this account: the fixed prefix followed by
    /// the packed value as 16 hex digits.
    pub fn to_evm_address(&self) -> String {
        format!("{}{:016x}", EVM_ADDRESS_PREFIX, self.0)
    }

    /// Reverse of [`Name::to_evm_address`].
    pub fn from_evm_address(address: &str) -> RpcResult<Self> {
        let lower = address.to_ascii_lowercase();
        let hex_part = lower
            .strip_prefix(EVM_ADDRESS_PREFIX)
            .filter(|rest| rest.len() == 16)
            .ok_or_else(|| RpcError::InvalidName(format!("not a bridged address: {}", address)))?;
        let value = u64::from_str_radix(hex_part, 16)
            .map_err(|e| RpcError::InvalidName(format!("{}: {}", address, e)))?;
        Ok(Self(value))
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_NAME_LENGTH {
            return Err(RpcError::InvalidName(format!(
                "{:?} is longer than {} characters",
                s, MAX_NAME_LENGTH
            )));
        }

        let mut value = 0u64;
        for (i, &c) in bytes.iter().enumerate() {
            let symbol = char_to_symbol(c).ok_or_else(|| {
                RpcError::InvalidName(format!("{:?} contains invalid character {:?}", s, c as char))
            })?;

            if i < 12 {
                value |= symbol << (64 - 5 * (i + 1));
            } else {
                // 13th character has only 4 bits
                if symbol > 0x0f {
                    return Err(RpcError::InvalidName(format!(
                        "{:?} has an invalid 13th character",
                        s
                    )));
                }
                value |= symbol;
            }
        }

        Ok(Self(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_NAME_LENGTH];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LENGTH {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[MAX_NAME_LENGTH - 1 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }

        let end = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
        // CHARMAP is ASCII
        f.write_str(std::str::from_utf8(&out[..end]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
