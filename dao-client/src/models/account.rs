//! Ledger account identifiers and their 20-byte solidity address form.
//!
//! A ledger id `shard.realm.num` maps onto the "long-zero" address layout:
//! 4 bytes of shard, 8 bytes of realm, 8 bytes of num, all big-endian.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DaoError;

/// Largest realm/num the ledger assigns (entity numbers are signed 64-bit).
const MAX_ENTITY_NUM: u64 = i64::MAX as u64;

/// Native ledger identifier (`shard.realm.num`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId {
    shard: u32,
    realm: u64,
    num: u64,
}

impl AccountId {
    pub fn new(shard: u32, realm: u64, num: u64) -> Result<Self, DaoError> {
        if realm > MAX_ENTITY_NUM || num > MAX_ENTITY_NUM {
            return Err(DaoError::invalid_address(format!(
                "{}.{}.{} is out of range",
                shard, realm, num
            )));
        }
        Ok(Self { shard, realm, num })
    }

    pub fn shard(&self) -> u32 {
        self.shard
    }

    pub fn realm(&self) -> u64 {
        self.realm
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn is_zero(&self) -> bool {
        self.shard == 0 && self.realm == 0 && self.num == 0
    }

    /// Converts a raw solidity address into the native id.
    pub fn from_address(address: &Address) -> Result<Self, DaoError> {
        let bytes = address.as_slice();
        let mut shard = [0u8; 4];
        let mut realm = [0u8; 8];
        let mut num = [0u8; 8];
        shard.copy_from_slice(&bytes[0..4]);
        realm.copy_from_slice(&bytes[4..12]);
        num.copy_from_slice(&bytes[12..20]);

        Self::new(
            u32::from_be_bytes(shard),
            u64::from_be_bytes(realm),
            u64::from_be_bytes(num),
        )
        .map_err(|_| {
            DaoError::invalid_address(format!("{} is not a ledger entity address", address))
        })
    }

    /// Converts an arbitrary byte slice; anything other than 20 bytes is rejected.
    pub fn from_address_bytes(bytes: &[u8]) -> Result<Self, DaoError> {
        if bytes.len() != 20 {
            return Err(DaoError::invalid_address(format!(
                "expected 20 address bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_address(&Address::from_slice(bytes))
    }

    pub fn to_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(&self.shard.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..20].copy_from_slice(&self.num.to_be_bytes());
        Address::from(bytes)
    }

    fn parse_dotted(s: &str) -> Result<Self, DaoError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(DaoError::invalid_address(format!("malformed id: {}", s)));
        }
        let bad = |_| DaoError::invalid_address(format!("malformed id: {}", s));
        let shard = parts[0].parse::<u32>().map_err(bad)?;
        let realm = parts[1].parse::<u64>().map_err(bad)?;
        let num = parts[2].parse::<u64>().map_err(bad)?;
        Self::new(shard, realm, num)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for AccountId {
    type Err = DaoError;

    /// Accepts `shard.realm.num` or a 40-hex-digit address (with or without `0x`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('.') {
            return Self::parse_dotted(s);
        }
        let address = Address::from_str(s)
            .map_err(|e| DaoError::invalid_address(format!("{}: {}", s, e)))?;
        Self::from_address(&address)
    }
}

impl From<AccountId> for Address {
    fn from(id: AccountId) -> Self {
        id.to_address()
    }
}

impl TryFrom<Address> for AccountId {
    type Error = DaoError;

    fn try_from(address: Address) -> Result<Self, Self::Error> {
        Self::from_address(&address)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Token reference inside transfer payloads. The ledger's built-in currency
/// has no token contract and is carried as `Native`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRef {
    Native,
    Token(AccountId),
}

impl TokenRef {
    pub const NATIVE_SYMBOL: &'static str = "HBAR";

    /// Maps a decoded token address, substituting `Native` for the zero address.
    pub fn from_address(address: &Address) -> Result<Self, DaoError> {
        if address.is_zero() {
            return Ok(TokenRef::Native);
        }
        AccountId::from_address(address).map(TokenRef::Token)
    }

    pub fn is_native(&self) -> bool {
        matches!(self, TokenRef::Native)
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRef::Native => f.write_str(Self::NATIVE_SYMBOL),
            TokenRef::Token(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for TokenRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == Self::NATIVE_SYMBOL {
            return Ok(TokenRef::Native);
        }
        raw.parse::<AccountId>()
            .map(TokenRef::Token)
            .map_err(serde::de::Error::custom)
    }
}
