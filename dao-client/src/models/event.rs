//! Decoded contract events as delivered by the event fetcher.

use alloy_primitives::{Bytes, U256};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::error::DaoError;

/// Ledger position of an event (block, transaction, log index).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventSequence {
    pub block_number: u64,
    pub transaction_index: u64,
    pub log_index: u64,
}

/// Decoded event from a contract log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub event_name: String,
    pub contract_id: String,
    #[serde(default)]
    pub sequence: EventSequence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub args: serde_json::Value,
}

impl DecodedEvent {
    pub fn new(event_name: &str, contract_id: &str, args: serde_json::Value) -> Self {
        Self {
            event_name: event_name.to_string(),
            contract_id: contract_id.to_string(),
            sequence: EventSequence::default(),
            timestamp: None,
            args,
        }
    }

    pub fn at(mut self, block_number: u64, log_index: u64) -> Self {
        self.sequence = EventSequence {
            block_number,
            transaction_index: 0,
            log_index,
        };
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.event_name == name
    }

    /// Deserializes the event arguments into a typed shape.
    pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, DaoError> {
        serde_json::from_value(self.args.clone()).map_err(|e| {
            DaoError::decode(format!("{} args on {}: {}", self.event_name, self.contract_id, e))
        })
    }
}

/// Serde adapters for ABI values carried in JSON event args.
///
/// Indexers emit 256-bit integers either as JSON numbers or as decimal/hex
/// strings, and byte blobs as `0x` hex.
pub mod abi_json {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    pub fn parse_u256(raw: &str) -> Result<U256, String> {
        U256::from_str(raw.trim()).map_err(|e| format!("invalid uint256 {:?}: {}", raw, e))
    }

    pub mod u256 {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
            match NumberOrString::deserialize(deserializer)? {
                NumberOrString::Number(n) => Ok(U256::from(n)),
                NumberOrString::String(s) => parse_u256(&s).map_err(serde::de::Error::custom),
            }
        }

        pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(value)
        }
    }

    pub mod u64_like {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            let value = super::u256::deserialize(deserializer)?;
            u64::try_from(value).map_err(|_| serde::de::Error::custom("value exceeds u64"))
        }
    }

    /// Accepts `shard.realm.num` or hex and yields the raw address.
    pub mod address {
        use super::*;
        use crate::models::AccountId;
        use alloy_primitives::Address;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Address, D::Error> {
            let raw = String::deserialize(deserializer)?;
            if raw.contains('.') {
                return raw
                    .parse::<AccountId>()
                    .map(|id| id.to_address())
                    .map_err(serde::de::Error::custom);
            }
            Address::from_str(raw.trim()).map_err(serde::de::Error::custom)
        }
    }

    pub mod bytes_opt {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Bytes>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") | Some("0x") => Ok(None),
                Some(hex) => Bytes::from_str(hex)
                    .map(Some)
                    .map_err(|e| serde::de::Error::custom(format!("invalid bytes: {}", e))),
            }
        }
    }
}
