//! Ledger access layer
//!
//! Two collaborator seams feed the aggregators:
//! - [`EventFetcher`]: historical, already-decoded contract events
//! - [`LiveReader`]: point-in-time contract calls returning raw ABI output
//!
//! [`LedgerClient`] implements both over HTTP: live reads are JSON-RPC
//! `eth_call` requests against a relay, events come from an indexer that
//! serves decoded logs as JSON. [`MockLedger`] implements both in memory.
//!
//! Neither implementation retries; a failed request is reported once.

use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DaoError;
use crate::models::{AccountId, DecodedEvent};

/// Source of decoded contract events.
///
/// Events for one contract are returned in the fetcher's order, newest first.
#[async_trait]
pub trait EventFetcher: Send + Sync {
    async fn fetch_events(
        &self,
        contract: &AccountId,
        event_name: Option<&str>,
    ) -> Result<Vec<DecodedEvent>, DaoError>;
}

/// Point-in-time contract reads.
#[async_trait]
pub trait LiveReader: Send + Sync {
    async fn call(&self, target: &AccountId, calldata: Bytes) -> Result<Bytes, DaoError>;
}

/// Encodes `call`, reads it from `target` and decodes the typed return.
pub async fn read_call<C: SolCall>(
    reader: &dyn LiveReader,
    target: &AccountId,
    call: &C,
) -> Result<C::Return, DaoError> {
    let output = reader.call(target, Bytes::from(call.abi_encode())).await?;
    C::abi_decode_returns(&output, true)
        .map_err(|e| DaoError::decode(format!("{} on {}: {}", C::SIGNATURE, target, e)))
}

/// Endpoints of the ledger services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC relay used for `eth_call`
    pub rpc_url: String,
    /// Base URL of the decoded-event indexer
    pub indexer_url: String,
}

impl NetworkConfig {
    pub fn new(rpc_url: String, indexer_url: String) -> Self {
        Self {
            rpc_url,
            indexer_url: indexer_url.trim_end_matches('/').to_string(),
        }
    }
}

/// RPC request/response types
#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields used for deserialization from RPC response
struct RpcResponse {
    jsonrpc: String,
    id: u64,
    #[serde(flatten)]
    result: RpcResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResult {
    Success { result: serde_json::Value },
    Error { error: RpcError },
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields used for deserialization from RPC response
struct RpcError {
    code: i32,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// HTTP implementation of both ledger seams.
pub struct LedgerClient {
    network: NetworkConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl LedgerClient {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            network,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make an RPC call to the relay
    async fn rpc_call<T>(&self, method: &str, params: serde_json::Value) -> Result<T, DaoError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        };

        let response = self
            .client
            .post(&self.network.rpc_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DaoError::fetch(format!("HTTP {}: {}", status, text)));
        }

        let rpc_response: RpcResponse = serde_json::from_str(&text)?;

        match rpc_response.result {
            RpcResult::Success { result } => Ok(serde_json::from_value(result)?),
            RpcResult::Error { error } => Err(DaoError::fetch(format!(
                "RPC error {}: {}",
                error.code, error.message
            ))),
        }
    }

    fn events_url(&self, contract: &AccountId) -> String {
        format!("{}/contracts/{}/events", self.network.indexer_url, contract)
    }
}

#[async_trait]
impl LiveReader for LedgerClient {
    async fn call(&self, target: &AccountId, calldata: Bytes) -> Result<Bytes, DaoError> {
        debug!(target = %target, bytes = calldata.len(), "eth_call");
        let params = serde_json::json!([
            { "to": target.to_address(), "data": calldata },
            "latest"
        ]);
        let output: String = self.rpc_call("eth_call", params).await?;
        Bytes::from_str(&output).map_err(|e| DaoError::decode(format!("eth_call output: {}", e)))
    }
}

#[async_trait]
impl EventFetcher for LedgerClient {
    async fn fetch_events(
        &self,
        contract: &AccountId,
        event_name: Option<&str>,
    ) -> Result<Vec<DecodedEvent>, DaoError> {
        let mut request = self
            .client
            .get(self.events_url(contract))
            .query(&[("order", "desc")]);
        if let Some(name) = event_name {
            request = request.query(&[("name", name)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DaoError::fetch(format!("HTTP {}: {}", status, text)));
        }

        let events: Vec<DecodedEvent> = response.json().await?;
        info!(
            contract = %contract,
            event = event_name.unwrap_or("*"),
            count = events.len(),
            "Fetched contract events"
        );
        Ok(events)
    }
}

/// In-memory ledger for tests and offline consumers.
///
/// Events are stored per contract in fetcher order (newest first). Calls are
/// matched on exact `(target, calldata)`. Contracts marked as failing return
/// `FetchFailure` from both seams; stalled contracts never answer. A panic
/// while a lock is held does not invalidate the stored fixtures, so poisoned
/// locks are recovered rather than reported.
#[derive(Default)]
pub struct MockLedger {
    events: Mutex<HashMap<AccountId, Vec<DecodedEvent>>>,
    calls: Mutex<HashMap<(AccountId, Vec<u8>), Vec<u8>>>,
    failing: Mutex<HashSet<AccountId>>,
    stalled: Mutex<HashSet<AccountId>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event; push newest first.
    pub fn push_event(&self, contract: AccountId, event: DecodedEvent) {
        locked(&self.events).entry(contract).or_default().push(event);
    }

    pub fn on_call<C: SolCall>(&self, target: AccountId, call: &C, output: Vec<u8>) {
        locked(&self.calls).insert((target, call.abi_encode()), output);
    }

    pub fn fail_contract(&self, contract: AccountId) {
        locked(&self.failing).insert(contract);
    }

    pub fn stall_contract(&self, contract: AccountId) {
        locked(&self.stalled).insert(contract);
    }

    async fn check_reachable(&self, contract: &AccountId) -> Result<(), DaoError> {
        let stalled = locked(&self.stalled).contains(contract);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if locked(&self.failing).contains(contract) {
            return Err(DaoError::fetch(format!("{} unreachable", contract)));
        }
        Ok(())
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl EventFetcher for MockLedger {
    async fn fetch_events(
        &self,
        contract: &AccountId,
        event_name: Option<&str>,
    ) -> Result<Vec<DecodedEvent>, DaoError> {
        self.check_reachable(contract).await?;
        let events = locked(&self.events);
        Ok(events
            .get(contract)
            .map(|all| {
                all.iter()
                    .filter(|e| event_name.map_or(true, |name| e.is(name)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl LiveReader for MockLedger {
    async fn call(&self, target: &AccountId, calldata: Bytes) -> Result<Bytes, DaoError> {
        self.check_reachable(target).await?;
        let calls = locked(&self.calls);
        calls
            .get(&(*target, calldata.to_vec()))
            .map(|output| Bytes::from(output.clone()))
            .ok_or_else(|| DaoError::fetch(format!("no mock response for call on {}", target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::abi::IGovernor;
    use alloy_primitives::U256;
    use alloy_sol_types::SolValue;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn id(num: u64) -> AccountId {
        AccountId::new(0, 0, num).unwrap()
    }

    #[test]
    fn test_network_config_trims_indexer_url() {
        let config = NetworkConfig::new(
            "https://relay.example.com/api".to_string(),
            "https://indexer.example.com/".to_string(),
        );
        assert_eq!(config.indexer_url, "https://indexer.example.com");

        let client = LedgerClient::new(config);
        assert_eq!(
            client.events_url(&id(1234)),
            "https://indexer.example.com/contracts/0.0.1234/events"
        );
    }

    #[tokio::test]
    async fn test_mock_fetch_filters_by_name() {
        let ledger = MockLedger::new();
        ledger.push_event(id(1), DecodedEvent::new("B", "0.0.1", serde_json::json!({})));
        ledger.push_event(id(1), DecodedEvent::new("A", "0.0.1", serde_json::json!({})));

        let all = assert_ok!(ledger.fetch_events(&id(1), None).await);
        assert_eq!(all.len(), 2);
        assert!(all[0].is("B"));

        let only_a = assert_ok!(ledger.fetch_events(&id(1), Some("A")).await);
        assert_eq!(only_a.len(), 1);

        let none = assert_ok!(ledger.fetch_events(&id(2), None).await);
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_mock_typed_read() {
        let ledger = MockLedger::new();
        let call = IGovernor::stateCall {
            proposalId: U256::from(7u64),
        };
        ledger.on_call(id(5), &call, U256::from(4u64).abi_encode());

        let state = assert_ok!(read_call(&ledger, &id(5), &call).await);
        assert_eq!(state._0, 4);

        let other = IGovernor::stateCall {
            proposalId: U256::from(8u64),
        };
        assert!(read_call(&ledger, &id(5), &other).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_failing_contract() {
        let ledger = MockLedger::new();
        ledger.push_event(id(1), DecodedEvent::new("A", "0.0.1", serde_json::json!({})));
        ledger.fail_contract(id(1));

        let result = ledger.fetch_events(&id(1), None).await;
        assert!(matches!(result, Err(DaoError::FetchFailure(_))));
    }

    #[tokio::test]
    async fn test_bad_return_data_is_decode_failure() {
        let ledger = MockLedger::new();
        let call = IGovernor::stateCall {
            proposalId: U256::from(1u64),
        };
        ledger.on_call(id(5), &call, vec![0u8; 3]);

        let result = read_call(&ledger, &id(5), &call).await;
        assert!(matches!(result, Err(DaoError::DecodeFailure(_))));
    }

    #[tokio::test]
    async fn test_mock_recovers_poisoned_lock() {
        let ledger = Arc::new(MockLedger::new());
        let holder = ledger.clone();
        let panicked = std::thread::spawn(move || {
            let _events = holder.events.lock().unwrap();
            panic!("fixture setup failed while holding the event lock");
        })
        .join();
        assert!(panicked.is_err());
        assert!(ledger.events.is_poisoned());

        ledger.push_event(id(1), DecodedEvent::new("A", "0.0.1", serde_json::json!({})));
        ledger.fail_contract(id(2));

        let events = assert_ok!(ledger.fetch_events(&id(1), None).await);
        assert_eq!(events.len(), 1);
        let failing = ledger.fetch_events(&id(2), None).await;
        assert!(matches!(failing, Err(DaoError::FetchFailure(_))));
    }
}
