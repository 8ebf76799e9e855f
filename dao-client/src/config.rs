use serde::Deserialize;
use std::env;
use std::time::Duration;
use validator::Validate;

use crate::error::DaoError;
use crate::models::AccountId;
use crate::service::dao_service::DaoFactories;
use crate::service::ledger_client::NetworkConfig;
use crate::service::status::Precision;
use crate::telemetry::DEFAULT_LOG_DIRECTIVE;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_VOTE_PRECISION: u32 = 8;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub factories: DaoFactories,
    pub client: ClientConfig,
    pub rust_log: String,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct LedgerConfig {
    #[validate(url)]
    pub rpc_url: String,
    #[validate(url)]
    pub indexer_url: String,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ClientConfig {
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,
    #[validate(range(max = 28))]
    pub vote_precision: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("missing environment variable {}", key))
        };

        let rpc_url = required("LEDGER_RPC_URL")?;
        let indexer_url = required("EVENT_INDEXER_URL")?;
        let multisig: AccountId = required("MULTISIG_DAO_FACTORY")?.parse()?;
        let governance_token: AccountId = required("GOVERNANCE_DAO_FACTORY")?.parse()?;
        let nft: AccountId = required("NFT_DAO_FACTORY")?.parse()?;
        let request_timeout_ms: u64 = match lookup("REQUEST_TIMEOUT_MS") {
            Some(raw) => raw.parse()?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };
        let vote_precision: u32 = match lookup("VOTE_PRECISION") {
            Some(raw) => raw.parse()?,
            None => DEFAULT_VOTE_PRECISION,
        };
        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string());

        let config = Config {
            ledger: LedgerConfig {
                rpc_url,
                indexer_url,
            },
            factories: DaoFactories {
                multisig,
                governance_token,
                nft,
            },
            client: ClientConfig {
                request_timeout_ms,
                vote_precision,
            },
            rust_log,
        };
        config.ledger.validate()?;
        config.client.validate()?;
        Ok(config)
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig::new(self.ledger.rpc_url.clone(), self.ledger.indexer_url.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.client.request_timeout_ms)
    }

    pub fn vote_precision(&self) -> Result<Precision, DaoError> {
        Precision::new(self.client.vote_precision)
    }
}
