use std::sync::Arc;

use crate::config::Config;
use crate::service::{DaoService, EventFetcher, LedgerClient, LiveReader, ProposalService};

/// DAO discovery and proposal aggregation sharing one ledger connection.
pub struct DaoClient {
    pub daos: DaoService,
    pub proposals: ProposalService,
}

impl DaoClient {
    /// Connects to the configured relay and indexer.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let ledger = Arc::new(LedgerClient::new(config.network()));
        Self::with_ledger(config, ledger.clone(), ledger)
    }

    /// Builds the client over arbitrary ledger seams, e.g. a `MockLedger`.
    pub fn with_ledger(
        config: &Config,
        events: Arc<dyn EventFetcher>,
        reader: Arc<dyn LiveReader>,
    ) -> Result<Self, anyhow::Error> {
        let precision = config.vote_precision()?;
        tracing::info!(
            rpc_url = %config.ledger.rpc_url,
            indexer_url = %config.ledger.indexer_url,
            vote_precision = precision.decimals(),
            "DAO client ready"
        );
        Ok(Self {
            daos: DaoService::new(
                events.clone(),
                reader.clone(),
                config.factories,
                config.timeout(),
            ),
            proposals: ProposalService::new(events, reader, precision, config.timeout()),
        })
    }
}
