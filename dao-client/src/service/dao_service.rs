use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DaoError;
use crate::models::event::abi_json;
use crate::models::{
    AccountId, Dao, DaoSettings, DaoType, DecodedEvent, GovernorAddresses, MultiSigDao, TokenDao,
};
use crate::service::abi::IDao;
use crate::service::batch::{settle_all, with_timeout, Settled};
use crate::service::ledger_client::{read_call, EventFetcher, LiveReader};
use crate::service::membership::{membership_events, replay_membership};

pub const DAO_CREATED: &str = "DAOCreated";
pub const DAO_INFO_UPDATED: &str = "DAOInfoUpdated";

/// Factory contracts, one per DAO kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoFactories {
    pub multisig: AccountId,
    pub governance_token: AccountId,
    pub nft: AccountId,
}

impl DaoFactories {
    pub fn entries(&self) -> [(DaoType, AccountId); 3] {
        [
            (DaoType::MultiSig, self.multisig),
            (DaoType::GovernanceToken, self.governance_token),
            (DaoType::Nft, self.nft),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GovernorArgs {
    token_transfer: Option<AccountId>,
    text: Option<AccountId>,
    contract_upgrade: Option<AccountId>,
    create_token: Option<AccountId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DaoCreatedArgs {
    dao_address: AccountId,
    admin: AccountId,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    logo_url: String,
    #[serde(default)]
    web_links: Vec<String>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    safe_address: Option<AccountId>,
    #[serde(default)]
    token_address: Option<AccountId>,
    #[serde(default, deserialize_with = "abi_json::u256::deserialize")]
    quorum_threshold: U256,
    #[serde(default, deserialize_with = "abi_json::u256::deserialize")]
    voting_delay: U256,
    #[serde(default, deserialize_with = "abi_json::u256::deserialize")]
    voting_period: U256,
    #[serde(default)]
    governors: GovernorArgs,
}

/// Partial settings update; absent fields keep their previous value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DaoInfoUpdatedArgs {
    name: Option<String>,
    description: Option<String>,
    logo_url: Option<String>,
    web_links: Option<Vec<String>>,
}

/// DAO discovery from factory creation events.
pub struct DaoService {
    events: Arc<dyn EventFetcher>,
    reader: Arc<dyn LiveReader>,
    factories: DaoFactories,
    timeout: Duration,
}

impl DaoService {
    pub fn new(
        events: Arc<dyn EventFetcher>,
        reader: Arc<dyn LiveReader>,
        factories: DaoFactories,
        timeout: Duration,
    ) -> Self {
        Self {
            events,
            reader,
            factories,
            timeout,
        }
    }

    /// Lists the DAOs of every factory; a failing factory or DAO is reported, not fatal.
    pub async fn fetch_daos(&self) -> Settled<Dao> {
        let factory_tasks: Vec<_> = self
            .factories
            .entries()
            .into_iter()
            .map(|(dao_type, factory)| {
                (
                    format!("{:?} factory {}", dao_type, factory),
                    self.fetch_created(dao_type, factory),
                )
            })
            .collect();
        let created = settle_all(factory_tasks, self.timeout).await.flatten();

        let dao_tasks: Vec<_> = created
            .succeeded
            .into_iter()
            .map(|(dao_type, event)| {
                (
                    format!(
                        "{:?} DAO at block {} on {}",
                        dao_type, event.sequence.block_number, event.contract_id
                    ),
                    self.build_dao(dao_type, event),
                )
            })
            .collect();

        let mut daos = settle_all(dao_tasks, self.timeout).await;
        let mut failed = created.failed;
        failed.append(&mut daos.failed);
        daos.failed = failed;

        info!(
            daos = daos.succeeded.len(),
            dropped = daos.failed.len(),
            "Fetched DAOs"
        );
        daos
    }

    /// Reads the current admin of a DAO contract.
    pub async fn fetch_dao_admin(&self, dao: &AccountId) -> Result<AccountId, DaoError> {
        let admin = with_timeout(
            self.timeout,
            read_call(self.reader.as_ref(), dao, &IDao::adminCall {}),
        )
        .await?;
        AccountId::from_address(&admin._0)
    }

    async fn fetch_created(
        &self,
        dao_type: DaoType,
        factory: AccountId,
    ) -> Result<Vec<(DaoType, DecodedEvent)>, DaoError> {
        let events = self.events.fetch_events(&factory, Some(DAO_CREATED)).await?;
        Ok(events.into_iter().map(|e| (dao_type, e)).collect())
    }

    async fn build_dao(&self, dao_type: DaoType, event: DecodedEvent) -> Result<Dao, DaoError> {
        let args: DaoCreatedArgs = event.parse_args()?;

        let mut dao = match dao_type {
            DaoType::MultiSig => {
                let safe = args.safe_address.ok_or_else(|| {
                    DaoError::decode(format!("multi-sig DAO {} without safe", args.dao_address))
                })?;
                Dao::MultiSig(MultiSigDao {
                    address: args.dao_address,
                    admin: args.admin,
                    safe,
                    is_private: args.is_private,
                    settings: initial_settings(&args),
                    membership: Default::default(),
                })
            }
            DaoType::GovernanceToken | DaoType::Nft => {
                let token = token_dao(args)?;
                if dao_type == DaoType::Nft {
                    Dao::Nft(token)
                } else {
                    Dao::GovernanceToken(token)
                }
            }
        };

        let updates = self
            .events
            .fetch_events(&dao.address(), Some(DAO_INFO_UPDATED))
            .await?;
        apply_settings_updates(dao.settings_mut(), &updates)?;
        debug!(dao = %dao.address(), updates = updates.len(), "Applied settings updates");

        if let Dao::MultiSig(multisig) = &mut dao {
            let safe_events = self.events.fetch_events(&multisig.safe, None).await?;
            multisig.membership = replay_membership(&membership_events(&safe_events)?);
        }

        Ok(dao)
    }
}

fn initial_settings(args: &DaoCreatedArgs) -> DaoSettings {
    DaoSettings {
        name: args.name.clone(),
        description: args.description.clone(),
        logo_url: args.logo_url.clone(),
        web_links: args.web_links.clone(),
    }
}

fn token_dao(args: DaoCreatedArgs) -> Result<TokenDao, DaoError> {
    let token = args.token_address.ok_or_else(|| {
        DaoError::decode(format!("token DAO {} without token", args.dao_address))
    })?;
    let small = |value: U256, field: &str| {
        u64::try_from(value)
            .map_err(|_| DaoError::decode(format!("{} {} does not fit u64", field, value)))
    };

    Ok(TokenDao {
        address: args.dao_address,
        admin: args.admin,
        token,
        is_private: args.is_private,
        settings: initial_settings(&args),
        quorum_threshold: small(args.quorum_threshold, "quorumThreshold")?,
        voting_delay: small(args.voting_delay, "votingDelay")?,
        voting_period: small(args.voting_period, "votingPeriod")?,
        governors: GovernorAddresses {
            token_transfer: args.governors.token_transfer,
            text: args.governors.text,
            contract_upgrade: args.governors.contract_upgrade,
            create_token: args.governors.create_token,
        },
    })
}

/// Applies settings events delivered newest-first, so the newest value of each field wins.
fn apply_settings_updates(
    settings: &mut DaoSettings,
    newest_first: &[DecodedEvent],
) -> Result<(), DaoError> {
    for event in newest_first.iter().rev() {
        let update: DaoInfoUpdatedArgs = event.parse_args()?;
        if let Some(name) = update.name {
            settings.name = name;
        }
        if let Some(description) = update.description {
            settings.description = description;
        }
        if let Some(logo_url) = update.logo_url {
            settings.logo_url = logo_url;
        }
        if let Some(web_links) = update.web_links {
            settings.web_links = web_links;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ledger_client::MockLedger;
    use crate::service::membership::{ADDED_OWNER, SAFE_SETUP};
    use alloy_primitives::Address;
    use alloy_sol_types::SolValue;
    use tokio_test::assert_ok;

    fn id(num: u64) -> AccountId {
        AccountId::new(0, 0, num).unwrap()
    }

    fn factories() -> DaoFactories {
        DaoFactories {
            multisig: id(10),
            governance_token: id(11),
            nft: id(12),
        }
    }

    fn create_test_service(ledger: &Arc<MockLedger>) -> DaoService {
        DaoService::new(
            ledger.clone(),
            ledger.clone(),
            factories(),
            Duration::from_secs(5),
        )
    }

    fn multisig_created(dao: u64, safe: u64) -> DecodedEvent {
        DecodedEvent::new(
            DAO_CREATED,
            "0.0.10",
            serde_json::json!({
                "daoAddress": id(dao).to_string(),
                "admin": "0.0.1",
                "name": "Treasury",
                "safeAddress": id(safe).to_string(),
            }),
        )
    }

    fn token_created(dao: u64, factory: &str) -> DecodedEvent {
        DecodedEvent::new(
            DAO_CREATED,
            factory,
            serde_json::json!({
                "daoAddress": id(dao).to_string(),
                "admin": "0.0.1",
                "name": "Guild",
                "description": "token voting",
                "isPrivate": true,
                "tokenAddress": "0.0.700",
                "quorumThreshold": "500",
                "votingDelay": 1,
                "votingPeriod": "0x64",
                "governors": { "tokenTransfer": "0.0.301", "text": "0.0.302" },
            }),
        )
    }

    fn info_updated(dao: u64, args: serde_json::Value) -> DecodedEvent {
        DecodedEvent::new(DAO_INFO_UPDATED, &id(dao).to_string(), args)
    }

    #[tokio::test]
    async fn test_fetch_daos_across_factories() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_event(id(10), multisig_created(100, 101));
        ledger.push_event(id(11), token_created(200, "0.0.11"));
        ledger.push_event(id(12), token_created(300, "0.0.12"));

        ledger.push_event(
            id(101),
            DecodedEvent::new(ADDED_OWNER, "0.0.101", serde_json::json!({ "owner": "0.0.3" })),
        );
        ledger.push_event(
            id(101),
            DecodedEvent::new(
                SAFE_SETUP,
                "0.0.101",
                serde_json::json!({ "owners": ["0.0.1", "0.0.2"], "threshold": 2 }),
            ),
        );

        let service = create_test_service(&ledger);
        let result = service.fetch_daos().await;

        assert!(result.is_complete());
        let types: Vec<DaoType> = result.succeeded.iter().map(|d| d.dao_type()).collect();
        assert_eq!(types, vec![DaoType::MultiSig, DaoType::GovernanceToken, DaoType::Nft]);

        match &result.succeeded[0] {
            Dao::MultiSig(dao) => {
                assert_eq!(dao.safe, id(101));
                assert_eq!(dao.membership.owners, vec![id(3), id(2), id(1)]);
                assert_eq!(dao.membership.threshold, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &result.succeeded[1] {
            Dao::GovernanceToken(dao) => {
                assert_eq!(dao.token, id(700));
                assert!(dao.is_private);
                assert_eq!(dao.quorum_threshold, 500);
                assert_eq!(dao.voting_period, 100);
                assert_eq!(dao.governors.text, Some(id(302)));
                assert_eq!(dao.governors.contract_upgrade, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_factory_failure_is_isolated() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_event(id(11), token_created(200, "0.0.11"));
        ledger.push_event(id(12), token_created(300, "0.0.12"));
        ledger.fail_contract(id(10));

        let service = create_test_service(&ledger);
        let result = service.fetch_daos().await;

        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].0.starts_with("MultiSig factory"));
    }

    #[tokio::test]
    async fn test_malformed_dao_is_dropped() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_event(id(11), token_created(200, "0.0.11"));
        ledger.push_event(
            id(11),
            DecodedEvent::new(
                DAO_CREATED,
                "0.0.11",
                serde_json::json!({
                    "daoAddress": "0.0.201",
                    "admin": "0.0.1",
                    "name": "No token",
                }),
            ),
        );

        let service = create_test_service(&ledger);
        let result = service.fetch_daos().await;

        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.succeeded[0].address(), id(200));
        assert!(matches!(result.failed[0].1, DaoError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn test_settings_last_write_wins() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_event(id(11), token_created(200, "0.0.11"));
        // newest first
        ledger.push_event(id(200), info_updated(200, serde_json::json!({ "name": "Guild v3" })));
        ledger.push_event(
            id(200),
            info_updated(
                200,
                serde_json::json!({
                    "name": "Guild v2",
                    "logoUrl": "https://img.example.com/g.png",
                }),
            ),
        );

        let service = create_test_service(&ledger);
        let result = service.fetch_daos().await;

        let settings = result.succeeded[0].settings();
        assert_eq!(settings.name, "Guild v3");
        assert_eq!(settings.logo_url, "https://img.example.com/g.png");
        assert_eq!(settings.description, "token voting");
    }

    #[tokio::test]
    async fn test_fetch_dao_admin() {
        let ledger = Arc::new(MockLedger::new());
        ledger.on_call(id(200), &IDao::adminCall {}, id(42).to_address().abi_encode());

        let service = create_test_service(&ledger);
        let admin = assert_ok!(service.fetch_dao_admin(&id(200)).await);
        assert_eq!(admin, id(42));
    }

    #[tokio::test]
    async fn test_fetch_dao_admin_rejects_non_long_zero_address() {
        let ledger = Arc::new(MockLedger::new());
        let mut raw = [0u8; 20];
        raw[4] = 0x80;
        ledger.on_call(id(200), &IDao::adminCall {}, Address::from(raw).abi_encode());

        let service = create_test_service(&ledger);
        let err = service.fetch_dao_admin(&id(200)).await.unwrap_err();
        assert!(matches!(err, DaoError::InvalidAddress(_)));
    }
}
