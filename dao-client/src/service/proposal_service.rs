use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::DaoError;
use crate::models::event::abi_json;
use crate::models::{
    AccountId, ApprovalSummary, Dao, DecodedEvent, MultiSigDao, Proposal, ProposalCategory,
    ProposalPayload, TokenDao, VoteSummary, VotingWindow,
};
use crate::service::abi::{IGovernor, IMultiSigDao, IVotingToken};
use crate::service::batch::{settle_all, with_timeout, Settled};
use crate::service::ledger_client::{read_call, EventFetcher, LiveReader};
use crate::service::payload_decoder::{
    decode_governance, decode_transaction, same_account, TransactionTag, TransferFields,
};
use crate::service::status::{derive, Precision, StatusEngine, UpgradeCheck, VoteInputs};

pub const PROPOSAL_CREATED: &str = "ProposalCreated";
pub const TRANSACTION_CREATED: &str = "TransactionCreated";
pub const APPROVE_HASH: &str = "ApproveHash";
pub const ADMIN_CHANGED: &str = "AdminChanged";
pub const UPGRADED: &str = "Upgraded";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposalCreatedArgs {
    #[serde(with = "abi_json::u256")]
    proposal_id: U256,
    proposer: AccountId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    discussion_link: Option<String>,
    #[serde(deserialize_with = "abi_json::u64_like::deserialize")]
    start_block: u64,
    #[serde(deserialize_with = "abi_json::u64_like::deserialize")]
    end_block: u64,
    #[serde(default, deserialize_with = "abi_json::bytes_opt::deserialize")]
    data: Option<Bytes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionCreatedArgs {
    txn_hash: B256,
    #[serde(deserialize_with = "abi_json::u64_like::deserialize")]
    transaction_type: u64,
    #[serde(default)]
    to: Option<String>,
    #[serde(default, deserialize_with = "abi_json::u256::deserialize")]
    value: U256,
    #[serde(default, deserialize_with = "abi_json::bytes_opt::deserialize")]
    data: Option<Bytes>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link_to_discussion: Option<String>,
    creator: AccountId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveHashArgs {
    approved_hash: B256,
    owner: AccountId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminChangedArgs {
    #[serde(deserialize_with = "abi_json::address::deserialize")]
    new_admin: Address,
}

#[derive(Debug, Deserialize)]
struct UpgradedArgs {
    #[serde(deserialize_with = "abi_json::address::deserialize")]
    implementation: Address,
}

/// A creation event paired with the governor that emitted it.
struct CreatedProposal {
    category: ProposalCategory,
    governor: AccountId,
    event: DecodedEvent,
}

/// Proposal snapshot aggregator.
///
/// Builds proposal lists from creation events plus live reads. Failures of a
/// category fetch or of a single proposal are reported in `Settled::failed`
/// and never abort the rest of the batch.
pub struct ProposalService {
    events: Arc<dyn EventFetcher>,
    reader: Arc<dyn LiveReader>,
    token_precision: Precision,
    timeout: Duration,
}

impl ProposalService {
    pub fn new(
        events: Arc<dyn EventFetcher>,
        reader: Arc<dyn LiveReader>,
        token_precision: Precision,
        timeout: Duration,
    ) -> Self {
        Self {
            events,
            reader,
            token_precision,
            timeout,
        }
    }

    /// Fetches the proposals of any DAO kind.
    ///
    /// NFT votes are whole tokens, so NFT DAOs are summarized at zero precision.
    pub async fn fetch_proposals(&self, dao: &Dao) -> Settled<Proposal> {
        match dao {
            Dao::MultiSig(dao) => self.fetch_multisig_proposals(dao).await,
            Dao::GovernanceToken(dao) => {
                self.fetch_governance_proposals(dao, StatusEngine::new(self.token_precision))
                    .await
            }
            Dao::Nft(dao) => {
                self.fetch_governance_proposals(dao, StatusEngine::new(Precision::ZERO))
                    .await
            }
        }
    }

    pub async fn fetch_governance_proposals(
        &self,
        dao: &TokenDao,
        engine: StatusEngine,
    ) -> Settled<Proposal> {
        let category_tasks: Vec<_> = dao
            .governors
            .entries()
            .into_iter()
            .map(|(category, governor)| {
                (
                    format!("{} governor {}", category, governor),
                    self.fetch_category(category, governor),
                )
            })
            .collect();

        let (created, total_supply) = tokio::join!(
            settle_all(category_tasks, self.timeout),
            with_timeout(self.timeout, self.total_supply(&dao.token)),
        );
        let created = created.flatten();

        let total_supply = match total_supply {
            Ok(supply) => Some(supply),
            Err(e) => {
                warn!(
                    dao = %dao.address,
                    token = %dao.token,
                    error = %e,
                    "Total supply unavailable"
                );
                None
            }
        };

        let proposal_tasks: Vec<_> = created
            .succeeded
            .into_iter()
            .map(|created| {
                (
                    format!(
                        "{} proposal at block {} on {}",
                        created.category, created.event.sequence.block_number, created.governor
                    ),
                    self.build_governance_proposal(dao, created, engine, total_supply),
                )
            })
            .collect();

        let mut proposals = settle_all(proposal_tasks, self.timeout).await;
        let mut failed = created.failed;
        failed.append(&mut proposals.failed);
        proposals.failed = failed;

        info!(
            dao = %dao.address,
            proposals = proposals.succeeded.len(),
            dropped = proposals.failed.len(),
            "Fetched governance proposals"
        );
        proposals
    }

    pub async fn fetch_multisig_proposals(&self, dao: &MultiSigDao) -> Settled<Proposal> {
        let (created, approvals) = tokio::join!(
            with_timeout(
                self.timeout,
                self.events.fetch_events(&dao.address, Some(TRANSACTION_CREATED))
            ),
            with_timeout(
                self.timeout,
                self.events.fetch_events(&dao.safe, Some(APPROVE_HASH))
            ),
        );

        let created = match created {
            Ok(events) => events,
            Err(e) => {
                warn!(dao = %dao.address, error = %e, "Transaction fetch failed");
                return Settled {
                    succeeded: Vec::new(),
                    failed: vec![(
                        format!("{} transactions {}", ProposalCategory::MultiSig, dao.address),
                        e,
                    )],
                };
            }
        };

        let approvals = match approvals.and_then(|events| approvals_by_hash(&events)) {
            Ok(approvals) => Some(approvals),
            Err(e) => {
                warn!(dao = %dao.address, safe = %dao.safe, error = %e, "Approvals unavailable");
                None
            }
        };

        let tasks: Vec<_> = created
            .into_iter()
            .map(|event| {
                (
                    format!(
                        "{} transaction at block {} on {}",
                        ProposalCategory::MultiSig,
                        event.sequence.block_number,
                        dao.address
                    ),
                    self.build_multisig_proposal(dao, event, approvals.as_ref()),
                )
            })
            .collect();

        let proposals = settle_all(tasks, self.timeout).await;
        info!(
            dao = %dao.address,
            proposals = proposals.succeeded.len(),
            dropped = proposals.failed.len(),
            "Fetched multi-sig proposals"
        );
        proposals
    }

    async fn fetch_category(
        &self,
        category: ProposalCategory,
        governor: AccountId,
    ) -> Result<Vec<CreatedProposal>, DaoError> {
        let events = self
            .events
            .fetch_events(&governor, Some(PROPOSAL_CREATED))
            .await?;
        Ok(events
            .into_iter()
            .map(|event| CreatedProposal {
                category,
                governor,
                event,
            })
            .collect())
    }

    async fn total_supply(&self, token: &AccountId) -> Result<U256, DaoError> {
        let supply =
            read_call(self.reader.as_ref(), token, &IVotingToken::totalSupplyCall {}).await?;
        Ok(supply._0)
    }

    async fn build_governance_proposal(
        &self,
        dao: &TokenDao,
        created: CreatedProposal,
        engine: StatusEngine,
        total_supply: Option<U256>,
    ) -> Result<Proposal, DaoError> {
        let CreatedProposal {
            category,
            governor,
            event,
        } = created;
        let args: ProposalCreatedArgs = event.parse_args()?;
        let contract_id: AccountId = event.contract_id.parse()?;
        let payload = decode_governance(category, args.data.as_ref().map(|b| b.as_ref()))?;

        let proposal_id = args.proposal_id;
        let state_call = IGovernor::stateCall {
            proposalId: proposal_id,
        };
        let (state, votes) = tokio::join!(
            read_call(self.reader.as_ref(), &contract_id, &state_call),
            self.read_votes(&contract_id, proposal_id, args.start_block, engine, total_supply),
        );
        let state = state?;
        let votes = match votes {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(
                    proposal = %proposal_id,
                    governor = %contract_id,
                    error = %e,
                    "Vote figures unavailable"
                );
                None
            }
        };

        let upgrade = match (&category, &payload) {
            (
                ProposalCategory::ContractUpgrade,
                Some(ProposalPayload::UpgradeProxy { proxy, logic, .. }),
            ) => Some(self.check_upgrade(proxy, logic, &governor).await?),
            _ => None,
        };

        Ok(Proposal {
            id: proposal_id.to_string(),
            dao: dao.address,
            contract_id,
            category,
            title: args.title,
            author: args.proposer,
            description: args.description,
            link: non_empty(args.discussion_link),
            created_at: event.timestamp,
            voting_window: Some(VotingWindow {
                start_block: args.start_block,
                end_block: args.end_block,
            }),
            raw_state: state._0,
            payload,
            votes,
            approvals: None,
            derived: derive(state._0, upgrade),
        })
    }

    /// Reads the tally and the quorum at the proposal's snapshot block.
    ///
    /// Governors revert `quorum` for a block that has not been mined yet, so
    /// a pending proposal can legitimately fail here.
    async fn read_votes(
        &self,
        governor: &AccountId,
        proposal_id: U256,
        start_block: u64,
        engine: StatusEngine,
        total_supply: Option<U256>,
    ) -> Result<VoteSummary, DaoError> {
        let reader = self.reader.as_ref();
        let votes_call = IGovernor::proposalVotesCall {
            proposalId: proposal_id,
        };
        let quorum_call = IGovernor::quorumCall {
            blockNumber: U256::from(start_block),
        };
        let (votes, quorum) = tokio::try_join!(
            read_call(reader, governor, &votes_call),
            read_call(reader, governor, &quorum_call),
        )?;

        engine.summarize_votes(&VoteInputs {
            yes: engine.quantity(votes.forVotes),
            no: engine.quantity(votes.againstVotes),
            abstain: engine.quantity(votes.abstainVotes),
            quorum: engine.quantity(quorum._0),
            total_possible: total_supply.map(|supply| engine.quantity(supply)),
        })
    }

    /// Compares the proxy's latest admin and implementation with the expected ones.
    ///
    /// Proxy logs arrive newest first, so the first match of each kind is the latest.
    async fn check_upgrade(
        &self,
        proxy: &AccountId,
        logic: &AccountId,
        executor: &AccountId,
    ) -> Result<UpgradeCheck, DaoError> {
        let logs = self.events.fetch_events(proxy, None).await?;

        let latest_admin = logs
            .iter()
            .find(|e| e.is(ADMIN_CHANGED))
            .map(|e| e.parse_args::<AdminChangedArgs>())
            .transpose()?;
        let latest_impl = logs
            .iter()
            .find(|e| e.is(UPGRADED))
            .map(|e| e.parse_args::<UpgradedArgs>())
            .transpose()?;

        Ok(UpgradeCheck {
            is_admin_approved: latest_admin.map_or(false, |a| same_account(&a.new_admin, executor)),
            is_contract_upgraded: latest_impl
                .map_or(false, |u| same_account(&u.implementation, logic)),
        })
    }

    async fn build_multisig_proposal(
        &self,
        dao: &MultiSigDao,
        event: DecodedEvent,
        approvals: Option<&HashMap<B256, Vec<AccountId>>>,
    ) -> Result<Proposal, DaoError> {
        let args: TransactionCreatedArgs = event.parse_args()?;

        let to = match (TransactionTag::from_raw(args.transaction_type), &args.to) {
            (Some(TransactionTag::HbarTransfer), Some(to)) => Some(to.parse::<AccountId>()?),
            _ => None,
        };
        let payload = decode_transaction(
            args.transaction_type,
            args.data.as_ref().map(|b| b.as_ref()),
            &TransferFields {
                to,
                value: args.value,
            },
        )?;

        let state = read_call(
            self.reader.as_ref(),
            &dao.address,
            &IMultiSigDao::stateCall {
                txnHash: args.txn_hash,
            },
        )
        .await?;

        let approvals = approvals.map(|by_hash| ApprovalSummary {
            approvers: by_hash.get(&args.txn_hash).cloned().unwrap_or_default(),
            threshold: dao.membership.threshold,
        });

        Ok(Proposal {
            id: args.txn_hash.to_string(),
            dao: dao.address,
            contract_id: dao.address,
            category: ProposalCategory::MultiSig,
            title: args.title,
            author: args.creator,
            description: args.description,
            link: non_empty(args.link_to_discussion),
            created_at: event.timestamp,
            voting_window: None,
            raw_state: state._0,
            payload: Some(payload),
            votes: None,
            approvals,
            derived: derive(state._0, None),
        })
    }
}

/// Groups `ApproveHash` events by transaction hash, approvers oldest first.
fn approvals_by_hash(
    newest_first: &[DecodedEvent],
) -> Result<HashMap<B256, Vec<AccountId>>, DaoError> {
    let mut by_hash: HashMap<B256, Vec<AccountId>> = HashMap::new();
    for event in newest_first.iter().rev() {
        let args: ApproveHashArgs = event.parse_args()?;
        let approvers = by_hash.entry(args.approved_hash).or_default();
        if !approvers.contains(&args.owner) {
            approvers.push(args.owner);
        }
    }
    Ok(by_hash)
}

fn non_empty(link: Option<String>) -> Option<String> {
    link.filter(|l| !l.trim().is_empty())
}
