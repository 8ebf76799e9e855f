use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::{AccountId, TokenRef};
use super::event::abi_json;

/// Proposal category; each governance category is served by its own governor contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalCategory {
    TokenTransfer,
    Text,
    ContractUpgrade,
    CreateToken,
    MultiSig,
}

impl ProposalCategory {
    pub const GOVERNANCE: [ProposalCategory; 4] = [
        ProposalCategory::TokenTransfer,
        ProposalCategory::Text,
        ProposalCategory::ContractUpgrade,
        ProposalCategory::CreateToken,
    ];
}

impl std::fmt::Display for ProposalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalCategory::TokenTransfer => write!(f, "TOKEN_TRANSFER"),
            ProposalCategory::Text => write!(f, "TEXT"),
            ProposalCategory::ContractUpgrade => write!(f, "CONTRACT_UPGRADE"),
            ProposalCategory::CreateToken => write!(f, "CREATE_TOKEN"),
            ProposalCategory::MultiSig => write!(f, "MULTI_SIG"),
        }
    }
}

/// Governor state enum as returned by the on-chain `state` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending = 0,
    Active = 1,
    Canceled = 2,
    Defeated = 3,
    Succeeded = 4,
    Queued = 5,
    Expired = 6,
    Executed = 7,
}

impl ProposalState {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ProposalState::Pending),
            1 => Some(ProposalState::Active),
            2 => Some(ProposalState::Canceled),
            3 => Some(ProposalState::Defeated),
            4 => Some(ProposalState::Succeeded),
            5 => Some(ProposalState::Queued),
            6 => Some(ProposalState::Expired),
            7 => Some(ProposalState::Executed),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Canceled
                | ProposalState::Defeated
                | ProposalState::Expired
                | ProposalState::Executed
        )
    }
}

/// User-facing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Active,
    Passed,
    Failed,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Active => write!(f, "ACTIVE"),
            ProposalStatus::Passed => write!(f, "PASSED"),
            ProposalStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Decoded call parameters of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum ProposalPayload {
    AddMember {
        owner: AccountId,
        threshold: u64,
    },
    /// `prev_owner` is the owner-list predecessor needed at execution time.
    DeleteMember {
        prev_owner: Address,
        owner: AccountId,
        threshold: u64,
    },
    ReplaceMember {
        prev_owner: Address,
        old_owner: AccountId,
        new_owner: AccountId,
    },
    ChangeThreshold {
        threshold: u64,
    },
    TokenTransfer {
        token: TokenRef,
        receiver: AccountId,
        #[serde(with = "abi_json::u256")]
        amount: U256,
    },
    /// `amount` is in HBAR, already scaled down from tinybars.
    HbarTransfer {
        receiver: AccountId,
        amount: Decimal,
    },
    TokenAssociation {
        token: TokenRef,
    },
    SetText {
        account: AccountId,
        title: String,
    },
    UpgradeProxy {
        proxy: AccountId,
        logic: AccountId,
        proxy_admin: AccountId,
    },
    CreateToken {
        name: String,
        symbol: String,
        #[serde(with = "abi_json::u256")]
        initial_supply: U256,
        treasury: AccountId,
    },
    Unknown {
        tag: u64,
    },
}

impl ProposalPayload {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProposalPayload::Unknown { .. })
    }
}

/// Block-height voting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingWindow {
    pub start_block: u64,
    pub end_block: u64,
}

impl VotingWindow {
    pub fn phase(&self, current_block: u64) -> VotingPhase {
        if current_block < self.start_block {
            VotingPhase::NotStarted
        } else if current_block <= self.end_block {
            VotingPhase::Open
        } else {
            VotingPhase::Closed
        }
    }

    pub fn blocks_remaining(&self, current_block: u64) -> u64 {
        self.end_block.saturating_sub(current_block)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotingPhase {
    NotStarted,
    Open,
    Closed,
}

/// Vote tally rescaled to human-readable precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummary {
    pub yes: Decimal,
    pub no: Decimal,
    pub abstain: Decimal,
    pub quorum_threshold: Decimal,
    pub total_possible: Option<Decimal>,
    pub quorum_percentage: Option<Decimal>,
    pub remaining: Option<Decimal>,
    pub is_quorum_reached: bool,
}

/// Multi-sig approval progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSummary {
    pub approvers: Vec<AccountId>,
    pub threshold: u64,
}

impl ApprovalSummary {
    pub fn is_threshold_reached(&self) -> bool {
        self.approvers.len() as u64 >= self.threshold
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStatus {
    /// `None` when the on-chain state is outside the known enum.
    pub status: Option<ProposalStatus>,
    pub effective_state: Option<ProposalState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin_approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin_approval_button_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_contract_upgraded: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    pub dao: AccountId,
    pub contract_id: AccountId,
    pub category: ProposalCategory,
    pub title: String,
    pub author: AccountId,
    pub description: String,
    pub link: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub voting_window: Option<VotingWindow>,
    pub raw_state: u8,
    pub payload: Option<ProposalPayload>,
    pub votes: Option<VoteSummary>,
    pub approvals: Option<ApprovalSummary>,
    pub derived: DerivedStatus,
}
