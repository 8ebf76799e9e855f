use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::proposal::ProposalCategory;

/// Owner set and approval threshold of a multi-sig organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipState {
    pub owners: Vec<AccountId>,
    pub threshold: u64,
}

impl MembershipState {
    pub fn is_owner(&self, account: &AccountId) -> bool {
        self.owners.contains(account)
    }
}

/// Presentation settings; any field may be replaced by a later settings event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoSettings {
    pub name: String,
    pub description: String,
    pub logo_url: String,
    #[serde(default)]
    pub web_links: Vec<String>,
}

/// Governor contracts of a token-weighted DAO, one per proposal category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorAddresses {
    pub token_transfer: Option<AccountId>,
    pub text: Option<AccountId>,
    pub contract_upgrade: Option<AccountId>,
    pub create_token: Option<AccountId>,
}

impl GovernorAddresses {
    /// Configured governors, one per category.
    pub fn entries(&self) -> Vec<(ProposalCategory, AccountId)> {
        [
            (ProposalCategory::TokenTransfer, self.token_transfer),
            (ProposalCategory::Text, self.text),
            (ProposalCategory::ContractUpgrade, self.contract_upgrade),
            (ProposalCategory::CreateToken, self.create_token),
        ]
        .into_iter()
        .filter_map(|(category, governor)| governor.map(|g| (category, g)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSigDao {
    pub address: AccountId,
    pub admin: AccountId,
    pub safe: AccountId,
    pub is_private: bool,
    pub settings: DaoSettings,
    pub membership: MembershipState,
}

/// Token-weighted DAO; used for both fungible-token and NFT governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDao {
    pub address: AccountId,
    pub admin: AccountId,
    pub token: AccountId,
    pub is_private: bool,
    pub settings: DaoSettings,
    pub quorum_threshold: u64,
    pub voting_delay: u64,
    pub voting_period: u64,
    pub governors: GovernorAddresses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Dao {
    MultiSig(MultiSigDao),
    GovernanceToken(TokenDao),
    Nft(TokenDao),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaoType {
    MultiSig,
    GovernanceToken,
    Nft,
}

impl Dao {
    pub fn address(&self) -> AccountId {
        match self {
            Dao::MultiSig(dao) => dao.address,
            Dao::GovernanceToken(dao) | Dao::Nft(dao) => dao.address,
        }
    }

    pub fn dao_type(&self) -> DaoType {
        match self {
            Dao::MultiSig(_) => DaoType::MultiSig,
            Dao::GovernanceToken(_) => DaoType::GovernanceToken,
            Dao::Nft(_) => DaoType::Nft,
        }
    }

    pub fn settings(&self) -> &DaoSettings {
        match self {
            Dao::MultiSig(dao) => &dao.settings,
            Dao::GovernanceToken(dao) | Dao::Nft(dao) => &dao.settings,
        }
    }

    pub fn settings_mut(&mut self) -> &mut DaoSettings {
        match self {
            Dao::MultiSig(dao) => &mut dao.settings,
            Dao::GovernanceToken(dao) | Dao::Nft(dao) => &mut dao.settings,
        }
    }
}
