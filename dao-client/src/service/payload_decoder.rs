//! Tagged proposal payload decoding.
//!
//! Multi-sig transactions carry a numeric transaction tag and raw call data
//! (4-byte selector + ABI parameters). Governance proposals carry ABI data
//! whose shape depends on the proposal category, and for token transfers on a
//! leading `operationType` word.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolType;

use super::abi::*;
use crate::error::DaoError;
use crate::models::{AccountId, ProposalCategory, ProposalPayload, TokenRef};
use crate::service::status::Precision;

const SELECTOR_LEN: usize = 4;
const WORD_LEN: usize = 32;

/// Multi-sig transaction tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionTag {
    AddMember,
    DeleteMember,
    ReplaceMember,
    ChangeThreshold,
    TokenAssociation,
    TokenTransfer,
    HbarTransfer,
    SetText,
    UpgradeProxy,
}

impl TransactionTag {
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(TransactionTag::AddMember),
            2 => Some(TransactionTag::DeleteMember),
            3 => Some(TransactionTag::ReplaceMember),
            4 => Some(TransactionTag::ChangeThreshold),
            1002 => Some(TransactionTag::TokenAssociation),
            1003 => Some(TransactionTag::TokenTransfer),
            1004 => Some(TransactionTag::HbarTransfer),
            1005 => Some(TransactionTag::SetText),
            1006 => Some(TransactionTag::UpgradeProxy),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u64 {
        match self {
            TransactionTag::AddMember => 1,
            TransactionTag::DeleteMember => 2,
            TransactionTag::ReplaceMember => 3,
            TransactionTag::ChangeThreshold => 4,
            TransactionTag::TokenAssociation => 1002,
            TransactionTag::TokenTransfer => 1003,
            TransactionTag::HbarTransfer => 1004,
            TransactionTag::SetText => 1005,
            TransactionTag::UpgradeProxy => 1006,
        }
    }
}

/// Governance `operationType` values for token-transfer proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceOperation {
    TokenAssociation = 1,
    TokenTransfer = 2,
    HbarTransfer = 3,
}

impl GovernanceOperation {
    pub fn from_word(word: U256) -> Option<Self> {
        match u64::try_from(word).ok()? {
            1 => Some(GovernanceOperation::TokenAssociation),
            2 => Some(GovernanceOperation::TokenTransfer),
            3 => Some(GovernanceOperation::HbarTransfer),
            _ => None,
        }
    }
}

/// Creation-event fields that carry a native-currency transfer instead of call data.
#[derive(Debug, Clone, Default)]
pub struct TransferFields {
    pub to: Option<AccountId>,
    pub value: U256,
}

/// Decodes a multi-sig transaction payload.
///
/// Unknown tags yield `ProposalPayload::Unknown`; only malformed data for a
/// known tag is an error.
pub fn decode_transaction(
    tag: u64,
    data: Option<&[u8]>,
    fields: &TransferFields,
) -> Result<ProposalPayload, DaoError> {
    let tag = match TransactionTag::from_raw(tag) {
        Some(tag) => tag,
        None => return Ok(ProposalPayload::Unknown { tag }),
    };

    let body = || strip_selector(data, tag);
    match tag {
        TransactionTag::AddMember => {
            let p = <AddMemberParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("AddMember"))?;
            Ok(ProposalPayload::AddMember {
                owner: AccountId::from_address(&p.owner)?,
                threshold: small_uint(p.threshold, "threshold")?,
            })
        }
        TransactionTag::DeleteMember => {
            let p = <DeleteMemberParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("DeleteMember"))?;
            Ok(ProposalPayload::DeleteMember {
                prev_owner: p.prevOwner,
                owner: AccountId::from_address(&p.owner)?,
                threshold: small_uint(p.threshold, "threshold")?,
            })
        }
        TransactionTag::ReplaceMember => {
            let p = <ReplaceMemberParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("ReplaceMember"))?;
            Ok(ProposalPayload::ReplaceMember {
                prev_owner: p.prevOwner,
                old_owner: AccountId::from_address(&p.oldOwner)?,
                new_owner: AccountId::from_address(&p.newOwner)?,
            })
        }
        TransactionTag::ChangeThreshold => {
            let p = <ChangeThresholdParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("ChangeThreshold"))?;
            Ok(ProposalPayload::ChangeThreshold {
                threshold: small_uint(p.threshold, "threshold")?,
            })
        }
        TransactionTag::TokenTransfer => {
            let p = <TokenTransferParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("TokenTransfer"))?;
            Ok(ProposalPayload::TokenTransfer {
                token: TokenRef::from_address(&p.token)?,
                receiver: AccountId::from_address(&p.receiver)?,
                amount: p.amount,
            })
        }
        TransactionTag::TokenAssociation => {
            let p = <TokenAssociationParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("TokenAssociation"))?;
            Ok(ProposalPayload::TokenAssociation {
                token: TokenRef::Token(AccountId::from_address(&p.token)?),
            })
        }
        TransactionTag::SetText => {
            let p = <SetTextParams as SolType>::abi_decode_params(body()?, true)
                .map_err(shape_error("SetText"))?;
            Ok(ProposalPayload::SetText {
                account: AccountId::from_address(&p.account)?,
                title: p.title,
            })
        }
        TransactionTag::HbarTransfer => {
            let receiver = fields
                .to
                .ok_or_else(|| DaoError::decode("HbarTransfer without receiver"))?;
            Ok(ProposalPayload::HbarTransfer {
                receiver,
                amount: Precision::NATIVE.rescale(fields.value)?,
            })
        }
        TransactionTag::UpgradeProxy => decode_upgrade(body()?),
    }
}

/// Decodes the payload of a governance proposal for the given category.
///
/// Text proposals have no payload.
pub fn decode_governance(
    category: ProposalCategory,
    data: Option<&[u8]>,
) -> Result<Option<ProposalPayload>, DaoError> {
    let data = || {
        data.ok_or_else(|| DaoError::decode(format!("{} proposal without data", category)))
    };

    let payload = match category {
        ProposalCategory::Text => return Ok(None),
        ProposalCategory::MultiSig => {
            return Err(DaoError::decode("multi-sig payloads are tag-discriminated"))
        }
        ProposalCategory::TokenTransfer => decode_governance_operation(data()?)?,
        ProposalCategory::ContractUpgrade => decode_upgrade(data()?)?,
        ProposalCategory::CreateToken => {
            let p = <CreateTokenParams as SolType>::abi_decode_params(data()?, true)
                .map_err(shape_error("CreateToken"))?;
            ProposalPayload::CreateToken {
                name: p.name,
                symbol: p.symbol,
                initial_supply: p.initialSupply,
                treasury: AccountId::from_address(&p.treasury)?,
            }
        }
    };
    Ok(Some(payload))
}

/// Decodes a token-transfer governance payload by its leading `operationType` word.
pub fn decode_governance_operation(data: &[u8]) -> Result<ProposalPayload, DaoError> {
    if data.len() < WORD_LEN {
        return Err(DaoError::decode(format!(
            "governance payload of {} bytes has no operation word",
            data.len()
        )));
    }
    let word = U256::from_be_slice(&data[..WORD_LEN]);
    let operation = match GovernanceOperation::from_word(word) {
        Some(op) => op,
        None => {
            return Ok(ProposalPayload::Unknown {
                tag: u64::try_from(word).unwrap_or(u64::MAX),
            })
        }
    };

    match operation {
        GovernanceOperation::TokenTransfer => {
            let p = <GovernanceTokenTransfer as SolType>::abi_decode_params(data, true)
                .map_err(shape_error("governance TokenTransfer"))?;
            Ok(ProposalPayload::TokenTransfer {
                token: TokenRef::from_address(&p.token)?,
                receiver: AccountId::from_address(&p.account)?,
                amount: p.amount,
            })
        }
        GovernanceOperation::TokenAssociation => {
            let p = <GovernanceTokenAssociation as SolType>::abi_decode_params(data, true)
                .map_err(shape_error("governance TokenAssociation"))?;
            Ok(ProposalPayload::TokenAssociation {
                token: TokenRef::Token(AccountId::from_address(&p.token)?),
            })
        }
        GovernanceOperation::HbarTransfer => {
            let p = <GovernanceHbarTransfer as SolType>::abi_decode_params(data, true)
                .map_err(shape_error("governance HbarTransfer"))?;
            Ok(ProposalPayload::HbarTransfer {
                receiver: AccountId::from_address(&p.account)?,
                amount: Precision::NATIVE.rescale(p.amount)?,
            })
        }
    }
}

fn decode_upgrade(body: &[u8]) -> Result<ProposalPayload, DaoError> {
    let p = <UpgradeProxyParams as SolType>::abi_decode_params(body, true)
        .map_err(shape_error("UpgradeProxy"))?;
    Ok(ProposalPayload::UpgradeProxy {
        proxy: AccountId::from_address(&p.proxy)?,
        logic: AccountId::from_address(&p.logic)?,
        proxy_admin: AccountId::from_address(&p.proxyAdmin)?,
    })
}

fn strip_selector(data: Option<&[u8]>, tag: TransactionTag) -> Result<&[u8], DaoError> {
    let data = data.ok_or_else(|| DaoError::decode(format!("{:?} without call data", tag)))?;
    if data.len() < SELECTOR_LEN {
        return Err(DaoError::decode(format!(
            "{:?} call data of {} bytes has no selector",
            tag,
            data.len()
        )));
    }
    Ok(&data[SELECTOR_LEN..])
}

fn small_uint(value: U256, field: &str) -> Result<u64, DaoError> {
    u64::try_from(value)
        .map_err(|_| DaoError::decode(format!("{} {} does not fit u64", field, value)))
}

fn shape_error(shape: &'static str) -> impl Fn(alloy_sol_types::Error) -> DaoError {
    move |err| DaoError::decode(format!("{}: {}", shape, err))
}

/// Checks whether a decoded address equals the expected account, ignoring hex case.
pub fn same_account(address: &Address, expected: &AccountId) -> bool {
    *address == expected.to_address()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolValue;
    use rust_decimal::Decimal;

    const SELECTOR: [u8; 4] = [0x0d, 0x58, 0x2f, 0x13];

    fn id(num: u64) -> AccountId {
        AccountId::new(0, 0, num).unwrap()
    }

    fn addr(num: u64) -> Address {
        id(num).to_address()
    }

    fn calldata(params: Vec<u8>) -> Vec<u8> {
        let mut data = SELECTOR.to_vec();
        data.extend(params);
        data
    }

    fn decode(tag: TransactionTag, data: &[u8]) -> ProposalPayload {
        decode_transaction(tag.as_raw(), Some(data), &TransferFields::default()).unwrap()
    }

    #[test]
    fn test_tag_round_trip() {
        for raw in [1u64, 2, 3, 4, 1002, 1003, 1004, 1005, 1006] {
            assert_eq!(TransactionTag::from_raw(raw).unwrap().as_raw(), raw);
        }
        assert!(TransactionTag::from_raw(0).is_none());
        assert!(TransactionTag::from_raw(1001).is_none());
    }

    #[test]
    fn test_decode_add_member() {
        let data = calldata(
            AddMemberParams {
                owner: addr(501),
                threshold: U256::from(2u64),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::AddMember, &data),
            ProposalPayload::AddMember {
                owner: id(501),
                threshold: 2
            }
        );
    }

    #[test]
    fn test_decode_delete_member_keeps_prev_owner() {
        // owner-list sentinel
        let sentinel = Address::with_last_byte(1);
        let data = calldata(
            DeleteMemberParams {
                prevOwner: sentinel,
                owner: addr(7),
                threshold: U256::from(1u64),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::DeleteMember, &data),
            ProposalPayload::DeleteMember {
                prev_owner: sentinel,
                owner: id(7),
                threshold: 1
            }
        );
    }

    #[test]
    fn test_decode_replace_member() {
        let data = calldata(
            ReplaceMemberParams {
                prevOwner: addr(3),
                oldOwner: addr(4),
                newOwner: addr(5),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::ReplaceMember, &data),
            ProposalPayload::ReplaceMember {
                prev_owner: addr(3),
                old_owner: id(4),
                new_owner: id(5)
            }
        );
    }

    #[test]
    fn test_decode_change_threshold() {
        let data = calldata(
            ChangeThresholdParams {
                threshold: U256::from(3u64),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::ChangeThreshold, &data),
            ProposalPayload::ChangeThreshold { threshold: 3 }
        );
    }

    #[test]
    fn test_decode_token_transfer() {
        let data = calldata(
            TokenTransferParams {
                unused: U256::ZERO,
                token: addr(900),
                receiver: addr(901),
                amount: U256::from(12_345u64),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::TokenTransfer, &data),
            ProposalPayload::TokenTransfer {
                token: TokenRef::Token(id(900)),
                receiver: id(901),
                amount: U256::from(12_345u64)
            }
        );
    }

    #[test]
    fn test_token_transfer_zero_address_is_native() {
        let data = calldata(
            TokenTransferParams {
                unused: U256::ZERO,
                token: Address::ZERO,
                receiver: addr(901),
                amount: U256::from(10u64),
            }
            .abi_encode_params(),
        );
        match decode(TransactionTag::TokenTransfer, &data) {
            ProposalPayload::TokenTransfer { token, .. } => assert_eq!(token, TokenRef::Native),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_decode_token_association_and_text() {
        let data = calldata(
            TokenAssociationParams {
                unused: U256::ZERO,
                token: addr(44),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::TokenAssociation, &data),
            ProposalPayload::TokenAssociation {
                token: TokenRef::Token(id(44))
            }
        );

        let data = calldata(
            SetTextParams {
                account: addr(12),
                title: "Quarterly budget".to_string(),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::SetText, &data),
            ProposalPayload::SetText {
                account: id(12),
                title: "Quarterly budget".to_string()
            }
        );
    }

    #[test]
    fn test_decode_upgrade_proxy() {
        let data = calldata(
            UpgradeProxyParams {
                proxy: addr(1),
                logic: addr(2),
                proxyAdmin: addr(3),
            }
            .abi_encode_params(),
        );
        assert_eq!(
            decode(TransactionTag::UpgradeProxy, &data),
            ProposalPayload::UpgradeProxy {
                proxy: id(1),
                logic: id(2),
                proxy_admin: id(3)
            }
        );
    }

    #[test]
    fn test_hbar_transfer_uses_event_fields() {
        let fields = TransferFields {
            to: Some(id(88)),
            value: U256::from(500_000_000u64),
        };
        let payload = decode_transaction(1004, None, &fields).unwrap();
        assert_eq!(
            payload,
            ProposalPayload::HbarTransfer {
                receiver: id(88),
                amount: Decimal::from(5)
            }
        );

        let dust = TransferFields {
            to: Some(id(88)),
            value: U256::from(1u64),
        };
        assert_eq!(
            decode_transaction(1004, None, &dust).unwrap(),
            ProposalPayload::HbarTransfer {
                receiver: id(88),
                amount: Decimal::new(1, 8)
            }
        );

        let overflow = TransferFields {
            to: Some(id(88)),
            value: U256::MAX,
        };
        let result = decode_transaction(1004, None, &overflow);
        assert!(matches!(result, Err(DaoError::DecodeFailure(_))));

        let missing = decode_transaction(1004, None, &TransferFields::default());
        assert!(missing.is_err());
    }

    #[test]
    fn test_unknown_tag_is_not_an_error() {
        let payload = decode_transaction(4242, Some(&[1, 2, 3]), &TransferFields::default());
        assert_eq!(payload.unwrap(), ProposalPayload::Unknown { tag: 4242 });

        let payload = decode_transaction(u64::MAX, None, &TransferFields::default());
        assert!(payload.unwrap().is_unknown());
    }

    #[test]
    fn test_malformed_data_is_decode_failure() {
        let short = decode_transaction(1, Some(&[0x01, 0x02]), &TransferFields::default());
        assert!(matches!(short, Err(DaoError::DecodeFailure(_))));

        let truncated = calldata(vec![0u8; 20]);
        let result = decode_transaction(1, Some(&truncated), &TransferFields::default());
        assert!(matches!(result, Err(DaoError::DecodeFailure(_))));

        let missing = decode_transaction(1, None, &TransferFields::default());
        assert!(matches!(missing, Err(DaoError::DecodeFailure(_))));
    }

    #[test]
    fn test_governance_token_transfer() {
        let data = GovernanceTokenTransfer {
            operationType: U256::from(2u64),
            account: addr(70),
            token: Address::ZERO,
            amount: U256::from(99u64),
        }
        .abi_encode_params();

        let payload = decode_governance(ProposalCategory::TokenTransfer, Some(&data))
            .unwrap()
            .unwrap();
        assert_eq!(
            payload,
            ProposalPayload::TokenTransfer {
                token: TokenRef::Native,
                receiver: id(70),
                amount: U256::from(99u64)
            }
        );
    }

    #[test]
    fn test_governance_association_and_hbar() {
        let data = GovernanceTokenAssociation {
            operationType: U256::from(1u64),
            token: addr(31),
        }
        .abi_encode_params();
        assert_eq!(
            decode_governance_operation(&data).unwrap(),
            ProposalPayload::TokenAssociation {
                token: TokenRef::Token(id(31))
            }
        );

        let data = GovernanceHbarTransfer {
            operationType: U256::from(3u64),
            account: addr(32),
            amount: U256::from(150_000_000u64),
        }
        .abi_encode_params();
        assert_eq!(
            decode_governance_operation(&data).unwrap(),
            ProposalPayload::HbarTransfer {
                receiver: id(32),
                amount: Decimal::new(15, 1)
            }
        );
    }

    #[test]
    fn test_governance_unknown_operation() {
        let data = GovernanceTokenAssociation {
            operationType: U256::from(77u64),
            token: addr(31),
        }
        .abi_encode_params();
        assert_eq!(
            decode_governance_operation(&data).unwrap(),
            ProposalPayload::Unknown { tag: 77 }
        );
        assert!(decode_governance_operation(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_governance_categories() {
        assert_eq!(decode_governance(ProposalCategory::Text, None).unwrap(), None);
        assert!(decode_governance(ProposalCategory::ContractUpgrade, None).is_err());

        let data = CreateTokenParams {
            name: "Guild".to_string(),
            symbol: "GLD".to_string(),
            initialSupply: U256::from(1_000_000u64),
            treasury: addr(5),
        }
        .abi_encode_params();
        assert_eq!(
            decode_governance(ProposalCategory::CreateToken, Some(&data))
                .unwrap()
                .unwrap(),
            ProposalPayload::CreateToken {
                name: "Guild".to_string(),
                symbol: "GLD".to_string(),
                initial_supply: U256::from(1_000_000u64),
                treasury: id(5)
            }
        );

        let data = UpgradeProxyParams {
            proxy: addr(1),
            logic: addr(2),
            proxyAdmin: addr(3),
        }
        .abi_encode_params();
        let payload = decode_governance(ProposalCategory::ContractUpgrade, Some(&data))
            .unwrap()
            .unwrap();
        assert!(matches!(payload, ProposalPayload::UpgradeProxy { .. }));
    }

    #[test]
    fn test_same_account() {
        assert!(same_account(&addr(5), &id(5)));
        assert!(!same_account(&addr(5), &id(6)));
    }
}
