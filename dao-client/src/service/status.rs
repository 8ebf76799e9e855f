//! Status derivation and vote arithmetic.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DaoError;
use crate::models::{DerivedStatus, ProposalState, ProposalStatus, VoteSummary};

/// Number of decimals vote weights are scaled by on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Precision(u32);

impl Precision {
    pub const ZERO: Precision = Precision(0);
    /// HBAR amounts are counted in tinybars, 10^8 to the unit.
    pub const NATIVE: Precision = Precision(8);
    /// Largest scale a `Decimal` can carry.
    pub const MAX_DECIMALS: u32 = 28;

    pub fn new(decimals: u32) -> Result<Self, DaoError> {
        if decimals > Self::MAX_DECIMALS {
            return Err(DaoError::PrecisionMismatch {
                expected: Self::MAX_DECIMALS,
                found: decimals,
            });
        }
        Ok(Precision(decimals))
    }

    pub fn decimals(&self) -> u32 {
        self.0
    }

    /// Rescales a raw fixed-point integer into a human-readable decimal.
    pub fn rescale(&self, raw: U256) -> Result<Decimal, DaoError> {
        let value = i128::try_from(raw)
            .map_err(|_| DaoError::decode(format!("{} exceeds decimal range", raw)))?;
        Decimal::try_from_i128_with_scale(value, self.0)
            .map_err(|e| DaoError::decode(format!("{} at scale {}: {}", raw, self.0, e)))
    }
}

/// A raw on-chain quantity together with the scale it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    pub raw: U256,
    pub precision: Precision,
}

impl Quantity {
    pub fn new(raw: U256, precision: Precision) -> Self {
        Self { raw, precision }
    }
}

/// Raw vote figures for one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteInputs {
    pub yes: Quantity,
    pub no: Quantity,
    pub abstain: Quantity,
    pub quorum: Quantity,
    pub total_possible: Option<Quantity>,
}

/// Result of the contract-upgrade side-effect check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeCheck {
    pub is_admin_approved: bool,
    pub is_contract_upgraded: bool,
}

/// Maps the on-chain state to the user-facing status.
pub fn status_of(state: ProposalState) -> ProposalStatus {
    match state {
        ProposalState::Pending | ProposalState::Active => ProposalStatus::Active,
        ProposalState::Queued | ProposalState::Succeeded | ProposalState::Executed => {
            ProposalStatus::Passed
        }
        ProposalState::Canceled | ProposalState::Defeated | ProposalState::Expired => {
            ProposalStatus::Failed
        }
    }
}

/// Maps a raw state integer; values outside the enum are unmapped.
pub fn derive_status(raw_state: u8) -> Option<ProposalStatus> {
    ProposalState::from_raw(raw_state).map(status_of)
}

/// Derives status and its overlays.
///
/// For contract-upgrade proposals a `Succeeded` vote whose proxy admin has not
/// yet been handed to the executor is surfaced as `Active`, with the
/// admin-approval action visible.
pub fn derive(raw_state: u8, upgrade: Option<UpgradeCheck>) -> DerivedStatus {
    let state = ProposalState::from_raw(raw_state);

    let Some(check) = upgrade else {
        return DerivedStatus {
            status: state.map(status_of),
            effective_state: state,
            ..Default::default()
        };
    };

    let awaiting_admin = state == Some(ProposalState::Succeeded) && !check.is_admin_approved;
    let effective = if awaiting_admin {
        Some(ProposalState::Active)
    } else {
        state
    };

    DerivedStatus {
        status: effective.map(status_of),
        effective_state: effective,
        is_admin_approved: Some(check.is_admin_approved),
        is_admin_approval_button_visible: Some(awaiting_admin),
        is_contract_upgraded: Some(check.is_contract_upgraded),
    }
}

/// Vote arithmetic bound to a single precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEngine {
    precision: Precision,
}

impl StatusEngine {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn quantity(&self, raw: U256) -> Quantity {
        Quantity::new(raw, self.precision)
    }

    fn scaled(&self, quantity: Quantity) -> Result<Decimal, DaoError> {
        if quantity.precision != self.precision {
            return Err(DaoError::PrecisionMismatch {
                expected: self.precision.decimals(),
                found: quantity.precision.decimals(),
            });
        }
        self.precision.rescale(quantity.raw)
    }

    /// quorum% = quorum / total * 100; remaining = total - (yes + no + abstain).
    pub fn summarize_votes(&self, inputs: &VoteInputs) -> Result<VoteSummary, DaoError> {
        let yes = self.scaled(inputs.yes)?;
        let no = self.scaled(inputs.no)?;
        let abstain = self.scaled(inputs.abstain)?;
        let quorum_threshold = self.scaled(inputs.quorum)?;
        let total_possible = inputs.total_possible.map(|q| self.scaled(q)).transpose()?;

        let cast = yes
            .checked_add(no)
            .and_then(|sum| sum.checked_add(abstain))
            .ok_or_else(|| DaoError::decode("vote total overflow"))?;

        let quorum_percentage = total_possible
            .filter(|total| !total.is_zero())
            .and_then(|total| quorum_threshold.checked_div(total))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
        let remaining = total_possible.and_then(|total| total.checked_sub(cast));

        Ok(VoteSummary {
            yes,
            no,
            abstain,
            quorum_threshold,
            total_possible,
            quorum_percentage,
            remaining,
            is_quorum_reached: yes + abstain >= quorum_threshold,
        })
    }
}
