//! Multi-sig membership replay.
//!
//! The event fetcher delivers a safe's events newest-first. The reducer walks
//! them oldest-first and folds owner/threshold changes into a
//! [`MembershipState`]. The final owner list is reversed once more before it
//! is returned, so the most recently added owner comes first.

use serde::Deserialize;

use crate::error::DaoError;
use crate::models::event::abi_json;
use crate::models::{AccountId, DecodedEvent, MembershipState};

pub const SAFE_SETUP: &str = "SafeSetup";
pub const ADDED_OWNER: &str = "AddedOwner";
pub const REMOVED_OWNER: &str = "RemovedOwner";
pub const CHANGED_THRESHOLD: &str = "ChangedThreshold";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// Genesis: replaces owners and threshold wholesale.
    SafeSetup { owners: Vec<AccountId>, threshold: u64 },
    AddedOwner { owner: AccountId },
    RemovedOwner { owner: AccountId },
    ChangedThreshold { threshold: u64 },
}

#[derive(Deserialize)]
struct SafeSetupArgs {
    owners: Vec<AccountId>,
    #[serde(deserialize_with = "abi_json::u64_like::deserialize")]
    threshold: u64,
}

#[derive(Deserialize)]
struct OwnerArgs {
    owner: AccountId,
}

#[derive(Deserialize)]
struct ThresholdArgs {
    #[serde(deserialize_with = "abi_json::u64_like::deserialize")]
    threshold: u64,
}

impl MembershipEvent {
    /// Types a decoded event; events unrelated to membership yield `None`.
    pub fn from_event(event: &DecodedEvent) -> Result<Option<Self>, DaoError> {
        let typed = match event.event_name.as_str() {
            SAFE_SETUP => {
                let args: SafeSetupArgs = event.parse_args()?;
                MembershipEvent::SafeSetup {
                    owners: args.owners,
                    threshold: args.threshold,
                }
            }
            ADDED_OWNER => {
                let args: OwnerArgs = event.parse_args()?;
                MembershipEvent::AddedOwner { owner: args.owner }
            }
            REMOVED_OWNER => {
                let args: OwnerArgs = event.parse_args()?;
                MembershipEvent::RemovedOwner { owner: args.owner }
            }
            CHANGED_THRESHOLD => {
                let args: ThresholdArgs = event.parse_args()?;
                MembershipEvent::ChangedThreshold {
                    threshold: args.threshold,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(typed))
    }
}

/// Types every membership event in fetcher order, skipping unrelated events.
pub fn membership_events(events: &[DecodedEvent]) -> Result<Vec<MembershipEvent>, DaoError> {
    let mut typed = Vec::with_capacity(events.len());
    for event in events {
        if let Some(membership) = MembershipEvent::from_event(event)? {
            typed.push(membership);
        }
    }
    Ok(typed)
}

/// Folds membership events delivered newest-first into the current state.
pub fn replay_membership(newest_first: &[MembershipEvent]) -> MembershipState {
    let mut owners: Vec<AccountId> = Vec::new();
    let mut threshold = 0;

    for event in newest_first.iter().rev() {
        match event {
            MembershipEvent::SafeSetup {
                owners: genesis,
                threshold: genesis_threshold,
            } => {
                owners.clear();
                for owner in genesis {
                    insert_owner(&mut owners, *owner);
                }
                threshold = *genesis_threshold;
            }
            MembershipEvent::AddedOwner { owner } => insert_owner(&mut owners, *owner),
            MembershipEvent::RemovedOwner { owner } => owners.retain(|o| o != owner),
            MembershipEvent::ChangedThreshold { threshold: t } => threshold = *t,
        }
    }

    owners.reverse();
    MembershipState { owners, threshold }
}

fn insert_owner(owners: &mut Vec<AccountId>, owner: AccountId) {
    if !owners.contains(&owner) {
        owners.push(owner);
    }
}
