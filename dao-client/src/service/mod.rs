// Service layer: codecs, replay, aggregation and ledger access
pub mod abi;
pub mod batch;
pub mod dao_service;
pub mod ledger_client;
pub mod membership;
pub mod payload_decoder;
pub mod proposal_service;
pub mod status;


pub use batch::{settle_all, Settled};
pub use dao_service::{DaoFactories, DaoService};
pub use ledger_client::{EventFetcher, LedgerClient, LiveReader, MockLedger, NetworkConfig};
pub use membership::{membership_events, replay_membership, MembershipEvent};
pub use payload_decoder::{decode_governance, decode_transaction, TransactionTag, TransferFields};
pub use proposal_service::ProposalService;
pub use status::{derive, derive_status, Precision, StatusEngine, UpgradeCheck, VoteInputs};
