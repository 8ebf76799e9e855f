//! Client-side reconstruction of DAO state from contract events and live reads.
//!
//! - [`models`]: account identifiers, decoded events, DAOs and proposals
//! - [`service`]: payload decoding, membership replay, status derivation,
//!   proposal/DAO aggregation and the ledger transport seams

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod telemetry;

pub use client::DaoClient;
pub use config::Config;
pub use error::{DaoError, DaoResult};
pub use telemetry::init_telemetry;
