// Core models
pub mod account;
pub mod dao;
pub mod event;
pub mod proposal;

// Re-export commonly used types
pub use account::*;
pub use dao::*;
pub use event::{DecodedEvent, EventSequence};
pub use proposal::*;
