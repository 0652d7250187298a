//! Launch gate: request building, response parsing, polling and persisted state.

pub mod parser;
pub mod poller;
pub mod request;
pub mod state_store;

pub use parser::DecisionParser;
pub use poller::{AttemptOutcome, GatePoller, PollerSettings, backoff_delay};
pub use state_store::{GateStateStore, is_usable_destination};
