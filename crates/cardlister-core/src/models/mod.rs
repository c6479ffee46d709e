//! Data models for listing sessions
//!
//! Plain value types shared by the queue, the orchestrator and the storage
//! collaborators. Behavior lives in the modules that own the state.

mod connection;
mod intake_item;
mod session_record;
mod stage;

// Re-export all models for convenient imports
pub use connection::*;
pub use intake_item::*;
pub use session_record::*;
pub use stage::*;
