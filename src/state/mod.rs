//! Checkpoint and approval store (C5).
//!
//! Key->JSON persistence in a user state directory, a checkpoint manager
//! built on top of it, and a file-based human approval gate.

pub mod approval;
pub mod checkpoint;
pub mod store;

pub use approval::ApprovalStore;
pub use checkpoint::{CheckpointManager, CheckpointSummary};
pub use store::{StateStore, StoreError, StoreResult};
