//! Multi-agent debate engine (C8).
//!
//! For review-grade phases (research, planning, plan-review, code-review),
//! optionally replaces a single-agent `run` with a two-role deliberation —
//! independent generation, an alternating critique exchange, and a
//! primary-authored synthesis — whose final artifact matches the shape of
//! the single-agent artifact (same path, same format).
//!
//! All state (file paths, session-id keys, transcript attribution, cost
//! partitioning) is keyed by role (`primary`/`secondary`), never by agent
//! kind, so `primary == secondary` (same agent kind in both seats) is a
//! legal configuration.

pub mod files;
pub mod orchestrator;
pub mod prompts;
pub mod results;
pub mod transcript;

pub use files::DebateFileManager;
pub use orchestrator::{DebateConfig, DebateMode, DebateOrchestrator};
pub use prompts::DebatePrompts;
pub use results::{DebateMessage, DebateResult, Role, SynthesisResult, Turn1Results, Turn2Results};
pub use transcript::DebateLog;
