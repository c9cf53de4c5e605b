//! Orchestrator error taxonomy.
//!
//! Mirrors the failure kinds the orchestrator and its collaborators raise.
//! Phases catch expected failures themselves and return a non-success
//! `PhaseResult`; only these named errors and programmer errors propagate.

use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Budget exceeded: ${current:.2} > ${limit:.2}")]
    BudgetExceeded { current: f64, limit: f64 },

    #[error("Approval timeout for phase '{phase}' after {timeout_hours} hours")]
    ApprovalTimeout { phase: String, timeout_hours: f64 },

    #[error("Phase '{phase}' failed: {error}")]
    PhaseFailed { phase: String, error: String },

    #[error("Preflight checks failed:\n{}", .failed_checks.iter().map(|m| format!("  - {m}")).collect::<Vec<_>>().join("\n"))]
    PreflightFailed { failed_checks: Vec<String> },

    #[error("Checkpoint error: {message}")]
    CheckpointError { message: String },

    #[error("Git {operation} failed: {message}")]
    GitOperation {
        operation: String,
        message: String,
        returncode: i32,
    },

    #[error("Worktree operation failed: {message}")]
    Worktree { message: String },

    #[error("Merge conflicts could not be auto-resolved: {}", .conflicted_files.join(", "))]
    ConflictResolution { conflicted_files: Vec<String> },

    #[error("Agent execution failed ({agent_kind}): {message}")]
    AgentExecution {
        message: String,
        agent_kind: String,
        returncode: i32,
    },

    #[error(
        "Autonomous mode requires container isolation. \
         Run inside a container or set SELFASSEMBLER_ALLOW_HOST_AUTONOMOUS='I_ACCEPT_THE_RISK'"
    )]
    ContainerRequired,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn budget_exceeded(current: f64, limit: f64) -> Self {
        Self::BudgetExceeded { current, limit }
    }

    pub fn phase_failed(phase: impl Into<String>, error: impl Into<String>) -> Self {
        Self::PhaseFailed {
            phase: phase.into(),
            error: error.into(),
        }
    }

    /// 500-char preview of the error message, for the user-visible failure format (§7).
    pub fn preview(&self) -> String {
        let full = self.to_string();
        if full.len() <= 500 {
            full
        } else {
            format!("{}...", &full[..500])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_messages() {
        let err = OrchestratorError::phase_failed("research", "x".repeat(1000));
        assert!(err.preview().len() <= 503);
    }

    #[test]
    fn preview_keeps_short_messages_intact() {
        let err = OrchestratorError::budget_exceeded(11.0, 10.0);
        assert_eq!(err.preview(), err.to_string());
    }

    #[test]
    fn from_io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: OrchestratorError = io_err.into();
        assert!(matches!(err, OrchestratorError::Io(_)));
    }
}
