//! Phase base and registry (C6).
//!
//! A phase is a small object owning a prompt template, tool allow-list, and
//! retry metadata. The registry is an ordered list fixing the pipeline; the
//! orchestrator drives it sequentially and never reorders it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Transient,
    Fixable,
    Fatal,
    Oscillating,
    AgentSpecific,
}

#[derive(Debug, Clone, Default)]
pub struct PhaseResult {
    pub success: bool,
    pub cost_usd: f64,
    pub error: Option<String>,
    pub artifacts: HashMap<String, serde_json::Value>,
    pub timed_out: bool,
    pub session_id: Option<String>,
    pub failure_category: Option<FailureCategory>,
}

impl PhaseResult {
    pub fn ok(cost_usd: f64) -> Self {
        Self { success: true, cost_usd, ..Default::default() }
    }

    pub fn ok_with_artifacts(cost_usd: f64, artifacts: HashMap<String, serde_json::Value>) -> Self {
        Self { success: true, cost_usd, artifacts, ..Default::default() }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }

    pub fn fail_with_cost(cost_usd: f64, error: impl Into<String>) -> Self {
        Self { success: false, cost_usd, error: Some(error.into()), ..Default::default() }
    }
}

/// A single step in the fixed 17-phase pipeline.
#[async_trait]
pub trait Phase: Send + Sync {
    /// Config-lookup / artifact-key / approval-file / completion-list name.
    fn name(&self) -> &'static str;

    fn timeout_seconds(&self) -> u64 {
        600
    }

    fn max_turns(&self) -> u32 {
        50
    }

    fn allowed_tools(&self) -> Vec<String> {
        Vec::new()
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        None
    }

    fn approval_gate(&self) -> bool {
        false
    }

    /// `true` means this phase must start a brand-new agent session rather
    /// than resuming the previous phase's, to obtain an unbiased review.
    fn fresh_context(&self) -> bool {
        false
    }

    /// Checked by the orchestrator before running; must not panic.
    fn validate_preconditions(&self, _context: &Context) -> (bool, String) {
        (true, String::new())
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_has_no_error() {
        let result = PhaseResult::ok(1.5);
        assert!(result.success);
        assert_eq!(result.cost_usd, 1.5);
        assert!(result.error.is_none());
    }

    #[test]
    fn fail_result_carries_message() {
        let result = PhaseResult::fail("boom");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
