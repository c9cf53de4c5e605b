//! Agent execution layer (C2).
//!
//! Defines the uniform contract every agent CLI executor implements, plus
//! the shared result/option/stream-event types. Two concrete executors live
//! in sibling modules: [`conversational`] (a Claude-Code-style CLI) and
//! [`alternate`] (a Codex-style CLI).

pub mod alternate;
pub mod conversational;
pub mod event;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::OrchestratorResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    Plan,
    AcceptEdits,
}

/// Options accepted by `AgentExecutor::execute`.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    pub permission_mode: Option<PermissionMode>,
    pub allowed_tools: Vec<String>,
    pub max_turns: u32,
    pub timeout: Option<Duration>,
    pub resume_session: Option<String>,
    pub dangerous_mode: bool,
    pub working_dir: Option<PathBuf>,
    pub stream: Option<bool>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self {
            max_turns: 50,
            ..Default::default()
        }
    }
}

/// The uniform return of every agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub session_id: String,
    pub output: String,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub num_turns: u32,
    pub is_error: bool,
    pub raw_output: String,
    #[serde(default)]
    pub subagent_results: Vec<serde_json::Value>,
    pub agent_kind: String,
}

impl ExecutionResult {
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// Re-classify as errored if the result looks like a silent auth/config failure:
    /// not already an error, zero cost, and blank output.
    pub fn validate(self) -> Self {
        if !self.is_error && self.cost_usd == 0.0 && self.output.trim().is_empty() {
            tracing::warn!(
                agent_kind = %self.agent_kind,
                duration_ms = self.duration_ms,
                "validate: suspicious result — zero cost, empty output"
            );
            Self {
                output: "Agent produced no output and reported zero cost (possible auth/config issue)".to_string(),
                is_error: true,
                ..self
            }
        } else {
            self
        }
    }
}

/// A single streaming event from an agent CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub event_kind: String,
    pub payload: serde_json::Value,
    pub timestamp_ms: u64,
    pub source: String,
}

pub type StreamCallback = dyn Fn(&StreamEvent) + Send + Sync;

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Stable identifier for this executor's agent kind (e.g. "conversational", "alternate").
    fn agent_kind(&self) -> &str;

    async fn execute(&self, prompt: &str, opts: ExecutionOptions) -> OrchestratorResult<ExecutionResult>;

    async fn check_available(&self) -> (bool, String);

    fn build_command(&self, prompt: &str, opts: &ExecutionOptions) -> Vec<String>;

    /// Convenience wrapper for quick, simple prompts.
    async fn execute_simple(&self, prompt: &str, timeout: Duration) -> OrchestratorResult<String> {
        let opts = ExecutionOptions {
            max_turns: 5,
            timeout: Some(timeout),
            ..ExecutionOptions::new()
        };
        Ok(self.execute(prompt, opts).await?.output)
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_flags_suspicious_success() {
        let result = ExecutionResult {
            session_id: "abc".into(),
            output: "   ".into(),
            cost_usd: 0.0,
            duration_ms: 50,
            num_turns: 1,
            is_error: false,
            raw_output: String::new(),
            subagent_results: vec![],
            agent_kind: "conversational".into(),
        }
        .validate();
        assert!(result.is_error);
        assert!(result.output.contains("possible auth"));
    }

    #[test]
    fn validate_leaves_real_results_alone() {
        let result = ExecutionResult {
            session_id: "abc".into(),
            output: "did the thing".into(),
            cost_usd: 0.01,
            duration_ms: 50,
            num_turns: 1,
            is_error: false,
            raw_output: String::new(),
            subagent_results: vec![],
            agent_kind: "conversational".into(),
        }
        .validate();
        assert!(!result.is_error);
        assert_eq!(result.output, "did the thing");
    }

    #[test]
    fn duration_seconds_converts() {
        let result = ExecutionResult {
            session_id: String::new(),
            output: String::new(),
            cost_usd: 0.0,
            duration_ms: 1500,
            num_turns: 0,
            is_error: false,
            raw_output: String::new(),
            subagent_results: vec![],
            agent_kind: "x".into(),
        };
        assert_eq!(result.duration_seconds(), 1.5);
    }
}
