//! Commit prep (C7, phase 14 of 17): stage everything and commit with a
//! conventional-commit message.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::AgentExecutor;
use crate::external::GitDriver;
use crate::phase::{Phase, PhaseResult};

pub struct CommitPrepPhase {
    git: Arc<dyn GitDriver>,
}

impl CommitPrepPhase {
    pub fn new(git: Arc<dyn GitDriver>) -> Self {
        Self { git }
    }

    fn commit_message(task_description: &str) -> String {
        let first_line = task_description.lines().next().unwrap_or(task_description).trim();
        let summary = if first_line.len() > 72 { &first_line[..72] } else { first_line };
        format!("feat: {summary}")
    }
}

#[async_trait]
impl Phase for CommitPrepPhase {
    fn name(&self) -> &'static str {
        "commit_prep"
    }

    async fn run(&self, context: &mut Context, _executor: &Arc<dyn AgentExecutor>, _config: &OrchestratorConfig) -> PhaseResult {
        if let Err(e) = self.git.ensure_identity() {
            return PhaseResult::fail(format!("git identity unavailable: {e}"));
        }

        if let Err(e) = self.git.add_files(&[".".to_string()], context.worktree_path.as_deref()) {
            return PhaseResult::fail(format!("failed to stage files: {e}"));
        }

        let message = Self::commit_message(&context.task_description);
        let hash = match self.git.commit(&message, context.worktree_path.as_deref()) {
            Ok(h) => h,
            Err(e) => return PhaseResult::fail(format!("commit failed: {e}")),
        };

        let mut artifacts = std::collections::HashMap::new();
        artifacts.insert("commit_hash".to_string(), serde_json::json!(hash));
        artifacts.insert("commit_message".to_string(), serde_json::json!(message));
        PhaseResult::ok_with_artifacts(0.0, artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_message_truncates_long_first_lines() {
        let msg = CommitPrepPhase::commit_message(&"x".repeat(100));
        assert!(msg.len() <= 72 + "feat: ".len());
    }

    #[test]
    fn commit_message_uses_only_first_line() {
        let msg = CommitPrepPhase::commit_message("short title\n\nlonger body text here");
        assert_eq!(msg, "feat: short title");
    }
}
