//! Conflict check (C7, phase 15 of 17): rebase onto the base branch before
//! opening a PR, attempting a Claude-assisted resolution on conflicts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::external::GitDriver;
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct ConflictCheckPhase {
    git: Arc<dyn GitDriver>,
}

impl ConflictCheckPhase {
    pub fn new(git: Arc<dyn GitDriver>) -> Self {
        Self { git }
    }

    fn resolve_prompt(conflicted_files: &[String]) -> String {
        format!(
            "The rebase onto the base branch produced conflicts in these files:\n\n{}\n\n\
             Resolve them, keeping the intent of this task's changes, then stage the resolution.",
            conflicted_files.iter().map(|f| format!("- {f}")).collect::<Vec<_>>().join("\n")
        )
    }
}

#[async_trait]
impl Phase for ConflictCheckPhase {
    fn name(&self) -> &'static str {
        "conflict_check"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let cwd = context.worktree_path.clone();

        if let Err(e) = self.git.fetch("origin") {
            return PhaseResult::fail(format!("fetch failed: {e}"));
        }

        let target = if self.git.has_remote() {
            format!("origin/{}", config.git.base_branch)
        } else {
            config.git.base_branch.clone()
        };

        let (ok, conflicts) = match self.git.rebase(&target, cwd.as_deref()) {
            Ok(r) => r,
            Err(e) => return PhaseResult::fail(format!("rebase failed: {e}")),
        };

        if ok {
            return PhaseResult::ok(0.0);
        }

        self.git.abort_rebase(cwd.as_deref());

        let prompt = Self::resolve_prompt(&conflicts);
        match execute_tracked(
            context,
            executor,
            self.name(),
            &prompt,
            vec!["Read".to_string(), "Edit".to_string(), "Bash".to_string()],
            self.max_turns(),
            self.timeout_seconds(),
            self.permission_mode(),
            None,
            dangerous_mode(config),
        )
        .await
        {
            Ok(result) => {
                context.set_session_id(self.name(), &result.session_id);
                if result.is_error {
                    PhaseResult::fail_with_cost(result.cost_usd, result.output)
                } else {
                    let mut artifacts = std::collections::HashMap::new();
                    artifacts.insert("resolved_conflicts".to_string(), serde_json::json!(conflicts));
                    PhaseResult::ok_with_artifacts(result.cost_usd, artifacts)
                }
            }
            Err(e) => PhaseResult::fail(e),
        }
    }
}
