//! PR self-review (C7, phase 17 of 17): the agent reviews and approves its
//! own PR diff via `gh pr review`, catching anything obvious before a human
//! looks at it. Skips if no PR was created.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct PrSelfReviewPhase;

impl PrSelfReviewPhase {
    fn prompt(pr_number: u64) -> String {
        format!(
            "Review pull request #{pr_number} with `gh pr diff {pr_number}`. If it looks correct, \
             approve it with `gh pr review {pr_number} --approve`; otherwise leave review comments \
             with `gh pr review {pr_number} --comment` describing what needs fixing."
        )
    }
}

#[async_trait]
impl Phase for PrSelfReviewPhase {
    fn name(&self) -> &'static str {
        "pr_self_review"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let Some(pr_number) = context.pr_number else {
            let mut artifacts = std::collections::HashMap::new();
            artifacts.insert("skipped".to_string(), serde_json::json!("No PR number available"));
            return PhaseResult::ok_with_artifacts(0.0, artifacts);
        };

        let prompt = Self::prompt(pr_number);
        match execute_tracked(
            context,
            executor,
            self.name(),
            &prompt,
            vec!["Bash".to_string()],
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
                    PhaseResult::ok(result.cost_usd)
                }
            }
            Err(e) => PhaseResult::fail(e),
        }
    }
}
