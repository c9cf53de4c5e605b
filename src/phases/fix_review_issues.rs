//! Fix review issues (C7, phase 10 of 17).
//!
//! Skips cleanly if `code_review` left no review file — nothing to act on.
//! Otherwise addresses Critical and Major findings, and considers Minor ones.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::code_review::CodeReviewPhase;
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct FixReviewIssuesPhase;

impl FixReviewIssuesPhase {
    fn prompt(review: &str) -> String {
        format!(
            "Address the Critical and Major issues from this code review; use judgment on Minor ones:\n\n{review}"
        )
    }
}

#[async_trait]
impl Phase for FixReviewIssuesPhase {
    fn name(&self) -> &'static str {
        "fix_review_issues"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let review_path = CodeReviewPhase::review_path(context);
        let Ok(review) = std::fs::read_to_string(&review_path) else {
            let mut artifacts = std::collections::HashMap::new();
            artifacts.insert("skipped".to_string(), serde_json::json!("No review file found"));
            return PhaseResult::ok_with_artifacts(0.0, artifacts);
        };

        let prompt = Self::prompt(&review);
        let resume = context.get_session_id("code_review").cloned();

        match execute_tracked(
            context,
            executor,
            self.name(),
            &prompt,
            self.allowed_tools(),
            self.max_turns(),
            self.timeout_seconds(),
            self.permission_mode(),
            resume,
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
