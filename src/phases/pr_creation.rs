//! PR creation (C7, phase 16 of 17): push the branch and open a pull request.
//!
//! A no-op success when the repo has no remote configured — there is
//! nothing to push to.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::external::GitDriver;
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

static PR_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://github\.com/[^/]+/[^/]+/pull/\d+").unwrap());

pub struct PrCreationPhase {
    git: Arc<dyn GitDriver>,
}

impl PrCreationPhase {
    pub fn new(git: Arc<dyn GitDriver>) -> Self {
        Self { git }
    }

    fn prompt(context: &Context) -> String {
        format!(
            "Open a pull request for this branch against the base branch using `gh pr create`. \
             Write a clear title and a body describing the change and how it was tested:\n\n{}",
            context.task_description
        )
    }
}

#[async_trait]
impl Phase for PrCreationPhase {
    fn name(&self) -> &'static str {
        "pr_creation"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    fn approval_gate(&self) -> bool {
        true
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        if !self.git.has_remote() {
            let mut artifacts = std::collections::HashMap::new();
            artifacts.insert("skipped".to_string(), serde_json::json!("No remote configured"));
            return PhaseResult::ok_with_artifacts(0.0, artifacts);
        }

        let Some(branch) = context.branch_name.clone() else {
            return PhaseResult::fail("no branch name recorded in context");
        };

        if let Err(e) = self.git.push(&branch, context.worktree_path.as_deref()) {
            return PhaseResult::fail(format!("push failed: {e}"));
        }
        context.branch_pushed = true;

        let prompt = Self::prompt(context);
        let result = match execute_tracked(
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
            Ok(r) => r,
            Err(e) => return PhaseResult::fail(e),
        };

        context.set_session_id(self.name(), &result.session_id);
        if result.is_error {
            return PhaseResult::fail_with_cost(result.cost_usd, result.output);
        }

        let Some(pr_url) = PR_URL.find(&result.output).map(|m| m.as_str().to_string()) else {
            return PhaseResult::fail_with_cost(result.cost_usd, "could not find a PR URL in the agent's output");
        };
        let pr_number: Option<u64> = pr_url.rsplit('/').next().and_then(|s| s.parse().ok());

        context.pr_url = Some(pr_url.clone());
        context.pr_number = pr_number;

        let mut artifacts = std::collections::HashMap::new();
        artifacts.insert("pr_url".to_string(), serde_json::json!(pr_url));
        artifacts.insert("pr_number".to_string(), serde_json::json!(pr_number));
        PhaseResult::ok_with_artifacts(result.cost_usd, artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_url_regex_matches_standard_format() {
        let text = "Created pull request: https://github.com/acme/widgets/pull/42\nDone.";
        let m = PR_URL.find(text).unwrap();
        assert_eq!(m.as_str(), "https://github.com/acme/widgets/pull/42");
    }
}
