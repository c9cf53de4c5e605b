//! Code review (C7, phase 9 of 17): a fresh-context review of the diff.
//!
//! Plan-mode, read-only. Debate-capable. Writes structured findings
//! (Critical/Major/Minor) to a review file that `fix_review_issues`
//! consumes next.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked, maybe_debate, phase_result_from_debate};
use crate::registry::ExecutorRegistry;

pub struct CodeReviewPhase {
    registry: Arc<ExecutorRegistry>,
}

impl CodeReviewPhase {
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    pub fn review_path(context: &Context) -> PathBuf {
        context.plans_dir.join(format!("review-{}.md", context.task_slug))
    }

    fn prompt(context: &Context) -> String {
        format!(
            "Review the code changes made for this task:\n\n{}\n\n\
             Organize findings under `## Critical`, `## Major`, and `## Minor` headings. \
             Leave a heading's section empty if there is nothing to report.",
            context.task_description
        )
    }
}

#[async_trait]
impl Phase for CodeReviewPhase {
    fn name(&self) -> &'static str {
        "code_review"
    }

    fn allowed_tools(&self) -> Vec<String> {
        vec!["Read".to_string(), "Grep".to_string(), "Glob".to_string()]
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::Plan)
    }

    fn fresh_context(&self) -> bool {
        true
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let prompt = Self::prompt(context);
        let path = Self::review_path(context);

        if let Some(debate) = maybe_debate(
            self.name(),
            context,
            executor,
            config,
            &self.registry,
            self.permission_mode(),
            self.allowed_tools(),
            self.max_turns(),
        )
        .await
        {
            let result = phase_result_from_debate(debate);
            if result.success {
                if let Some(output_file) = result.artifacts.get("output_file").and_then(|v| v.as_str()) {
                    if let Ok(content) = std::fs::read_to_string(output_file) {
                        let _ = std::fs::write(&path, content);
                    }
                }
            }
            return result;
        }

        let result = match execute_tracked(
            context,
            executor,
            self.name(),
            &prompt,
            self.allowed_tools(),
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

        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&path, &result.output) {
            return PhaseResult::fail_with_cost(result.cost_usd, format!("failed to write review: {e}"));
        }

        let mut artifacts = std::collections::HashMap::new();
        artifacts.insert("review_file".to_string(), serde_json::json!(path.display().to_string()));
        PhaseResult::ok_with_artifacts(result.cost_usd, artifacts)
    }
}
