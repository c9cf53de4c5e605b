//! Planning (C7, phase 4 of 17): produce a concrete implementation plan.
//!
//! Gated for approval by default (`approvals.gates.planning`). Debate-capable.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked, maybe_debate, phase_result_from_debate};
use crate::registry::ExecutorRegistry;

pub struct PlanningPhase {
    registry: Arc<ExecutorRegistry>,
}

impl PlanningPhase {
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    fn prompt(task_description: &str) -> String {
        format!(
            "Write a concrete implementation plan for this task:\n\n{task_description}\n\n\
             List the files to add or change, the order of changes, and how each change will be tested. \
             Do not write or edit any files yet."
        )
    }

    fn plan_path(context: &Context) -> PathBuf {
        context.plans_dir.join(format!("plan-{}.md", context.task_slug))
    }
}

#[async_trait]
impl Phase for PlanningPhase {
    fn name(&self) -> &'static str {
        "planning"
    }

    fn allowed_tools(&self) -> Vec<String> {
        vec!["Read".to_string(), "Grep".to_string(), "Glob".to_string()]
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::Plan)
    }

    fn approval_gate(&self) -> bool {
        true
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let prompt = Self::prompt(&context.task_description);

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
            return phase_result_from_debate(debate);
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

        let path = Self::plan_path(context);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&path, &result.output) {
            return PhaseResult::fail_with_cost(result.cost_usd, format!("failed to write plan: {e}"));
        }

        let mut artifacts = std::collections::HashMap::new();
        artifacts.insert("plan_file".to_string(), serde_json::json!(path.display().to_string()));
        PhaseResult::ok_with_artifacts(result.cost_usd, artifacts)
    }
}
