//! Plan review (C7, phase 5 of 17): a fresh-context critique of the plan
//! before any code is written. Debate-capable.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked, maybe_debate, phase_result_from_debate};
use crate::registry::ExecutorRegistry;

pub struct PlanReviewPhase {
    registry: Arc<ExecutorRegistry>,
}

impl PlanReviewPhase {
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    fn prompt(context: &Context, plan: &str) -> String {
        format!(
            "Review this implementation plan for the task below. Flag anything missing, risky, \
             or likely to break existing behavior. Approve it if it is sound.\n\n\
             Task:\n{}\n\nPlan:\n{}",
            context.task_description, plan
        )
    }
}

#[async_trait]
impl Phase for PlanReviewPhase {
    fn name(&self) -> &'static str {
        "plan_review"
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
        let plan_path = context.plans_dir.join(format!("plan-{}.md", context.task_slug));
        let plan = std::fs::read_to_string(&plan_path).unwrap_or_else(|_| context.task_description.clone());
        let prompt = Self::prompt(context, &plan);

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

        match execute_tracked(
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
            Ok(result) => {
                context.set_session_id(self.name(), &result.session_id);
                if result.is_error {
                    PhaseResult::fail_with_cost(result.cost_usd, result.output)
                } else {
                    let mut artifacts = std::collections::HashMap::new();
                    artifacts.insert("review".to_string(), serde_json::json!(result.output));
                    PhaseResult::ok_with_artifacts(result.cost_usd, artifacts)
                }
            }
            Err(e) => PhaseResult::fail(e),
        }
    }
}
