//! Documentation (C7, phase 12 of 17): update docs/comments for the change.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct DocumentationPhase;

impl DocumentationPhase {
    fn prompt(context: &Context) -> String {
        format!(
            "Update any documentation, doc comments, or README sections affected by this task:\n\n{}\n\n\
             Only touch docs whose described behavior actually changed.",
            context.task_description
        )
    }
}

#[async_trait]
impl Phase for DocumentationPhase {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let prompt = Self::prompt(context);
        let resume = context.get_session_id("implementation").cloned();

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
