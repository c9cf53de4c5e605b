//! Test writing (C7, phase 7 of 17): add or extend tests for the new code.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct TestWritingPhase;

impl TestWritingPhase {
    fn prompt(context: &Context) -> String {
        format!(
            "Write tests covering the changes made for this task:\n\n{}\n\n\
             Prefer the existing test style and placement in this codebase. Do not run the tests yet.",
            context.task_description
        )
    }
}

#[async_trait]
impl Phase for TestWritingPhase {
    fn name(&self) -> &'static str {
        "test_writing"
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
