//! Implementation (C7, phase 6 of 17): the main coding phase.
//!
//! Full tool access, accept-edits permission mode, resumes the planning
//! session so the agent keeps the approved plan in context.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct ImplementationPhase;

impl ImplementationPhase {
    fn prompt(context: &Context) -> String {
        format!(
            "Implement the approved plan for this task:\n\n{}\n\n\
             Follow the plan. Keep changes focused and idiomatic for this codebase.",
            context.task_description
        )
    }
}

#[async_trait]
impl Phase for ImplementationPhase {
    fn name(&self) -> &'static str {
        "implementation"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    fn approval_gate(&self) -> bool {
        true
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let prompt = Self::prompt(context);
        let resume = context.get_session_id("planning").cloned();

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
