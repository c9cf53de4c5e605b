//! Research (C7, phase 3 of 17): read-only investigation of the codebase.
//!
//! Plan-mode, read-only tools only. Debate-capable: when enabled, two agents
//! independently investigate and converge on a shared research note instead
//! of a single agent's first pass.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked, maybe_debate, phase_result_from_debate};
use crate::registry::ExecutorRegistry;

const READ_ONLY_TOOLS: &[&str] = &["Read", "Grep", "Glob"];

pub struct ResearchPhase {
    registry: Arc<ExecutorRegistry>,
}

impl ResearchPhase {
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    fn prompt(task_description: &str) -> String {
        format!(
            "Investigate the codebase to understand what is needed to implement this task:\n\n{task_description}\n\n\
             Identify the relevant files, existing patterns to follow, and any constraints or risks. \
             Do not write or edit any files. Summarize your findings."
        )
    }
}

#[async_trait]
impl Phase for ResearchPhase {
    fn name(&self) -> &'static str {
        "research"
    }

    fn allowed_tools(&self) -> Vec<String> {
        READ_ONLY_TOOLS.iter().map(|s| s.to_string()).collect()
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::Plan)
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
                    artifacts.insert("findings".to_string(), serde_json::json!(result.output));
                    PhaseResult::ok_with_artifacts(result.cost_usd, artifacts)
                }
            }
            Err(e) => PhaseResult::fail(e),
        }
    }
}
