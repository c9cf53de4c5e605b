//! Lint check (C7, phase 11 of 17).
//!
//! Runs the formatter once with no retry, then lints and typechecks each in
//! their own bounded fix-loop (so a lint fix-loop failure doesn't block an
//! otherwise-passing typecheck, and vice versa). Falls back to a single
//! Claude-driven detect-and-fix prompt when neither command can be detected.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::external::CommandDetector;
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct LintCheckPhase {
    detector: Arc<dyn CommandDetector>,
}

impl LintCheckPhase {
    pub fn new(detector: Arc<dyn CommandDetector>) -> Self {
        Self { detector }
    }

    async fn fix_loop(
        &self,
        context: &mut Context,
        executor: &Arc<dyn AgentExecutor>,
        config: &OrchestratorConfig,
        label: &str,
        command: &str,
        fix_prompt: impl Fn(&str) -> String,
    ) -> Result<f64, String> {
        let workdir = context.get_working_dir().to_path_buf();
        let phase_config = config.get_phase_config(self.name());
        let mut total_cost = 0.0;

        for iteration in 1..=phase_config.max_iterations {
            let (success, stdout, stderr) =
                self.detector.run_command(&workdir, command, Duration::from_secs(phase_config.command_timeout));
            if success {
                return Ok(total_cost);
            }
            if iteration == phase_config.max_iterations {
                return Err(format!("{label} still failing after {iteration} iterations"));
            }

            let combined = format!("{stdout}\n{stderr}");
            let prompt = fix_prompt(&combined);
            let resume = context.get_session_id(self.name()).cloned();
            let result = execute_tracked(
                context,
                executor,
                self.name(),
                &prompt,
                vec!["Read".to_string(), "Edit".to_string(), "Grep".to_string()],
                self.max_turns(),
                self.timeout_seconds(),
                self.permission_mode(),
                resume,
                dangerous_mode(config),
            )
            .await
            .map_err(|e| format!("{label} fix attempt failed: {e}"))?;

            context.set_session_id(self.name(), &result.session_id);
            total_cost += result.cost_usd;
            if result.is_error {
                return Err(result.output);
            }
        }
        Ok(total_cost)
    }

    async fn claude_detect_and_lint(
        &self,
        context: &mut Context,
        executor: &Arc<dyn AgentExecutor>,
        config: &OrchestratorConfig,
    ) -> PhaseResult {
        let prompt = "Detect and run this project's lint and typecheck commands (cargo clippy, \
                       npm run lint, ruff check, go vet, or whatever this ecosystem uses) and fix \
                       any issues they report."
            .to_string();
        match execute_tracked(
            context,
            executor,
            self.name(),
            &prompt,
            vec!["Bash".to_string(), "Read".to_string(), "Edit".to_string()],
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

#[async_trait]
impl Phase for LintCheckPhase {
    fn name(&self) -> &'static str {
        "lint_check"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let workdir = context.get_working_dir().to_path_buf();
        let lint_cmd = self.detector.get_command(&workdir, "lint", config.commands.lint.as_deref());
        let typecheck_cmd = self.detector.get_command(&workdir, "typecheck", config.commands.typecheck.as_deref());

        if lint_cmd.is_none() && typecheck_cmd.is_none() {
            return self.claude_detect_and_lint(context, executor, config).await;
        }

        let mut total_cost = 0.0;
        if let Some(format_cmd) = self.detector.get_command(&workdir, "format", None) {
            let (_, _, _) = self.detector.run_command(&workdir, &format_cmd, Duration::from_secs(60));
        }

        if let Some(cmd) = lint_cmd {
            match self
                .fix_loop(context, executor, config, "lint", &cmd, |out| {
                    format!("Fix these lint issues:\n\n{out}")
                })
                .await
            {
                Ok(cost) => total_cost += cost,
                Err(e) => return PhaseResult::fail_with_cost(total_cost, e),
            }
        }

        if let Some(cmd) = typecheck_cmd {
            match self
                .fix_loop(context, executor, config, "typecheck", &cmd, |out| {
                    format!("Fix these type errors:\n\n{out}")
                })
                .await
            {
                Ok(cost) => total_cost += cost,
                Err(e) => return PhaseResult::fail_with_cost(total_cost, e),
            }
        }

        PhaseResult::ok(total_cost)
    }
}
