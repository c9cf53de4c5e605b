//! Test execution (C7, phase 8 of 17): a bounded run-fix-rerun loop.
//!
//! When a test command can be detected, the orchestrator drives the loop
//! directly so the agent only ever sees genuinely new failures (net of a
//! known-failures baseline). When no command can be detected, the agent is
//! asked to both find and run the tests itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::{AgentExecutor, PermissionMode};
use crate::external::{diff_test_failures, load_known_failures, parse_test_output, CommandDetector};
use crate::phase::{Phase, PhaseResult};
use crate::phases::support::{dangerous_mode, execute_tracked};

pub struct TestExecutionPhase {
    detector: Arc<dyn CommandDetector>,
}

impl TestExecutionPhase {
    pub fn new(detector: Arc<dyn CommandDetector>) -> Self {
        Self { detector }
    }

    fn fix_prompt(failures: &[String]) -> String {
        format!(
            "These tests are failing:\n\n{}\n\n\
             Fix the underlying issue. Do NOT run the tests yourself — the orchestrator will rerun them.",
            failures.iter().map(|f| format!("- {f}")).collect::<Vec<_>>().join("\n")
        )
    }

    async fn run_with_claude_detection(
        &self,
        context: &mut Context,
        executor: &Arc<dyn AgentExecutor>,
        config: &OrchestratorConfig,
    ) -> PhaseResult {
        let prompt = "Find and run this project's test suite. Report whether all tests pass, \
                       and list the names of any that fail."
            .to_string();
        match execute_tracked(
            context,
            executor,
            self.name(),
            &prompt,
            vec!["Bash".to_string(), "Read".to_string()],
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
impl Phase for TestExecutionPhase {
    fn name(&self) -> &'static str {
        "test_execution"
    }

    fn permission_mode(&self) -> Option<PermissionMode> {
        Some(PermissionMode::AcceptEdits)
    }

    async fn run(&self, context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let workdir = context.get_working_dir().to_path_buf();
        let phase_config = config.get_phase_config(self.name());

        let Some(command) = self.detector.get_command(&workdir, "test", config.commands.test.as_deref()) else {
            return self.run_with_claude_detection(context, executor, config).await;
        };

        let known = if phase_config.baseline_enabled {
            load_known_failures(&workdir)
        } else {
            Vec::new()
        };

        // The first run establishes the baseline of failures that predate this
        // phase's fix attempts; only failures net of that baseline (and of
        // `.sa-known-failures`) ever trigger a fix request.
        let mut baseline: Vec<String> = Vec::new();
        let mut total_cost = 0.0;
        for iteration in 1..=phase_config.max_iterations {
            let (success, stdout, stderr) =
                self.detector.run_command(&workdir, &command, Duration::from_secs(phase_config.command_timeout));
            let combined = format!("{stdout}\n{stderr}");
            let outcome = parse_test_output(&combined);
            let (net_new, _baseline_present) = diff_test_failures(&outcome.failure_ids, &baseline, &known, !success);

            if iteration == 1 {
                baseline = outcome.failure_ids.clone();
            }

            if net_new.is_empty() {
                let mut artifacts = std::collections::HashMap::new();
                artifacts.insert("iterations".to_string(), serde_json::json!(iteration));
                artifacts.insert("command".to_string(), serde_json::json!(command));
                return PhaseResult::ok_with_artifacts(total_cost, artifacts);
            }

            if iteration == phase_config.max_iterations {
                return PhaseResult::fail_with_cost(
                    total_cost,
                    format!("tests still failing after {iteration} iterations: {}", net_new.join(", ")),
                );
            }

            let prompt = Self::fix_prompt(&net_new);
            let resume = context.get_session_id(self.name()).cloned();
            match execute_tracked(
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
            {
                Ok(result) => {
                    context.set_session_id(self.name(), &result.session_id);
                    total_cost += result.cost_usd;
                    if result.is_error {
                        return PhaseResult::fail_with_cost(total_cost, result.output);
                    }
                }
                Err(e) => return PhaseResult::fail_with_cost(total_cost, e),
            }
        }

        PhaseResult::fail_with_cost(total_cost, "exhausted fix iterations")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::OrchestratorResult;
    use crate::executor::{ExecutionOptions, ExecutionResult};
    use crate::external::ProjectKind;

    /// Scripts a run-command sequence: a pre-existing failure that persists
    /// across every call, standing in for a test that was already broken
    /// before this phase started.
    struct PreExistingFailureDetector {
        calls: AtomicUsize,
    }

    impl CommandDetector for PreExistingFailureDetector {
        fn detect_project_kind(&self, _workdir: &Path) -> ProjectKind {
            ProjectKind::Unknown
        }

        fn get_command(&self, _workdir: &Path, _kind: &str, _override: Option<&str>) -> Option<String> {
            Some("run-tests".to_string())
        }

        fn run_command(&self, _workdir: &Path, _command: &str, _timeout: Duration) -> (bool, String, String) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (false, "FAILED tests/test_a.py::test_one - AssertionError\n".to_string(), String::new())
        }
    }

    struct FixExecutor;

    #[async_trait]
    impl AgentExecutor for FixExecutor {
        fn agent_kind(&self) -> &str {
            "conversational"
        }

        async fn execute(&self, _prompt: &str, _opts: ExecutionOptions) -> OrchestratorResult<ExecutionResult> {
            Ok(ExecutionResult {
                session_id: "sess-1".to_string(),
                output: "attempted a fix".to_string(),
                cost_usd: 0.1,
                duration_ms: 10,
                num_turns: 1,
                is_error: false,
                raw_output: String::new(),
                subagent_results: Vec::new(),
                agent_kind: "conversational".to_string(),
            })
        }

        async fn check_available(&self) -> (bool, String) {
            (true, String::new())
        }

        fn build_command(&self, _prompt: &str, _opts: &ExecutionOptions) -> Vec<String> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn a_persisting_pre_existing_failure_does_not_keep_triggering_fix_attempts() {
        let detector = Arc::new(PreExistingFailureDetector { calls: AtomicUsize::new(0) });
        let phase = TestExecutionPhase::new(detector.clone());
        let config = OrchestratorConfig::default();
        let executor: Arc<dyn AgentExecutor> = Arc::new(FixExecutor);
        let mut context = Context::new(
            "task".to_string(),
            "task".to_string(),
            std::env::temp_dir(),
            std::env::temp_dir(),
        );

        let result = phase.run(&mut context, &executor, &config).await;

        assert!(result.success, "a failure present since iteration 1 must not fail the phase: {:?}", result.error);
        // Iteration 1 establishes the baseline (and triggers one fix attempt,
        // since nothing is known to be pre-existing yet); iteration 2 sees the
        // same failure again, now excluded by the baseline, and succeeds
        // immediately instead of looping until `max_iterations` is exhausted.
        assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
    }
}
