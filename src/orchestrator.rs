//! Workflow orchestrator (C9): drives the fixed 17-phase pipeline.
//!
//! Owns the main loop, the retry-and-fallback logic around each phase, the
//! approval gate wait, budget-warning thresholds, and checkpoint/resume.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::classifier::{classify_error, ErrorOrigin};
use crate::config::{OrchestratorConfig, PHASE_ORDER};
use crate::context::Context;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::executor::AgentExecutor;
use crate::external::GitDriver;
use crate::notify::{notify_shielded, NotificationLevel, Notifier, WorkflowEvent};
use crate::phase::{Phase, PhaseResult};
use crate::registry::ExecutorRegistry;
use crate::rules::RulesManager;
use crate::state::{ApprovalStore, CheckpointManager, StateStore};

/// Outcome of a full workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub success: bool,
    pub failed_phase: Option<String>,
    pub error: Option<String>,
    pub total_cost_usd: f64,
    pub pr_url: Option<String>,
}

fn container_isolation_present() -> bool {
    if PathBuf::from("/.dockerenv").exists() {
        return true;
    }
    if let Ok(cgroup) = std::fs::read_to_string("/proc/1/cgroup") {
        if cgroup.contains("docker") || cgroup.contains("kubepods") {
            return true;
        }
    }
    std::env::var("SELFASSEMBLER_ALLOW_HOST_AUTONOMOUS").as_deref() == Ok("I_ACCEPT_THE_RISK")
}

/// Phases that must never be retried against a different agent: they are
/// either too consequential to hand to an unvetted fallback (commit/PR
/// phases), already debate-protected, or their own internal fix-loop is the
/// retry mechanism.
fn fallback_ineligible(phase_name: &str, config: &OrchestratorConfig) -> bool {
    const NEVER_FALLBACK: &[&str] = &[
        "commit_prep",
        "conflict_check",
        "pr_creation",
        "pr_self_review",
        "preflight",
        "setup",
        "lint_check",
        "test_execution",
    ];
    if NEVER_FALLBACK.contains(&phase_name) {
        return true;
    }
    config.debate.enabled && config.debate.phases.enabled_for(phase_name)
}

/// Swaps the primary executor in for the duration of a fallback attempt,
/// restoring the original on drop regardless of how the attempt ends.
struct ExecutorSwapGuard<'a> {
    slot: &'a mut Arc<dyn AgentExecutor>,
    original: Option<Arc<dyn AgentExecutor>>,
}

impl<'a> ExecutorSwapGuard<'a> {
    fn swap(slot: &'a mut Arc<dyn AgentExecutor>, replacement: Arc<dyn AgentExecutor>) -> Self {
        let original = std::mem::replace(slot, replacement);
        Self { slot, original: Some(original) }
    }

    fn executor(&self) -> &Arc<dyn AgentExecutor> {
        &*self.slot
    }
}

impl Drop for ExecutorSwapGuard<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            *self.slot = original;
        }
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    pipeline: Vec<Box<dyn Phase>>,
    executor: Arc<dyn AgentExecutor>,
    executor_registry: Arc<ExecutorRegistry>,
    git: Arc<dyn GitDriver>,
    notifier: Arc<dyn Notifier>,
    state_store: StateStore,
    warned_budget_bands: std::collections::HashSet<u32>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        pipeline: Vec<Box<dyn Phase>>,
        executor: Arc<dyn AgentExecutor>,
        executor_registry: Arc<ExecutorRegistry>,
        git: Arc<dyn GitDriver>,
        notifier: Arc<dyn Notifier>,
    ) -> OrchestratorResult<Self> {
        if config.autonomous_mode && !container_isolation_present() {
            return Err(OrchestratorError::ContainerRequired);
        }
        Ok(Self {
            config,
            pipeline,
            executor,
            executor_registry,
            git,
            notifier,
            state_store: StateStore::with_default_dir(),
            warned_budget_bands: std::collections::HashSet::new(),
        })
    }

    fn checkpoint(&self, context: &mut Context) {
        let manager = CheckpointManager::new(&self.state_store);
        match manager.create(context) {
            Ok(id) => notify_shielded(
                self.notifier.as_ref(),
                WorkflowEvent::CheckpointCreated,
                NotificationLevel::Info,
                &format!("checkpoint {id} saved at phase {}", context.current_phase),
                None,
            ),
            Err(e) => tracing::warn!(error = %e, "failed to save checkpoint"),
        }
    }

    /// Emits a one-time warning the first time total cost crosses each 20%
    /// band of the budget (80%, for instance, fires once, not on every
    /// subsequent phase).
    fn maybe_warn_budget(&mut self, context: &Context) {
        let fraction = context.total_cost_usd / context.budget_limit_usd.max(0.01);
        let band = (fraction * 5.0).floor() as u32;
        if band >= 4 && self.warned_budget_bands.insert(band) {
            notify_shielded(
                self.notifier.as_ref(),
                WorkflowEvent::BudgetWarning,
                NotificationLevel::Warning,
                &format!(
                    "budget at {:.0}% (${:.2} / ${:.2})",
                    fraction * 100.0,
                    context.total_cost_usd,
                    context.budget_limit_usd
                ),
                None,
            );
        }
    }

    fn write_rules_to_worktree(&self, context: &Context) {
        if let Some(worktree) = &context.worktree_path {
            let manager = RulesManager::new(self.config.rules.enabled_rules.clone(), self.config.rules.custom_rules.clone());
            if let Err(e) = manager.write_to_worktree(worktree) {
                tracing::warn!(error = %e, "failed to write project rules to worktree");
            }
        }
    }

    /// Runs a single phase with retry-and-fallback. On agent-attributable
    /// failure (or, under an `all_errors` trigger, any failure), swaps in the
    /// configured fallback agent for up to `max_fallback_attempts` retries.
    /// Runs `self.pipeline[index]` with retry-and-fallback. Takes an index
    /// rather than a `&dyn Phase` so the pipeline borrow never overlaps the
    /// `&mut self` needed for notifications and fallback-executor creation.
    async fn run_phase(&mut self, index: usize, context: &mut Context) -> PhaseResult {
        let phase_name = self.pipeline[index].name();
        let (ok, detail) = self.pipeline[index].validate_preconditions(context);
        if !ok {
            return PhaseResult::fail(format!("precondition failed: {detail}"));
        }

        let estimated_cost = self.config.get_phase_config(phase_name).estimated_cost;
        if context.budget_remaining() < estimated_cost {
            let err = OrchestratorError::budget_exceeded(context.total_cost_usd, context.budget_limit_usd);
            return PhaseResult::fail(err.to_string());
        }

        let mut executor = self.executor.clone();
        let result = self.pipeline[index].run(context, &executor, &self.config).await;
        if result.success || fallback_ineligible(phase_name, &self.config) {
            return result;
        }

        let Some(fallback_kind) = self.config.fallback.fallback_agent.clone() else {
            return result;
        };

        let classification = classify_error(result.error.as_deref(), Some(executor.agent_kind()));
        let should_retry = match self.config.fallback.trigger {
            crate::config::FallbackTrigger::AgentErrors => classification.origin == ErrorOrigin::Agent,
            crate::config::FallbackTrigger::AllErrors => true,
        };
        if !should_retry {
            return result;
        }

        let working_dir = context.get_working_dir().to_path_buf();
        let Ok(fallback_executor) = self.executor_registry.create(&fallback_kind, working_dir) else {
            return result;
        };

        let mut last_result = result;
        for attempt in 1..=self.config.fallback.max_fallback_attempts {
            notify_shielded(
                self.notifier.as_ref(),
                WorkflowEvent::PhaseRetry,
                NotificationLevel::Warning,
                &format!("retrying phase '{phase_name}' with fallback agent (attempt {attempt})"),
                None,
            );
            let guard = ExecutorSwapGuard::swap(&mut executor, fallback_executor.clone());
            let attempt_result = self.pipeline[index].run(context, guard.executor(), &self.config).await;
            drop(guard);
            if attempt_result.success {
                return attempt_result;
            }
            last_result = attempt_result;
        }
        last_result
    }

    fn needs_approval(&self, phase_name: &str, approval_gate: bool) -> bool {
        if !self.config.approvals.enabled || !approval_gate {
            return false;
        }
        let gates = &self.config.approvals.gates;
        match phase_name {
            "planning" => gates.planning,
            "plan_review" => gates.plan_review,
            "implementation" => gates.implementation,
            "pr_creation" => gates.pr_creation,
            _ => false,
        }
    }

    fn can_cleanup_safely(&self, context: &Context) -> bool {
        context.pr_url.is_some() && context.branch_pushed
    }

    fn cleanup(&self, context: &Context) {
        if !self.can_cleanup_safely(context) {
            return;
        }
        if let Some(worktree) = &context.worktree_path {
            if self.config.git.cleanup_on_fail {
                let _ = self.git.remove_worktree(worktree, false);
            }
        }
        if self.config.git.cleanup_remote_on_fail {
            self.git.cleanup_unreachable_remote();
        }
    }

    /// Drives every phase in `PHASE_ORDER`, skipping phases already recorded
    /// as complete on `context` (resume support) and waiting out approval
    /// gates in between.
    pub async fn run_workflow(&mut self, mut context: Context) -> WorkflowOutcome {
        notify_shielded(self.notifier.as_ref(), WorkflowEvent::WorkflowStarted, NotificationLevel::Info, &context.task_description, None);

        for phase_name in PHASE_ORDER {
            let Some(index) = self.pipeline.iter().position(|p| p.name() == phase_name) else {
                continue;
            };
            if context.is_phase_completed(phase_name) {
                continue;
            }

            let phase_config = self.config.get_phase_config(phase_name);
            if !phase_config.enabled {
                context.mark_phase_complete(phase_name);
                continue;
            }

            context.current_phase = phase_name.to_string();
            notify_shielded(self.notifier.as_ref(), WorkflowEvent::PhaseStarted, NotificationLevel::Info, phase_name, None);

            let approval_gate = self.pipeline[index].approval_gate();
            let result = self.run_phase(index, &mut context).await;

            if phase_name == "setup" && result.success {
                self.write_rules_to_worktree(&context);
            }

            self.maybe_warn_budget(&context);

            if !result.success {
                let soft_fail = phase_config.soft_fail;
                notify_shielded(
                    self.notifier.as_ref(),
                    WorkflowEvent::PhaseFailed,
                    NotificationLevel::Error,
                    &format!("phase '{phase_name}' failed: {}", result.error.clone().unwrap_or_default()),
                    Some(&json!({ "phase": phase_name, "soft_fail": soft_fail })),
                );
                if soft_fail {
                    context.mark_phase_complete(phase_name);
                    continue;
                }
                self.cleanup(&context);
                notify_shielded(self.notifier.as_ref(), WorkflowEvent::WorkflowFailed, NotificationLevel::Error, phase_name, None);
                return WorkflowOutcome {
                    success: false,
                    failed_phase: Some(phase_name.to_string()),
                    error: result.error,
                    total_cost_usd: context.total_cost_usd,
                    pr_url: context.pr_url.clone(),
                };
            }

            context.mark_phase_complete(phase_name);
            notify_shielded(self.notifier.as_ref(), WorkflowEvent::PhaseComplete, NotificationLevel::Success, phase_name, None);
            self.checkpoint(&mut context);

            if self.needs_approval(phase_name, approval_gate) {
                notify_shielded(self.notifier.as_ref(), WorkflowEvent::ApprovalNeeded, NotificationLevel::Warning, phase_name, None);
                let approvals = ApprovalStore::new(&context.plans_dir);
                let approved = approvals.wait_for_approval(phase_name, self.config.approvals.timeout_hours).await;
                if !approved {
                    self.cleanup(&context);
                    return WorkflowOutcome {
                        success: false,
                        failed_phase: Some(phase_name.to_string()),
                        error: Some(format!("approval for '{phase_name}' timed out")),
                        total_cost_usd: context.total_cost_usd,
                        pr_url: context.pr_url.clone(),
                    };
                }
            }
        }

        notify_shielded(self.notifier.as_ref(), WorkflowEvent::WorkflowComplete, NotificationLevel::Success, &context.task_slug, None);
        WorkflowOutcome {
            success: true,
            failed_phase: None,
            error: None,
            total_cost_usd: context.total_cost_usd,
            pr_url: context.pr_url.clone(),
        }
    }

    /// Resumes from a saved checkpoint and re-enters `run_workflow`.
    pub async fn resume_workflow(&mut self, checkpoint_id: &str) -> OrchestratorResult<WorkflowOutcome> {
        let manager = CheckpointManager::new(&self.state_store);
        let context = manager.load(checkpoint_id)?;
        Ok(self.run_workflow(context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackTrigger;
    use crate::external::NullGitDriver;
    use crate::notify::ConsoleNotifier;

    #[test]
    fn fallback_ineligible_for_named_phases() {
        let config = OrchestratorConfig::default();
        assert!(fallback_ineligible("commit_prep", &config));
        assert!(fallback_ineligible("pr_creation", &config));
        assert!(!fallback_ineligible("implementation", &config));
    }

    #[test]
    fn fallback_ineligible_when_debate_enabled_for_phase() {
        let mut config = OrchestratorConfig::default();
        config.debate.enabled = true;
        assert!(fallback_ineligible("research", &config));
    }

    #[test]
    fn fallback_trigger_variants_are_distinct() {
        assert_ne!(FallbackTrigger::AgentErrors, FallbackTrigger::AllErrors);
    }

    struct NeverRunPhase;

    #[async_trait::async_trait]
    impl Phase for NeverRunPhase {
        fn name(&self) -> &'static str {
            "implementation"
        }

        async fn run(&self, _context: &mut Context, _executor: &Arc<dyn AgentExecutor>, _config: &OrchestratorConfig) -> PhaseResult {
            panic!("reached Phase::run past the budget guard, as expected");
        }
    }

    fn test_orchestrator(config: OrchestratorConfig) -> Orchestrator {
        let git: Arc<dyn GitDriver> = Arc::new(NullGitDriver::new("."));
        let registry = Arc::new(ExecutorRegistry::with_defaults());
        let executor = registry.create(&config.agent.kind, PathBuf::from(".")).expect("known kind");
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(false));
        Orchestrator::new(config, vec![Box::new(NeverRunPhase)], executor, registry, git, notifier).unwrap()
    }

    #[tokio::test]
    async fn run_phase_fails_before_running_when_budget_is_exhausted() {
        let mut config = OrchestratorConfig::default();
        config.phases.phases.get_mut("implementation").unwrap().estimated_cost = 5.0;
        let mut orchestrator = test_orchestrator(config);
        let mut context = Context::new("task".to_string(), "task".to_string(), PathBuf::from("."), PathBuf::from("."));
        context.budget_limit_usd = 5.0;
        context.total_cost_usd = 4.5;

        let result = orchestrator.run_phase(0, &mut context).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Budget exceeded"));
    }

    #[tokio::test]
    #[should_panic(expected = "budget guard")]
    async fn run_phase_proceeds_when_budget_covers_estimated_cost() {
        let mut config = OrchestratorConfig::default();
        config.phases.phases.get_mut("implementation").unwrap().estimated_cost = 1.0;
        let mut orchestrator = test_orchestrator(config);
        let mut context = Context::new("task".to_string(), "task".to_string(), PathBuf::from("."), PathBuf::from("."));
        context.budget_limit_usd = 5.0;
        context.total_cost_usd = 0.0;

        // Budget covers the estimated cost, so the guard should let this
        // reach `NeverRunPhase::run`, which panics to prove it was called.
        orchestrator.run_phase(0, &mut context).await;
    }
}
