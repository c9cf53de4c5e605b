//! Shared helpers for concrete phases (C7).

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::debate::{DebateFileManager, DebateOrchestrator, DebatePrompts, DebateResult};
use crate::executor::{AgentExecutor, ExecutionOptions, ExecutionResult, PermissionMode};
use crate::phase::PhaseResult;
use crate::registry::ExecutorRegistry;

pub fn dangerous_mode(config: &OrchestratorConfig) -> bool {
    config.autonomous_mode && config.agent.dangerous_mode
}

/// Runs a single prompt against `executor`, recording the cost on `context`
/// regardless of success. `resume_session` is omitted entirely for
/// fresh-context phases by the caller (pass `None`).
#[allow(clippy::too_many_arguments)]
pub async fn execute_tracked(
    context: &mut Context,
    executor: &Arc<dyn AgentExecutor>,
    phase_name: &str,
    prompt: &str,
    allowed_tools: Vec<String>,
    max_turns: u32,
    timeout_secs: u64,
    permission_mode: Option<PermissionMode>,
    resume_session: Option<String>,
    dangerous: bool,
) -> Result<ExecutionResult, String> {
    let opts = ExecutionOptions {
        permission_mode,
        allowed_tools,
        max_turns,
        timeout: Some(std::time::Duration::from_secs(timeout_secs)),
        resume_session,
        dangerous_mode: dangerous,
        working_dir: Some(context.get_working_dir().to_path_buf()),
        ..ExecutionOptions::new()
    };

    let result = executor.execute(prompt, opts).await.map_err(|e| e.to_string())?.validate();
    let _ = context.add_cost(phase_name, result.cost_usd);
    Ok(result)
}

/// For the four review-grade phases. When debate is enabled for this phase
/// name, runs the two-role deliberation and returns its result instead of a
/// plain single-agent call; otherwise returns `None` and the caller falls
/// back to its own single-agent flow.
pub async fn maybe_debate(
    phase_name: &'static str,
    context: &mut Context,
    primary: &Arc<dyn AgentExecutor>,
    config: &OrchestratorConfig,
    registry: &ExecutorRegistry,
    permission_mode: Option<PermissionMode>,
    allowed_tools: Vec<String>,
    max_turns: u32,
) -> Option<DebateResult> {
    if !config.debate.enabled || !config.debate.phases.enabled_for(phase_name) {
        return None;
    }

    let working_dir = context.get_working_dir().to_path_buf();
    let secondary = registry.create(&config.debate.secondary_agent, working_dir).ok()?;

    let debate_config = config.debate.to_runtime();
    let files = DebateFileManager::new(&context.plans_dir, &context.task_slug);
    let prompts = DebatePrompts::new(
        phase_name,
        context.task_description.clone(),
        primary.agent_kind(),
        &config.debate.secondary_agent,
    );

    let mut orchestrator = DebateOrchestrator::new(primary.clone(), secondary, debate_config, files);
    let result = orchestrator
        .run_debate(context, phase_name, &prompts, permission_mode, allowed_tools, dangerous_mode(config), max_turns)
        .await;

    let cost = result.total_cost();
    let _ = context.add_cost(phase_name, cost);
    Some(result)
}

pub fn debate_artifacts(result: &DebateResult) -> HashMap<String, serde_json::Value> {
    let mut artifacts = HashMap::new();
    artifacts.insert("output_file".to_string(), serde_json::json!(result.final_output_file.display().to_string()));
    artifacts.insert("debate_used".to_string(), serde_json::json!(true));
    artifacts
}

pub fn phase_result_from_debate(result: DebateResult) -> PhaseResult {
    let cost = result.total_cost();
    if result.success {
        PhaseResult::ok_with_artifacts(cost, debate_artifacts(&result))
    } else {
        PhaseResult::fail_with_cost(cost, result.error.unwrap_or_else(|| format!("debate for {} failed", result.phase_name)))
    }
}
