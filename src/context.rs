//! Workflow context (C4).
//!
//! The single mutable object threaded through the entire workflow. All
//! mutation goes through named methods so call sites (and the orchestrator's
//! optional change log) stay legible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{OrchestratorError, OrchestratorResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub task_description: String,
    pub task_slug: String,
    pub repo_path: PathBuf,
    pub plans_dir: PathBuf,

    pub worktree_path: Option<PathBuf>,
    pub branch_name: Option<String>,
    pub branch_pushed: bool,

    pub current_phase: String,
    pub started_at: DateTime<Utc>,
    pub completed_phases: Vec<String>,

    pub pr_number: Option<u64>,
    pub pr_url: Option<String>,

    pub checkpoint_id: Option<String>,
    pub resumed_from_checkpoint: bool,

    pub total_cost_usd: f64,
    pub budget_limit_usd: f64,
    pub phase_costs: HashMap<String, f64>,

    pub session_ids: HashMap<String, String>,

    pub artifacts: HashMap<String, serde_json::Value>,
}

impl Context {
    pub fn new(task_description: impl Into<String>, task_slug: impl Into<String>, repo_path: PathBuf, plans_dir: PathBuf) -> Self {
        Self {
            task_description: task_description.into(),
            task_slug: task_slug.into(),
            repo_path,
            plans_dir,
            worktree_path: None,
            branch_name: None,
            branch_pushed: false,
            current_phase: "idle".to_string(),
            started_at: Utc::now(),
            completed_phases: Vec::new(),
            pr_number: None,
            pr_url: None,
            checkpoint_id: None,
            resumed_from_checkpoint: false,
            total_cost_usd: 0.0,
            budget_limit_usd: 15.0,
            phase_costs: HashMap::new(),
            session_ids: HashMap::new(),
            artifacts: HashMap::new(),
        }
    }

    /// Add cost for a phase and check the budget limit. The check happens
    /// strictly after the increment, so a failing phase's cost is still
    /// recorded and visible in checkpoints.
    pub fn add_cost(&mut self, phase: &str, cost: f64) -> OrchestratorResult<()> {
        self.total_cost_usd += cost;
        *self.phase_costs.entry(phase.to_string()).or_insert(0.0) += cost;
        tracing::debug!(phase, cost, total = self.total_cost_usd, "add_cost");

        if self.total_cost_usd > self.budget_limit_usd {
            return Err(OrchestratorError::budget_exceeded(
                self.total_cost_usd,
                self.budget_limit_usd,
            ));
        }
        Ok(())
    }

    pub fn budget_remaining(&self) -> f64 {
        (self.budget_limit_usd - self.total_cost_usd).max(0.0)
    }

    pub fn mark_phase_complete(&mut self, phase: &str) {
        if !self.completed_phases.iter().any(|p| p == phase) {
            self.completed_phases.push(phase.to_string());
        }
    }

    pub fn is_phase_completed(&self, phase: &str) -> bool {
        self.completed_phases.iter().any(|p| p == phase)
    }

    pub fn set_artifact(&mut self, key: &str, value: serde_json::Value) {
        self.artifacts.insert(key.to_string(), value);
    }

    pub fn get_artifact(&self, key: &str) -> Option<&serde_json::Value> {
        self.artifacts.get(key)
    }

    pub fn set_session_id(&mut self, phase: &str, session_id: impl Into<String>) {
        self.session_ids.insert(phase.to_string(), session_id.into());
    }

    pub fn get_session_id(&self, phase: &str) -> Option<&String> {
        self.session_ids.get(phase)
    }

    /// Session key for a debate turn. `role` is `"primary"` or `"secondary"`
    /// — never an agent kind — so two instances of the same agent kind in a
    /// debate do not collide.
    fn debate_key(phase: &str, role: &str, turn: u32, message_num: Option<u32>) -> String {
        match message_num {
            Some(n) => format!("{phase}_{role}_t{turn}_msg{n}"),
            None => format!("{phase}_{role}_t{turn}"),
        }
    }

    pub fn set_debate_session_id(
        &mut self,
        phase: &str,
        role: &str,
        turn: u32,
        session_id: impl Into<String>,
        message_num: Option<u32>,
    ) {
        let key = Self::debate_key(phase, role, turn, message_num);
        self.session_ids.insert(key, session_id.into());
    }

    pub fn get_debate_session_id(
        &self,
        phase: &str,
        role: &str,
        turn: u32,
        message_num: Option<u32>,
    ) -> Option<&String> {
        let key = Self::debate_key(phase, role, turn, message_num);
        self.session_ids.get(&key)
    }

    /// Session to resume for synthesis (Turn 3): the primary's last Turn-2
    /// message session if one exists, else its Turn-1 session.
    pub fn get_synthesis_resume_session(&self, phase: &str) -> Option<&String> {
        for msg_num in [3u32, 2, 1] {
            if let Some(session) = self.get_debate_session_id(phase, "primary", 2, Some(msg_num)) {
                return Some(session);
            }
        }
        self.get_debate_session_id(phase, "primary", 1, None)
    }

    pub fn get_working_dir(&self) -> &Path {
        self.worktree_path.as_deref().unwrap_or(&self.repo_path)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Task: {}", self.task_slug),
            format!("Phase: {}", self.current_phase),
            format!(
                "Cost: ${:.2} / ${:.2}",
                self.total_cost_usd, self.budget_limit_usd
            ),
        ];
        if let Some(branch) = &self.branch_name {
            lines.push(format!("Branch: {branch}"));
        }
        if let Some(url) = &self.pr_url {
            lines.push(format!("PR: {url}"));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new("do the thing", "do-the-thing", PathBuf::from("/repo"), PathBuf::from("/plans"))
    }

    #[test]
    fn add_cost_accumulates_and_tracks_per_phase() {
        let mut c = ctx();
        c.budget_limit_usd = 10.0;
        c.add_cost("phase1", 5.0).unwrap();
        c.add_cost("phase2", 4.0).unwrap();
        assert_eq!(c.total_cost_usd, 9.0);
        assert_eq!(c.phase_costs["phase1"], 5.0);
        assert_eq!(c.phase_costs["phase2"], 4.0);
    }

    #[test]
    fn add_cost_raises_on_strict_overage_but_still_records() {
        let mut c = ctx();
        c.budget_limit_usd = 10.0;
        c.add_cost("phase1", 5.0).unwrap();
        c.add_cost("phase2", 4.0).unwrap();
        let err = c.add_cost("phase3", 2.0);
        assert!(err.is_err());
        assert_eq!(c.total_cost_usd, 11.0);
        assert_eq!(c.phase_costs["phase3"], 2.0);
    }

    #[test]
    fn add_cost_allows_exact_limit() {
        let mut c = ctx();
        c.budget_limit_usd = 10.0;
        assert!(c.add_cost("phase1", 10.0).is_ok());
    }

    #[test]
    fn mark_phase_complete_is_idempotent() {
        let mut c = ctx();
        c.mark_phase_complete("research");
        c.mark_phase_complete("research");
        assert_eq!(c.completed_phases.iter().filter(|p| *p == "research").count(), 1);
    }

    #[test]
    fn working_dir_prefers_worktree() {
        let mut c = ctx();
        assert_eq!(c.get_working_dir(), Path::new("/repo"));
        c.worktree_path = Some(PathBuf::from("/worktree"));
        assert_eq!(c.get_working_dir(), Path::new("/worktree"));
    }

    #[test]
    fn debate_session_keys_are_role_indexed() {
        let mut c = ctx();
        c.set_debate_session_id("research", "primary", 1, "sess-a", None);
        c.set_debate_session_id("research", "secondary", 1, "sess-b", None);
        assert_eq!(c.get_debate_session_id("research", "primary", 1, None).unwrap(), "sess-a");
        assert_eq!(c.get_debate_session_id("research", "secondary", 1, None).unwrap(), "sess-b");
    }

    #[test]
    fn same_agent_debate_keeps_distinct_session_ids_by_role() {
        let mut c = ctx();
        c.set_debate_session_id("research", "primary", 2, "sess-p2", Some(1));
        c.set_debate_session_id("research", "secondary", 2, "sess-s2", Some(2));
        let primary = c.get_debate_session_id("research", "primary", 2, Some(1)).unwrap();
        let secondary = c.get_debate_session_id("research", "secondary", 2, Some(2)).unwrap();
        assert_ne!(primary, secondary);
        assert!(!primary.is_empty());
        assert!(!secondary.is_empty());
    }

    #[test]
    fn synthesis_resume_prefers_latest_turn2_message() {
        let mut c = ctx();
        c.set_debate_session_id("research", "primary", 1, "t1", None);
        c.set_debate_session_id("research", "primary", 2, "t2-1", Some(1));
        c.set_debate_session_id("research", "primary", 2, "t2-3", Some(3));
        assert_eq!(c.get_synthesis_resume_session("research").unwrap(), "t2-3");
    }

    #[test]
    fn synthesis_resume_falls_back_to_turn1() {
        let mut c = ctx();
        c.set_debate_session_id("research", "primary", 1, "t1", None);
        assert_eq!(c.get_synthesis_resume_session("research").unwrap(), "t1");
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let mut c = ctx();
        c.set_artifact("plan_path", serde_json::json!("/plans/plan.md"));
        c.mark_phase_complete("research");
        c.add_cost("research", 1.5).unwrap();

        let encoded = serde_json::to_string(&c).unwrap();
        let decoded: Context = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.summary(), c.summary());
        assert_eq!(decoded.artifacts["plan_path"], serde_json::json!("/plans/plan.md"));
        assert_eq!(decoded.completed_phases, c.completed_phases);
    }
}
