//! Preflight checks (C7, phase 1 of 17).
//!
//! Independent checks run regardless of each other's outcome so a single
//! report lists everything wrong at once: the agent CLI is callable, `gh`
//! is authenticated, the repo is clean, the repo is not behind its remote,
//! and a git identity (user.name/user.email) can be resolved. Fails iff any
//! check fails.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::AgentExecutor;
use crate::external::GitDriver;
use crate::phase::{Phase, PhaseResult};

pub struct PreflightPhase {
    git: Arc<dyn GitDriver>,
}

impl PreflightPhase {
    pub fn new(git: Arc<dyn GitDriver>) -> Self {
        Self { git }
    }

    async fn check_gh_auth() -> Result<(), String> {
        match Command::new("gh").args(["auth", "status"]).output().await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(format!(
                "gh not authenticated: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )),
            Err(e) => Err(format!("gh CLI not available: {e}")),
        }
    }
}

#[async_trait]
impl Phase for PreflightPhase {
    fn name(&self) -> &'static str {
        "preflight"
    }

    async fn run(&self, _context: &mut Context, executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let mut failed_checks = Vec::new();

        let (agent_available, agent_detail) = executor.check_available().await;
        if !agent_available {
            failed_checks.push(format!("agent CLI unavailable: {agent_detail}"));
        }

        if let Err(e) = Self::check_gh_auth().await {
            failed_checks.push(e);
        }

        let (clean, detail) = self.git.is_clean();
        if !clean {
            failed_checks.push(format!("repo not clean: {detail}"));
        }

        if let Err(e) = self.git.ensure_identity() {
            failed_checks.push(format!("git identity unresolvable: {e}"));
        }

        if config.git.auto_update {
            let behind = self.git.commits_behind(&config.git.base_branch, "origin");
            if behind > 0 {
                failed_checks.push(format!("branch is {behind} commits behind {}", config.git.base_branch));
            }
        }

        if failed_checks.is_empty() {
            PhaseResult::ok(0.0)
        } else {
            PhaseResult::fail(failed_checks.join("; "))
        }
    }
}
