//! Worktree setup (C7, phase 2 of 17).
//!
//! Generates the branch name, creates the worktree, copies local-only config
//! files into it (`.env`, `.claude/*`, ...), and points the context at the
//! new working directory for every subsequent phase.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::AgentExecutor;
use crate::external::GitDriver;
use crate::phase::{Phase, PhaseResult};

pub struct SetupPhase {
    git: Arc<dyn GitDriver>,
}

impl SetupPhase {
    pub fn new(git: Arc<dyn GitDriver>) -> Self {
        Self { git }
    }

    fn copy_config_files(repo_path: &Path, worktree_path: &Path, patterns: &[String]) -> Vec<String> {
        let mut copied = Vec::new();
        for pattern in patterns {
            if let Some(dir) = pattern.strip_suffix("/*") {
                let src_dir = repo_path.join(dir);
                let Ok(entries) = std::fs::read_dir(&src_dir) else { continue };
                for entry in entries.filter_map(|e| e.ok()) {
                    let src = entry.path();
                    if !src.is_file() {
                        continue;
                    }
                    let dest_dir = worktree_path.join(dir);
                    if std::fs::create_dir_all(&dest_dir).is_ok() {
                        let dest = dest_dir.join(entry.file_name());
                        if std::fs::copy(&src, &dest).is_ok() {
                            copied.push(dest.display().to_string());
                        }
                    }
                }
            } else {
                let src = repo_path.join(pattern);
                if src.is_file() {
                    let dest = worktree_path.join(pattern);
                    if let Some(parent) = dest.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    if std::fs::copy(&src, &dest).is_ok() {
                        copied.push(dest.display().to_string());
                    }
                }
            }
        }
        copied
    }
}

#[async_trait]
impl Phase for SetupPhase {
    fn name(&self) -> &'static str {
        "setup"
    }

    async fn run(&self, context: &mut Context, _executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let branch_name = self.git.generate_branch_name(&context.task_slug, &config.git.branch_prefix);

        let worktree_dir = PathBuf::from(&config.git.worktree_dir);
        let worktree_dir = if worktree_dir.is_absolute() {
            worktree_dir
        } else {
            context.repo_path.join(worktree_dir)
        };

        let worktree_path = match self.git.create_worktree(&branch_name, &worktree_dir, &config.git.base_branch) {
            Ok(path) => path,
            Err(e) => return PhaseResult::fail(format!("failed to create worktree: {e}")),
        };

        let copied = Self::copy_config_files(&context.repo_path, &worktree_path, &config.copy_files);

        context.worktree_path = Some(worktree_path.clone());
        context.branch_name = Some(branch_name.clone());

        let mut artifacts = std::collections::HashMap::new();
        artifacts.insert("branch_name".to_string(), serde_json::json!(branch_name));
        artifacts.insert("worktree_path".to_string(), serde_json::json!(worktree_path.display().to_string()));
        artifacts.insert("copied_files".to_string(), serde_json::json!(copied));
        PhaseResult::ok_with_artifacts(0.0, artifacts)
    }
}
