//! File path conventions for debate outputs (C8).
//!
//! Paths are keyed by role ("primary"/"secondary"), never by agent kind, so
//! same-agent debates don't collide with themselves.

use std::path::PathBuf;

pub struct DebateFileManager {
    plans_dir: PathBuf,
    task_name: String,
    debates_dir: PathBuf,
}

impl DebateFileManager {
    pub fn new(plans_dir: impl Into<PathBuf>, task_name: impl Into<String>) -> Self {
        let plans_dir = plans_dir.into();
        let debates_dir = plans_dir.join("debates");
        Self {
            plans_dir,
            task_name: task_name.into(),
            debates_dir,
        }
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.plans_dir)?;
        std::fs::create_dir_all(&self.debates_dir)
    }

    /// Example: `plans/research-mytask-primary.md`.
    pub fn role_output_path(&self, phase: &str, role: &str) -> PathBuf {
        self.plans_dir.join(format!("{phase}-{}-{role}.md", self.task_name))
    }

    /// Example: `plans/debates/research-mytask-debate.md`.
    pub fn debate_path(&self, phase: &str) -> PathBuf {
        self.debates_dir.join(format!("{phase}-{}-debate.md", self.task_name))
    }

    /// Example: `plans/research-mytask.md` — matches the single-agent path so
    /// downstream phases don't need to know debate was enabled.
    pub fn final_output_path(&self, phase: &str) -> PathBuf {
        self.plans_dir.join(format!("{phase}-{}.md", self.task_name))
    }

    /// Remove intermediate role outputs and transcripts, keeping final artifacts.
    pub fn cleanup_intermediate_files(&self, phases: &[&str]) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for phase in phases {
            for role in ["primary", "secondary"] {
                let path = self.role_output_path(phase, role);
                if path.exists() && std::fs::remove_file(&path).is_ok() {
                    removed.push(path);
                }
            }
            let debate_path = self.debate_path(phase);
            if debate_path.exists() && std::fs::remove_file(&debate_path).is_ok() {
                removed.push(debate_path);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_are_role_indexed_not_agent_indexed() {
        let dir = tempdir().unwrap();
        let files = DebateFileManager::new(dir.path(), "mytask");
        let primary = files.role_output_path("research", "primary");
        let secondary = files.role_output_path("research", "secondary");
        assert_ne!(primary, secondary);
        assert!(primary.to_string_lossy().contains("research-mytask-primary.md"));
    }

    #[test]
    fn final_output_path_matches_single_agent_convention() {
        let dir = tempdir().unwrap();
        let files = DebateFileManager::new(dir.path(), "mytask");
        assert_eq!(files.final_output_path("research"), dir.path().join("research-mytask.md"));
    }

    #[test]
    fn ensure_directories_creates_debates_subdir() {
        let dir = tempdir().unwrap();
        let files = DebateFileManager::new(dir.path().join("plans"), "mytask");
        files.ensure_directories().unwrap();
        assert!(dir.path().join("plans").join("debates").is_dir());
    }

    #[test]
    fn cleanup_removes_role_outputs_and_debate_log() {
        let dir = tempdir().unwrap();
        let files = DebateFileManager::new(dir.path(), "mytask");
        files.ensure_directories().unwrap();
        std::fs::write(files.role_output_path("research", "primary"), "x").unwrap();
        std::fs::write(files.debate_path("research"), "x").unwrap();

        let removed = files.cleanup_intermediate_files(&["research"]);
        assert_eq!(removed.len(), 2);
        assert!(!files.role_output_path("research", "primary").exists());
    }
}
