//! File-based human approval gate (C5).
//!
//! Approval for a phase is represented by the presence of a
//! `.approved_{phase}` marker file in the plans directory, so a human can
//! grant (or revoke) it with nothing more than `touch`/`rm`.

use std::path::PathBuf;
use tokio::time::{sleep, Duration, Instant};

pub struct ApprovalStore {
    plans_dir: PathBuf,
}

impl ApprovalStore {
    pub fn new(plans_dir: impl Into<PathBuf>) -> Self {
        Self {
            plans_dir: plans_dir.into(),
        }
    }

    fn approval_path(&self, phase: &str) -> PathBuf {
        self.plans_dir.join(format!(".approved_{phase}"))
    }

    pub fn is_approved(&self, phase: &str) -> bool {
        self.approval_path(phase).exists()
    }

    pub fn grant_approval(&self, phase: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.plans_dir)?;
        std::fs::write(self.approval_path(phase), b"")
    }

    pub fn revoke_approval(&self, phase: &str) -> std::io::Result<()> {
        let path = self.approval_path(phase);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// All approved phase names, derived from `.approved_*` marker files.
    pub fn list_approvals(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.plans_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter_map(|name| name.strip_prefix(".approved_").map(str::to_string))
            .collect()
    }

    /// Poll every 10 seconds until approved or `timeout_hours` elapses.
    pub async fn wait_for_approval(&self, phase: &str, timeout_hours: f64) -> bool {
        const CHECK_INTERVAL: Duration = Duration::from_secs(10);
        let deadline = Instant::now() + Duration::from_secs_f64(timeout_hours * 3600.0);

        loop {
            if self.is_approved(phase) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(CHECK_INTERVAL.min(deadline - Instant::now())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn grant_then_is_approved() {
        let dir = tempdir().unwrap();
        let store = ApprovalStore::new(dir.path());
        assert!(!store.is_approved("research"));
        store.grant_approval("research").unwrap();
        assert!(store.is_approved("research"));
    }

    #[test]
    fn revoke_removes_marker() {
        let dir = tempdir().unwrap();
        let store = ApprovalStore::new(dir.path());
        store.grant_approval("research").unwrap();
        store.revoke_approval("research").unwrap();
        assert!(!store.is_approved("research"));
    }

    #[test]
    fn revoke_unapproved_phase_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = ApprovalStore::new(dir.path());
        assert!(store.revoke_approval("research").is_ok());
    }

    #[test]
    fn list_approvals_collects_all_markers() {
        let dir = tempdir().unwrap();
        let store = ApprovalStore::new(dir.path());
        store.grant_approval("research").unwrap();
        store.grant_approval("planning").unwrap();
        let mut approvals = store.list_approvals();
        approvals.sort();
        assert_eq!(approvals, vec!["planning".to_string(), "research".to_string()]);
    }

    #[tokio::test]
    async fn wait_for_approval_returns_immediately_when_already_approved() {
        let dir = tempdir().unwrap();
        let store = ApprovalStore::new(dir.path());
        store.grant_approval("research").unwrap();
        let approved = store.wait_for_approval("research", 1.0).await;
        assert!(approved);
    }

    #[tokio::test]
    async fn wait_for_approval_times_out() {
        let dir = tempdir().unwrap();
        let store = ApprovalStore::new(dir.path());
        let approved = store.wait_for_approval("research", 0.0).await;
        assert!(!approved);
    }
}
