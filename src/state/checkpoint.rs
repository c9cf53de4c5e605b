//! Checkpoint manager (C5), built on the state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::store::StateStore;
use crate::context::Context;
use crate::error::{OrchestratorError, OrchestratorResult};

const CHECKPOINT_PREFIX: &str = "checkpoint_";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointRecord {
    id: String,
    created_at: DateTime<Utc>,
    context: Context,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub id: String,
    pub task_name: String,
    pub current_phase: String,
    pub created_at: DateTime<Utc>,
    pub cost_usd: f64,
}

pub struct CheckpointManager<'a> {
    store: &'a StateStore,
}

impl<'a> CheckpointManager<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    /// `checkpoint_` + first 8 hex chars of `SHA-256(task_slug + started_at_iso)`.
    /// Stable for a fixed `(task_slug, started_at)`.
    fn generate_checkpoint_id(context: &Context) -> String {
        let mut hasher = Sha256::new();
        hasher.update(context.task_slug.as_bytes());
        hasher.update(context.started_at.to_rfc3339().as_bytes());
        let digest = hasher.finalize();
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
        format!("{CHECKPOINT_PREFIX}{}", &hex[..8])
    }

    /// Generates or reuses the context's checkpoint id and writes it to the
    /// state store. Reusing an already-set id makes repeated `create` calls
    /// overwrite the same record in place rather than rotating the id.
    pub fn create(&self, context: &mut Context) -> OrchestratorResult<String> {
        let id = context
            .checkpoint_id
            .clone()
            .unwrap_or_else(|| Self::generate_checkpoint_id(context));
        context.checkpoint_id = Some(id.clone());

        let record = CheckpointRecord {
            id: id.clone(),
            created_at: Utc::now(),
            context: context.clone(),
        };
        self.store
            .save(&id, &record)
            .map_err(|e| OrchestratorError::CheckpointError {
                message: e.to_string(),
            })?;
        Ok(id)
    }

    pub fn load(&self, checkpoint_id: &str) -> OrchestratorResult<Context> {
        let record: CheckpointRecord =
            self.store
                .load(checkpoint_id)
                .ok_or_else(|| OrchestratorError::CheckpointError {
                    message: format!("checkpoint '{checkpoint_id}' not found or corrupt"),
                })?;
        let mut context = record.context;
        context.checkpoint_id = Some(record.id);
        context.resumed_from_checkpoint = true;
        Ok(context)
    }

    pub fn delete(&self, checkpoint_id: &str) -> bool {
        self.store.delete(checkpoint_id)
    }

    /// Summaries sorted by `created_at` descending.
    pub fn list(&self) -> Vec<CheckpointSummary> {
        let mut summaries: Vec<CheckpointSummary> = self
            .store
            .list_keys(CHECKPOINT_PREFIX)
            .into_iter()
            .filter_map(|key| {
                let record: CheckpointRecord = self.store.load(&key)?;
                Some(CheckpointSummary {
                    id: record.id,
                    task_name: record.context.task_slug,
                    current_phase: record.context.current_phase,
                    created_at: record.created_at,
                    cost_usd: record.context.total_cost_usd,
                })
            })
            .collect();
        summaries.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        summaries
    }

    /// Delete checkpoints older than `max_age_hours`, skipping any that
    /// fail to parse rather than aborting the whole sweep.
    pub fn cleanup_old(&self, max_age_hours: f64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::milliseconds((max_age_hours * 3_600_000.0) as i64);
        let mut removed = 0;
        for key in self.store.list_keys(CHECKPOINT_PREFIX) {
            let Some(record) = self.store.load::<CheckpointRecord>(&key) else {
                continue;
            };
            if record.created_at < cutoff && self.store.delete(&key) {
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn fixed_context() -> Context {
        let mut c = Context::new("test task", "test-task", PathBuf::from("/repo"), PathBuf::from("/plans"));
        c.started_at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        c
    }

    #[test]
    fn checkpoint_id_is_stable_across_creates() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let manager = CheckpointManager::new(&store);

        let mut ctx = fixed_context();
        let id1 = manager.create(&mut ctx).unwrap();
        let id2 = manager.create(&mut ctx).unwrap();
        assert_eq!(id1, id2);
        assert!(id1.starts_with("checkpoint_"));
        assert_eq!(id1.len(), "checkpoint_".len() + 8);
    }

    #[test]
    fn checkpoint_id_deterministic_for_same_task_and_timestamp() {
        let mut a = fixed_context();
        let mut b = fixed_context();
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let manager = CheckpointManager::new(&store);
        let id_a = manager.create(&mut a).unwrap();
        let id_b = manager.create(&mut b).unwrap();
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn load_sets_resumed_flag() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let manager = CheckpointManager::new(&store);
        let mut ctx = fixed_context();
        let id = manager.create(&mut ctx).unwrap();

        let loaded = manager.load(&id).unwrap();
        assert!(loaded.resumed_from_checkpoint);
        assert_eq!(loaded.task_slug, "test-task");
    }

    #[test]
    fn load_missing_checkpoint_errors() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let manager = CheckpointManager::new(&store);
        assert!(manager.load("checkpoint_ffffffff").is_err());
    }

    #[test]
    fn list_sorts_by_created_at_descending() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let manager = CheckpointManager::new(&store);

        let mut ctx1 = fixed_context();
        ctx1.task_slug = "task-one".to_string();
        manager.create(&mut ctx1).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut ctx2 = fixed_context();
        ctx2.task_slug = "task-two".to_string();
        manager.create(&mut ctx2).unwrap();

        let summaries = manager.list();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].task_name, "task-two");
    }

    #[test]
    fn cleanup_old_removes_stale_checkpoints() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let manager = CheckpointManager::new(&store);
        let mut ctx = fixed_context();
        manager.create(&mut ctx).unwrap();

        let removed = manager.cleanup_old(0.0);
        assert_eq!(removed, 1);
        assert!(manager.list().is_empty());
    }
}
