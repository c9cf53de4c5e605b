//! Executor registry (C3).
//!
//! A process-wide mapping from agent-kind string to executor constructor.
//! Auto-detects installed agents so the caller rarely needs to pick one
//! manually.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::executor::alternate::{AlternateExecutor, AGENT_TYPE as ALTERNATE_KIND};
use crate::executor::conversational::{ConversationalExecutor, AGENT_TYPE as CONVERSATIONAL_KIND};
use crate::executor::AgentExecutor;

type Constructor = Arc<dyn Fn(PathBuf) -> Arc<dyn AgentExecutor> + Send + Sync>;

pub struct ExecutorRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ExecutorRegistry {
    /// A registry pre-populated with the two built-in executor kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };
        registry.register(CONVERSATIONAL_KIND, |dir| {
            Arc::new(ConversationalExecutor::new(dir))
        });
        registry.register(ALTERNATE_KIND, |dir| Arc::new(AlternateExecutor::new(dir)));
        registry
    }

    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, kind: &str, ctor: F)
    where
        F: Fn(PathBuf) -> Arc<dyn AgentExecutor> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.to_string(), Arc::new(ctor));
    }

    pub fn create(&self, kind: &str, working_dir: PathBuf) -> Result<Arc<dyn AgentExecutor>, String> {
        match self.constructors.get(kind) {
            Some(ctor) => Ok(ctor(working_dir)),
            None => {
                let available: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
                Err(format!(
                    "Unknown agent type: '{kind}'. Available types: {}",
                    available.join(", ")
                ))
            }
        }
    }

    pub fn known_kinds(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub async fn detect_installed(&self, nominal_dir: &std::path::Path) -> HashMap<String, bool> {
        let mut installed = HashMap::new();
        for kind in self.constructors.keys() {
            let executor = self.create(kind, nominal_dir.to_path_buf()).expect("known kind");
            let (available, _) = executor.check_available().await;
            installed.insert(kind.clone(), available);
        }
        installed
    }

    /// Returns `(primary, secondary_or_none, debate_enabled)`.
    ///
    /// Debate is enabled only when exactly two distinct kinds are installed.
    /// The conversational agent is preferred as primary when both are
    /// available.
    pub async fn auto_configure_agents(&self, nominal_dir: &std::path::Path) -> (String, Option<String>, bool) {
        let installed = self.detect_installed(nominal_dir).await;
        let conversational_available = installed.get(CONVERSATIONAL_KIND).copied().unwrap_or(false);
        let alternate_available = installed.get(ALTERNATE_KIND).copied().unwrap_or(false);

        if conversational_available && alternate_available {
            (
                CONVERSATIONAL_KIND.to_string(),
                Some(ALTERNATE_KIND.to_string()),
                true,
            )
        } else if conversational_available {
            (CONVERSATIONAL_KIND.to_string(), None, false)
        } else if alternate_available {
            (ALTERNATE_KIND.to_string(), None, false)
        } else {
            (CONVERSATIONAL_KIND.to_string(), None, false)
        }
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_both_known_kinds() {
        let registry = ExecutorRegistry::with_defaults();
        let kinds = registry.known_kinds();
        assert!(kinds.contains(&CONVERSATIONAL_KIND.to_string()));
        assert!(kinds.contains(&ALTERNATE_KIND.to_string()));
    }

    #[test]
    fn create_unknown_kind_fails_with_available_list() {
        let registry = ExecutorRegistry::with_defaults();
        let err = match registry.create("nonexistent", PathBuf::from(".")) {
            Err(e) => e,
            Ok(_) => panic!("expected unknown kind to fail"),
        };
        assert!(err.contains("Unknown agent type"));
        assert!(err.contains("Available types"));
    }

    #[test]
    fn create_known_kind_succeeds() {
        let registry = ExecutorRegistry::with_defaults();
        let executor = registry.create(CONVERSATIONAL_KIND, PathBuf::from(".")).unwrap();
        assert_eq!(executor.agent_kind(), CONVERSATIONAL_KIND);
    }

    #[tokio::test]
    async fn auto_configure_falls_back_to_conversational_when_nothing_installed() {
        let registry = ExecutorRegistry::with_defaults();
        let (primary, secondary, debate) = registry.auto_configure_agents(&PathBuf::from(".")).await;
        assert_eq!(primary, CONVERSATIONAL_KIND);
        assert_eq!(secondary, None);
        assert!(!debate);
    }

    #[test]
    fn register_overrides_existing_kind() {
        let mut registry = ExecutorRegistry::empty();
        registry.register("conversational", |dir| Arc::new(ConversationalExecutor::new(dir)));
        assert_eq!(registry.known_kinds().len(), 1);
        registry.register("conversational", |dir| Arc::new(ConversationalExecutor::new(dir)));
        assert_eq!(registry.known_kinds().len(), 1);
    }
}
