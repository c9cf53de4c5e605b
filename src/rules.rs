//! Project rules and guidelines (C7 supplemental).
//!
//! Renders a configured set of builtin + custom guideline strings to
//! markdown and writes/appends them into the worktree's agent-instructions
//! file, so the agent follows them for the rest of the workflow.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub description: String,
    pub category: String,
}

impl Rule {
    fn builtin(id: &str, description: &str, category: &str) -> Self {
        Self { id: id.to_string(), description: description.to_string(), category: category.to_string() }
    }
}

fn builtin_rule(id: &str) -> Option<Rule> {
    match id {
        "no-signature" => Some(Rule::builtin(
            "no-signature",
            "Do not add Co-Authored-By, signature lines, or AI attribution to commits, PRs, or code comments",
            "commits",
        )),
        "no-emojis" => Some(Rule::builtin("no-emojis", "Do not use emojis in code, commits, or documentation", "style")),
        "no-yapping" => Some(Rule::builtin(
            "no-yapping",
            "Be concise, avoid excessive explanations or verbose output",
            "communication",
        )),
        _ => None,
    }
}

pub struct RulesManager {
    enabled_rules: Vec<String>,
    custom_rules: Vec<String>,
}

impl RulesManager {
    pub fn new(enabled_rules: Vec<String>, custom_rules: Vec<String>) -> Self {
        Self { enabled_rules, custom_rules }
    }

    pub fn get_active_rules(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.enabled_rules.iter().filter_map(|id| builtin_rule(id)).collect();
        for (i, description) in self.custom_rules.iter().enumerate() {
            rules.push(Rule {
                id: format!("custom-{}", i + 1),
                description: description.clone(),
                category: "custom".to_string(),
            });
        }
        rules
    }

    pub fn render_markdown(&self) -> String {
        let rules = self.get_active_rules();
        if rules.is_empty() {
            return String::new();
        }

        let mut lines = vec!["# Project Rules".to_string(), String::new(), "The following rules MUST be followed:".to_string(), String::new()];
        for rule in &rules {
            lines.push(format!("- {}", rule.description));
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// Writes to an existing `AGENTS.md`/`CLAUDE.md`/`agent.md` (case-insensitive,
    /// in that preference order) if one exists in the worktree, appending with a
    /// blank-line separator; otherwise creates `AGENTS.md`. Returns `None` if
    /// there are no active rules to write.
    pub fn write_to_worktree(&self, worktree_path: &Path) -> std::io::Result<Option<PathBuf>> {
        let content = self.render_markdown();
        if content.is_empty() {
            return Ok(None);
        }

        let preferred = ["agents.md", "claude.md", "agent.md"];
        let mut existing: Option<PathBuf> = None;
        if let Ok(entries) = std::fs::read_dir(worktree_path) {
            let files: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            for name in preferred {
                if let Some(found) = files.iter().find(|p| {
                    p.file_name().and_then(|n| n.to_str()).map(|n| n.to_lowercase() == name).unwrap_or(false)
                }) {
                    existing = Some(found.clone());
                    break;
                }
            }
        }

        if let Some(path) = existing {
            let existing_content = std::fs::read_to_string(&path).unwrap_or_default();
            let new_content = if existing_content.trim().is_empty() {
                content
            } else {
                format!("{}\n\n{content}", existing_content.trim_end())
            };
            std::fs::write(&path, new_content)?;
            Ok(Some(path))
        } else {
            let path = worktree_path.join("AGENTS.md");
            std::fs::write(&path, content)?;
            Ok(Some(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_builtin_ids_are_silently_dropped() {
        let manager = RulesManager::new(vec!["no-signature".into(), "nonexistent".into()], vec![]);
        assert_eq!(manager.get_active_rules().len(), 1);
    }

    #[test]
    fn empty_rules_render_to_empty_string() {
        let manager = RulesManager::new(vec![], vec![]);
        assert_eq!(manager.render_markdown(), "");
    }

    #[test]
    fn custom_rules_get_sequential_ids() {
        let manager = RulesManager::new(vec![], vec!["be nice".into(), "be terse".into()]);
        let rules = manager.get_active_rules();
        assert_eq!(rules[0].id, "custom-1");
        assert_eq!(rules[1].id, "custom-2");
    }

    #[test]
    fn write_creates_agents_md_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RulesManager::new(vec!["no-emojis".into()], vec![]);
        let path = manager.write_to_worktree(dir.path()).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "AGENTS.md");
        assert!(std::fs::read_to_string(path).unwrap().contains("Do not use emojis"));
    }

    #[test]
    fn write_appends_to_existing_claude_md() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CLAUDE.md"), "# Existing\nSome notes.\n").unwrap();
        let manager = RulesManager::new(vec!["no-signature".into()], vec![]);
        let path = manager.write_to_worktree(dir.path()).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "CLAUDE.md");
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Existing"));
        assert!(content.contains("Project Rules"));
    }

    #[test]
    fn write_with_no_active_rules_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RulesManager::new(vec![], vec![]);
        assert!(manager.write_to_worktree(dir.path()).unwrap().is_none());
    }
}
