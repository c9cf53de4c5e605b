//! External collaborator contracts (ambient + C7 dependencies).
//!
//! The git driver and project-type detection are out of scope as
//! functionality (Non-goals) — they are specified here as traits with
//! minimal implementations sufficient to drive the phases that call them.
//! Failure-id extraction and net-new diffing, however, are core behavior
//! the test-execution/lint-check phases depend on exactly, so those are
//! implemented in full.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Git operations a phase may need. Real shelling-out is out of scope; the
/// stub implementation below is enough to exercise the phases in tests.
pub trait GitDriver: Send + Sync {
    fn is_clean(&self) -> (bool, String);
    fn fetch(&self, remote: &str) -> Result<(), String>;
    fn current_branch(&self, cwd: Option<&Path>) -> Result<String, String>;
    fn default_branch(&self) -> Result<String, String>;
    fn commits_behind(&self, base_branch: &str, remote: &str) -> i64;
    fn generate_branch_name(&self, task_slug: &str, prefix: &str) -> String;
    fn create_worktree(&self, branch_name: &str, worktree_dir: &Path, base_branch: &str) -> Result<PathBuf, String>;
    fn remove_worktree(&self, worktree_path: &Path, force: bool) -> Result<(), String>;
    fn rebase(&self, base: &str, cwd: Option<&Path>) -> Result<(bool, Vec<String>), String>;
    fn abort_rebase(&self, cwd: Option<&Path>);
    fn add_files(&self, files: &[String], cwd: Option<&Path>) -> Result<(), String>;
    fn commit(&self, message: &str, cwd: Option<&Path>) -> Result<String, String>;
    fn push(&self, branch: &str, cwd: Option<&Path>) -> Result<(), String>;
    fn delete_remote_branch(&self, branch: &str, remote: &str);
    fn has_remote(&self) -> bool;
    fn log(&self, count: u32, cwd: Option<&Path>) -> Vec<String>;
    fn ensure_identity(&self) -> Result<(String, String, &'static str), String>;
    fn cleanup_unreachable_remote(&self) -> bool;
}

/// No-op stand-in sufficient to drive C7 phases in tests. A real
/// implementation would shell out to `git`.
pub struct NullGitDriver {
    pub repo_path: PathBuf,
}

impl NullGitDriver {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into() }
    }

    /// Lowercase, non-word chars stripped, whitespace collapsed to hyphens,
    /// truncated to 50 chars, `{prefix}{slug}-{timestamp}`.
    fn slugify(task_slug: &str) -> String {
        static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
        static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").unwrap());
        let lower = task_slug.to_lowercase();
        let stripped = NON_WORD.replace_all(&lower, "");
        let collapsed = WHITESPACE.replace_all(&stripped, "-");
        collapsed.trim_matches('-').chars().take(50).collect()
    }
}

impl GitDriver for NullGitDriver {
    fn is_clean(&self) -> (bool, String) {
        (true, String::new())
    }

    fn fetch(&self, _remote: &str) -> Result<(), String> {
        Ok(())
    }

    fn current_branch(&self, _cwd: Option<&Path>) -> Result<String, String> {
        Ok("main".to_string())
    }

    fn default_branch(&self) -> Result<String, String> {
        Ok("main".to_string())
    }

    fn commits_behind(&self, _base_branch: &str, _remote: &str) -> i64 {
        0
    }

    fn generate_branch_name(&self, task_slug: &str, prefix: &str) -> String {
        format!("{prefix}{}", Self::slugify(task_slug))
    }

    fn create_worktree(&self, branch_name: &str, worktree_dir: &Path, _base_branch: &str) -> Result<PathBuf, String> {
        let safe_name = branch_name.replace('/', "-");
        let path = worktree_dir.join(safe_name);
        std::fs::create_dir_all(&path).map_err(|e| e.to_string())?;
        Ok(path)
    }

    fn remove_worktree(&self, worktree_path: &Path, _force: bool) -> Result<(), String> {
        if worktree_path.exists() {
            std::fs::remove_dir_all(worktree_path).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn rebase(&self, _base: &str, _cwd: Option<&Path>) -> Result<(bool, Vec<String>), String> {
        Ok((true, Vec::new()))
    }

    fn abort_rebase(&self, _cwd: Option<&Path>) {}

    fn add_files(&self, _files: &[String], _cwd: Option<&Path>) -> Result<(), String> {
        Ok(())
    }

    fn commit(&self, _message: &str, _cwd: Option<&Path>) -> Result<String, String> {
        Ok("0".repeat(40))
    }

    fn push(&self, _branch: &str, _cwd: Option<&Path>) -> Result<(), String> {
        Ok(())
    }

    fn delete_remote_branch(&self, _branch: &str, _remote: &str) {}

    fn has_remote(&self) -> bool {
        false
    }

    fn log(&self, _count: u32, _cwd: Option<&Path>) -> Vec<String> {
        Vec::new()
    }

    fn ensure_identity(&self) -> Result<(String, String, &'static str), String> {
        Ok(("selfassembler".to_string(), "selfassembler@localhost".to_string(), "default"))
    }

    fn cleanup_unreachable_remote(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestOutcome {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
    pub failures: Vec<String>,
    pub failure_ids: Vec<String>,
    pub all_passed: bool,
}

/// Sentinel id synthesized when the runner exited non-zero but no failure
/// identifiers could be parsed — makes the phase hard-fail instead of
/// spuriously passing.
pub const UNPARSEABLE_FAILURE_SENTINEL: &str = "__unparseable_failure__";

/// pytest `FAILED path::Test::test_x - Reason` and Go `--- FAIL: Name (dur)`
/// failure-id extraction. Order-preserving, de-duplicated.
pub fn extract_failure_ids(text: &str) -> Vec<String> {
    static PYTEST_FAILED: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^FAILED (\S+)").unwrap());
    static GO_FAIL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^--- FAIL: (\S+)").unwrap());

    let mut ids = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(caps) = PYTEST_FAILED.captures(line) {
            let id = caps[1].to_string();
            if !ids.contains(&id) {
                ids.push(id);
            }
        } else if let Some(caps) = GO_FAIL.captures(line) {
            let id = caps[1].to_string();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

pub fn parse_test_output(text: &str) -> TestOutcome {
    let failure_ids = extract_failure_ids(text);
    let failed = failure_ids.len() as u32;
    TestOutcome {
        passed: 0,
        failed,
        skipped: 0,
        total: failed,
        failures: failure_ids.clone(),
        all_passed: failed == 0,
        failure_ids,
    }
}

/// `current` minus `(baseline ∪ known)`. If `exit_code_failed` and `current`
/// is empty (nothing parseable), returns a single sentinel net-new entry so
/// the caller hard-fails rather than silently passing.
pub fn diff_test_failures(
    current: &[String],
    baseline: &[String],
    known: &[String],
    exit_code_failed: bool,
) -> (Vec<String>, bool) {
    if current.is_empty() && exit_code_failed {
        return (vec![UNPARSEABLE_FAILURE_SENTINEL.to_string()], false);
    }

    let excluded: std::collections::HashSet<&str> =
        baseline.iter().chain(known.iter()).map(String::as_str).collect();
    let net_new: Vec<String> = current.iter().filter(|id| !excluded.contains(id.as_str())).cloned().collect();
    let baseline_present = current.iter().any(|id| baseline.contains(id));
    (net_new, baseline_present)
}

/// Reads `{workdir}/.sa-known-failures`: one identifier per line, `#`
/// comments and blank lines ignored.
pub fn load_known_failures(workdir: &Path) -> Vec<String> {
    let path = workdir.join(".sa-known-failures");
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Rust,
    Node,
    Python,
    Go,
    Unknown,
}

/// Project-type detection and command execution. Out of scope as
/// functionality (Non-goal) beyond the contract below.
pub trait CommandDetector: Send + Sync {
    fn detect_project_kind(&self, workdir: &Path) -> ProjectKind;
    fn get_command(&self, workdir: &Path, kind: &str, command_override: Option<&str>) -> Option<String>;
    fn run_command(&self, workdir: &Path, command: &str, timeout: std::time::Duration) -> (bool, String, String);
}

/// File-marker based detection (`Cargo.toml`, `package.json`, ...) and a
/// fixed command table per project kind; real execution shells out via
/// `std::process::Command`.
pub struct DefaultCommandDetector;

impl CommandDetector for DefaultCommandDetector {
    fn detect_project_kind(&self, workdir: &Path) -> ProjectKind {
        if workdir.join("Cargo.toml").exists() {
            ProjectKind::Rust
        } else if workdir.join("package.json").exists() {
            ProjectKind::Node
        } else if workdir.join("go.mod").exists() {
            ProjectKind::Go
        } else if workdir.join("pyproject.toml").exists() || workdir.join("setup.py").exists() {
            ProjectKind::Python
        } else {
            ProjectKind::Unknown
        }
    }

    fn get_command(&self, workdir: &Path, kind: &str, command_override: Option<&str>) -> Option<String> {
        if let Some(cmd) = command_override {
            return Some(cmd.to_string());
        }
        match (self.detect_project_kind(workdir), kind) {
            (ProjectKind::Rust, "test") => Some("cargo test".to_string()),
            (ProjectKind::Rust, "lint") => Some("cargo clippy --all-targets -- -D warnings".to_string()),
            (ProjectKind::Node, "test") => Some("npm test".to_string()),
            (ProjectKind::Node, "lint") => Some("npm run lint".to_string()),
            (ProjectKind::Python, "test") => Some("pytest".to_string()),
            (ProjectKind::Python, "lint") => Some("ruff check .".to_string()),
            (ProjectKind::Go, "test") => Some("go test ./...".to_string()),
            (ProjectKind::Go, "lint") => Some("go vet ./...".to_string()),
            _ => None,
        }
    }

    fn run_command(&self, workdir: &Path, command: &str, timeout: std::time::Duration) -> (bool, String, String) {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return (false, String::new(), "empty command".to_string());
        };
        let output = std::process::Command::new(program)
            .args(parts)
            .current_dir(workdir)
            .output();
        let _ = timeout;
        match output {
            Ok(out) => (
                out.status.success(),
                String::from_utf8_lossy(&out.stdout).to_string(),
                String::from_utf8_lossy(&out.stderr).to_string(),
            ),
            Err(e) => (false, String::new(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_failure_ids_matches_pytest_and_go_formats() {
        let text = "FAILED tests/test_a.py::TestX::test_one - AssertionError\n--- FAIL: TestTwo/SubThree (0.01s)\n";
        let ids = extract_failure_ids(text);
        assert_eq!(ids, vec!["tests/test_a.py::TestX::test_one", "TestTwo/SubThree"]);
    }

    #[test]
    fn extract_failure_ids_deduplicates_preserving_order() {
        let text = "FAILED a::b\nFAILED c::d\nFAILED a::b\n";
        assert_eq!(extract_failure_ids(text), vec!["a::b", "c::d"]);
    }

    #[test]
    fn extract_failure_ids_empty_input_yields_empty_list() {
        assert!(extract_failure_ids("").is_empty());
    }

    #[test]
    fn diff_test_failures_empty_with_failed_exit_yields_sentinel() {
        let (net_new, baseline_present) = diff_test_failures(&[], &[], &[], true);
        assert_eq!(net_new, vec![UNPARSEABLE_FAILURE_SENTINEL.to_string()]);
        assert!(!baseline_present);
    }

    #[test]
    fn diff_test_failures_excludes_baseline_and_known() {
        let current = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let baseline = vec!["a".to_string()];
        let known = vec!["b".to_string()];
        let (net_new, baseline_present) = diff_test_failures(&current, &baseline, &known, true);
        assert_eq!(net_new, vec!["c".to_string()]);
        assert!(baseline_present);
    }

    #[test]
    fn known_failures_file_ignores_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".sa-known-failures"), "# comment\n\nfoo::bar\n").unwrap();
        assert_eq!(load_known_failures(dir.path()), vec!["foo::bar".to_string()]);
    }

    #[test]
    fn branch_name_generation_is_slugified_and_prefixed() {
        let driver = NullGitDriver::new(".");
        let name = driver.generate_branch_name("Fix The Thing!!", "feature/");
        assert!(name.starts_with("feature/fix-the-thing"));
    }

    #[test]
    fn rust_project_detection_picks_cargo_commands() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        let detector = DefaultCommandDetector;
        assert_eq!(detector.get_command(dir.path(), "test", None), Some("cargo test".to_string()));
    }

    #[test]
    fn command_override_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let detector = DefaultCommandDetector;
        assert_eq!(
            detector.get_command(dir.path(), "test", Some("just test")),
            Some("just test".to_string())
        );
    }
}
