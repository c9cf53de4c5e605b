//! Workflow configuration (ambient; supplements C9).
//!
//! Loaded from `selfassembler.toml` (or a path given on the CLI), falling
//! back entirely to defaults when no file is found. Every field has a
//! default so `OrchestratorConfig::default()` is always a valid config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::debate::{DebateConfig as RuntimeDebateConfig, DebateMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub default_timeout: u64,
    pub max_turns_default: u32,
    pub dangerous_mode: bool,
    pub model: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kind: "conversational".to_string(),
            default_timeout: 600,
            max_turns_default: 50,
            dangerous_mode: false,
            model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub base_branch: String,
    pub worktree_dir: String,
    pub branch_prefix: String,
    pub cleanup_on_fail: bool,
    pub cleanup_remote_on_fail: bool,
    pub auto_update: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            base_branch: "main".to_string(),
            worktree_dir: "../.worktrees".to_string(),
            branch_prefix: "feature/".to_string(),
            cleanup_on_fail: false,
            cleanup_remote_on_fail: false,
            auto_update: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub timeout: u64,
    pub max_turns: u32,
    pub max_iterations: u32,
    pub max_retries: u32,
    pub estimated_cost: f64,
    pub enabled: bool,
    pub baseline_enabled: bool,
    pub command_timeout: u64,
    pub soft_fail: bool,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            timeout: 600,
            max_turns: 50,
            max_iterations: 5,
            max_retries: 0,
            estimated_cost: 1.0,
            enabled: true,
            baseline_enabled: true,
            command_timeout: 300,
            soft_fail: false,
        }
    }
}

impl PhaseConfig {
    fn new(timeout: u64, max_turns: u32, estimated_cost: f64) -> Self {
        Self {
            timeout,
            max_turns,
            estimated_cost,
            ..Default::default()
        }
    }
}

pub const PHASE_ORDER: [&str; 17] = [
    "preflight",
    "setup",
    "research",
    "planning",
    "plan_review",
    "implementation",
    "test_writing",
    "test_execution",
    "code_review",
    "fix_review_issues",
    "lint_check",
    "documentation",
    "final_verification",
    "commit_prep",
    "conflict_check",
    "pr_creation",
    "pr_self_review",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasesConfig {
    pub phases: HashMap<String, PhaseConfig>,
}

impl Default for PhasesConfig {
    fn default() -> Self {
        let defaults: [(&str, PhaseConfig); 17] = [
            ("preflight", PhaseConfig::new(60, 1, 0.0)),
            ("setup", PhaseConfig::new(120, 1, 0.0)),
            ("research", PhaseConfig::new(300, 25, 0.5)),
            ("planning", PhaseConfig::new(600, 20, 1.0)),
            ("plan_review", PhaseConfig::new(600, 30, 1.0)),
            ("implementation", PhaseConfig::new(3600, 100, 3.0)),
            ("test_writing", PhaseConfig::new(1200, 50, 1.5)),
            ("test_execution", PhaseConfig::new(1800, 60, 2.0)),
            ("code_review", PhaseConfig::new(600, 30, 1.0)),
            ("fix_review_issues", PhaseConfig::new(900, 40, 1.0)),
            ("lint_check", PhaseConfig { max_retries: 3, ..PhaseConfig::new(300, 20, 0.5) }),
            ("documentation", PhaseConfig::new(600, 30, 0.5)),
            ("final_verification", PhaseConfig::new(300, 15, 0.5)),
            ("commit_prep", PhaseConfig::new(300, 10, 0.3)),
            ("conflict_check", PhaseConfig::new(300, 20, 0.5)),
            ("pr_creation", PhaseConfig::new(300, 15, 0.3)),
            ("pr_self_review", PhaseConfig::new(600, 20, 0.5)),
        ];
        Self {
            phases: defaults.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

impl PhasesConfig {
    pub fn get(&self, phase_name: &str) -> PhaseConfig {
        self.phases.get(phase_name).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalGatesConfig {
    pub planning: bool,
    pub plan_review: bool,
    pub implementation: bool,
    pub pr_creation: bool,
}

impl Default for ApprovalGatesConfig {
    fn default() -> Self {
        Self {
            planning: true,
            plan_review: false,
            implementation: false,
            pr_creation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalsConfig {
    pub enabled: bool,
    pub timeout_hours: f64,
    pub gates: ApprovalGatesConfig,
}

impl Default for ApprovalsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_hours: 24.0,
            gates: ApprovalGatesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    AgentErrors,
    AllErrors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub fallback_agent: Option<String>,
    pub max_fallback_attempts: u32,
    pub trigger: FallbackTrigger,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            fallback_agent: None,
            max_fallback_attempts: 2,
            trigger: FallbackTrigger::AgentErrors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleNotificationConfig {
    pub enabled: bool,
    pub colors: bool,
}

impl Default for ConsoleNotificationConfig {
    fn default() -> Self {
        Self { enabled: true, colors: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookNotificationConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub events: Vec<String>,
}

impl Default for WebhookNotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            events: vec!["workflow_complete".into(), "workflow_failed".into(), "approval_needed".into()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub console: ConsoleNotificationConfig,
    pub webhook: WebhookNotificationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub lint: Option<String>,
    pub typecheck: Option<String>,
    pub test: Option<String>,
    pub build: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub enabled: bool,
    pub verbose: bool,
    pub debug: Option<String>,
    pub show_tool_calls: bool,
    pub truncate_length: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verbose: true,
            debug: None,
            show_tool_calls: true,
            truncate_length: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub enabled_rules: Vec<String>,
    pub custom_rules: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled_rules: vec!["no-signature".to_string()],
            custom_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebatePhasesConfig {
    pub research: bool,
    pub planning: bool,
    pub plan_review: bool,
    pub code_review: bool,
}

impl Default for DebatePhasesConfig {
    fn default() -> Self {
        Self {
            research: true,
            planning: true,
            plan_review: true,
            code_review: true,
        }
    }
}

impl DebatePhasesConfig {
    pub fn enabled_for(&self, phase_name: &str) -> bool {
        match phase_name {
            "research" => self.research,
            "planning" => self.planning,
            "plan_review" => self.plan_review,
            "code_review" => self.code_review,
            _ => false,
        }
    }
}

/// On-disk debate configuration. Resolved into the runtime
/// [`crate::debate::DebateConfig`] via [`DebateSettings::to_runtime`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    pub enabled: bool,
    pub primary_agent: String,
    pub secondary_agent: String,
    pub phases: DebatePhasesConfig,
    pub mode: String,
    pub intensity: String,
    pub parallel_turn_1: bool,
    pub turn_timeout_seconds: u64,
    pub message_timeout_seconds: u64,
    pub keep_intermediate_files: bool,
    pub debate_subdir: String,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            primary_agent: "conversational".to_string(),
            secondary_agent: "alternate".to_string(),
            phases: DebatePhasesConfig::default(),
            mode: "feedback".to_string(),
            intensity: "low".to_string(),
            parallel_turn_1: true,
            turn_timeout_seconds: 300,
            message_timeout_seconds: 180,
            keep_intermediate_files: true,
            debate_subdir: "debates".to_string(),
        }
    }
}

impl DebateSettings {
    /// `mode` must be "feedback"/"debate", `intensity` must be "low"/"high".
    pub fn validate(&self) -> Result<(), String> {
        if self.mode != "feedback" && self.mode != "debate" {
            return Err(format!("debate.mode must be 'feedback' or 'debate' (got '{}')", self.mode));
        }
        if self.intensity != "low" && self.intensity != "high" {
            return Err(format!("debate.intensity must be 'low' or 'high' (got '{}')", self.intensity));
        }
        Ok(())
    }

    pub fn to_runtime(&self) -> RuntimeDebateConfig {
        let mode = if self.mode == "feedback" { DebateMode::Feedback } else { DebateMode::Debate };
        let mut runtime = RuntimeDebateConfig::for_intensity(mode, self.intensity == "high");
        runtime.parallel_turn_1 = self.parallel_turn_1;
        runtime.turn_timeout_seconds = self.turn_timeout_seconds;
        runtime.message_timeout_seconds = self.message_timeout_seconds;
        if mode == DebateMode::Feedback {
            runtime.max_exchange_messages = 1;
        }
        runtime
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub budget_limit_usd: f64,
    pub autonomous_mode: bool,
    pub plans_dir: String,
    pub agent: AgentConfig,
    pub git: GitConfig,
    pub phases: PhasesConfig,
    pub approvals: ApprovalsConfig,
    pub fallback: FallbackConfig,
    pub notifications: NotificationsConfig,
    pub commands: CommandsConfig,
    pub streaming: StreamingConfig,
    pub rules: RulesConfig,
    pub debate: DebateSettings,
    pub copy_files: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            budget_limit_usd: 15.0,
            autonomous_mode: false,
            plans_dir: "./plans".to_string(),
            agent: AgentConfig::default(),
            git: GitConfig::default(),
            phases: PhasesConfig::default(),
            approvals: ApprovalsConfig::default(),
            fallback: FallbackConfig::default(),
            notifications: NotificationsConfig::default(),
            commands: CommandsConfig::default(),
            streaming: StreamingConfig::default(),
            rules: RulesConfig::default(),
            debate: DebateSettings::default(),
            copy_files: vec![".env".into(), ".env.local".into(), ".claude/*".into()],
        }
    }
}

impl OrchestratorConfig {
    const SEARCH_PATHS: [&'static str; 4] = [
        "selfassembler.toml",
        ".selfassembler.toml",
        "selfassembler.yaml",
        "selfassembler.yml",
    ];

    /// Loads from `config_path` if given, else the first existing file among
    /// the standard search locations, else defaults. `.yaml`/`.yml` files are
    /// rejected with a migration hint — only TOML is supported.
    pub fn load(config_path: Option<&Path>) -> Result<Self, String> {
        let resolved = match config_path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::SEARCH_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        let Some(path) = resolved.filter(|p| p.exists()) else {
            return Ok(Self::default());
        };

        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            return Err(format!(
                "unsupported config format for '{}': only .toml is supported",
                path.display()
            ));
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
        let config: Self = toml::from_str(&contents).map_err(|e| e.to_string())?;
        config.debate.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let text = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, text).map_err(|e| e.to_string())
    }

    pub fn get_phase_config(&self, phase_name: &str) -> PhaseConfig {
        self.phases.get(&phase_name.replace('-', "_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.budget_limit_usd, 15.0);
        assert!(config.debate.validate().is_ok());
    }

    #[test]
    fn phase_order_matches_configured_phases() {
        let config = OrchestratorConfig::default();
        for phase in PHASE_ORDER {
            assert!(config.phases.phases.contains_key(phase), "missing phase config for {phase}");
        }
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let mut config = OrchestratorConfig::default();
        config.budget_limit_usd = 42.0;
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: OrchestratorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.budget_limit_usd, 42.0);
    }

    #[test]
    fn invalid_debate_mode_fails_validation() {
        let mut settings = DebateSettings::default();
        settings.mode = "bogus".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn debate_settings_to_runtime_respects_feedback_mode() {
        let settings = DebateSettings { mode: "feedback".to_string(), ..DebateSettings::default() };
        let runtime = settings.to_runtime();
        assert_eq!(runtime.max_exchange_messages, 1);
    }

    #[test]
    fn fallback_defaults_to_agent_errors_trigger() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.fallback.trigger, FallbackTrigger::AgentErrors);
        assert_eq!(config.fallback.max_fallback_attempts, 2);
    }

    #[test]
    fn load_missing_config_returns_default() {
        let result = OrchestratorConfig::load(Some(Path::new("/nonexistent/selfassembler.toml")));
        assert!(result.is_ok());
    }
}
