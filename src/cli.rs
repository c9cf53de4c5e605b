//! CLI front-end (ambient; thin and contract-only).
//!
//! Parses arguments and builds an [`Orchestrator`]; performs none of the
//! orchestration logic itself.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::config::{OrchestratorConfig, PHASE_ORDER};
use crate::context::Context;
use crate::executor::AgentExecutor;
use crate::external::{CommandDetector, DefaultCommandDetector, GitDriver, NullGitDriver};
use crate::notify::ConsoleNotifier;
use crate::orchestrator::Orchestrator;
use crate::phases::build_pipeline;
use crate::registry::ExecutorRegistry;
use crate::state::{ApprovalStore, CheckpointManager, StateStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Self-assembling agent workflow orchestrator", long_about = None)]
pub struct Cli {
    /// Description of the task to implement
    pub task_description: Option<String>,

    /// Path to a TOML config file (overrides the default search path)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List saved checkpoints and exit
    #[arg(long)]
    pub list_checkpoints: bool,

    /// List the pipeline phases in order and exit
    #[arg(long)]
    pub list_phases: bool,

    /// Write a default config file and exit
    #[arg(long)]
    pub init_config: bool,

    /// Grant approval for a gated phase and exit
    #[arg(long, value_name = "PHASE")]
    pub approve: Option<String>,

    /// Resume from a checkpoint id instead of starting fresh
    #[arg(long)]
    pub resume: Option<String>,

    /// Validate configuration and print the plan without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Describe each phase's timeout/turns/cost and exit
    #[arg(long)]
    pub help_phases: bool,
}

pub enum CliOutcome {
    Handled,
    Resume { checkpoint_id: String, config: Box<OrchestratorConfig> },
    Run { context: Context, config: Box<OrchestratorConfig> },
}

impl Cli {
    /// Handles the utility flags that exit immediately; otherwise returns
    /// what to run the workflow with.
    pub fn dispatch(self) -> anyhow::Result<CliOutcome> {
        let config = OrchestratorConfig::load(self.config.as_deref()).map_err(anyhow::Error::msg)?;

        if self.list_phases || self.help_phases {
            for name in PHASE_ORDER {
                if self.help_phases {
                    let phase_config = config.get_phase_config(name);
                    println!(
                        "{name}: timeout={}s max_turns={} est=${:.2}",
                        phase_config.timeout, phase_config.max_turns, phase_config.estimated_cost
                    );
                } else {
                    println!("{name}");
                }
            }
            return Ok(CliOutcome::Handled);
        }

        if self.init_config {
            let path = PathBuf::from("selfassembler.toml");
            config.save(&path).map_err(anyhow::Error::msg)?;
            println!("wrote default config to {}", path.display());
            return Ok(CliOutcome::Handled);
        }

        if self.list_checkpoints {
            let store = StateStore::with_default_dir();
            let manager = CheckpointManager::new(&store);
            for summary in manager.list() {
                println!(
                    "{}  {}  phase={}  cost=${:.2}",
                    summary.id, summary.task_name, summary.current_phase, summary.cost_usd
                );
            }
            return Ok(CliOutcome::Handled);
        }

        if let Some(phase) = self.approve {
            let approvals = ApprovalStore::new(PathBuf::from(&config.plans_dir));
            approvals.grant_approval(&phase)?;
            println!("approved phase '{phase}'");
            return Ok(CliOutcome::Handled);
        }

        if let Some(checkpoint_id) = self.resume {
            return Ok(CliOutcome::Resume { checkpoint_id, config: Box::new(config) });
        }

        let Some(task_description) = self.task_description else {
            anyhow::bail!("a task description is required unless a utility flag is given");
        };

        let repo_path = std::env::current_dir()?;
        let plans_dir = PathBuf::from(&config.plans_dir);
        let task_slug = slugify_task(&task_description);
        let context = Context::new(task_description, task_slug, repo_path, plans_dir);
        Ok(CliOutcome::Run { context, config: Box::new(config) })
    }
}

fn slugify_task(description: &str) -> String {
    description
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(50)
        .collect()
}

/// Wires up the concrete collaborators (git driver, command detector, agent
/// registry) and constructs an [`Orchestrator`] ready to run.
pub fn build_orchestrator(config: OrchestratorConfig) -> anyhow::Result<Orchestrator> {
    let repo_path = std::env::current_dir()?;
    let git: Arc<dyn GitDriver> = Arc::new(NullGitDriver::new(repo_path.clone()));
    let detector: Arc<dyn CommandDetector> = Arc::new(DefaultCommandDetector);
    let executor_registry = Arc::new(ExecutorRegistry::with_defaults());
    let pipeline = build_pipeline(git.clone(), detector, executor_registry.clone());
    let primary: Arc<dyn AgentExecutor> = executor_registry
        .create(&config.agent.kind, repo_path)
        .map_err(anyhow::Error::msg)?;
    let notifier = Arc::new(ConsoleNotifier::new(config.notifications.console.colors));
    Orchestrator::new(config, pipeline, primary, executor_registry, git, notifier).map_err(anyhow::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation_and_case() {
        assert_eq!(slugify_task("Fix the Login Bug!!"), "fix-the-login-bug");
    }

    #[test]
    fn list_phases_parses_without_a_task_description() {
        let cli = Cli::try_parse_from(["selfassembler", "--list-phases"]).unwrap();
        assert!(cli.list_phases);
        assert!(cli.task_description.is_none());
    }
}
