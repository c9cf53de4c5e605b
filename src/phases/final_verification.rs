//! Final verification (C7, phase 13 of 17): one last build/test pass before
//! committing, to catch anything earlier fix-loops introduced.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::OrchestratorConfig;
use crate::context::Context;
use crate::executor::AgentExecutor;
use crate::external::CommandDetector;
use crate::phase::{Phase, PhaseResult};

pub struct FinalVerificationPhase {
    detector: Arc<dyn CommandDetector>,
}

impl FinalVerificationPhase {
    pub fn new(detector: Arc<dyn CommandDetector>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl Phase for FinalVerificationPhase {
    fn name(&self) -> &'static str {
        "final_verification"
    }

    async fn run(&self, context: &mut Context, _executor: &Arc<dyn AgentExecutor>, config: &OrchestratorConfig) -> PhaseResult {
        let workdir = context.get_working_dir().to_path_buf();
        let phase_config = config.get_phase_config(self.name());
        let timeout = Duration::from_secs(phase_config.command_timeout);

        let mut failures = Vec::new();
        if let Some(build_cmd) = self.detector.get_command(&workdir, "build", config.commands.build.as_deref()) {
            let (success, _, stderr) = self.detector.run_command(&workdir, &build_cmd, timeout);
            if !success {
                failures.push(format!("build failed: {}", stderr.trim()));
            }
        }
        if let Some(test_cmd) = self.detector.get_command(&workdir, "test", config.commands.test.as_deref()) {
            let (success, _, stderr) = self.detector.run_command(&workdir, &test_cmd, timeout);
            if !success {
                failures.push(format!("tests failed: {}", stderr.trim()));
            }
        }

        if failures.is_empty() {
            PhaseResult::ok(0.0)
        } else {
            PhaseResult::fail(failures.join("; "))
        }
    }
}
