//! Concrete phase implementations (C7), in `PHASE_ORDER`.

pub mod code_review;
pub mod commit_prep;
pub mod conflict_check;
pub mod documentation;
pub mod final_verification;
pub mod fix_review_issues;
pub mod implementation;
pub mod lint_check;
pub mod plan_review;
pub mod planning;
pub mod pr_creation;
pub mod pr_self_review;
pub mod preflight;
pub mod research;
pub mod setup;
pub mod support;
pub mod test_execution;
pub mod test_writing;

use std::sync::Arc;

use crate::external::{CommandDetector, GitDriver};
use crate::phase::Phase;
use crate::registry::ExecutorRegistry;

/// Builds the 17-phase pipeline in exactly [`crate::config::PHASE_ORDER`].
pub fn build_pipeline(
    git: Arc<dyn GitDriver>,
    detector: Arc<dyn CommandDetector>,
    registry: Arc<ExecutorRegistry>,
) -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(preflight::PreflightPhase::new(git.clone())),
        Box::new(setup::SetupPhase::new(git.clone())),
        Box::new(research::ResearchPhase::new(registry.clone())),
        Box::new(planning::PlanningPhase::new(registry.clone())),
        Box::new(plan_review::PlanReviewPhase::new(registry.clone())),
        Box::new(implementation::ImplementationPhase),
        Box::new(test_writing::TestWritingPhase),
        Box::new(test_execution::TestExecutionPhase::new(detector.clone())),
        Box::new(code_review::CodeReviewPhase::new(registry.clone())),
        Box::new(fix_review_issues::FixReviewIssuesPhase),
        Box::new(lint_check::LintCheckPhase::new(detector.clone())),
        Box::new(documentation::DocumentationPhase),
        Box::new(final_verification::FinalVerificationPhase::new(detector)),
        Box::new(commit_prep::CommitPrepPhase::new(git.clone())),
        Box::new(conflict_check::ConflictCheckPhase::new(git.clone())),
        Box::new(pr_creation::PrCreationPhase::new(git)),
        Box::new(pr_self_review::PrSelfReviewPhase),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PHASE_ORDER;
    use crate::external::{DefaultCommandDetector, NullGitDriver};

    #[test]
    fn pipeline_matches_phase_order_exactly() {
        let git = Arc::new(NullGitDriver::new("."));
        let detector = Arc::new(DefaultCommandDetector);
        let registry = Arc::new(ExecutorRegistry::with_defaults());
        let pipeline = build_pipeline(git, detector, registry);
        let names: Vec<&str> = pipeline.iter().map(|p| p.name()).collect();
        assert_eq!(names, PHASE_ORDER.to_vec());
    }
}
