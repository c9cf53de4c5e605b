//! Notification fan-out (ambient, contract-only).
//!
//! A `Notifier` trait covers every workflow event name; only a
//! `tracing`-backed console sink is implemented. Webhook/Slack back-ends are
//! out of scope — wiring them in means implementing the trait.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Every event name the orchestrator is specified to raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    WorkflowStarted,
    PhaseStarted,
    PhaseComplete,
    PhaseFailed,
    PhaseRetry,
    ApprovalNeeded,
    WorkflowComplete,
    WorkflowFailed,
    BudgetWarning,
    CheckpointCreated,
    StreamEvent,
}

impl WorkflowEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkflowStarted => "workflow_started",
            Self::PhaseStarted => "phase_started",
            Self::PhaseComplete => "phase_complete",
            Self::PhaseFailed => "phase_failed",
            Self::PhaseRetry => "phase_retry",
            Self::ApprovalNeeded => "approval_needed",
            Self::WorkflowComplete => "workflow_complete",
            Self::WorkflowFailed => "workflow_failed",
            Self::BudgetWarning => "budget_warning",
            Self::CheckpointCreated => "checkpoint_created",
            Self::StreamEvent => "stream_event",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: WorkflowEvent, level: NotificationLevel, message: &str, data: Option<&Value>);
}

/// Shields the orchestrator from a notifier panicking or blocking — logs the
/// send and swallows anything else. Notification failures never fail the workflow.
pub fn notify_shielded(notifier: &dyn Notifier, event: WorkflowEvent, level: NotificationLevel, message: &str, data: Option<&Value>) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        notifier.notify(event, level, message, data);
    }));
    if result.is_err() {
        tracing::warn!(event = event.as_str(), "notifier panicked; suppressing");
    }
}

/// `tracing`-based console sink.
pub struct ConsoleNotifier {
    pub colors: bool,
}

impl ConsoleNotifier {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, event: WorkflowEvent, level: NotificationLevel, message: &str, data: Option<&Value>) {
        let _ = self.colors;
        match level {
            NotificationLevel::Info => tracing::info!(event = event.as_str(), ?data, "{message}"),
            NotificationLevel::Success => tracing::info!(event = event.as_str(), ?data, "✓ {message}"),
            NotificationLevel::Warning => tracing::warn!(event = event.as_str(), ?data, "{message}"),
            NotificationLevel::Error => tracing::error!(event = event.as_str(), ?data, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanicNotifier;
    impl Notifier for PanicNotifier {
        fn notify(&self, _event: WorkflowEvent, _level: NotificationLevel, _message: &str, _data: Option<&Value>) {
            panic!("boom");
        }
    }

    #[test]
    fn shielded_notify_survives_a_panicking_notifier() {
        let notifier = PanicNotifier;
        notify_shielded(&notifier, WorkflowEvent::PhaseFailed, NotificationLevel::Error, "oops", None);
    }

    #[test]
    fn console_notifier_does_not_panic() {
        let notifier = ConsoleNotifier::default();
        notifier.notify(WorkflowEvent::WorkflowStarted, NotificationLevel::Info, "starting", None);
    }

    #[test]
    fn event_names_match_contract() {
        assert_eq!(WorkflowEvent::BudgetWarning.as_str(), "budget_warning");
        assert_eq!(WorkflowEvent::CheckpointCreated.as_str(), "checkpoint_created");
    }
}
