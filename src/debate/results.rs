//! Result types for the debate engine (C8).

use std::path::{Path, PathBuf};

use crate::executor::ExecutionResult;

/// "primary" or "secondary" — never an agent kind, so the same agent kind can
/// legally fill both roles (ablation runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
        }
    }

    pub fn other(self) -> Role {
        match self {
            Role::Primary => Role::Secondary,
            Role::Secondary => Role::Primary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebateMessage {
    pub role: Role,
    pub message_number: u32,
    pub content: String,
    pub result: Option<ExecutionResult>,
}

impl DebateMessage {
    pub fn cost_usd(&self) -> f64 {
        self.result.as_ref().map(|r| r.cost_usd).unwrap_or(0.0)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.session_id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Turn1Results {
    pub primary_result: ExecutionResult,
    pub secondary_result: Option<ExecutionResult>,
    pub primary_output_file: PathBuf,
    pub secondary_output_file: Option<PathBuf>,
}

impl Turn1Results {
    pub fn total_cost(&self) -> f64 {
        self.primary_result.cost_usd
            + self.secondary_result.as_ref().map(|r| r.cost_usd).unwrap_or(0.0)
    }

    pub fn output_file_for(&self, role: Role) -> Option<&Path> {
        match role {
            Role::Primary => Some(&self.primary_output_file),
            Role::Secondary => self.secondary_output_file.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Turn2Results {
    pub messages: Vec<DebateMessage>,
    pub debate_log_path: Option<PathBuf>,
}

impl Turn2Results {
    pub fn total_cost(&self) -> f64 {
        self.messages.iter().map(|m| m.cost_usd()).sum()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn messages_by_role(&self, role: Role) -> Vec<&DebateMessage> {
        self.messages.iter().filter(|m| m.role == role).collect()
    }

    pub fn final_primary_session(&self) -> Option<&str> {
        self.messages_by_role(Role::Primary)
            .last()
            .and_then(|m| m.session_id())
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub result: ExecutionResult,
    pub output_file: PathBuf,
}

impl SynthesisResult {
    pub fn success(&self) -> bool {
        !self.result.is_error
    }

    pub fn cost_usd(&self) -> f64 {
        self.result.cost_usd
    }

    pub fn session_id(&self) -> Option<&str> {
        if self.result.session_id.is_empty() {
            None
        } else {
            Some(&self.result.session_id)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebateResult {
    pub success: bool,
    pub phase_name: String,
    pub final_output_file: PathBuf,
    pub turn1: Option<Turn1Results>,
    pub turn2: Option<Turn2Results>,
    pub synthesis: Option<SynthesisResult>,
    pub error: Option<String>,
}

impl DebateResult {
    pub fn total_cost(&self) -> f64 {
        self.turn1.as_ref().map(Turn1Results::total_cost).unwrap_or(0.0)
            + self.turn2.as_ref().map(Turn2Results::total_cost).unwrap_or(0.0)
            + self.synthesis.as_ref().map(SynthesisResult::cost_usd).unwrap_or(0.0)
    }

    /// Turn-1 primary cost, Turn-2 primary-role messages, and all of synthesis.
    pub fn primary_cost(&self) -> f64 {
        let mut cost = self
            .turn1
            .as_ref()
            .map(|t| t.primary_result.cost_usd)
            .unwrap_or(0.0);
        if let Some(t2) = &self.turn2 {
            cost += t2.messages_by_role(Role::Primary).iter().map(|m| m.cost_usd()).sum::<f64>();
        }
        cost += self.synthesis.as_ref().map(SynthesisResult::cost_usd).unwrap_or(0.0);
        cost
    }

    /// Turn-1 secondary cost and Turn-2 secondary-role messages. Synthesis is
    /// always attributed to the primary role.
    pub fn secondary_cost(&self) -> f64 {
        let mut cost = self
            .turn1
            .as_ref()
            .and_then(|t| t.secondary_result.as_ref())
            .map(|r| r.cost_usd)
            .unwrap_or(0.0);
        if let Some(t2) = &self.turn2 {
            cost += t2.messages_by_role(Role::Secondary).iter().map(|m| m.cost_usd()).sum::<f64>();
        }
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cost: f64) -> ExecutionResult {
        ExecutionResult {
            session_id: "s".into(),
            output: "o".into(),
            cost_usd: cost,
            duration_ms: 10,
            num_turns: 1,
            is_error: false,
            raw_output: String::new(),
            subagent_results: vec![],
            agent_kind: "conversational".into(),
        }
    }

    #[test]
    fn total_cost_sums_all_three_turns() {
        let debate = DebateResult {
            success: true,
            phase_name: "research".into(),
            final_output_file: PathBuf::from("out.md"),
            turn1: Some(Turn1Results {
                primary_result: result(1.0),
                secondary_result: Some(result(2.0)),
                primary_output_file: PathBuf::from("p.md"),
                secondary_output_file: Some(PathBuf::from("s.md")),
            }),
            turn2: Some(Turn2Results {
                messages: vec![
                    DebateMessage { role: Role::Primary, message_number: 1, content: String::new(), result: Some(result(0.5)) },
                    DebateMessage { role: Role::Secondary, message_number: 2, content: String::new(), result: Some(result(0.5)) },
                ],
                debate_log_path: None,
            }),
            synthesis: Some(SynthesisResult { result: result(0.25), output_file: PathBuf::from("out.md") }),
            error: None,
        };
        assert_eq!(debate.total_cost(), 4.25);
        assert_eq!(debate.primary_cost(), 1.0 + 0.5 + 0.25);
        assert_eq!(debate.secondary_cost(), 2.0 + 0.5);
    }
}
