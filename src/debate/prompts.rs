//! Prompt generation for each debate turn (C8).
//!
//! One `DebatePrompts` per phase, configured with that phase's expected
//! output structure. The exchange/synthesis prompt templates are shared
//! across phases; only Turn 1's prompts and the output structure differ.

use std::path::Path;

use super::results::{Role, Turn1Results};

pub struct DebatePrompts {
    pub phase_name: String,
    pub task_description: String,
    pub primary_agent: String,
    pub secondary_agent: String,
    output_structure: String,
}

fn display_name(agent: &str) -> String {
    match agent {
        "conversational" => "Claude".to_string(),
        "alternate" => "Codex".to_string(),
        other => {
            let mut chars = other.replace('-', " ");
            if let Some(first) = chars.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            chars
        }
    }
}

impl DebatePrompts {
    pub fn new(
        phase_name: impl Into<String>,
        task_description: impl Into<String>,
        primary_agent: &str,
        secondary_agent: &str,
    ) -> Self {
        let phase_name = phase_name.into();
        let output_structure = Self::output_structure_for(&phase_name);
        Self {
            phase_name,
            task_description: task_description.into(),
            primary_agent: display_name(primary_agent),
            secondary_agent: display_name(secondary_agent),
            output_structure,
        }
    }

    fn output_structure_for(phase_name: &str) -> String {
        match phase_name {
            "research" => "## Codebase Overview\n## Relevant Files\n## Existing Patterns\n## Risks and Constraints".to_string(),
            "planning" | "plan" => "## Implementation Steps\n## File-Level Changes\n## Test Plan\n## Rollout/Review Notes".to_string(),
            "plan_review" | "plan-review" => "## Plan Assessment\n## Gaps and Risks\n## Required Revisions".to_string(),
            "code_review" | "review" => "## Findings (ranked by severity)\n## Suggested Fixes\n## Sign-off Recommendation".to_string(),
            _ => "## Summary\n## Details\n## Recommendation".to_string(),
        }
    }

    pub fn turn1_primary_prompt(&self, output_file: &Path) -> String {
        format!(
            "# {}: Turn 1 ({})\n\nTask: {}\n\n{}\n\nWrite your independent analysis to: {}\n",
            self.phase_name,
            self.primary_agent,
            self.task_description,
            self.output_structure,
            output_file.display(),
        )
    }

    pub fn turn1_secondary_prompt(&self, output_file: &Path) -> String {
        format!(
            "# {}: Turn 1 ({})\n\nTask: {}\n\n{}\n\nWork independently — do not read the primary agent's output. Write your analysis to: {}\n",
            self.phase_name,
            self.secondary_agent,
            self.task_description,
            self.output_structure,
            output_file.display(),
        )
    }

    /// Single-message feedback prompt (`mode = "feedback"`): the secondary
    /// reviews the primary's Turn-1 output directly.
    pub fn feedback_prompt(&self, primary_output: &Path) -> String {
        format!(
            "# {}: Feedback Review ({})\n\nReview the primary agent's analysis at: {}\n\n### Points of Agreement\n### Points of Disagreement\n### Gaps You'd Add\n### Recommendation\n",
            self.phase_name,
            self.secondary_agent,
            primary_output.display(),
        )
    }

    pub fn debate_message_prompt(
        &self,
        role: Role,
        message_number: u32,
        total_messages: u32,
        transcript_so_far: &str,
        own_t1_output: &Path,
        other_t1_output: Option<&Path>,
        is_final_message: bool,
    ) -> String {
        if is_final_message {
            return self.final_message_prompt(transcript_so_far, message_number, total_messages);
        }
        match role {
            Role::Primary => self.primary_message_prompt(
                transcript_so_far,
                own_t1_output,
                other_t1_output,
                message_number,
                total_messages,
            ),
            Role::Secondary => {
                self.secondary_message_prompt(transcript_so_far, own_t1_output, message_number, total_messages)
            }
        }
    }

    fn primary_message_prompt(
        &self,
        transcript_so_far: &str,
        own_t1_output: &Path,
        other_t1_output: Option<&Path>,
        message_number: u32,
        total_messages: u32,
    ) -> String {
        let context_section = if message_number > 1 {
            format!(
                "## Previous Exchange\n{transcript_so_far}\n\n## Your Original Analysis\nReference: {}\n",
                own_t1_output.display()
            )
        } else {
            format!(
                "## Context\nYou are the PRIMARY agent ({}) in a multi-agent debate.\n\n- Your original analysis: {}\n- {}'s analysis: {}\n",
                self.primary_agent,
                own_t1_output.display(),
                self.secondary_agent,
                other_t1_output.map(|p| p.display().to_string()).unwrap_or_default(),
            )
        };

        format!(
            "# Debate: {} - Message {message_number} of {total_messages} ({})\n\n{context_section}\n## Instructions\n### Points of Agreement\n### Points of Disagreement\n### Gaps {} Identified\n### Your Revised Position\n\n---\nNOTE: This is message {message_number} of {total_messages}. {} will respond next.\n",
            self.phase_name, self.primary_agent, self.secondary_agent, self.secondary_agent,
        )
    }

    fn secondary_message_prompt(
        &self,
        transcript_so_far: &str,
        own_t1_output: &Path,
        message_number: u32,
        total_messages: u32,
    ) -> String {
        format!(
            "# Debate: {} - Message {message_number} of {total_messages} ({})\n\n## Previous Exchange\n{transcript_so_far}\n\n## Your Original Analysis\nRead: {}\n\n## Instructions\n### Addressing {}'s Disagreements\n### Additional Evidence\n### Revised Position\n\n---\nNOTE: This is message {message_number} of {total_messages}. {} will respond next.\n",
            self.phase_name,
            self.secondary_agent,
            own_t1_output.display(),
            self.primary_agent,
            self.primary_agent,
        )
    }

    fn final_message_prompt(&self, transcript_so_far: &str, message_number: u32, total_messages: u32) -> String {
        format!(
            "# Debate: {} - Message {message_number} of {total_messages} ({} - FINAL)\n\n## Full Exchange\n{transcript_so_far}\n\n## Instructions\n### Resolved Disagreements\n### Remaining Disagreements\n### Your Final Analysis\n\n---\nNOTE: This is the final debate message. Synthesis will follow.\n",
            self.phase_name, self.primary_agent,
        )
    }

    pub fn synthesis_prompt(&self, t1: &Turn1Results, debate_transcript: &str, final_output_file: &Path) -> String {
        let secondary_line = t1
            .secondary_output_file
            .as_ref()
            .map(|p| format!("2. {} original output: {}", self.secondary_agent, p.display()))
            .unwrap_or_default();
        format!(
            "# Synthesis: {} (Turn 3 of 3 - FINAL)\n\nYou are synthesizing outputs from a multi-agent debate.\n\n## Available Inputs\n1. Your original output: {}\n{}\n3. Full debate transcript (contains revised positions):\n\n{}\n\n## Synthesis Criteria (Priority Order)\n1. Correctness: verified facts over claims\n2. Evidence: claims with references preferred\n3. Completeness: include all valid findings from both agents\n4. Consensus: higher confidence for agreed points\n5. Primary preference: when equivalent, prefer your analysis\n\n## Output Structure\n{}\n\n### Synthesis Notes\nAt the end, add Agreements / Resolved Conflicts / Open Questions.\n\nWrite your final synthesized output to: {}\n",
            self.phase_name,
            t1.primary_output_file.display(),
            secondary_line,
            debate_transcript,
            self.output_structure,
            final_output_file.display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_maps_known_executor_kinds() {
        assert_eq!(display_name("conversational"), "Claude");
        assert_eq!(display_name("alternate"), "Codex");
        assert_eq!(display_name("gpt-4o"), "Gpt 4o");
    }

    #[test]
    fn turn1_prompts_reference_distinct_output_files() {
        let prompts = DebatePrompts::new("research", "do the thing", "conversational", "alternate");
        let primary = prompts.turn1_primary_prompt(Path::new("p.md"));
        let secondary = prompts.turn1_secondary_prompt(Path::new("s.md"));
        assert!(primary.contains("p.md"));
        assert!(secondary.contains("s.md"));
        assert!(secondary.contains("Work independently"));
    }

    #[test]
    fn final_message_differs_from_intermediate() {
        let prompts = DebatePrompts::new("research", "task", "conversational", "alternate");
        let intermediate = prompts.debate_message_prompt(
            Role::Primary, 1, 3, "", Path::new("p.md"), Some(Path::new("s.md")), false,
        );
        let last = prompts.debate_message_prompt(Role::Primary, 3, 3, "exchange", Path::new("p.md"), None, true);
        assert!(intermediate.contains("Points of Agreement"));
        assert!(last.contains("FINAL"));
        assert!(last.contains("Synthesis will follow"));
    }

    #[test]
    fn output_structure_varies_by_phase() {
        let research = DebatePrompts::new("research", "t", "conversational", "alternate");
        let planning = DebatePrompts::new("planning", "t", "conversational", "alternate");
        assert_ne!(research.output_structure, planning.output_structure);
    }
}
