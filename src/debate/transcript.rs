//! Debate transcript file (C8).

use chrono::Utc;
use std::path::{Path, PathBuf};

use super::results::{Role, Turn1Results};

pub struct DebateLog {
    path: PathBuf,
    total_messages: u32,
    primary_agent: String,
    secondary_agent: String,
}

impl DebateLog {
    pub fn new(
        path: impl Into<PathBuf>,
        total_messages: u32,
        primary_agent: impl Into<String>,
        secondary_agent: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            total_messages,
            primary_agent: primary_agent.into(),
            secondary_agent: secondary_agent.into(),
        }
    }

    pub fn write_header(&self, phase: &str, task: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let header = format!(
            "# Debate Transcript: {phase}\nTask: {task}\nDate: {}\nParticipants: {} (Primary), {} (Secondary)\n\n---\n",
            Utc::now().to_rfc3339(),
            self.primary_agent,
            self.secondary_agent,
        );
        std::fs::write(&self.path, header)
    }

    pub fn write_turn1_summary(&self, t1: &Turn1Results) -> std::io::Result<()> {
        let secondary_line = t1
            .secondary_output_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none — feedback mode)".to_string());
        let summary = format!(
            "\n## Turn 1 Outputs\n\n### {}'s Initial Analysis\n[Link to: {}]\n\n### {}'s Initial Analysis\n[Link to: {}]\n\n---\n\n## Turn 2: Debate Exchange\n\n",
            self.primary_agent,
            t1.primary_output_file.display(),
            self.secondary_agent,
            secondary_line,
        );
        self.append(&summary)
    }

    pub fn append_message(&self, role: Role, message_num: u32, content: &str) -> std::io::Result<()> {
        let speaker = match role {
            Role::Primary => &self.primary_agent,
            Role::Secondary => &self.secondary_agent,
        };
        let header = format!(
            "### [MESSAGE {message_num}/{}] {speaker} - {}",
            self.total_messages,
            Utc::now().format("%H:%M:%S"),
        );
        self.append(&format!("\n{header}\n\n{content}\n\n---\n"))
    }

    pub fn get_transcript(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_default()
    }

    pub fn write_synthesis_summary(&self, message_count: usize) -> std::io::Result<()> {
        let summary = if message_count == 0 {
            "No debate messages to summarize.\n".to_string()
        } else {
            format!(
                "**Messages Exchanged:** {message_count}\n\n**Participants:** {}, {}\n\n**Note:** Review the full debate exchange above to identify consensus points and remaining disagreements.\n",
                self.primary_agent, self.secondary_agent,
            )
        };
        self.append(&format!("\n## Synthesis Input Summary\n\n{summary}"))
    }

    fn append(&self, text: &str) -> std::io::Result<()> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(text.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionResult;
    use tempfile::tempdir;

    fn t1() -> Turn1Results {
        Turn1Results {
            primary_result: ExecutionResult {
                session_id: "s".into(),
                output: "o".into(),
                cost_usd: 0.0,
                duration_ms: 1,
                num_turns: 1,
                is_error: false,
                raw_output: String::new(),
                subagent_results: vec![],
                agent_kind: "conversational".into(),
            },
            secondary_result: None,
            primary_output_file: PathBuf::from("p.md"),
            secondary_output_file: Some(PathBuf::from("s.md")),
        }
    }

    #[test]
    fn header_and_messages_accumulate_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("debate.md");
        let log = DebateLog::new(&path, 3, "Claude", "Codex");
        log.write_header("research", "do the thing").unwrap();
        log.write_turn1_summary(&t1()).unwrap();
        log.append_message(Role::Primary, 1, "opening remarks").unwrap();
        log.append_message(Role::Secondary, 2, "counterpoint").unwrap();

        let transcript = log.get_transcript();
        assert!(transcript.contains("Debate Transcript: research"));
        assert!(transcript.contains("opening remarks"));
        assert!(transcript.contains("counterpoint"));
        assert!(transcript.contains("MESSAGE 1/3"));
    }

    #[test]
    fn synthesis_summary_reports_message_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("debate.md");
        let log = DebateLog::new(&path, 1, "Claude", "Codex");
        log.write_header("research", "task").unwrap();
        log.write_synthesis_summary(2).unwrap();
        assert!(log.get_transcript().contains("Messages Exchanged:** 2"));
    }
}
