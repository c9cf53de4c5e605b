//! Executor for the alternate coding agent CLI (Codex-style).
//!
//! No typed event schema: stdout lines are forwarded as plain-text stream
//! events. Session resume is unsupported (no session id is ever returned),
//! and cost is always reported as zero.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{now_ms, AgentExecutor, ExecutionOptions, ExecutionResult, StreamCallback};
use crate::error::{OrchestratorError, OrchestratorResult};

pub const AGENT_TYPE: &str = "alternate";

pub struct AlternateExecutor {
    pub binary: String,
    pub working_dir: PathBuf,
    pub model: Option<String>,
    pub stream_callback: Option<Arc<StreamCallback>>,
}

impl AlternateExecutor {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            binary: "codex".to_string(),
            working_dir,
            model: None,
            stream_callback: None,
        }
    }

    fn approval_mode(dangerous_mode: bool) -> &'static str {
        if dangerous_mode {
            "full-auto"
        } else {
            "suggest"
        }
    }

    fn emit(&self, line: &str) {
        if let Some(cb) = &self.stream_callback {
            let event = super::StreamEvent {
                event_kind: "text".to_string(),
                payload: serde_json::json!({"content": line}),
                timestamp_ms: now_ms(),
                source: AGENT_TYPE.to_string(),
            };
            cb(&event);
        }
    }
}

#[async_trait]
impl AgentExecutor for AlternateExecutor {
    fn agent_kind(&self) -> &str {
        AGENT_TYPE
    }

    fn build_command(&self, prompt: &str, opts: &ExecutionOptions) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if let Some(model) = &self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        args.push("--approval-mode".to_string());
        args.push(Self::approval_mode(opts.dangerous_mode).to_string());
        args.push(prompt.to_string());
        args
    }

    async fn check_available(&self) -> (bool, String) {
        match Command::new(&self.binary).arg("--version").output().await {
            Ok(output) if output.status.success() => (
                true,
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ),
            Ok(output) => (
                false,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ),
            Err(e) => (false, e.to_string()),
        }
    }

    async fn execute(&self, prompt: &str, opts: ExecutionOptions) -> OrchestratorResult<ExecutionResult> {
        let args = self.build_command(prompt, &opts);
        let working_dir = opts.working_dir.clone().unwrap_or_else(|| self.working_dir.clone());

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = std::time::Instant::now();
        let mut child = command.spawn().map_err(|e| OrchestratorError::AgentExecution {
            message: format!(
                "failed to launch '{}': {e}. Install it and ensure it is on PATH.",
                self.binary
            ),
            agent_kind: AGENT_TYPE.to_string(),
            returncode: -1,
        })?;

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");
        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let mut output_lines: Vec<String> = Vec::new();
        let mut event_count: u32 = 0;
        let io_future = async {
            loop {
                tokio::select! {
                    line = stdout_reader.next_line() => {
                        match line {
                            Ok(Some(line)) => {
                                if !line.trim().is_empty() {
                                    output_lines.push(line.clone());
                                    event_count += 1;
                                    self.emit(&line);
                                }
                            }
                            Ok(None) => break,
                            Err(_) => break,
                        }
                    }
                    line = stderr_reader.next_line() => {
                        if let Ok(Some(line)) = line {
                            tracing::debug!(target: "alternate_stderr", "{line}");
                        }
                    }
                }
            }
            while let Ok(Some(line)) = stderr_reader.next_line().await {
                tracing::debug!(target: "alternate_stderr", "{line}");
            }
        };

        let timed_out = if let Some(timeout) = opts.timeout {
            tokio::time::timeout(timeout, io_future).await.is_err()
        } else {
            io_future.await;
            false
        };

        let raw_output = output_lines.join("\n");

        if timed_out {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Ok(ExecutionResult {
                session_id: String::new(),
                output: String::new(),
                cost_usd: 0.0,
                duration_ms: start.elapsed().as_millis() as u64,
                num_turns: event_count,
                is_error: true,
                raw_output,
                subagent_results: vec![],
                agent_kind: AGENT_TYPE.to_string(),
            }
            .validate());
        }

        let status = child.wait().await?;
        let result = ExecutionResult {
            session_id: String::new(),
            output: raw_output.clone(),
            cost_usd: 0.0,
            duration_ms: start.elapsed().as_millis() as u64,
            num_turns: event_count,
            is_error: !status.success(),
            raw_output,
            subagent_results: vec![],
            agent_kind: AGENT_TYPE.to_string(),
        };
        Ok(result.validate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_uses_exec_subcommand_and_positional_prompt() {
        let executor = AlternateExecutor::new(PathBuf::from("."));
        let opts = ExecutionOptions::new();
        let args = executor.build_command("fix the bug", &opts);
        assert_eq!(args[0], "exec");
        assert_eq!(args.last().unwrap(), "fix the bug");
    }

    #[test]
    fn approval_mode_maps_dangerous_flag() {
        assert_eq!(AlternateExecutor::approval_mode(true), "full-auto");
        assert_eq!(AlternateExecutor::approval_mode(false), "suggest");
    }

    #[tokio::test]
    async fn check_available_reports_failure_for_missing_binary() {
        let executor = AlternateExecutor {
            binary: "definitely-not-a-real-binary-xyz".to_string(),
            ..AlternateExecutor::new(PathBuf::from("."))
        };
        let (available, _) = executor.check_available().await;
        assert!(!available);
    }
}
