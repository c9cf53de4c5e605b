//! Executor for the primary conversational agent CLI (Claude-Code-style).
//!
//! Streams `--output-format stream-json`, resumes sessions via `--resume`,
//! and reports per-turn USD cost through the terminal `result` event.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use super::event::parse_stream;
use super::{now_ms, AgentExecutor, ExecutionOptions, ExecutionResult, PermissionMode, StreamCallback};
use crate::error::{OrchestratorError, OrchestratorResult};

pub const AGENT_TYPE: &str = "conversational";

pub struct ConversationalExecutor {
    pub binary: String,
    pub working_dir: PathBuf,
    pub model: Option<String>,
    pub stream_callback: Option<Arc<StreamCallback>>,
}

impl ConversationalExecutor {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            binary: "claude".to_string(),
            working_dir,
            model: None,
            stream_callback: None,
        }
    }

    pub fn with_callback(mut self, callback: Arc<StreamCallback>) -> Self {
        self.stream_callback = Some(callback);
        self
    }

    fn emit(&self, event_kind: &str, payload: serde_json::Value) {
        if let Some(cb) = &self.stream_callback {
            let event = super::StreamEvent {
                event_kind: event_kind.to_string(),
                payload,
                timestamp_ms: now_ms(),
                source: AGENT_TYPE.to_string(),
            };
            // Callback panics must never bring down the executor.
            let cb = cb.clone();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(&event)));
            if result.is_err() {
                tracing::warn!("stream callback panicked; ignoring");
            }
        }
    }
}

#[async_trait]
impl AgentExecutor for ConversationalExecutor {
    fn agent_kind(&self) -> &str {
        AGENT_TYPE
    }

    fn build_command(&self, prompt: &str, opts: &ExecutionOptions) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--max-turns".to_string(),
            opts.max_turns.to_string(),
        ];
        if let Some(model) = &self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if !opts.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(opts.allowed_tools.join(","));
        }
        if opts.dangerous_mode {
            args.push("--dangerously-skip-permissions".to_string());
        } else if let Some(mode) = opts.permission_mode {
            args.push("--permission-mode".to_string());
            args.push(match mode {
                PermissionMode::Plan => "plan".to_string(),
                PermissionMode::AcceptEdits => "acceptEdits".to_string(),
            });
        }
        if let Some(session) = &opts.resume_session {
            args.push("--resume".to_string());
            args.push(session.clone());
        }
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

        let mut raw_stream = String::new();
        let io_future = async {
            loop {
                tokio::select! {
                    line = stdout_reader.next_line() => {
                        match line {
                            Ok(Some(line)) => {
                                if !line.trim().is_empty() {
                                    raw_stream.push_str(&line);
                                    raw_stream.push('\n');
                                    self.emit("assistant", serde_json::json!({"raw": line}));
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                tracing::warn!(error = %e, "error reading stdout");
                                break;
                            }
                        }
                    }
                    line = stderr_reader.next_line() => {
                        match line {
                            Ok(Some(line)) => tracing::debug!(target: "conversational_stderr", "{line}"),
                            Ok(None) => {}
                            Err(_) => {}
                        }
                    }
                }
            }
            // Drain anything left on stderr.
            while let Ok(Some(line)) = stderr_reader.next_line().await {
                tracing::debug!(target: "conversational_stderr", "{line}");
            }
        };

        let timed_out = if let Some(timeout) = opts.timeout {
            tokio::time::timeout(timeout, io_future).await.is_err()
        } else {
            io_future.await;
            false
        };

        if timed_out {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Ok(ExecutionResult {
                session_id: opts.resume_session.unwrap_or_default(),
                output: String::new(),
                cost_usd: 0.0,
                duration_ms: start.elapsed().as_millis() as u64,
                num_turns: 0,
                is_error: true,
                raw_output: raw_stream,
                subagent_results: vec![],
                agent_kind: AGENT_TYPE.to_string(),
            }
            .validate());
        }

        let status = child.wait().await?;
        let parsed = parse_stream(&raw_stream);

        let result = ExecutionResult {
            session_id: parsed.session_id.unwrap_or_default(),
            output: parsed.output,
            cost_usd: parsed.cost_usd,
            duration_ms: if parsed.duration_ms > 0 {
                parsed.duration_ms
            } else {
                start.elapsed().as_millis() as u64
            },
            num_turns: parsed.num_turns,
            is_error: if parsed.saw_result_event {
                parsed.is_error
            } else {
                !status.success()
            },
            raw_output: raw_stream,
            subagent_results: vec![],
            agent_kind: AGENT_TYPE.to_string(),
        };
        Ok(result.validate())
    }
}

/// Writes stdin data to a child process, ignoring errors (best-effort).
#[allow(dead_code)]
async fn write_stdin(child: &mut tokio::process::Child, data: &str) {
    if let Some(stdin) = child.stdin.as_mut() {
        let _ = stdin.write_all(data.as_bytes()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_includes_prompt_and_streaming_flags() {
        let executor = ConversationalExecutor::new(PathBuf::from("."));
        let opts = ExecutionOptions::new();
        let args = executor.build_command("do the thing", &opts);
        assert!(args.contains(&"-p".to_string()));
        assert!(args.contains(&"do the thing".to_string()));
        assert!(args.contains(&"stream-json".to_string()));
    }

    #[test]
    fn build_command_adds_resume_flag() {
        let executor = ConversationalExecutor::new(PathBuf::from("."));
        let opts = ExecutionOptions {
            resume_session: Some("sess-1".to_string()),
            ..ExecutionOptions::new()
        };
        let args = executor.build_command("hi", &opts);
        let idx = args.iter().position(|a| a == "--resume").unwrap();
        assert_eq!(args[idx + 1], "sess-1");
    }

    #[test]
    fn build_command_dangerous_mode_skips_permission_prompt() {
        let executor = ConversationalExecutor::new(PathBuf::from("."));
        let opts = ExecutionOptions {
            dangerous_mode: true,
            ..ExecutionOptions::new()
        };
        let args = executor.build_command("hi", &opts);
        assert!(args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[tokio::test]
    async fn check_available_reports_failure_for_missing_binary() {
        let executor = ConversationalExecutor {
            binary: "definitely-not-a-real-binary-xyz".to_string(),
            ..ConversationalExecutor::new(PathBuf::from("."))
        };
        let (available, _) = executor.check_available().await;
        assert!(!available);
    }
}
