//! Multi-agent debate engine (C8).
//!
//! Orchestrates a three-turn deliberation between a primary and secondary
//! executor within a single phase: independent generation, an alternating
//! critique exchange, and a primary-authored synthesis.

use std::path::PathBuf;
use std::sync::Arc;

use crate::context::Context;
use crate::executor::{AgentExecutor, ExecutionOptions, ExecutionResult, PermissionMode};

use super::files::DebateFileManager;
use super::prompts::DebatePrompts;
use super::results::{DebateMessage, DebateResult, Role, SynthesisResult, Turn1Results, Turn2Results};
use super::transcript::DebateLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateMode {
    Feedback,
    Debate,
}

#[derive(Debug, Clone)]
pub struct DebateConfig {
    pub mode: DebateMode,
    pub parallel_turn_1: bool,
    pub max_exchange_messages: u32,
    pub turn_timeout_seconds: u64,
    pub message_timeout_seconds: u64,
}

impl DebateConfig {
    /// `intensity = "low"` maps to a 3-message exchange, `"high"` to 5.
    pub fn for_intensity(mode: DebateMode, intensity_high: bool) -> Self {
        Self {
            mode,
            parallel_turn_1: true,
            max_exchange_messages: if intensity_high { 5 } else { 3 },
            turn_timeout_seconds: 1800,
            message_timeout_seconds: 900,
        }
    }
}

pub struct DebateOrchestrator {
    primary: Arc<dyn AgentExecutor>,
    secondary: Arc<dyn AgentExecutor>,
    primary_kind: String,
    secondary_kind: String,
    config: DebateConfig,
    files: DebateFileManager,
    max_turns: u32,
}

impl DebateOrchestrator {
    pub fn new(
        primary: Arc<dyn AgentExecutor>,
        secondary: Arc<dyn AgentExecutor>,
        config: DebateConfig,
        files: DebateFileManager,
    ) -> Self {
        let primary_kind = primary.agent_kind().to_string();
        let secondary_kind = secondary.agent_kind().to_string();
        Self {
            primary,
            secondary,
            primary_kind,
            secondary_kind,
            config,
            files,
            max_turns: 50,
        }
    }

    fn same_agent(&self) -> bool {
        self.primary_kind == self.secondary_kind
    }

    fn secondary_dangerous_mode(&self, dangerous_mode: bool) -> bool {
        if self.same_agent() {
            dangerous_mode
        } else {
            true
        }
    }

    pub async fn run_debate(
        &mut self,
        context: &mut Context,
        phase_name: &str,
        prompts: &DebatePrompts,
        permission_mode: Option<PermissionMode>,
        allowed_tools: Vec<String>,
        dangerous_mode: bool,
        max_turns: u32,
    ) -> DebateResult {
        self.max_turns = max_turns;
        if let Err(e) = self.files.ensure_directories() {
            return DebateResult {
                success: false,
                phase_name: phase_name.to_string(),
                final_output_file: self.files.final_output_path(phase_name),
                turn1: None,
                turn2: None,
                synthesis: None,
                error: Some(e.to_string()),
            };
        }

        let primary_t1_file = self.files.role_output_path(phase_name, "primary");
        let secondary_t1_file = self.files.role_output_path(phase_name, "secondary");
        let debate_file = self.files.debate_path(phase_name);
        let final_file = self.files.final_output_path(phase_name);

        let result = if self.config.mode == DebateMode::Feedback {
            self.run_feedback_debate(
                context,
                phase_name,
                prompts,
                &primary_t1_file,
                &debate_file,
                &final_file,
                permission_mode,
                &allowed_tools,
                dangerous_mode,
            )
            .await
        } else {
            self.run_full_debate(
                context,
                phase_name,
                prompts,
                &primary_t1_file,
                &secondary_t1_file,
                &debate_file,
                &final_file,
                permission_mode,
                &allowed_tools,
                dangerous_mode,
            )
            .await
        };

        result.unwrap_or_else(|e| DebateResult {
            success: false,
            phase_name: phase_name.to_string(),
            final_output_file: final_file.clone(),
            turn1: None,
            turn2: None,
            synthesis: None,
            error: Some(e),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_feedback_debate(
        &self,
        context: &mut Context,
        phase_name: &str,
        prompts: &DebatePrompts,
        primary_t1_file: &PathBuf,
        debate_file: &PathBuf,
        final_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
    ) -> Result<DebateResult, String> {
        let t1 = self
            .run_turn_1_primary_only(context, prompts, primary_t1_file, permission_mode, allowed_tools, dangerous_mode)
            .await?;
        context.set_debate_session_id(phase_name, "primary", 1, t1.primary_result.session_id.clone(), None);

        let log = DebateLog::new(debate_file, 1, &prompts.primary_agent, &prompts.secondary_agent);
        log.write_header(phase_name, &prompts.task_description).map_err(|e| e.to_string())?;
        log.write_turn1_summary(&t1).map_err(|e| e.to_string())?;

        let feedback_prompt = prompts.feedback_prompt(primary_t1_file);
        let effective_dangerous = self.secondary_dangerous_mode(dangerous_mode);
        let opts = ExecutionOptions {
            permission_mode,
            allowed_tools: allowed_tools.to_vec(),
            max_turns: self.max_turns,
            timeout: Some(std::time::Duration::from_secs(self.config.message_timeout_seconds)),
            dangerous_mode: effective_dangerous,
            working_dir: Some(context.get_working_dir().to_path_buf()),
            ..ExecutionOptions::new()
        };
        let result = self.secondary.execute(&feedback_prompt, opts).await.map_err(|e| e.to_string())?;

        let message = DebateMessage {
            role: Role::Secondary,
            message_number: 1,
            content: result.output.clone(),
            result: Some(result.clone()),
        };
        log.append_message(Role::Secondary, 1, &result.output).map_err(|e| e.to_string())?;
        log.write_synthesis_summary(1).map_err(|e| e.to_string())?;

        if !result.session_id.is_empty() {
            context.set_debate_session_id(phase_name, "secondary", 2, result.session_id.clone(), Some(1));
        }

        let t2 = Turn2Results {
            messages: vec![message],
            debate_log_path: Some(debate_file.clone()),
        };

        let synthesis = self
            .run_synthesis(context, phase_name, prompts, &t1, debate_file, final_file, permission_mode, allowed_tools, dangerous_mode)
            .await?;

        Ok(DebateResult {
            success: synthesis.success(),
            phase_name: phase_name.to_string(),
            final_output_file: final_file.clone(),
            turn1: Some(t1),
            turn2: Some(t2),
            synthesis: Some(synthesis),
            error: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_full_debate(
        &self,
        context: &mut Context,
        phase_name: &str,
        prompts: &DebatePrompts,
        primary_t1_file: &PathBuf,
        secondary_t1_file: &PathBuf,
        debate_file: &PathBuf,
        final_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
    ) -> Result<DebateResult, String> {
        let t1 = self
            .run_turn_1(context, prompts, primary_t1_file, secondary_t1_file, permission_mode, allowed_tools, dangerous_mode)
            .await?;

        context.set_debate_session_id(phase_name, "primary", 1, t1.primary_result.session_id.clone(), None);
        if let Some(secondary_result) = &t1.secondary_result {
            context.set_debate_session_id(phase_name, "secondary", 1, secondary_result.session_id.clone(), None);
        }

        let t2 = self
            .run_turn_2_exchange(context, phase_name, prompts, &t1, debate_file, permission_mode, allowed_tools, dangerous_mode)
            .await?;

        let synthesis = self
            .run_synthesis(context, phase_name, prompts, &t1, debate_file, final_file, permission_mode, allowed_tools, dangerous_mode)
            .await?;

        Ok(DebateResult {
            success: synthesis.success(),
            phase_name: phase_name.to_string(),
            final_output_file: final_file.clone(),
            turn1: Some(t1),
            turn2: Some(t2),
            synthesis: Some(synthesis),
            error: None,
        })
    }

    async fn run_turn_1_primary_only(
        &self,
        context: &Context,
        prompts: &DebatePrompts,
        primary_output_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
    ) -> Result<Turn1Results, String> {
        let primary_result = self
            .execute_turn1(&self.primary, prompts.turn1_primary_prompt(primary_output_file), primary_output_file, permission_mode, allowed_tools, dangerous_mode, context)
            .await?;
        Ok(Turn1Results {
            primary_result,
            secondary_result: None,
            primary_output_file: primary_output_file.clone(),
            secondary_output_file: None,
        })
    }

    async fn run_turn_1(
        &self,
        context: &Context,
        prompts: &DebatePrompts,
        primary_output_file: &PathBuf,
        secondary_output_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
    ) -> Result<Turn1Results, String> {
        let secondary_dangerous = self.secondary_dangerous_mode(dangerous_mode);
        let primary_prompt = prompts.turn1_primary_prompt(primary_output_file);
        let secondary_prompt = prompts.turn1_secondary_prompt(secondary_output_file);

        let (primary_result, secondary_result) = if self.config.parallel_turn_1 {
            let primary_fut = self.execute_turn1(&self.primary, primary_prompt, primary_output_file, permission_mode, allowed_tools, dangerous_mode, context);
            let secondary_fut = self.execute_turn1(&self.secondary, secondary_prompt, secondary_output_file, permission_mode, allowed_tools, secondary_dangerous, context);
            tokio::try_join!(primary_fut, secondary_fut)?
        } else {
            let primary_result = self
                .execute_turn1(&self.primary, primary_prompt, primary_output_file, permission_mode, allowed_tools, dangerous_mode, context)
                .await?;
            let secondary_result = self
                .execute_turn1(&self.secondary, secondary_prompt, secondary_output_file, permission_mode, allowed_tools, secondary_dangerous, context)
                .await?;
            (primary_result, secondary_result)
        };

        Ok(Turn1Results {
            primary_result,
            secondary_result: Some(secondary_result),
            primary_output_file: primary_output_file.clone(),
            secondary_output_file: Some(secondary_output_file.clone()),
        })
    }

    /// Resume optimization: a non-empty existing output file from a prior
    /// failed attempt is reused as a zero-cost result instead of re-running.
    #[allow(clippy::too_many_arguments)]
    async fn execute_turn1(
        &self,
        executor: &Arc<dyn AgentExecutor>,
        prompt: String,
        output_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
        context: &Context,
    ) -> Result<ExecutionResult, String> {
        if let Ok(existing) = std::fs::read_to_string(output_file) {
            if !existing.trim().is_empty() {
                return Ok(ExecutionResult {
                    session_id: String::new(),
                    output: existing,
                    cost_usd: 0.0,
                    duration_ms: 0,
                    num_turns: 0,
                    is_error: false,
                    raw_output: String::new(),
                    subagent_results: vec![],
                    agent_kind: executor.agent_kind().to_string(),
                });
            }
        }

        let opts = ExecutionOptions {
            permission_mode,
            allowed_tools: allowed_tools.to_vec(),
            max_turns: self.max_turns,
            timeout: Some(std::time::Duration::from_secs(self.config.turn_timeout_seconds)),
            dangerous_mode,
            working_dir: Some(context.get_working_dir().to_path_buf()),
            ..ExecutionOptions::new()
        };
        executor.execute(&prompt, opts).await.map_err(|e| e.to_string())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_turn_2_exchange(
        &self,
        context: &mut Context,
        phase_name: &str,
        prompts: &DebatePrompts,
        t1: &Turn1Results,
        debate_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
    ) -> Result<Turn2Results, String> {
        let max_messages = self.config.max_exchange_messages;
        let log = DebateLog::new(debate_file, max_messages, &prompts.primary_agent, &prompts.secondary_agent);
        log.write_header(phase_name, &prompts.task_description).map_err(|e| e.to_string())?;
        log.write_turn1_summary(t1).map_err(|e| e.to_string())?;

        let mut messages = Vec::new();
        let mut role = Role::Primary;

        for msg_num in 1..=max_messages {
            let is_final = msg_num == max_messages;
            let other_role = role.other();
            let prompt = prompts.debate_message_prompt(
                role,
                msg_num,
                max_messages,
                &log.get_transcript(),
                t1.output_file_for(role).ok_or("missing turn-1 output for role")?,
                t1.output_file_for(other_role),
                is_final,
            );

            let executor = match role {
                Role::Primary => &self.primary,
                Role::Secondary => &self.secondary,
            };

            let resume_session = if role == Role::Primary && msg_num > 1 {
                let prev = msg_num.saturating_sub(2);
                if prev >= 1 {
                    context.get_debate_session_id(phase_name, "primary", 2, Some(prev)).cloned()
                } else {
                    None
                }
            } else {
                None
            };

            let effective_dangerous = match role {
                Role::Primary => dangerous_mode,
                Role::Secondary => self.secondary_dangerous_mode(dangerous_mode),
            };

            let opts = ExecutionOptions {
                permission_mode,
                allowed_tools: allowed_tools.to_vec(),
                max_turns: self.max_turns,
                timeout: Some(std::time::Duration::from_secs(self.config.message_timeout_seconds)),
                resume_session,
                dangerous_mode: effective_dangerous,
                working_dir: Some(context.get_working_dir().to_path_buf()),
                ..ExecutionOptions::new()
            };
            let result = executor.execute(&prompt, opts).await.map_err(|e| e.to_string())?;

            log.append_message(role, msg_num, &result.output).map_err(|e| e.to_string())?;
            if !result.session_id.is_empty() {
                context.set_debate_session_id(phase_name, role.as_str(), 2, result.session_id.clone(), Some(msg_num));
            }
            messages.push(DebateMessage {
                role,
                message_number: msg_num,
                content: result.output.clone(),
                result: Some(result),
            });

            role = role.other();
        }

        log.write_synthesis_summary(messages.len()).map_err(|e| e.to_string())?;

        Ok(Turn2Results {
            messages,
            debate_log_path: Some(debate_file.clone()),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_synthesis(
        &self,
        context: &mut Context,
        phase_name: &str,
        prompts: &DebatePrompts,
        t1: &Turn1Results,
        debate_file: &PathBuf,
        final_output_file: &PathBuf,
        permission_mode: Option<PermissionMode>,
        allowed_tools: &[String],
        dangerous_mode: bool,
    ) -> Result<SynthesisResult, String> {
        let debate_transcript = std::fs::read_to_string(debate_file).unwrap_or_default();
        let prompt = prompts.synthesis_prompt(t1, &debate_transcript, final_output_file);

        let resume_session = if self.config.mode == DebateMode::Feedback {
            context.get_debate_session_id(phase_name, "primary", 1, None).cloned()
        } else {
            context.get_synthesis_resume_session(phase_name).cloned()
        };

        let opts = ExecutionOptions {
            permission_mode,
            allowed_tools: allowed_tools.to_vec(),
            max_turns: self.max_turns,
            timeout: Some(std::time::Duration::from_secs(self.config.turn_timeout_seconds)),
            resume_session,
            dangerous_mode,
            working_dir: Some(context.get_working_dir().to_path_buf()),
            ..ExecutionOptions::new()
        };
        let result = self.primary.execute(&prompt, opts).await.map_err(|e| e.to_string())?;

        if !result.session_id.is_empty() {
            context.set_session_id(&format!("{phase_name}_synthesis"), result.session_id.clone());
        }

        Ok(SynthesisResult {
            result,
            output_file: final_output_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_maps_to_exchange_length() {
        let low = DebateConfig::for_intensity(DebateMode::Debate, false);
        let high = DebateConfig::for_intensity(DebateMode::Debate, true);
        assert_eq!(low.max_exchange_messages, 3);
        assert_eq!(high.max_exchange_messages, 5);
        assert_eq!(low.max_exchange_messages % 2, 1);
        assert_eq!(high.max_exchange_messages % 2, 1);
    }
}
