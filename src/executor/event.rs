//! Stream event model for the conversational agent's `stream-json` output.
//!
//! A line-delimited JSON stream with optional plain-text interludes. Each
//! non-empty line is attempted as one tagged JSON event; lines that fail to
//! parse are neither dropped nor fatal to the invocation — the caller falls
//! back to treating the accumulated assistant text as the result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    System(SystemEvent),
    Assistant(AssistantEvent),
    User(UserEvent),
    Result(ResultEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemEvent {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantEvent {
    #[serde(default)]
    pub message: Option<AssistantMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<ContentBlock>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserEvent {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultEvent {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub num_turns: Option<u32>,
}

/// Output of parsing a full `stream-json` transcript: the resolved output
/// text, the most recent session id seen, and terminal result fields when a
/// `result` event was observed.
#[derive(Debug, Clone, Default)]
pub struct ParsedStream {
    pub output: String,
    pub session_id: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub num_turns: u32,
    pub is_error: bool,
    pub saw_result_event: bool,
}

/// Parse a full line-delimited JSON transcript, accumulating assistant text
/// as fallback and capturing the terminal `result` event's fields.
pub fn parse_stream(data: &str) -> ParsedStream {
    let mut assistant_text = String::new();
    let mut parsed = ParsedStream::default();
    let mut event_count = 0u32;

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<AgentEvent>(line) else {
            continue;
        };
        event_count += 1;
        match event {
            AgentEvent::System(sys) => {
                if let Some(sid) = sys.session_id {
                    parsed.session_id = Some(sid);
                }
            }
            AgentEvent::Assistant(asst) => {
                if let Some(message) = asst.message {
                    if let Some(blocks) = message.content {
                        for block in blocks {
                            if let ContentBlock::Text { text } = block {
                                if !assistant_text.is_empty() {
                                    assistant_text.push('\n');
                                }
                                assistant_text.push_str(&text);
                            }
                        }
                    }
                }
            }
            AgentEvent::User(_) => {}
            AgentEvent::Result(result) => {
                parsed.saw_result_event = true;
                if let Some(sid) = result.session_id {
                    parsed.session_id = Some(sid);
                }
                parsed.cost_usd = result.cost_usd.unwrap_or(0.0);
                parsed.duration_ms = result.duration_ms.unwrap_or(0);
                parsed.num_turns = result.num_turns.unwrap_or(event_count);
                parsed.is_error = result.is_error;
                parsed.output = result.result.unwrap_or_default();
            }
            AgentEvent::Unknown => {}
        }
    }

    if parsed.output.trim().is_empty() {
        parsed.output = assistant_text;
    }
    if !parsed.saw_result_event {
        parsed.num_turns = event_count;
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_system_then_result() {
        let data = r#"{"type":"system","subtype":"init","session_id":"abc123"}
{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"working"}]}}
{"type":"result","subtype":"success","result":"done","session_id":"abc123","is_error":false,"cost_usd":0.05,"duration_ms":1200,"num_turns":2}
"#;
        let parsed = parse_stream(data);
        assert_eq!(parsed.output, "done");
        assert_eq!(parsed.session_id.as_deref(), Some("abc123"));
        assert_eq!(parsed.cost_usd, 0.05);
        assert!(parsed.saw_result_event);
        assert!(!parsed.is_error);
    }

    #[test]
    fn falls_back_to_assistant_text_when_no_result() {
        let data = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}
{"type":"assistant","message":{"content":[{"type":"text","text":"world"}]}}
"#;
        let parsed = parse_stream(data);
        assert_eq!(parsed.output, "hello\nworld");
        assert!(!parsed.saw_result_event);
        assert_eq!(parsed.num_turns, 2);
    }

    #[test]
    fn skips_unparseable_lines() {
        let data = "not json\n{\"type\":\"result\",\"result\":\"ok\"}\n";
        let parsed = parse_stream(data);
        assert_eq!(parsed.output, "ok");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let parsed = parse_stream("");
        assert_eq!(parsed.output, "");
        assert!(!parsed.saw_result_event);
    }

    #[test]
    fn unknown_event_types_do_not_fail_the_stream() {
        let data = "{\"type\":\"weird_future_event\",\"foo\":1}\n{\"type\":\"result\",\"result\":\"ok\"}\n";
        let parsed = parse_stream(data);
        assert_eq!(parsed.output, "ok");
    }
}
