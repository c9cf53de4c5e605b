//! Error origin classifier (C1).
//!
//! Maps a free-text error message to an `AGENT` / `TASK` / `UNKNOWN` origin
//! via case-insensitive, word-boundary-anchored regex patterns. Downstream
//! retry and fallback decisions hinge on whether a failure is intrinsic to
//! the task or accidental to the agent.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorOrigin {
    Agent,
    Task,
    Unknown,
}

struct ErrorPattern {
    regex: Regex,
    description: &'static str,
    /// Restricts the pattern to specific agent kinds; `None` matches any kind.
    agent_kinds: Option<&'static [&'static str]>,
}

macro_rules! pattern {
    ($re:expr, $desc:expr) => {
        ErrorPattern {
            regex: Regex::new($re).expect("valid classifier pattern"),
            description: $desc,
            agent_kinds: None,
        }
    };
    ($re:expr, $desc:expr, $kinds:expr) => {
        ErrorPattern {
            regex: Regex::new($re).expect("valid classifier pattern"),
            description: $desc,
            agent_kinds: Some($kinds),
        }
    };
}

static AGENT_PATTERNS: LazyLock<Vec<ErrorPattern>> = LazyLock::new(|| {
    vec![
    pattern!(r"(?i)\brate[_\s-]?limit", "Rate limit hit"),
    pattern!(r"(?i)\btoo many requests\b", "Too many requests"),
    pattern!(r"(?i)\bthrottl", "Request throttled"),
    pattern!(r"(?i)\btoken[_\s-]?limit", "Token limit exceeded"),
    pattern!(r"(?i)\bcontext[_\s-]?window\b", "Context window exceeded"),
    pattern!(r"(?i)\bmax[_\s-]?tokens\b", "Max tokens exceeded"),
    pattern!(r"(?i)\bconversation too long\b", "Conversation too long"),
    pattern!(r"(?i)\bcontext[_\s-]?length\b", "Context length exceeded"),
    pattern!(
        r"(?i)\bauth(?:entication|orization)?\s*(?:failed|error)\b",
        "Authentication failed"
    ),
    pattern!(r"(?i)\bunauthorized\b", "Unauthorized"),
    pattern!(r"(?i)\binvalid api key\b", "Invalid API key"),
    pattern!(r"(?i)\binsufficient quota\b", "Insufficient quota"),
    pattern!(r"(?i)\bbilling (?:issue|error|problem)\b", "Billing issue"),
    pattern!(r"(?i)\bpayment required\b", "Payment required"),
    pattern!(r"(?i)\boverloaded\b", "Service overloaded"),
    pattern!(r"(?i)\binternal server error\b", "Internal server error"),
    pattern!(r"(?i)possible auth", "Possible auth issue"),
    pattern!(
        r"(?i)no result event received",
        "No result event received",
        &["conversational", "primary-conversational", "claude"]
    ),
    pattern!(r"(?i)agent produced no output", "Agent produced no output"),
    pattern!(r"(?i)no parseable output", "No parseable output"),
    ]
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub origin: ErrorOrigin,
    pub matched_patterns: Vec<String>,
    pub confidence: f64,
}

/// Classify an error's origin. Depends only on `error_text` and `agent_kind` — no global state.
pub fn classify_error(error_text: Option<&str>, agent_kind: Option<&str>) -> ClassificationResult {
    let Some(text) = error_text.filter(|t| !t.is_empty()) else {
        return ClassificationResult {
            origin: ErrorOrigin::Unknown,
            matched_patterns: Vec::new(),
            confidence: 0.0,
        };
    };

    let matched: Vec<String> = AGENT_PATTERNS
        .iter()
        .filter(|p| match p.agent_kinds {
            Some(kinds) => match agent_kind {
                Some(k) => kinds.contains(&k),
                None => false,
            },
            None => true,
        })
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.description.to_string())
        .collect();

    if matched.is_empty() {
        ClassificationResult {
            origin: ErrorOrigin::Task,
            matched_patterns: Vec::new(),
            confidence: 0.5,
        }
    } else {
        let confidence = (0.5 + 0.15 * matched.len() as f64).min(1.0);
        ClassificationResult {
            origin: ErrorOrigin::Agent,
            matched_patterns: matched,
            confidence,
        }
    }
}

pub fn is_agent_specific_error(error_text: Option<&str>, agent_kind: Option<&str>) -> bool {
    classify_error(error_text, agent_kind).origin == ErrorOrigin::Agent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_unknown() {
        let result = classify_error(Some(""), None);
        assert_eq!(result.origin, ErrorOrigin::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn none_input_is_unknown() {
        let result = classify_error(None, None);
        assert_eq!(result.origin, ErrorOrigin::Unknown);
    }

    #[test]
    fn rate_limit_is_agent() {
        let result = classify_error(Some("Error: rate limit exceeded"), None);
        assert_eq!(result.origin, ErrorOrigin::Agent);
        assert!(result.matched_patterns.contains(&"Rate limit hit".to_string()));
        assert!(result.confidence >= 0.65);
    }

    #[test]
    fn type_error_is_task() {
        let result = classify_error(
            Some("TypeError: cannot read property 'foo' of undefined"),
            None,
        );
        assert_eq!(result.origin, ErrorOrigin::Task);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn word_boundary_prevents_false_positive() {
        let result = classify_error(Some("accurate_limiting calculation failed"), None);
        assert_eq!(result.origin, ErrorOrigin::Task);
    }

    #[test]
    fn agent_specific_pattern_requires_matching_kind() {
        let result = classify_error(Some("No result event received"), Some("codex"));
        assert_eq!(result.origin, ErrorOrigin::Task);

        let result = classify_error(Some("No result event received"), Some("conversational"));
        assert_eq!(result.origin, ErrorOrigin::Agent);
    }

    #[test]
    fn confidence_caps_at_one() {
        let text = "rate limit too many requests throttled token limit context window max tokens";
        let result = classify_error(Some(text), None);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn classification_is_pure() {
        let a = classify_error(Some("unauthorized"), None);
        let b = classify_error(Some("unauthorized"), None);
        assert_eq!(a.origin, b.origin);
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn is_agent_specific_error_wrapper() {
        assert!(is_agent_specific_error(Some("overloaded"), None));
        assert!(!is_agent_specific_error(Some("null pointer"), None));
    }
}
