//! Research-agent capability boundary.
//!
//! The pipeline drives an external web-search-backed language-model agent.
//! It only depends on the agent's budgeted, traced contract: given a task
//! prompt, an action budget, and a wall-clock budget, the agent returns a
//! final output plus the ordered (action, observation) trace of its run,
//! or fails.

pub mod backend;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum agent actions per run. Reaching this cap is a failure signal:
/// the final output is not trusted and the trace is mined instead.
pub const ACTION_BUDGET: usize = 10;

/// Wall-clock budget for one agent run, in seconds.
pub const TIME_BUDGET_SECS: u64 = 300;

/// Errors surfaced by the agent capability.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent rate limited: {0}")]
    RateLimited(String),

    #[error("agent backend unavailable: {0}")]
    Unavailable(String),

    #[error("agent run timed out after {0} seconds")]
    Timeout(u64),

    #[error("agent response unparseable: {0}")]
    ResponseParse(String),
}

/// One (action, observation) step of an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub action: String,
    pub observation: String,
}

impl TraceStep {
    pub fn new(action: impl Into<String>, observation: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            observation: observation.into(),
        }
    }
}

/// Ordered steps from one agent run, used for salvage extraction.
pub type Trace = Vec<TraceStep>;

/// Final agent output: either already-structured data or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Structured(Map<String, Value>),
    Text(String),
}

impl From<Value> for RawOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => RawOutput::Structured(map),
            Value::String(s) => RawOutput::Text(s),
            other => RawOutput::Text(other.to_string()),
        }
    }
}

/// The result of one budgeted agent run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub output: RawOutput,
    pub trace: Trace,
}

/// Best-effort classification of a failure message, for diagnostics only.
///
/// Upstream error wording is not a stable contract; this never feeds the
/// retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    MaxIterations,
    Timeout,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate-limited",
            FailureKind::MaxIterations => "max-iterations",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
        }
    }
}

/// Classify a failure message by substring match.
pub fn classify_failure(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if lower.contains("rate limit")
        || lower.contains("resource has been exhausted")
        || lower.contains("429")
    {
        FailureKind::RateLimited
    } else if lower.contains("maximum iterations") || lower.contains("max iterations") {
        FailureKind::MaxIterations
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("execution time")
    {
        FailureKind::Timeout
    } else {
        FailureKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_variants() {
        assert_eq!(
            classify_failure("Resource has been exhausted (e.g. check quota)"),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify_failure("HTTP 429 from service"),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify_failure("agent rate limited: slow down"),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_classify_timeout_and_iterations() {
        assert_eq!(
            classify_failure("agent run timed out after 300 seconds"),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_failure("Agent stopped due to maximum iterations."),
            FailureKind::MaxIterations
        );
        assert_eq!(classify_failure("connection refused"), FailureKind::Other);
    }

    #[test]
    fn test_raw_output_from_value() {
        let obj: Value = serde_json::json!({"altitude": "550"});
        assert!(matches!(RawOutput::from(obj), RawOutput::Structured(_)));

        let text = Value::String("plain".to_string());
        assert_eq!(RawOutput::from(text), RawOutput::Text("plain".to_string()));

        let num = Value::from(42);
        assert_eq!(RawOutput::from(num), RawOutput::Text("42".to_string()));
    }
}
