//! Research backend abstraction.
//!
//! The pipeline talks to an external research-agent service over HTTP.
//! The service owns its reasoning loop and search tools (web search plus
//! a read-only satellite-data lookup); this client only sees the budgeted
//! contract: prompt in, final output and trace out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{AgentError, AgentRun, RawOutput, TraceStep};

/// One budgeted research request.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub prompt: String,
    /// Maximum tool actions the agent may take.
    pub max_actions: usize,
    /// Wall-clock budget for the whole run, in seconds.
    pub timeout_seconds: u64,
}

impl ResearchRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_actions: super::ACTION_BUDGET,
            timeout_seconds: super::TIME_BUDGET_SECS,
        }
    }

    pub fn with_budgets(mut self, max_actions: usize, timeout_seconds: u64) -> Self {
        self.max_actions = max_actions;
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Trait for research-agent backends.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Run one budgeted research task.
    async fn invoke(&self, request: ResearchRequest) -> Result<AgentRun, AgentError>;

    /// Check if the backend is available.
    async fn health_check(&self) -> Result<bool, AgentError>;
}

/// HTTP client for a research-agent service.
pub struct HttpAgentBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAgentBackend {
    pub fn new(base_url: String, api_key: Option<String>, timeout_seconds: u64) -> Self {
        // The client timeout backs up the service-side budget; leave slack
        // so the service can report its own timeout first.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds + 30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            api_key,
        }
    }
}

/// Agent service API request format.
#[derive(Debug, Serialize)]
struct ServiceRequest<'a> {
    prompt: &'a str,
    max_actions: usize,
    timeout_seconds: u64,
}

/// Agent service API response format.
#[derive(Debug, Deserialize)]
struct ServiceResponse {
    /// Final answer; may be a JSON object or a string.
    output: Value,
    #[serde(default)]
    steps: Vec<ServiceStep>,
}

#[derive(Debug, Deserialize)]
struct ServiceStep {
    action: String,
    observation: String,
}

#[async_trait]
impl ResearchBackend for HttpAgentBackend {
    fn name(&self) -> &'static str {
        "http-agent"
    }

    async fn invoke(&self, request: ResearchRequest) -> Result<AgentRun, AgentError> {
        let url = format!("{}/v1/research", self.base_url);
        let timeout_seconds = request.timeout_seconds;

        let service_request = ServiceRequest {
            prompt: &request.prompt,
            max_actions: request.max_actions,
            timeout_seconds,
        };

        debug!("Sending research request to {}", url);

        let mut builder = self.client.post(&url).json(&service_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout(timeout_seconds)
            } else {
                AgentError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::RateLimited(format!(
                "agent service returned 429: {}",
                body
            )));
        }
        if status == reqwest::StatusCode::GATEWAY_TIMEOUT {
            return Err(AgentError::Timeout(timeout_seconds));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Unavailable(format!(
                "agent service returned {}: {}",
                status, body
            )));
        }

        let service_response: ServiceResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ResponseParse(e.to_string()))?;

        let trace = service_response
            .steps
            .into_iter()
            .map(|s| TraceStep::new(s.action, s.observation))
            .collect();

        Ok(AgentRun {
            output: RawOutput::from(service_response.output),
            trace,
        })
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Agent service health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Mock backend for testing: replays scripted replies in order, sticking
/// on the last one, and counts invocations.
#[cfg(test)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockReply {
    Run { output: Value, steps: Vec<(String, String)> },
    RateLimited(String),
    Unavailable(String),
    Timeout(u64),
}

#[cfg(test)]
impl MockBackend {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Backend that always returns the same final output with no trace.
    pub fn with_output(output: Value) -> Self {
        Self::new(vec![MockReply::Run {
            output,
            steps: Vec::new(),
        }])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl ResearchBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn invoke(&self, _request: ResearchRequest) -> Result<AgentRun, AgentError> {
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let reply = self
            .replies
            .get(call)
            .or_else(|| self.replies.last())
            .expect("MockBackend needs at least one reply");

        match reply.clone() {
            MockReply::Run { output, steps } => Ok(AgentRun {
                output: RawOutput::from(output),
                trace: steps
                    .into_iter()
                    .map(|(a, o)| TraceStep::new(a, o))
                    .collect(),
            }),
            MockReply::RateLimited(msg) => Err(AgentError::RateLimited(msg)),
            MockReply::Unavailable(msg) => Err(AgentError::Unavailable(msg)),
            MockReply::Timeout(secs) => Err(AgentError::Timeout(secs)),
        }
    }

    async fn health_check(&self) -> Result<bool, AgentError> {
        Ok(true)
    }
}
