//! Research pipeline.
//!
//! One `process` call runs the full cycle for a (satellite, topic) pair:
//! invoke the research agent, normalize its output, fall back to trace
//! mining when the output is unusable, and retry transient failures with
//! exponential backoff. The call always produces a complete record; when
//! every attempt fails it is the all-unknown fallback carrying the last
//! error under the `error` key. Errors never escape this module.

pub mod miner;
pub mod normalizer;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::agents::backend::{ResearchBackend, ResearchRequest};
use crate::agents::{classify_failure, AgentError, ACTION_BUDGET, TIME_BUDGET_SECS};
use crate::record::Record;
use crate::schema::{Schema, Topic};

pub use normalizer::ExtractionFailure;

/// Backoff between retry attempts: `multiplier * 2^n` for the n-th retry
/// (1-based), clamped to `[min_delay, max_delay]`. Delays are
/// non-decreasing in the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt with this 0-based index.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = 1u32 << (attempt + 1).min(30);
        self.multiplier
            .saturating_mul(exp)
            .clamp(self.min_delay, self.max_delay)
    }

    /// Zero-delay policy for tests.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            multiplier: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
}

/// Drives one research agent through the per-topic cycle.
pub struct ResearchPipeline {
    backend: Arc<dyn ResearchBackend>,
    max_actions: usize,
    timeout_seconds: u64,
    retry: RetryPolicy,
}

impl ResearchPipeline {
    pub fn new(backend: Arc<dyn ResearchBackend>) -> Self {
        Self {
            backend,
            max_actions: ACTION_BUDGET,
            timeout_seconds: TIME_BUDGET_SECS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_budgets(mut self, max_actions: usize, timeout_seconds: u64) -> Self {
        self.max_actions = max_actions;
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Research one topic for one satellite. Always returns a complete,
    /// schema-shaped record; total failure yields the all-unknown record
    /// with the last error noted.
    pub async fn process(&self, satellite_name: &str, topic: Topic) -> Record {
        let schema = Schema::for_topic(topic);
        let mut last_error = String::from("no attempts were made");

        for attempt in 0..schema.max_attempts {
            match self.run_attempt(satellite_name, schema).await {
                Ok(mut record) => {
                    record.stamp_name(satellite_name);
                    info!(
                        satellite = satellite_name,
                        topic = topic.key(),
                        attempt = attempt + 1,
                        backend = self.backend.name(),
                        "research cycle completed"
                    );
                    return record;
                }
                Err(err) => {
                    last_error = err.to_string();
                    warn!(
                        satellite = satellite_name,
                        topic = topic.key(),
                        attempt = attempt + 1,
                        kind = classify_failure(&last_error).as_str(),
                        error = %err,
                        "research attempt failed"
                    );
                }
            }

            if attempt + 1 < schema.max_attempts {
                let delay = self.retry.delay(attempt);
                debug!(topic = topic.key(), delay_secs = delay.as_secs(), "backing off");
                sleep(delay).await;
            }
        }

        error!(
            satellite = satellite_name,
            topic = topic.key(),
            attempts = schema.max_attempts,
            "all research attempts failed, recording fallback"
        );
        let mut record = Record::fallback(schema).with_error(&last_error);
        record.stamp_name(satellite_name);
        record
    }

    async fn run_attempt(
        &self,
        satellite_name: &str,
        schema: &Schema,
    ) -> Result<Record, AttemptError> {
        let prompt = schema.task_prompt(satellite_name, self.max_actions);
        let request =
            ResearchRequest::new(prompt).with_budgets(self.max_actions, self.timeout_seconds);

        let run = self.backend.invoke(request).await?;

        // A run that used up its whole action budget was cut off, not
        // finished. Its final output is untrusted even when it parses;
        // the trace is the only evidence worth keeping.
        if run.trace.len() >= self.max_actions {
            warn!(
                topic = schema.topic.key(),
                steps = run.trace.len(),
                "action budget exhausted, mining trace instead of final output"
            );
            return Ok(miner::mine(&run.trace, schema));
        }

        match normalizer::normalize(&run.output, schema) {
            Ok(record) => Ok(record),
            Err(failure) if run.trace.is_empty() => Err(failure.into()),
            Err(_) => {
                debug!(
                    topic = schema.topic.key(),
                    steps = run.trace.len(),
                    "output unparseable, mining trace"
                );
                Ok(miner::mine(&run.trace, schema))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::backend::{MockBackend, MockReply};
    use crate::record::UNKNOWN;
    use serde_json::{json, Value};

    fn pipeline(backend: MockBackend) -> (Arc<MockBackend>, ResearchPipeline) {
        let backend = Arc::new(backend);
        let pipeline = ResearchPipeline::new(backend.clone() as Arc<dyn ResearchBackend>)
            .with_retry(RetryPolicy::immediate());
        (backend, pipeline)
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let (backend, pipeline) = pipeline(MockBackend::with_output(json!({
            "altitude": "550 km",
            "altitude_source": "https://example.com"
        })));

        let record = pipeline.process("Sentinel-2A", Topic::BasicInfo).await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(record.get("altitude"), Some(&Value::String("550 km".into())));
        assert_eq!(
            record.get("satellite_name"),
            Some(&Value::String("Sentinel-2A".into()))
        );
        assert!(!record.contains("error"));
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_exhausts_attempts() {
        let (backend, pipeline) = pipeline(MockBackend::new(vec![MockReply::RateLimited(
            "Resource has been exhausted (e.g. check quota)".to_string(),
        )]));

        let record = pipeline.process("CartoSat-3", Topic::BasicInfo).await;

        assert_eq!(backend.calls(), 5);
        assert_eq!(record.get("altitude"), Some(&Value::String(UNKNOWN.into())));
        let error = record.get("error").and_then(Value::as_str).unwrap();
        assert!(error.contains("rate limited"), "{error}");
        assert_eq!(
            record.get("satellite_name"),
            Some(&Value::String("CartoSat-3".into()))
        );
    }

    #[tokio::test]
    async fn test_non_basic_topics_get_three_attempts() {
        let (backend, pipeline) = pipeline(MockBackend::new(vec![MockReply::Unavailable(
            "connection refused".to_string(),
        )]));

        pipeline.process("CartoSat-3", Topic::Numeric).await;
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted_run_is_mined_not_trusted() {
        // Valid final output, but the trace hit the action budget. The
        // output must be ignored in favor of mining.
        let steps: Vec<(String, String)> = (0..10)
            .map(|i| {
                (
                    "web_search".to_string(),
                    if i == 3 {
                        "The launch cost was $31 million.".to_string()
                    } else {
                        format!("result page {i}")
                    },
                )
            })
            .collect();
        let (_, pipeline) = pipeline(MockBackend::new(vec![MockReply::Run {
            output: json!({"launch_cost": "$999 billion"}),
            steps,
        }]));

        let record = pipeline.process("PSLV-C37", Topic::LaunchCost).await;
        assert_eq!(record.get("launch_cost"), Some(&Value::String("$31".into())));
    }

    #[tokio::test]
    async fn test_unparseable_output_with_trace_falls_back_to_mining() {
        let (backend, pipeline) = pipeline(MockBackend::new(vec![MockReply::Run {
            output: json!("I could not produce the requested JSON."),
            steps: vec![(
                "web_search".to_string(),
                "It is a commercial satellite operated by: Planet Labs.".to_string(),
            )],
        }]));

        let record = pipeline.process("Dove-1", Topic::UserInfo).await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(record.get("user_category_number"), Some(&Value::from(3)));
    }

    #[tokio::test]
    async fn test_unparseable_output_without_trace_retries() {
        let (backend, pipeline) = pipeline(MockBackend::new(vec![
            MockReply::Run {
                output: json!("no structure and no steps"),
                steps: vec![],
            },
            MockReply::Run {
                output: json!({"user_description": "ESA member states"}),
                steps: vec![],
            },
        ]));

        let record = pipeline.process("Galileo-FOC", Topic::UserInfo).await;

        assert_eq!(backend.calls(), 2);
        assert_eq!(
            record.get("user_description"),
            Some(&Value::String("ESA member states".into()))
        );
    }

    #[test]
    fn test_backoff_delays_clamp_and_never_decrease() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..7).map(|a| policy.delay(a).as_secs()).collect();
        assert_eq!(delays, vec![4, 4, 8, 16, 32, 60, 60]);
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }
}
