use serde::Serialize;

use crate::agents::ChartKind;
use crate::db::executor::ExecutionResult;

/// Per-request record the orchestrator owns from accept to response.
///
/// Single-owner by construction: one worker drives one request, so no field
/// needs synchronization. All failure bookkeeping funnels through
/// [`RequestState::register_failure`], the only place the retry counter moves.
#[derive(Debug, Default)]
pub struct RequestState {
    pub user_query: String,
    pub interpreted_intent: Option<String>,
    pub generated_sql: Option<String>,
    pub validated_sql: Option<String>,
    pub execution_result: Option<ExecutionResult>,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub summary: Option<String>,
    pub chart_suggestion: Option<ChartKind>,
}

impl RequestState {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            ..Default::default()
        }
    }

    /// Record a validation or execution failure: the message is kept for the
    /// next generation attempt, the stale statement and result are dropped,
    /// and one retry is burned.
    pub fn register_failure(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.validated_sql = None;
        self.execution_result = None;
        self.retry_count += 1;
    }

    /// Record validator acceptance. Clears any error from a prior attempt so
    /// the `validated_sql ⇒ no error` invariant holds.
    pub fn accept_sql(&mut self, normalized_sql: String) {
        self.validated_sql = Some(normalized_sql);
        self.error_message = None;
    }
}

/// The one response shape every endpoint returns, success or failure.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub validated_sql: Option<String>,
    pub execution_result: Option<ExecutionResult>,
    pub summary: Option<String>,
    pub chart_suggestion: Option<ChartKind>,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            validated_sql: None,
            execution_result: None,
            summary: None,
            chart_suggestion: None,
            error: Some(message.into()),
        }
    }

    pub fn success(state: RequestState) -> Self {
        Self {
            validated_sql: state.validated_sql,
            execution_result: state.execution_result,
            summary: state.summary,
            chart_suggestion: state.chart_suggestion,
            error: None,
        }
    }
}
