pub mod state;

use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{ChartKind, InsightAgent, IntentAgent, PromptStore, SqlAgent};
use crate::catalog::SchemaCatalog;
use crate::db::executor::{ExecutionResult, QueryExecutor};
use crate::llm::LlmManager;
use crate::validate::{SqlValidator, Verdict};

pub use state::{RequestState, ResponseEnvelope};

/// What a pipeline step decided about the request's fate. The dispatcher
/// matches on the tag; nothing routes on strings.
enum StepOutcome {
    Proceed,
    Retry,
    Fail(String),
}

/// Drives one request through intent → synthesis → validation → execution →
/// insight, feeding validator and executor errors back into regeneration.
///
/// The retry budget covers the SQL agent: with `max_retries = 2` it runs at
/// most three times (the initial attempt plus two corrections).
pub struct Orchestrator {
    catalog: Arc<SchemaCatalog>,
    validator: SqlValidator,
    executor: QueryExecutor,
    intent: IntentAgent,
    sql: SqlAgent,
    insight: InsightAgent,
    max_retries: u32,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        validator: SqlValidator,
        executor: QueryExecutor,
        llm: Arc<LlmManager>,
        prompts: Arc<PromptStore>,
        max_retries: u32,
    ) -> Self {
        Self {
            catalog,
            validator,
            executor,
            intent: IntentAgent::new(Arc::clone(&llm), Arc::clone(&prompts)),
            sql: SqlAgent::new(Arc::clone(&llm), Arc::clone(&prompts)),
            insight: InsightAgent::new(llm, prompts),
            max_retries,
        }
    }

    /// Full pipeline entry point for natural-language questions.
    pub async fn answer_question(&self, question: &str) -> ResponseEnvelope {
        info!(question, "starting full pipeline");
        let mut state = RequestState::new(question);

        // Intent extraction. Re-asking the same model the same question
        // cannot help, so a provider failure here ends the request.
        match self.intent.run(question).await {
            Ok(intent) => state.interpreted_intent = Some(intent),
            Err(e) => {
                warn!("intent extraction failed: {e}");
                return ResponseEnvelope::failure("The language model is currently unavailable");
            }
        }

        let schema_text = self.catalog.as_prompt_text();

        loop {
            // Synthesize. The previous error rides along verbatim on retries.
            let intent = state.interpreted_intent.as_deref().unwrap_or(question);
            let generated = match self
                .sql
                .run(intent, &schema_text, state.error_message.as_deref())
                .await
            {
                Ok(sql) => sql,
                Err(e) => {
                    warn!("SQL generation failed: {e}");
                    return ResponseEnvelope::failure(
                        "The language model is currently unavailable",
                    );
                }
            };
            state.generated_sql = Some(generated.clone());

            // Validate.
            match self.validate_step(&mut state, &generated) {
                StepOutcome::Proceed => {}
                StepOutcome::Retry => continue,
                StepOutcome::Fail(message) => return ResponseEnvelope::failure(message),
            }

            // Execute.
            match self.execute_step(&mut state).await {
                StepOutcome::Proceed => break,
                StepOutcome::Retry => continue,
                StepOutcome::Fail(message) => return ResponseEnvelope::failure(message),
            }
        }

        // Insight failures are tolerated: the rows are already computed.
        if let (Some(sql), Some(result)) = (&state.validated_sql, &state.execution_result) {
            let insight = self.insight.run(sql, result).await;
            state.summary = insight.summary;
            state.chart_suggestion = Some(insight.chart);
        }

        ResponseEnvelope::success(state)
    }

    /// Raw-SQL entry point: validator and executor only, no LLM involvement
    /// and no retries, because there is nothing to regenerate from.
    pub async fn run_raw_sql(&self, sql: &str) -> ResponseEnvelope {
        info!("running raw SQL request");
        match self.validator.validate(sql) {
            Verdict::Rejected { reason, detail } => {
                warn!(%reason, "raw SQL rejected: {detail}");
                ResponseEnvelope::failure(format!("Validation error: {detail}"))
            }
            Verdict::Accepted { normalized_sql } => {
                match self.executor.run(&normalized_sql).await {
                    Err(e) => ResponseEnvelope::failure(e.to_string()),
                    Ok(result) => {
                        let mut state = RequestState::new("");
                        state.summary = Some(format!("Query returned {} row(s)", result.row_count));
                        state.chart_suggestion = Some(suggest_chart(&result));
                        state.accept_sql(normalized_sql);
                        state.execution_result = Some(result);
                        ResponseEnvelope::success(state)
                    }
                }
            }
        }
    }

    fn validate_step(&self, state: &mut RequestState, generated: &str) -> StepOutcome {
        match self.validator.validate(generated) {
            Verdict::Accepted { normalized_sql } => {
                info!(sql = %normalized_sql, "SQL validated");
                state.accept_sql(normalized_sql);
                StepOutcome::Proceed
            }
            Verdict::Rejected { reason, detail } => {
                warn!(%reason, retry_count = state.retry_count, "validation rejected: {detail}");
                self.after_failure(state, detail)
            }
        }
    }

    async fn execute_step(&self, state: &mut RequestState) -> StepOutcome {
        let Some(sql) = state.validated_sql.clone() else {
            // Unreachable by construction; fail closed rather than execute
            // anything unvalidated.
            return StepOutcome::Fail("internal error: no validated SQL to execute".to_string());
        };

        match self.executor.run(&sql).await {
            Ok(result) => {
                info!(rows = result.row_count, elapsed_ms = result.elapsed_ms, "query executed");
                state.execution_result = Some(result);
                StepOutcome::Proceed
            }
            Err(e) => {
                warn!(retry_count = state.retry_count, "execution failed: {e}");
                self.after_failure(state, e.to_string())
            }
        }
    }

    /// The single retry decision: book the failure, then either hand the
    /// error back to the SQL agent or end the request.
    fn after_failure(&self, state: &mut RequestState, detail: String) -> StepOutcome {
        state.register_failure(detail);
        if state.retry_count > self.max_retries {
            let last_error = state.error_message.clone().unwrap_or_default();
            StepOutcome::Fail(format!(
                "Maximum retries ({}) exceeded. Last error: {last_error}",
                self.max_retries
            ))
        } else {
            StepOutcome::Retry
        }
    }
}

/// Shape-based chart hint for the raw-SQL path, which has no insight agent.
fn suggest_chart(result: &ExecutionResult) -> ChartKind {
    let Some(first) = result.rows.first() else {
        return ChartKind::Table;
    };
    if result.row_count == 1 && first.len() == 1 {
        return ChartKind::Metric;
    }
    if first.len() == 2 {
        return if result.row_count > 5 { ChartKind::Bar } else { ChartKind::Pie };
    }
    ChartKind::Table
}
