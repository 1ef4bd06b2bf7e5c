mod common;

use common::{count_sql_prompts, orchestrator_with, seeded_pool, ScriptedModel};
use serde_json::json;

#[tokio::test]
async fn clean_run_answers_with_metric_chart() {
    let (model, prompts) = ScriptedModel::new(vec![
        Ok("Count the total number of customers with no filters."),
        Ok("SELECT COUNT(*) AS count FROM customers"),
        Ok("SUMMARY: There are 5 customers in total.\nCHART: metric"),
    ]);
    let orchestrator = orchestrator_with(seeded_pool("pipe-clean"), Box::new(model));

    let envelope = orchestrator
        .answer_question("How many customers are there?")
        .await;

    assert!(envelope.error.is_none(), "unexpected error: {:?}", envelope.error);
    let result = envelope.execution_result.expect("execution result present");
    assert_eq!(result.rows[0].get("count"), Some(&json!(5)));
    assert_eq!(
        envelope.summary.as_deref(),
        Some("There are 5 customers in total.")
    );
    assert_eq!(
        serde_json::to_value(envelope.chart_suggestion).expect("serializes"),
        json!("metric")
    );
    assert_eq!(count_sql_prompts(&prompts), 1);
}

#[tokio::test]
async fn rejected_sql_is_regenerated_with_the_error_injected() {
    let (model, prompts) = ScriptedModel::new(vec![
        Ok("List every customer."),
        Ok("SELECT * FROM users"),
        Ok("SELECT * FROM customers"),
        Ok("SUMMARY: All five customers.\nCHART: table"),
    ]);
    let orchestrator = orchestrator_with(seeded_pool("pipe-retry"), Box::new(model));

    let envelope = orchestrator.answer_question("Show me all customers").await;

    assert!(envelope.error.is_none(), "unexpected error: {:?}", envelope.error);
    assert_eq!(count_sql_prompts(&prompts), 2, "SQL agent runs exactly twice");

    // the second SQL prompt must carry the first rejection verbatim
    let log = prompts.lock().expect("prompt log lock");
    let second_sql_prompt = log
        .iter()
        .filter(|p| p.contains("expert SQL generator"))
        .nth(1)
        .expect("second SQL prompt");
    assert!(
        second_sql_prompt.contains("table 'users' is not authorized"),
        "retry prompt should quote the validator detail"
    );
}

#[tokio::test]
async fn budget_exhaustion_fails_after_three_attempts() {
    let (model, prompts) = ScriptedModel::new(vec![
        Ok("List every user."),
        Ok("SELECT * FROM users"),
        Ok("SELECT * FROM users"),
        Ok("SELECT * FROM users"),
    ]);
    let orchestrator = orchestrator_with(seeded_pool("pipe-budget"), Box::new(model));

    let envelope = orchestrator.answer_question("Show me all users").await;

    let error = envelope.error.expect("error present");
    assert!(error.contains("Maximum retries (2) exceeded"), "got: {error}");
    assert!(envelope.validated_sql.is_none());
    assert!(envelope.execution_result.is_none());
    assert_eq!(count_sql_prompts(&prompts), 3, "initial attempt plus two retries");
}

#[tokio::test]
async fn intent_failure_ends_the_request_without_sql_generation() {
    let (model, prompts) = ScriptedModel::new(vec![Err("connection refused")]);
    let orchestrator = orchestrator_with(seeded_pool("pipe-intent-down"), Box::new(model));

    let envelope = orchestrator.answer_question("How many accounts?").await;

    let error = envelope.error.expect("error present");
    assert!(error.contains("language model"), "got: {error}");
    assert_eq!(count_sql_prompts(&prompts), 0);
}

#[tokio::test]
async fn insight_failure_keeps_the_rows_and_defaults_the_chart() {
    let (model, _prompts) = ScriptedModel::new(vec![
        Ok("Count customers."),
        Ok("SELECT COUNT(*) AS count FROM customers"),
        Err("insight backend down"),
    ]);
    let orchestrator = orchestrator_with(seeded_pool("pipe-insight-down"), Box::new(model));

    let envelope = orchestrator.answer_question("How many customers?").await;

    assert!(envelope.error.is_none(), "insight failure must not fail the request");
    assert!(envelope.execution_result.is_some());
    assert!(envelope.summary.is_none());
    assert_eq!(
        serde_json::to_value(envelope.chart_suggestion).expect("serializes"),
        json!("table")
    );
}

#[tokio::test]
async fn markdown_fences_from_the_model_are_stripped_before_validation() {
    let (model, _prompts) = ScriptedModel::new(vec![
        Ok("Count customers."),
        Ok("```sql\nSELECT COUNT(*) AS count FROM customers;\n```"),
        Ok("SUMMARY: Five.\nCHART: metric"),
    ]);
    let orchestrator = orchestrator_with(seeded_pool("pipe-fences"), Box::new(model));

    let envelope = orchestrator.answer_question("How many customers?").await;

    assert!(envelope.error.is_none(), "unexpected error: {:?}", envelope.error);
    let sql = envelope.validated_sql.expect("validated SQL present");
    assert!(sql.starts_with("select count(*)"), "got: {sql}");
}
