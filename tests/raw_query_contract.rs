mod common;

use common::{orchestrator_with, seeded_pool, UnreachableModel};
use nl_teller::db::executor::QueryExecutor;
use serde_json::json;

fn raw_orchestrator(prefix: &str) -> nl_teller::pipeline::Orchestrator {
    orchestrator_with(seeded_pool(prefix), Box::new(UnreachableModel))
}

#[tokio::test]
async fn count_query_gains_default_limit_and_returns_five() {
    let orchestrator = raw_orchestrator("raw-count");
    let envelope = orchestrator
        .run_raw_sql("SELECT COUNT(*) AS n FROM customers")
        .await;

    assert!(envelope.error.is_none(), "unexpected error: {:?}", envelope.error);
    let sql = envelope.validated_sql.expect("validated SQL present");
    assert!(sql.ends_with("limit 100"), "got: {sql}");

    let result = envelope.execution_result.expect("execution result present");
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0].get("n"), Some(&json!(5)));
}

#[tokio::test]
async fn chained_statement_is_refused() {
    let orchestrator = raw_orchestrator("raw-chained");
    let envelope = orchestrator
        .run_raw_sql("SELECT * FROM customers; DROP TABLE accounts")
        .await;

    let error = envelope.error.expect("error present");
    assert!(error.contains("multiple statements"), "got: {error}");
    assert!(envelope.validated_sql.is_none());
    assert!(envelope.execution_result.is_none());
    assert!(envelope.summary.is_none());
    assert!(envelope.chart_suggestion.is_none());
}

#[tokio::test]
async fn unauthorized_table_is_refused() {
    let orchestrator = raw_orchestrator("raw-unauth");
    let envelope = orchestrator.run_raw_sql("SELECT name FROM users").await;

    let error = envelope.error.expect("error present");
    assert!(error.contains("not authorized"), "got: {error}");
    assert!(envelope.execution_result.is_none());
}

#[tokio::test]
async fn comments_are_refused() {
    let orchestrator = raw_orchestrator("raw-comment");
    let envelope = orchestrator
        .run_raw_sql("SELECT * FROM accounts -- comment")
        .await;

    let error = envelope.error.expect("error present");
    assert!(error.contains("comment"), "got: {error}");
}

#[tokio::test]
async fn union_injection_is_refused() {
    let orchestrator = raw_orchestrator("raw-union");
    let envelope = orchestrator
        .run_raw_sql("SELECT * FROM accounts UNION SELECT * FROM customers")
        .await;

    let error = envelope.error.expect("error present");
    assert!(error.contains("injection"), "got: {error}");
}

#[tokio::test]
async fn oversized_limit_is_rewritten_before_execution() {
    let orchestrator = raw_orchestrator("raw-limit");
    let envelope = orchestrator
        .run_raw_sql("SELECT * FROM transactions LIMIT 5000")
        .await;

    assert!(envelope.error.is_none(), "unexpected error: {:?}", envelope.error);
    let sql = envelope.validated_sql.expect("validated SQL present");
    assert!(sql.ends_with("limit 1000"), "got: {sql}");
}

#[tokio::test]
async fn raw_path_fills_summary_and_chart_without_the_llm() {
    // UnreachableModel panics if touched, so passing proves the bypass.
    let orchestrator = raw_orchestrator("raw-bypass");
    let envelope = orchestrator
        .run_raw_sql("SELECT COUNT(*) AS n FROM customers")
        .await;

    assert_eq!(envelope.summary.as_deref(), Some("Query returned 1 row(s)"));
    // single row, single numeric column
    assert_eq!(
        serde_json::to_value(envelope.chart_suggestion).expect("serializes"),
        json!("metric")
    );
}

#[tokio::test]
async fn envelope_serializes_with_the_contract_keys() {
    let orchestrator = raw_orchestrator("raw-shape");
    let envelope = orchestrator
        .run_raw_sql("SELECT name, balance FROM customers c JOIN accounts a ON c.id = a.customer_id LIMIT 3")
        .await;

    let value = serde_json::to_value(&envelope).expect("envelope serializes");
    assert!(value.get("validated_sql").is_some());
    assert!(value.pointer("/execution_result/data").expect("data key").is_array());
    assert!(value.pointer("/execution_result/row_count").is_some());
    assert!(value.pointer("/execution_result/elapsed_ms").is_some());
    assert!(value.get("chart_suggestion").is_some());
    assert_eq!(value.get("error"), Some(&serde_json::Value::Null));
}

#[tokio::test]
async fn balances_serialize_as_doubles_and_timestamps_as_iso_strings() {
    let orchestrator = raw_orchestrator("raw-serialize");
    let envelope = orchestrator
        .run_raw_sql("SELECT balance, created_at FROM accounts WHERE id = 1")
        .await;

    let result = envelope.execution_result.expect("execution result present");
    let row = &result.rows[0];
    assert_eq!(row.get("balance"), Some(&json!(15000.0)));
    let created_at = row.get("created_at").expect("created_at present");
    let text = created_at.as_str().expect("timestamp renders as a string");
    assert!(text.starts_with("2024-01-16T10:00:00"), "got: {text}");
}

#[tokio::test]
async fn executor_enforces_the_row_cap_defensively() {
    let pool = seeded_pool("raw-rowcap");
    let executor = QueryExecutor::new(pool, 30, 3);

    let result = executor
        .run("select * from transactions limit 1000")
        .await
        .expect("query runs");
    assert_eq!(result.row_count, 3);
    assert_eq!(result.rows.len(), 3);
}
