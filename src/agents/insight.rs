use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::agents::prompts::{PromptName, PromptStore};
use crate::db::executor::ExecutionResult;
use crate::llm::LlmManager;

/// Closed set of visualizations the frontend knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
    Table,
    Metric,
}

impl ChartKind {
    /// Anything the model emits outside the closed set coerces to `table`.
    pub fn parse_or_table(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "pie" => ChartKind::Pie,
            "doughnut" => ChartKind::Doughnut,
            "metric" => ChartKind::Metric,
            _ => ChartKind::Table,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Table => "table",
            ChartKind::Metric => "metric",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Insight {
    pub summary: Option<String>,
    pub chart: ChartKind,
}

static SUMMARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)SUMMARY:\s*(.*?)\s*(?:CHART:|$)").expect("summary regex compiles"));
static CHART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CHART:\s*(\w+)").expect("chart regex compiles"));

/// Final agent: a human-readable summary plus a chart recommendation.
///
/// Unlike the intent and SQL agents, a failure here never fails the request.
/// The rows are already computed; the caller just loses the narration.
pub struct InsightAgent {
    llm: Arc<LlmManager>,
    prompts: Arc<PromptStore>,
}

impl InsightAgent {
    pub fn new(llm: Arc<LlmManager>, prompts: Arc<PromptStore>) -> Self {
        Self { llm, prompts }
    }

    pub async fn run(&self, validated_sql: &str, result: &ExecutionResult) -> Insight {
        let result_json = serde_json::to_string(result)
            .unwrap_or_else(|_| format!("{} row(s)", result.row_count));

        let prompt = self
            .prompts
            .load(PromptName::Insight)
            .replace("{sql}", validated_sql)
            .replace("{result}", &result_json);

        match self.llm.complete(&prompt).await {
            Ok(content) => parse_insight(&content),
            Err(e) => {
                warn!("insight generation failed, continuing without summary: {e}");
                Insight { summary: None, chart: ChartKind::Table }
            }
        }
    }
}

/// The prompt demands two lines, `SUMMARY: …` then `CHART: …`, but the parse
/// tolerates anything: a missing SUMMARY marker makes the whole content the
/// summary, a missing or unknown CHART falls back to `table`.
pub fn parse_insight(content: &str) -> Insight {
    let summary = match SUMMARY_RE.captures(content).and_then(|c| c.get(1)) {
        Some(m) if !m.as_str().trim().is_empty() => Some(m.as_str().trim().to_string()),
        Some(_) => None,
        None => {
            let whole = content.trim();
            (!whole.is_empty()).then(|| whole.to_string())
        }
    };

    let chart = CHART_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| ChartKind::parse_or_table(m.as_str()))
        .unwrap_or(ChartKind::Table);

    Insight { summary, chart }
}
