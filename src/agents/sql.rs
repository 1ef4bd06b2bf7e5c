use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::agents::prompts::{PromptName, PromptStore};
use crate::llm::{LlmError, LlmManager};

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[a-zA-Z]*").expect("code fence regex compiles"));

/// Second agent: renders the interpreted intent into a single SELECT. On a
/// retry the previous validator or executor error is injected verbatim so the
/// model can self-correct.
pub struct SqlAgent {
    llm: Arc<LlmManager>,
    prompts: Arc<PromptStore>,
}

impl SqlAgent {
    pub fn new(llm: Arc<LlmManager>, prompts: Arc<PromptStore>) -> Self {
        Self { llm, prompts }
    }

    pub async fn run(
        &self,
        intent: &str,
        schema_text: &str,
        previous_error: Option<&str>,
    ) -> Result<String, LlmError> {
        let prompt = self
            .prompts
            .load(PromptName::Sql)
            .replace("{schema}", schema_text)
            .replace("{intent}", intent)
            .replace("{error_message}", previous_error.unwrap_or("None"));

        let raw = self.llm.complete(&prompt).await?;
        let sql = clean_generated_sql(&raw);
        debug!(%sql, retry = previous_error.is_some(), "generated SQL");
        Ok(sql)
    }
}

/// Models wrap answers in markdown fences no matter how firmly the prompt
/// forbids it. Strip fences and a trailing semicolon, collapse whitespace.
pub fn clean_generated_sql(raw: &str) -> String {
    let without_fences = CODE_FENCE_RE.replace_all(raw, "");
    let collapsed = without_fences.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(';').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::clean_generated_sql;

    #[test]
    fn strips_fences_with_language_tag() {
        let raw = "```sql\nSELECT * FROM customers\n```";
        assert_eq!(clean_generated_sql(raw), "SELECT * FROM customers");
    }

    #[test]
    fn strips_bare_fences_and_semicolon() {
        let raw = "```\nSELECT id FROM accounts;\n```";
        assert_eq!(clean_generated_sql(raw), "SELECT id FROM accounts");
    }

    #[test]
    fn collapses_multiline_statements() {
        let raw = "SELECT id,\n       name\nFROM   customers";
        assert_eq!(clean_generated_sql(raw), "SELECT id, name FROM customers");
    }

    #[test]
    fn leaves_plain_statements_alone() {
        assert_eq!(
            clean_generated_sql("SELECT COUNT(*) FROM customers"),
            "SELECT COUNT(*) FROM customers"
        );
    }
}
