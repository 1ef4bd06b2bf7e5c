use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::catalog::SchemaCatalog;

/// Keywords that mutate data or the schema, or escape into procedural SQL.
/// Matched on word boundaries so identifiers like `created_at` pass.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "REPLACE", "MERGE",
    "GRANT", "REVOKE", "EXEC", "EXECUTE", "CALL", "PRAGMA", "PROCEDURE", "FUNCTION",
];

static FORBIDDEN_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = FORBIDDEN_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("forbidden keyword regex compiles")
});

struct InjectionPattern {
    label: &'static str,
    regex: &'static Lazy<Regex>,
}

macro_rules! pattern_re {
    ($name:ident, $re:literal) => {
        static $name: Lazy<Regex> =
            Lazy::new(|| Regex::new($re).expect("injection pattern regex compiles"));
    };
}

pattern_re!(TAUTOLOGY_INT_RE, r"(?i)\bor\s+\d+\s*=\s*\d+");
pattern_re!(TAUTOLOGY_STR_RE, r"(?i)\bor\s+'[^']*'\s*=\s*'[^']*'");
pattern_re!(UNION_RE, r"(?i)\bunion\s+(select|all)\b");
pattern_re!(HEX_LITERAL_RE, r"(?i)\b0x[0-9a-f]+\b");
pattern_re!(PROC_PREFIX_RE, r"(?i)\b(xp|sp)_\w+");
pattern_re!(SYSTEM_CATALOG_RE, r"(?i)\b(information_schema|sqlite_master)\b");
pattern_re!(CHAINED_STATEMENT_RE, r"(?i);\s*(drop|delete|update)\b");
pattern_re!(WAITFOR_RE, r"(?i)\bwaitfor\s+delay\b");
pattern_re!(BENCHMARK_RE, r"(?i)\bbenchmark\s*\(");
pattern_re!(SLEEP_RE, r"(?i)\bsleep\s*\(");

static INJECTION_PATTERNS: &[InjectionPattern] = &[
    InjectionPattern { label: "boolean tautology", regex: &TAUTOLOGY_INT_RE },
    InjectionPattern { label: "boolean tautology", regex: &TAUTOLOGY_STR_RE },
    InjectionPattern { label: "UNION-based injection", regex: &UNION_RE },
    InjectionPattern { label: "hex literal", regex: &HEX_LITERAL_RE },
    InjectionPattern { label: "procedure prefix", regex: &PROC_PREFIX_RE },
    InjectionPattern { label: "system catalog access", regex: &SYSTEM_CATALOG_RE },
    InjectionPattern { label: "chained statement", regex: &CHAINED_STATEMENT_RE },
    InjectionPattern { label: "time-based probe", regex: &WAITFOR_RE },
    InjectionPattern { label: "time-based probe", regex: &BENCHMARK_RE },
    InjectionPattern { label: "time-based probe", regex: &SLEEP_RE },
];

static TABLE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+([a-zA-Z_][a-zA-Z0-9_]*)").expect("table ref regex compiles")
});

static LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blimit\s+(\d+)\b").expect("limit regex compiles"));

/// Why a statement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    TooLong,
    ContainsComment,
    MultipleStatements,
    NotSelect,
    ForbiddenKeyword,
    InjectionPattern,
    UnauthorizedTable,
    SchemaUnknownTable,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::TooLong => "too_long",
            RejectionKind::ContainsComment => "contains_comment",
            RejectionKind::MultipleStatements => "multiple_statements",
            RejectionKind::NotSelect => "not_select",
            RejectionKind::ForbiddenKeyword => "forbidden_keyword",
            RejectionKind::InjectionPattern => "injection_pattern",
            RejectionKind::UnauthorizedTable => "unauthorized_table",
            RejectionKind::SchemaUnknownTable => "schema_unknown_table",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validation. The executor accepts only the `Accepted` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted { normalized_sql: String },
    Rejected { reason: RejectionKind, detail: String },
}

impl Verdict {
    fn rejected(reason: RejectionKind, detail: impl Into<String>) -> Self {
        Verdict::Rejected { reason, detail: detail.into() }
    }

    pub fn accepted_sql(&self) -> Option<&str> {
        match self {
            Verdict::Accepted { normalized_sql } => Some(normalized_sql),
            Verdict::Rejected { .. } => None,
        }
    }
}

/// Bounds the validator applies during normalization.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorLimits {
    pub max_query_length: usize,
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for ValidatorLimits {
    fn default() -> Self {
        Self { max_query_length: 5000, default_limit: 100, max_limit: 1000 }
    }
}

/// Ordered pipeline of lexical checks over a candidate statement.
///
/// Deterministic and offline: no network, no database, no panics. Every input
/// yields either an accepted normalized statement with a guaranteed LIMIT, or
/// a rejection with a stable, caller-safe detail string. Cheap checks run
/// first so adversarial input is refused with minimal work.
pub struct SqlValidator {
    catalog: Arc<SchemaCatalog>,
    limits: ValidatorLimits,
}

impl SqlValidator {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog, limits: ValidatorLimits::default() }
    }

    pub fn with_limits(catalog: Arc<SchemaCatalog>, limits: ValidatorLimits) -> Self {
        Self { catalog, limits }
    }

    pub fn validate(&self, raw: &str) -> Verdict {
        // 1. Length bound, on the raw input before any rewriting.
        if raw.len() > self.limits.max_query_length {
            return Verdict::rejected(
                RejectionKind::TooLong,
                format!(
                    "query length {} exceeds the maximum of {} characters",
                    raw.len(),
                    self.limits.max_query_length
                ),
            );
        }

        // 2. Whitespace normalization + keyword lowercasing. Text inside
        //    single-quoted literals is preserved verbatim.
        let mut sql = normalize(raw);

        // 3. Comments can hide semicolons, so this runs before the
        //    multi-statement check.
        if sql.contains("--") || sql.contains("/*") || sql.contains("*/") {
            return Verdict::rejected(
                RejectionKind::ContainsComment,
                "SQL comments are not allowed",
            );
        }

        // 4. One optional trailing semicolon is tolerated and dropped; any
        //    other semicolon means a chained statement.
        if let Some(stripped) = sql.strip_suffix(';') {
            sql = stripped.trim_end().to_string();
        }
        if sql.contains(';') {
            return Verdict::rejected(
                RejectionKind::MultipleStatements,
                "multiple statements are not allowed",
            );
        }

        // 5. Statement type.
        if !starts_with_select(&sql) {
            return Verdict::rejected(
                RejectionKind::NotSelect,
                "only SELECT statements are allowed",
            );
        }

        // 6. Forbidden keywords, word-bounded.
        if let Some(found) = FORBIDDEN_KEYWORD_RE.find(&sql) {
            return Verdict::rejected(
                RejectionKind::ForbiddenKeyword,
                format!(
                    "forbidden keyword '{}' is not allowed",
                    found.as_str().to_ascii_uppercase()
                ),
            );
        }

        // 7. Injection patterns.
        for pattern in INJECTION_PATTERNS {
            if pattern.regex.is_match(&sql) {
                return Verdict::rejected(
                    RejectionKind::InjectionPattern,
                    format!("potential SQL injection detected: {}", pattern.label),
                );
            }
        }

        // 8. Table authorization. A SELECT must read from somewhere.
        let tables = referenced_tables(&sql);
        if tables.is_empty() {
            return Verdict::rejected(
                RejectionKind::SchemaUnknownTable,
                "no table referenced in query",
            );
        }
        for table in &tables {
            if !self.catalog.table_exists(table) {
                return Verdict::rejected(
                    RejectionKind::UnauthorizedTable,
                    format!(
                        "table '{}' is not authorized; allowed tables: {}",
                        table,
                        self.catalog.allowed_tables().join(", ")
                    ),
                );
            }
        }

        // 9. LIMIT enforcement. The single place the validator rewrites
        //    semantics: no other layer can guarantee a row bound before
        //    execution.
        let sql = self.enforce_limit(sql);

        Verdict::Accepted { normalized_sql: sql }
    }

    fn enforce_limit(&self, mut sql: String) -> String {
        // The last LIMIT in the statement belongs to the outermost query.
        let last = LIMIT_RE
            .captures_iter(&sql)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|digits| (digits.range(), digits.as_str().parse::<u64>().ok()));

        match last {
            None => {
                sql.push_str(&format!(" limit {}", self.limits.default_limit));
                sql
            }
            Some((range, parsed)) => {
                // an unparseable number is astronomically large, clamp it too
                let over_bound = parsed.map(|n| n > self.limits.max_limit).unwrap_or(true);
                if over_bound {
                    sql.replace_range(range, &self.limits.max_limit.to_string());
                }
                sql
            }
        }
    }
}

/// Collapse whitespace runs to single spaces, trim, and lowercase everything
/// outside single-quoted string literals.
fn normalize(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut in_literal = false;
    for ch in collapsed.chars() {
        if ch == '\'' {
            in_literal = !in_literal;
            out.push(ch);
        } else if in_literal {
            out.push(ch);
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

fn starts_with_select(sql: &str) -> bool {
    match sql.strip_prefix("select") {
        None => false,
        Some(rest) => !rest
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_'),
    }
}

/// Identifiers following FROM or JOIN, deduplicated. Aliases after the table
/// name are ignored by construction of the capture.
fn referenced_tables(sql: &str) -> Vec<String> {
    TABLE_REF_RE
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
