use serde::Serialize;

/// A single column in one of the queryable tables.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDescriptor {
    pub name: &'static str,
    pub data_type: &'static str,
}

/// A queryable table: name, human description, and ordered columns.
#[derive(Debug, Clone, Serialize)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: Vec<ColumnDescriptor>,
}

/// Immutable description of the tables the service may touch.
///
/// Built once at startup and shared read-only. Both the SQL generation prompt
/// and the validator whitelist derive from this object, so the two can never
/// drift apart.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    tables: Vec<TableDescriptor>,
}

fn column(name: &'static str, data_type: &'static str) -> ColumnDescriptor {
    ColumnDescriptor { name, data_type }
}

impl SchemaCatalog {
    /// The fixed banking schema: customers, accounts, transactions.
    pub fn banking() -> Self {
        let tables = vec![
            TableDescriptor {
                name: "customers",
                description: "Customer information including name and email",
                columns: vec![
                    column("id", "INTEGER PRIMARY KEY"),
                    column("name", "VARCHAR NOT NULL"),
                    column("email", "VARCHAR NOT NULL UNIQUE"),
                    column("created_at", "TIMESTAMP"),
                ],
            },
            TableDescriptor {
                name: "accounts",
                description: "Bank accounts associated with customers",
                columns: vec![
                    column("id", "INTEGER PRIMARY KEY"),
                    column("customer_id", "INTEGER REFERENCES customers(id)"),
                    column("account_number", "VARCHAR NOT NULL UNIQUE"),
                    column("balance", "DECIMAL(15,2)"),
                    column("created_at", "TIMESTAMP"),
                ],
            },
            TableDescriptor {
                name: "transactions",
                description: "All banking transactions (credits and debits)",
                columns: vec![
                    column("id", "INTEGER PRIMARY KEY"),
                    column("account_id", "INTEGER REFERENCES accounts(id)"),
                    column("type", "VARCHAR CHECK (type IN ('credit','debit'))"),
                    column("amount", "DECIMAL(15,2)"),
                    column("created_at", "TIMESTAMP"),
                ],
            },
        ];
        Self { tables }
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Canonical (lowercase) names of every table a query may reference.
    pub fn allowed_tables(&self) -> Vec<&'static str> {
        self.tables.iter().map(|t| t.name).collect()
    }

    /// Case-insensitive membership test.
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Markdown rendering injected into the LLM prompts. Must stay in sync
    /// with the validator whitelist by construction.
    pub fn as_prompt_text(&self) -> String {
        let mut out = String::from("# Banking Database Schema\n\n");
        for table in &self.tables {
            out.push_str(&format!("## Table: {}\n", table.name));
            out.push_str(&format!("Description: {}\n", table.description));
            out.push_str("Columns:\n");
            for col in &table.columns {
                out.push_str(&format!("  - {}: {}\n", col.name, col.data_type));
            }
            out.push('\n');
        }
        out
    }
}
