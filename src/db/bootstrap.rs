use duckdb::Connection;
use tracing::info;

use crate::db::DbPool;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS customers (
    id          INTEGER PRIMARY KEY,
    name        VARCHAR NOT NULL,
    email       VARCHAR NOT NULL UNIQUE,
    created_at  TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id              INTEGER PRIMARY KEY,
    customer_id     INTEGER NOT NULL REFERENCES customers(id),
    account_number  VARCHAR NOT NULL UNIQUE,
    balance         DECIMAL(15,2) NOT NULL DEFAULT 0,
    created_at      TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id          INTEGER PRIMARY KEY,
    account_id  INTEGER NOT NULL REFERENCES accounts(id),
    type        VARCHAR NOT NULL CHECK (type IN ('credit', 'debit')),
    amount      DECIMAL(15,2) NOT NULL,
    created_at  TIMESTAMP NOT NULL
);
";

// Deterministic demo dataset. Contract tests depend on the exact customer
// count, so the seed is fixed rather than generated.
const SEED_SQL: &str = "
INSERT INTO customers (id, name, email, created_at) VALUES
    (1, 'Alice Johnson',  'alice@example.com',  '2024-01-15 09:30:00'),
    (2, 'Bob Smith',      'bob@example.com',    '2024-02-20 14:05:00'),
    (3, 'Carol Williams', 'carol@example.com',  '2024-04-02 11:45:00'),
    (4, 'David Brown',    'david@example.com',  '2024-06-18 16:20:00'),
    (5, 'Eva Martinez',   'eva@example.com',    '2024-09-09 08:10:00');

INSERT INTO accounts (id, customer_id, account_number, balance, created_at) VALUES
    (1, 1, 'ACC-1001', 15000.00, '2024-01-16 10:00:00'),
    (2, 1, 'ACC-1002',  3200.50, '2024-01-20 10:00:00'),
    (3, 2, 'ACC-1003', 22000.00, '2024-02-21 09:00:00'),
    (4, 3, 'ACC-1004',  8750.25, '2024-04-03 12:00:00'),
    (5, 3, 'ACC-1005',   640.00, '2024-05-11 12:00:00'),
    (6, 4, 'ACC-1006', 31000.00, '2024-06-19 15:30:00'),
    (7, 5, 'ACC-1007',  4500.75, '2024-09-10 09:15:00'),
    (8, 5, 'ACC-1008',  1250.00, '2024-10-01 09:15:00');

INSERT INTO transactions (id, account_id, type, amount, created_at) VALUES
    ( 1, 1, 'credit', 2500.00, '2025-01-03 09:12:00'),
    ( 2, 1, 'debit',   120.40, '2025-01-05 18:40:00'),
    ( 3, 2, 'debit',    64.99, '2025-01-07 12:03:00'),
    ( 4, 3, 'credit', 5400.00, '2025-01-10 08:55:00'),
    ( 5, 3, 'debit',   899.00, '2025-01-12 20:17:00'),
    ( 6, 4, 'credit', 1200.00, '2025-01-15 10:30:00'),
    ( 7, 4, 'debit',   230.10, '2025-01-18 13:44:00'),
    ( 8, 5, 'debit',    45.00, '2025-01-21 07:28:00'),
    ( 9, 6, 'credit', 8000.00, '2025-01-25 11:02:00'),
    (10, 6, 'debit',  1750.00, '2025-01-28 16:36:00'),
    (11, 7, 'credit',  980.00, '2025-02-01 09:50:00'),
    (12, 7, 'debit',    17.25, '2025-02-03 19:05:00'),
    (13, 8, 'credit',  300.00, '2025-02-06 14:12:00'),
    (14, 8, 'debit',    88.60, '2025-02-08 21:47:00');
";

/// Create the banking tables if absent and seed the demo dataset exactly once.
pub fn initialize(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get()?;

    conn.execute_batch(SCHEMA_SQL)?;

    let customer_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))?;
    if customer_count == 0 {
        conn.execute_batch(SEED_SQL)?;
        info!("seeded demo banking dataset");
    } else {
        info!(customers = customer_count, "banking dataset already present");
    }

    Ok(())
}

/// Tables visible in the main schema, for the health endpoint.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'main' ORDER BY table_name",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// Cheap liveness probe used by the health endpoint.
pub fn ping(conn: &Connection) -> bool {
    conn.execute_batch("SELECT 1").is_ok()
}
