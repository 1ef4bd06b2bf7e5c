use std::sync::{Arc, Mutex};

use duckdb::Connection;
use r2d2::ManageConnection;

/// r2d2 adapter for DuckDB connections to the banking database.
///
/// DuckDB permits only one database instance per file, so the manager holds a
/// root connection and hands out `try_clone` handles that share it. Clones
/// are cheap and each pool slot gets its own independent session.
pub struct BankDbConnectionManager {
    root: Arc<Mutex<Connection>>,
}

impl BankDbConnectionManager {
    pub fn open(database_path: &str) -> Result<Self, duckdb::Error> {
        let root = Connection::open(database_path)?;
        Ok(Self {
            root: Arc::new(Mutex::new(root)),
        })
    }
}

impl ManageConnection for BankDbConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let root = match self.root.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        root.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
