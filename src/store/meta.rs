use rusqlite::types::Type;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

use crate::error::BookkeepingError;
use crate::script::Script;

use super::{bookkeeping_failure, ensure_next_version, table_exists, VersionStore};

/// Tracks the version as a single value in a `meta (key, value)` table under
/// the `schema_version` key. Keeps no per-script history.
#[derive(Clone, Debug, Default)]
pub struct MetaVersionStore;

impl MetaVersionStore {
    const META_TABLE: &'static str = "meta";
    const VERSION_KEY: &'static str = "schema_version";

    pub fn new() -> Self {
        MetaVersionStore
    }
}

impl VersionStore for MetaVersionStore {
    fn recall_version_number(&self, conn: &Connection) -> Result<u32, RusqliteError> {
        if !table_exists(conn, Self::META_TABLE)? {
            return Ok(0);
        }

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                [Self::VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .map_err(|e| RusqliteError::FromSqlConversionFailure(0, Type::Text, Box::new(e))),
            None => Ok(0),
        }
    }

    fn store_upgrade(&self, conn: &Connection, script: &Script) -> Result<(), BookkeepingError> {
        let current = self
            .recall_version_number(conn)
            .map_err(|e| bookkeeping_failure(script, e))?;
        ensure_next_version(script, current)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| bookkeeping_failure(script, e))?;

        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
            params![Self::VERSION_KEY, script.version_number().to_string()],
        )
        .map_err(|e| bookkeeping_failure(script, e))?;

        Ok(())
    }
}
