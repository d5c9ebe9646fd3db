use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, Error as RusqliteError};

use crate::error::{BookkeepingError, InvalidTableName};
use crate::script::{Script, UpgradeRecord};

use super::{bookkeeping_failure, ensure_next_version, table_exists, VersionStore};

/// Tracks versions in a table with one row per applied script:
///
/// | column            | meaning                              |
/// |-------------------|--------------------------------------|
/// | version_number    | primary key                          |
/// | source_identifier | source that contributed the script   |
/// | script_name       | script name                          |
/// | checksum          | SHA-256 of the contents when applied |
/// | applied_at        | unix seconds, UTC                    |
///
/// The current version is the highest recorded `version_number`.
#[derive(Clone, Debug)]
pub struct TableVersionStore {
    table: String,
}

impl TableVersionStore {
    pub const DEFAULT_TABLE: &'static str = "schema_versions";

    pub fn new() -> Self {
        Self {
            table: Self::DEFAULT_TABLE.to_owned(),
        }
    }

    /// Only plain identifiers are accepted. Keywords such as `order` are
    /// fine since the name is always quoted in SQL.
    pub fn with_table(table: &str) -> Result<Self, InvalidTableName> {
        if !Self::is_valid_table_name(table) {
            return Err(InvalidTableName(table.to_owned()));
        }
        Ok(Self {
            table: table.to_owned(),
        })
    }

    pub fn is_valid_table_name(table: &str) -> bool {
        let mut chars = table.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table.replace('"', "\"\""))
    }

    fn create_table(&self, conn: &Connection) -> Result<(), RusqliteError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version_number INTEGER PRIMARY KEY,
                source_identifier TEXT NOT NULL,
                script_name TEXT NOT NULL,
                checksum TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            );",
            self.quoted_table()
        ))
    }
}

impl Default for TableVersionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionStore for TableVersionStore {
    fn recall_version_number(&self, conn: &Connection) -> Result<u32, RusqliteError> {
        if !table_exists(conn, &self.table)? {
            debug!("Version table '{}' does not exist yet", self.table);
            return Ok(0);
        }

        conn.query_row(
            &format!("SELECT COALESCE(MAX(version_number), 0) FROM {}", self.quoted_table()),
            [],
            |row| row.get(0),
        )
    }

    fn store_upgrade(&self, conn: &Connection, script: &Script) -> Result<(), BookkeepingError> {
        let current = self
            .recall_version_number(conn)
            .map_err(|e| bookkeeping_failure(script, e))?;
        ensure_next_version(script, current)?;

        self.create_table(conn)
            .map_err(|e| bookkeeping_failure(script, e))?;

        conn.execute(
            &format!(
                "INSERT INTO {} (version_number, source_identifier, script_name, checksum, applied_at)
                 VALUES (?, ?, ?, ?, ?)",
                self.quoted_table()
            ),
            params![
                script.version_number(),
                script.source_identifier(),
                script.name(),
                script.checksum(),
                Utc::now().timestamp(),
            ],
        )
        .map_err(|e| bookkeeping_failure(script, e))?;

        Ok(())
    }

    fn history(&self, conn: &Connection) -> Result<Vec<UpgradeRecord>, RusqliteError> {
        if !table_exists(conn, &self.table)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT version_number, source_identifier, script_name, checksum, applied_at
            FROM {}
            ORDER BY version_number ASC",
            self.quoted_table()
        ))?;

        let rows = stmt.query_map([], |row| {
            let applied_at: i64 = row.get(4)?;
            Ok(UpgradeRecord {
                version_number: row.get(0)?,
                source_identifier: row.get(1)?,
                script_name: row.get(2)?,
                checksum: row.get(3)?,
                applied_at: DateTime::from_timestamp(applied_at, 0).unwrap_or_default(),
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
