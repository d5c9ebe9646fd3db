mod meta;
mod table;

use rusqlite::{Connection, Error as RusqliteError};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{BookkeepingError, SchemupError};
use crate::script::{Script, UpgradeRecord};

pub use meta::MetaVersionStore;
pub use table::TableVersionStore;

/// Reads and writes the schema version persisted in the target database.
///
/// Implementations must return 0 from `recall_version_number` on a database
/// that has never been upgraded, and must refuse to record anything other
/// than the next version in sequence.
pub trait VersionStore {
    fn recall_version_number(&self, conn: &Connection) -> Result<u32, RusqliteError>;

    /// Record that `script` has been applied. The tracked version becomes
    /// exactly `script.version_number()`.
    fn store_upgrade(&self, conn: &Connection, script: &Script) -> Result<(), BookkeepingError>;

    /// Applied scripts in ascending version order, for stores that keep one
    /// row per script.
    fn history(&self, _conn: &Connection) -> Result<Vec<UpgradeRecord>, RusqliteError> {
        Ok(Vec::new())
    }
}

impl<S: VersionStore + ?Sized> VersionStore for Box<S> {
    fn recall_version_number(&self, conn: &Connection) -> Result<u32, RusqliteError> {
        (**self).recall_version_number(conn)
    }

    fn store_upgrade(&self, conn: &Connection, script: &Script) -> Result<(), BookkeepingError> {
        (**self).store_upgrade(conn, script)
    }

    fn history(&self, conn: &Connection) -> Result<Vec<UpgradeRecord>, RusqliteError> {
        (**self).history(conn)
    }
}

/// How the version is tracked in the database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackingKind {
    /// One row per applied script in a version table.
    #[default]
    Table,
    /// A single `schema_version` value in a `meta` key/value table.
    Meta,
}

impl TrackingKind {
    /// `table` names the version table; the meta store ignores it.
    pub fn build(self, table: &str) -> Result<Box<dyn VersionStore>, SchemupError> {
        match self {
            TrackingKind::Table => Ok(Box::new(TableVersionStore::with_table(table)?)),
            TrackingKind::Meta => Ok(Box::new(MetaVersionStore::new())),
        }
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool, RusqliteError> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Guards the no-gap, no-duplicate invariant of the applied set.
pub(crate) fn ensure_next_version(script: &Script, current: u32) -> Result<(), BookkeepingError> {
    if current.checked_add(1) == Some(script.version_number()) {
        Ok(())
    } else {
        Err(BookkeepingError::OutOfOrder {
            script_name: script.name().to_owned(),
            version: script.version_number(),
            current,
        })
    }
}

pub(crate) fn bookkeeping_failure(script: &Script, cause: RusqliteError) -> BookkeepingError {
    BookkeepingError::Database {
        script_name: script.name().to_owned(),
        version: script.version_number(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_kind_parse_and_display() {
        assert_eq!("table".parse::<TrackingKind>().unwrap(), TrackingKind::Table);
        assert_eq!("meta".parse::<TrackingKind>().unwrap(), TrackingKind::Meta);
        assert!("rows".parse::<TrackingKind>().is_err());
        assert_eq!(TrackingKind::Meta.to_string(), "meta");
        assert_eq!(TrackingKind::default(), TrackingKind::Table);
    }

    #[test]
    fn test_ensure_next_version() {
        let script = Script::new(3, "s3", "src", "SELECT 3;");
        assert!(ensure_next_version(&script, 2).is_ok());
        assert!(matches!(
            ensure_next_version(&script, 3),
            Err(BookkeepingError::OutOfOrder { version: 3, current: 3, .. })
        ));
        assert!(ensure_next_version(&script, 1).is_err());
        assert!(ensure_next_version(&script, 5).is_err());
    }

    #[test]
    fn test_table_exists() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!table_exists(&conn, "Foo").unwrap());
        conn.execute_batch("CREATE TABLE Foo (Name TEXT);").unwrap();
        assert!(table_exists(&conn, "Foo").unwrap());
        assert!(table_exists(&conn, "FOO").unwrap());
    }
}
