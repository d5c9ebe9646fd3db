mod batch;
mod separated;

use rusqlite::{Connection, Error as RusqliteError};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{ExecutionError, ScriptLocation};
use crate::script::Script;

pub use batch::BatchRunner;
pub use separated::SeparatedBatchRunner;

/// Executes one script against the target as a single unit of work.
///
/// A failed script must leave nothing committed past the boundary the
/// runner guarantees, and is never retried.
pub trait ScriptRunner {
    fn execute(&self, conn: &mut Connection, script: &Script) -> Result<(), ExecutionError>;
}

impl<R: ScriptRunner + ?Sized> ScriptRunner for Box<R> {
    fn execute(&self, conn: &mut Connection, script: &Script) -> Result<(), ExecutionError> {
        (**self).execute(conn, script)
    }
}

/// Selects a [`ScriptRunner`] from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunnerKind {
    /// The whole script is one batch.
    #[default]
    Batch,
    /// The script is split into batches on separator lines such as `GO`.
    Separated,
}

impl RunnerKind {
    pub fn build(self, separator: &str) -> Box<dyn ScriptRunner> {
        match self {
            RunnerKind::Batch => Box::new(BatchRunner),
            RunnerKind::Separated => Box::new(SeparatedBatchRunner::with_separator(separator)),
        }
    }
}

pub(crate) fn execution_failure(
    script: &Script,
    location: Option<ScriptLocation>,
    cause: RusqliteError,
) -> ExecutionError {
    ExecutionError {
        script_name: script.name().to_owned(),
        version: script.version_number(),
        location,
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_kind_from_str() {
        assert_eq!("batch".parse::<RunnerKind>().unwrap(), RunnerKind::Batch);
        assert_eq!("separated".parse::<RunnerKind>().unwrap(), RunnerKind::Separated);
        assert!("parallel".parse::<RunnerKind>().is_err());
        assert_eq!(RunnerKind::Separated.as_ref(), "separated");
    }

    #[test]
    fn test_built_runners_execute() {
        for kind in [RunnerKind::Batch, RunnerKind::Separated] {
            let mut conn = Connection::open_in_memory().unwrap();
            let runner = kind.build("GO");
            let script = Script::new(1, "create", "test", "CREATE TABLE Foo (Name TEXT);");
            runner.execute(&mut conn, &script).unwrap();

            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE name = 'Foo'",
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "runner {} did not create the table", kind);
        }
    }
}
