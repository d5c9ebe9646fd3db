use log::trace;
use rusqlite::Connection;

use crate::error::ExecutionError;
use crate::script::Script;

use super::{execution_failure, ScriptRunner};

/// Runs the whole script with `execute_batch` inside one transaction.
///
/// Scripts must not manage their own transactions (`BEGIN`/`COMMIT`); the
/// runner owns the boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchRunner;

impl ScriptRunner for BatchRunner {
    fn execute(&self, conn: &mut Connection, script: &Script) -> Result<(), ExecutionError> {
        trace!("Executing '{}' as a single batch", script.name());

        let tx = conn
            .transaction()
            .map_err(|e| execution_failure(script, None, e))?;

        // Dropping the transaction on error rolls it back
        tx.execute_batch(script.contents())
            .map_err(|e| execution_failure(script, None, e))?;

        tx.commit().map_err(|e| execution_failure(script, None, e))
    }
}
