use log::trace;
use rusqlite::Connection;

use crate::error::{ExecutionError, ScriptLocation};
use crate::script::Script;

use super::{execution_failure, ScriptRunner};

/// Splits a script into batches on separator lines (`GO` by default, matched
/// case-insensitively on a line of its own) and runs them in order inside a
/// single transaction.
///
/// A failure reports the failing batch and the line it starts on.
#[derive(Clone, Debug)]
pub struct SeparatedBatchRunner {
    separator: String,
}

/// One batch of a separated script.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Batch<'a> {
    pub index: usize,
    pub line: usize,
    pub sql: &'a str,
}

impl SeparatedBatchRunner {
    pub const DEFAULT_SEPARATOR: &'static str = "GO";

    pub fn new() -> Self {
        Self::with_separator(Self::DEFAULT_SEPARATOR)
    }

    pub fn with_separator(separator: &str) -> Self {
        Self {
            separator: separator.trim().to_owned(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    fn is_separator(&self, line: &str) -> bool {
        line.trim().eq_ignore_ascii_case(&self.separator)
    }

    /// Blank batches are dropped, but keep their index so reported batch
    /// numbers match what the author sees.
    pub(crate) fn split_batches<'a>(&self, contents: &'a str) -> Vec<Batch<'a>> {
        let mut batches = Vec::new();
        let mut index = 1;
        let mut start_line = 1;
        let mut start_byte = 0;
        let mut offset = 0;

        for (line_no, line) in contents.split_inclusive('\n').enumerate() {
            let line_no = line_no + 1;
            if self.is_separator(line) {
                push_batch(&mut batches, index, start_line, &contents[start_byte..offset]);
                index += 1;
                start_line = line_no + 1;
                start_byte = offset + line.len();
            }
            offset += line.len();
        }
        push_batch(&mut batches, index, start_line, &contents[start_byte..]);

        batches
    }
}

fn push_batch<'a>(batches: &mut Vec<Batch<'a>>, index: usize, line: usize, sql: &'a str) {
    if !sql.trim().is_empty() {
        batches.push(Batch { index, line, sql });
    }
}

impl Default for SeparatedBatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner for SeparatedBatchRunner {
    fn execute(&self, conn: &mut Connection, script: &Script) -> Result<(), ExecutionError> {
        let batches = self.split_batches(script.contents());
        trace!("Executing '{}' as {} batch(es)", script.name(), batches.len());

        let tx = conn
            .transaction()
            .map_err(|e| execution_failure(script, None, e))?;

        for batch in &batches {
            tx.execute_batch(batch.sql).map_err(|e| {
                let location = ScriptLocation {
                    batch: batch.index,
                    line: batch.line,
                };
                execution_failure(script, Some(location), e)
            })?;
        }

        tx.commit().map_err(|e| execution_failure(script, None, e))
    }
}
