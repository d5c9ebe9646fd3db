use rusqlite::Error as RusqliteError;
use std::fmt;
use std::io;
use thiserror::Error;

use crate::script::Script;
use crate::upgrader::UpgradeResult;

/// Application-level error used by the command line front end.
#[derive(Error, Debug)]
pub enum SchemupError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError),

    #[error("Serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    #[error(transparent)]
    Failure(#[from] Box<UpgradeFailure>),

    #[error(transparent)]
    InvalidTableName(#[from] InvalidTableName),

    #[error("Error: {0}")]
    Error(String),
}

/// A version table name that is not a plain SQL identifier.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("'{0}' is not a valid version table name")]
pub struct InvalidTableName(pub String);

/// Problems with the set of available scripts. Always raised before any
/// script has been executed.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("script source '{source_id}' could not be read: {reason}")]
    Unreadable { source_id: String, reason: String },

    #[error("no upgrade script exists for version {0}")]
    NotFound(u32),

    #[error("version {version} is claimed by both '{first}' and '{second}'")]
    DuplicateVersion {
        version: u32,
        first: String,
        second: String,
    },

    #[error("script '{name}' from '{source_id}' has version 0; versions start at 1")]
    InvalidVersion { source_id: String, name: String },

    #[error("script file '{file_name}' in '{source_id}' does not start with a version number")]
    InvalidScriptName { source_id: String, file_name: String },

    #[error("script '{name}' (version {version}) has no contents")]
    MalformedScript { version: u32, name: String },
}

/// Where inside a script a failure happened, when the runner can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLocation {
    /// 1-based index of the batch that failed.
    pub batch: usize,
    /// 1-based line on which the failing batch starts.
    pub line: usize,
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {} starting at line {}", self.batch, self.line)
    }
}

#[derive(Error, Debug)]
#[error("script '{script_name}' (version {version}) failed{}: {cause}", location_suffix(.location))]
pub struct ExecutionError {
    pub script_name: String,
    pub version: u32,
    pub location: Option<ScriptLocation>,
    #[source]
    pub cause: RusqliteError,
}

fn location_suffix(location: &Option<ScriptLocation>) -> String {
    match location {
        Some(location) => format!(" in {}", location),
        None => String::new(),
    }
}

/// The script ran but its application could not be recorded. The schema may
/// have changed without the tracked version advancing, so the version table
/// must be reconciled by hand before the next run.
#[derive(Error, Debug)]
pub enum BookkeepingError {
    #[error(
        "script '{script_name}' (version {version}) was executed but could not be recorded: {cause}; \
         reconcile the version table before re-running"
    )]
    Database {
        script_name: String,
        version: u32,
        #[source]
        cause: RusqliteError,
    },

    #[error(
        "refusing to record script '{script_name}' as version {version}: the database is at version {current}"
    )]
    OutOfOrder {
        script_name: String,
        version: u32,
        current: u32,
    },
}

impl BookkeepingError {
    pub fn version(&self) -> u32 {
        match self {
            BookkeepingError::Database { version, .. } => *version,
            BookkeepingError::OutOfOrder { version, .. } => *version,
        }
    }
}

#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("target version {target} is beyond the highest known script version {highest}")]
    TargetBeyondCatalog { target: u32, highest: u32 },

    #[error("nothing to apply: the database is at version {current} and the target is {target}")]
    NoForwardProgress { current: u32, target: u32 },
}

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("could not open the target database: {0}")]
    Connection(#[source] RusqliteError),

    #[error("could not read the current schema version: {0}")]
    Recall(#[source] RusqliteError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("bookkeeping error: {0}")]
    Bookkeeping(#[from] BookkeepingError),

    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),
}

/// A run that stopped before reaching its target.
///
/// `progress` holds what was achieved before the failure. It is `None` only
/// when the run failed before the current version could be determined.
#[derive(Debug)]
pub struct UpgradeFailure {
    pub progress: Option<UpgradeResult>,
    pub error: UpgradeError,
}

impl fmt::Display for UpgradeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.progress {
            Some(progress) => write!(
                f,
                "upgrade stopped at version {} (started at {}, {} script(s) applied): {}",
                progress.upgraded_version,
                progress.original_version,
                progress.applied_scripts.len(),
                self.error
            ),
            None => write!(f, "upgrade failed: {}", self.error),
        }
    }
}

impl std::error::Error for UpgradeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl UpgradeFailure {
    pub fn new(progress: Option<UpgradeResult>, error: UpgradeError) -> Self {
        Self { progress, error }
    }

    pub fn error(&self) -> &UpgradeError {
        &self.error
    }

    pub fn original_version(&self) -> Option<u32> {
        self.progress.as_ref().map(|p| p.original_version)
    }

    /// Last version successfully recorded before the failure.
    pub fn upgraded_version(&self) -> Option<u32> {
        self.progress.as_ref().map(|p| p.upgraded_version)
    }

    pub fn applied_scripts(&self) -> &[Script] {
        self.progress
            .as_ref()
            .map(|p| p.applied_scripts.as_slice())
            .unwrap_or(&[])
    }

    /// Version of the script that failed to execute or to be recorded.
    pub fn failed_version(&self) -> Option<u32> {
        match &self.error {
            UpgradeError::Execution(e) => Some(e.version),
            UpgradeError::Bookkeeping(e) => Some(e.version()),
            _ => None,
        }
    }
}
