use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::error::CatalogError;
use crate::script::{is_script_file_name, parse_script_file_name, Script};

use super::ScriptSource;

/// Reads `*.sql` files from a single directory (not recursive).
///
/// Each file name must start with its version, e.g. `0002_insert_hello.sql`.
/// The file stem becomes the script name. Files with other extensions are
/// ignored.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    identifier: String,
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(identifier: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            dir: dir.into(),
        }
    }

    /// Uses the directory's own name as the source identifier.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let identifier = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self { identifier, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unreadable(&self, reason: impl ToString) -> CatalogError {
        CatalogError::Unreadable {
            source_id: self.identifier.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ScriptSource for DirectorySource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn scripts(&self) -> Result<Vec<Script>, CatalogError> {
        debug!("Reading upgrade scripts from {}", self.dir.display());

        let entries = fs::read_dir(&self.dir)
            .map_err(|e| self.unreadable(format!("{}: {}", self.dir.display(), e)))?;

        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.unreadable(e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_script_file_name(&file_name) {
                trace!("Skipping non-script file {}", path.display());
                continue;
            }

            let (version, stem) = parse_script_file_name(&file_name).ok_or_else(|| {
                CatalogError::InvalidScriptName {
                    source_id: self.identifier.clone(),
                    file_name: file_name.clone(),
                }
            })?;

            let contents = fs::read_to_string(&path)
                .map_err(|e| self.unreadable(format!("{}: {}", path.display(), e)))?;

            scripts.push(Script::new(version, stem, self.identifier.clone(), contents));
        }

        Ok(scripts)
    }
}
