mod directory;
mod embedded;
mod memory;

use std::collections::BTreeMap;

use log::debug;

use crate::error::CatalogError;
use crate::script::Script;

pub use directory::DirectorySource;
pub use embedded::EmbeddedSource;
pub use memory::MemorySource;

/// A place upgrade scripts come from: a directory, an embedded bundle, or
/// an in-memory fixture.
///
/// Several sources may feed one database. Version numbers are global across
/// sources, so two sources may never claim the same version.
pub trait ScriptSource {
    /// Identifier recorded with every script this source contributes.
    fn identifier(&self) -> &str;

    /// Every script this source currently provides, in any order.
    fn scripts(&self) -> Result<Vec<Script>, CatalogError>;
}

/// The ordered set of available scripts, keyed by version.
#[derive(Debug, Default)]
pub struct ScriptCatalog {
    scripts: BTreeMap<u32, Script>,
}

impl ScriptCatalog {
    /// Enumerate all sources and index their scripts by version.
    ///
    /// Fails on version 0 and on any version claimed twice, whether by one
    /// source or by two.
    pub fn load(sources: &[&dyn ScriptSource]) -> Result<Self, CatalogError> {
        let mut catalog = ScriptCatalog::default();

        for source in sources {
            let scripts = source.scripts()?;
            debug!(
                "Script source '{}' provided {} script(s)",
                source.identifier(),
                scripts.len()
            );
            for script in scripts {
                catalog.insert(script)?;
            }
        }

        Ok(catalog)
    }

    fn insert(&mut self, script: Script) -> Result<(), CatalogError> {
        if script.version_number() == 0 {
            return Err(CatalogError::InvalidVersion {
                source_id: script.source_identifier().to_owned(),
                name: script.name().to_owned(),
            });
        }

        if let Some(existing) = self.scripts.get(&script.version_number()) {
            return Err(CatalogError::DuplicateVersion {
                version: script.version_number(),
                first: existing.name().to_owned(),
                second: script.name().to_owned(),
            });
        }

        self.scripts.insert(script.version_number(), script);
        Ok(())
    }

    /// Highest version in the catalog, or 0 if it is empty.
    pub fn highest_script_version(&self) -> u32 {
        self.scripts.keys().next_back().copied().unwrap_or(0)
    }

    /// The script at exactly `version`. A missing version is an error, never
    /// skipped: the applied set must stay gap-free.
    pub fn get_script(&self, version: u32) -> Result<&Script, CatalogError> {
        let script = self
            .scripts
            .get(&version)
            .ok_or(CatalogError::NotFound(version))?;

        if script.contents().trim().is_empty() {
            return Err(CatalogError::MalformedScript {
                version,
                name: script.name().to_owned(),
            });
        }

        Ok(script)
    }

    pub fn versions(&self) -> Vec<u32> {
        self.scripts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
