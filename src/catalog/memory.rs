use crate::error::CatalogError;
use crate::script::Script;

use super::ScriptSource;

/// Scripts held in memory. Used for fixtures and for programs that build
/// their upgrade scripts in code.
#[derive(Clone, Debug)]
pub struct MemorySource {
    identifier: String,
    scripts: Vec<Script>,
}

impl MemorySource {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            scripts: Vec::new(),
        }
    }

    /// Add a script named `<identifier>.<0000 version>`.
    pub fn with_script(self, version: u32, contents: impl Into<String>) -> Self {
        let name = Script::default_name(&self.identifier, version);
        self.with_named_script(version, name, contents)
    }

    pub fn with_named_script(
        mut self,
        version: u32,
        name: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        let script = Script::new(version, name, self.identifier.clone(), contents);
        self.scripts.push(script);
        self
    }
}

impl ScriptSource for MemorySource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn scripts(&self) -> Result<Vec<Script>, CatalogError> {
        Ok(self.scripts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_default_names() {
        let source = MemorySource::new("app")
            .with_script(1, "SELECT 1;")
            .with_named_script(2, "add_users", "SELECT 2;");

        let scripts = source.scripts().unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].name(), "app.0001");
        assert_eq!(scripts[1].name(), "add_users");
        assert!(scripts.iter().all(|s| s.source_identifier() == "app"));
    }

    #[test]
    fn test_duplicates_are_kept_for_the_catalog_to_reject() {
        let source = MemorySource::new("app")
            .with_script(1, "SELECT 1;")
            .with_script(1, "SELECT 'again';");
        assert_eq!(source.scripts().unwrap().len(), 2);
    }
}
