use std::marker::PhantomData;

use rust_embed::RustEmbed;

use crate::error::CatalogError;
use crate::script::{is_script_file_name, parse_script_file_name, Script};

use super::ScriptSource;

/// Scripts compiled into the binary with `rust-embed`.
///
/// Follows the same naming rule as [`DirectorySource`](super::DirectorySource):
/// `0001_create_foo.sql` is version 1 named `0001_create_foo`. Files in
/// sub-folders of the embedded folder are ignored.
///
/// ```ignore
/// #[derive(RustEmbed)]
/// #[folder = "migrations/"]
/// struct Migrations;
///
/// let source = EmbeddedSource::<Migrations>::new("app");
/// ```
pub struct EmbeddedSource<E: RustEmbed> {
    identifier: String,
    _bundle: PhantomData<E>,
}

impl<E: RustEmbed> EmbeddedSource<E> {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            _bundle: PhantomData,
        }
    }
}

impl<E: RustEmbed> ScriptSource for EmbeddedSource<E> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn scripts(&self) -> Result<Vec<Script>, CatalogError> {
        let mut scripts = Vec::new();

        for file_path in E::iter() {
            if file_path.contains('/') || !is_script_file_name(&file_path) {
                continue;
            }

            let (version, stem) = parse_script_file_name(&file_path).ok_or_else(|| {
                CatalogError::InvalidScriptName {
                    source_id: self.identifier.clone(),
                    file_name: file_path.to_string(),
                }
            })?;

            let file = E::get(&file_path).ok_or_else(|| CatalogError::Unreadable {
                source_id: self.identifier.clone(),
                reason: format!("embedded file '{}' disappeared", file_path),
            })?;

            let contents = String::from_utf8(file.data.into_owned()).map_err(|e| {
                CatalogError::Unreadable {
                    source_id: self.identifier.clone(),
                    reason: format!("{} is not valid UTF-8: {}", file_path, e),
                }
            })?;

            scripts.push(Script::new(version, stem, self.identifier.clone(), contents));
        }

        Ok(scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScriptCatalog;
    use pretty_assertions::assert_eq;

    #[derive(RustEmbed)]
    #[folder = "tests/fixtures/foo/"]
    struct FooScripts;

    #[derive(RustEmbed)]
    #[folder = "tests/fixtures/unversioned/"]
    struct UnversionedScripts;

    #[derive(RustEmbed)]
    #[folder = "tests/fixtures/binary/"]
    struct BinaryScripts;

    #[test]
    fn test_embedded_fixture_scripts() {
        let source = EmbeddedSource::<FooScripts>::new("foo");
        let catalog = ScriptCatalog::load(&[&source]).unwrap();

        assert_eq!(catalog.versions(), vec![1, 2, 3]);
        let first = catalog.get_script(1).unwrap();
        assert_eq!(first.name(), "0001_create_foo");
        assert_eq!(first.source_identifier(), "foo");
        assert!(first.contents().contains("CREATE TABLE Foo"));
    }

    #[test]
    fn test_script_without_version_prefix_is_rejected() {
        let source = EmbeddedSource::<UnversionedScripts>::new("loose");
        match source.scripts() {
            Err(CatalogError::InvalidScriptName { source_id, file_name }) => {
                assert_eq!(source_id, "loose");
                assert_eq!(file_name, "create_foo.sql");
            }
            other => panic!("expected InvalidScriptName, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_non_utf8_script_is_unreadable() {
        let source = EmbeddedSource::<BinaryScripts>::new("blob");
        match source.scripts() {
            Err(CatalogError::Unreadable { source_id, reason }) => {
                assert_eq!(source_id, "blob");
                assert!(reason.contains("0001_blob.sql"), "{reason}");
            }
            other => panic!("expected Unreadable, got {:?}", other.map(|s| s.len())),
        }
    }
}
