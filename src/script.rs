use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// An immutable, versioned unit of upgrade work.
///
/// Scripts are built by a [`ScriptSource`](crate::catalog::ScriptSource) when the
/// catalog is loaded. The contents are opaque here; only a
/// [`ScriptRunner`](crate::runner::ScriptRunner) interprets them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Script {
    version_number: u32,
    name: String,
    source_identifier: String,
    #[serde(skip)]
    contents: String,
}

impl Script {
    pub fn new(
        version_number: u32,
        name: impl Into<String>,
        source_identifier: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            version_number,
            name: name.into(),
            source_identifier: source_identifier.into(),
            contents: contents.into(),
        }
    }

    /// Name used when a source has nothing better: `<source>.<0000 version>`.
    pub fn default_name(source_identifier: &str, version_number: u32) -> String {
        format!("{}.{:04}", source_identifier, version_number)
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_identifier(&self) -> &str {
        &self.source_identifier
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// SHA-256 of the contents, lowercase hex. Stored with each upgrade record.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.contents.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// One persisted row per successfully applied script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradeRecord {
    pub version_number: u32,
    pub source_identifier: String,
    pub script_name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// Splits a script file name such as `0003_insert_goodbye.sql` into its
/// version and stem. Returns `None` if the name has no leading digits.
pub fn parse_script_file_name(file_name: &str) -> Option<(u32, &str)> {
    let stem = file_name.strip_suffix(".sql").unwrap_or(file_name);
    let digits = stem.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let version = stem[..digits].parse::<u32>().ok()?;
    Some((version, stem))
}

pub fn is_script_file_name(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}
