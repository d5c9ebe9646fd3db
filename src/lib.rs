//! Versioned schema upgrades for SQLite databases.
//!
//! An [`Upgrader`] reads the current version from a [`VersionStore`], plans
//! the scripts between it and the target from a [`ScriptCatalog`], and applies
//! them one at a time through a [`ScriptRunner`], recording each success.
//! Re-running after a completed upgrade applies nothing.
//!
//! ```no_run
//! use schemup::{ConnectionDescriptor, DirectorySource, Upgrader};
//!
//! let upgrader = Upgrader::new().with_source(DirectorySource::new("app", "migrations"));
//! let result = upgrader
//!     .perform_upgrade(&ConnectionDescriptor::from("app.db"), None)
//!     .expect("upgrade failed");
//! println!("{} -> {}", result.original_version, result.upgraded_version);
//! ```

pub mod catalog;
pub mod connection;
pub mod error;
pub mod runner;
pub mod script;
pub mod store;
pub mod upgrader;

pub use catalog::{DirectorySource, EmbeddedSource, MemorySource, ScriptCatalog, ScriptSource};
pub use connection::ConnectionDescriptor;
pub use error::{
    BookkeepingError, CatalogError, ExecutionError, InvalidTableName, PreconditionError,
    ScriptLocation, SchemupError, UpgradeError, UpgradeFailure,
};
pub use runner::{BatchRunner, RunnerKind, ScriptRunner, SeparatedBatchRunner};
pub use script::{Script, UpgradeRecord};
pub use store::{MetaVersionStore, TableVersionStore, TrackingKind, VersionStore};
pub use upgrader::{UpgradePlan, UpgradeResult, Upgrader};
