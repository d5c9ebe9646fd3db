use log::{error, info, warn, Level};
use logging_timer::timer;
use rusqlite::Connection;
use serde::Serialize;

use crate::catalog::{ScriptCatalog, ScriptSource};
use crate::connection::ConnectionDescriptor;
use crate::error::{PreconditionError, UpgradeError, UpgradeFailure};
use crate::runner::{BatchRunner, ScriptRunner};
use crate::script::{Script, UpgradeRecord};
use crate::store::{TableVersionStore, VersionStore};

/// Outcome of one upgrade run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradeResult {
    pub original_version: u32,
    /// Last version successfully recorded, or `original_version` if nothing
    /// was applied.
    pub upgraded_version: u32,
    /// Scripts applied by this run, in the order they were applied.
    pub applied_scripts: Vec<Script>,
}

impl UpgradeResult {
    fn starting_at(version: u32) -> Self {
        Self {
            original_version: version,
            upgraded_version: version,
            applied_scripts: Vec::new(),
        }
    }

    pub fn applied_versions(&self) -> Vec<u32> {
        self.applied_scripts
            .iter()
            .map(|s| s.version_number())
            .collect()
    }
}

/// The scripts a run would apply, without applying them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradePlan {
    pub current_version: u32,
    pub target_version: u32,
    pub scripts: Vec<Script>,
}

impl UpgradePlan {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Brings a database from its recorded version up to a target version.
///
/// Each run reads the current version from the [`VersionStore`], plans the
/// gap-free sequence `current + 1 ..= target` from the [`ScriptCatalog`],
/// then executes and records each script in ascending order. The first
/// failure stops the run; scripts recorded before it stay applied.
///
/// Runs are not serialized against each other. At most one upgrader may
/// act on a given database at a time.
pub struct Upgrader {
    sources: Vec<Box<dyn ScriptSource>>,
    store: Box<dyn VersionStore>,
    runner: Box<dyn ScriptRunner>,
    require_forward_progress: bool,
}

impl Default for Upgrader {
    fn default() -> Self {
        Self::new()
    }
}

impl Upgrader {
    /// No sources, a [`TableVersionStore`] and a [`BatchRunner`].
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            store: Box::new(TableVersionStore::new()),
            runner: Box::new(BatchRunner),
            require_forward_progress: false,
        }
    }

    pub fn with_source(mut self, source: impl ScriptSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_store(mut self, store: impl VersionStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn with_runner(mut self, runner: impl ScriptRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Treat a run with nothing to apply as a
    /// [`PreconditionError::NoForwardProgress`] instead of a no-op.
    pub fn require_forward_progress(mut self, require: bool) -> Self {
        self.require_forward_progress = require;
        self
    }

    /// Read every source. Sources are re-read on each call so scripts added
    /// between runs are picked up.
    pub fn load_catalog(&self) -> Result<ScriptCatalog, UpgradeError> {
        let sources: Vec<&dyn ScriptSource> = self.sources.iter().map(|s| s.as_ref()).collect();
        Ok(ScriptCatalog::load(&sources)?)
    }

    pub fn current_version(&self, conn: &Connection) -> Result<u32, UpgradeError> {
        self.store
            .recall_version_number(conn)
            .map_err(UpgradeError::Recall)
    }

    pub fn history(&self, conn: &Connection) -> Result<Vec<UpgradeRecord>, UpgradeError> {
        self.store.history(conn).map_err(UpgradeError::Recall)
    }

    /// Compute what a run would do without touching the database.
    pub fn plan(&self, conn: &Connection, target: Option<u32>) -> Result<UpgradePlan, UpgradeError> {
        let current = self.current_version(conn)?;
        self.plan_from(current, target)
    }

    /// Open the database described by `descriptor`, upgrade it, and close it.
    pub fn perform_upgrade(
        &self,
        descriptor: &ConnectionDescriptor,
        target: Option<u32>,
    ) -> Result<UpgradeResult, UpgradeFailure> {
        let mut conn = descriptor
            .open()
            .map_err(|e| UpgradeFailure::new(None, UpgradeError::Connection(e)))?;

        self.upgrade(&mut conn, target)
    }

    /// Upgrade through a connection owned by the caller.
    ///
    /// `target` of `None` means the highest version in the catalog.
    pub fn upgrade(
        &self,
        conn: &mut Connection,
        target: Option<u32>,
    ) -> Result<UpgradeResult, UpgradeFailure> {
        let original = self
            .current_version(conn)
            .map_err(|e| UpgradeFailure::new(None, e))?;

        let mut result = UpgradeResult::starting_at(original);

        match self.run(conn, target, &mut result) {
            Ok(()) => {
                if result.applied_scripts.is_empty() {
                    info!("Database is up to date at version {}", result.upgraded_version);
                } else {
                    info!(
                        "Upgraded database from version {} to {} ({} script(s))",
                        result.original_version,
                        result.upgraded_version,
                        result.applied_scripts.len()
                    );
                }
                Ok(result)
            }
            Err(e) => {
                error!(
                    "Upgrade stopped at version {} (started at {}): {}",
                    result.upgraded_version, result.original_version, e
                );
                Err(UpgradeFailure::new(Some(result), e))
            }
        }
    }

    fn run(
        &self,
        conn: &mut Connection,
        target: Option<u32>,
        result: &mut UpgradeResult,
    ) -> Result<(), UpgradeError> {
        let plan = self.plan_from(result.original_version, target)?;

        for script in plan.scripts {
            let _tmr = timer!(Level::Debug; "Upgrader::apply_script", "{}", script.name());
            info!(
                "Applying version {} '{}' from '{}'",
                script.version_number(),
                script.name(),
                script.source_identifier()
            );

            self.runner.execute(conn, &script)?;
            self.store.store_upgrade(conn, &script)?;

            result.upgraded_version = script.version_number();
            result.applied_scripts.push(script);
        }

        Ok(())
    }

    fn plan_from(&self, current: u32, target: Option<u32>) -> Result<UpgradePlan, UpgradeError> {
        let catalog = self.load_catalog()?;
        let highest = catalog.highest_script_version();

        let target_version = match target {
            Some(target) if target > highest => {
                return Err(PreconditionError::TargetBeyondCatalog { target, highest }.into());
            }
            Some(target) => target,
            None => highest,
        };

        if target_version <= current {
            if self.require_forward_progress {
                return Err(PreconditionError::NoForwardProgress {
                    current,
                    target: target_version,
                }
                .into());
            }
            if current > highest {
                warn!(
                    "Database version {} is ahead of the highest known script version {}",
                    current, highest
                );
            } else if target_version < current {
                warn!(
                    "Target version {} is below the current version {}; downgrades are not supported",
                    target_version, current
                );
            }
            return Ok(UpgradePlan {
                current_version: current,
                target_version,
                scripts: Vec::new(),
            });
        }

        // Resolve every script up front so a hole in the catalog fails the
        // run before anything executes.
        let scripts = (current + 1..=target_version)
            .map(|version| catalog.get_script(version).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UpgradePlan {
            current_version: current,
            target_version,
            scripts,
        })
    }
}
