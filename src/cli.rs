use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{debug, info};

use schemup::catalog::DirectorySource;
use schemup::connection::ConnectionDescriptor;
use schemup::error::SchemupError;
use schemup::upgrader::{UpgradeResult, Upgrader};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "schemup",
    version,
    about = "schemup: bring a SQLite database up to the latest schema version"
)]
pub struct Cli {
    /// Database file, or ":memory:" (overrides database.path)
    #[arg(long = "db", short = 'd', global = true)]
    pub db: Option<String>,

    /// Directory of numbered .sql upgrade scripts (overrides scripts.directory)
    #[arg(long = "scripts", short = 's', global = true)]
    pub scripts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending upgrade scripts (default if no command specified)
    Upgrade {
        /// Stop at this version instead of the latest script
        #[arg(long = "target", short = 't')]
        target: Option<u32>,

        /// Show the scripts that would run without running them
        #[arg(long = "dry-run", default_value_t = false)]
        dry_run: bool,

        /// Print the result as JSON
        #[arg(long = "json", default_value_t = false)]
        json: bool,
    },

    /// Show the current version and the pending scripts
    Status,

    /// List the scripts recorded as applied
    History {
        /// Print the history as JSON
        #[arg(long = "json", default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    pub fn handle_command_line(config: &Config) -> Result<(), SchemupError> {
        let args = Cli::parse();
        args.run(config)
    }

    fn run(self, config: &Config) -> Result<(), SchemupError> {
        let descriptor =
            ConnectionDescriptor::from(self.db.as_deref().unwrap_or(&config.database.path));
        let upgrader = self.build_upgrader(config)?;

        // Default to Upgrade if no command specified
        let command = self.command.unwrap_or(Command::Upgrade {
            target: None,
            dry_run: false,
            json: false,
        });

        match command {
            Command::Upgrade {
                target,
                dry_run: true,
                ..
            } => Self::dry_run(&upgrader, &descriptor, target),
            Command::Upgrade { target, json, .. } => {
                let result = upgrader
                    .perform_upgrade(&descriptor, target)
                    .map_err(Box::new)?;
                Self::print_result(&result, json)
            }
            Command::Status => Self::status(&upgrader, &descriptor),
            Command::History { json } => Self::history(&upgrader, &descriptor, json),
        }
    }

    fn build_upgrader(&self, config: &Config) -> Result<Upgrader, SchemupError> {
        let scripts_dir = self
            .scripts
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.scripts.directory));
        debug!("Using scripts from {}", scripts_dir.display());

        let store = config
            .database
            .tracking_kind()
            .build(config.database.version_table())?;
        let runner = config
            .scripts
            .runner_kind()
            .build(config.scripts.separator());

        Ok(Upgrader::new()
            .with_source(DirectorySource::from_dir(scripts_dir))
            .with_store(store)
            .with_runner(runner))
    }

    fn print_result(result: &UpgradeResult, json: bool) -> Result<(), SchemupError> {
        if json {
            println!("{}", serde_json::to_string_pretty(result)?);
            return Ok(());
        }

        if result.applied_scripts.is_empty() {
            println!("Database is up to date at version {}", result.upgraded_version);
        } else {
            for script in &result.applied_scripts {
                println!("  applied {:>5}  {}", script.version_number(), script.name());
            }
            println!(
                "Upgraded from version {} to {}",
                result.original_version, result.upgraded_version
            );
        }
        Ok(())
    }

    fn dry_run(
        upgrader: &Upgrader,
        descriptor: &ConnectionDescriptor,
        target: Option<u32>,
    ) -> Result<(), SchemupError> {
        let conn = descriptor.open()?;
        let plan = upgrader.plan(&conn, target)?;
        info!(
            "Dry run: {} script(s) pending between version {} and {}",
            plan.scripts.len(),
            plan.current_version,
            plan.target_version
        );

        if plan.is_empty() {
            println!("Nothing to apply at version {}", plan.current_version);
        }
        for script in &plan.scripts {
            println!("  would apply {:>5}  {}", script.version_number(), script.name());
        }
        Ok(())
    }

    fn status(upgrader: &Upgrader, descriptor: &ConnectionDescriptor) -> Result<(), SchemupError> {
        let conn = descriptor.open()?;
        let current = upgrader.current_version(&conn)?;
        let catalog = upgrader.load_catalog()?;
        let latest = catalog.highest_script_version();

        println!("Database:        {}", descriptor);
        println!("Current version: {}", current);
        println!("Latest script:   {}", latest);
        println!("Pending:         {}", latest.saturating_sub(current));
        Ok(())
    }

    fn history(
        upgrader: &Upgrader,
        descriptor: &ConnectionDescriptor,
        json: bool,
    ) -> Result<(), SchemupError> {
        let conn = descriptor.open()?;
        let history = upgrader.history(&conn)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&history)?);
            return Ok(());
        }

        if history.is_empty() {
            println!("No upgrade history recorded");
        }
        for record in &history {
            println!(
                "{:>5}  {:<40} {:<16} {}",
                record.version_number,
                record.script_name,
                record.source_identifier,
                record.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Ok(())
    }
}
