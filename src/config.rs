use std::fs;
use std::path::Path;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use schemup::runner::{RunnerKind, SeparatedBatchRunner};
use schemup::store::{TableVersionStore, TrackingKind};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub schemup: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const SCHEMUP_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            schemup: Self::SCHEMUP_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.schemup.clone();
        self.schemup = self.schemup.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.schemup.as_str()) {
            eprintln!(
                "Config error: schemup log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::SCHEMUP_LEVEL
            );
            self.schemup = Self::SCHEMUP_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: String,
    version_table: String,
    tracking: String,
}

impl DatabaseConfig {
    const DEFAULT_PATH: &str = "schemup.db";

    pub fn version_table(&self) -> &str {
        &self.version_table
    }

    pub fn tracking_kind(&self) -> TrackingKind {
        // ensure_valid has already checked this, so the fallback is never hit
        self.tracking.parse().unwrap_or_default()
    }

    fn default() -> Self {
        DatabaseConfig {
            path: Self::DEFAULT_PATH.to_owned(),
            version_table: TableVersionStore::DEFAULT_TABLE.to_owned(),
            tracking: TrackingKind::default().to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        if !TableVersionStore::is_valid_table_name(&self.version_table) {
            eprintln!(
                "Config error: version table '{}' is invalid - using default of '{}'",
                self.version_table,
                TableVersionStore::DEFAULT_TABLE
            );
            self.version_table = TableVersionStore::DEFAULT_TABLE.to_owned();
        }

        let str_original = self.tracking.clone();
        self.tracking = self.tracking.trim().to_ascii_lowercase();
        if self.tracking.parse::<TrackingKind>().is_err() {
            eprintln!(
                "Config error: tracking of '{}' is invalid - using default of '{}'",
                str_original,
                TrackingKind::default()
            );
            self.tracking = TrackingKind::default().to_string();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptsConfig {
    pub directory: String,
    runner: String,
    separator: String,
}

impl ScriptsConfig {
    const DEFAULT_DIRECTORY: &str = "scripts";

    pub fn runner_kind(&self) -> RunnerKind {
        self.runner.parse().unwrap_or_default()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    fn default() -> Self {
        ScriptsConfig {
            directory: Self::DEFAULT_DIRECTORY.to_owned(),
            runner: RunnerKind::default().to_string(),
            separator: SeparatedBatchRunner::DEFAULT_SEPARATOR.to_owned(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.runner.clone();
        self.runner = self.runner.trim().to_ascii_lowercase();
        if self.runner.parse::<RunnerKind>().is_err() {
            eprintln!(
                "Config error: runner of '{}' is invalid - using default of '{}'",
                str_original,
                RunnerKind::default()
            );
            self.runner = RunnerKind::default().to_string();
        }

        if self.separator.trim().is_empty() {
            eprintln!(
                "Config error: batch separator is empty - using default of '{}'",
                SeparatedBatchRunner::DEFAULT_SEPARATOR
            );
            self.separator = SeparatedBatchRunner::DEFAULT_SEPARATOR.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub scripts: ScriptsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
            scripts: ScriptsConfig::default(),
        }
    }
}

impl Config {
    const ENV_PREFIX: &str = "SCHEMUP_";

    /// Loads the configuration from `config.toml` in the app's data directory,
    /// overridden by `SCHEMUP_*` environment variables (`SCHEMUP_SCRIPTS__RUNNER`).
    /// Writes the default config to disk if no file exists.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = project_dirs.data_local_dir().join("config.toml");

        if !config_path.exists() {
            Self::write_default(&config_path);
        }

        Self::load_from(&config_path)
    }

    fn write_default(config_path: &Path) {
        if let Some(parent) = config_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!(
                    "Failed to create configuration directory {}: {}",
                    parent.display(),
                    e
                );
            }
        }
        match toml::to_string_pretty(&Config::default()) {
            Ok(toml_string) => {
                if let Err(e) = fs::write(config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            }
            Err(_) => eprintln!("Failed to serialize default config."),
        }
    }

    /// Defaults, then the TOML file (if present), then the environment. Any
    /// extraction error falls back to the defaults.
    pub fn load_from(config_path: &Path) -> Self {
        let default_config = Config::default();

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.database.ensure_valid();
        self.scripts.ensure_valid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Path::new("absent.toml"));
            assert_eq!(config, Config::default());
            assert_eq!(config.database.tracking_kind(), TrackingKind::Table);
            assert_eq!(config.scripts.runner_kind(), RunnerKind::Batch);
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [database]
                path = "app.db"
                tracking = "META"

                [scripts]
                runner = "separated"
                separator = ";;"
                "#,
            )?;
            jail.set_env("SCHEMUP_LOGGING__SCHEMUP", "debug");
            jail.set_env("SCHEMUP_SCRIPTS__DIRECTORY", "/srv/upgrades");

            let config = Config::load_from(Path::new("config.toml"));
            assert_eq!(config.database.path, "app.db");
            assert_eq!(config.database.tracking_kind(), TrackingKind::Meta);
            assert_eq!(config.database.version_table(), "schema_versions");
            assert_eq!(config.scripts.runner_kind(), RunnerKind::Separated);
            assert_eq!(config.scripts.separator(), ";;");
            assert_eq!(config.scripts.directory, "/srv/upgrades");
            assert_eq!(config.logging.schemup, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [logging]
                schemup = "chatty"

                [database]
                version_table = "versions; DROP TABLE x"
                tracking = "rows"

                [scripts]
                runner = "parallel"
                separator = "   "
                "#,
            )?;

            let config = Config::load_from(Path::new("config.toml"));
            assert_eq!(config.logging.schemup, "info");
            assert_eq!(config.database.version_table(), "schema_versions");
            assert_eq!(config.database.tracking_kind(), TrackingKind::Table);
            assert_eq!(config.scripts.runner_kind(), RunnerKind::Batch);
            assert_eq!(config.scripts.separator(), "GO");
            Ok(())
        });
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[database]"));
        assert!(text.contains("version_table = \"schema_versions\""));
    }
}
