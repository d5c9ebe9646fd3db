mod cli;
mod config;

use directories::ProjectDirs;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use log::{debug, error};

use cli::Cli;
use config::Config;

fn setup_logging(project_dirs: &ProjectDirs, config: &Config) -> Option<LoggerHandle> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    let log_spec = format!("schemup={}", config.logging.schemup);

    let logger = Logger::try_with_str(&log_spec)
        .map(|logger| {
            logger
                .log_to_file(FileSpec::default().directory(&log_dir))
                .duplicate_to_stderr(Duplicate::Warn)
                .format_for_files(flexi_logger::detailed_format)
                .rotate(
                    Criterion::Size(10 * 1024 * 1024),
                    Naming::Timestamps,
                    Cleanup::KeepLogFiles(10),
                )
        })
        .and_then(|logger| logger.start());

    match logger {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logging in {}: {}", log_dir.display(), e);
            None
        }
    }
}

fn main() {
    let project_dirs = match ProjectDirs::from("", "", "schemup") {
        Some(dirs) => dirs,
        None => {
            eprintln!("Could not determine a home directory for schemup");
            std::process::exit(1);
        }
    };

    let config = Config::load_config(&project_dirs);

    // Keep the handle alive for the life of the process
    let _logger = setup_logging(&project_dirs, &config);
    debug!("Command-line args: {:?}", std::env::args_os().collect::<Vec<_>>());

    if let Err(err) = Cli::handle_command_line(&config) {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
