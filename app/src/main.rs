use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bayanat_core::config_store::DEFAULT_CONFIG_FILE;
use bayanat_tui::RunOptions;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILE: &str = "bayanat.log";

/// Terminal client for browsing and querying a PostgreSQL database.
#[derive(Debug, Parser)]
#[command(name = "bayanat", version, about)]
struct Cli {
    /// JSON file holding the last successful connection string.
    #[arg(long, env = "BAYANAT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// File that receives the application log.
    #[arg(long, env = "BAYANAT_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Connection string used instead of the stored one.
    #[arg(long, env = "BAYANAT_CONNECTION")]
    connection: Option<String>,
}

impl Cli {
    fn run_options(self) -> RunOptions {
        RunOptions {
            config_path: self.config,
            connection_override: self.connection,
        }
    }
}

fn init_logging(log_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| error.to_string())?;
    Ok(())
}

fn run_app(
    run_tui: impl FnOnce() -> Result<(), bayanat_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    run_tui()?;
    info!("bayanat exited");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;
    let options = cli.run_options();
    run_app(|| bayanat_tui::run(options))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use clap::Parser;
    use tempfile::TempDir;

    use super::{init_logging, run_app, Cli};

    #[test]
    fn run_app_returns_ok_when_tui_runner_succeeds() {
        let result = run_app(|| Ok(()));
        assert!(result.is_ok());
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let result = run_app(|| Err(bayanat_tui::TuiError::Io(io::Error::other("boom"))));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "bayanat",
            "--config",
            "/tmp/custom.json",
            "--log-file",
            "/tmp/custom.log",
            "--connection",
            "host=localhost dbname=app",
        ])
        .expect("flags should parse");

        assert_eq!(cli.log_file, PathBuf::from("/tmp/custom.log"));
        let options = cli.run_options();
        assert_eq!(options.config_path, PathBuf::from("/tmp/custom.json"));
        assert_eq!(
            options.connection_override.as_deref(),
            Some("host=localhost dbname=app")
        );
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["bayanat", "--profile", "x"]).is_err());
    }

    #[test]
    fn logging_creates_the_log_file() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let log_path = temp_dir.path().join("nested.log");

        // A global subscriber may already be set by another test; only the file matters.
        let _ = init_logging(&log_path);
        assert!(log_path.exists());
    }
}
