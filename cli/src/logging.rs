use anyhow::{Context, Result};
use chrono::Local;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs console and run-file logging.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with
/// `--debug`. Every run writes its own `run-<timestamp>.log` under `log_dir`,
/// whose path is returned.
pub fn init(debug: bool, log_dir: &Path) -> Result<PathBuf> {
    let path = run_log_path(log_dir);
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(path)
}

fn run_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("run-{}.log", Local::now().format("%Y%m%d-%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_logs_are_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = run_log_path(dir.path());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("run-"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "run-20240101-120000.log".len());
        assert_eq!(path.parent(), Some(dir.path()));
    }
}
