//! Diagnostic logging setup.
//!
//! The full-screen chat owns the terminal, so it only ever logs to a file.
//! One-shot commands log to stderr, keeping stdout for the answer itself.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV_VAR: &str = "ASKTERM_LOG";
const DEFAULT_DIRECTIVE: &str = "askterm=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Sends log output to `path`, appending. Without a path nothing is logged.
pub fn init_file_logging(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .try_init()?;
    Ok(())
}

pub fn init_stderr_logging() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_path_is_a_noop() {
        assert!(init_file_logging(None).is_ok());
    }

    #[test]
    fn unwritable_path_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("missing").join("askterm.log");
        assert!(init_file_logging(Some(&path)).is_err());
    }
}
