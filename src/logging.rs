#![forbid(unsafe_code)]

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

use crate::error::LogError;

pub const DEBUG_LOG_VAR: &str = "TWINPANE_DEBUG_LOG";
const DEFAULT_LOG_FILE: &str = "/tmp/twinpane.log";

/// Installs the global subscriber.
///
/// Logs go to stderr unless `TWINPANE_DEBUG_LOG` is set, in which case they are
/// appended to that file (or `/tmp/twinpane.log` for `1` or an empty value).
/// `RUST_LOG` overrides the `info` default.
pub fn init() -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339());

    match log_file_path(std::env::var(DEBUG_LOG_VAR).ok()) {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|e| LogError::Install(e.to_string()))
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| LogError::Install(e.to_string())),
    }
}

fn log_file_path(value: Option<String>) -> Option<PathBuf> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() || value == "1" {
        Some(PathBuf::from(DEFAULT_LOG_FILE))
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_log_value_picks_the_file() {
        assert_eq!(log_file_path(None), None);
        assert_eq!(log_file_path(Some("1".into())), Some(PathBuf::from(DEFAULT_LOG_FILE)));
        assert_eq!(log_file_path(Some("".into())), Some(PathBuf::from(DEFAULT_LOG_FILE)));
        assert_eq!(
            log_file_path(Some("/var/log/tp.log".into())),
            Some(PathBuf::from("/var/log/tp.log"))
        );
    }
}
