//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber from a [`LoggingConfig`]. The
//! `RUST_LOG` environment variable, when set, takes precedence over the
//! configured level.

use crate::config::LoggingConfig;
use crate::error::{ChannelError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let installed = match (config.log_to_file, config.log_file_path.as_deref()) {
        (true, Some(path)) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            if config.json_format {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        (true, None) => {
            return Err(ChannelError::ConfigError(
                "log_file_path must be specified when log_to_file is true".to_string(),
            ))
        }
        (false, _) if config.json_format => builder.json().try_init(),
        (false, _) => builder.try_init(),
    };

    installed.map_err(|e| ChannelError::ConfigError(format!("Failed to install logger: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
