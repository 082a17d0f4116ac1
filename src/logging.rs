use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LOG_ENV;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    FilterError(#[from] tracing_subscriber::filter::ParseError),
    #[error("Failed to install log subscriber: {0}")]
    InitError(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. `SPICY_TODO_LOG` wins over `level` when set.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_new(level))?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?,
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(false))
            .try_init()?,
    }

    Ok(())
}
