//! Logging setup
//!
//! The subscriber is installed once per process by [`init_logging`]; every
//! module then logs through `tracing` macros.

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Process-wide logging configuration
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub level: Level,
    pub json: bool,
}

impl LogConfig {
    /// Debug when verbose, info otherwise
    pub fn from_verbosity(verbose: bool, json: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::INFO },
            json,
        }
    }
}

fn directive(text: &str) -> Result<Directive> {
    text.parse()
        .map_err(|e| Error::Configuration(format!("invalid log directive {}: {}", text, e)))
}

/// Build the filter: the chosen level plus quieter dependency targets
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(LevelFilter::from_level(config.level).into())
        .add_directive(directive("hyper=warn")?)
        .add_directive(directive("kube=info")?)
        .add_directive(directive("tower=warn")?))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    installed.map_err(|e| Error::Internal(format!("logging already initialized: {}", e)))
}
