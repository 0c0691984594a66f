//! Logging initialization for the server binary
//!
//! Structured, leveled logging via `tracing`; JSON or human-readable output
//! selected by configuration, with `RUST_LOG` taking precedence over the
//! configured level when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }

    Ok(())
}
