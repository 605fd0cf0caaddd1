use crate::config::{DEFAULT_LOG_LEVEL, LoggingConfig};
use sentry::types::{Dsn, ParseDsnError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("invalid sentry dsn: {0}")]
    InvalidDsn(#[from] ParseDsnError),
}

/// Installs the global subscriber: `fmt` output filtered by `RUST_LOG` or the
/// configured level, plus Sentry when a DSN is configured.
///
/// The returned guard flushes pending Sentry events when dropped and has to
/// be kept alive for the lifetime of the process.
pub fn init(config: Option<&LoggingConfig>) -> Result<Option<sentry::ClientInitGuard>, LoggingError> {
    let level = config.map_or(DEFAULT_LOG_LEVEL, |c| c.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let guard = match config.and_then(|c| c.sentry_dsn.as_deref()) {
        Some(dsn) => {
            let dsn: Dsn = dsn.parse()?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    Ok(guard)
}
