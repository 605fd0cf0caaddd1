use crate::config::MetricsConfig;
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use shared::metrics_defs::describe_metrics;

const METRICS_PREFIX: &str = "sp_cde";

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("statsd exporter: {0}")]
    Exporter(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Installs the statsd recorder and registers every metric description.
pub fn init(config: &MetricsConfig) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;

    describe_metrics(enricher::metrics_defs::ALL_METRICS);
    describe_metrics(sharepoint::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Metrics exporter installed"
    );
    Ok(())
}
