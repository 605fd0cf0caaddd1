mod config;
mod logging;
mod statsd;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use enricher::config::Config as EnricherConfig;
use enricher::{EnricherError, EnrichmentEvent, EnrichmentResponse, ServeError};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sp-cde", about = "SharePoint document enrichment")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Enrich one document and print the response
    Process {
        /// Event JSON file, `-` for stdin
        #[arg(long, default_value = "-")]
        event: PathBuf,
    },
    /// Serve `POST /invoke` on the configured listener
    Serve,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    #[error(transparent)]
    Metrics(#[from] statsd::MetricsError),
    #[error("could not read event: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Enrichment(#[from] EnricherError),
    #[error(transparent)]
    Serve(#[from] ServeError),
    #[error("could not print response: {0}")]
    Output(#[source] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sp-cde: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_file(&cli.config)?;
    let _sentry = logging::init(config.common.logging.as_ref())?;
    if let Some(metrics_config) = &config.common.metrics {
        statsd::init(metrics_config)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        CliCommand::Process { event } => {
            let response = runtime.block_on(process(&config.enricher, &event))?;
            let json = serde_json::to_string_pretty(&response).map_err(CliError::Output)?;
            println!("{json}");
        }
        CliCommand::Serve => {
            tracing::info!("Starting enricher service");
            runtime.block_on(enricher::run(&config.enricher))?;
        }
    }
    Ok(())
}

async fn process(config: &EnricherConfig, event_path: &Path) -> Result<EnrichmentResponse, CliError> {
    let raw = read_event(event_path)?;
    let event: EnrichmentEvent =
        serde_json::from_slice(&raw).map_err(EnricherError::InvalidEvent)?;

    let enricher = config.build_enricher().await;
    Ok(enricher.handle(&event).await?)
}

fn read_event(path: &Path) -> std::io::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path)
    }
}
