use enricher::config::Config as EnricherConfig;
use serde::Deserialize;
use std::fs::File;

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub enricher: EnricherConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.enricher.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid enricher config: {0}")]
    ValidationError(#[from] enricher::config::ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use enricher::config::{BlobStoreConfig, SecretStoreConfig};
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            logging:
                level: debug
                sentry_dsn: https://key@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            enricher:
                listener:
                    host: 0.0.0.0
                    port: 8080
                output_bucket: kendra-cde-data-bucket
                blob_store:
                    type: s3
                    region: us-east-1
                secret_store:
                    type: secrets_manager
                    region: us-east-1
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.level, "debug");
        assert_eq!(
            logging.sentry_dsn.as_deref(),
            Some("https://key@sentry.example.com/1")
        );
        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125
            })
        );
        assert_eq!(config.enricher.listener.port, 8080);
        assert_eq!(
            config.enricher.blob_store,
            BlobStoreConfig::S3 {
                region: "us-east-1".into(),
                endpoint: None
            }
        );
        assert_eq!(
            config.enricher.secret_store,
            SecretStoreConfig::SecretsManager {
                region: "us-east-1".into(),
                endpoint: None
            }
        );
    }

    #[test]
    fn minimal_config() {
        let yaml = r#"
            logging: {}
            enricher:
                blob_store: {type: filesystem, base_dir: /var/lib/sp-cde}
                secret_store: {type: file, dir: /etc/sp-cde}
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common.metrics, None);
        assert_eq!(
            config.common.logging.map(|l| l.level),
            Some("info".to_string())
        );
        assert_eq!(config.enricher.output_prefix, "sp_cde_output");
    }

    #[test]
    fn invalid_config() {
        let tmp = write_tmp_file("enricher: {}");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        let tmp = write_tmp_file(
            r#"
            enricher:
                output_bucket: ""
                blob_store: {type: filesystem, base_dir: /tmp}
                secret_store: {type: file, dir: /tmp}
            "#,
        );
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ValidationError(_))
        ));

        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/sp-cde.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
