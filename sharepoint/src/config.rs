use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SECRET_ID: &str = "sharepoint-connector-creds";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Empty secret id")]
    EmptySecretId,

    #[error("Empty scope")]
    EmptyScope,

    #[error("{0} must be an http(s) url")]
    UnsupportedScheme(&'static str),
}

/// Where and how to look up document permissions.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Id of the secret holding `client_id`, `client_secret` and `tenant_id`
    pub secret_id: String,
    /// Identity provider base url; the tenant and token path are appended
    pub authority_url: Url,
    /// Graph API base url including the version segment
    pub graph_url: Url,
    /// OAuth scope requested with the client credentials grant
    pub scope: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            secret_id: DEFAULT_SECRET_ID.to_string(),
            authority_url: Url::parse(DEFAULT_AUTHORITY_URL).expect("valid default url"),
            graph_url: Url::parse(DEFAULT_GRAPH_URL).expect("valid default url"),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_id.is_empty() {
            return Err(ValidationError::EmptySecretId);
        }
        if self.scope.is_empty() {
            return Err(ValidationError::EmptyScope);
        }
        for (name, url) in [
            ("authority_url", &self.authority_url),
            ("graph_url", &self.graph_url),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ValidationError::UnsupportedScheme(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.secret_id, "sharepoint-connector-creds");
        assert_eq!(config.graph_url.as_str(), "https://graph.microsoft.com/v1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_and_validation() {
        let config: Config = serde_yaml::from_str(
            r#"
secret_id: other-creds
graph_url: "http://127.0.0.1:9000/v1.0"
"#,
        )
        .unwrap();
        assert_eq!(config.secret_id, "other-creds");
        assert_eq!(config.graph_url.port(), Some(9000));
        assert_eq!(config.scope, DEFAULT_SCOPE);

        let mut invalid = config.clone();
        invalid.scope = String::new();
        assert!(matches!(invalid.validate(), Err(ValidationError::EmptyScope)));

        let mut invalid = config;
        invalid.authority_url = Url::parse("ftp://login").unwrap();
        assert!(matches!(
            invalid.validate(),
            Err(ValidationError::UnsupportedScheme("authority_url"))
        ));

        assert!(serde_yaml::from_str::<Config>("graph_url: not-a-url").is_err());
    }
}
