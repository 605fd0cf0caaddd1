use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Loads the shared AWS configuration for `region`. Credentials come from the
/// default provider chain: environment, profile, then container or instance
/// metadata.
///
/// Retries are disabled. A failed call fails the invocation and the caller
/// decides whether to run it again.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .retry_config(RetryConfig::disabled())
        .load()
        .await
}

#[cfg(test)]
pub(crate) async fn test_sdk_config() -> SdkConfig {
    use aws_sdk_s3::config::Credentials;

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("eu-west-1"))
        .credentials_provider(Credentials::new(
            "AKID",
            "secret",
            Some("session".to_string()),
            None,
            "test",
        ))
        .retry_config(RetryConfig::disabled())
        .load()
        .await
}
