use crate::config::settings::AppConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;
use tracing::info;

/// Shared SDK configuration for the S3 and MediaConvert clients. Static keys
/// from the environment win; otherwise the default credential chain applies.
pub async fn load_sdk_config(config: &AppConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let (Some(access_key), Some(secret_key)) = (&config.aws_access_key, &config.aws_secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "vaultstream-env",
        ));
    }

    let sdk_config = loader.load().await;
    info!(region = %config.aws_region, "AWS SDK configuration loaded");
    sdk_config
}
