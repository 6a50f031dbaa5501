use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::config::Config;

/// Build an S3 client for the configured region and optional profile
pub async fn connect(config: &Config) -> Client {
    let mut aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.s3_region.clone()));

    if let Some(profile) = &config.profile {
        aws_config = aws_config.profile_name(profile);
    }

    let sdk_config = aws_config.load().await;
    debug!("S3 client ready for region {}", config.s3_region);

    Client::new(&sdk_config)
}
