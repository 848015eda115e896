//! AWS client construction.

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::config::AwsConfig;

/// Load the shared AWS configuration, applying any overrides.
pub async fn sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &aws.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}

/// Build an S3 client. Path-style addressing is forced when a custom
/// endpoint (LocalStack) is configured.
pub fn s3_client(aws: &AwsConfig, sdk: &SdkConfig) -> aws_sdk_s3::Client {
    let builder = aws_sdk_s3::config::Builder::from(sdk);
    let config = if aws.endpoint.is_some() {
        builder.force_path_style(true).build()
    } else {
        builder.build()
    };
    aws_sdk_s3::Client::from_conf(config)
}

/// Build a CloudWatch Logs client.
pub fn logs_client(sdk: &SdkConfig) -> aws_sdk_cloudwatchlogs::Client {
    aws_sdk_cloudwatchlogs::Client::new(sdk)
}
