//! Shared AWS session loading for the service clients.

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::config::AwsConfig;

/// Resolve a shared SDK config from the tool's AWS settings.
///
/// Region is always explicit; the credential profile is only applied when
/// configured, otherwise the default provider chain is used.
pub async fn load_sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws.region.clone()));
    if let Some(profile) = &aws.profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}
