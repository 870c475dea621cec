use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client as S3Client,
};

use crate::config::AppConfig;

/// Builds the S3 client for attachment storage. Supports both AWS proper
/// and a MinIO deployment behind `AWS_ENDPOINT_URL`.
pub async fn build_client(config: &AppConfig) -> Result<S3Client> {
    let regions = RegionProviderChain::first_try(Some(Region::new(config.aws_region.clone())))
        .or_default_provider()
        .or_else("us-east-1");

    #[allow(deprecated)]
    let mut loader = aws_config::from_env().region(regions);

    if let Some(endpoint) = &config.aws_endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    if let (Some(access_key), Some(secret_key)) = (
        config.aws_access_key_id.clone(),
        config.aws_secret_access_key.clone(),
    ) {
        loader = loader
            .credentials_provider(Credentials::new(access_key, secret_key, None, None, "env"));
    }

    let sdk_config = loader.load().await;

    // MinIO only answers path-style requests.
    let s3_config = S3ConfigBuilder::from(&sdk_config)
        .force_path_style(true)
        .build();
    Ok(S3Client::from_conf(s3_config))
}
