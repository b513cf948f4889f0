//! Import-job trigger.
//!
//! One synchronous request against the managed import service, no retry;
//! failures surface verbatim. Job names get a UTC timestamp suffix so
//! re-runs never collide on the service's unique-name constraint.

use async_trait::async_trait;
use aws_sdk_bedrock::types::{ModelDataSource, S3DataSource};
use tracing::info;

use crate::error::JobError;

/// Everything the import service needs to ingest a staged artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobRequest {
    pub job_name: String,
    pub imported_model_name: String,
    pub role_arn: String,
    /// Staged artifact location, e.g. `s3://bucket/prefix/`.
    pub source_uri: String,
}

/// The trigger surface consumed by the deploy orchestrator and handler.
#[async_trait]
pub trait ImportService: Send + Sync {
    /// Request a model-import job and return its ARN.
    async fn create_import_job(&self, request: &ImportJobRequest) -> Result<String, JobError>;
}

/// `ImportService` backed by AWS Bedrock.
#[derive(Clone)]
pub struct BedrockImportService {
    client: aws_sdk_bedrock::Client,
}

impl BedrockImportService {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_bedrock::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ImportService for BedrockImportService {
    async fn create_import_job(&self, request: &ImportJobRequest) -> Result<String, JobError> {
        let source = S3DataSource::builder()
            .s3_uri(&request.source_uri)
            .build()
            .map_err(|e| JobError::Request {
                message: e.to_string(),
            })?;

        info!(
            job = %request.job_name,
            model = %request.imported_model_name,
            source = %request.source_uri,
            "creating model-import job"
        );
        let response = self
            .client
            .create_model_import_job()
            .job_name(&request.job_name)
            .imported_model_name(&request.imported_model_name)
            .role_arn(&request.role_arn)
            .model_data_source(ModelDataSource::S3DataSource(source))
            .send()
            .await
            .map_err(|e| JobError::Request {
                message: e.into_service_error().to_string(),
            })?;

        Ok(response.job_arn().to_string())
    }
}

/// The `s3://bucket/prefix/` URI the import service reads the artifact
/// from. A trailing slash marks the whole prefix as the source.
pub fn s3_source_uri(bucket: &str, prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("s3://{bucket}/")
    } else {
        format!("s3://{bucket}/{prefix}/")
    }
}

/// Append a UTC timestamp to the configured job-name prefix.
pub fn timestamped_job_name(prefix: &str) -> String {
    format!("{}-{}", prefix, chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_s3_source_uri() {
        assert_eq!(
            s3_source_uri("model-bucket", "DeepSeek-R1-Distill-Llama-8B"),
            "s3://model-bucket/DeepSeek-R1-Distill-Llama-8B/"
        );
        assert_eq!(
            s3_source_uri("model-bucket", "/models/x/"),
            "s3://model-bucket/models/x/"
        );
        assert_eq!(s3_source_uri("model-bucket", ""), "s3://model-bucket/");
    }

    #[test]
    fn test_timestamped_job_name() {
        let name = timestamped_job_name("model-import");
        assert!(name.starts_with("model-import-"));
        // prefix + '-' + yyyymmdd-hhmmss
        assert_eq!(name.len(), "model-import-".len() + 15);
    }
}
