//! Invocation handling: stage + trigger on create/update, no-op on delete.
//!
//! This is the handler boundary from the error-handling design: nothing
//! below it crashes the process. Every failure is converted into a FAILED
//! response carrying the error text.

use anyhow::bail;
use serde_json::{Value, json};
use tracing::{error, info};

use modelport_core::config::{AwsConfig, HubConfig, ModelConfig};
use modelport_core::job::{s3_source_uri, timestamped_job_name};
use modelport_core::{
    ArtifactStager, BedrockImportService, HuggingFaceHub, ImportJobRequest, ImportService,
    S3Store, UploadPolicy,
};

use crate::event::{CustomResourceEvent, CustomResourceResponse, RequestType};

/// Run one invocation and convert the outcome into a response payload.
pub async fn handle(event: &CustomResourceEvent) -> CustomResourceResponse {
    match process(event).await {
        Ok(data) => CustomResourceResponse::success(event, data),
        Err(err) => {
            error!(error = ?err, "invocation failed");
            CustomResourceResponse::failure(event, format!("{err:#}"))
        }
    }
}

async fn process(event: &CustomResourceEvent) -> anyhow::Result<Value> {
    if event.request_type == RequestType::Delete {
        // Staged objects follow the bucket's lifecycle, not this resource's.
        info!("delete event, nothing to tear down");
        return Ok(Value::Null);
    }

    let props = &event.resource_properties;
    if props.repo_id.is_empty() {
        bail!("ResourceProperties.RepoId is required");
    }
    if props.bucket.is_empty() {
        bail!("ResourceProperties.Bucket is required");
    }
    if props.role_arn.is_empty() {
        bail!("ResourceProperties.RoleArn is required");
    }

    let model = ModelConfig {
        repo_id: props.repo_id.clone(),
        revision: props.revision.clone().unwrap_or_else(|| "main".to_string()),
        local_dir: None,
        prefix: props.prefix.clone(),
    };
    // The sandbox only grants writable scratch space under the temp root.
    let local_root = std::env::temp_dir().join(model.repo_name());
    let prefix = model.effective_prefix();

    let aws = AwsConfig {
        region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-west-2".to_string()),
        profile: None,
    };
    let sdk_config = modelport_core::aws::load_sdk_config(&aws).await;

    let hub = HuggingFaceHub::new(&HubConfig::default());
    let store = S3Store::new(&sdk_config, false);
    let stager = ArtifactStager::new(hub, store, UploadPolicy::SkipIfSameSize);
    let summary = stager
        .stage(
            &model.repo_id,
            &model.revision,
            &local_root,
            &props.bucket,
            &prefix,
        )
        .await?;

    let import = BedrockImportService::new(&sdk_config);
    let request = ImportJobRequest {
        job_name: timestamped_job_name(
            props.job_name_prefix.as_deref().unwrap_or("model-import"),
        ),
        imported_model_name: if props.imported_model_name.is_empty() {
            model.repo_name().to_string()
        } else {
            props.imported_model_name.clone()
        },
        role_arn: props.role_arn.clone(),
        source_uri: s3_source_uri(&props.bucket, &prefix),
    };
    let job_arn = import.create_import_job(&request).await?;

    Ok(json!({
        "ModelImportJobArn": job_arn,
        "JobName": request.job_name,
        "StagedFiles": summary.uploaded,
        "SkippedFiles": summary.skipped,
    }))
}
