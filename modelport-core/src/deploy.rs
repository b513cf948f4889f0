//! Deploy orchestrator.
//!
//! Ties the seams together for the two supported flows: the local
//! pipeline (ensure stack -> stage artifact -> trigger import) and the
//! package push (build archive -> upload -> update stack so the managed
//! function runs the same sequence remotely).

use std::path::PathBuf;
use tracing::info;

use crate::config::DeployConfig;
use crate::engine::InfraEngine;
use crate::error::{ConfigError, Result};
use crate::hub::ModelHub;
use crate::job::{ImportJobRequest, ImportService, s3_source_uri, timestamped_job_name};
use crate::lifecycle::StackLifecycle;
use crate::package::PackageBuilder;
use crate::stage::{ArtifactStager, StageSummary};
use crate::store::ObjectStore;
use crate::types::{OUTPUT_IMPORT_ROLE, OUTPUT_MODEL_BUCKET, StackOutputs, StackSpec};

/// Result of a full deploy run.
#[derive(Debug)]
pub struct DeployOutcome {
    pub outputs: StackOutputs,
    pub stage: StageSummary,
    pub job_name: String,
    pub job_arn: String,
}

/// Orchestrates stack lifecycle, staging, packaging, and triggering.
pub struct Deployer<E, H, S, J> {
    config: DeployConfig,
    lifecycle: StackLifecycle<E>,
    stager: ArtifactStager<H, S>,
    store: S,
    import: J,
}

impl<E, H, S, J> Deployer<E, H, S, J>
where
    E: InfraEngine,
    H: ModelHub,
    S: ObjectStore + Clone,
    J: ImportService,
{
    pub fn new(config: DeployConfig, engine: E, hub: H, store: S, import: J) -> Self {
        let lifecycle = StackLifecycle::from_config(engine, &config.stack);
        let stager = ArtifactStager::new(hub, store.clone(), config.storage.upload_policy);
        Self {
            config,
            lifecycle,
            stager,
            store,
            import,
        }
    }

    /// Full local pipeline: ensure the stack, stage the model, trigger the
    /// import job.
    pub async fn run(&self) -> Result<DeployOutcome> {
        let spec = self.stack_spec()?;
        let outputs = self.lifecycle.ensure(&spec).await?;
        let stage = self.stage_into(&spec.name, &outputs).await?;
        let (job_name, job_arn) = self.trigger_import(&spec.name, &outputs).await?;
        Ok(DeployOutcome {
            outputs,
            stage,
            job_name,
            job_arn,
        })
    }

    /// Converge the stack and return its outputs, nothing else.
    pub async fn ensure_stack(&self) -> Result<StackOutputs> {
        let spec = self.stack_spec()?;
        Ok(self.lifecycle.ensure(&spec).await?)
    }

    /// Outputs of the already-converged stack.
    pub async fn stack_outputs(&self) -> Result<StackOutputs> {
        Ok(self.lifecycle.outputs(&self.config.stack.name).await?)
    }

    /// Stage the configured model into the existing stack's bucket.
    pub async fn stage(&self) -> Result<StageSummary> {
        let outputs = self.stack_outputs().await?;
        self.stage_into(&self.config.stack.name, &outputs).await
    }

    /// Trigger an import job against the already-staged artifact.
    pub async fn import(&self) -> Result<(String, String)> {
        let outputs = self.stack_outputs().await?;
        self.trigger_import(&self.config.stack.name, &outputs).await
    }

    /// Build the deployment package, upload it to the stack's bucket, then
    /// run the stack through an update so the managed function picks up
    /// the new archive. The stack must already exist.
    pub async fn push_package(&self) -> Result<StackOutputs> {
        let spec = self.stack_spec()?;
        let outputs = self.lifecycle.outputs(&spec.name).await?;
        let bucket = outputs.require(&spec.name, OUTPUT_MODEL_BUCKET)?;

        let builder = PackageBuilder::new(self.config.package.clone());
        let package = builder.build().await?;
        package
            .upload(&self.store, bucket, &self.config.package.key)
            .await?;
        drop(package);

        info!(stack = %spec.name, key = %self.config.package.key, "package uploaded, converging stack");
        Ok(self.lifecycle.ensure(&spec).await?)
    }

    async fn stage_into(&self, stack_name: &str, outputs: &StackOutputs) -> Result<StageSummary> {
        let bucket = outputs.require(stack_name, OUTPUT_MODEL_BUCKET)?;
        let repo_id = self.config.model.require_repo_id()?;
        let prefix = self.config.model.effective_prefix();
        let local_root = self.config.model.effective_local_dir();
        self.stager
            .stage(
                repo_id,
                &self.config.model.revision,
                &local_root,
                bucket,
                &prefix,
            )
            .await
    }

    async fn trigger_import(
        &self,
        stack_name: &str,
        outputs: &StackOutputs,
    ) -> Result<(String, String)> {
        let bucket = outputs.require(stack_name, OUTPUT_MODEL_BUCKET)?;
        let role_arn = match &self.config.import.role_arn {
            Some(role) => role.clone(),
            None => outputs.require(stack_name, OUTPUT_IMPORT_ROLE)?.to_string(),
        };
        let request = ImportJobRequest {
            job_name: timestamped_job_name(&self.config.import.job_name_prefix),
            imported_model_name: self.config.import.imported_model_name.clone(),
            role_arn,
            source_uri: s3_source_uri(bucket, &self.config.model.effective_prefix()),
        };
        let job_arn = self.import.create_import_job(&request).await?;
        info!(job = %request.job_name, arn = %job_arn, "import job created");
        Ok((request.job_name, job_arn))
    }

    fn stack_spec(&self) -> Result<StackSpec> {
        let template_path: &PathBuf = &self.config.stack.template;
        let template_body =
            std::fs::read_to_string(template_path).map_err(|_| ConfigError::FileNotFound {
                path: template_path.clone(),
            })?;
        Ok(StackSpec {
            name: self.config.stack.name.clone(),
            template_body,
            capabilities: self.config.stack.capabilities.clone(),
        })
    }
}
