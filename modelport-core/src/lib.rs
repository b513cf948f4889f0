//! # Modelport Core
//!
//! Core library for the modelport deployment tool. Provides the stack
//! lifecycle manager, the seams to the infra engine, model hub, object
//! store and import service, the artifact stager, the deployment package
//! builder, configuration, and fundamental types.

pub mod aws;
pub mod config;
pub mod deploy;
pub mod engine;
pub mod error;
pub mod hub;
pub mod job;
pub mod lifecycle;
pub mod package;
pub mod stage;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{DeployConfig, config_exists, load_config, write_default_config};
pub use deploy::{DeployOutcome, Deployer};
pub use engine::{CloudFormationEngine, InfraEngine, UpdateOutcome};
pub use error::{ModelportError, Result};
pub use hub::{HuggingFaceHub, ModelHub};
pub use job::{BedrockImportService, ImportJobRequest, ImportService};
pub use lifecycle::StackLifecycle;
pub use package::{DeploymentPackage, PackageBuilder, PackageManifest};
pub use stage::{ArtifactStager, StageSummary};
pub use store::{MemoryStore, ObjectStore, S3Store};
pub use types::{
    OUTPUT_IMPORT_ROLE, OUTPUT_MODEL_BUCKET, StackObservation, StackOutputs, StackSpec,
    StackState, UploadPolicy,
};
