//! Infrastructure engine seam.
//!
//! `InfraEngine` is the narrow surface the stack lifecycle manager needs
//! from an infrastructure-as-code service: submit a create, submit an
//! update, observe current state. The CloudFormation implementation maps
//! the service's error shapes onto the local taxonomy; everything above
//! this module is engine-agnostic and testable with fakes.

use async_trait::async_trait;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::Capability;
use tracing::debug;

use crate::error::EngineError;
use crate::types::{StackObservation, StackOutputs, StackSpec, StackState};

/// Result of submitting an update to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The engine accepted the update and is now mutating the stack.
    Started,
    /// The template matches the deployed stack; nothing to do.
    NoChanges,
}

/// The operations the lifecycle manager consumes from the infra engine.
#[async_trait]
pub trait InfraEngine: Send + Sync {
    /// Submit a create request. Fails with `StackAlreadyExists` when a
    /// stack with the spec's name is already deployed.
    async fn create_stack(&self, spec: &StackSpec) -> Result<(), EngineError>;

    /// Submit an update request. A template identical to the deployed one
    /// is reported as `UpdateOutcome::NoChanges`, not an error.
    async fn update_stack(&self, spec: &StackSpec) -> Result<UpdateOutcome, EngineError>;

    /// Observe the stack's current state and outputs. `Ok(None)` means no
    /// stack with that name exists.
    async fn describe_stack(&self, name: &str) -> Result<Option<StackObservation>, EngineError>;
}

/// `InfraEngine` backed by AWS CloudFormation.
pub struct CloudFormationEngine {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationEngine {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudformation::Client::new(sdk_config),
        }
    }

    fn capabilities(spec: &StackSpec) -> Vec<Capability> {
        spec.capabilities
            .iter()
            .map(|c| Capability::from(c.as_str()))
            .collect()
    }
}

#[async_trait]
impl InfraEngine for CloudFormationEngine {
    async fn create_stack(&self, spec: &StackSpec) -> Result<(), EngineError> {
        debug!(stack = %spec.name, "submitting create-stack");
        match self
            .client
            .create_stack()
            .stack_name(&spec.name)
            .template_body(&spec.template_body)
            .set_capabilities(Some(Self::capabilities(spec)))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_already_exists_exception() {
                    Err(EngineError::StackAlreadyExists {
                        name: spec.name.clone(),
                    })
                } else {
                    Err(EngineError::Api {
                        message: service_message(&service_err),
                    })
                }
            }
        }
    }

    async fn update_stack(&self, spec: &StackSpec) -> Result<UpdateOutcome, EngineError> {
        debug!(stack = %spec.name, "submitting update-stack");
        match self
            .client
            .update_stack()
            .stack_name(&spec.name)
            .template_body(&spec.template_body)
            .set_capabilities(Some(Self::capabilities(spec)))
            .send()
            .await
        {
            Ok(_) => Ok(UpdateOutcome::Started),
            Err(err) => {
                let service_err = err.into_service_error();
                let message = service_message(&service_err);
                if is_no_updates_message(&message) {
                    Ok(UpdateOutcome::NoChanges)
                } else {
                    Err(EngineError::Api { message })
                }
            }
        }
    }

    async fn describe_stack(&self, name: &str) -> Result<Option<StackObservation>, EngineError> {
        match self.client.describe_stacks().stack_name(name).send().await {
            Ok(resp) => {
                let Some(stack) = resp.stacks().first() else {
                    return Ok(None);
                };
                let state = stack
                    .stack_status()
                    .map(|s| StackState::from_status(s.as_str()))
                    .unwrap_or_else(|| StackState::Failed("UNKNOWN".to_string()));
                let outputs: StackOutputs = stack
                    .outputs()
                    .iter()
                    .filter_map(|o| {
                        Some((o.output_key()?.to_string(), o.output_value()?.to_string()))
                    })
                    .collect();
                Ok(Some(StackObservation { state, outputs }))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                let message = service_message(&service_err);
                // DescribeStacks has no typed not-found error; the service
                // reports absence through a validation error message.
                if is_missing_stack_message(&message) {
                    Ok(None)
                } else {
                    Err(EngineError::Api { message })
                }
            }
        }
    }
}

fn service_message<E>(err: &E) -> String
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

fn is_no_updates_message(message: &str) -> bool {
    message.contains("No updates are to be performed")
}

fn is_missing_stack_message(message: &str) -> bool {
    message.contains("does not exist")
}
