//! Stack lifecycle manager.
//!
//! Ensures a stack exists in a terminal success configuration: observe
//! first, then branch to create or update, then poll at a fixed interval
//! until the engine reports a terminal state. The only locally recovered
//! failures are the create/describe race (`StackAlreadyExists`, retried as
//! an update exactly once) and an update with nothing to apply.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::StackConfig;
use crate::engine::{InfraEngine, UpdateOutcome};
use crate::error::EngineError;
use crate::types::{StackObservation, StackOutputs, StackSpec, StackState};

/// Drives a stack to a terminal success state through an `InfraEngine`.
pub struct StackLifecycle<E> {
    engine: E,
    poll_delay: Duration,
    max_poll_attempts: u32,
}

impl<E: InfraEngine> StackLifecycle<E> {
    pub fn new(engine: E, poll_delay: Duration, max_poll_attempts: u32) -> Self {
        Self {
            engine,
            poll_delay,
            max_poll_attempts,
        }
    }

    pub fn from_config(engine: E, config: &StackConfig) -> Self {
        Self::new(
            engine,
            Duration::from_secs(config.poll_delay_secs),
            config.max_poll_attempts,
        )
    }

    /// Ensure the stack described by `spec` exists and has converged, and
    /// return its output mapping.
    pub async fn ensure(&self, spec: &StackSpec) -> Result<StackOutputs, EngineError> {
        match self.engine.describe_stack(&spec.name).await? {
            None => {
                info!(stack = %spec.name, "stack absent, creating");
                match self.engine.create_stack(spec).await {
                    Ok(()) => self.wait_for_terminal(&spec.name).await,
                    // Lost the race between describe and create; fall
                    // through to the update path once.
                    Err(EngineError::StackAlreadyExists { .. }) => {
                        warn!(stack = %spec.name, "stack appeared during create, updating instead");
                        self.update(spec, None).await
                    }
                    Err(err) => Err(err),
                }
            }
            Some(observation) => {
                info!(stack = %spec.name, state = %observation.state, "stack exists, updating");
                self.update(spec, Some(observation)).await
            }
        }
    }

    async fn update(
        &self,
        spec: &StackSpec,
        observation: Option<StackObservation>,
    ) -> Result<StackOutputs, EngineError> {
        match self.engine.update_stack(spec).await? {
            UpdateOutcome::Started => self.wait_for_terminal(&spec.name).await,
            UpdateOutcome::NoChanges => {
                info!(stack = %spec.name, "no changes to apply");
                // Nothing in flight, so the current outputs are already
                // terminal; re-describe only when the caller arrived here
                // without an observation (the create-race path).
                let outputs = match observation {
                    Some(observation) => observation.outputs,
                    None => self
                        .engine
                        .describe_stack(&spec.name)
                        .await?
                        .ok_or_else(|| EngineError::StackNotFound {
                            name: spec.name.clone(),
                        })?
                        .outputs,
                };
                Ok(outputs)
            }
        }
    }

    /// Outputs of a stack that is already in a terminal success state.
    /// Used by flows that consume an existing stack without mutating it.
    pub async fn outputs(&self, name: &str) -> Result<StackOutputs, EngineError> {
        let observation = self.engine.describe_stack(name).await?.ok_or_else(|| {
            EngineError::StackNotFound {
                name: name.to_string(),
            }
        })?;
        if !observation.state.is_success() {
            return Err(EngineError::StackFailed {
                name: name.to_string(),
                status: observation.state.to_string(),
            });
        }
        Ok(observation.outputs)
    }

    /// Poll the stack at a fixed interval until it reaches a terminal
    /// state, up to the configured attempt budget. Exhaustion is a hard
    /// error, not a retry.
    async fn wait_for_terminal(&self, name: &str) -> Result<StackOutputs, EngineError> {
        for attempt in 1..=self.max_poll_attempts {
            let observation = self.engine.describe_stack(name).await?.ok_or_else(|| {
                EngineError::StackNotFound {
                    name: name.to_string(),
                }
            })?;

            match &observation.state {
                state if state.is_success() => {
                    info!(stack = %name, state = %state, "stack reached terminal state");
                    return Ok(observation.outputs);
                }
                StackState::Failed(status) => {
                    return Err(EngineError::StackFailed {
                        name: name.to_string(),
                        status: status.clone(),
                    });
                }
                state => {
                    info!(
                        stack = %name,
                        state = %state,
                        attempt,
                        max_attempts = self.max_poll_attempts,
                        "waiting for stack to reach a terminal state"
                    );
                    tokio::time::sleep(self.poll_delay).await;
                }
            }
        }

        Err(EngineError::WaitTimeout {
            name: name.to_string(),
            attempts: self.max_poll_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StackOutputs;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Scripted engine: a fixed outcome per operation, a queue of states
    /// returned by successive describes, and call counters.
    struct ScriptedEngine {
        exists: Mutex<bool>,
        create_result: Option<EngineError>,
        update_result: Result<UpdateOutcome, String>,
        poll_states: Mutex<Vec<StackState>>,
        outputs: StackOutputs,
        create_calls: Mutex<u32>,
        update_calls: Mutex<u32>,
        describe_calls: Mutex<u32>,
    }

    impl ScriptedEngine {
        fn new(exists: bool, poll_states: Vec<StackState>) -> Self {
            Self {
                exists: Mutex::new(exists),
                create_result: None,
                update_result: Ok(UpdateOutcome::Started),
                poll_states: Mutex::new(poll_states),
                outputs: [(
                    "ModelStorageBucketName".to_string(),
                    "model-bucket-1a2b3c".to_string(),
                )]
                .into_iter()
                .collect(),
                create_calls: Mutex::new(0),
                update_calls: Mutex::new(0),
                describe_calls: Mutex::new(0),
            }
        }

        fn create_calls(&self) -> u32 {
            *self.create_calls.lock().unwrap()
        }

        fn update_calls(&self) -> u32 {
            *self.update_calls.lock().unwrap()
        }

        fn describe_calls(&self) -> u32 {
            *self.describe_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl InfraEngine for ScriptedEngine {
        async fn create_stack(&self, spec: &StackSpec) -> Result<(), EngineError> {
            *self.create_calls.lock().unwrap() += 1;
            match &self.create_result {
                Some(EngineError::StackAlreadyExists { .. }) => {
                    // The error means a stack is there; make it observable.
                    *self.exists.lock().unwrap() = true;
                    Err(EngineError::StackAlreadyExists {
                        name: spec.name.clone(),
                    })
                }
                Some(EngineError::Api { message }) => Err(EngineError::Api {
                    message: message.clone(),
                }),
                Some(other) => Err(EngineError::Api {
                    message: other.to_string(),
                }),
                None => {
                    *self.exists.lock().unwrap() = true;
                    Ok(())
                }
            }
        }

        async fn update_stack(&self, _spec: &StackSpec) -> Result<UpdateOutcome, EngineError> {
            *self.update_calls.lock().unwrap() += 1;
            match &self.update_result {
                Ok(outcome) => Ok(*outcome),
                Err(message) => Err(EngineError::Api {
                    message: message.clone(),
                }),
            }
        }

        async fn describe_stack(
            &self,
            _name: &str,
        ) -> Result<Option<StackObservation>, EngineError> {
            *self.describe_calls.lock().unwrap() += 1;
            if !*self.exists.lock().unwrap() {
                return Ok(None);
            }
            let mut states = self.poll_states.lock().unwrap();
            let state = if states.len() > 1 {
                states.remove(0)
            } else {
                states
                    .first()
                    .cloned()
                    .unwrap_or(StackState::CreateComplete)
            };
            Ok(Some(StackObservation {
                state,
                outputs: self.outputs.clone(),
            }))
        }
    }

    fn lifecycle(engine: ScriptedEngine, max_attempts: u32) -> StackLifecycle<ScriptedEngine> {
        StackLifecycle::new(engine, Duration::from_millis(1), max_attempts)
    }

    fn spec() -> StackSpec {
        StackSpec::new("model-import-stack", "Resources: {}")
    }

    #[tokio::test]
    async fn test_absent_stack_creates_once_and_polls_to_complete() {
        let engine = ScriptedEngine::new(
            false,
            vec![
                StackState::Creating,
                StackState::Creating,
                StackState::CreateComplete,
            ],
        );
        let lifecycle = lifecycle(engine, 10);

        let outputs = lifecycle.ensure(&spec()).await.unwrap();
        assert_eq!(
            outputs.get("ModelStorageBucketName"),
            Some("model-bucket-1a2b3c")
        );
        assert_eq!(lifecycle.engine.create_calls(), 1);
        assert_eq!(lifecycle.engine.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_existing_stack_updates_without_create() {
        let engine = ScriptedEngine::new(
            true,
            vec![
                StackState::CreateComplete, // initial describe
                StackState::Updating,
                StackState::UpdateComplete,
            ],
        );
        let lifecycle = lifecycle(engine, 10);

        lifecycle.ensure(&spec()).await.unwrap();
        assert_eq!(lifecycle.engine.create_calls(), 0);
        assert_eq!(lifecycle.engine.update_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_changes_is_success_without_repolling() {
        let mut engine = ScriptedEngine::new(true, vec![StackState::CreateComplete]);
        engine.update_result = Ok(UpdateOutcome::NoChanges);
        let lifecycle = lifecycle(engine, 10);

        let outputs = lifecycle.ensure(&spec()).await.unwrap();
        assert_eq!(
            outputs.get("ModelStorageBucketName"),
            Some("model-bucket-1a2b3c")
        );
        assert_eq!(lifecycle.engine.update_calls(), 1);
        // One describe for the branch decision, none for polling.
        assert_eq!(lifecycle.engine.describe_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_race_falls_through_to_update_exactly_once() {
        let mut engine = ScriptedEngine::new(false, vec![StackState::UpdateComplete]);
        engine.create_result = Some(EngineError::StackAlreadyExists {
            name: "model-import-stack".into(),
        });
        engine.update_result = Ok(UpdateOutcome::NoChanges);
        let lifecycle = lifecycle(engine, 10);

        // describe -> None -> create -> AlreadyExists -> update -> NoChanges
        // -> one re-describe for the outputs.
        let outputs = lifecycle.ensure(&spec()).await.unwrap();
        assert_eq!(
            outputs.get("ModelStorageBucketName"),
            Some("model-bucket-1a2b3c")
        );
        assert_eq!(lifecycle.engine.create_calls(), 1);
        assert_eq!(lifecycle.engine.update_calls(), 1);
        assert_eq!(lifecycle.engine.describe_calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_state_surfaces_status() {
        let engine = ScriptedEngine::new(
            false,
            vec![
                StackState::Creating,
                StackState::Failed("ROLLBACK_COMPLETE".into()),
            ],
        );
        let lifecycle = lifecycle(engine, 10);

        let err = lifecycle.ensure(&spec()).await.unwrap_err();
        match err {
            EngineError::StackFailed { status, .. } => assert_eq!(status, "ROLLBACK_COMPLETE"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_poll_exhaustion_is_wait_timeout() {
        let engine = ScriptedEngine::new(false, vec![StackState::Creating]);
        let lifecycle = lifecycle(engine, 3);

        let err = lifecycle.ensure(&spec()).await.unwrap_err();
        match err {
            EngineError::WaitTimeout { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_error_propagates_verbatim() {
        let mut engine = ScriptedEngine::new(false, vec![]);
        engine.create_result = Some(EngineError::Api {
            message: "Template format error: unresolved resource".into(),
        });
        let lifecycle = lifecycle(engine, 10);

        let err = lifecycle.ensure(&spec()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Engine API error: Template format error: unresolved resource"
        );
        assert_eq!(lifecycle.engine.update_calls(), 0);
    }
}
