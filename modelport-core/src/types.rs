//! Fundamental types shared across the modelport core.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::EngineError;

/// Well-known stack output naming the bucket that receives staged artifacts.
pub const OUTPUT_MODEL_BUCKET: &str = "ModelStorageBucketName";

/// Well-known stack output naming the role assumed by the import job.
pub const OUTPUT_IMPORT_ROLE: &str = "ModelImportRoleArn";

/// Everything the engine needs to create or update a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSpec {
    /// Stack name, unique within the target account/region.
    pub name: String,
    /// Full template body as text.
    pub template_body: String,
    /// Capability flags acknowledged on submit (e.g. `CAPABILITY_IAM`).
    pub capabilities: Vec<String>,
}

impl StackSpec {
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_body: template_body.into(),
            capabilities: vec!["CAPABILITY_IAM".to_string()],
        }
    }
}

/// Lifecycle state of a stack as observed through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackState {
    /// No stack with the given name exists.
    Absent,
    Creating,
    CreateComplete,
    Updating,
    UpdateComplete,
    /// Any rollback, delete, or *_FAILED status, carrying the raw status text.
    Failed(String),
}

impl StackState {
    /// Map a raw engine status string onto the lifecycle states this tool
    /// distinguishes. Unknown statuses are conservatively treated as failed.
    pub fn from_status(status: &str) -> Self {
        match status {
            "CREATE_IN_PROGRESS" => Self::Creating,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "UPDATE_IN_PROGRESS" | "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => Self::Updating,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            other => Self::Failed(other.to_string()),
        }
    }

    /// Whether the engine will make no further automatic progress.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Creating | Self::Updating)
    }

    /// Whether this is a successful terminal state.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::CreateComplete | Self::UpdateComplete)
    }
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Creating => write!(f, "creating"),
            Self::CreateComplete => write!(f, "create-complete"),
            Self::Updating => write!(f, "updating"),
            Self::UpdateComplete => write!(f, "update-complete"),
            Self::Failed(status) => write!(f, "failed ({status})"),
        }
    }
}

/// A point-in-time view of a stack: its state and currently exported outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackObservation {
    pub state: StackState,
    pub outputs: StackOutputs,
}

/// Read-only mapping of stack output keys to exported values.
///
/// Populated only after a successful terminal state; `require` is how
/// downstream steps assert the outputs they cannot proceed without.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutputs {
    values: HashMap<String, String>,
}

impl StackOutputs {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a well-known output, failing with `MissingOutput` if the
    /// stack completed without exporting it.
    pub fn require(&self, stack_name: &str, key: &str) -> Result<&str, EngineError> {
        self.get(key).ok_or_else(|| EngineError::MissingOutput {
            name: stack_name.to_string(),
            key: key.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    /// Render the mapping as pretty JSON for terminal display.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FromIterator<(String, String)> for StackOutputs {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Overwrite policy applied when an object already exists at a staging key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPolicy {
    /// Upload every file unconditionally.
    Always,
    /// Skip files whose remote object already reports the same byte size.
    /// Avoids re-pushing multi-gigabyte shards on a re-run without paying
    /// for a checksum pass.
    #[default]
    SkipIfSameSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stack_state_from_status() {
        assert_eq!(
            StackState::from_status("CREATE_IN_PROGRESS"),
            StackState::Creating
        );
        assert_eq!(
            StackState::from_status("CREATE_COMPLETE"),
            StackState::CreateComplete
        );
        assert_eq!(
            StackState::from_status("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            StackState::Updating
        );
        assert_eq!(
            StackState::from_status("ROLLBACK_COMPLETE"),
            StackState::Failed("ROLLBACK_COMPLETE".to_string())
        );
    }

    #[test]
    fn test_stack_state_predicates() {
        assert!(StackState::CreateComplete.is_terminal());
        assert!(StackState::CreateComplete.is_success());
        assert!(StackState::Failed("CREATE_FAILED".into()).is_terminal());
        assert!(!StackState::Failed("CREATE_FAILED".into()).is_success());
        assert!(!StackState::Creating.is_terminal());
        assert!(StackState::Absent.is_terminal());
        assert!(!StackState::Absent.is_success());
    }

    #[test]
    fn test_outputs_require() {
        let outputs: StackOutputs = [(
            OUTPUT_MODEL_BUCKET.to_string(),
            "model-bucket-1a2b3c".to_string(),
        )]
        .into_iter()
        .collect();

        assert_eq!(
            outputs.require("stack", OUTPUT_MODEL_BUCKET).unwrap(),
            "model-bucket-1a2b3c"
        );
        let err = outputs.require("stack", OUTPUT_IMPORT_ROLE).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stack 'stack' completed without required output 'ModelImportRoleArn'"
        );
    }

    #[test]
    fn test_outputs_pretty_json() {
        let outputs: StackOutputs = [("Key".to_string(), "value".to_string())]
            .into_iter()
            .collect();
        let json = outputs.to_pretty_json();
        assert!(json.contains("\"Key\": \"value\""));
    }

    #[test]
    fn test_upload_policy_serde() {
        let policy: UploadPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(policy, UploadPolicy::Always);
        assert_eq!(UploadPolicy::default(), UploadPolicy::SkipIfSameSize);
    }
}
