//! Error types for the modelport core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the infra engine, model hub, object store, packaging, and
//! import-job domains.

use std::path::PathBuf;

/// Top-level error type for the modelport core library.
#[derive(Debug, thiserror::Error)]
pub enum ModelportError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Hub error: {0}")]
    Hub(#[from] HubError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the infrastructure engine (stack create/update/describe).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stack '{name}' already exists")]
    StackAlreadyExists { name: String },

    #[error("Stack '{name}' not found")]
    StackNotFound { name: String },

    #[error("Stack '{name}' reached failure state {status}")]
    StackFailed { name: String, status: String },

    #[error("Timed out waiting for stack '{name}' after {attempts} attempts")]
    WaitTimeout { name: String, attempts: u32 },

    #[error("Stack '{name}' completed without required output '{key}'")]
    MissingOutput { name: String, key: String },

    #[error("Engine API error: {message}")]
    Api { message: String },
}

/// Errors from the model hub (repo listing and file downloads).
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Repository '{repo}' not found on the hub")]
    RepoNotFound { repo: String },

    #[error("Hub request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Hub response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Download of '{path}' failed: {message}")]
    Download { path: String, message: String },

    #[error("Hub connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the object store (uploads and size probes).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Upload of '{key}' to bucket '{bucket}' failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Size probe of '{key}' in bucket '{bucket}' failed: {message}")]
    Head {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the deployment package builder.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Build command exited with {status}: {stderr}")]
    BuildFailed { status: String, stderr: String },

    #[error("Handler artifact not found: {path}")]
    ArtifactMissing { path: PathBuf },

    #[error("Archive write failed: {message}")]
    Archive { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the managed import-job service.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Import job request failed: {message}")]
    Request { message: String },

    #[error("Import job response missing the job ARN")]
    MissingArn,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `ModelportError`.
pub type Result<T> = std::result::Result<T, ModelportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_engine() {
        let err = ModelportError::Engine(EngineError::StackAlreadyExists {
            name: "model-import-stack".into(),
        });
        assert_eq!(
            err.to_string(),
            "Engine error: Stack 'model-import-stack' already exists"
        );
    }

    #[test]
    fn test_error_display_wait_timeout() {
        let err = EngineError::WaitTimeout {
            name: "model-import-stack".into(),
            attempts: 60,
        };
        assert_eq!(
            err.to_string(),
            "Timed out waiting for stack 'model-import-stack' after 60 attempts"
        );
    }

    #[test]
    fn test_error_display_missing_output() {
        let err = EngineError::MissingOutput {
            name: "model-import-stack".into(),
            key: "ModelStorageBucketName".into(),
        };
        assert_eq!(
            err.to_string(),
            "Stack 'model-import-stack' completed without required output 'ModelStorageBucketName'"
        );
    }

    #[test]
    fn test_error_display_store() {
        let err = ModelportError::Store(StoreError::Upload {
            bucket: "model-bucket".into(),
            key: "weights/model-00001.safetensors".into(),
            message: "access denied".into(),
        });
        assert_eq!(
            err.to_string(),
            "Store error: Upload of 'weights/model-00001.safetensors' to bucket 'model-bucket' failed: access denied"
        );
    }

    #[test]
    fn test_error_display_package() {
        let err = PackageError::BuildFailed {
            status: "exit status: 101".into(),
            stderr: "linker not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "Build command exited with exit status: 101: linker not found"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ModelportError = io_err.into();
        assert!(matches!(err, ModelportError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ModelportError = serde_err.into();
        assert!(matches!(err, ModelportError::Serialization(_)));
    }
}
