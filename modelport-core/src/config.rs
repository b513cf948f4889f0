//! Configuration system for modelport.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> environment -> explicit overrides. Configuration is
//! loaded from `~/.config/modelport/config.toml` and/or
//! `.modelport/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::UploadPolicy;

/// Top-level configuration for the modelport tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    pub stack: StackConfig,
    pub aws: AwsConfig,
    pub model: ModelConfig,
    pub hub: HubConfig,
    pub storage: StorageConfig,
    pub import: ImportConfig,
    pub package: PackageConfig,
}

/// Stack identity and polling behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Name of the stack to create or update.
    pub name: String,
    /// Path to the template file submitted to the engine.
    pub template: PathBuf,
    /// Capability flags acknowledged on submit.
    pub capabilities: Vec<String>,
    /// Seconds between stack-state polls.
    pub poll_delay_secs: u64,
    /// Poll attempts before giving up with a timeout error.
    pub max_poll_attempts: u32,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: "model-import-stack".to_string(),
            template: PathBuf::from("templates/model-import-stack.yaml"),
            capabilities: vec!["CAPABILITY_IAM".to_string()],
            poll_delay_secs: 30,
            max_poll_attempts: 60,
        }
    }
}

/// AWS session settings shared by every service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// Optional named credential profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            profile: None,
        }
    }
}

/// The model repository to stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hub repository id, e.g. `deepseek-ai/DeepSeek-R1-Distill-Llama-8B`.
    pub repo_id: String,
    /// Revision (branch, tag, or commit) to snapshot.
    pub revision: String,
    /// Local download root. Defaults to the repository name under the
    /// current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
    /// Remote key prefix. Defaults to the repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo_id: String::new(),
            revision: "main".to_string(),
            local_dir: None,
            prefix: None,
        }
    }
}

impl ModelConfig {
    /// The trailing segment of the repo id (`org/name` -> `name`).
    pub fn repo_name(&self) -> &str {
        self.repo_id
            .rsplit('/')
            .next()
            .unwrap_or(self.repo_id.as_str())
    }

    pub fn effective_local_dir(&self) -> PathBuf {
        self.local_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.repo_name()))
    }

    pub fn effective_prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(|| self.repo_name().to_string())
    }

    /// Fail early when staging is requested without a repository id.
    pub fn require_repo_id(&self) -> Result<&str, ConfigError> {
        if self.repo_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "model.repo_id".to_string(),
            });
        }
        Ok(&self.repo_id)
    }
}

/// Model hub endpoint and authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub base URL.
    pub endpoint: String,
    /// Environment variable holding the hub access token, read at client
    /// construction. Anonymous access is used when unset.
    pub token_env: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://huggingface.co".to_string(),
            token_env: "HF_TOKEN".to_string(),
        }
    }
}

/// Object storage behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Route uploads through the bucket's transfer-acceleration endpoint.
    pub transfer_acceleration: bool,
    /// What to do when a staging key already holds an object.
    pub upload_policy: UploadPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            transfer_acceleration: false,
            upload_policy: UploadPolicy::default(),
        }
    }
}

/// Import-job identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Prefix for generated job names; a UTC timestamp is appended so
    /// re-runs never collide on the service's unique-name constraint.
    pub job_name_prefix: String,
    /// Name under which the imported model is served.
    pub imported_model_name: String,
    /// Role assumed by the import job. Falls back to the stack's
    /// `ModelImportRoleArn` output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            job_name_prefix: "model-import".to_string(),
            imported_model_name: "imported-model".to_string(),
            role_arn: None,
        }
    }
}

/// Deployment package assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Command that produces the handler artifact (the packaging toolchain).
    /// Skipped when empty, in which case `artifact` must already exist.
    pub build_command: Vec<String>,
    /// Path to the built handler binary staged into the archive as
    /// `bootstrap`.
    pub artifact: PathBuf,
    /// Object key the archive is uploaded under.
    pub key: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            build_command: vec![
                "cargo".to_string(),
                "build".to_string(),
                "--release".to_string(),
                "--target".to_string(),
                "x86_64-unknown-linux-musl".to_string(),
                "-p".to_string(),
                "modelport-handler".to_string(),
            ],
            artifact: PathBuf::from("target/x86_64-unknown-linux-musl/release/modelport-handler"),
            key: "lambda/modelport-handler.zip".to_string(),
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `MODELPORT_`)
/// 3. Workspace-local config (`.modelport/config.toml`)
/// 4. User config (`~/.config/modelport/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&DeployConfig>,
) -> Result<DeployConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "modelport", "modelport") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".modelport").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (MODELPORT_STACK__NAME, MODELPORT_AWS__REGION, etc.)
    figment = figment.merge(Env::prefixed("MODELPORT_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any modelport configuration file exists (user-level or
/// workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "modelport", "modelport") {
        if config_dir.config_dir().join("config.toml").exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if ws.join(".modelport").join("config.toml").exists() {
            return true;
        }
    }

    false
}

/// Write the default configuration to `<workspace>/.modelport/config.toml`
/// and return the path. Refuses to clobber an existing file.
pub fn write_default_config(workspace: &Path) -> Result<PathBuf, ConfigError> {
    let config_dir = workspace.join(".modelport");
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        return Err(ConfigError::Invalid {
            message: format!("config already exists at {}", config_path.display()),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Invalid {
        message: format!("cannot create {}: {e}", config_dir.display()),
    })?;
    let toml_str =
        toml::to_string_pretty(&DeployConfig::default()).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
    std::fs::write(&config_path, toml_str).map_err(|e| ConfigError::Invalid {
        message: format!("cannot write {}: {e}", config_path.display()),
    })?;
    Ok(config_path)
}
