//! Deployment package builder.
//!
//! Assembles the callable unit into an uploadable zip: run the packaging
//! toolchain (an external collaborator), stage the handler binary as
//! `bootstrap` next to a build manifest, and archive the staging
//! directory. Both the staging directory and the archive live in temp
//! directories removed on drop, so every exit path releases local disk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::PackageConfig;
use crate::error::{PackageError, StoreError};
use crate::store::ObjectStore;

/// Name the handler binary is staged under (custom-runtime convention).
pub const BOOTSTRAP_NAME: &str = "bootstrap";

/// Name of the build manifest inside the archive.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Build metadata written into the archive.
#[derive(Debug, Serialize, Deserialize)]
pub struct PackageManifest {
    pub package: String,
    pub artifact_sha256: String,
    pub files: Vec<String>,
    pub built_at: String,
}

/// A built archive. The backing file is deleted when this is dropped,
/// success or failure.
#[derive(Debug)]
pub struct DeploymentPackage {
    path: PathBuf,
    _dir: TempDir,
}

impl DeploymentPackage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upload the archive to `bucket/key`. The local file is removed when
    /// the package is dropped, whether or not the upload succeeded.
    pub async fn upload<S: ObjectStore>(
        &self,
        store: &S,
        bucket: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        info!(archive = %self.path.display(), bucket, key, "uploading deployment package");
        store.put_file(&self.path, bucket, key).await
    }
}

/// Builds deployment packages per the configured toolchain and artifact.
pub struct PackageBuilder {
    config: PackageConfig,
}

impl PackageBuilder {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }

    /// Produce a fresh archive containing `bootstrap` and `manifest.json`.
    pub async fn build(&self) -> Result<DeploymentPackage, PackageError> {
        if !self.config.build_command.is_empty() {
            self.run_build_command().await?;
        }

        let artifact = &self.config.artifact;
        if !artifact.exists() {
            return Err(PackageError::ArtifactMissing {
                path: artifact.clone(),
            });
        }

        let staging = TempDir::new()?;
        let bootstrap = staging.path().join(BOOTSTRAP_NAME);
        tokio::fs::copy(artifact, &bootstrap).await?;

        let manifest = PackageManifest {
            package: "modelport-handler".to_string(),
            artifact_sha256: sha256_file(&bootstrap)?,
            files: vec![BOOTSTRAP_NAME.to_string(), MANIFEST_NAME.to_string()],
            built_at: chrono::Utc::now().to_rfc3339(),
        };
        let manifest_bytes =
            serde_json::to_vec_pretty(&manifest).map_err(|e| PackageError::Archive {
                message: e.to_string(),
            })?;
        std::fs::write(staging.path().join(MANIFEST_NAME), manifest_bytes)?;

        let archive_dir = TempDir::new()?;
        let archive_path = archive_dir.path().join("modelport-handler.zip");
        write_archive(staging.path(), &archive_path)?;
        info!(
            archive = %archive_path.display(),
            sha256 = %manifest.artifact_sha256,
            "deployment package built"
        );

        Ok(DeploymentPackage {
            path: archive_path,
            _dir: archive_dir,
        })
    }

    async fn run_build_command(&self) -> Result<(), PackageError> {
        let Some((program, args)) = self.config.build_command.split_first() else {
            return Ok(());
        };
        info!(command = ?self.config.build_command, "running packaging toolchain");
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| PackageError::BuildFailed {
                status: "spawn failed".to_string(),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(PackageError::BuildFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Zip every file under `staging` into `archive_path`, preserving relative
/// names. The bootstrap entry keeps executable permissions.
fn write_archive(staging: &Path, archive_path: &Path) -> Result<(), PackageError> {
    let file = std::fs::File::create(archive_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o755);

    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(staging)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();
        debug!(entry = %name, "archiving");

        let mut content = Vec::new();
        std::fs::File::open(entry.path())?.read_to_end(&mut content)?;
        zip.start_file(&name, options)
            .map_err(|e| PackageError::Archive {
                message: e.to_string(),
            })?;
        zip.write_all(&content)?;
    }

    zip.finish().map_err(|e| PackageError::Archive {
        message: e.to_string(),
    })?;
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String, PackageError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
