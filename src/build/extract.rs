//! Artifact extraction from a running build environment.

use super::{BuildEngine, BuildEnvironment, EnvironmentState};
use crate::error::{ExtractionError, Result};
use std::path::{Path, PathBuf};

/// Copy `source` out of `environment` into `destination`.
///
/// The environment must be started. The copied file must be non-empty. Cleanup
/// of a partially written `destination` is the caller's job, see [`ArtifactFile`].
pub async fn extract_artifact<E: BuildEngine>(
    engine: &E,
    environment: &E::Environment,
    source: &str,
    destination: &Path,
) -> Result<PathBuf> {
    if environment.state() != EnvironmentState::Started {
        return Err(ExtractionError::NotStarted {
            tag: environment.tag().to_string(),
        }
        .into());
    }

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtractionError::WriteFailed {
                destination: destination.to_path_buf(),
                reason: e.to_string(),
            })?;
    }

    engine.copy_out(environment, source, destination).await?;

    let metadata =
        tokio::fs::metadata(destination)
            .await
            .map_err(|e| ExtractionError::WriteFailed {
                destination: destination.to_path_buf(),
                reason: e.to_string(),
            })?;

    if metadata.len() == 0 {
        return Err(ExtractionError::EmptyArtifact {
            destination: destination.to_path_buf(),
        }
        .into());
    }

    log::info!(
        "Extracted {} from {} ({} bytes)",
        source,
        environment.tag(),
        metadata.len()
    );

    Ok(destination.to_path_buf())
}

/// Scoped ownership of a local artifact path.
///
/// The file is removed when the guard goes out of scope, whatever the outcome of
/// the work done in between. Removal is best-effort: a missing file or a failed
/// unlink is ignored.
#[derive(Debug)]
pub struct ArtifactFile {
    path: PathBuf,
}

impl ArtifactFile {
    /// Take ownership of `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactFile {
    fn drop(&mut self) {
        // best-effort
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::debug!("Ignoring failure to remove {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("php-linux-8.1");
        std::fs::write(&path, b"binary").unwrap();

        {
            let artifact = ArtifactFile::new(&path);
            assert!(artifact.path().exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_artifact_file_missing_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactFile::new(dir.path().join("never-written"));
        drop(artifact);
    }
}
