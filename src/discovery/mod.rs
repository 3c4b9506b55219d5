//! Build context discovery.
//!
//! Walks a build root and yields one [`BuildTarget`] per platform `Dockerfile`.
//! The platform identifier is the name of the directory holding the manifest,
//! at any depth below the root.

use crate::error::{DiscoveryError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name that marks a directory as a platform build context
pub const MANIFEST_FILE_NAME: &str = "Dockerfile";

/// A discovered platform build context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    platform: String,
    manifest_path: PathBuf,
}

impl BuildTarget {
    /// Create a target for `manifest_path`, deriving the platform from its parent directory.
    ///
    /// Returns `None` when the manifest has no named parent directory.
    pub fn from_manifest(manifest_path: impl Into<PathBuf>) -> Option<Self> {
        let manifest_path = manifest_path.into();
        let platform = manifest_path
            .parent()?
            .file_name()?
            .to_string_lossy()
            .into_owned();

        Some(Self {
            platform,
            manifest_path,
        })
    }

    /// Platform identifier (the manifest's parent directory name)
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Path to the manifest file
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Directory used as the build context
    pub fn context_dir(&self) -> &Path {
        // from_manifest guarantees a parent
        self.manifest_path.parent().unwrap_or(Path::new("."))
    }

    /// Release tag for this platform at `version`: `php-<platform>-v<version>`
    pub fn release_tag(&self, version: &str) -> String {
        release_tag(&self.platform, version)
    }
}

/// Canonical release tag for a platform and version
pub fn release_tag(platform: &str, version: &str) -> String {
    format!("php-{}-v{}", platform, version)
}

/// Platform allow-list. Empty means every platform is allowed.
#[derive(Debug, Clone, Default)]
pub struct PlatformFilter {
    allowed: BTreeSet<String>,
}

impl PlatformFilter {
    /// Build a filter from a list of platform identifiers
    pub fn new<I, S>(platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: platforms.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `platform` passes the filter
    pub fn allows(&self, platform: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(platform)
    }

    /// Whether the filter accepts everything
    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Discover build targets below `root`.
///
/// The returned iterator is lazy and walks the tree as it is consumed. Entries
/// that cannot be read are skipped.
///
/// Only regular files named exactly [`MANIFEST_FILE_NAME`] qualify. Symbolic
/// links are not followed.
pub fn discover_targets(
    root: &Path,
    filter: PlatformFilter,
) -> Result<impl Iterator<Item = BuildTarget> + use<>> {
    // Relative roots like `.` would leave top-level manifests without a named parent
    let root = match root.canonicalize() {
        Ok(root) if root.is_dir() => root,
        _ => {
            return Err(DiscoveryError::InvalidRoot {
                path: root.to_path_buf(),
            }
            .into());
        }
    };

    let walker = WalkDir::new(&root).follow_links(false).into_iter();

    Ok(walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!(
                    "Skipping unreadable path {}: {}",
                    e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                    e
                );
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE_NAME)
        .filter_map(|entry| BuildTarget::from_manifest(entry.into_path()))
        .filter(move |target| {
            let allowed = filter.allows(target.platform());
            if !allowed {
                log::debug!("Skipping platform '{}' (not in allow-list)", target.platform());
            }
            allowed
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_tag_scheme() {
        assert_eq!(release_tag("linux", "8.1"), "php-linux-v8.1");
        assert_eq!(release_tag("darwin", "7.4.33"), "php-darwin-v7.4.33");
    }

    #[test]
    fn test_platform_from_parent_directory() {
        let target = BuildTarget::from_manifest("/builds/alpine/x86_64/Dockerfile").unwrap();
        assert_eq!(target.platform(), "x86_64");
        assert_eq!(target.context_dir(), Path::new("/builds/alpine/x86_64"));
        assert_eq!(target.release_tag("8.2"), "php-x86_64-v8.2");
    }

    #[test]
    fn test_manifest_without_parent_name() {
        assert!(BuildTarget::from_manifest("Dockerfile").is_none());
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = PlatformFilter::default();
        assert!(filter.is_unrestricted());
        assert!(filter.allows("linux"));
    }

    #[test]
    fn test_filter_membership() {
        let filter = PlatformFilter::new(["linux", "darwin"]);
        assert!(filter.allows("linux"));
        assert!(!filter.allows("windows"));
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let result = discover_targets(Path::new("/nonexistent/build/root"), PlatformFilter::default());
        assert!(result.is_err());
    }
}
