//! # Babirusa Builder
//!
//! Builds the PHP CLI binary for a set of versions across a set of platforms and
//! publishes each binary to a GitHub release.
//!
//! Every directory below the build root holding a `Dockerfile` is one platform.
//! For each (platform, version) pair the builder:
//!
//! 1. builds a Docker image from the platform's Dockerfile,
//! 2. starts a container and copies `sapi/cli/php` out of it,
//! 3. finds or creates the release `php-<platform>-v<version>` and replaces its
//!    `php` asset with the new binary,
//! 4. removes the container, image and local copy, whatever happened before.
//!
//! ## Usage
//!
//! ```bash
//! babirusa-builder 8.1 8.2                 # build every platform, no upload
//! babirusa-builder -p linux -u 8.2         # build linux only and publish
//! babirusa-builder --fail-fast -u 8.1 8.2  # stop at the first failure
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build;
pub mod cli;
pub mod discovery;
pub mod error;
pub mod github;

pub use build::{BuildEngine, BuildEnvironment, FailurePolicy, Orchestrator};
pub use cli::Args;
pub use discovery::{BuildTarget, PlatformFilter, discover_targets, release_tag};
pub use error::{BuilderError, Result};
pub use github::{ReleaseReconciler, ReleaseStore, RepoCoordinates};

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Repository builds are published to unless configured otherwise
pub const DEFAULT_REPOSITORY: &str = "babirusa/babirusa-runtime";

/// Configuration for a build run
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Directory searched for platform Dockerfiles
    pub root: PathBuf,
    /// Directory extracted artifacts are written to
    pub workdir: PathBuf,
    /// Platform allow-list (empty = all)
    pub platforms: Vec<String>,
    /// PHP versions to build
    pub versions: Vec<String>,
    /// Repository releases are published to
    pub repository: RepoCoordinates,
    /// Publish artifacts
    pub upload: bool,
    /// What to do after a failed pair
    pub failure_policy: FailurePolicy,
    /// Extra build arguments from pass-through flags
    pub build_args: BTreeMap<String, Option<String>>,
    /// GitHub REST API endpoint
    pub github_api_url: String,
    /// GitHub upload endpoint
    pub github_upload_url: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            workdir: std::env::temp_dir(),
            platforms: Vec::new(),
            versions: Vec::new(),
            repository: RepoCoordinates {
                owner: "babirusa".to_string(),
                name: "babirusa-runtime".to_string(),
            },
            upload: false,
            failure_policy: FailurePolicy::Continue,
            build_args: BTreeMap::new(),
            github_api_url: github::DEFAULT_API_URL.to_string(),
            github_upload_url: github::DEFAULT_UPLOAD_URL.to_string(),
        }
    }
}
