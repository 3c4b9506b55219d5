//! Build environments and the per-pair build pipeline.
//!
//! # Module Structure
//!
//! - `docker` - Docker CLI backed [`BuildEngine`]
//! - `extract` - Artifact extraction and local artifact lifetime
//! - `orchestrator` - Drives one (platform, version) pair from build to teardown

pub mod docker;
pub mod extract;
pub mod orchestrator;

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use docker::{DockerEngine, DockerEnvironment, check_docker_available};
pub use extract::{ArtifactFile, extract_artifact};
pub use orchestrator::{FailurePolicy, Orchestrator, PairOutcome, PairReport, RunSummary};

/// Lifecycle state of a live build environment.
///
/// `destroyed` has no variant: destroying consumes the environment handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    /// Image built, nothing running yet
    Built,
    /// Environment is running and artifacts can be copied out
    Started,
}

/// A handle to a build isolate produced by a [`BuildEngine`]
pub trait BuildEnvironment {
    /// Tag the environment was built under
    fn tag(&self) -> &str;

    /// Current lifecycle state
    fn state(&self) -> EnvironmentState;
}

/// Everything the engine needs to build one environment
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Tag for the resulting environment
    pub tag: String,
    /// Manifest (Dockerfile) to build from
    pub manifest_path: PathBuf,
    /// Directory used as build context
    pub context_dir: PathBuf,
    /// Build arguments, forwarded as `NAME[=value]`
    pub build_args: BTreeMap<String, Option<String>>,
}

impl BuildRequest {
    /// Render build arguments as `NAME=value` / `NAME` strings
    pub fn rendered_build_args(&self) -> Vec<String> {
        self.build_args
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{}={}", name, value),
                None => name.clone(),
            })
            .collect()
    }
}

/// Collaborator that turns manifests into running build environments.
///
/// The orchestrator only sequences these calls; image construction belongs to
/// the engine. `destroy` takes the environment by value so every handle is
/// destroyed at most once.
#[allow(async_fn_in_trait)]
pub trait BuildEngine {
    /// Environment handle type
    type Environment: BuildEnvironment;

    /// Build an environment for `request`
    async fn build(&self, request: &BuildRequest) -> Result<Self::Environment>;

    /// Start a built environment
    async fn start(&self, environment: &mut Self::Environment) -> Result<()>;

    /// Copy `source` from inside the environment to `destination`
    async fn copy_out(
        &self,
        environment: &Self::Environment,
        source: &str,
        destination: &Path,
    ) -> Result<()>;

    /// Tear the environment down
    async fn destroy(&self, environment: Self::Environment) -> Result<()>;
}

/// Build argument carrying the PHP source version
pub const PHP_VERSION_BUILD_ARG: &str = "PHP_VERSION";

/// Value of [`PHP_VERSION_BUILD_ARG`] for `version`
pub fn php_version_arg(version: &str) -> String {
    format!("php-{}", version)
}

/// Location of the compiled CLI binary inside a build environment
pub fn container_artifact_path(version: &str) -> String {
    format!("/php-src-php-{}/sapi/cli/php", version)
}

/// Local artifact file name, unique per (platform, version)
pub fn artifact_file_name(platform: &str, version: &str) -> String {
    format!("php-{}-{}", platform, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_constants() {
        assert_eq!(php_version_arg("8.1"), "php-8.1");
        assert_eq!(container_artifact_path("8.1"), "/php-src-php-8.1/sapi/cli/php");
        assert_eq!(artifact_file_name("linux", "8.1"), "php-linux-8.1");
        assert_ne!(
            artifact_file_name("linux", "8.1"),
            artifact_file_name("darwin", "8.1")
        );
    }

    #[test]
    fn test_rendered_build_args() {
        let mut build_args = BTreeMap::new();
        build_args.insert(PHP_VERSION_BUILD_ARG.to_string(), Some(php_version_arg("8.2")));
        build_args.insert("WITH_XDEBUG".to_string(), None);

        let request = BuildRequest {
            tag: "php-linux-v8.2".to_string(),
            manifest_path: PathBuf::from("linux/Dockerfile"),
            context_dir: PathBuf::from("linux"),
            build_args,
        };

        assert_eq!(
            request.rendered_build_args(),
            vec!["PHP_VERSION=php-8.2".to_string(), "WITH_XDEBUG".to_string()]
        );
    }
}
