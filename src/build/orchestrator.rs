//! Per-pair build pipeline and the platform × version loop driving it.
//!
//! Every environment built here is destroyed before `build_and_publish`
//! returns, and every local artifact is removed, whether the pair succeeded,
//! failed, or was interrupted.

use super::extract::{ArtifactFile, extract_artifact};
use super::{
    BuildEngine, BuildRequest, PHP_VERSION_BUILD_ARG, artifact_file_name,
    container_artifact_path, php_version_arg,
};
use crate::cli::OutputManager;
use crate::discovery::BuildTarget;
use crate::error::{BuilderError, Result};
use crate::github::{AssetStage, ReconcileOutcome, ReleaseReconciler, ReleaseStore};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// What to do with the remaining pairs after one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep processing, report failures at the end
    #[default]
    Continue,
    /// Stop the run at the first failed pair
    AbortRun,
}

/// Result of a pair that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// Artifact built and published
    Published {
        /// Id of the uploaded asset
        asset_id: u64,
        /// Whether the release was created by this run
        created_release: bool,
    },
    /// Artifact built and extracted; uploading is disabled
    Verified,
    /// Artifact built but the asset phase failed and was reported
    Reported {
        /// Where the asset phase stopped
        stage: AssetStage,
        /// Store's explanation
        reason: String,
    },
}

/// Record of one (platform, version) pair in a run
#[derive(Debug)]
pub struct PairReport {
    /// Platform identifier
    pub platform: String,
    /// PHP version
    pub version: String,
    /// Release tag
    pub tag: String,
    /// Outcome, or the error that ended the pair
    pub result: std::result::Result<PairOutcome, BuilderError>,
}

impl PairReport {
    /// Whether this pair counts as a success for the exit status
    pub fn succeeded(&self) -> bool {
        matches!(
            self.result,
            Ok(PairOutcome::Published { .. }) | Ok(PairOutcome::Verified)
        )
    }
}

/// Summary of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per attempted pair, in processing order
    pub reports: Vec<PairReport>,
    /// Whether the run stopped on an interrupt
    pub interrupted: bool,
}

impl RunSummary {
    /// Number of failed pairs
    pub fn failures(&self) -> usize {
        self.reports.iter().filter(|r| !r.succeeded()).count()
    }

    /// Process exit status: 0 when every pair succeeded, 130 when interrupted, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.failures() > 0 {
            1
        } else {
            0
        }
    }
}

/// Drives build targets through build, extract, publish and teardown
pub struct Orchestrator<'a, E, S> {
    engine: &'a E,
    reconciler: Option<ReleaseReconciler<'a, S>>,
    workdir: PathBuf,
    build_args: BTreeMap<String, Option<String>>,
    output: &'a OutputManager,
    cancel: CancellationToken,
}

impl<'a, E: BuildEngine, S: ReleaseStore> Orchestrator<'a, E, S> {
    /// Create an orchestrator writing artifacts under `workdir`.
    ///
    /// Without a reconciler, pairs are built and extracted but nothing is published.
    pub fn new(
        engine: &'a E,
        reconciler: Option<ReleaseReconciler<'a, S>>,
        workdir: PathBuf,
        output: &'a OutputManager,
    ) -> Self {
        Self {
            engine,
            reconciler,
            workdir,
            build_args: BTreeMap::new(),
            output,
            cancel: CancellationToken::new(),
        }
    }

    /// Extra build arguments forwarded to every build
    pub fn with_build_args(mut self, build_args: BTreeMap<String, Option<String>>) -> Self {
        self.build_args = build_args;
        self
    }

    /// Token that interrupts the run when cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build every target at every version.
    ///
    /// Targets are consumed lazily; with [`FailurePolicy::AbortRun`] the
    /// remaining targets are never discovered once a pair fails.
    pub async fn run<I>(&self, targets: I, versions: &[String], policy: FailurePolicy) -> RunSummary
    where
        I: IntoIterator<Item = BuildTarget>,
    {
        let mut summary = RunSummary::default();
        let mut seen_platforms = HashSet::new();

        'targets: for target in targets {
            if !seen_platforms.insert(target.platform().to_string()) {
                self.output.warn(&format!(
                    "Platform '{}' found again at {}; it shares release tags with the earlier one",
                    target.platform(),
                    target.manifest_path().display()
                ));
            }

            for version in versions {
                self.output.section(&format!(
                    "Building PHP version {} for {} platform",
                    version,
                    target.platform()
                ));

                let result = self.build_and_publish(&target, version).await;
                let report = PairReport {
                    platform: target.platform().to_string(),
                    version: version.clone(),
                    tag: target.release_tag(version),
                    result,
                };

                // Errors are printed once, by the caller's summary
                match &report.result {
                    Err(BuilderError::Cancelled) => {
                        log::info!("{}: interrupted", report.tag);
                        summary.interrupted = true;
                    }
                    Err(e) => log::debug!("{}: {}", report.tag, e),
                    Ok(_) => {}
                }

                let failed = !report.succeeded();
                summary.reports.push(report);

                if summary.interrupted || (failed && policy == FailurePolicy::AbortRun) {
                    break 'targets;
                }
            }
        }

        summary
    }

    /// Build `target` at `version`, extract the artifact and publish it.
    pub async fn build_and_publish(&self, target: &BuildTarget, version: &str) -> Result<PairOutcome> {
        let tag = target.release_tag(version);

        let mut build_args = self.build_args.clone();
        build_args.insert(
            PHP_VERSION_BUILD_ARG.to_string(),
            Some(php_version_arg(version)),
        );
        let request = BuildRequest {
            tag: tag.clone(),
            manifest_path: target.manifest_path().to_path_buf(),
            context_dir: target.context_dir().to_path_buf(),
            build_args,
        };

        self.output.progress(&format!("Building environment {}", tag));
        let mut environment = self.cancellable(self.engine.build(&request)).await?;

        let result = self
            .cancellable(self.publish_from(&mut environment, target, version, &tag))
            .await;

        if let Err(e) = self.engine.destroy(environment).await {
            self.output.warn(&e.to_string());
        } else {
            log::info!("Destroyed environment {}", tag);
        }

        result
    }

    async fn publish_from(
        &self,
        environment: &mut E::Environment,
        target: &BuildTarget,
        version: &str,
        tag: &str,
    ) -> Result<PairOutcome> {
        self.engine.start(environment).await?;

        let artifact = ArtifactFile::new(
            self.workdir
                .join(artifact_file_name(target.platform(), version)),
        );

        extract_artifact(
            self.engine,
            environment,
            &container_artifact_path(version),
            artifact.path(),
        )
        .await?;

        let Some(reconciler) = &self.reconciler else {
            self.output
                .success(&format!("Built {} (upload disabled)", tag));
            return Ok(PairOutcome::Verified);
        };

        let outcome = match reconciler.reconcile(tag, artifact.path()).await? {
            ReconcileOutcome::Published {
                asset,
                created_release,
                ..
            } => PairOutcome::Published {
                asset_id: asset.id,
                created_release,
            },
            ReconcileOutcome::Reported { stage, reason, .. } => {
                PairOutcome::Reported { stage, reason }
            }
        };

        Ok(outcome)
    }

    async fn cancellable<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BuilderError::Cancelled),
            result = work => result,
        }
    }
}
