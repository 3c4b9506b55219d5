//! Release reconciliation: find-or-create the release for a tag, then replace
//! the canonical asset.
//!
//! ```text
//! resolving-release -> (creating-release) -> listing-assets
//!     -> removing-stale-assets (best-effort) -> uploading -> done | reported
//! ```
//!
//! Only release resolution can fail the call. Everything after it is reported
//! through the output's error channel and folded into [`ReconcileOutcome`].

use super::store::{Asset, ReleaseStore, RepoCoordinates};
use crate::cli::OutputManager;
use crate::error::Result;
use bytes::Bytes;
use std::path::Path;

/// Asset name that is kept unique on every release
pub const CANONICAL_ASSET_NAME: &str = "php";

/// Content type of uploaded artifacts
pub const ASSET_CONTENT_TYPE: &str = "application/octet-stream";

/// Step at which the asset phase gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStage {
    /// Listing the release's current assets
    Listing,
    /// Uploading the new asset
    Uploading,
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The new asset is in place
    Published {
        /// Release the asset was attached to
        release_id: u64,
        /// Whether the release had to be created
        created_release: bool,
        /// The uploaded asset
        asset: Asset,
        /// Stale assets removed before upload
        removed: usize,
        /// Stale assets whose removal failed
        removal_failures: usize,
    },
    /// The asset phase failed; the failure was reported, not raised
    Reported {
        /// Release being reconciled
        release_id: u64,
        /// Where it stopped
        stage: AssetStage,
        /// Store's explanation
        reason: String,
    },
}

/// Reconciles releases of one repository
pub struct ReleaseReconciler<'a, S> {
    store: &'a S,
    repository: &'a RepoCoordinates,
    output: &'a OutputManager,
}

impl<'a, S: ReleaseStore> ReleaseReconciler<'a, S> {
    /// Create a reconciler for `repository`
    pub fn new(store: &'a S, repository: &'a RepoCoordinates, output: &'a OutputManager) -> Self {
        Self {
            store,
            repository,
            output,
        }
    }

    /// Ensure the release for `tag` carries exactly one [`CANONICAL_ASSET_NAME`]
    /// asset holding the contents of `artifact`.
    pub async fn reconcile(&self, tag: &str, artifact: &Path) -> Result<ReconcileOutcome> {
        let content = Bytes::from(tokio::fs::read(artifact).await?);

        let (release, created_release) =
            match self.store.find_release_by_tag(self.repository, tag).await? {
                Some(release) => (release, false),
                None => {
                    self.output
                        .indent(&format!("Creating release {} in {}", tag, self.repository));
                    (self.store.create_release(self.repository, tag).await?, true)
                }
            };

        self.output.progress("Uploading asset to GitHub");

        let assets = match self.store.list_assets(self.repository, &release).await {
            Ok(assets) => assets,
            Err(e) => {
                self.output
                    .error(&format!("Failed to list assets of release {}: {}", tag, e));
                return Ok(ReconcileOutcome::Reported {
                    release_id: release.id,
                    stage: AssetStage::Listing,
                    reason: e.to_string(),
                });
            }
        };

        let mut removed = 0;
        let mut removal_failures = 0;
        for stale in assets.iter().filter(|a| a.name == CANONICAL_ASSET_NAME) {
            match self.store.remove_asset(self.repository, stale.id).await {
                Ok(()) => {
                    log::info!("Removed asset {} ({}) from {}", stale.name, stale.id, tag);
                    removed += 1;
                }
                Err(e) => {
                    // Upload is still attempted; the store may reject the duplicate name.
                    self.output.warn(&format!(
                        "Failed to remove asset {} ({}) from {}: {}",
                        stale.name, stale.id, tag, e
                    ));
                    removal_failures += 1;
                }
            }
        }

        let size = content.len();
        match self
            .store
            .create_asset(
                self.repository,
                release.id,
                CANONICAL_ASSET_NAME,
                ASSET_CONTENT_TYPE,
                content,
            )
            .await
        {
            Ok(asset) => {
                self.output.success(&format!(
                    "Uploaded {} to {} ({} bytes)",
                    CANONICAL_ASSET_NAME, tag, size
                ));
                Ok(ReconcileOutcome::Published {
                    release_id: release.id,
                    created_release,
                    asset,
                    removed,
                    removal_failures,
                })
            }
            Err(e) => {
                self.output.error(&e.to_string());
                Ok(ReconcileOutcome::Reported {
                    release_id: release.id,
                    stage: AssetStage::Uploading,
                    reason: e.to_string(),
                })
            }
        }
    }
}
