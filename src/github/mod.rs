//! GitHub release integration

mod client;
mod reconciler;
mod store;

pub use client::{DEFAULT_API_URL, DEFAULT_UPLOAD_URL, GitHubStore, GitHubToken};
pub use reconciler::{
    ASSET_CONTENT_TYPE, AssetStage, CANONICAL_ASSET_NAME, ReconcileOutcome, ReleaseReconciler,
};
pub use store::{Asset, Release, ReleaseStore, RepoCoordinates};
