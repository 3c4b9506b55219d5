//! Release store abstraction and the models it exchanges.

use crate::error::{CliError, Result, StoreError};
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;

/// Repository coordinates (`owner/name`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoCoordinates {
    /// Parse an `owner/name` string
    pub fn parse(repository: &str) -> Result<Self> {
        let parts: Vec<&str> = repository.split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(CliError::InvalidArguments {
                reason: format!(
                    "Invalid repository format: '{}'. Expected: owner/repo",
                    repository
                ),
            }
            .into()),
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A release as returned by the store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Store-assigned identifier
    pub id: u64,
    /// Tag the release is addressed by
    pub tag_name: String,
    /// Assets attached at the time of the lookup
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A binary asset attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    /// Store-assigned identifier
    pub id: u64,
    /// File name of the asset
    pub name: String,
    /// MIME type the asset was uploaded with
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Remote release store.
///
/// The store offers no create-or-replace primitive and does not enforce
/// unique asset names; the reconciler builds both on top of these calls.
#[allow(async_fn_in_trait)]
pub trait ReleaseStore {
    /// Look up the release for `tag`. `Ok(None)` when no such release exists.
    async fn find_release_by_tag(
        &self,
        repository: &RepoCoordinates,
        tag: &str,
    ) -> std::result::Result<Option<Release>, StoreError>;

    /// Create a release for `tag` with no additional metadata
    async fn create_release(
        &self,
        repository: &RepoCoordinates,
        tag: &str,
    ) -> std::result::Result<Release, StoreError>;

    /// Current assets of `release`
    async fn list_assets(
        &self,
        repository: &RepoCoordinates,
        release: &Release,
    ) -> std::result::Result<Vec<Asset>, StoreError>;

    /// Delete one asset
    async fn remove_asset(
        &self,
        repository: &RepoCoordinates,
        asset_id: u64,
    ) -> std::result::Result<(), StoreError>;

    /// Upload `content` as a new asset of release `release_id`
    async fn create_asset(
        &self,
        repository: &RepoCoordinates,
        release_id: u64,
        name: &str,
        content_type: &str,
        content: Bytes,
    ) -> std::result::Result<Asset, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        let repo = RepoCoordinates::parse("babirusa/babirusa-runtime").unwrap();
        assert_eq!(repo.owner, "babirusa");
        assert_eq!(repo.name, "babirusa-runtime");
        assert_eq!(repo.to_string(), "babirusa/babirusa-runtime");
    }

    #[test]
    fn test_parse_repository_rejects_malformed() {
        assert!(RepoCoordinates::parse("babirusa").is_err());
        assert!(RepoCoordinates::parse("a/b/c").is_err());
        assert!(RepoCoordinates::parse("/runtime").is_err());
        assert!(RepoCoordinates::parse("babirusa/").is_err());
    }

    #[test]
    fn test_release_deserializes_github_payload() {
        let payload = r#"{
            "id": 42,
            "tag_name": "php-linux-v8.1",
            "draft": false,
            "assets": [
                {"id": 7, "name": "php", "content_type": "application/octet-stream", "size": 1024, "state": "uploaded"}
            ]
        }"#;

        let release: Release = serde_json::from_str(payload).unwrap();
        assert_eq!(release.id, 42);
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "php");
    }
}
