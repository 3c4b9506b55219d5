//! GitHub REST implementation of [`ReleaseStore`].

use super::store::{Asset, Release, ReleaseStore, RepoCoordinates};
use crate::error::StoreError;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode, header};
use std::fmt;

/// Default GitHub REST API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default GitHub upload endpoint
pub const DEFAULT_UPLOAD_URL: &str = "https://uploads.github.com";

/// Page size used when listing assets
const ASSETS_PER_PAGE: usize = 100;

/// GitHub token. Never printed.
#[derive(Clone)]
pub struct GitHubToken(String);

impl GitHubToken {
    /// Wrap a raw token, trimming surrounding whitespace
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    /// Whether the token is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GitHubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GitHubToken(***)")
    }
}

/// Release store backed by the GitHub REST API.
///
/// Constructed once with resolved credentials and shared by reference for the
/// whole run.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: Client,
    token: GitHubToken,
    api_url: String,
    upload_url: String,
}

impl GitHubStore {
    /// Create a store against the public GitHub endpoints
    pub fn new(token: GitHubToken) -> Result<Self, StoreError> {
        Self::with_endpoints(token, DEFAULT_API_URL, DEFAULT_UPLOAD_URL)
    }

    /// Create a store against custom endpoints (GitHub Enterprise, test servers)
    pub fn with_endpoints(
        token: GitHubToken,
        api_url: &str,
        upload_url: &str,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(concat!("babirusa-builder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            token,
            api_url: api_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, repository: &RepoCoordinates) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url, repository.owner, repository.name
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        log::debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .bearer_auth(self.token.expose())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// Turn a non-success response into a [`StoreError`]
async fn check(operation: &str, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("{} failed: HTTP {} {}", operation, status, body);

    if status == StatusCode::UNAUTHORIZED {
        return Err(StoreError::Unauthorized { reason: body });
    }

    Err(StoreError::Api {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

impl ReleaseStore for GitHubStore {
    async fn find_release_by_tag(
        &self,
        repository: &RepoCoordinates,
        tag: &str,
    ) -> Result<Option<Release>, StoreError> {
        let url = format!("{}/releases/tags/{}", self.repo_url(repository), tag);
        let response = self.request(reqwest::Method::GET, &url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check("find release", response).await?;
        Ok(Some(response.json::<Release>().await?))
    }

    async fn create_release(
        &self,
        repository: &RepoCoordinates,
        tag: &str,
    ) -> Result<Release, StoreError> {
        let url = format!("{}/releases", self.repo_url(repository));
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({ "tag_name": tag }))
            .send()
            .await?;

        let response = check("create release", response).await?;
        Ok(response.json::<Release>().await?)
    }

    async fn list_assets(
        &self,
        repository: &RepoCoordinates,
        release: &Release,
    ) -> Result<Vec<Asset>, StoreError> {
        let url = format!("{}/releases/{}/assets", self.repo_url(repository), release.id);
        let mut assets = Vec::new();
        let mut page = 1usize;

        loop {
            let response = self
                .request(reqwest::Method::GET, &url)
                .query(&[("per_page", ASSETS_PER_PAGE), ("page", page)])
                .send()
                .await?;

            let batch: Vec<Asset> = check("list assets", response).await?.json().await?;
            let done = batch.len() < ASSETS_PER_PAGE;
            assets.extend(batch);

            if done {
                return Ok(assets);
            }
            page += 1;
        }
    }

    async fn remove_asset(
        &self,
        repository: &RepoCoordinates,
        asset_id: u64,
    ) -> Result<(), StoreError> {
        let url = format!("{}/releases/assets/{}", self.repo_url(repository), asset_id);
        let response = self.request(reqwest::Method::DELETE, &url).send().await?;
        check("remove asset", response).await?;
        Ok(())
    }

    async fn create_asset(
        &self,
        repository: &RepoCoordinates,
        release_id: u64,
        name: &str,
        content_type: &str,
        content: Bytes,
    ) -> Result<Asset, StoreError> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets",
            self.upload_url, repository.owner, repository.name, release_id
        );

        let response = self
            .request(reqwest::Method::POST, &url)
            .query(&[("name", name)])
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, content.len())
            .body(content)
            .send()
            .await?;

        let response = check("upload asset", response).await?;
        Ok(response.json::<Asset>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let token = GitHubToken::new("  ghp_secret\n");
        assert_eq!(format!("{:?}", token), "GitHubToken(***)");
        assert_eq!(token.expose(), "ghp_secret");
    }

    #[test]
    fn test_endpoints_are_normalized() {
        let store = GitHubStore::with_endpoints(
            GitHubToken::new("t"),
            "https://ghe.example.com/api/v3/",
            "https://ghe.example.com/api/uploads/",
        )
        .unwrap();

        let repo = RepoCoordinates::parse("babirusa/babirusa-runtime").unwrap();
        assert_eq!(
            store.repo_url(&repo),
            "https://ghe.example.com/api/v3/repos/babirusa/babirusa-runtime"
        );
        assert_eq!(store.upload_url, "https://ghe.example.com/api/uploads");
    }
}
