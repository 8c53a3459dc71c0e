//! GitHub REST API client.

use std::io;

use async_trait::async_trait;
use futures::TryStreamExt;
use pluginreg_core::InstallContext;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{ServiceError, ServiceResult};
use crate::options::GithubOptions;
use crate::service::{AssetStream, Release, RepositoryService};

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const OCTET_STREAM: &str = "application/octet-stream";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// [`RepositoryService`] backed by the GitHub REST API.
///
/// The underlying client follows up to `max_redirects` redirects, which
/// asset downloads need: the API answers with a redirect to object storage.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: Url,
}

impl GithubClient {
    /// Build a client from `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL or token is malformed, or the HTTP
    /// client cannot be built.
    pub fn new(options: &GithubOptions) -> ServiceResult<Self> {
        let mut api_url = Url::parse(&options.api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            API_VERSION_HEADER,
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = options.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ServiceError::other("invalid characters in github token"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .connect_timeout(options.connect_timeout)
            .build()?;

        Ok(Self { http, api_url })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, owner: &str, repository: &str, tail: &[&str]) -> ServiceResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::other("api url cannot be a base"))?
            .pop_if_empty()
            .push("repos")
            .push(owner)
            .extend(repository.split('/'))
            .extend(tail);
        Ok(url)
    }

    async fn send(&self, ctx: &InstallContext, request: RequestBuilder) -> ServiceResult<Response> {
        let request = request.build()?;
        let method = request.method().to_string();
        let url = request.url().to_string();
        debug!(%method, %url, "github request");

        let response = ctx
            .run_until_cancelled(self.http.execute(request))
            .await
            .ok_or(ServiceError::Cancelled)??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = ctx
            .run_until_cancelled(response.text())
            .await
            .and_then(Result::ok)
            .map(|body| error_message(&body))
            .unwrap_or_default();

        Err(ServiceError::Status {
            method,
            url,
            status: status.as_u16(),
            message,
        })
    }

    async fn release(&self, ctx: &InstallContext, url: Url) -> ServiceResult<Release> {
        let request = self
            .http
            .request(Method::GET, url)
            .header(ACCEPT, JSON_MEDIA_TYPE);
        let response = self.send(ctx, request).await?;

        let body = ctx
            .run_until_cancelled(response.bytes())
            .await
            .ok_or(ServiceError::Cancelled)??;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl RepositoryService for GithubClient {
    async fn latest_release(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
    ) -> ServiceResult<Release> {
        let url = self.endpoint(owner, repository, &["releases", "latest"])?;
        self.release(ctx, url).await
    }

    async fn release_by_tag(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        tag: &str,
    ) -> ServiceResult<Release> {
        let url = self.endpoint(owner, repository, &["releases", "tags", tag])?;
        self.release(ctx, url).await
    }

    async fn download_contents(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        path: &str,
        git_ref: &str,
    ) -> ServiceResult<Vec<u8>> {
        let segments: Vec<&str> = std::iter::once("contents")
            .chain(path.split('/').filter(|s| !s.is_empty()))
            .collect();
        let mut url = self.endpoint(owner, repository, &segments)?;
        url.query_pairs_mut().append_pair("ref", git_ref);

        let request = self
            .http
            .request(Method::GET, url)
            .header(ACCEPT, RAW_MEDIA_TYPE);
        let response = self.send(ctx, request).await?;

        let body = ctx
            .run_until_cancelled(response.bytes())
            .await
            .ok_or(ServiceError::Cancelled)??;
        Ok(body.to_vec())
    }

    async fn download_release_asset(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        asset_id: u64,
    ) -> ServiceResult<AssetStream> {
        let id = asset_id.to_string();
        let url = self.endpoint(owner, repository, &["releases", "assets", &id])?;

        let request = self
            .http
            .request(Method::GET, url)
            .header(ACCEPT, OCTET_STREAM);
        let response = self.send(ctx, request).await?;

        let stream = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(io::Error::other);
        Ok(Box::pin(stream))
    }
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// The `message` of a GitHub error body, or the trimmed body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> GithubClient {
        GithubClient::new(&GithubOptions {
            api_url: api_url.to_string(),
            ..GithubOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_builds_release_endpoints() {
        let client = client("https://api.github.com");

        assert_eq!(
            client
                .endpoint("owner", "my-plugin", &["releases", "latest"])
                .unwrap()
                .as_str(),
            "https://api.github.com/repos/owner/my-plugin/releases/latest"
        );
        assert_eq!(
            client
                .endpoint("owner", "my-plugin", &["releases", "tags", "v1.0.0+build"])
                .unwrap()
                .as_str(),
            "https://api.github.com/repos/owner/my-plugin/releases/tags/v1.0.0+build"
        );
    }

    #[test]
    fn test_keeps_enterprise_base_path() {
        let client = client("https://ghe.example.com/api/v3/");

        assert_eq!(
            client
                .endpoint("team", "tool", &["releases", "assets", "7"])
                .unwrap()
                .as_str(),
            "https://ghe.example.com/api/v3/repos/team/tool/releases/assets/7"
        );
    }

    #[test]
    fn test_escapes_path_segments() {
        let client = client("https://api.github.com/");

        assert_eq!(
            client
                .endpoint("owner", "repo", &["releases", "tags", "a b/c"])
                .unwrap()
                .as_str(),
            "https://api.github.com/repos/owner/repo/releases/tags/a%20b%2Fc"
        );
    }

    #[test]
    fn test_rejects_bad_api_url() {
        let err = GithubClient::new(&GithubOptions {
            api_url: "not a url".into(),
            ..GithubOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, ServiceError::Url(_)));
    }

    #[test]
    fn test_extracts_api_error_messages() {
        assert_eq!(error_message(r#"{"message":"Not Found"}"#), "Not Found");
        assert_eq!(error_message(" upstream down \n"), "upstream down");
    }
}
