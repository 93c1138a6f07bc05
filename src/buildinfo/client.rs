//! Retrieval of published build-info from the repository manager.

use std::future::Future;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ServerDetails;
use crate::VERSION;

/// Repository manager client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server URL is not a valid base URL.
    #[error("Invalid server URL '{url}'")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parse failure, when there is one.
        #[source]
        source: Option<url::ParseError>,
    },

    /// The request could not be performed or its body not decoded.
    #[error("Request to {url} failed")]
    Request {
        /// Request URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an unexpected status.
    #[error("Request to {url} returned {status}: {body}")]
    Status {
        /// Request URL.
        url: String,
        /// Response status.
        status: StatusCode,
        /// Response body.
        body: String,
    },
}

/// A build-info record as published on the repository manager.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishedBuildInfo {
    /// The published record.
    #[serde(rename = "buildInfo", default)]
    pub build_info: PublishedBuild,
}

/// The subset of a published build the collector needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishedBuild {
    /// Build name.
    #[serde(default)]
    pub name: String,
    /// Build number.
    #[serde(default)]
    pub number: String,
    /// Revision recorded at the top level of the record.
    #[serde(rename = "vcsRevision", default)]
    pub vcs_revision: Option<String>,
    /// Revisions recorded per repository.
    #[serde(default)]
    pub vcs: Vec<PublishedVcs>,
}

/// A per-repository VCS entry of a published build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishedVcs {
    /// Remote URL.
    #[serde(default)]
    pub url: String,
    /// Revision.
    #[serde(default)]
    pub revision: String,
}

impl PublishedBuildInfo {
    /// Returns the revision the build was published from, or `""` when unknown.
    pub fn vcs_revision(&self) -> &str {
        let build = &self.build_info;
        build
            .vcs_revision
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| build.vcs.first().map(|v| v.revision.as_str()))
            .unwrap_or("")
    }
}

/// Source of previously published build-info.
pub trait BuildInfoService {
    /// Fetches the most recently published build-info of a build.
    ///
    /// Returns `Ok(None)` when the build has never been published.
    fn latest_build_info(
        &self,
        build_name: &str,
    ) -> impl Future<Output = Result<Option<PublishedBuildInfo>, ClientError>> + Send;
}

/// HTTP client for an Artifactory-compatible repository manager.
pub struct ArtifactoryClient {
    client: reqwest::Client,
    server: ServerDetails,
    base_url: Url,
}

impl ArtifactoryClient {
    /// Creates a client for the given server.
    pub fn new(server: ServerDetails) -> Result<Self, ClientError> {
        let base_url = Url::parse(&server.url).map_err(|source| ClientError::InvalidUrl {
            url: server.url.clone(),
            source: Some(source),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: server.url.clone(),
                source: None,
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(format!("buildinfo-git/{VERSION}"))
            .build()
            .map_err(|source| ClientError::Request {
                url: server.url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            server,
            base_url,
        })
    }

    /// Returns the URL of a build's latest published record.
    pub fn latest_build_url(&self, build_name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "build", build_name, "LATEST"]);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = self.server.access_token.as_deref().filter(|t| !t.is_empty()) {
            request.bearer_auth(token)
        } else if let Some(user) = self.server.user.as_deref().filter(|u| !u.is_empty()) {
            request.basic_auth(user, self.server.password.as_deref())
        } else {
            request
        }
    }
}

impl BuildInfoService for ArtifactoryClient {
    async fn latest_build_info(
        &self,
        build_name: &str,
    ) -> Result<Option<PublishedBuildInfo>, ClientError> {
        let url = self.latest_build_url(build_name);
        debug!("Fetching latest build-info from {url}");

        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No published build-info found for {build_name}");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        response
            .json::<PublishedBuildInfo>()
            .await
            .map(Some)
            .map_err(|source| ClientError::Request {
                url: url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_details(url: &str) -> ServerDetails {
        ServerDetails {
            server_id: "test".to_string(),
            url: format!("{url}/"),
            user: None,
            password: None,
            access_token: None,
            is_default: true,
        }
    }

    #[test]
    fn latest_build_url_encodes_name() {
        let client =
            ArtifactoryClient::new(server_details("https://repo.example.com/artifactory")).unwrap();

        let url = client.latest_build_url("team app/web");

        assert_eq!(
            url.as_str(),
            "https://repo.example.com/artifactory/api/build/team%20app%2Fweb/LATEST"
        );
    }

    #[test]
    fn invalid_server_url() {
        let err = ArtifactoryClient::new(server_details("not a url")).err().unwrap();

        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn vcs_revision_prefers_top_level_field() {
        let info: PublishedBuildInfo = serde_json::from_value(serde_json::json!({
            "buildInfo": {
                "name": "app",
                "number": "3",
                "vcsRevision": "top",
                "vcs": [{ "url": "https://git.example.com/app.git", "revision": "nested" }]
            }
        }))
        .unwrap();

        assert_eq!(info.vcs_revision(), "top");
    }

    #[test]
    fn vcs_revision_falls_back_to_vcs_list() {
        let info: PublishedBuildInfo = serde_json::from_value(serde_json::json!({
            "buildInfo": {
                "vcs": [{ "url": "https://git.example.com/app.git", "revision": "nested" }]
            }
        }))
        .unwrap();

        assert_eq!(info.vcs_revision(), "nested");
    }

    #[test]
    fn vcs_revision_absent() {
        let info: PublishedBuildInfo =
            serde_json::from_value(serde_json::json!({ "buildInfo": { "name": "app" } })).unwrap();

        assert_eq!(info.vcs_revision(), "");
    }

    #[tokio::test]
    async fn fetches_latest_build_info() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/build/app/LATEST"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header(
                "user-agent",
                format!("buildinfo-git/{}", crate::VERSION).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "buildInfo": { "name": "app", "number": "41", "vcsRevision": "deadbeef" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut details = server_details(&mock_server.uri());
        details.access_token = Some("secret-token".to_string());
        let client = ArtifactoryClient::new(details).unwrap();

        let info = client.latest_build_info("app").await.unwrap().unwrap();

        assert_eq!(info.build_info.number, "41");
        assert_eq!(info.vcs_revision(), "deadbeef");
    }

    #[tokio::test]
    async fn uses_basic_auth_without_token() {
        let mock_server = MockServer::start().await;
        // "ci:pass" base64-encoded
        Mock::given(method("GET"))
            .and(path("/api/build/app/LATEST"))
            .and(header("authorization", "Basic Y2k6cGFzcw=="))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "buildInfo": {} })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut details = server_details(&mock_server.uri());
        details.user = Some("ci".to_string());
        details.password = Some("pass".to_string());
        let client = ArtifactoryClient::new(details).unwrap();

        let info = client.latest_build_info("app").await.unwrap().unwrap();

        assert_eq!(info.vcs_revision(), "");
    }

    #[tokio::test]
    async fn not_found_means_never_published() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/build/new-app/LATEST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = ArtifactoryClient::new(server_details(&mock_server.uri())).unwrap();

        assert!(client.latest_build_info("new-app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/build/app/LATEST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = ArtifactoryClient::new(server_details(&mock_server.uri())).unwrap();

        let err = client.latest_build_info("app").await.unwrap_err();

        match err {
            ClientError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
