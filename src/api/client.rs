//! TFS REST client: connection context plus a single request helper.
//!
//! Every endpoint wrapper in this crate goes through [`TfsClient::endpoint`]
//! to build its URL and through [`TfsClient::get_json`] /
//! [`TfsClient::send_json`] to issue exactly one request. The api-version and
//! the encoded credential live here once instead of in every wrapper.

use reqwest::{
    Client, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::credential::BasicCredential;
use crate::error::{ApiError, ApiResult, ConfigError};

/// api-version embedded in every request unless configured otherwise.
pub const DEFAULT_API_VERSION: &str = "4.1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Content type for JSON-patch bodies (work item updates).
pub(crate) const JSON_PATCH: &str = "application/json-patch+json";
pub(crate) const JSON: &str = "application/json";

/// Everything needed to reach one team project on one collection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Collection base address, e.g. `https://tfs.example.com/tfs/DefaultCollection`.
    pub collection_url: String,
    /// Team project name.
    pub project: String,
    /// PAT or `user:password`.
    pub credential: BasicCredential,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
}

impl ConnectionSettings {
    /// Settings with the default api-version.
    pub fn new(collection_url: String, project: String, credential: BasicCredential) -> Self {
        Self {
            collection_url,
            project,
            credential,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

/// Whether a resource lives under the collection or under the team project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `{collection}/_apis/...`
    Collection,
    /// `{collection}/{project}/_apis/...`
    Project,
}

/// Stateless TFS REST API client.
///
/// # Example
///
/// ```rust,no_run
/// use tfs_tools::api::TfsClient;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TfsClient::new(
///     "https://tfs.example.com/tfs/DefaultCollection".to_string(),
///     "Fabrikam".to_string(),
///     "my-pat".to_string(),
/// )?;
///
/// let status = client.get_build_status("1234").await?;
/// println!("Build 1234 is {}", status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TfsClient {
    http: Client,
    collection_url: Url,
    project: String,
    api_version: String,
}

impl TfsClient {
    /// Creates a client using the default api-version.
    ///
    /// # Security
    ///
    /// The credential is wrapped in a SecretString and only exposed while the
    /// `Authorization` header is built.
    pub fn new(
        collection_url: String,
        project: String,
        credential: String,
    ) -> Result<Self, ConfigError> {
        Self::with_settings(ConnectionSettings::new(
            collection_url,
            project,
            BasicCredential::from_string(credential),
        ))
    }

    /// Creates a client from explicit connection settings.
    ///
    /// Fails when the collection URL is not an absolute http(s) URL or when
    /// the project, credential or api-version is empty.
    pub fn with_settings(settings: ConnectionSettings) -> Result<Self, ConfigError> {
        let collection_url = parse_collection_url(&settings.collection_url)?;

        if settings.project.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if settings.credential.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pat".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if settings.api_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api-version".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        let mut auth_value =
            HeaderValue::from_str(&settings.credential.authorization_header()).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "pat".to_string(),
                    message: e.to_string(),
                }
            })?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http client".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            collection_url,
            project: settings.project.trim().to_string(),
            api_version: settings.api_version.trim().to_string(),
        })
    }

    /// Returns the collection base address.
    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// Returns the team project name.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the api-version sent with every request.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Builds a request URL.
    ///
    /// `segments` follow `_apis/` and are percent-encoded individually.
    /// `query` pairs come first, `api-version` is always last.
    pub fn endpoint(
        &self,
        scope: Scope,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResult<Url> {
        let mut url = self.collection_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ApiError::InvalidUrl(format!(
                    "{} cannot be used as a base address",
                    self.collection_url
                ))
            })?;
            path.pop_if_empty();
            if scope == Scope::Project {
                path.push(&self.project);
            }
            path.push("_apis");
            path.extend(segments);
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("api-version", &self.api_version);
        }
        Ok(url)
    }

    /// Issues a GET and decodes the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        debug!(method = "GET", url = %url, "Sending TFS request");
        let resource = url.path().to_string();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        decode_response(response, &resource).await
    }

    /// Issues a request with a JSON body and decodes the JSON response.
    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        url: Url,
        content_type: &'static str,
        body: &B,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = %method, url = %url, "Sending TFS request");
        let resource = url.path().to_string();
        let payload = serde_json::to_vec(body).map_err(|e| ApiError::Decode {
            resource: resource.clone(),
            message: format!("failed to encode request body: {}", e),
        })?;
        let response = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, content_type)
            .body(payload)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        decode_response(response, &resource).await
    }
}

impl std::fmt::Debug for TfsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfsClient")
            .field("collection_url", &self.collection_url.as_str())
            .field("project", &self.project)
            .field("api_version", &self.api_version)
            .finish()
    }
}

fn parse_collection_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        field: "collection-url".to_string(),
        message,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("must not be empty".to_string()));
    }
    let url = Url::parse(trimmed).map_err(|e| invalid(format!("'{}': {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), resource, "TFS request failed");
        return Err(ApiError::from_status(status, resource, body));
    }

    let text = response.text().await.map_err(ApiError::Transport)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode {
        resource: resource.to_string(),
        message: e.to_string(),
    })
}
