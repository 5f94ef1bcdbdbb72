//! HTTP client for the settings server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use incognibro_core::profile::{ProfileService, UserProfile};
use incognibro_core::settings::{
    BlocklistUpdateResult, PrivacySettings, RemoteError, RemoteResult, SettingsService,
};
use incognibro_server::models::{AutoStopRequest, DomainRequest};
use incognibro_server::{ErrorResponse, PRINCIPAL_HEADER};

/// Default settings server URL.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:48765";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors talking to the settings server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("server requires a principal")]
    Unauthorized,

    #[error("principal must not be empty")]
    MissingPrincipal,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized | ClientError::MissingPrincipal => {
                RemoteError::Unauthenticated
            }
            ClientError::Http(e) if e.is_connect() => RemoteError::Unavailable,
            ClientError::Http(e) => RemoteError::Transport(e.to_string()),
            ClientError::Api { message, .. } => RemoteError::Rejected(message),
        }
    }
}

/// Settings service reached over HTTP on behalf of one principal.
#[derive(Debug, Clone)]
pub struct HttpSettingsClient {
    client: reqwest::Client,
    base_url: String,
    principal: String,
}

impl HttpSettingsClient {
    /// Creates a client for `principal` against the server at `base_url`.
    pub fn new(base_url: impl Into<String>, principal: impl Into<String>) -> Result<Self> {
        let principal = principal.into();
        if principal.trim().is_empty() {
            return Err(ClientError::MissingPrincipal);
        }

        let client = reqwest::Client::builder()
            .user_agent(format!("Incognibro/{}", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            principal,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(PRINCIPAL_HEADER, &self.principal)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        // Error bodies are JSON from our server, but proxies may answer too.
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());

        debug!(status = status.as_u16(), %message, "Settings server error");

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn update_blocklist(&self, method: Method, domain: &str) -> Result<BlocklistUpdateResult> {
        let body = DomainRequest {
            domain: domain.to_string(),
        };
        self.send(self.request(method, "/api/blocklist").json(&body))
            .await
    }
}

#[async_trait]
impl SettingsService for HttpSettingsClient {
    async fn get_privacy_settings(&self) -> RemoteResult<PrivacySettings> {
        Ok(self.send(self.request(Method::GET, "/api/settings")).await?)
    }

    async fn set_auto_stop_tracking(&self, enabled: bool) -> RemoteResult<()> {
        let body = AutoStopRequest {
            auto_stop_tracking: enabled,
        };
        let _: AutoStopRequest = self
            .send(
                self.request(Method::PUT, "/api/settings/auto-stop")
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn add_block_entry(&self, domain: &str) -> RemoteResult<BlocklistUpdateResult> {
        Ok(self.update_blocklist(Method::POST, domain).await?)
    }

    async fn remove_block_entry(&self, domain: &str) -> RemoteResult<BlocklistUpdateResult> {
        Ok(self.update_blocklist(Method::DELETE, domain).await?)
    }
}

#[async_trait]
impl ProfileService for HttpSettingsClient {
    async fn get_user_profile(&self) -> RemoteResult<Option<UserProfile>> {
        Ok(self.send(self.request(Method::GET, "/api/profile")).await?)
    }

    async fn save_user_profile(&self, profile: &UserProfile) -> RemoteResult<()> {
        let _: UserProfile = self
            .send(self.request(Method::PUT, "/api/profile").json(profile))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incognibro_server::{build_router, AppState};

    /// Serves a fresh in-memory settings API on an ephemeral port.
    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(AppState::in_memory().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_rejects_empty_principal() {
        assert!(matches!(
            HttpSettingsClient::new(DEFAULT_SERVER_URL, "  "),
            Err(ClientError::MissingPrincipal)
        ));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = HttpSettingsClient::new("http://localhost:1/", "alice").unwrap();
        assert_eq!(client.url("/api/settings"), "http://localhost:1/api/settings");
    }

    #[test]
    fn test_error_mapping() {
        let err: RemoteError = ClientError::Api {
            status: 400,
            message: "bad request: domain is required".into(),
        }
        .into();
        assert_eq!(
            err,
            RemoteError::Rejected("bad request: domain is required".into())
        );

        let err: RemoteError = ClientError::Unauthorized.into();
        assert_eq!(err, RemoteError::Unauthenticated);
    }

    #[tokio::test]
    async fn test_round_trip_against_server() {
        let url = spawn_server().await;
        let client = HttpSettingsClient::new(url, "alice").unwrap();

        let settings = client.get_privacy_settings().await.unwrap();
        assert_eq!(settings, PrivacySettings::default());

        let added = client.add_block_entry("WWW.Tracker.Example").await.unwrap();
        assert!(added.success);
        assert_eq!(added.new_blocklist, ["tracker.example"]);

        client.set_auto_stop_tracking(false).await.unwrap();

        let removed = client.remove_block_entry("tracker.example").await.unwrap();
        assert!(removed.success);

        let settings = client.get_privacy_settings().await.unwrap();
        assert!(settings.block_list.is_empty());
        assert!(!settings.auto_stop_tracking);
    }

    #[tokio::test]
    async fn test_profile_against_server() {
        let url = spawn_server().await;
        let client = HttpSettingsClient::new(url, "alice").unwrap();

        assert_eq!(client.get_user_profile().await.unwrap(), None);

        client
            .save_user_profile(&UserProfile::new("Alice"))
            .await
            .unwrap();
        assert_eq!(
            client.get_user_profile().await.unwrap(),
            Some(UserProfile::new("Alice"))
        );

        let err = client
            .save_user_profile(&UserProfile::new(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_invalid_domain_is_rejected() {
        let url = spawn_server().await;
        let client = HttpSettingsClient::new(url, "alice").unwrap();

        let err = client.add_block_entry("https://").await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is almost never listening on loopback.
        let client = HttpSettingsClient::new("http://127.0.0.1:9", "alice").unwrap();

        let err = client.get_privacy_settings().await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Unavailable | RemoteError::Transport(_)
        ));
    }
}
