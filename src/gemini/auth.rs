use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};

use crate::{
    config::GeminiConfig,
    error::{InstafyError, Result},
};

pub const GENERATIVE_LANGUAGE_SCOPE: &str = "https://www.googleapis.com/auth/generative-language";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const API_KEY_HEADER: &str = "x-goog-api-key";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens this close to expiry are refreshed before use.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// How requests to the generative endpoint are authenticated.
#[derive(Clone)]
pub enum Credentials {
    ApiKey(String),
    AccessToken(String),
    MetadataServer(MetadataTokenSource),
    ApplicationDefault(ApplicationDefaultSource),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => write!(f, "Credentials::ApiKey(<redacted>)"),
            Credentials::AccessToken(_) => write!(f, "Credentials::AccessToken(<redacted>)"),
            Credentials::MetadataServer(_) => write!(f, "Credentials::MetadataServer"),
            Credentials::ApplicationDefault(_) => write!(f, "Credentials::ApplicationDefault"),
        }
    }
}

impl Credentials {
    /// Order: static bearer token, API key, metadata server when asked for,
    /// then Application Default Credentials.
    pub fn from_config(config: &GeminiConfig, http: Client) -> Result<Self> {
        if let Some(token) = &config.access_token {
            return Ok(Credentials::AccessToken(token.clone()));
        }
        if let Some(key) = &config.api_key {
            return Ok(Credentials::ApiKey(key.clone()));
        }
        if config.use_metadata_server {
            return Ok(Credentials::MetadataServer(MetadataTokenSource::new(http)));
        }
        Ok(Credentials::ApplicationDefault(ApplicationDefaultSource::new()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::ApiKey(_) => "api-key",
            Credentials::AccessToken(_) => "access-token",
            Credentials::MetadataServer(_) => "metadata-server",
            Credentials::ApplicationDefault(_) => "application-default",
        }
    }

    pub async fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match self {
            Credentials::ApiKey(key) => {
                headers.insert(API_KEY_HEADER, header_value(key)?);
            }
            Credentials::AccessToken(token) => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
            Credentials::MetadataServer(source) => {
                let token = source.token().await?;
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
            Credentials::ApplicationDefault(source) => {
                let token = source.token().await?;
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| InstafyError::ConfigError(format!("Invalid credential header: {}", e)))
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Access tokens for the instance's default service account, fetched from the
/// GCE metadata server and cached until shortly before they expire.
#[derive(Clone)]
pub struct MetadataTokenSource {
    client: Client,
    url: String,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl MetadataTokenSource {
    pub fn new(client: Client) -> Self {
        Self::with_url(client, METADATA_TOKEN_URL)
    }

    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(entry.token.clone());
            }
        }

        log::debug!("Fetching access token from metadata server");
        let scopes = format!("{},{}", GENERATIVE_LANGUAGE_SCOPE, CLOUD_PLATFORM_SCOPE);
        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", scopes.as_str())])
            .send()
            .await
            .map_err(|e| {
                InstafyError::RequestError(format!("Metadata server request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InstafyError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let token: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| InstafyError::ResponseError(format!("Invalid token response: {}", e)))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });

        Ok(access_token)
    }
}

/// Google Application Default Credentials through `gcp_auth`: the key file
/// named by `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud ADC file, then the
/// metadata server. The provider is resolved on first use and refreshes its
/// own tokens.
#[derive(Clone, Default)]
pub struct ApplicationDefaultSource {
    provider: Arc<OnceCell<Arc<dyn gcp_auth::TokenProvider>>>,
}

impl ApplicationDefaultSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scopes() -> [&'static str; 2] {
        [GENERATIVE_LANGUAGE_SCOPE, CLOUD_PLATFORM_SCOPE]
    }

    pub async fn token(&self) -> Result<String> {
        let provider = self
            .provider
            .get_or_try_init(|| async {
                log::debug!("Resolving Google application default credentials");
                gcp_auth::provider().await.map_err(|e| {
                    InstafyError::ConfigError(format!(
                        "No Gemini credentials found: set GEMINI_API_KEY, GOOGLE_ACCESS_TOKEN or GOOGLE_APPLICATION_CREDENTIALS ({})",
                        e
                    ))
                })
            })
            .await?;

        let token = provider
            .token(&Self::scopes())
            .await
            .map_err(|e| InstafyError::RequestError(format!("Failed to obtain access token: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_wins_over_api_key() {
        let config = GeminiConfig::new()
            .with_api_key("key")
            .with_access_token("token");
        let credentials = Credentials::from_config(&config, Client::new()).unwrap();
        assert_eq!(credentials.kind(), "access-token");
    }

    #[test]
    fn test_selection_order_ends_with_application_default() {
        let kind = |config: GeminiConfig| {
            Credentials::from_config(&config, Client::new())
                .unwrap()
                .kind()
        };

        assert_eq!(kind(GeminiConfig::new()), "application-default");
        assert_eq!(
            kind(GeminiConfig::new().with_metadata_server(true)),
            "metadata-server"
        );
        assert_eq!(
            kind(GeminiConfig::new().with_metadata_server(true).with_api_key("k")),
            "api-key"
        );
        assert_eq!(
            kind(
                GeminiConfig::new()
                    .with_metadata_server(true)
                    .with_api_key("k")
                    .with_access_token("t")
            ),
            "access-token"
        );
    }

    #[test]
    fn test_application_default_requests_both_scopes() {
        assert_eq!(
            ApplicationDefaultSource::scopes(),
            [
                "https://www.googleapis.com/auth/generative-language",
                "https://www.googleapis.com/auth/cloud-platform"
            ]
        );
        let credentials = Credentials::ApplicationDefault(ApplicationDefaultSource::new());
        assert_eq!(format!("{:?}", credentials), "Credentials::ApplicationDefault");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = Credentials::ApiKey("super-secret".into());
        assert!(!format!("{:?}", credentials).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_header_shapes() {
        let api_key = Credentials::ApiKey("k123".into()).headers().await.unwrap();
        assert_eq!(api_key.get("x-goog-api-key").unwrap(), "k123");
        assert_eq!(api_key.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(api_key.get(AUTHORIZATION).is_none());

        let bearer = Credentials::AccessToken("t456".into()).headers().await.unwrap();
        assert_eq!(bearer.get(AUTHORIZATION).unwrap(), "Bearer t456");
    }
}
