use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{InstafyError, Result},
    gateway::EditGateway,
    models::{EditRequest, GatewayReply},
};

/// Where the pipeline sends its edit requests.
#[async_trait]
pub trait EditService: Send + Sync {
    /// Transport failures are errors; gateway-reported failures come back
    /// as an unsuccessful reply.
    async fn submit(&self, request: EditRequest) -> Result<GatewayReply>;
}

/// Talks to a running gateway over HTTP.
#[derive(Clone, Debug)]
pub struct HttpEditService {
    client: Client,
    url: String,
}

impl HttpEditService {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EditService for HttpEditService {
    async fn submit(&self, request: EditRequest) -> Result<GatewayReply> {
        log::debug!("POST {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| InstafyError::RequestError(format!("Gateway request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| InstafyError::ResponseError(e.to_string()))?;

        let mut reply: GatewayReply = serde_json::from_str(&text).map_err(|e| {
            InstafyError::ResponseError(format!(
                "Gateway returned invalid JSON (HTTP {}): {}",
                status.as_u16(),
                e
            ))
        })?;
        reply.success = status.is_success();
        Ok(reply)
    }
}

/// In-process use of the gateway, skipping HTTP.
#[async_trait]
impl EditService for EditGateway {
    async fn submit(&self, request: EditRequest) -> Result<GatewayReply> {
        let body = serde_json::to_value(&request)?;
        Ok(match self.handle(body).await {
            Ok(image) => GatewayReply::ok(image),
            Err(e) => GatewayReply::failed(e.to_string()),
        })
    }
}
