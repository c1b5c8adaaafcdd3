//! Short-lived access credentials from the token-issuing endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::playground::PlaygroundState;
use crate::util::build_http_client;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Network(String),

    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token endpoint returned an unparseable body: {0}")]
    Parse(String),
}

/// Access token and transport endpoint for one realtime session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    pub url: String,
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn request_token(&self, state: &PlaygroundState) -> Result<TokenGrant, TokenError>;
}

/// HTTP client for the token endpoint. Issues exactly one request per call.
#[derive(Clone)]
pub struct TokenClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl TokenClient {
    pub fn new(endpoint: Url, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            endpoint,
            client: build_http_client(timeout)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TokenIssuer for TokenClient {
    async fn request_token(&self, state: &PlaygroundState) -> Result<TokenGrant, TokenError> {
        let resp = match self
            .client
            .post(self.endpoint.clone())
            .json(state)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(TokenError::Network(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(TokenError::Network(format!("Connection failed: {}", e)));
                } else {
                    return Err(TokenError::Network(format!("Request failed: {}", e)));
                }
            }
        };

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let grant: TokenGrant = serde_json::from_str(&body)
            .map_err(|e| TokenError::Parse(format!("{}, body: {}", e, body)))?;
        if grant.access_token.is_empty() || grant.url.is_empty() {
            return Err(TokenError::Parse("empty accessToken or url".to_string()));
        }
        Ok(grant)
    }
}
