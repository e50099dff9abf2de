//! HTTP Client für den Token-Endpoint
//!
//! Erwartet `200 OK` mit `{"token": "<jwt>"}`. Jede andere Antwort wird
//! mit ihrem Body unverändert als Fehler zurückgegeben.

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Nicht-2xx Antwort, Body wird unverändert angezeigt
    #[error("{body}")]
    Rejected { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid token payload: {0}")]
    InvalidPayload(String),
}

// ============================================================================
// TOKEN RESPONSE
// ============================================================================

/// Antwort des Token-Endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenResponse {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Token-Länge für das Log, `na` falls leer oder fehlend
    pub fn token_len_label(&self) -> String {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| t.len().to_string())
            .unwrap_or_else(|| "na".to_string())
    }
}

// ============================================================================
// TOKEN SOURCE
// ============================================================================

/// Liefert frische Access Tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<TokenResponse, TokenError>;
}

/// Token-Abruf über HTTP
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    client: Client,
    url: Url,
}

impl HttpTokenSource {
    /// Erstellt die Quelle aus der Konfiguration
    ///
    /// Eine konfigurierte Identity wird als `identity` Query-Parameter angehängt.
    pub fn new(config: &ClientConfig) -> Self {
        let mut url = config.token_url.clone();
        if let Some(identity) = &config.identity {
            url.query_pairs_mut().append_pair("identity", identity);
        }
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch_token(&self) -> Result<TokenResponse, TokenError> {
        tracing::debug!("Fetching access token from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("Token endpoint answered {}", status);
            return Err(TokenError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TokenError::InvalidPayload(e.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
