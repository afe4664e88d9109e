use crate::error::DictationError;
use serde::Deserialize;

/// Short-lived access token for one streaming session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionToken {
    pub token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

/// External token-issuing collaborator, consumed once per session begin.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<SessionToken, DictationError>;
}

/// Fetches tokens from the HTTP token endpoint.
pub struct HttpTokenProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTokenProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(&self) -> Result<SessionToken, DictationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| DictationError::SessionStart(format!("token request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| DictationError::SessionStart(format!("token endpoint rejected: {}", e)))?;

        response
            .json::<SessionToken>()
            .await
            .map_err(|e| DictationError::SessionStart(format!("malformed token response: {}", e)))
    }
}
