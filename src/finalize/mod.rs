//! Authoritative server-side finalization of a finished dictation.
//!
//! On stop, the streamed draft plus the captured take are submitted for
//! higher-accuracy re-processing (and PII redaction in medical mode). A
//! failure here never discards dictated work: the coordinator falls back to
//! the streamed draft and flags the result as draft-quality.

use crate::error::DictationError;
use crate::stt::Word;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Request to the external finalization endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationRequest {
    /// Reference to the captured audio take
    pub audio_uri: String,
    /// The locally streamed draft transcript
    pub streaming_transcript: String,
    /// Request PII redaction
    pub medical_mode: bool,
}

/// Response from the finalization endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationResponse {
    pub final_text: String,
    pub confidence: f32,
    pub duration: f64,
    #[serde(default)]
    pub words: Option<Vec<Word>>,
}

/// The note's definitive text, produced once per session at stop
#[derive(Debug, Clone, Serialize)]
pub struct FinalizationResult {
    pub final_text: String,
    pub confidence: f32,
    pub duration_seconds: f64,
    pub words: Option<Vec<Word>>,
    /// True when the authoritative pass failed and the streamed draft is used
    pub draft: bool,
}

/// External finalization collaborator.
#[async_trait::async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(
        &self,
        request: &FinalizationRequest,
    ) -> Result<FinalizationResponse, DictationError>;
}

/// Calls the HTTP finalization endpoint with a bounded timeout.
pub struct HttpFinalizer {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpFinalizer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Finalizer for HttpFinalizer {
    async fn finalize(
        &self,
        request: &FinalizationRequest,
    ) -> Result<FinalizationResponse, DictationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| DictationError::Finalization(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| DictationError::Finalization(format!("endpoint rejected: {}", e)))?;

        response
            .json::<FinalizationResponse>()
            .await
            .map_err(|e| DictationError::Finalization(format!("malformed response: {}", e)))
    }
}

/// Resolve the definitive text for a stopped session.
///
/// The authoritative response supersedes the streamed draft entirely; on any
/// failure the draft is returned instead, flagged draft-quality. Either way
/// the session proceeds to `done`.
pub async fn resolve(
    finalizer: &dyn Finalizer,
    request: &FinalizationRequest,
    fallback_duration_seconds: f64,
) -> FinalizationResult {
    match finalizer.finalize(request).await {
        Ok(response) => {
            info!(
                "finalization complete (confidence {:.2}, {:.1}s)",
                response.confidence, response.duration
            );
            FinalizationResult {
                final_text: response.final_text,
                confidence: response.confidence,
                duration_seconds: response.duration,
                words: response.words,
                draft: false,
            }
        }
        Err(e) => {
            warn!("finalization failed, keeping streamed draft: {}", e);
            FinalizationResult {
                final_text: request.streaming_transcript.clone(),
                confidence: 0.0,
                duration_seconds: fallback_duration_seconds,
                words: None,
                draft: true,
            }
        }
    }
}
