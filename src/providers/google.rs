use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::SynthesisConfig;
use crate::errors::SynthesisError;
use crate::providers::{SpeechProvider, SynthesisRequest};
use crate::script::SegmentKind;

/// Google Cloud Text-to-Speech client
pub struct GoogleTts {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to the public API)
    endpoint: String,
}

impl std::fmt::Debug for GoogleTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the API key
        f.debug_struct("GoogleTts")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Synthesis input: exactly one of `text` or `ssml` is set
#[derive(Debug, Serialize)]
struct SynthesisInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    ssml: Option<String>,
}

/// Voice selection parameters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: String,
    name: String,
}

/// Audio encoding parameters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: String,
    speaking_rate: f64,
}

/// Full request body for `text:synthesize`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTtsRequest {
    input: SynthesisInput,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

/// Response body: MP3 bytes, base64-encoded
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTtsResponse {
    audio_content: String,
}

impl GoogleTts {
    /// Create a new Google TTS client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Result<Self, SynthesisError> {
        if config.api_key.is_empty() {
            return Err(SynthesisError::AuthenticationError(
                "Google TTS requires an API key in the configuration".to_string(),
            ));
        }
        Ok(Self::new(
            config.api_key.clone(),
            config.endpoint.clone(),
            config.timeout_secs,
        ))
    }

    fn synthesize_url(&self) -> String {
        if self.endpoint.is_empty() {
            format!(
                "https://texttospeech.googleapis.com/v1/text:synthesize?key={}",
                self.api_key
            )
        } else {
            format!(
                "{}/v1/text:synthesize?key={}",
                self.endpoint.trim_end_matches('/'),
                self.api_key
            )
        }
    }

    fn build_body(request: &SynthesisRequest) -> GoogleTtsRequest {
        let input = match request.kind {
            SegmentKind::PlainText => SynthesisInput {
                text: Some(request.content.clone()),
                ssml: None,
            },
            SegmentKind::Markup => SynthesisInput {
                text: None,
                ssml: Some(request.content.clone()),
            },
        };
        GoogleTtsRequest {
            input,
            voice: VoiceSelection {
                language_code: request.voice.language_code.clone(),
                name: request.voice.voice_name.clone(),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3".to_string(),
                speaking_rate: request.voice.speaking_rate,
            },
        }
    }
}

#[async_trait]
impl SpeechProvider for GoogleTts {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let body = Self::build_body(request);

        let response = self
            .client
            .post(self.synthesize_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    SynthesisError::ConnectionError(e.to_string())
                } else {
                    SynthesisError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google TTS API error ({}): {}", status, error_text);
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(SynthesisError::AuthenticationError(error_text));
            }
            return Err(SynthesisError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let tts_response = response.json::<GoogleTtsResponse>().await.map_err(|e| {
            SynthesisError::ParseError(format!("Failed to parse Google TTS response: {}", e))
        })?;

        BASE64.decode(&tts_response.audio_content).map_err(|e| {
            SynthesisError::ParseError(format!("Invalid base64 audio content: {}", e))
        })
    }

    async fn test_connection(&self) -> Result<(), SynthesisError> {
        let request = SynthesisRequest::new(
            "Hello.",
            SegmentKind::PlainText,
            crate::app_config::VoiceConfig::default(),
        );
        self.synthesize(&request).await?;
        Ok(())
    }
}
