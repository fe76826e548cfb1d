/*!
 * Provider implementations for speech-synthesis services.
 *
 * This module contains client implementations for text-to-speech providers:
 * - Google: Google Cloud Text-to-Speech REST API
 * - Mock: simulated provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::VoiceConfig;
use crate::errors::SynthesisError;
use crate::script::SegmentKind;

/// One bounded synthesis call: a single segment plus the voice to render it with
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Segment text, including markup wrappers when `kind` is `Markup`
    pub content: String,
    /// Whether `content` is plain text or speech markup
    pub kind: SegmentKind,
    /// Voice parameters forwarded to the provider
    pub voice: VoiceConfig,
}

impl SynthesisRequest {
    pub fn new(content: impl Into<String>, kind: SegmentKind, voice: VoiceConfig) -> Self {
        Self {
            content: content.into(),
            kind,
            voice,
        }
    }
}

/// Common trait for all speech-synthesis providers
///
/// Implementations turn one segment into encoded audio bytes. Callers own
/// retry and ordering; providers only perform the single bounded request.
#[async_trait]
pub trait SpeechProvider: Send + Sync + Debug {
    /// Synthesize one segment into encoded audio bytes
    ///
    /// # Arguments
    /// * `request` - The segment and voice to synthesize
    ///
    /// # Returns
    /// * `Result<Vec<u8>, SynthesisError>` - Encoded audio or an error
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), SynthesisError>;
}

pub mod google;
pub mod mock;
