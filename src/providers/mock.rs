/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockSpeech::working()` - Always succeeds with decodable audio
 * - `MockSpeech::failing(status)` - Always fails with an API error
 * - `MockSpeech::fail_at(indices)` - Fails only for specific request indices
 * - `MockSpeech::transient_then_working(n)` - Recovers after n failures
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioBuffer;
use crate::errors::SynthesisError;
use crate::providers::{SpeechProvider, SynthesisRequest};

/// Sample rate of the audio the mock returns
pub const MOCK_SAMPLE_RATE: u32 = 22050;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with valid WAV audio
    Working,
    /// Always fails with an API error carrying this status code
    Failing { status_code: u16 },
    /// Fails for these zero-based request indices, succeeds otherwise
    FailAt { indices: Vec<usize> },
    /// Fails transiently for the first `fail_times` requests, then succeeds
    TransientThenWorking { fail_times: usize },
    /// Succeeds after a delay (for timeout testing)
    Slow { delay_ms: u64 },
    /// Returns bytes no decoder accepts
    Garbage,
}

/// Mock provider for testing assembly behavior
#[derive(Debug)]
pub struct MockSpeech {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared so tests can assert on call counts
    request_count: Arc<AtomicUsize>,
}

impl MockSpeech {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock provider that always fails
    pub fn failing(status_code: u16) -> Self {
        Self::new(MockBehavior::Failing { status_code })
    }

    /// Create a mock provider that fails only for the given request indices
    pub fn fail_at(indices: Vec<usize>) -> Self {
        Self::new(MockBehavior::FailAt { indices })
    }

    /// Create a mock provider that recovers after `fail_times` failures
    pub fn transient_then_working(fail_times: usize) -> Self {
        Self::new(MockBehavior::TransientThenWorking { fail_times })
    }

    /// Create a slow mock provider
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock provider returning undecodable bytes
    pub fn garbage() -> Self {
        Self::new(MockBehavior::Garbage)
    }

    /// Get a handle to the request counter
    pub fn request_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }

    /// Get the number of requests made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Synthesize fake audio whose duration scales with the content length.
    /// Roughly 15 chars per second, minimum 0.1s, so assembled durations
    /// track segment sizes in tests.
    fn fake_audio(content: &str) -> Vec<u8> {
        let secs = (content.chars().count() as f64 / 15.0).max(0.1);
        let n = (secs * f64::from(MOCK_SAMPLE_RATE)) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / MOCK_SAMPLE_RATE as f32;
                (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.2
            })
            .collect();
        AudioBuffer::new(samples, MOCK_SAMPLE_RATE).to_wav_bytes()
    }
}

#[async_trait]
impl SpeechProvider for MockSpeech {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let index = self.request_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Working => Ok(Self::fake_audio(&request.content)),
            MockBehavior::Failing { status_code } => Err(SynthesisError::ApiError {
                status_code: *status_code,
                message: format!("Mock failure for request {}", index),
            }),
            MockBehavior::FailAt { indices } => {
                if indices.contains(&index) {
                    Err(SynthesisError::ApiError {
                        status_code: 400,
                        message: format!("Mock failure at index {}", index),
                    })
                } else {
                    Ok(Self::fake_audio(&request.content))
                }
            }
            MockBehavior::TransientThenWorking { fail_times } => {
                if index < *fail_times {
                    Err(SynthesisError::ConnectionError(format!(
                        "Mock transient failure {}",
                        index
                    )))
                } else {
                    Ok(Self::fake_audio(&request.content))
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(Self::fake_audio(&request.content))
            }
            MockBehavior::Garbage => Ok(vec![0xde, 0xad, 0xbe, 0xef]),
        }
    }

    async fn test_connection(&self) -> Result<(), SynthesisError> {
        match &self.behavior {
            MockBehavior::Failing { status_code } => Err(SynthesisError::ApiError {
                status_code: *status_code,
                message: "Mock connection failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::VoiceConfig;
    use crate::script::SegmentKind;

    fn request(content: &str) -> SynthesisRequest {
        SynthesisRequest::new(content, SegmentKind::PlainText, VoiceConfig::default())
    }

    #[tokio::test]
    async fn test_workingMock_shouldReturnDecodableAudio() {
        let mock = MockSpeech::working();
        let bytes = mock.synthesize(&request("Hello there.")).await.unwrap();
        let audio = AudioBuffer::from_bytes(&bytes, Some("wav")).unwrap();
        assert!(!audio.is_empty());
        assert_eq!(audio.sample_rate, MOCK_SAMPLE_RATE);
    }

    #[tokio::test]
    async fn test_workingMock_durationShouldScaleWithContent() {
        let mock = MockSpeech::working();
        let short = mock.synthesize(&request("Hi.")).await.unwrap();
        let long = mock
            .synthesize(&request(&"word ".repeat(100)))
            .await
            .unwrap();
        assert!(long.len() > short.len());
    }

    #[tokio::test]
    async fn test_failAt_shouldFailOnlyAtGivenIndices() {
        let mock = MockSpeech::fail_at(vec![1]);
        assert!(mock.synthesize(&request("a")).await.is_ok());
        assert!(mock.synthesize(&request("b")).await.is_err());
        assert!(mock.synthesize(&request("c")).await.is_ok());
    }

    #[tokio::test]
    async fn test_transientThenWorking_shouldRecover() {
        let mock = MockSpeech::transient_then_working(2);
        assert!(mock.synthesize(&request("a")).await.is_err());
        assert!(mock.synthesize(&request("a")).await.is_err());
        assert!(mock.synthesize(&request("a")).await.is_ok());
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_garbageMock_shouldReturnUndecodableBytes() {
        let mock = MockSpeech::garbage();
        let bytes = mock.synthesize(&request("noise")).await.unwrap();
        assert!(AudioBuffer::from_bytes(&bytes, Some("mp3")).is_err());
    }

    #[tokio::test]
    async fn test_requestCounter_shouldTrackCalls() {
        let mock = MockSpeech::working();
        let counter = mock.request_counter();
        mock.synthesize(&request("one")).await.unwrap();
        mock.synthesize(&request("two")).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
