/*!
 * Narration assembly: per-segment synthesis with retry, ordered reassembly.
 *
 * Segments are synthesized strictly in order; each successful chunk is
 * written to scratch as `{base}_partNN.mp3`, decoded, resampled to the
 * track's rate and appended. A segment that exhausts its retries becomes a
 * reported gap rather than aborting the whole track.
 */

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tempfile::TempDir;

use crate::app_config::{SynthesisConfig, VoiceConfig};
use crate::audio::AudioBuffer;
use crate::errors::{AppError, SynthesisError};
use crate::providers::{SpeechProvider, SynthesisRequest};
use crate::script::{segment_document, NarrationDocument, Segment};

/// Retry policy for transient synthesis failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per segment, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self::new(
            config.retry_count.max(1),
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Exponential backoff delay before retry number `retry` (zero-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Time source abstraction so retry backoff is testable without sleeping
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio runtime
#[derive(Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that records requested delays instead of sleeping
#[derive(Debug, Default)]
pub struct RecordingClock {
    delays: std::sync::Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// A segment that could not be synthesized after all retries
#[derive(Debug)]
pub struct GapReport {
    /// Zero-based index of the failed segment
    pub index: usize,
    /// The final error that exhausted the retries
    pub reason: SynthesisError,
}

/// The assembled narration: ordered audio plus any gaps
#[derive(Debug)]
pub struct NarrationTrack {
    /// Concatenated audio of all successful segments, in order
    pub audio: AudioBuffer,
    /// Segments that failed and are absent from `audio`
    pub gaps: Vec<GapReport>,
    /// Total number of segments the document produced
    pub segment_count: usize,
}

impl NarrationTrack {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Progress callback: (completed segments, total segments)
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Turns a narration document into one ordered audio track
pub struct NarrationAssembler {
    provider: Arc<dyn SpeechProvider>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    voice: VoiceConfig,
    max_chars: usize,
}

impl Debug for NarrationAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationAssembler")
            .field("retry", &self.retry)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl NarrationAssembler {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        retry: RetryPolicy,
        voice: VoiceConfig,
        max_chars: usize,
    ) -> Self {
        Self {
            provider,
            retry,
            clock: Arc::new(TokioClock),
            voice,
            max_chars,
        }
    }

    /// Replace the clock (used by tests to avoid real sleeps)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify the provider is reachable before spending time on segments
    pub async fn preflight(&self) -> Result<(), SynthesisError> {
        self.provider.test_connection().await
    }

    /// Assemble the full narration for `document`
    pub async fn assemble(&self, document: &NarrationDocument) -> Result<NarrationTrack, AppError> {
        self.assemble_with_progress(document, None).await
    }

    /// Assemble with an optional per-segment progress callback
    pub async fn assemble_with_progress(
        &self,
        document: &NarrationDocument,
        progress: Option<ProgressFn>,
    ) -> Result<NarrationTrack, AppError> {
        let segments = segment_document(document, self.max_chars)?;
        let segment_count = segments.len();
        info!(
            "Assembling narration from {} segment{}",
            segment_count,
            if segment_count == 1 { "" } else { "s" }
        );

        let scratch = TempDir::new()?;
        let mut audio: Option<AudioBuffer> = None;
        let mut gaps = Vec::new();

        for segment in &segments {
            match self.synthesize_with_retry(segment).await {
                Ok(bytes) => {
                    let piece = self.decode_chunk(scratch.path(), segment.index, &bytes)?;
                    audio = Some(match audio {
                        None => piece,
                        Some(mut track) => {
                            let piece = if piece.sample_rate != track.sample_rate {
                                piece.resampled(track.sample_rate)?
                            } else {
                                piece
                            };
                            track.append(&piece)?;
                            track
                        }
                    });
                }
                Err(e) => {
                    warn!(
                        "Segment {} failed after {} attempt{}: {}",
                        segment.index + 1,
                        self.retry.max_attempts,
                        if self.retry.max_attempts == 1 { "" } else { "s" },
                        e
                    );
                    gaps.push(GapReport {
                        index: segment.index,
                        reason: e,
                    });
                }
            }
            if let Some(callback) = &progress {
                callback(segment.index + 1, segment_count);
            }
        }

        let audio = audio.ok_or_else(|| {
            AppError::Unknown("No segment could be synthesized; nothing to assemble".to_string())
        })?;

        if gaps.is_empty() {
            info!("Narration assembled: {:.1}s of audio", audio.duration_secs());
        } else {
            warn!(
                "Narration assembled with {} gap{} out of {} segments",
                gaps.len(),
                if gaps.len() == 1 { "" } else { "s" },
                segment_count
            );
        }

        Ok(NarrationTrack {
            audio,
            gaps,
            segment_count,
        })
    }

    /// One segment through the provider, retrying transient failures with
    /// exponential backoff. Permanent failures return immediately.
    async fn synthesize_with_retry(&self, segment: &Segment) -> Result<Vec<u8>, SynthesisError> {
        let request = SynthesisRequest::new(
            segment.content.clone(),
            segment.kind,
            self.voice.clone(),
        );

        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                debug!(
                    "Retrying segment {} (attempt {}/{}) after {:?}",
                    segment.index + 1,
                    attempt + 1,
                    self.retry.max_attempts,
                    delay
                );
                self.clock.sleep(delay).await;
            }

            match self.provider.synthesize(&request).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    warn!("Transient failure on segment {}: {}", segment.index + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SynthesisError::RequestFailed("retry loop exited without an error".to_string())
        }))
    }

    /// Persist one chunk to scratch and decode it.
    /// The file exists only for the decoder; it is removed afterwards.
    fn decode_chunk(
        &self,
        scratch: &Path,
        index: usize,
        bytes: &[u8],
    ) -> Result<AudioBuffer, AppError> {
        let path = scratch.join(chunk_filename("segment", index));
        std::fs::write(&path, bytes)?;
        debug!("Wrote chunk {} ({} bytes)", path.display(), bytes.len());

        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_owned);
        let audio = AudioBuffer::from_bytes(bytes, extension.as_deref())?;

        std::fs::remove_file(&path)?;
        Ok(audio)
    }
}

/// Chunk file name: `{base}_partNN.mp3`, zero-padded and one-based so a
/// directory listing sorts in synthesis order
pub fn chunk_filename(base: &str, index: usize) -> String {
    format!("{}_part{:02}.mp3", base, index + 1)
}
