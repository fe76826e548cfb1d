/*!
 * End-to-end tests: script through segmentation, mock synthesis,
 * reassembly and mixing, without external services
 */

use std::sync::Arc;
use std::time::Duration;

use podwright::app_config::{MusicConfig, VoiceConfig};
use podwright::assembler::{NarrationAssembler, RetryPolicy};
use podwright::mixer::{mix, MusicBedSettings};
use podwright::providers::mock::{MockSpeech, MOCK_SAMPLE_RATE};
use podwright::script::NarrationDocument;

use crate::common;

fn assembler(provider: MockSpeech, max_chars: usize) -> NarrationAssembler {
    NarrationAssembler::new(
        Arc::new(provider),
        RetryPolicy::new(2, Duration::from_millis(1)),
        VoiceConfig::default(),
        max_chars,
    )
}

#[tokio::test]
async fn test_plainScript_shouldBecomeSingleOrderedTrack() {
    let document = NarrationDocument::from_content(common::sample_plain_script(6));
    let track = assembler(MockSpeech::working(), 160)
        .assemble(&document)
        .await
        .unwrap();

    assert!(track.is_complete());
    assert!(track.segment_count > 1);
    assert_eq!(track.audio.sample_rate, MOCK_SAMPLE_RATE);
    assert!(track.audio.duration_secs() > 1.0);
}

#[tokio::test]
async fn test_markupScript_shouldAssembleLikePlainText() {
    let document = NarrationDocument::from_content(common::sample_markup_script());
    let track = assembler(MockSpeech::working(), 60)
        .assemble(&document)
        .await
        .unwrap();

    assert!(track.is_complete());
    assert!(track.segment_count > 1);
}

#[tokio::test]
async fn test_failedSegment_shouldLeaveGapButFinish() {
    // Budget of 100 chars keeps each of the 5 paragraphs its own segment
    let document = NarrationDocument::from_content(common::sample_plain_script(5));
    let provider = MockSpeech::fail_at(vec![2]);
    let track = assembler(provider, 100).assemble(&document).await.unwrap();

    assert_eq!(track.segment_count, 5);
    assert_eq!(track.gaps.len(), 1);
    assert_eq!(track.gaps[0].index, 2);
    assert!(!track.audio.is_empty());

    // The incomplete track still mixes into an episode master
    let bed = common::sine(110.0, 12.0, track.audio.sample_rate);
    let mut settings = MusicBedSettings::from(&MusicConfig::default());
    settings.intro_secs = 3.0;
    settings.crossfade_secs = 2.0;
    let mixed = mix(&track.audio, &bed, &settings).unwrap();
    assert_eq!(mixed.len(), track.audio.len());
}

#[tokio::test]
async fn test_flakyProvider_shouldRecoverWithRetries() {
    let document = NarrationDocument::from_content(common::sample_plain_script(2));
    let provider = MockSpeech::transient_then_working(1);
    let track = assembler(provider, 4800).assemble(&document).await.unwrap();

    assert!(track.is_complete());
}

#[tokio::test]
async fn test_assembledTrack_shouldMixWithMusicBed() {
    let document = NarrationDocument::from_content(common::sample_plain_script(8));
    let track = assembler(MockSpeech::working(), 200)
        .assemble(&document)
        .await
        .unwrap();

    // A bed shorter than the narration forces the looping path
    let bed = common::sine(110.0, 8.0, track.audio.sample_rate);
    let mut settings = MusicBedSettings::from(&MusicConfig::default());
    settings.intro_secs = 2.0;
    settings.crossfade_secs = 1.0;

    let mixed = mix(&track.audio, &bed, &settings).unwrap();
    assert_eq!(mixed.len(), track.audio.len());
    assert!(mixed.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[tokio::test]
async fn test_narrationDuration_shouldGrowWithScriptLength() {
    let short_doc = NarrationDocument::from_content(common::sample_plain_script(1));
    let long_doc = NarrationDocument::from_content(common::sample_plain_script(6));

    let short = assembler(MockSpeech::working(), 4800)
        .assemble(&short_doc)
        .await
        .unwrap();
    let long = assembler(MockSpeech::working(), 4800)
        .assemble(&long_doc)
        .await
        .unwrap();

    assert!(long.audio.duration_secs() > short.audio.duration_secs());
}
