/*!
 * Tests for music bed mixing through the public API
 */

use podwright::app_config::MusicConfig;
use podwright::audio::db_to_amplitude;
use podwright::errors::MixingError;
use podwright::mixer::{mix, MusicBedSettings};

use crate::common;

const RATE: u32 = 200;

fn default_settings() -> MusicBedSettings {
    MusicBedSettings::from(&MusicConfig::default())
}

#[test]
fn test_mix_shouldProduceNarrationLengthOutput() {
    let narration = common::sine(220.0, 120.0, RATE);
    let bed = common::sine(110.0, 30.0, RATE);
    let mixed = mix(&narration, &bed, &default_settings()).unwrap();
    assert_eq!(mixed.len(), narration.len());
}

#[test]
fn test_mix_outputShouldStayInRange() {
    let narration = common::sine(220.0, 60.0, RATE);
    let bed = common::sine(110.0, 30.0, RATE);
    let mixed = mix(&narration, &bed, &default_settings()).unwrap();
    assert!(mixed.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn test_mix_bodyShouldBeQuieterThanIntro() {
    let narration = podwright::audio::AudioBuffer::new(vec![0.0; 120 * RATE as usize], RATE);
    let bed = podwright::audio::AudioBuffer::new(vec![0.5; 30 * RATE as usize], RATE);
    let mixed = mix(&narration, &bed, &default_settings()).unwrap();

    // Narration is silent, so the mix exposes the music envelope directly
    let intro_probe = mixed.samples[5 * RATE as usize].abs();
    let body_probe = mixed.samples[60 * RATE as usize].abs();
    let expected_intro = 0.5 * db_to_amplitude(-15.0);
    let expected_body = 0.5 * db_to_amplitude(-35.0);
    assert!((intro_probe - expected_intro).abs() < 0.005);
    assert!((body_probe - expected_body).abs() < 0.002);
    assert!(intro_probe > body_probe);
}

#[test]
fn test_mix_settingsFromConfig_shouldCarryEnvelope() {
    let config = MusicConfig::default();
    let settings = MusicBedSettings::from(&config);
    assert_eq!(settings.intro_secs, 10.0);
    assert_eq!(settings.crossfade_secs, 5.0);
    assert_eq!(settings.fade_out_secs, 3.0);
}

#[test]
fn test_mix_impossibleCrossfade_shouldFail() {
    let narration = common::sine(220.0, 60.0, RATE);
    let bed = common::sine(110.0, 30.0, RATE);
    let mut settings = default_settings();
    settings.crossfade_secs = 12.0; // longer than the 10s intro
    assert!(matches!(
        mix(&narration, &bed, &settings),
        Err(MixingError::InvariantViolated(_))
    ));
}
