//! Music-bed mixing: volume envelope, body looping, crossfade, overlay.
//!
//! The bed is split into a louder intro region and a quieter body region,
//! the body is looped (body only, never the whole bed) until it covers the
//! narration, the intro is crossfaded into the loop, edge fades are applied
//! to the whole rendering, and the result is overlaid additively onto the
//! narration. The narration's own gain is never touched.

use log::{debug, info};

use crate::app_config::MusicConfig;
use crate::audio::{db_to_amplitude, AudioBuffer};
use crate::errors::MixingError;

/// Volume envelope policy for the music bed
#[derive(Debug, Clone)]
pub struct MusicBedSettings {
    /// Intro region length in seconds
    pub intro_secs: f64,
    /// Gain applied to the intro region, in dB
    pub intro_gain_db: f64,
    /// Gain applied to the body region, in dB
    pub body_gain_db: f64,
    /// Crossfade between intro and looped body, in seconds
    pub crossfade_secs: f64,
    /// Overall fade-in at the start of the rendering, in seconds
    pub fade_in_secs: f64,
    /// Overall fade-out at the end of the rendering, in seconds
    pub fade_out_secs: f64,
}

impl From<&MusicConfig> for MusicBedSettings {
    fn from(config: &MusicConfig) -> Self {
        Self {
            intro_secs: config.intro_secs,
            intro_gain_db: config.intro_gain_db,
            body_gain_db: config.body_gain_db,
            crossfade_secs: config.crossfade_secs,
            fade_in_secs: config.fade_in_secs,
            fade_out_secs: config.fade_out_secs,
        }
    }
}

/// Overlay `narration` with a rendering of `bed` shaped by `settings`.
///
/// Both buffers must share a sample rate (the caller resamples the bed).
/// The output has exactly the narration's length; music extending past the
/// narration is dropped, matching an overlay onto the primary track.
pub fn mix(
    narration: &AudioBuffer,
    bed: &AudioBuffer,
    settings: &MusicBedSettings,
) -> Result<AudioBuffer, MixingError> {
    if narration.is_empty() {
        return Err(MixingError::InvalidInput(
            "narration track is empty".to_string(),
        ));
    }
    if bed.is_empty() {
        return Err(MixingError::InvalidInput("music bed is empty".to_string()));
    }
    if narration.sample_rate != bed.sample_rate {
        return Err(MixingError::InvalidInput(format!(
            "narration is {} Hz but music bed is {} Hz; resample the bed first",
            narration.sample_rate, bed.sample_rate
        )));
    }

    let rate = narration.sample_rate;
    let music = render_music(bed, settings, narration.len(), rate)?;

    // Additive overlay at t=0; narration gain untouched
    let mut samples = narration.samples.clone();
    for (out, m) in samples.iter_mut().zip(music.samples.iter()) {
        *out = (*out + m).clamp(-1.0, 1.0);
    }

    info!(
        "Mixed {:.1}s narration with {:.1}s music rendering",
        narration.duration_secs(),
        music.duration_secs()
    );

    Ok(AudioBuffer::new(samples, rate))
}

/// Build the full-length music rendering: gained intro, looped gained body,
/// crossfade, edge fades.
fn render_music(
    bed: &AudioBuffer,
    settings: &MusicBedSettings,
    narration_len: usize,
    rate: u32,
) -> Result<AudioBuffer, MixingError> {
    let intro_len = seconds_to_samples(settings.intro_secs, rate).min(bed.len());

    // 1. Split the bed into intro and body regions
    let mut intro: Vec<f32> = bed.samples[..intro_len].to_vec();
    let body: Vec<f32> = bed.samples[intro_len..].to_vec();
    if body.is_empty() {
        return Err(MixingError::InvalidInput(format!(
            "music bed ({:.1}s) is not longer than the intro region ({:.1}s)",
            bed.duration_secs(),
            settings.intro_secs
        )));
    }

    // 2. Per-region gain
    let intro_gain = db_to_amplitude(settings.intro_gain_db);
    let body_gain = db_to_amplitude(settings.body_gain_db);
    for s in intro.iter_mut() {
        *s *= intro_gain;
    }

    // 3. Loop the body region (the body only, not the whole bed) until it
    //    covers the narration past the intro. The crossfade consumes
    //    `crossfade_len` samples of overlap, so the loop target includes
    //    them; otherwise a body landing exactly on the narration boundary
    //    would leave the final crossfade region music-free.
    let crossfade_len = seconds_to_samples(settings.crossfade_secs, rate);
    let target_body_len = narration_len.saturating_sub(intro_len) + crossfade_len;
    let mut looped_body: Vec<f32> = Vec::with_capacity(target_body_len.max(body.len()));
    looped_body.extend(body.iter().map(|s| s * body_gain));
    while looped_body.len() < target_body_len {
        looped_body.extend(body.iter().map(|s| s * body_gain));
    }
    debug!(
        "Music body looped to {} samples (target {})",
        looped_body.len(),
        target_body_len
    );

    // 4. Crossfade intro into the looped body; the fade regions overlap
    if crossfade_len > intro.len() || crossfade_len > looped_body.len() {
        return Err(MixingError::InvariantViolated(format!(
            "crossfade of {} samples exceeds intro ({}) or looped body ({})",
            crossfade_len,
            intro.len(),
            looped_body.len()
        )));
    }
    fade_out(&mut intro, crossfade_len);
    fade_in(&mut looped_body, crossfade_len);

    let rendering_len = intro.len() + looped_body.len() - crossfade_len;
    let mut rendering = vec![0.0f32; rendering_len];
    rendering[..intro.len()].copy_from_slice(&intro);
    let body_start = intro.len() - crossfade_len;
    for (i, s) in looped_body.iter().enumerate() {
        rendering[body_start + i] += s;
    }

    // 5. Edge fades on the full rendering, separate from the crossfade
    let fade_in_len = seconds_to_samples(settings.fade_in_secs, rate);
    if fade_in_len > 0 && fade_in_len < rendering.len() {
        fade_in(&mut rendering, fade_in_len);
    }
    let fade_out_len = seconds_to_samples(settings.fade_out_secs, rate);
    if fade_out_len > 0 && fade_out_len < rendering.len() {
        fade_out(&mut rendering, fade_out_len);
    }

    Ok(AudioBuffer::new(rendering, rate))
}

fn seconds_to_samples(secs: f64, rate: u32) -> usize {
    (secs * f64::from(rate)).round() as usize
}

/// Linear fade over the first `len` samples
fn fade_in(samples: &mut [f32], len: usize) {
    let len = len.min(samples.len());
    for i in 0..len {
        samples[i] *= i as f32 / len as f32;
    }
}

/// Linear fade over the last `len` samples
fn fade_out(samples: &mut [f32], len: usize) {
    let total = samples.len();
    let len = len.min(total);
    for i in 0..len {
        let pos = total - len + i;
        samples[pos] *= (len - i) as f32 / len as f32;
    }
}
