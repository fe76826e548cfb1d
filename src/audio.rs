use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::debug;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::errors::MixingError;

// @module: In-memory PCM buffers, decode/resample/write

/// A mono PCM buffer. Every pipeline stage after synthesis works on this
/// representation; compressed formats only exist at the file boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A silent buffer of the given duration
    pub fn silence(secs: f64, sample_rate: u32) -> Self {
        let len = (secs * f64::from(sample_rate)).round() as usize;
        Self {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Decode any supported compressed format (mp3/wav) to mono PCM
    pub fn from_bytes(data: &[u8], extension_hint: Option<&str>) -> Result<Self, MixingError> {
        decode_to_mono(data, extension_hint)
    }

    /// Read and decode an audio file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MixingError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| MixingError::DecodeFailed(format!("read {:?}: {}", path, e)))?;
        let hint = path.extension().and_then(|e| e.to_str());
        decode_to_mono(&data, hint)
    }

    /// Append another buffer of the same rate
    pub fn append(&mut self, other: &AudioBuffer) -> Result<(), MixingError> {
        if other.sample_rate != self.sample_rate {
            return Err(MixingError::InvalidInput(format!(
                "cannot append {} Hz audio to a {} Hz buffer",
                other.sample_rate, self.sample_rate
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Return a copy resampled to `target_rate`
    pub fn resampled(&self, target_rate: u32) -> Result<Self, MixingError> {
        if self.sample_rate == target_rate {
            return Ok(self.clone());
        }
        let samples = resample(&self.samples, self.sample_rate, target_rate)?;
        Ok(Self {
            samples,
            sample_rate: target_rate,
        })
    }

    /// Write the buffer as 16-bit PCM WAV
    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<(), MixingError> {
        let spec = wav_spec(self.sample_rate);
        let mut writer = WavWriter::create(path.as_ref(), spec)
            .map_err(|e| MixingError::InvalidInput(format!("create wav: {}", e)))?;
        self.write_samples(&mut writer)?;
        writer
            .finalize()
            .map_err(|e| MixingError::InvalidInput(format!("finalize wav: {}", e)))
    }

    /// Encode the buffer as an in-memory WAV (used by tests and the mock
    /// provider to produce decodable synthesis output)
    pub fn to_wav_bytes(&self) -> Vec<u8> {
        let spec = wav_spec(self.sample_rate);
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                WavWriter::new(&mut cursor, spec).expect("in-memory wav writer cannot fail");
            for &sample in &self.samples {
                let clamped = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                writer.write_sample(clamped).expect("in-memory wav write");
            }
            writer.finalize().expect("in-memory wav finalize");
        }
        cursor.into_inner()
    }

    fn write_samples<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut WavWriter<W>,
    ) -> Result<(), MixingError> {
        for &sample in &self.samples {
            let clamped = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(clamped)
                .map_err(|e| MixingError::InvalidInput(format!("write wav sample: {}", e)))?;
        }
        Ok(())
    }
}

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Convert a decibel gain to a linear amplitude factor
pub fn db_to_amplitude(db: f64) -> f32 {
    10f64.powf(db / 20.0) as f32
}

fn decode_to_mono(data: &[u8], extension_hint: Option<&str>) -> Result<AudioBuffer, MixingError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }
    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();
    let decoder_opts = DecoderOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| MixingError::DecodeFailed(format!("probe: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| MixingError::DecodeFailed("no audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| MixingError::DecodeFailed("unknown sample rate".to_string()))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &decoder_opts)
        .map_err(|e| MixingError::DecodeFailed(format!("codec: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(MixingError::DecodeFailed(format!("packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                debug!("Skipping corrupt audio frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(MixingError::DecodeFailed(format!("decode: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let samples = sample_buf.samples();

        // Downmix to mono if multi-channel
        if channels > 1 {
            for frame in samples.chunks(channels) {
                let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
                all_samples.push(mono);
            }
        } else {
            all_samples.extend_from_slice(samples);
        }
    }

    if all_samples.is_empty() {
        return Err(MixingError::DecodeFailed(
            "no audio samples decoded".to_string(),
        ));
    }

    Ok(AudioBuffer {
        samples: all_samples,
        sample_rate,
    })
}

/// Sample-rate conversion via rubato's sinc resampler
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, MixingError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| MixingError::InvalidInput(format!("resampler init: {}", e)))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let input = if chunk.len() < chunk_size {
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        } else {
            chunk.to_vec()
        };

        let result = resampler
            .process(&[input], None)
            .map_err(|e| MixingError::InvalidInput(format!("resample: {}", e)))?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    // Trim to the expected output length
    let expected_len = (samples.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}
