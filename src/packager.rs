//! Episode packaging: MP3 encoding via ffmpeg and ID3v2 tagging via lofty.
//!
//! The mixed audio is written to a temporary WAV, encoded to MP3 by an
//! ffmpeg subprocess, then tagged. Tagging failures are recoverable: the
//! encoded audio is kept and the failure is reported to the caller.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::tag::{Tag, TagType};
use tempfile::TempDir;
use tokio::process::Command;

use crate::app_config::{EpisodeConfig, OutputConfig};
use crate::audio::AudioBuffer;
use crate::errors::{AppError, MetadataError};

/// Tags written into the finished episode file
#[derive(Debug, Clone)]
pub struct EpisodeMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_path: Option<PathBuf>,
}

impl From<&EpisodeConfig> for EpisodeMetadata {
    fn from(config: &EpisodeConfig) -> Self {
        Self {
            title: config.title.clone(),
            artist: config.artist.clone(),
            album: config.album.clone(),
            cover_path: config.cover_path.clone(),
        }
    }
}

/// Outcome of packaging one episode
#[derive(Debug)]
pub struct PackagingReport {
    pub output_path: PathBuf,
    /// Set when tagging failed but the audio itself was written
    pub metadata_error: Option<MetadataError>,
}

/// Build the complete ffmpeg argument list for a WAV-to-MP3 encode.
/// Returns a `Vec<String>` ready for `Command::new("ffmpeg").args(...)`.
pub fn build_encode_args(input_path: &Path, output_path: &Path, bitrate_kbps: u32) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string_lossy().to_string(),
        "-codec:a".to_string(),
        "libmp3lame".to_string(),
        "-b:a".to_string(),
        format!("{}k", bitrate_kbps),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Run ffmpeg with the given arguments, capturing stderr for diagnostics
async fn run_ffmpeg(args: &[String]) -> Result<(), AppError> {
    debug!("Running ffmpeg {}", args.join(" "));
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .await
        .map_err(|e| AppError::Unknown(format!("Failed to launch ffmpeg: {}", e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(AppError::Unknown(format!(
            "ffmpeg exited with status {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.lines().last().unwrap_or("")
        )))
    }
}

/// Encode `audio` to an MP3 at `output_path` through a temporary WAV.
/// Used both for intermediate narration files and the final episode.
pub async fn encode_mp3(
    audio: &AudioBuffer,
    output_path: &Path,
    bitrate_kbps: u32,
) -> Result<(), AppError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let scratch = TempDir::new()?;
    let wav_path = scratch.path().join("encode.wav");
    audio.write_wav(&wav_path)?;

    let args = build_encode_args(&wav_path, output_path, bitrate_kbps);
    run_ffmpeg(&args).await?;
    info!(
        "Encoded {:.1}s of audio to {} at {} kbps",
        audio.duration_secs(),
        output_path.display(),
        bitrate_kbps
    );
    Ok(())
}

/// Map a cover image extension to its embedded MIME type
fn cover_mime_type(path: &Path) -> MimeType {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => MimeType::Png,
        _ => MimeType::Jpeg,
    }
}

/// Write ID3v2 tags and an optional front-cover image onto `path`.
///
/// Replaces any existing tag wholesale, so re-tagging the same file is
/// idempotent.
pub fn embed_metadata(path: &Path, metadata: &EpisodeMetadata) -> Result<(), MetadataError> {
    let mut tag = Tag::new(TagType::Id3v2);
    tag.set_title(metadata.title.clone());
    tag.set_artist(metadata.artist.clone());
    tag.set_album(metadata.album.clone());

    if let Some(cover_path) = &metadata.cover_path {
        let data = std::fs::read(cover_path).map_err(|e| {
            MetadataError::CoverUnreadable(format!("{}: {}", cover_path.display(), e))
        })?;
        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(cover_mime_type(cover_path)),
            Some("Cover".to_string()),
            data,
        );
        tag.push_picture(picture);
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| MetadataError::TagWriteFailed(e.to_string()))?;

    debug!("Tagged {} ({} / {})", path.display(), metadata.title, metadata.artist);
    Ok(())
}

/// Encodes mixed audio to a tagged MP3 episode file
#[derive(Debug)]
pub struct EpisodePackager {
    bitrate_kbps: u32,
}

impl EpisodePackager {
    pub fn new(bitrate_kbps: u32) -> Self {
        Self { bitrate_kbps }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(output.bitrate_kbps)
    }

    /// Encode `audio` to `output_path` and apply `metadata`.
    ///
    /// A tagging failure does not discard the episode; it is surfaced in
    /// the report so the caller can warn and keep the file.
    pub async fn package(
        &self,
        audio: &AudioBuffer,
        metadata: &EpisodeMetadata,
        output_path: &Path,
    ) -> Result<PackagingReport, AppError> {
        encode_mp3(audio, output_path, self.bitrate_kbps).await?;

        let metadata_error = match embed_metadata(output_path, metadata) {
            Ok(()) => None,
            Err(e) => {
                warn!("Tagging failed, keeping untagged episode: {}", e);
                Some(e)
            }
        };

        Ok(PackagingReport {
            output_path: output_path.to_path_buf(),
            metadata_error,
        })
    }
}
