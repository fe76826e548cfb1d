/*!
 * Pipeline controller: wires segmentation, synthesis, mixing and packaging
 * into the three top-level operations the CLI exposes.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::app_config::{Config, SpeechProviderKind};
use crate::assembler::{NarrationAssembler, NarrationTrack, ProgressFn, RetryPolicy};
use crate::audio::AudioBuffer;
use crate::file_utils::FileManager;
use crate::mixer::{self, MusicBedSettings};
use crate::packager::{encode_mp3, EpisodeMetadata, EpisodePackager};
use crate::providers::google::GoogleTts;
use crate::providers::SpeechProvider;
use crate::script::NarrationDocument;

/// Summary of one pipeline run, printed at the end
#[derive(Debug)]
pub struct EpisodeReport {
    /// Narration MP3 written to the narration directory, if this run
    /// performed synthesis
    pub narration_path: Option<PathBuf>,
    /// Finished episode file, if this run performed mixing
    pub episode_path: Option<PathBuf>,
    /// Indices of segments missing from the narration
    pub gap_indices: Vec<usize>,
    /// Tagging failure message, audio was still written
    pub metadata_warning: Option<String>,
}

impl EpisodeReport {
    /// Whether anything in the run deserves a warning in the exit summary
    pub fn has_warnings(&self) -> bool {
        !self.gap_indices.is_empty() || self.metadata_warning.is_some()
    }
}

/// Main controller driving the narration-to-episode pipeline
pub struct Controller {
    config: Config,
}

impl Controller {
    /// Create a controller with the provided configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Timestamp prefix for this run's output files; lexicographic order
    /// matches production order
    fn run_id() -> String {
        Local::now().format("%Y%m%d-%H%M%S").to_string()
    }

    fn provider(&self) -> Result<Arc<dyn SpeechProvider>> {
        match self.config.synthesis.provider {
            SpeechProviderKind::Google => {
                let client = GoogleTts::from_config(&self.config.synthesis)?;
                Ok(Arc::new(client))
            }
        }
    }

    /// Synthesize a script into a narration MP3 in the narration directory.
    /// Returns the written path and the assembled track.
    pub async fn synthesize(&self, script_path: &Path) -> Result<(PathBuf, NarrationTrack)> {
        if !script_path.exists() {
            return Err(anyhow!("Script file does not exist: {:?}", script_path));
        }

        let document = NarrationDocument::from_file(script_path)
            .with_context(|| format!("Failed to load script: {}", script_path.display()))?;

        let assembler = NarrationAssembler::new(
            self.provider()?,
            RetryPolicy::from_config(&self.config.synthesis),
            self.config.synthesis.voice.clone(),
            self.config.synthesis.max_chars_per_request,
        );

        info!(
            "Checking connection to {}",
            self.config.synthesis.provider.display_name()
        );
        assembler
            .preflight()
            .await
            .map_err(|e| anyhow!("Speech provider is not reachable: {}", e))?;

        let multi_progress = MultiProgress::new();
        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Synthesizing");

        let pb = progress_bar.clone();
        let callback: ProgressFn = Box::new(move |done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        });

        let track = assembler
            .assemble_with_progress(&document, Some(callback))
            .await
            .map_err(|e| anyhow!("Narration assembly failed: {}", e))?;
        progress_bar.finish_with_message("Synthesis complete");

        FileManager::ensure_dir(&self.config.output.narration_dir)?;
        let narration_path = self
            .config
            .output
            .narration_dir
            .join(format!("{}_narration.mp3", Self::run_id()));
        encode_mp3(&track.audio, &narration_path, self.config.output.bitrate_kbps)
            .await
            .map_err(|e| anyhow!("Failed to write narration file: {}", e))?;
        info!("Narration written to {}", narration_path.display());

        Ok((narration_path, track))
    }

    /// Mix narration audio with the music bed and package the episode
    async fn mix_and_package_audio(
        &self,
        narration: &AudioBuffer,
    ) -> Result<(PathBuf, Option<String>)> {
        let bed_path = &self.config.music.bed_path;
        if !bed_path.exists() {
            return Err(anyhow!("Music bed does not exist: {:?}", bed_path));
        }

        let bed = AudioBuffer::from_file(bed_path)
            .map_err(|e| anyhow!("Failed to decode music bed: {}", e))?;
        let bed = if bed.sample_rate != narration.sample_rate {
            info!(
                "Resampling music bed from {} Hz to {} Hz",
                bed.sample_rate, narration.sample_rate
            );
            bed.resampled(narration.sample_rate)
                .map_err(|e| anyhow!("Failed to resample music bed: {}", e))?
        } else {
            bed
        };

        let settings = MusicBedSettings::from(&self.config.music);
        let mixed = mixer::mix(narration, &bed, &settings)
            .map_err(|e| anyhow!("Mixing failed: {}", e))?;

        FileManager::ensure_dir(&self.config.output.episode_dir)?;
        let episode_path = self
            .config
            .output
            .episode_dir
            .join(format!("{}_episode.mp3", Self::run_id()));

        let packager = EpisodePackager::from_config(&self.config.output);
        let metadata = EpisodeMetadata::from(&self.config.episode);
        let report = packager
            .package(&mixed, &metadata, &episode_path)
            .await
            .map_err(|e| anyhow!("Packaging failed: {}", e))?;

        Ok((
            report.output_path,
            report.metadata_error.map(|e| e.to_string()),
        ))
    }

    /// Mix an existing narration file into a finished episode.
    ///
    /// Without an explicit path the lexicographically last narration file
    /// is used; that is only production order as long as file names keep
    /// their run-ID prefixes.
    pub async fn mix(&self, narration_path: Option<PathBuf>) -> Result<EpisodeReport> {
        let narration_path = match narration_path {
            Some(path) => path,
            None => {
                let path =
                    FileManager::latest_file_in(&self.config.output.narration_dir, "mp3")?;
                warn!(
                    "No narration file given; falling back to latest by name: {}",
                    path.display()
                );
                path
            }
        };
        if !narration_path.exists() {
            return Err(anyhow!(
                "Narration file does not exist: {:?}",
                narration_path
            ));
        }

        let narration = AudioBuffer::from_file(&narration_path)
            .map_err(|e| anyhow!("Failed to decode narration: {}", e))?;
        let (episode_path, metadata_warning) = self.mix_and_package_audio(&narration).await?;

        Ok(EpisodeReport {
            narration_path: Some(narration_path),
            episode_path: Some(episode_path),
            gap_indices: Vec::new(),
            metadata_warning,
        })
    }

    /// Full pipeline: script to finished episode in one run
    pub async fn produce(&self, script_path: &Path) -> Result<EpisodeReport> {
        let (narration_path, track) = self.synthesize(script_path).await?;
        let (episode_path, metadata_warning) = self.mix_and_package_audio(&track.audio).await?;

        Ok(EpisodeReport {
            narration_path: Some(narration_path),
            episode_path: Some(episode_path),
            gap_indices: track.gaps.iter().map(|g| g.index).collect(),
            metadata_warning,
        })
    }

    /// Synthesize only, without mixing
    pub async fn synthesize_only(&self, script_path: &Path) -> Result<EpisodeReport> {
        let (narration_path, track) = self.synthesize(script_path).await?;
        Ok(EpisodeReport {
            narration_path: Some(narration_path),
            episode_path: None,
            gap_indices: track.gaps.iter().map(|g| g.index).collect(),
            metadata_warning: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::Config;

    #[test]
    fn test_withConfig_shouldRejectInvalidConfig() {
        // Default config has no API key
        let config = Config::default();
        assert!(Controller::with_config(config).is_err());
    }

    #[test]
    fn test_runId_shouldSortChronologically() {
        let id = Controller::run_id();
        // YYYYMMDD-HHMMSS
        assert_eq!(id.len(), 15);
        assert!(id.chars().nth(8) == Some('-'));
    }

    #[test]
    fn test_report_withGaps_shouldCarryWarnings() {
        let report = EpisodeReport {
            narration_path: None,
            episode_path: None,
            gap_indices: vec![2],
            metadata_warning: None,
        };
        assert!(report.has_warnings());
    }

    #[test]
    fn test_report_clean_shouldHaveNoWarnings() {
        let report = EpisodeReport {
            narration_path: Some(PathBuf::from("n.mp3")),
            episode_path: Some(PathBuf::from("e.mp3")),
            gap_indices: Vec::new(),
            metadata_warning: None,
        };
        assert!(!report.has_warnings());
    }
}
