use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Speech synthesis config
    pub synthesis: SynthesisConfig,

    /// Music bed and mixing config
    #[serde(default)]
    pub music: MusicConfig,

    /// Output file config
    #[serde(default)]
    pub output: OutputConfig,

    /// Episode metadata embedded into the final file
    #[serde(default)]
    pub episode: EpisodeConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech synthesis provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProviderKind {
    // @provider: Google Cloud Text-to-Speech
    #[default]
    Google,
}

impl SpeechProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google Cloud TTS",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
        }
    }
}

impl std::fmt::Display for SpeechProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for SpeechProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: SpeechProviderKind,

    // @field: API key (passed explicitly; no environment-variable fallback)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL (empty = public endpoint)
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Voice settings
    #[serde(default)]
    pub voice: VoiceConfig,

    // @field: Max chars per synthesis request
    #[serde(default = "default_max_chars_per_request")]
    pub max_chars_per_request: usize,

    // @field: Request timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests (transient failures only)
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProviderKind::default(),
            api_key: String::new(),
            endpoint: String::new(),
            voice: VoiceConfig::default(),
            max_chars_per_request: default_max_chars_per_request(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Voice selection parameters sent with every synthesis request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VoiceConfig {
    /// Language code (e.g., "en-US", "es-ES")
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Voice name (e.g., "en-US-Neural2-D")
    #[serde(default = "default_voice_name")]
    pub voice_name: String,

    /// Speaking rate (1.0 = normal)
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
            voice_name: default_voice_name(),
            speaking_rate: default_speaking_rate(),
        }
    }
}

/// Music bed and volume envelope configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MusicConfig {
    /// Path to the music bed asset
    #[serde(default = "default_music_path")]
    pub bed_path: PathBuf,

    /// Intro region length in seconds (played at intro gain)
    #[serde(default = "default_intro_secs")]
    pub intro_secs: f64,

    /// Gain applied to the intro region, in dB
    #[serde(default = "default_intro_gain_db")]
    pub intro_gain_db: f64,

    /// Gain applied to the body region, in dB (quieter, sits under speech)
    #[serde(default = "default_body_gain_db")]
    pub body_gain_db: f64,

    /// Crossfade between intro and looped body, in seconds
    #[serde(default = "default_crossfade_secs")]
    pub crossfade_secs: f64,

    /// Overall fade-in at the start of the music rendering, in seconds
    #[serde(default = "default_fade_in_secs")]
    pub fade_in_secs: f64,

    /// Overall fade-out at the end of the music rendering, in seconds
    #[serde(default = "default_fade_out_secs")]
    pub fade_out_secs: f64,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            bed_path: default_music_path(),
            intro_secs: default_intro_secs(),
            intro_gain_db: default_intro_gain_db(),
            body_gain_db: default_body_gain_db(),
            crossfade_secs: default_crossfade_secs(),
            fade_in_secs: default_fade_in_secs(),
            fade_out_secs: default_fade_out_secs(),
        }
    }
}

/// Output file configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory where intermediate narration files land
    #[serde(default = "default_narration_dir")]
    pub narration_dir: PathBuf,

    /// Directory where finished episodes land
    #[serde(default = "default_episode_dir")]
    pub episode_dir: PathBuf,

    /// Fixed MP3 bitrate in kbit/s for the final encode
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            narration_dir: default_narration_dir(),
            episode_dir: default_episode_dir(),
            bitrate_kbps: default_bitrate_kbps(),
        }
    }
}

/// Textual tags and cover art embedded into the episode file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EpisodeConfig {
    /// Episode title tag
    #[serde(default = "default_episode_title")]
    pub title: String,

    /// Artist tag
    #[serde(default = "default_episode_artist")]
    pub artist: String,

    /// Album tag
    #[serde(default = "default_episode_album")]
    pub album: String,

    /// Cover image path (jpg/png); None = no cover embedded
    #[serde(default)]
    pub cover_path: Option<PathBuf>,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            title: default_episode_title(),
            artist: default_episode_artist(),
            album: default_episode_album(),
            cover_path: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_max_chars_per_request() -> usize {
    4800 // Provider request body limit, with headroom under the hard 5000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_voice_name() -> String {
    "en-US-Neural2-D".to_string()
}

fn default_speaking_rate() -> f64 {
    1.0
}

fn default_music_path() -> PathBuf {
    PathBuf::from("music/bed.mp3")
}

fn default_intro_secs() -> f64 {
    10.0
}

fn default_intro_gain_db() -> f64 {
    -15.0 // Slightly louder for the intro
}

fn default_body_gain_db() -> f64 {
    -35.0 // Quieter during speech
}

fn default_crossfade_secs() -> f64 {
    5.0
}

fn default_fade_in_secs() -> f64 {
    2.0
}

fn default_fade_out_secs() -> f64 {
    3.0
}

fn default_narration_dir() -> PathBuf {
    PathBuf::from("narration_output")
}

fn default_episode_dir() -> PathBuf {
    PathBuf::from("episode_output")
}

fn default_bitrate_kbps() -> u32 {
    192
}

fn default_episode_title() -> String {
    "Daily Digest".to_string()
}

fn default_episode_artist() -> String {
    "Podwright".to_string()
}

fn default_episode_album() -> String {
    "Podwright Episodes".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.max_chars_per_request == 0 {
            return Err(anyhow!("max_chars_per_request must be greater than zero"));
        }

        match self.synthesis.provider {
            SpeechProviderKind::Google => {
                if self.synthesis.api_key.is_empty() {
                    return Err(anyhow!(
                        "Synthesis API key is required for the Google provider"
                    ));
                }
            }
        }

        if self.music.intro_secs < 0.0
            || self.music.crossfade_secs < 0.0
            || self.music.fade_in_secs < 0.0
            || self.music.fade_out_secs < 0.0
        {
            return Err(anyhow!("Music envelope durations must not be negative"));
        }

        if self.output.bitrate_kbps == 0 {
            return Err(anyhow!("Output bitrate must be greater than zero"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            synthesis: SynthesisConfig::default(),
            music: MusicConfig::default(),
            output: OutputConfig::default(),
            episode: EpisodeConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
