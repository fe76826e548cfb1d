// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use pipeline::Controller;

mod app_config;
mod assembler;
mod audio;
mod errors;
mod file_utils;
mod mixer;
mod packager;
mod pipeline;
mod providers;
mod script;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn to_level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: script to finished episode
    Produce(ProduceArgs),

    /// Synthesize narration only, without mixing
    Synthesize(SynthesizeArgs),

    /// Mix an existing narration file with the music bed
    Mix(MixArgs),

    /// Generate shell completions for podwright
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ProduceArgs {
    /// Narration script file (.txt or .ssml)
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct SynthesizeArgs {
    /// Narration script file (.txt or .ssml)
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct MixArgs {
    /// Narration MP3 to mix; defaults to the latest file in the
    /// narration directory
    #[arg(value_name = "NARRATION")]
    narration: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Voice name override (e.g. 'en-US-Neural2-D')
    #[arg(short, long)]
    voice: Option<String>,

    /// Music bed file override
    #[arg(short, long)]
    music: Option<PathBuf>,

    /// Episode title override
    #[arg(short, long)]
    title: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Podwright - narration-to-podcast episode pipeline
///
/// Turns a narration script into a finished podcast episode: the script is
/// split into provider-sized segments, synthesized with text-to-speech,
/// reassembled, mixed with a music bed and packaged as a tagged MP3.
#[derive(Parser, Debug)]
#[command(name = "podwright")]
#[command(version = "0.1.0")]
#[command(about = "Narration-to-podcast episode pipeline")]
#[command(long_about = "Podwright turns narration scripts into finished podcast episodes.

EXAMPLES:
    podwright produce script.txt               # Full pipeline with default config
    podwright synthesize script.ssml           # Narration only, no music
    podwright mix                              # Mix the latest narration file
    podwright mix narration_output/x.mp3       # Mix a specific narration file
    podwright produce -t \"Episode 12\" script.txt
    podwright completions bash > podwright.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different config file with --config-path. If the config file doesn't
    exist, a default one will be created automatically; fill in the
    synthesis API key before the first real run.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Narration script file (when no subcommand is given, runs `produce`)
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {}\x1B[0m", color, now, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "podwright", &mut std::io::stdout());
            Ok(())
        }
        None => {
            // Default behavior: a bare script path means `produce`
            let script = cli.script.ok_or_else(|| {
                anyhow!("SCRIPT is required when no subcommand is specified")
            })?;
            let config = load_config(&cli.common)?;
            let controller = Controller::with_config(config)?;
            let report = controller.produce(&script).await?;
            summarize(&report);
            Ok(())
        }
        Some(Commands::Produce(args)) => {
            let config = load_config(&args.common)?;
            let controller = Controller::with_config(config)?;
            let report = controller.produce(&args.script).await?;
            summarize(&report);
            Ok(())
        }
        Some(Commands::Synthesize(args)) => {
            let config = load_config(&args.common)?;
            let controller = Controller::with_config(config)?;
            let report = controller.synthesize_only(&args.script).await?;
            summarize(&report);
            Ok(())
        }
        Some(Commands::Mix(args)) => {
            let config = load_config(&args.common)?;
            let controller = Controller::with_config(config)?;
            let report = controller.mix(args.narration).await?;
            summarize(&report);
            Ok(())
        }
    }
}

/// Load the configuration file, creating a default one when missing,
/// then apply CLI overrides
fn load_config(options: &CommonArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(to_level_filter(&config_log_level));
    }

    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader::<_, Config>(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );
        let config = Config::default();

        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        return Err(anyhow!(
            "A default config was written to '{}'; set the synthesis API key and run again",
            config_path
        ));
    };

    // Override config with CLI options if provided
    if let Some(voice) = &options.voice {
        config.synthesis.voice.voice_name = voice.clone();
    }
    if let Some(music) = &options.music {
        config.music.bed_path = music.clone();
    }
    if let Some(title) = &options.title {
        config.episode.title = title.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(to_level_filter(&config.log_level));
    }

    Ok(config)
}

/// Print the run summary. Gaps and tagging failures are warnings, not
/// errors: the produced audio is already on disk.
fn summarize(report: &pipeline::EpisodeReport) {
    if let Some(path) = &report.narration_path {
        log::info!("Narration: {}", path.display());
    }
    if let Some(path) = &report.episode_path {
        log::info!("Episode:   {}", path.display());
    }
    for index in &report.gap_indices {
        warn!("Segment {} is missing from the narration", index + 1);
    }
    if let Some(message) = &report.metadata_warning {
        warn!("Episode was written without tags: {}", message);
    }
}
