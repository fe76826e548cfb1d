/*!
 * # Podwright - Narration-to-podcast episode pipeline
 *
 * A Rust library for turning narration scripts into finished podcast
 * episodes with text-to-speech and a mixed music bed.
 *
 * ## Features
 *
 * - Split plain-text and speech-markup scripts into provider-sized segments
 * - Synthesize each segment via a text-to-speech provider:
 *   - Google Cloud Text-to-Speech
 * - Reassemble segment audio in order, with retry and gap reporting
 * - Mix a looping music bed under the narration with a volume envelope
 * - Package the result as a tagged MP3 episode with cover art
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `script`: Script loading and segmentation
 * - `providers`: Client implementations for speech-synthesis services:
 *   - `providers::google`: Google Cloud TTS client
 *   - `providers::mock`: Simulated provider for tests
 * - `assembler`: Per-segment synthesis and ordered reassembly
 * - `audio`: Decoding, resampling and PCM buffers
 * - `mixer`: Music bed envelope, looping and overlay
 * - `packager`: MP3 encoding and ID3 tagging
 * - `pipeline`: Main application controller
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod assembler;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod mixer;
pub mod packager;
pub mod pipeline;
pub mod providers;
pub mod script;

// Re-export main types for easier usage
pub use app_config::Config;
pub use assembler::{NarrationAssembler, NarrationTrack, RetryPolicy};
pub use audio::AudioBuffer;
pub use errors::{AppError, MixingError, SegmentationError, SynthesisError};
pub use pipeline::Controller;
pub use script::{NarrationDocument, Segment, SegmentKind};
