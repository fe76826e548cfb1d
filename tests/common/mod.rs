/*!
 * Common test utilities for the podwright test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use podwright::audio::AudioBuffer;
use tempfile::TempDir;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A plain-text script with several paragraphs
pub fn sample_plain_script(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "This is paragraph {} of the narration. It has two sentences for good measure.",
                i + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A small well-formed speech-markup script with two voice blocks
pub fn sample_markup_script() -> String {
    "<speak><voice name=\"host\">Welcome to the show.</voice>\
     <voice name=\"guest\">Glad to be here.</voice></speak>"
        .to_string()
}

/// A mono sine tone for mixing tests
pub fn sine(freq: f32, secs: f64, sample_rate: u32) -> AudioBuffer {
    let n = (secs * f64::from(sample_rate)) as usize;
    let samples = (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.3
        })
        .collect();
    AudioBuffer::new(samples, sample_rate)
}
