//! Reference-audio handling.
//!
//! This module provides:
//! - Decoding of wav / mp3 / flac / m4a files into mono samples
//! - 32-bit float WAV writing
//! - Resampling
//! - The preprocessing pipeline applied to every reference recording

mod io;
mod preprocess;
mod resample;

use std::path::{Path, PathBuf};

pub use io::{decode_file, save_wav};
pub(crate) use preprocess::centered_frames;
pub use preprocess::{
    preemphasis, preprocess, preprocess_with, tile_to_length, trim_silence, PreprocessOptions,
    PreprocessOptionsBuilder,
};
pub use resample::resample;

/// Sample rate every reference clip is brought to before analysis or cloning.
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// Peak amplitude below which a clip is treated as digital silence.
pub const SILENCE_FLOOR: f32 = 1e-5;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("Audio file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode audio: {0}")]
    Decode(String),
    #[error("Resampling failed: {0}")]
    Resample(String),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    #[error("Audio contains no signal (empty or silent recording)")]
    Silent,
}

/// Mono waveform plus the rate it is sampled at.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value, 0.0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Scale so the peak sits at 1.0. Silent buffers are left untouched.
    pub fn normalize(&mut self) {
        let peak = self.peak();
        if peak > 0.0 && peak != 1.0 {
            for sample in &mut self.samples {
                *sample /= peak;
            }
        }
    }

    /// Write the buffer as a mono 32-bit float WAV file.
    pub fn save(&self, path: &Path) -> Result<(), AudioError> {
        save_wav(path, &self.samples, self.sample_rate)
    }
}
