//! Descriptive voice features shown to the user after an upload.
//!
//! Nothing here feeds the synthesis path; the numbers only summarise the
//! preprocessed reference clip.

mod mfcc;
mod pitch;
mod spectral;
mod stft;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::{preprocess, AudioBuffer, AudioError, TARGET_SAMPLE_RATE};

pub use mfcc::{Mfcc, MfccConfig};
pub use pitch::{mean_fundamental_frequency, yin, YinConfig};
pub use spectral::{mean_spectral_centroid, mean_spectral_rolloff};
pub use stft::{fft_frequencies, hann_window, magnitude_spectrogram};

/// Summary of a reference recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceFeatures {
    /// Mean YIN pitch estimate in Hz.
    pub fundamental_frequency: f64,
    /// Mean spectral centroid in Hz.
    pub spectral_centroid: f64,
    /// Mean 85% spectral rolloff in Hz.
    pub spectral_rolloff: f64,
    /// Per-coefficient mean of the MFCC matrix.
    pub mfcc_mean: Vec<f64>,
    /// Duration of the preprocessed clip in seconds.
    pub duration: f64,
    pub sample_rate: u32,
}

/// Analysis parameters for [`extract_from_buffer`].
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub roll_percent: f64,
    pub n_mfcc: usize,
    pub n_mels: usize,
    pub yin: YinConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            roll_percent: 0.85,
            n_mfcc: 20,
            n_mels: 128,
            yin: YinConfig::default(),
        }
    }
}

/// Preprocess the file at `path` and summarise it.
pub fn extract_features(path: &Path) -> Result<VoiceFeatures, AudioError> {
    let audio = preprocess(path, TARGET_SAMPLE_RATE)?;
    Ok(extract_from_buffer(&audio, &FeatureConfig::default()))
}

/// Summarise an already preprocessed buffer.
pub fn extract_from_buffer(audio: &AudioBuffer, config: &FeatureConfig) -> VoiceFeatures {
    let magnitudes = magnitude_spectrogram(&audio.samples, config.n_fft, config.hop_length);
    let freqs = fft_frequencies(audio.sample_rate, config.n_fft);

    let mfcc = Mfcc::new(MfccConfig {
        sample_rate: audio.sample_rate,
        n_fft: config.n_fft,
        n_mels: config.n_mels,
        n_mfcc: config.n_mfcc,
        ..Default::default()
    });

    VoiceFeatures {
        fundamental_frequency: mean_fundamental_frequency(
            &audio.samples,
            audio.sample_rate,
            &config.yin,
        ),
        spectral_centroid: mean_spectral_centroid(&magnitudes, &freqs),
        spectral_rolloff: mean_spectral_rolloff(&magnitudes, &freqs, config.roll_percent),
        mfcc_mean: mfcc.mean(&magnitudes),
        duration: audio.duration(),
        sample_rate: audio.sample_rate,
    }
}
