use std::path::Path;

use derive_builder::Builder;

use super::{decode_file, resample, AudioBuffer, AudioError, SILENCE_FLOOR, TARGET_SAMPLE_RATE};

/// Parameters for the reference-audio preprocessing pipeline.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct PreprocessOptions {
    /// Rate the clip is resampled to.
    pub target_sample_rate: u32,
    /// Pre-emphasis coefficient.
    pub preemphasis: f32,
    /// Frames quieter than this many dB below the loudest frame count as silence.
    pub top_db: f32,
    /// Frame length used for silence detection.
    pub frame_length: usize,
    /// Hop length used for silence detection.
    pub hop_length: usize,
    /// Shorter clips are tiled up to exactly this duration.
    pub min_duration_secs: f32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            preemphasis: 0.97,
            top_db: 20.0,
            frame_length: 2048,
            hop_length: 512,
            min_duration_secs: 3.0,
        }
    }
}

impl PreprocessOptions {
    fn min_samples(&self) -> usize {
        (self.target_sample_rate as f32 * self.min_duration_secs).round() as usize
    }
}

/// Load and condition a reference recording with default options.
pub fn preprocess(path: &Path, target_sample_rate: u32) -> Result<AudioBuffer, AudioError> {
    let options = PreprocessOptions {
        target_sample_rate,
        ..Default::default()
    };
    preprocess_with(path, &options)
}

/// Load and condition a reference recording.
///
/// Steps: decode, resample, pre-emphasis, peak normalisation, silence trim,
/// then tiling up to the minimum duration. Empty or digitally silent input is
/// rejected with [`AudioError::Silent`].
pub fn preprocess_with(path: &Path, options: &PreprocessOptions) -> Result<AudioBuffer, AudioError> {
    let decoded = decode_file(path)?;
    if decoded.is_empty() || decoded.peak() < SILENCE_FLOOR {
        log::warn!("Rejecting silent recording {}", path.display());
        return Err(AudioError::Silent);
    }

    let mut audio = resample(&decoded, options.target_sample_rate)?;
    preemphasis(&mut audio.samples, options.preemphasis);
    audio.normalize();

    let trimmed = trim_silence(
        &audio.samples,
        options.top_db,
        options.frame_length,
        options.hop_length,
    );
    if trimmed.is_empty() {
        return Err(AudioError::Silent);
    }

    let samples = tile_to_length(trimmed, options.min_samples());
    log::debug!(
        "Preprocessed {}: {} -> {} samples at {} Hz",
        path.display(),
        decoded.len(),
        samples.len(),
        options.target_sample_rate
    );

    Ok(AudioBuffer::new(samples, options.target_sample_rate))
}

/// First-order high-pass `y[n] = x[n] - coef * x[n-1]`.
///
/// The sample before the start is extrapolated as `2 * x[0] - x[1]`.
pub fn preemphasis(samples: &mut [f32], coef: f32) {
    if samples.is_empty() {
        return;
    }
    let initial = match *samples {
        [x0, x1, ..] => 2.0 * x0 - x1,
        [x0] => x0,
        [] => 0.0,
    };

    let mut prev = initial;
    for sample in samples.iter_mut() {
        let current = *sample;
        *sample = current - coef * prev;
        prev = current;
    }
}

/// Slice of `samples` with leading and trailing silence removed.
///
/// Frame RMS energy is measured on centred, zero-padded frames; frames within
/// `top_db` of the loudest frame are kept.
pub fn trim_silence(samples: &[f32], top_db: f32, frame_length: usize, hop_length: usize) -> &[f32] {
    if samples.is_empty() || hop_length == 0 || frame_length == 0 {
        return samples;
    }

    let rms = frame_rms(samples, frame_length, hop_length);
    let amin = SILENCE_FLOOR;
    let reference = rms.iter().copied().fold(0.0f32, f32::max).max(amin);
    let threshold_db = -top_db;

    let loud = |r: &f32| 20.0 * (r.max(amin) / reference).log10() > threshold_db;
    let first = rms.iter().position(loud);
    let last = rms.iter().rposition(loud);

    match (first, last) {
        (Some(first), Some(last)) => {
            let start = (first * hop_length).min(samples.len());
            let end = ((last + 1) * hop_length).min(samples.len());
            &samples[start..end]
        }
        _ => &samples[..0],
    }
}

fn frame_rms(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    centered_frames(samples, frame_length, hop_length)
        .map(|frame| {
            let energy: f32 = frame.iter().map(|s| s * s).sum();
            (energy / frame_length as f32).sqrt()
        })
        .collect()
}

/// Frames of `frame_length` samples every `hop_length` samples, centred on
/// the hop positions. Samples outside the signal read as zero.
pub(crate) fn centered_frames(
    samples: &[f32],
    frame_length: usize,
    hop_length: usize,
) -> impl Iterator<Item = Vec<f32>> + '_ {
    let pad = (frame_length / 2) as isize;
    let n_frames = 1 + samples.len() / hop_length.max(1);

    (0..n_frames).map(move |frame| {
        let start = (frame * hop_length) as isize - pad;
        (start..start + frame_length as isize)
            .map(|i| {
                if i < 0 {
                    0.0
                } else {
                    samples.get(i as usize).copied().unwrap_or(0.0)
                }
            })
            .collect()
    })
}

/// Repeat `samples` cyclically until `min_len` is reached, then cut to exactly
/// `min_len`. Inputs already at least `min_len` long are returned as-is.
///
/// `samples` must be non-empty whenever it is shorter than `min_len`.
pub fn tile_to_length(samples: &[f32], min_len: usize) -> Vec<f32> {
    if samples.len() >= min_len || samples.is_empty() {
        return samples.to_vec();
    }
    samples.iter().copied().cycle().take(min_len).collect()
}
