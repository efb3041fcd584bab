use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::audio::centered_frames;

/// Periodic Hann window.
pub fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / length as f32).cos())
        .collect()
}

/// Magnitude spectrogram of shape `[n_fft / 2 + 1, n_frames]`.
///
/// Frames are centred and zero padded, one every `hop_length` samples.
pub fn magnitude_spectrogram(samples: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let window = hann_window(n_fft);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let frames: Vec<Vec<f32>> = centered_frames(samples, n_fft, hop_length).collect();
    let mut spec = Array2::<f32>::zeros((n_bins, frames.len()));

    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
    for (t, frame) in frames.iter().enumerate() {
        for (slot, (&x, &w)) in buffer.iter_mut().zip(frame.iter().zip(window.iter())) {
            *slot = Complex::new(x * w, 0.0);
        }
        fft.process(&mut buffer);
        for k in 0..n_bins {
            spec[[k, t]] = buffer[k].norm();
        }
    }

    spec
}

/// Centre frequency in Hz of each STFT bin.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}
