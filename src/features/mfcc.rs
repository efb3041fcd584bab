//! Mel-frequency cepstral coefficients.
//!
//! Slaney-style mel filterbank with area normalisation, log power in dB and an
//! orthonormal DCT-II, the conventional speech-analysis recipe.

use ndarray::{Array1, Array2, Axis};

use super::stft::fft_frequencies;

/// Configuration for MFCC computation.
#[derive(Debug, Clone)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub fmin: f32,
    /// Defaults to `sample_rate / 2`.
    pub fmax: Option<f32>,
    /// Dynamic range kept by the dB conversion.
    pub top_db: f32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            n_mels: 128,
            n_mfcc: 20,
            fmin: 0.0,
            fmax: None,
            top_db: 80.0,
        }
    }
}

/// MFCC extractor with precomputed filterbank and DCT basis.
pub struct Mfcc {
    config: MfccConfig,
    mel_basis: Array2<f32>,
    dct_basis: Array2<f32>,
}

impl Mfcc {
    pub fn new(config: MfccConfig) -> Self {
        let fmax = config.fmax.unwrap_or(config.sample_rate as f32 / 2.0);
        let mel_basis = mel_filterbank(
            config.sample_rate,
            config.n_fft,
            config.n_mels,
            config.fmin,
            fmax,
        );
        let dct_basis = dct_ortho(config.n_mfcc, config.n_mels);
        Self {
            config,
            mel_basis,
            dct_basis,
        }
    }

    /// Coefficients of shape `[n_mfcc, n_frames]` from a magnitude spectrogram.
    pub fn compute(&self, magnitudes: &Array2<f32>) -> Array2<f32> {
        let power = magnitudes.mapv(|m| m * m);
        let mel = self.mel_basis.dot(&power);
        let log_mel = power_to_db(&mel, self.config.top_db);
        self.dct_basis.dot(&log_mel)
    }

    /// Per-coefficient mean over all frames.
    pub fn mean(&self, magnitudes: &Array2<f32>) -> Vec<f64> {
        let coefficients = self.compute(magnitudes);
        coefficients
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(self.config.n_mfcc))
            .iter()
            .map(|&c| c as f64)
            .collect()
    }
}

/// `10 * log10(power)` with a 1e-10 floor, clipped to `top_db` below the peak.
fn power_to_db(power: &Array2<f32>, top_db: f32) -> Array2<f32> {
    const AMIN: f32 = 1e-10;
    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10());
    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - top_db;
    db.mapv_inplace(|v| v.max(floor));
    db
}

fn hz_to_mel(hz: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;

    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters of shape `[n_mels, n_fft / 2 + 1]`, each scaled to
/// unit area.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Array2<f32> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, fft_freqs.len()));
    for m in 0..n_mels {
        let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let enorm = 2.0 / (right - left);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            weights[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

/// Orthonormal DCT-II basis of shape `[n_out, n_in]`.
fn dct_ortho(n_out: usize, n_in: usize) -> Array2<f32> {
    let n = n_in as f32;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        };
        scale * (std::f32::consts::PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_scale_round_trips() {
        for hz in [0.0f32, 440.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.5, "{hz} Hz");
        }
    }

    #[test]
    fn dct_basis_is_orthonormal() {
        let basis = dct_ortho(8, 8);
        let gram = basis.dot(&basis.t());
        for i in 0..8 {
            for j in 0..8 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn filterbank_has_expected_shape_and_no_negative_weights() {
        let fb = mel_filterbank(22050, 2048, 128, 0.0, 11025.0);
        assert_eq!(fb.dim(), (128, 1025));
        assert!(fb.iter().all(|&w| w >= 0.0));
        assert!(fb.row(64).iter().any(|&w| w > 0.0));
    }

    #[test]
    fn mean_has_one_value_per_coefficient() {
        let mfcc = Mfcc::new(MfccConfig::default());
        let mags = Array2::<f32>::from_elem((1025, 10), 0.5);
        let mean = mfcc.mean(&mags);
        assert_eq!(mean.len(), 20);
        assert!(mean.iter().all(|c| c.is_finite()));
    }
}
