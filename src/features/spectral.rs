use ndarray::{Array2, Axis};

/// Mean over frames of the magnitude-weighted mean frequency.
///
/// Frames with no energy contribute a centroid of 0.
pub fn mean_spectral_centroid(magnitudes: &Array2<f32>, freqs: &[f32]) -> f64 {
    mean_over_frames(magnitudes, |column| {
        let total: f64 = column.iter().map(|&m| m as f64).sum();
        if total <= f64::MIN_POSITIVE {
            return 0.0;
        }
        column
            .iter()
            .zip(freqs)
            .map(|(&m, &f)| m as f64 * f as f64)
            .sum::<f64>()
            / total
    })
}

/// Mean over frames of the lowest frequency below which `roll_percent` of the
/// frame's spectral magnitude lies.
pub fn mean_spectral_rolloff(magnitudes: &Array2<f32>, freqs: &[f32], roll_percent: f64) -> f64 {
    mean_over_frames(magnitudes, |column| {
        let total: f64 = column.iter().map(|&m| m as f64).sum();
        let threshold = roll_percent * total;

        let mut cumulative = 0.0f64;
        for (&m, &f) in column.iter().zip(freqs) {
            cumulative += m as f64;
            if cumulative >= threshold {
                return f as f64;
            }
        }
        freqs.last().copied().unwrap_or(0.0) as f64
    })
}

fn mean_over_frames<F>(magnitudes: &Array2<f32>, per_frame: F) -> f64
where
    F: Fn(ndarray::ArrayView1<'_, f32>) -> f64,
{
    let n_frames = magnitudes.ncols();
    if n_frames == 0 {
        return 0.0;
    }
    magnitudes
        .axis_iter(Axis(1))
        .map(per_frame)
        .sum::<f64>()
        / n_frames as f64
}
