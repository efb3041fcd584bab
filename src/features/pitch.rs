use crate::audio::centered_frames;

/// Parameters for the YIN fundamental-frequency estimator.
#[derive(Debug, Clone)]
pub struct YinConfig {
    pub fmin: f32,
    pub fmax: f32,
    pub frame_length: usize,
    /// Integration window, must be shorter than `frame_length`.
    pub win_length: usize,
    pub hop_length: usize,
    /// Troughs of the normalised difference below this value are accepted as periods.
    pub trough_threshold: f32,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            fmin: 50.0,
            fmax: 400.0,
            frame_length: 2048,
            win_length: 1024,
            hop_length: 512,
            trough_threshold: 0.1,
        }
    }
}

/// Per-frame fundamental frequency estimates (Hz) using YIN.
pub fn yin(samples: &[f32], sample_rate: u32, config: &YinConfig) -> Vec<f32> {
    let sr = sample_rate as f32;
    let min_period = ((sr / config.fmax).floor() as usize).max(1);
    let max_period = ((sr / config.fmin).ceil() as usize)
        .min(config.frame_length.saturating_sub(config.win_length + 1));
    if min_period >= max_period {
        return Vec::new();
    }

    centered_frames(samples, config.frame_length, config.hop_length)
        .map(|frame| {
            let cmnd = cumulative_mean_normalized_difference(
                &frame,
                config.win_length,
                min_period,
                max_period,
            );
            let (index, shift) = pick_period(&cmnd, config.trough_threshold);
            sr / (min_period as f32 + index as f32 + shift)
        })
        .collect()
}

/// Mean of [`yin`] over all frames, 0.0 when no frame could be analysed.
pub fn mean_fundamental_frequency(samples: &[f32], sample_rate: u32, config: &YinConfig) -> f64 {
    let f0 = yin(samples, sample_rate, config);
    if f0.is_empty() {
        return 0.0;
    }
    f0.iter().map(|&f| f as f64).sum::<f64>() / f0.len() as f64
}

/// Normalised difference for lags `min_period..=max_period`.
fn cumulative_mean_normalized_difference(
    frame: &[f32],
    win_length: usize,
    min_period: usize,
    max_period: usize,
) -> Vec<f32> {
    let difference: Vec<f32> = (0..=max_period)
        .map(|tau| {
            frame[..win_length]
                .iter()
                .zip(&frame[tau..tau + win_length])
                .map(|(a, b)| (a - b) * (a - b))
                .sum()
        })
        .collect();

    let mut cumulative = 0.0f32;
    let mut normalized = Vec::with_capacity(max_period - min_period + 1);
    for (tau, &d) in difference.iter().enumerate().skip(1) {
        cumulative += d;
        if tau >= min_period {
            let mean = cumulative / tau as f32;
            normalized.push(d / (mean + f32::MIN_POSITIVE));
        }
    }
    normalized
}

/// First trough under `threshold`, else the global minimum, with its
/// parabolic sub-sample shift.
fn pick_period(cmnd: &[f32], threshold: f32) -> (usize, f32) {
    let is_trough = |i: usize| -> bool {
        match i {
            0 => cmnd.len() > 1 && cmnd[0] < cmnd[1],
            _ if i + 1 == cmnd.len() => cmnd[i - 1] > cmnd[i],
            _ => cmnd[i - 1] > cmnd[i] && cmnd[i] <= cmnd[i + 1],
        }
    };

    let index = (0..cmnd.len())
        .find(|&i| is_trough(i) && cmnd[i] < threshold)
        .unwrap_or_else(|| {
            cmnd.iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0)
        });

    (index, parabolic_shift(cmnd, index))
}

fn parabolic_shift(values: &[f32], i: usize) -> f32 {
    if i == 0 || i + 1 >= values.len() {
        return 0.0;
    }
    let a = values[i + 1] + values[i - 1] - 2.0 * values[i];
    let b = (values[i + 1] - values[i - 1]) / 2.0;
    if b.abs() >= a.abs() {
        0.0
    } else {
        -b / a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn estimates_pitch_of_pure_tone() {
        let sr = 22050;
        let samples = sine(220.0, sr, 0.5);
        let f0 = yin(&samples, sr, &YinConfig::default());
        // Skip edge frames, which see zero padding.
        let middle = &f0[4..f0.len() - 4];
        for &f in middle {
            assert!((f - 220.0).abs() < 2.0, "estimated {f} Hz");
        }
    }

    #[test]
    fn mean_is_within_search_range() {
        let sr = 22050;
        let samples = sine(150.0, sr, 0.5);
        let mean = mean_fundamental_frequency(&samples, sr, &YinConfig::default());
        assert!((50.0..=410.0).contains(&mean), "mean {mean}");
    }

    #[test]
    fn parabolic_shift_is_zero_at_edges() {
        assert_eq!(parabolic_shift(&[1.0, 0.5, 1.0], 0), 0.0);
        assert_eq!(parabolic_shift(&[1.0, 0.5, 1.0], 1), 0.0);
    }
}
