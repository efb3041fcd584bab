use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

use super::{AudioBuffer, AudioError};

const CHUNK_SIZE: usize = 1024;

/// Resample a buffer to `target_rate` with a sinc interpolator.
///
/// The output holds exactly `ceil(len * target_rate / sample_rate)` samples.
pub fn resample(audio: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, AudioError> {
    if target_rate == 0 {
        return Err(AudioError::InvalidSampleRate(target_rate));
    }
    if audio.sample_rate == target_rate || audio.is_empty() {
        return Ok(AudioBuffer::new(audio.samples.clone(), target_rate));
    }

    let ratio = target_rate as f64 / audio.sample_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let expected = (audio.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(expected + CHUNK_SIZE);

    // Feed zero-padded chunks until the tail has been flushed out of the filter.
    let mut pos = 0;
    while output.len() < expected {
        let end = (pos + CHUNK_SIZE).min(audio.len());
        let mut chunk = if pos < audio.len() {
            audio.samples[pos..end].to_vec()
        } else {
            Vec::new()
        };
        chunk.resize(CHUNK_SIZE, 0.0);
        let input = vec![chunk];

        let result = resampler
            .process(&input, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
        pos += CHUNK_SIZE;
    }

    output.truncate(expected);
    Ok(AudioBuffer::new(output, target_rate))
}
