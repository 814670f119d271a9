//! Sample buffer measurements

/// Peak absolute amplitude below which a buffer counts as silence
pub const DEFAULT_SILENCE_FLOOR: f32 = 0.01;

/// Peak amplitude buffers are scaled to before transcription
pub const DEFAULT_NORMALIZE_CEILING: f32 = 0.95;

/// Largest absolute sample value
#[must_use]
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Root-mean-square energy of the buffer
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Whether the buffer is too quiet to contain speech
#[must_use]
pub fn is_silent(samples: &[f32], floor: f32) -> bool {
    peak(samples) < floor
}

/// Scale the buffer in place so its peak equals `ceiling`
///
/// A buffer of zeros is left untouched.
pub fn normalize_peak(samples: &mut [f32], ceiling: f32) {
    let peak = peak(samples);
    if peak <= 0.0 {
        return;
    }

    let gain = ceiling / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}
