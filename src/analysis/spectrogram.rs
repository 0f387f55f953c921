//! Short-time magnitude spectrogram in decibels.

use crate::config::{ConfigError, SpectrogramConfig};

use super::FingerprintError;
use super::fft::{RealSpectrum, hamming_window};

/// Value written for bins whose magnitude is zero (or below the floor).
pub const DB_FLOOR: f32 = -300.0;

/// Time x frequency matrix of dB magnitudes, stored frame-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    frames: usize,
    bins: usize,
    values: Vec<f32>,
}

impl Spectrogram {
    /// Build a spectrogram from equally sized frames.
    ///
    /// Returns `None` when the frames disagree in length.
    pub fn from_frames(frames: Vec<Vec<f32>>) -> Option<Self> {
        let bins = frames.first().map(Vec::len).unwrap_or(0);
        if frames.iter().any(|frame| frame.len() != bins) {
            return None;
        }
        let count = frames.len();
        Some(Self {
            frames: count,
            bins,
            values: frames.into_iter().flatten().collect(),
        })
    }

    pub fn num_frames(&self) -> usize {
        self.frames
    }

    pub fn num_bins(&self) -> usize {
        self.bins
    }

    /// Magnitude at frame `time`, bin `freq`.
    ///
    /// Panics when out of bounds.
    pub fn get(&self, time: usize, freq: usize) -> f32 {
        self.values[time * self.bins + freq]
    }

    pub fn frame(&self, time: usize) -> &[f32] {
        &self.values[time * self.bins..(time + 1) * self.bins]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks(self.bins.max(1))
    }
}

/// Window and hop sizes in samples for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub window_samples: usize,
    pub shift_samples: usize,
    pub frames: usize,
}

impl FrameLayout {
    /// Resolve sample counts for `num_samples` of audio at `sample_rate`.
    ///
    /// Frame count is `floor((num_samples - window) / shift)`; audio yielding
    /// no frame at all is rejected.
    pub fn resolve(
        num_samples: usize,
        sample_rate: u32,
        params: &SpectrogramConfig,
    ) -> Result<Self, FingerprintError> {
        if sample_rate == 0 {
            return Err(FingerprintError::InvalidSampleRate(sample_rate));
        }
        let window_samples = seconds_to_samples(
            "spectrogram.window_seconds",
            params.window_seconds,
            sample_rate,
        )?;
        let shift_samples = seconds_to_samples(
            "spectrogram.shift_seconds",
            params.shift_seconds,
            sample_rate,
        )?;
        let frames = num_samples
            .checked_sub(window_samples)
            .map(|span| span / shift_samples)
            .unwrap_or(0);
        if frames == 0 {
            return Err(FingerprintError::InvalidAudioInput {
                samples: num_samples,
                window_samples,
                shift_samples,
            });
        }
        Ok(Self {
            window_samples,
            shift_samples,
            frames,
        })
    }
}

fn seconds_to_samples(
    name: &'static str,
    seconds: f64,
    sample_rate: u32,
) -> Result<usize, ConfigError> {
    let samples = (seconds * sample_rate as f64).round();
    if !samples.is_finite() || samples < 1.0 {
        return Err(ConfigError::invalid(
            name,
            format!("{seconds} s rounds to zero samples at {sample_rate} Hz"),
        ));
    }
    Ok(samples as usize)
}

/// Compute the Hamming-windowed dB magnitude spectrogram of `samples`.
pub fn compute_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    params: &SpectrogramConfig,
) -> Result<Spectrogram, FingerprintError> {
    let layout = FrameLayout::resolve(samples.len(), sample_rate, params)?;
    let window = hamming_window(layout.window_samples);
    let mut spectrum = RealSpectrum::new(params.fft_size);
    let bins = spectrum.bins();
    let mut values = vec![0.0_f32; layout.frames * bins];
    for (frame, out) in values.chunks_mut(bins).enumerate() {
        let start = frame * layout.shift_samples;
        let segment = &samples[start..start + layout.window_samples];
        spectrum.magnitudes_into(segment, &window, out);
        for value in out.iter_mut() {
            *value = to_decibels(*value);
        }
    }
    Ok(Spectrogram {
        frames: layout.frames,
        bins,
        values,
    })
}

/// `20 * log10(magnitude)`, clamped to [`DB_FLOOR`].
pub fn to_decibels(magnitude: f32) -> f32 {
    if magnitude > 0.0 {
        (20.0 * magnitude.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SpectrogramConfig {
        SpectrogramConfig {
            window_seconds: 0.008,
            shift_seconds: 0.004,
            fft_size: 128,
        }
    }

    fn sine(freq_hz: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn frame_count_follows_floor_formula() {
        let samples = vec![0.1_f32; 1000];
        let spec = compute_spectrogram(&samples, 8_000, &params()).unwrap();
        // window 64, shift 32: floor((1000 - 64) / 32) = 29
        assert_eq!(spec.num_frames(), 29);
        assert_eq!(spec.num_bins(), 65);
        assert!(spec.frames().all(|frame| frame.len() == 65));
    }

    #[test]
    fn audio_shorter_than_window_is_rejected() {
        let err = compute_spectrogram(&[0.5; 40], 8_000, &params()).unwrap_err();
        assert!(matches!(
            err,
            FingerprintError::InvalidAudioInput {
                samples: 40,
                window_samples: 64,
                ..
            }
        ));
    }

    #[test]
    fn empty_audio_is_rejected() {
        let err = compute_spectrogram(&[], 8_000, &params()).unwrap_err();
        assert!(matches!(err, FingerprintError::InvalidAudioInput { samples: 0, .. }));
    }

    #[test]
    fn window_rounding_to_zero_names_parameter() {
        let mut params = params();
        params.window_seconds = 0.00001;
        let err = compute_spectrogram(&[0.0; 100], 8_000, &params).unwrap_err();
        assert!(matches!(
            err,
            FingerprintError::Config(ConfigError::InvalidParameter {
                name: "spectrogram.window_seconds",
                ..
            })
        ));
    }

    #[test]
    fn silence_maps_to_floor_not_nan() {
        let spec = compute_spectrogram(&[0.0; 256], 8_000, &params()).unwrap();
        assert!(spec.frames().flatten().all(|v| *v == DB_FLOOR));
    }

    #[test]
    fn sine_peaks_at_expected_bin() {
        let sr = 8_000;
        let mut params = params();
        params.window_seconds = 0.032;
        params.shift_seconds = 0.016;
        params.fft_size = 256;
        // 1 kHz at 31.25 Hz per bin is bin 32
        let spec = compute_spectrogram(&sine(1_000.0, sr, 4_000), sr, &params).unwrap();
        let frame = spec.frame(3);
        let (best, _) = frame
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(best, 32);
    }

    #[test]
    fn from_frames_rejects_ragged_rows() {
        assert!(Spectrogram::from_frames(vec![vec![0.0; 3], vec![0.0; 2]]).is_none());
        let spec = Spectrogram::from_frames(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(spec.get(1, 0), 3.0);
    }
}
