#![allow(dead_code)]

pub mod signal;
pub mod wav;

use earmark::FingerprintConfig;

/// Sample rate used by the synthetic fixtures.
pub const SAMPLE_RATE: u32 = 8_000;

/// Parameters scaled down for a few seconds of 8 kHz audio.
///
/// Windows are 256 samples with a 128-sample hop, so one frame is 16 ms and
/// one bin is 31.25 Hz.
pub fn test_config() -> FingerprintConfig {
    let mut config = FingerprintConfig::default();
    config.spectrogram.window_seconds = 0.032;
    config.spectrogram.shift_seconds = 0.016;
    config.spectrogram.fft_size = 256;
    config.peaks.coarse_time = 4;
    config.peaks.coarse_freq = 8;
    config.peaks.fine_time = 2;
    config.peaks.fine_freq = 4;
    config.peaks.percentile = 97.0;
    config.peaks.base_bin = 4;
    config.peaks.high_band_percentile = 10.0;
    config.peaks.low_band_percentile = 10.0;
    config.hashing.delay_time = 2;
    config.hashing.zone_width = 30;
    config.hashing.zone_height = 24;
    config
}

/// Samples covered by `frames` analysis hops of [`test_config`].
pub fn frames_to_samples(frames: usize) -> usize {
    frames * 128
}
