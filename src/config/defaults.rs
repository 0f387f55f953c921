//! Default parameter values, tuned for 8 kHz mono input.

pub(super) fn default_window_seconds() -> f64 {
    0.008
}

pub(super) fn default_shift_seconds() -> f64 {
    0.004
}

pub(super) fn default_fft_size() -> usize {
    1024
}

pub(super) fn default_coarse_time() -> usize {
    80
}

pub(super) fn default_coarse_freq() -> usize {
    30
}

pub(super) fn default_fine_time() -> usize {
    20
}

pub(super) fn default_fine_freq() -> usize {
    10
}

pub(super) fn default_percentile() -> f64 {
    70.0
}

/// Bins below this carry too many common, low-information peaks.
pub(super) fn default_base_bin() -> usize {
    70
}

pub(super) fn default_high_band_percentile() -> f64 {
    75.0
}

pub(super) fn default_low_band_percentile() -> f64 {
    60.0
}

/// 250 frames at a 4 ms shift is one second.
pub(super) fn default_delay_time() -> u32 {
    250
}

pub(super) fn default_zone_width() -> u32 {
    750
}

/// 128 bins at 7.8 Hz per bin is roughly 1 kHz.
pub(super) fn default_zone_height() -> u32 {
    128
}

pub(super) fn default_freq_tolerance() -> u32 {
    3
}

pub(super) fn default_time_tolerance() -> u32 {
    1
}

pub(super) fn default_max_candidates_per_hash() -> usize {
    4096
}

pub(super) fn default_worker_count() -> u32 {
    0
}

pub(super) fn default_offset_bin() -> u32 {
    1
}

pub(super) const MAX_WORKER_COUNT: u32 = 64;
