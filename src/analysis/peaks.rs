//! Landmark selection on a dB spectrogram.
//!
//! A coarse pass tiles the usable plane and keeps each tile's maximum when it
//! clears a global percentile threshold; a fine pass then drops candidates that
//! are not the maximum of their own neighbourhood.

use serde::{Deserialize, Serialize};

use crate::config::PeakConfig;

use super::Spectrogram;
use super::stats::percentile;

/// One spectral landmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Frame index.
    pub time: u32,
    /// Frequency bin index.
    pub freq: u32,
    /// Magnitude in dB.
    pub amplitude: f32,
}

/// Percentile of all values at bins `>= base_bin`.
///
/// Returns `None` when the base bin leaves no usable values.
pub fn acceptance_threshold(spec: &Spectrogram, base_bin: usize, percent: f64) -> Option<f32> {
    if base_bin >= spec.num_bins() {
        return None;
    }
    percentile(
        spec.frames().flat_map(|frame| frame[base_bin..].iter().copied()),
        percent,
    )
}

/// Pick landmark peaks from `spec`.
pub fn pick_peaks(spec: &Spectrogram, params: &PeakConfig) -> Vec<Peak> {
    let Some(threshold) = acceptance_threshold(spec, params.base_bin, params.percentile) else {
        return Vec::new();
    };
    coarse_candidates(spec, params, threshold)
        .into_iter()
        .filter(|&(time, freq)| is_local_maximum(spec, params, time, freq))
        .map(|(time, freq)| Peak {
            time: time as u32,
            freq: freq as u32,
            amplitude: spec.get(time, freq),
        })
        .collect()
}

fn coarse_candidates(spec: &Spectrogram, params: &PeakConfig, threshold: f32) -> Vec<(usize, usize)> {
    let frames = spec.num_frames();
    let bins = spec.num_bins();
    let mut candidates = Vec::new();
    for t0 in (0..frames).step_by(params.coarse_time) {
        let t1 = (t0 + params.coarse_time).min(frames);
        for f0 in (params.base_bin..bins).step_by(params.coarse_freq) {
            let f1 = (f0 + params.coarse_freq).min(bins);
            if let Some((time, freq, value)) = block_argmax(spec, t0..t1, f0..f1) {
                if value >= threshold {
                    candidates.push((time, freq));
                }
            }
        }
    }
    candidates
}

/// First maximum in row-major order.
fn block_argmax(
    spec: &Spectrogram,
    times: std::ops::Range<usize>,
    freqs: std::ops::Range<usize>,
) -> Option<(usize, usize, f32)> {
    let mut best: Option<(usize, usize, f32)> = None;
    for time in times {
        let frame = spec.frame(time);
        for freq in freqs.clone() {
            let value = frame[freq];
            if best.is_none_or(|(_, _, current)| value > current) {
                best = Some((time, freq, value));
            }
        }
    }
    best
}

fn is_local_maximum(spec: &Spectrogram, params: &PeakConfig, time: usize, freq: usize) -> bool {
    let value = spec.get(time, freq);
    let t0 = time.saturating_sub(params.fine_time);
    let t1 = (time + params.fine_time).min(spec.num_frames());
    let f0 = freq.saturating_sub(params.fine_freq).max(params.base_bin);
    let f1 = (freq + params.fine_freq).min(spec.num_bins());
    if f0 >= f1 {
        return true;
    }
    !(t0..t1).any(|t| spec.frame(t)[f0..f1].iter().any(|&other| other > value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectrogram::DB_FLOOR;

    fn params() -> PeakConfig {
        PeakConfig {
            coarse_time: 4,
            coarse_freq: 4,
            fine_time: 2,
            fine_freq: 2,
            percentile: 50.0,
            base_bin: 0,
            high_band_percentile: 0.0,
            low_band_percentile: 0.0,
        }
    }

    fn spectrogram_with(frames: usize, bins: usize, spikes: &[(usize, usize, f32)]) -> Spectrogram {
        let mut rows = vec![vec![DB_FLOOR; bins]; frames];
        for &(t, f, v) in spikes {
            rows[t][f] = v;
        }
        Spectrogram::from_frames(rows).unwrap()
    }

    /// Percentile placing the threshold halfway between the floor and the
    /// weakest of `spikes` out of `values` cells.
    fn midway_percentile(values: usize, spikes: usize) -> f64 {
        100.0 * ((values - spikes) as f64 - 0.5) / (values - 1) as f64
    }

    fn coords(peaks: &[Peak]) -> Vec<(u32, u32)> {
        let mut coords: Vec<_> = peaks.iter().map(|p| (p.time, p.freq)).collect();
        coords.sort_unstable();
        coords
    }

    #[test]
    fn isolated_spikes_are_picked() {
        let spec = spectrogram_with(8, 8, &[(1, 1, 10.0), (6, 5, 20.0)]);
        let mut params = params();
        params.percentile = midway_percentile(64, 2);
        let peaks = pick_peaks(&spec, &params);
        assert_eq!(coords(&peaks), vec![(1, 1), (6, 5)]);
        assert!(peaks.iter().any(|p| p.amplitude == 20.0));
    }

    #[test]
    fn weaker_neighbour_across_block_edge_is_dropped() {
        // Both blocks have a maximum, but (3, 3) sits next to the stronger (4, 4).
        let spec = spectrogram_with(8, 8, &[(3, 3, 5.0), (4, 4, 9.0)]);
        let mut params = params();
        params.percentile = midway_percentile(64, 2);
        let peaks = pick_peaks(&spec, &params);
        assert_eq!(coords(&peaks), vec![(4, 4)]);
    }

    #[test]
    fn threshold_at_maximum_keeps_single_block() {
        let spec = spectrogram_with(8, 8, &[(2, 2, 1.0)]);
        let mut params = params();
        params.percentile = 100.0;
        // Threshold equals the spike, so flat blocks at the floor fall below it.
        let peaks = pick_peaks(&spec, &params);
        assert_eq!(coords(&peaks), vec![(2, 2)]);
    }

    #[test]
    fn base_bin_excludes_low_frequencies() {
        let spec = spectrogram_with(8, 8, &[(1, 1, 50.0), (5, 6, 10.0)]);
        let mut params = params();
        params.base_bin = 4;
        params.percentile = midway_percentile(32, 1);
        let peaks = pick_peaks(&spec, &params);
        assert_eq!(coords(&peaks), vec![(5, 6)]);
    }

    #[test]
    fn base_bin_past_last_bin_yields_no_peaks() {
        let spec = spectrogram_with(4, 4, &[(1, 1, 3.0)]);
        let mut params = params();
        params.base_bin = 4;
        assert!(pick_peaks(&spec, &params).is_empty());
        assert_eq!(acceptance_threshold(&spec, 4, 50.0), None);
    }

    #[test]
    fn ties_keep_first_in_scan_order() {
        let spec = spectrogram_with(4, 4, &[(1, 2, 7.0), (2, 1, 7.0)]);
        let mut params = params();
        params.percentile = midway_percentile(16, 2);
        let peaks = pick_peaks(&spec, &params);
        // Equal neighbours do not veto each other; only the block's first argmax is a candidate.
        assert_eq!(coords(&peaks), vec![(1, 2)]);
    }

    #[test]
    fn picking_is_stable_on_its_own_output() {
        let spikes = [(2, 3, 12.0), (9, 10, 30.0), (14, 2, 18.0), (5, 13, 25.0)];
        let spec = spectrogram_with(16, 16, &spikes);
        let mut params = params();
        params.percentile = midway_percentile(256, 4);
        let first = pick_peaks(&spec, &params);
        let rebuilt: Vec<_> = first
            .iter()
            .map(|p| (p.time as usize, p.freq as usize, p.amplitude))
            .collect();
        let second = pick_peaks(&spectrogram_with(16, 16, &rebuilt), &params);
        assert_eq!(first, second);
        assert_eq!(first, pick_peaks(&spec, &params));
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn threshold_uses_only_usable_bins() {
        let spec = Spectrogram::from_frames(vec![vec![100.0, 1.0, 2.0], vec![100.0, 3.0, 4.0]]).unwrap();
        assert_eq!(acceptance_threshold(&spec, 1, 100.0), Some(4.0));
        assert_eq!(acceptance_threshold(&spec, 1, 0.0), Some(1.0));
    }
}
