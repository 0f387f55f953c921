use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Symmetric Hamming window of `length` taps.
pub(crate) fn hamming_window(length: usize) -> Vec<f32> {
    if length <= 1 {
        return vec![1.0_f32; length];
    }
    let denom = (length - 1) as f32;
    (0..length)
        .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f32 / denom).cos())
        .collect()
}

/// Planned forward transform for real input of a fixed size.
///
/// Input longer than the transform size is truncated, shorter input is
/// zero-padded. Only the `size / 2 + 1` non-negative frequency bins are kept.
pub(crate) struct RealSpectrum {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl RealSpectrum {
    pub(crate) fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex32::default(); fft.get_inplace_scratch_len()];
        Self {
            size,
            fft,
            buffer: vec![Complex32::default(); size],
            scratch,
        }
    }

    pub(crate) fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Write `|FFT(segment * window)|` for each kept bin into `out`.
    pub(crate) fn magnitudes_into(&mut self, segment: &[f32], window: &[f32], out: &mut [f32]) {
        for (i, cell) in self.buffer.iter_mut().enumerate() {
            let sample = segment.get(i).copied().unwrap_or(0.0);
            let weight = window.get(i).copied().unwrap_or(0.0);
            *cell = Complex32::new(sanitize(sample) * weight, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        for (dst, bin) in out.iter_mut().zip(self.buffer.iter()) {
            *dst = bin.norm();
        }
    }
}

fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_window_is_symmetric_with_raised_edges() {
        let w = hamming_window(9);
        assert!((w[0] - 0.08).abs() < 1e-6);
        assert!((w[8] - 0.08).abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[2] - w[6]).abs() < 1e-6);
    }

    #[test]
    fn constant_signal_lands_in_dc_bin() {
        let mut spectrum = RealSpectrum::new(8);
        let mut out = vec![0.0; spectrum.bins()];
        spectrum.magnitudes_into(&[1.0; 8], &[1.0; 8], &mut out);
        assert_eq!(out.len(), 5);
        assert!((out[0] - 8.0).abs() < 1e-4);
        for bin in &out[1..] {
            assert!(bin.abs() < 1e-4);
        }
    }

    #[test]
    fn short_segments_are_zero_padded() {
        let mut spectrum = RealSpectrum::new(16);
        let mut out = vec![0.0; spectrum.bins()];
        spectrum.magnitudes_into(&[1.0; 4], &[1.0; 4], &mut out);
        assert!((out[0] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn long_segments_are_truncated() {
        let mut spectrum = RealSpectrum::new(4);
        let mut out = vec![0.0; spectrum.bins()];
        spectrum.magnitudes_into(&[1.0; 10], &[1.0; 10], &mut out);
        assert!((out[0] - 4.0).abs() < 1e-4);
    }
}
