use super::Peak;
use super::stats::percentile;

/// Thin peaks separately in the low and high halves of the spectrum.
///
/// A peak is in the high band when its bin lies above `fft_size / 4`. Each band
/// keeps only peaks whose amplitude strictly exceeds that band's own amplitude
/// percentile. Input order is preserved. A band with no members contributes no
/// peaks.
pub fn reduce_peaks(
    peaks: &[Peak],
    fft_size: usize,
    high_percentile: f64,
    low_percentile: f64,
) -> Vec<Peak> {
    let is_high = |peak: &Peak| 4 * peak.freq as usize > fft_size;
    let high_cutoff = percentile(
        peaks.iter().filter(|p| is_high(p)).map(|p| p.amplitude),
        high_percentile,
    );
    let low_cutoff = percentile(
        peaks.iter().filter(|p| !is_high(p)).map(|p| p.amplitude),
        low_percentile,
    );
    peaks
        .iter()
        .filter(|peak| {
            let cutoff = if is_high(peak) { high_cutoff } else { low_cutoff };
            cutoff.is_some_and(|cutoff| peak.amplitude > cutoff)
        })
        .copied()
        .collect()
}
