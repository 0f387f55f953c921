//! Fingerprinting parameters.
//!
//! Every stage of the pipeline reads its knobs from [`FingerprintConfig`]; none
//! are hard-coded. The structure round-trips through TOML with missing keys
//! falling back to defaults, and [`FingerprintConfig::validate`] rejects bad
//! values before any audio is touched.

mod defaults;
mod errors;
mod io;

use serde::{Deserialize, Serialize};

use defaults::*;
pub use errors::ConfigError;
pub use io::{CONFIG_FILE_NAME, config_path, load, load_or_default, save};

/// Complete fingerprinting configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub spectrogram: SpectrogramConfig,
    pub peaks: PeakConfig,
    pub hashing: HashingConfig,
    pub matching: MatchingConfig,
}

/// Short-time transform parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    /// Analysis window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    /// Hop between successive windows in seconds.
    #[serde(default = "default_shift_seconds")]
    pub shift_seconds: f64,
    /// Transform length; windows are zero-padded or truncated to it.
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            shift_seconds: default_shift_seconds(),
            fft_size: default_fft_size(),
        }
    }
}

/// Two-pass peak picking and per-band reduction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakConfig {
    /// Coarse block height in frames.
    #[serde(default = "default_coarse_time")]
    pub coarse_time: usize,
    /// Coarse block width in bins.
    #[serde(default = "default_coarse_freq")]
    pub coarse_freq: usize,
    /// Half-width of the confirmation window in frames.
    #[serde(default = "default_fine_time")]
    pub fine_time: usize,
    /// Half-width of the confirmation window in bins.
    #[serde(default = "default_fine_freq")]
    pub fine_freq: usize,
    /// Percentile (0..=100) of the usable spectrogram used as the acceptance threshold.
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// Lowest frequency bin considered.
    #[serde(default = "default_base_bin")]
    pub base_bin: usize,
    /// Amplitude percentile a high-band peak must exceed to survive reduction.
    #[serde(default = "default_high_band_percentile")]
    pub high_band_percentile: f64,
    /// Amplitude percentile a low-band peak must exceed to survive reduction.
    #[serde(default = "default_low_band_percentile")]
    pub low_band_percentile: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            coarse_time: default_coarse_time(),
            coarse_freq: default_coarse_freq(),
            fine_time: default_fine_time(),
            fine_freq: default_fine_freq(),
            percentile: default_percentile(),
            base_bin: default_base_bin(),
            high_band_percentile: default_high_band_percentile(),
            low_band_percentile: default_low_band_percentile(),
        }
    }
}

/// Target zone geometry, in frames and bins relative to the anchor peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Frames skipped after the anchor before the zone opens.
    #[serde(default = "default_delay_time")]
    pub delay_time: u32,
    /// Zone length in frames.
    #[serde(default = "default_zone_width")]
    pub zone_width: u32,
    /// Zone height in bins, centred on the anchor frequency.
    #[serde(default = "default_zone_height")]
    pub zone_height: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            delay_time: default_delay_time(),
            zone_width: default_zone_width(),
            zone_height: default_zone_height(),
        }
    }
}

/// How the winning recording is chosen from the matched time pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Arg-max of the raw per-recording match count.
    #[default]
    RawVotes,
    /// Arg-max of the largest group of matches sharing one time offset.
    OffsetAligned,
}

/// Query-side tolerances and execution knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Inclusive tolerance applied to both frequency fields.
    #[serde(default = "default_freq_tolerance")]
    pub freq_tolerance: u32,
    /// Inclusive tolerance applied to the time delta.
    #[serde(default = "default_time_tolerance")]
    pub time_tolerance: u32,
    /// Cap on database records visited per query hash (0 = unbounded).
    #[serde(default = "default_max_candidates_per_hash")]
    pub max_candidates_per_hash: usize,
    /// Worker count override for indexing and lookups (0 = auto).
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,
    /// Winner selection policy.
    #[serde(default)]
    pub policy: MatchPolicy,
    /// Offset histogram bin width in frames for [`MatchPolicy::OffsetAligned`].
    #[serde(default = "default_offset_bin")]
    pub offset_bin: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            freq_tolerance: default_freq_tolerance(),
            time_tolerance: default_time_tolerance(),
            max_candidates_per_hash: default_max_candidates_per_hash(),
            worker_count: default_worker_count(),
            policy: MatchPolicy::default(),
            offset_bin: default_offset_bin(),
        }
    }
}

impl FingerprintConfig {
    /// Check every parameter, naming the first offending one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spectrogram.validate()?;
        self.peaks.validate()?;
        self.hashing.validate()?;
        self.matching.validate()
    }

    /// True when both configs produce identical peaks and hashes for the same audio.
    ///
    /// Matching knobs are query-time only and are ignored.
    pub fn same_analysis(&self, other: &FingerprintConfig) -> bool {
        self.spectrogram == other.spectrogram
            && self.peaks == other.peaks
            && self.hashing == other.hashing
    }
}

impl SpectrogramConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive_seconds("spectrogram.window_seconds", self.window_seconds)?;
        require_positive_seconds("spectrogram.shift_seconds", self.shift_seconds)?;
        if self.fft_size < 2 {
            return Err(ConfigError::invalid(
                "spectrogram.fft_size",
                format!("must be at least 2, got {}", self.fft_size),
            ));
        }
        Ok(())
    }
}

impl PeakConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero("peaks.coarse_time", self.coarse_time)?;
        require_nonzero("peaks.coarse_freq", self.coarse_freq)?;
        require_nonzero("peaks.fine_time", self.fine_time)?;
        require_nonzero("peaks.fine_freq", self.fine_freq)?;
        require_percentile("peaks.percentile", self.percentile)?;
        require_percentile("peaks.high_band_percentile", self.high_band_percentile)?;
        require_percentile("peaks.low_band_percentile", self.low_band_percentile)
    }
}

impl HashingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero("hashing.zone_width", self.zone_width as usize)?;
        require_nonzero("hashing.zone_height", self.zone_height as usize)
    }
}

impl MatchingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero("matching.offset_bin", self.offset_bin as usize)?;
        if self.worker_count > MAX_WORKER_COUNT {
            return Err(ConfigError::invalid(
                "matching.worker_count",
                format!("must be at most {MAX_WORKER_COUNT}, got {}", self.worker_count),
            ));
        }
        Ok(())
    }
}

fn require_positive_seconds(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            name,
            format!("must be a positive duration, got {value}"),
        ))
    }
}

fn require_nonzero(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::invalid(name, "must be greater than zero"))
    } else {
        Ok(())
    }
}

fn require_percentile(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            name,
            format!("must lie in 0..=100, got {value}"),
        ))
    }
}
