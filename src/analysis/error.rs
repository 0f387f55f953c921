use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while fingerprinting audio.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Audio is empty or too short to produce a single analysis frame.
    #[error(
        "Audio too short: {samples} samples cannot fill a {window_samples}-sample window \
         advanced by {shift_samples} samples"
    )]
    InvalidAudioInput {
        samples: usize,
        window_samples: usize,
        shift_samples: usize,
    },
    /// Sample rate of zero.
    #[error("Invalid sample rate {0} Hz")]
    InvalidSampleRate(u32),
    /// Parameter validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A reference recording failed while building a database.
    #[error("Failed to fingerprint recording {name}: {source}")]
    Recording {
        name: String,
        #[source]
        source: Box<FingerprintError>,
    },
}
