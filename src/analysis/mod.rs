//! Audio analysis: spectrogram, landmark peaks and landmark hashes.

mod error;
mod fft;
pub mod hashing;
pub mod peaks;
pub mod reduce;
pub mod spectrogram;
mod stats;

pub use error::FingerprintError;
pub use hashing::{HashKey, HashRecord, TargetZone, hash_peaks};
pub use peaks::{Peak, acceptance_threshold, pick_peaks};
pub use reduce::reduce_peaks;
pub use spectrogram::{DB_FLOOR, FrameLayout, Spectrogram, compute_spectrogram};
