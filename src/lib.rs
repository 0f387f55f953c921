//! Landmark-hash acoustic fingerprinting.
//!
//! Audio is turned into a dB spectrogram, sparse spectral peaks are picked from
//! it, nearby peak pairs are hashed, and query hashes are matched against an
//! indexed database of reference recordings to vote for the source.

/// Spectrogram, peak picking and landmark hashing.
pub mod analysis;
/// Application directory helpers.
pub mod app_dirs;
/// WAV decoding for the command-line front end.
pub mod audio;
/// Fingerprinting parameters and their TOML persistence.
pub mod config;
/// Sorted, range-queryable fingerprint database.
pub mod index;
/// Logging setup.
pub mod logging;
/// Query matching and vote tallying.
pub mod matching;
/// End-to-end fingerprinting and identification services.
pub mod pipeline;
/// SQLite persistence for fingerprint databases.
pub mod store;

pub use analysis::{FingerprintError, HashRecord, Peak, Spectrogram};
pub use config::FingerprintConfig;
pub use index::{DatabaseBuilder, DatabaseRecord, FingerprintDatabase, SourceId};
pub use matching::{MatchOutcome, TimePair, VoteTally};
pub use pipeline::{Fingerprint, Recognizer, ReferenceAudio, build_fingerprint, index_recordings};
