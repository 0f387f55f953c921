//! End-to-end fingerprinting, database construction and identification.

use std::collections::VecDeque;
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::analysis::{
    FingerprintError, HashRecord, Peak, Spectrogram, compute_spectrogram, hash_peaks,
    pick_peaks, reduce_peaks,
};
use crate::config::FingerprintConfig;
use crate::index::{DatabaseBuilder, FingerprintDatabase, SourceId};
use crate::matching::{self, MatchOutcome};

/// Peaks and hashes derived from one piece of audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    /// Spectrogram frames analysed.
    pub frames: usize,
    /// Frequency bins per frame.
    pub bins: usize,
    /// Peaks that survived picking and reduction.
    pub peaks: Vec<Peak>,
    /// Hash records, sorted.
    pub hashes: Vec<HashRecord>,
}

/// Fingerprint mono `samples` recorded at `sample_rate`.
///
/// Parameters are validated first; audio too short for one frame is rejected.
pub fn build_fingerprint(
    samples: &[f32],
    sample_rate: u32,
    config: &FingerprintConfig,
) -> Result<Fingerprint, FingerprintError> {
    config.validate()?;
    let spectrogram = compute_spectrogram(samples, sample_rate, &config.spectrogram)?;
    Ok(fingerprint_spectrogram(&spectrogram, config))
}

/// Peak picking, reduction and hashing on an existing spectrogram.
pub fn fingerprint_spectrogram(spectrogram: &Spectrogram, config: &FingerprintConfig) -> Fingerprint {
    let picked = pick_peaks(spectrogram, &config.peaks);
    let peaks = reduce_peaks(
        &picked,
        config.spectrogram.fft_size,
        config.peaks.high_band_percentile,
        config.peaks.low_band_percentile,
    );
    let hashes = hash_peaks(&peaks, &config.hashing);
    debug!(
        "Spectrogram {}x{}: {} peaks picked, {} after reduction, {} hashes",
        spectrogram.num_frames(),
        spectrogram.num_bins(),
        picked.len(),
        peaks.len(),
        hashes.len()
    );
    if peaks.is_empty() {
        warn!("No peaks survived picking; fingerprint is empty");
    }
    Fingerprint {
        frames: spectrogram.num_frames(),
        bins: spectrogram.num_bins(),
        peaks,
        hashes,
    }
}

/// A reference recording awaiting indexing.
#[derive(Debug, Clone)]
pub struct ReferenceAudio {
    pub source_id: SourceId,
    pub name: String,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

struct IndexedRecording {
    order: usize,
    source_id: SourceId,
    name: String,
    result: Result<Vec<HashRecord>, FingerprintError>,
}

/// Fingerprint `recordings` on a worker pool and build a database from them.
///
/// All workers finish before any record is merged. Recordings are registered
/// in input order, and the first failing recording (in input order) fails the
/// whole build.
pub fn index_recordings(
    recordings: Vec<ReferenceAudio>,
    config: &FingerprintConfig,
) -> Result<FingerprintDatabase, FingerprintError> {
    config.validate()?;
    let mut builder = DatabaseBuilder::new();
    extend_database(&mut builder, recordings, config)?;
    Ok(builder.finish())
}

/// Fingerprint `recordings` in parallel and register them with `builder`.
pub fn extend_database(
    builder: &mut DatabaseBuilder,
    recordings: Vec<ReferenceAudio>,
    config: &FingerprintConfig,
) -> Result<(), FingerprintError> {
    if recordings.is_empty() {
        return Ok(());
    }
    let total = recordings.len();
    let worker_count = resolve_workers(config.matching.worker_count, total);
    let queue = Arc::new(Mutex::new(
        recordings.into_iter().enumerate().collect::<VecDeque<_>>(),
    ));
    let (tx, rx) = channel();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            scope.spawn(move || {
                loop {
                    let Some((order, recording)) = next_job(queue.as_ref()) else {
                        break;
                    };
                    let result = build_fingerprint(&recording.samples, recording.sample_rate, config)
                        .map(|fingerprint| fingerprint.hashes);
                    let indexed = IndexedRecording {
                        order,
                        source_id: recording.source_id,
                        name: recording.name,
                        result,
                    };
                    if !send_result(&tx, indexed) {
                        break;
                    }
                }
            });
        }
        drop(tx);
    });

    let mut indexed: Vec<IndexedRecording> = rx.into_iter().collect();
    if indexed.len() < total {
        warn!("Only {} of {total} recordings came back from the workers", indexed.len());
    }
    indexed.sort_by_key(|recording| recording.order);
    let mut hashed = Vec::with_capacity(indexed.len());
    for recording in indexed {
        match recording.result {
            Ok(hashes) => hashed.push((recording.source_id, recording.name, hashes)),
            Err(source) => {
                return Err(FingerprintError::Recording {
                    name: recording.name,
                    source: Box::new(source),
                });
            }
        }
    }
    for (source_id, name, hashes) in hashed {
        debug!("Registering {name} as {source_id} with {} hashes", hashes.len());
        builder.register_named_recording(source_id, name, &hashes);
    }
    info!("Indexed {total} recordings on {worker_count} workers");
    Ok(())
}

/// Pop the next job; a poisoned queue stops the worker.
fn next_job<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    match queue.lock() {
        Ok(mut guard) => guard.pop_front(),
        Err(_) => {
            warn!("Indexing queue lock poisoned; worker stopping");
            None
        }
    }
}

fn send_result(tx: &Sender<IndexedRecording>, indexed: IndexedRecording) -> bool {
    match tx.send(indexed) {
        Ok(()) => true,
        Err(err) => {
            warn!("Dropping fingerprint of {}: result channel closed", err.0.name);
            false
        }
    }
}

fn resolve_workers(requested: u32, jobs: usize) -> usize {
    let available = if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        requested as usize
    };
    available.min(jobs).max(1)
}

/// Identification service over a finished database.
#[derive(Debug, Clone)]
pub struct Recognizer {
    config: FingerprintConfig,
    db: FingerprintDatabase,
}

impl Recognizer {
    pub fn new(db: FingerprintDatabase, config: FingerprintConfig) -> Result<Self, FingerprintError> {
        config.validate()?;
        Ok(Self { config, db })
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    pub fn database(&self) -> &FingerprintDatabase {
        &self.db
    }

    /// Match already computed query hashes.
    pub fn identify(&self, hashes: &[HashRecord]) -> MatchOutcome {
        matching::identify(&self.db, hashes, &self.config.matching)
    }

    /// Fingerprint query audio and match it.
    pub fn identify_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<(Fingerprint, MatchOutcome), FingerprintError> {
        let fingerprint = build_fingerprint(samples, sample_rate, &self.config)?;
        let outcome = self.identify(&fingerprint.hashes);
        Ok((fingerprint, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    fn chirp(sample_rate: u32, seconds: f32, start_hz: f32, step_hz: f32) -> Vec<f32> {
        let len = (sample_rate as f32 * seconds) as usize;
        let segment = sample_rate as usize / 10;
        let mut phase = 0.0_f32;
        (0..len)
            .map(|i| {
                let freq = start_hz + step_hz * (i / segment) as f32;
                phase += 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
                phase.sin()
            })
            .collect()
    }

    fn small_config() -> FingerprintConfig {
        let mut config = FingerprintConfig::default();
        config.spectrogram.window_seconds = 0.032;
        config.spectrogram.shift_seconds = 0.016;
        config.spectrogram.fft_size = 256;
        config.peaks.coarse_time = 4;
        config.peaks.coarse_freq = 8;
        config.peaks.fine_time = 2;
        config.peaks.fine_freq = 4;
        config.peaks.base_bin = 2;
        config.peaks.percentile = 90.0;
        config.peaks.high_band_percentile = 0.0;
        config.peaks.low_band_percentile = 0.0;
        config.hashing.delay_time = 1;
        config.hashing.zone_width = 20;
        config.hashing.zone_height = 64;
        config
    }

    #[test]
    fn invalid_config_fails_before_analysis() {
        let mut config = small_config();
        config.peaks.coarse_time = 0;
        let err = build_fingerprint(&[0.0; 10], 8_000, &config).unwrap_err();
        assert!(matches!(
            err,
            FingerprintError::Config(ConfigError::InvalidParameter {
                name: "peaks.coarse_time",
                ..
            })
        ));
    }

    #[test]
    fn silence_gives_no_match_not_an_error() {
        let db = index_recordings(
            vec![ReferenceAudio {
                source_id: SourceId::new(0),
                name: "tone".into(),
                samples: chirp(8_000, 2.0, 500.0, 100.0),
                sample_rate: 8_000,
            }],
            &small_config(),
        )
        .unwrap();
        let recognizer = Recognizer::new(db, small_config()).unwrap();
        let (_, outcome) = recognizer.identify_samples(&vec![0.0; 8_000], 8_000).unwrap();
        assert!(!outcome.is_match());
    }

    #[test]
    fn failing_recording_is_named() {
        let recordings = vec![
            ReferenceAudio {
                source_id: SourceId::new(0),
                name: "long".into(),
                samples: chirp(8_000, 1.0, 500.0, 50.0),
                sample_rate: 8_000,
            },
            ReferenceAudio {
                source_id: SourceId::new(1),
                name: "blip".into(),
                samples: vec![0.1; 10],
                sample_rate: 8_000,
            },
        ];
        let err = index_recordings(recordings, &small_config()).unwrap_err();
        match err {
            FingerprintError::Recording { name, source } => {
                assert_eq!(name, "blip");
                assert!(matches!(*source, FingerprintError::InvalidAudioInput { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parallel_indexing_is_deterministic() {
        let recordings: Vec<_> = (0..6)
            .map(|i| ReferenceAudio {
                source_id: SourceId::new(i),
                name: format!("chirp-{i}"),
                samples: chirp(8_000, 1.5, 400.0 + 150.0 * i as f32, 60.0),
                sample_rate: 8_000,
            })
            .collect();
        let mut serial = small_config();
        serial.matching.worker_count = 1;
        let mut parallel = small_config();
        parallel.matching.worker_count = 4;
        let a = index_recordings(recordings.clone(), &serial).unwrap();
        let b = index_recordings(recordings, &parallel).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.catalog().len(), 6);
        assert_eq!(b.catalog().name_of(SourceId::new(3)), "chirp-3");
    }

    #[test]
    fn clip_of_reference_is_identified() {
        let sample_rate = 8_000;
        let reference = chirp(sample_rate, 4.0, 300.0, 70.0);
        let other = chirp(sample_rate, 4.0, 2_200.0, -90.0);
        let db = index_recordings(
            vec![
                ReferenceAudio {
                    source_id: SourceId::new(0),
                    name: "other".into(),
                    samples: other,
                    sample_rate,
                },
                ReferenceAudio {
                    source_id: SourceId::new(1),
                    name: "reference".into(),
                    samples: reference.clone(),
                    sample_rate,
                },
            ],
            &small_config(),
        )
        .unwrap();
        let recognizer = Recognizer::new(db, small_config()).unwrap();
        let (fingerprint, outcome) = recognizer.identify_samples(&reference, sample_rate).unwrap();
        assert!(!fingerprint.hashes.is_empty());
        assert_eq!(outcome.best, Some(SourceId::new(1)));
    }

    #[test]
    fn poisoned_queue_stops_worker() {
        let queue = Arc::new(Mutex::new(VecDeque::from([1, 2])));
        let poisoner = Arc::clone(&queue);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the queue");
        })
        .join();
        assert!(queue.is_poisoned());
        assert_eq!(next_job(queue.as_ref()), None);
    }

    #[test]
    fn closed_channel_is_reported_not_ignored() {
        let (tx, rx) = channel();
        drop(rx);
        let indexed = IndexedRecording {
            order: 0,
            source_id: SourceId::new(0),
            name: "lost".to_string(),
            result: Ok(Vec::new()),
        };
        assert!(!send_result(&tx, indexed));
    }
}
