use std::path::{Path, PathBuf};

use hound::SampleFormat;
use thiserror::Error;

/// Mono samples decoded from a WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Errors raised while loading audio from disk.
#[derive(Debug, Error)]
pub enum AudioLoadError {
    /// The file could not be opened or decoded as WAV.
    #[error("Failed to read WAV {path}: {source}")]
    Read {
        path: PathBuf,
        source: hound::Error,
    },
    /// The file holds no samples.
    #[error("WAV file {path} contains no audio")]
    Empty { path: PathBuf },
}

/// Decode a PCM or float WAV file and average its channels to mono.
pub fn load_wav_mono(path: &Path) -> Result<DecodedAudio, AudioLoadError> {
    let read_error = |source| AudioLoadError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = hound::WavReader::open(path).map_err(read_error)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(read_error)?,
        SampleFormat::Int => {
            let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(read_error)?
        }
    };
    let samples = downmix_to_mono(&interleaved, spec.channels as usize);
    if samples.is_empty() {
        return Err(AudioLoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
