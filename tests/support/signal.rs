use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One steady tone of a synthetic melody.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub freq_hz: f32,
    pub seconds: f32,
}

/// Render `notes` back to back as a phase-continuous sine.
pub fn melody(sample_rate: u32, notes: &[Note]) -> Vec<f32> {
    let mut samples = Vec::new();
    let mut phase = 0.0_f64;
    for note in notes {
        let len = (note.seconds * sample_rate as f32).round() as usize;
        let step = 2.0 * std::f64::consts::PI * note.freq_hz as f64 / sample_rate as f64;
        for _ in 0..len {
            samples.push(0.5 * phase.sin() as f32);
            phase = (phase + step) % (2.0 * std::f64::consts::PI);
        }
    }
    samples
}

/// `count` notes of 0.2 s with frequencies drawn from `low_hz..high_hz`.
pub fn random_notes(seed: u64, count: usize, low_hz: f32, high_hz: f32) -> Vec<Note> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Note {
            freq_hz: rng.random_range(low_hz..high_hz),
            seconds: 0.2,
        })
        .collect()
}

/// Move every note up by `hz`.
pub fn shifted(notes: &[Note], hz: f32) -> Vec<Note> {
    notes
        .iter()
        .map(|note| Note {
            freq_hz: note.freq_hz + hz,
            ..*note
        })
        .collect()
}
