use percept_core::Tone;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

use crate::config::ConfigError;

/// Weighted set of tone frequencies.
///
/// Each draw is distributed proportionally to the remaining repetition
/// counts and decrements the drawn count, so a full cycle plays every
/// frequency exactly its configured number of times. When every count has
/// reached zero the whole set is restored before the draw; the total is zero
/// only transiently between draws.
#[derive(Debug, Clone)]
pub struct ToneBank {
    frequencies: Vec<f32>,
    remaining: Vec<u32>,
    initial: Vec<u32>,
    duration: Duration,
}

impl ToneBank {
    pub fn new(
        frequencies: Vec<f32>,
        repetitions: Vec<u32>,
        duration: Duration,
    ) -> Result<Self, ConfigError> {
        if frequencies.len() != repetitions.len() {
            return Err(ConfigError::ToneListMismatch {
                freqs: frequencies.len(),
                reps: repetitions.len(),
            });
        }
        if frequencies.is_empty() || repetitions.iter().sum::<u32>() == 0 {
            return Err(ConfigError::EmptyToneSet);
        }
        Ok(Self {
            frequencies,
            remaining: repetitions.clone(),
            initial: repetitions,
            duration,
        })
    }

    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Tone {
        if self.remaining.iter().sum::<u32>() == 0 {
            self.remaining.copy_from_slice(&self.initial);
            debug!("tone repetition counts restored");
        }
        // Construction guarantees at least one nonzero count here.
        let dist = WeightedIndex::new(self.remaining.iter().copied())
            .expect("tone bank holds a nonzero repetition count");
        let index = dist.sample(rng);
        self.remaining[index] -= 1;
        Tone {
            frequency_hz: self.frequencies[index],
            duration: self.duration,
        }
    }

    pub fn remaining(&self) -> &[u32] {
        &self.remaining
    }
}
