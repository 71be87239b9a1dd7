use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Stimulus exposure window in seconds. Fixed: the image stays up and the
/// reaction poll runs for exactly this long regardless of configuration.
pub const STIMULUS_WINDOW_SECS: f64 = 0.4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{freqs} frequencies but {reps} repetition counts; the lists must pair up 1:1")]
    ToneListMismatch { freqs: usize, reps: usize },
    #[error("delay bounds are inverted: min {min} ms > max {max} ms")]
    DelayBounds { min: u64, max: u64 },
    #[error("tone set is empty or all repetition counts are zero")]
    EmptyToneSet,
}

/// Parameters fixed for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub trials: usize,
    pub image_dir: PathBuf,
    pub frequencies: Vec<f32>,
    pub repetitions: Vec<u32>,
    /// Tone playback duration in seconds.
    pub tone_secs: f64,
    /// Fixation marker hold in seconds.
    pub fixation_secs: f64,
    /// Inter-stimulus delay bounds in milliseconds, inclusive.
    pub delay_bounds_ms: (u64, u64),
    /// Base name of the output file; the log is written to `<name>.csv`.
    pub output_name: String,
    /// Synchronization port address, when pulse output is enabled.
    pub sync_address: Option<u16>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trials: 20,
            image_dir: PathBuf::from("images/"),
            frequencies: vec![440.0, 500.0],
            repetitions: vec![15, 5],
            tone_secs: 0.2,
            fixation_secs: 0.1,
            delay_bounds_ms: (50, 150),
            output_name: "data".into(),
            sync_address: None,
        }
    }
}

impl RunConfig {
    /// Startup validation; runs before any backend is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequencies.len() != self.repetitions.len() {
            return Err(ConfigError::ToneListMismatch {
                freqs: self.frequencies.len(),
                reps: self.repetitions.len(),
            });
        }
        let (min, max) = self.delay_bounds_ms;
        if min > max {
            return Err(ConfigError::DelayBounds { min, max });
        }
        Ok(())
    }

    /// Jittered inter-stimulus delay, drawn uniformly from the configured
    /// bounds.
    pub fn draw_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let (min, max) = self.delay_bounds_ms;
        Duration::from_millis(rng.random_range(min..=max))
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.csv", self.output_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn mismatched_tone_lists_fail_validation() {
        let config = RunConfig {
            frequencies: vec![440.0, 500.0],
            repetitions: vec![15],
            ..RunConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ToneListMismatch { freqs: 2, reps: 1 })
        );
    }

    #[test]
    fn inverted_delay_bounds_fail_validation() {
        let config = RunConfig {
            delay_bounds_ms: (200, 100),
            ..RunConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DelayBounds { min: 200, max: 100 })
        );
    }

    #[test]
    fn defaults_validate() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
    }

    #[test]
    fn drawn_delays_stay_within_bounds() {
        let config = RunConfig::default();
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..1000 {
            let delay = config.draw_delay(&mut rng);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn output_path_appends_csv() {
        let config = RunConfig {
            output_name: "session7".into(),
            ..RunConfig::default()
        };
        assert_eq!(config.output_path(), PathBuf::from("session7.csv"));
    }
}
