use crate::assets::AssetPool;
use crate::config::{RunConfig, STIMULUS_WINDOW_SECS};
use crate::recorder::EventRecorder;
use crate::tones::ToneBank;
use anyhow::Result;
use percept_core::{EventKind, RunPhase, Scene, TonePlayer, TrialState};
use percept_timing::Timer;
use rand::Rng;
use std::path::PathBuf;
use tracing::{info, warn};

/// One in-flight trial.
#[derive(Debug)]
struct Trial {
    image: PathBuf,
    fixation_start: f64,
    stimulus_start: Option<f64>,
    state: TrialState,
}

/// The trial sequencer.
///
/// Owns the event log, the run clock, the RNG and the capability providers;
/// nothing about a run lives in global state. `update` advances the
/// sequencer by one displayed frame, so fixation and stimulus windows are
/// sampled at the display refresh rate; the jittered inter-stimulus delay is
/// the one point that suspends between frames.
pub struct Session<T: Timer, R: Rng> {
    config: RunConfig,
    pool: AssetPool,
    tones: ToneBank,
    recorder: EventRecorder,
    player: Box<dyn TonePlayer>,
    timer: T,
    rng: R,
    phase: RunPhase,
    trial: Option<Trial>,
    trial_num: usize,
    done: bool,
}

impl<T: Timer, R: Rng> Session<T, R> {
    pub fn new(
        config: RunConfig,
        pool: AssetPool,
        tones: ToneBank,
        recorder: EventRecorder,
        player: Box<dyn TonePlayer>,
        timer: T,
        rng: R,
    ) -> Self {
        Self {
            config,
            pool,
            tones,
            recorder,
            player,
            timer,
            rng,
            phase: RunPhase::Welcome,
            trial: None,
            trial_num: 0,
            done: false,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// True once the subject has dismissed the farewell screen.
    pub fn finished(&self) -> bool {
        self.done
    }

    pub fn trial_state(&self) -> Option<TrialState> {
        self.trial.as_ref().map(|t| t.state)
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// What to draw for the current frame.
    pub fn scene(&self) -> Scene<'_> {
        match self.phase {
            RunPhase::Welcome => Scene::StartPrompt,
            RunPhase::Farewell => Scene::ExitPrompt,
            RunPhase::Trials => match &self.trial {
                Some(trial) => match trial.state {
                    TrialState::Fixation => Scene::Fixation,
                    TrialState::Stimulus => Scene::Image(&trial.image),
                    _ => Scene::Blank,
                },
                None => Scene::Blank,
            },
        }
    }

    /// Any non-repeat keypress.
    pub fn key_pressed(&mut self) -> Result<()> {
        match self.phase {
            RunPhase::Welcome => {
                // The run clock starts here; every logged timestamp is
                // relative to this instant.
                self.timer.reset();
                self.phase = RunPhase::Trials;
                info!(trials = self.config.trials, "run started");
            }
            RunPhase::Trials => {
                if self.trial_state() == Some(TrialState::Stimulus) {
                    let now = self.timer.now_secs();
                    self.recorder.record(EventKind::UserReaction, now)?;
                }
            }
            RunPhase::Farewell => {
                self.done = true;
            }
        }
        Ok(())
    }

    /// Advance the sequencer by one frame.
    pub fn update(&mut self) -> Result<()> {
        if self.phase != RunPhase::Trials {
            return Ok(());
        }
        if self.trial.is_none() {
            return self.start_trial();
        }
        self.update_trial()
    }

    fn start_trial(&mut self) -> Result<()> {
        if self.trial_num >= self.config.trials {
            self.phase = RunPhase::Farewell;
            info!("all trials finished");
            return Ok(());
        }
        let Some(image) = self.pool.choose(&mut self.rng)? else {
            // Resource exhaustion is local to the trial, not fatal.
            warn!(trial = self.trial_num, "no images available; trial skipped");
            self.trial_num += 1;
            return Ok(());
        };

        info!(trial = self.trial_num, image = %image.display(), "trial started");
        let now = self.timer.now_secs();
        self.recorder.record(EventKind::FixationBegin, now)?;
        self.trial = Some(Trial {
            image,
            fixation_start: now,
            stimulus_start: None,
            state: TrialState::Fixation,
        });
        Ok(())
    }

    fn update_trial(&mut self) -> Result<()> {
        let now = self.timer.now_secs();
        let Some(trial) = &mut self.trial else {
            return Ok(());
        };

        match trial.state {
            TrialState::Fixation => {
                if now - trial.fixation_start >= self.config.fixation_secs {
                    trial.state = TrialState::Stimulus;
                    trial.stimulus_start = Some(now);
                    self.recorder.record(EventKind::FixationEnd, now)?;
                    self.recorder.record(EventKind::StimulusBegin, now)?;
                }
            }
            TrialState::Stimulus => {
                if trial
                    .stimulus_start
                    .is_some_and(|start| now - start >= STIMULUS_WINDOW_SECS)
                {
                    // The frame after this one presents a blank screen.
                    trial.state = TrialState::Delay;
                    self.recorder.record(EventKind::StimulusEnd, now)?;
                }
            }
            TrialState::Delay => {
                let delay = self.config.draw_delay(&mut self.rng);
                self.timer.sleep(delay);
                trial.state = TrialState::Tone;
            }
            TrialState::Tone => {
                let tone = self.tones.draw(&mut self.rng);
                self.recorder
                    .record(EventKind::SoundStart, self.timer.now_secs())?;
                self.player.play(tone)?;
                self.recorder
                    .record(EventKind::SoundEnd, self.timer.now_secs())?;
                trial.state = TrialState::Complete;
            }
            TrialState::Complete => {}
        }

        if self
            .trial
            .as_ref()
            .is_some_and(|t| t.state == TrialState::Complete)
        {
            self.trial = None;
            self.trial_num += 1;
        }
        Ok(())
    }

    /// Flush the event log. Consumes the session; a run flushes exactly once.
    pub fn finish(self) -> Result<PathBuf> {
        self.recorder.finish()
    }
}
