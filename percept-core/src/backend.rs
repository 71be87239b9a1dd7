use anyhow::Result;
use std::time::Duration;

/// A single playable tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration: Duration,
}

/// Audio capability provider. `play` blocks until the tone has finished
/// sounding, so the caller's timestamps bracket the full playback.
pub trait TonePlayer {
    fn play(&mut self, tone: Tone) -> Result<()>;
}

/// Hardware synchronization capability provider. Implementations drive a
/// level on an external port; the value is never read back.
pub trait SyncPort {
    fn pulse(&mut self, code: u8) -> Result<()>;
}
