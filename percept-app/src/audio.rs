use anyhow::{Context, Result};
use percept_core::{Tone, TonePlayer};
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamHandle, Sink};

const TONE_AMPLITUDE: f32 = 0.25;

/// Sine-wave synthesis through the default output device.
///
/// `play` blocks until the sink drains, so the caller's timestamps bracket
/// the audible tone rather than just its submission.
pub struct RodioPlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl RodioPlayer {
    pub fn new() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("cannot open the audio output device")?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }
}

impl TonePlayer for RodioPlayer {
    fn play(&mut self, tone: Tone) -> Result<()> {
        let sink = Sink::try_new(&self.handle).context("cannot open an audio sink")?;
        let source = SineWave::new(tone.frequency_hz)
            .take_duration(tone.duration)
            .amplify(TONE_AMPLITUDE);
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}
