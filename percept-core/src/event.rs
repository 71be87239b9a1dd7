use serde::{Deserialize, Serialize};

/// Everything a run records. Each kind carries the label written to the CSV
/// log and the pulse code mirrored to the synchronization port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    FixationBegin,
    FixationEnd,
    StimulusBegin,
    StimulusEnd,
    UserReaction,
    SoundStart,
    SoundEnd,
}

impl EventKind {
    /// Label used in the CSV record.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::FixationBegin => "Fixation time",
            EventKind::FixationEnd => "Fixation end",
            EventKind::StimulusBegin => "Image start",
            EventKind::StimulusEnd => "Image end",
            EventKind::UserReaction => "Reaction time",
            EventKind::SoundStart => "Play sound",
            EventKind::SoundEnd => "Sound end",
        }
    }

    /// Pulse code written to the synchronization port.
    pub fn sync_code(self) -> u8 {
        match self {
            EventKind::FixationBegin => 2,
            EventKind::FixationEnd => 3,
            EventKind::StimulusBegin => 4,
            EventKind::StimulusEnd => 5,
            EventKind::UserReaction => 6,
            EventKind::SoundStart => 7,
            EventKind::SoundEnd => 8,
        }
    }
}

/// One recorded event. Timestamps are seconds since the run clock reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub event: EventKind,
    pub time_secs: f64,
}
