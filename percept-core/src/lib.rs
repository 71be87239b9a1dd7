pub mod backend;
pub mod event;
pub mod scene;
pub mod state;

pub use backend::{SyncPort, Tone, TonePlayer};
pub use event::{EventKind, LogEntry};
pub use scene::Scene;
pub use state::{RunPhase, TrialState};
