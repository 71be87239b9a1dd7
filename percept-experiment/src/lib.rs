pub mod assets;
pub mod config;
pub mod recorder;
pub mod session;
pub mod tones;

pub use assets::AssetPool;
pub use config::{ConfigError, RunConfig, STIMULUS_WINDOW_SECS};
pub use recorder::EventRecorder;
pub use session::Session;
pub use tones::ToneBank;
