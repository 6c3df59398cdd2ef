pub mod commands;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod loader;
pub mod output;
pub mod source;
pub mod state;

pub use commands::{Notice, PlaybackControl, RequestHandler};
pub use controller::{PlaybackController, Prepared};
pub use engine::{AudioCommand, AudioEngineHandle};
pub use error::{PlayerError, Result};
pub use events::{EventEmitter, PlayerEvent};
pub use loader::{CancelToken, MediaInfo, MediaLoader, PreparedMedia, StreamLoader};
pub use output::{AudioOutput, SilentOutput};
pub use source::{PlaybackRequest, TrackSource, DEFAULT_TRACK_URL};
pub use state::{ActiveSession, PlaybackState, PlayerStatus, SessionId, SharedStatus};
