use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::audio::source::PlaybackRequest;

/// Where the single playback session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Preparing,
    Playing,
}

impl PlaybackState {
    /// True while a session exists (preparing or playing).
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Preparing => "preparing",
            PlaybackState::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// Identifies one start request. Increases on every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request the engine accepted, with the session it will run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: SessionId,
    pub request: PlaybackRequest,
}

/// Read-only snapshot of the player, published by the controller.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub url: Option<String>,
    pub session: SessionId,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub volume: f32,
    pub error: Option<String>,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            ..Default::default()
        }
    }
}

pub type SharedStatus = Arc<RwLock<PlayerStatus>>;

pub fn create_shared_status() -> SharedStatus {
    Arc::new(RwLock::new(PlayerStatus::new()))
}
