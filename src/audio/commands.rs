//! Foreground request handling: what happens when the user submits a line.

use std::fmt;
use std::sync::Arc;

use crate::audio::engine::AudioEngineHandle;
use crate::audio::error::{PlayerError, Result};
use crate::audio::source::PlaybackRequest;
use crate::audio::state::{ActiveSession, PlayerStatus, SessionId};

/// What the foreground may ask of the player.
pub trait PlaybackControl {
    fn start(&self, url: &str) -> Result<ActiveSession>;
    fn stop(&self);
    fn set_volume(&self, volume: f32);
    fn status(&self) -> PlayerStatus;
}

impl PlaybackControl for AudioEngineHandle {
    fn start(&self, url: &str) -> Result<ActiveSession> {
        AudioEngineHandle::start(self, url)
    }

    fn stop(&self) {
        AudioEngineHandle::stop(self)
    }

    fn set_volume(&self, volume: f32) {
        AudioEngineHandle::set_volume(self, volume)
    }

    fn status(&self) -> PlayerStatus {
        AudioEngineHandle::status(self)
    }
}

impl<T: PlaybackControl + ?Sized> PlaybackControl for Arc<T> {
    fn start(&self, url: &str) -> Result<ActiveSession> {
        (**self).start(url)
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn set_volume(&self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn status(&self) -> PlayerStatus {
        (**self).status()
    }
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Starting(String),
    Stopping(String),
    InvalidUrl(String),
    Unavailable(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Starting(url) => write!(f, "Loading {url}"),
            Notice::Stopping(url) => write!(f, "Stopping {url}"),
            Notice::InvalidUrl(input) => write!(f, "Invalid URL {input}"),
            Notice::Unavailable(reason) => write!(f, "Player unavailable: {reason}"),
        }
    }
}

pub struct RequestHandler<P> {
    player: P,
    default_url: String,
    session: Option<ActiveSession>,
}

impl<P: PlaybackControl> RequestHandler<P> {
    pub fn new(player: P, default_url: impl Into<String>) -> Self {
        Self {
            player,
            default_url: default_url.into(),
            session: None,
        }
    }

    /// The URL a submission refers to: the trimmed input, or the default
    /// when nothing was typed.
    pub fn resolve_input(&self, raw: &str) -> String {
        let input = raw.trim();
        if input.is_empty() {
            self.default_url.clone()
        } else {
            input.to_string()
        }
    }

    /// Handle one submission.
    ///
    /// Invalid input is reported and ignored. Valid input starts a session
    /// when none is active and stops the active one otherwise. Input is
    /// validated before the toggle, so an invalid line while a session is
    /// active reports an error and leaves playback running.
    pub fn submit(&mut self, raw: &str) -> Notice {
        let url = self.resolve_input(raw);

        if let Err(e) = PlaybackRequest::parse(&url) {
            log::warn!("Rejected input: {}", e);
            return Notice::InvalidUrl(url);
        }

        if let Some(active) = self.session.take() {
            self.player.stop();
            return Notice::Stopping(active.request.url().to_string());
        }

        match self.player.start(&url) {
            Ok(active) => {
                log::debug!("Started session {} for {}", active.id, active.request);
                let notice = Notice::Starting(active.request.url().to_string());
                self.session = Some(active);
                notice
            }
            Err(PlayerError::InvalidUrl(_)) => Notice::InvalidUrl(url),
            Err(e) => Notice::Unavailable(e.to_string()),
        }
    }

    /// Forget session `id` after the player reports it finished on its own.
    /// Reports about any other session are ignored.
    pub fn session_ended(&mut self, id: SessionId) {
        if self.session.as_ref().is_some_and(|s| s.id == id) {
            log::debug!("Session {} ended", id);
            self.session = None;
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn player(&self) -> &P {
        &self.player
    }
}
