use crossbeam_channel::Sender;
use serde::Serialize;
use std::fmt;

use crate::audio::loader::MediaInfo;
use crate::audio::state::{PlaybackState, SessionId};

/// Notifications published by the audio engine for the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlayerEvent {
    StateChanged {
        session: SessionId,
        state: PlaybackState,
    },
    Started {
        session: SessionId,
        url: String,
        info: MediaInfo,
    },
    Ended {
        session: SessionId,
        url: String,
    },
    Stopped {
        session: SessionId,
        url: String,
    },
    Failed {
        session: SessionId,
        url: String,
        message: String,
    },
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerEvent::StateChanged { session, state } => write!(f, "{session} {state}"),
            PlayerEvent::Started { url, info, .. } => {
                write!(f, "Playing {url}")?;
                if let Some(codec) = &info.codec {
                    write!(f, " [{codec}")?;
                    if let Some(rate) = info.sample_rate {
                        write!(f, " {rate} Hz")?;
                    }
                    f.write_str("]")?;
                }
                if let Some(secs) = info.duration_secs {
                    write!(f, " ({}:{:02})", secs as u64 / 60, secs as u64 % 60)?;
                }
                Ok(())
            }
            PlayerEvent::Ended { url, .. } => write!(f, "Finished {url}"),
            PlayerEvent::Stopped { url, .. } => write!(f, "Stopped {url}"),
            PlayerEvent::Failed { url, message, .. } => {
                write!(f, "Could not play {url}: {message}")
            }
        }
    }
}

/// Sending side of the event stream. Emission never blocks and a dropped
/// listener is not an error.
#[derive(Clone)]
pub struct EventEmitter {
    tx: Sender<PlayerEvent>,
}

impl EventEmitter {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: PlayerEvent) {
        log::trace!("event: {:?}", event);
        let _ = self.tx.try_send(event);
    }

    pub fn emit_state(&self, session: SessionId, state: PlaybackState) {
        self.emit(PlayerEvent::StateChanged { session, state });
    }
}
