//! The playback state machine.
//!
//! ```text
//! Idle --start--> Preparing --prepared--> Playing --stop/end--> Idle
//!                 Preparing --error-----> Idle
//! ```
//!
//! The controller is driven from one thread. Preparation runs on a worker
//! thread and its result comes back through the `prepared` channel, which the
//! owning thread drains and feeds to [`PlaybackController::on_prepared`].
//! Leaving `Preparing` for any reason cancels the worker's download.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::audio::error::{PlayerError, Result};
use crate::audio::events::{EventEmitter, PlayerEvent};
use crate::audio::loader::{CancelToken, MediaLoader, PreparedMedia};
use crate::audio::output::AudioOutput;
use crate::audio::source::PlaybackRequest;
use crate::audio::state::{PlaybackState, SessionId, SharedStatus};

/// Outcome of a preparation, tagged with the session that asked for it.
#[derive(Debug)]
pub struct Prepared {
    pub session: SessionId,
    pub result: Result<PreparedMedia>,
}

/// Tracks playback position using wall-clock time.
///
/// Outputs don't report a position, so it is measured from the moment
/// playback started.
struct PositionTracker {
    play_start: Option<Instant>,
}

impl PositionTracker {
    fn new() -> Self {
        Self { play_start: None }
    }

    fn start(&mut self) {
        self.play_start = Some(Instant::now());
    }

    fn reset(&mut self) {
        self.play_start = None;
    }

    fn position(&self) -> f64 {
        self.play_start
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    loader: Arc<dyn MediaLoader>,
    prepared_tx: Sender<Prepared>,
    events: EventEmitter,
    status: SharedStatus,

    state: PlaybackState,
    session: SessionId,
    current: Option<PlaybackRequest>,
    preparing: Option<CancelToken>,
    position: PositionTracker,
    volume: f32,
}

impl PlaybackController {
    pub fn new(
        output: Box<dyn AudioOutput>,
        loader: Arc<dyn MediaLoader>,
        prepared_tx: Sender<Prepared>,
        events: EventEmitter,
        status: SharedStatus,
    ) -> Self {
        let volume = status.read().volume;
        let mut controller = Self {
            output,
            loader,
            prepared_tx,
            events,
            status,
            state: PlaybackState::Idle,
            session: SessionId::default(),
            current: None,
            preparing: None,
            position: PositionTracker::new(),
            volume,
        };
        controller.output.set_volume(volume);
        controller
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Validate `url` and start a session for it.
    ///
    /// An invalid URL is returned as an error and changes nothing.
    pub fn start(&mut self, url: &str) -> Result<SessionId> {
        let request = PlaybackRequest::parse(url)?;
        let session = self.session.next();
        self.begin(request, session)?;
        Ok(session)
    }

    /// Start `session` for an already validated request, stopping the
    /// current one first. `session` must be newer than any earlier one.
    pub fn begin(&mut self, request: PlaybackRequest, session: SessionId) -> Result<()> {
        let source = request.source()?;

        if self.state.is_active() {
            self.stop();
        }

        self.session = session;
        log::info!("Session {} preparing {}", session, request);

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let loader = Arc::clone(&self.loader);
        let prepared_tx = self.prepared_tx.clone();
        let spawned = thread::Builder::new()
            .name("urlplay-prepare".into())
            .spawn(move || {
                let result = loader.load(&source, &token);
                let _ = prepared_tx.send(Prepared { session, result });
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn preparation thread: {}", e);
            return Err(PlayerError::Io(e));
        }
        self.preparing = Some(cancel);

        {
            let mut status = self.status.write();
            status.url = Some(request.url().to_string());
            status.session = session;
            status.position_secs = 0.0;
            status.duration_secs = None;
            status.error = None;
        }
        self.current = Some(request);
        self.transition(PlaybackState::Preparing);
        Ok(())
    }

    /// The "prepared" callback. Results for stale sessions are dropped.
    pub fn on_prepared(&mut self, prepared: Prepared) {
        if prepared.session != self.session || self.state != PlaybackState::Preparing {
            log::debug!(
                "Discarding preparation for session {} (current {}, {})",
                prepared.session,
                self.session,
                self.state
            );
            return;
        }
        self.preparing = None;

        let media = match prepared.result {
            Ok(media) => media,
            Err(e) => return self.fail(e),
        };

        if let Err(e) = self.output.play(&media) {
            return self.fail(e);
        }
        self.output.set_volume(self.volume);
        self.position.start();

        {
            let mut status = self.status.write();
            status.duration_secs = media.info.duration_secs;
            status.position_secs = 0.0;
        }
        self.transition(PlaybackState::Playing);
        log::info!("Session {} playing", self.session);

        self.events.emit(PlayerEvent::Started {
            session: self.session,
            url: self.current_url(),
            info: media.info,
        });
    }

    /// Stop the current session. Returns false when already idle.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }

        if let Some(cancel) = self.preparing.take() {
            log::debug!("Cancelling preparation for session {}", self.session);
            cancel.cancel();
        }
        self.output.stop();
        self.position.reset();
        let url = self.current_url();
        self.current = None;
        self.status.write().position_secs = 0.0;
        self.transition(PlaybackState::Idle);
        log::info!("Session {} stopped", self.session);

        self.events.emit(PlayerEvent::Stopped {
            session: self.session,
            url,
        });
        true
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.output.set_volume(self.volume);
        self.status.write().volume = self.volume;
    }

    /// Periodic housekeeping: publish the position and notice the end of the
    /// track.
    pub fn tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        if self.output.is_finished() {
            log::debug!("Session {} reached end of track", self.session);
            self.position.reset();
            let url = self.current_url();
            self.current = None;
            self.status.write().position_secs = 0.0;
            self.transition(PlaybackState::Idle);
            self.events.emit(PlayerEvent::Ended {
                session: self.session,
                url,
            });
            return;
        }

        self.status.write().position_secs = self.position.position();
    }

    fn fail(&mut self, error: PlayerError) {
        log::error!("Session {} failed: {}", self.session, error);

        let url = self.current_url();
        self.current = None;
        self.status.write().error = Some(error.to_string());
        self.transition(PlaybackState::Idle);

        self.events.emit(PlayerEvent::Failed {
            session: self.session,
            url,
            message: error.to_string(),
        });
    }

    fn transition(&mut self, next: PlaybackState) {
        log::debug!("Session {}: {} -> {}", self.session, self.state, next);
        self.state = next;
        self.status.write().state = next;
        self.events.emit_state(self.session, next);
    }

    fn current_url(&self) -> String {
        self.current
            .as_ref()
            .map(|r| r.url().to_string())
            .unwrap_or_default()
    }
}
