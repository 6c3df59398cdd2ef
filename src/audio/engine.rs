//! Audio engine thread.
//!
//! Architecture:
//! - `AudioEngineHandle`: Send + Sync handle that sends commands to the engine thread
//! - The engine thread owns the output and the `PlaybackController`
//! - Preparation results come back over a second channel to the same thread
//! - `SharedStatus` (Arc<RwLock<PlayerStatus>>) for reading state from any thread

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::audio::controller::{PlaybackController, Prepared};
use crate::audio::error::{PlayerError, Result};
use crate::audio::events::{EventEmitter, PlayerEvent};
use crate::audio::loader::MediaLoader;
use crate::audio::output::AudioOutput;
use crate::audio::source::PlaybackRequest;
use crate::audio::state::{
    create_shared_status, ActiveSession, PlaybackState, PlayerStatus, SessionId, SharedStatus,
};
use crate::lifecycle::{LifecycleEvent, LifecycleObserver};

/// Interval for position updates and track-end checks
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Commands sent to the engine thread
#[derive(Debug)]
pub enum AudioCommand {
    Start {
        request: PlaybackRequest,
        session: SessionId,
    },
    Stop,
    SetVolume(f32),
    Shutdown,
}

/// Handle for driving the audio engine from the foreground.
///
/// This struct is Send + Sync. It communicates with the engine thread via a
/// command channel.
pub struct AudioEngineHandle {
    cmd_tx: Sender<AudioCommand>,
    status: SharedStatus,
    last_session: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl AudioEngineHandle {
    /// Spawn the engine thread.
    ///
    /// `make_output` runs on the engine thread, so outputs that are not
    /// `Send` can be used. Its failure is returned from here.
    pub fn spawn<F>(
        make_output: F,
        loader: Arc<dyn MediaLoader>,
        events: Sender<PlayerEvent>,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn AudioOutput>> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = bounded::<AudioCommand>(32);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let status = create_shared_status();

        let status_clone = Arc::clone(&status);
        let thread = thread::Builder::new()
            .name("urlplay-audio".into())
            .spawn(move || {
                let output = match make_output() {
                    Ok(output) => output,
                    Err(e) => {
                        log::error!("Failed to open audio output: {}", e);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run(
                    cmd_rx,
                    output,
                    loader,
                    EventEmitter::new(events),
                    status_clone,
                );
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => return Err(PlayerError::EngineClosed),
        }

        log::info!("Audio engine initialized");
        Ok(Self {
            cmd_tx,
            status,
            last_session: AtomicU64::new(0),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Validate `url` and ask the engine to play it.
    ///
    /// Validation happens here so an invalid URL is reported to the caller
    /// without touching the engine. The returned session id is the one every
    /// later event for this request carries.
    pub fn start(&self, url: &str) -> Result<ActiveSession> {
        let request = PlaybackRequest::parse(url)?;
        let session = SessionId(self.last_session.fetch_add(1, Ordering::Relaxed) + 1);
        log::info!("Requesting playback of {} as session {}", request, session);
        self.send(AudioCommand::Start {
            request: request.clone(),
            session,
        })?;
        Ok(ActiveSession {
            id: session,
            request,
        })
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }

    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(AudioCommand::SetVolume(volume));
    }

    pub fn status(&self) -> PlayerStatus {
        self.status.read().clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.status.read().state
    }

    /// Stop playback and join the engine thread. Safe to call more than once.
    pub fn shutdown(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if thread.join().is_err() {
            log::error!("Audio thread panicked");
        }
    }

    fn send(&self, cmd: AudioCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| PlayerError::EngineClosed)
    }
}

impl Drop for AudioEngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The engine's service lifecycle: destroying the host releases playback.
impl LifecycleObserver for Arc<AudioEngineHandle> {
    fn on_lifecycle(&mut self, event: LifecycleEvent) {
        if event == LifecycleEvent::Destroy {
            log::info!("Host destroyed, shutting down audio engine");
            self.shutdown();
        }
    }
}

/// Main loop for the engine thread.
fn run(
    cmd_rx: Receiver<AudioCommand>,
    output: Box<dyn AudioOutput>,
    loader: Arc<dyn MediaLoader>,
    events: EventEmitter,
    status: SharedStatus,
) {
    let (prepared_tx, prepared_rx) = unbounded::<Prepared>();
    let mut controller = PlaybackController::new(output, loader, prepared_tx, events, status);

    log::info!("Audio thread started");

    loop {
        select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(AudioCommand::Start { request, session }) => {
                    if let Err(e) = controller.begin(request, session) {
                        log::error!("Failed to start playback: {}", e);
                    }
                }
                Ok(AudioCommand::Stop) => {
                    controller.stop();
                }
                Ok(AudioCommand::SetVolume(volume)) => controller.set_volume(volume),
                Ok(AudioCommand::Shutdown) | Err(_) => {
                    controller.stop();
                    log::info!("Audio thread shutting down");
                    break;
                }
            },
            recv(prepared_rx) -> prepared => {
                if let Ok(prepared) = prepared {
                    controller.on_prepared(prepared);
                }
            },
            default(TICK_INTERVAL) => controller.tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::controller::tests::{FakeLoader, OutputLog, RecordingOutput};

    fn spawn_engine() -> (AudioEngineHandle, Receiver<PlayerEvent>, Arc<Mutex<OutputLog>>) {
        let log = Arc::new(Mutex::new(OutputLog::default()));
        let output_log = Arc::clone(&log);
        let (events_tx, events_rx) = unbounded();
        let engine = AudioEngineHandle::spawn(
            move || Ok(Box::new(RecordingOutput(output_log)) as Box<dyn AudioOutput>),
            Arc::new(FakeLoader),
            events_tx,
        )
        .unwrap();
        (engine, events_rx, log)
    }

    fn wait_for(
        events: &Receiver<PlayerEvent>,
        pred: impl Fn(&PlayerEvent) -> bool,
    ) -> PlayerEvent {
        loop {
            let event = events
                .recv_timeout(Duration::from_secs(5))
                .expect("engine event");
            if pred(&event) {
                return event;
            }
        }
    }

    #[test]
    fn output_failure_is_reported_by_spawn() {
        let (events_tx, _events_rx) = unbounded();
        let result = AudioEngineHandle::spawn(
            || Err(PlayerError::Output("no device".into())),
            Arc::new(FakeLoader),
            events_tx,
        );
        assert!(matches!(result, Err(PlayerError::Output(_))));
    }

    #[test]
    fn plays_and_stops_through_the_thread() {
        let (engine, events, log) = spawn_engine();

        let active = engine.start("https://example.com/a.mp3").unwrap();
        assert_eq!(active.request.url(), "https://example.com/a.mp3");
        let started = wait_for(&events, |e| matches!(e, PlayerEvent::Started { .. }));
        assert!(matches!(started, PlayerEvent::Started { session, .. } if session == active.id));
        assert_eq!(engine.state(), PlaybackState::Playing);

        engine.stop();
        wait_for(&events, |e| matches!(e, PlayerEvent::Stopped { .. }));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(log.lock().stops, 1);
    }

    #[test]
    fn every_start_gets_a_new_session() {
        let (engine, events, _log) = spawn_engine();

        let first = engine.start("https://example.com/a.mp3").unwrap();
        engine.stop();
        let second = engine.start("https://example.com/a.mp3").unwrap();
        assert!(second.id > first.id);

        let started = wait_for(
            &events,
            |e| matches!(e, PlayerEvent::Started { session, .. } if *session == second.id),
        );
        assert!(matches!(started, PlayerEvent::Started { .. }));
        assert_eq!(engine.status().session, second.id);
    }

    #[test]
    fn invalid_url_never_reaches_the_thread() {
        let (engine, events, _log) = spawn_engine();
        assert!(matches!(
            engine.start("nope"),
            Err(PlayerError::InvalidUrl(_))
        ));
        assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
        assert_eq!(engine.status().session.0, 0);
    }

    #[test]
    fn shutdown_stops_playback_and_is_idempotent() {
        let (engine, events, log) = spawn_engine();
        engine.start("https://example.com/a.mp3").unwrap();
        wait_for(&events, |e| matches!(e, PlayerEvent::Started { .. }));

        engine.shutdown();
        engine.shutdown();
        assert_eq!(log.lock().stops, 1);
        assert!(matches!(
            engine.start("https://example.com/b.mp3"),
            Err(PlayerError::EngineClosed)
        ));
    }
}
