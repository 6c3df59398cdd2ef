//! Host lifecycle as explicit events.
//!
//! A driver feeds [`LifecycleEvent`]s to its observers in a legal order;
//! observers react to the transitions they care about.

use serde::Serialize;

use crate::audio::error::{PlayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum LifecycleEvent {
    /// `restored` is set when the host is recreated from saved state.
    Create { restored: bool },
    Start,
    Resume,
    Pause,
    Stop,
    Restart,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Initial,
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    Destroyed,
}

impl LifecyclePhase {
    /// Phase reached by applying `event`, if the event is legal here.
    pub fn apply(self, event: LifecycleEvent) -> Option<LifecyclePhase> {
        use LifecycleEvent as E;
        use LifecyclePhase as P;

        match (self, event) {
            (P::Initial, E::Create { .. }) => Some(P::Created),
            (P::Created, E::Start) => Some(P::Started),
            (P::Started, E::Resume) | (P::Paused, E::Resume) => Some(P::Resumed),
            (P::Resumed, E::Pause) => Some(P::Paused),
            (P::Started, E::Stop) | (P::Paused, E::Stop) => Some(P::Stopped),
            // restart leads back into start
            (P::Stopped, E::Restart) => Some(P::Created),
            (P::Created, E::Destroy) | (P::Stopped, E::Destroy) => Some(P::Destroyed),
            _ => None,
        }
    }
}

pub trait LifecycleObserver {
    fn on_lifecycle(&mut self, event: LifecycleEvent);
}

/// Logs every transition of the named component.
pub struct LifecycleLogger {
    component: String,
}

impl LifecycleLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn describe(event: LifecycleEvent) -> &'static str {
        match event {
            LifecycleEvent::Create { restored: true } => "create: recreated from saved state",
            LifecycleEvent::Create { restored: false } => "create: created",
            LifecycleEvent::Start => "start: about to become visible",
            LifecycleEvent::Resume => "resume: visible and interactive",
            LifecycleEvent::Pause => "pause: losing focus",
            LifecycleEvent::Stop => "stop: no longer visible",
            LifecycleEvent::Restart => "restart: about to start again",
            LifecycleEvent::Destroy => "destroy: about to be destroyed",
        }
    }

    /// Creation and destruction show at the default level, the rest is debug.
    pub fn level(event: LifecycleEvent) -> log::Level {
        match event {
            LifecycleEvent::Create { .. } | LifecycleEvent::Destroy => log::Level::Info,
            _ => log::Level::Debug,
        }
    }
}

impl LifecycleObserver for LifecycleLogger {
    fn on_lifecycle(&mut self, event: LifecycleEvent) {
        log::log!(
            Self::level(event),
            "[{}] {}",
            self.component,
            Self::describe(event)
        );
    }
}

/// Lifecycle driver.
#[derive(Default)]
pub struct Lifecycle {
    phase: LifecyclePhase,
    observers: Vec<Box<dyn LifecycleObserver>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, observer: impl LifecycleObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Move to the next phase and notify observers in registration order.
    pub fn dispatch(&mut self, event: LifecycleEvent) -> Result<()> {
        let next = self.phase.apply(event).ok_or(PlayerError::Lifecycle {
            phase: self.phase,
            event,
        })?;

        self.phase = next;
        for observer in &mut self.observers {
            observer.on_lifecycle(event);
        }
        Ok(())
    }

    /// Create, start and resume.
    pub fn launch(&mut self) -> Result<()> {
        self.dispatch(LifecycleEvent::Create { restored: false })?;
        self.dispatch(LifecycleEvent::Start)?;
        self.dispatch(LifecycleEvent::Resume)
    }

    /// Walk down from wherever the host is to destroyed.
    pub fn shutdown(&mut self) -> Result<()> {
        loop {
            let event = match self.phase {
                LifecyclePhase::Resumed => LifecycleEvent::Pause,
                LifecyclePhase::Started | LifecyclePhase::Paused => LifecycleEvent::Stop,
                LifecyclePhase::Created | LifecyclePhase::Stopped => LifecycleEvent::Destroy,
                LifecyclePhase::Initial | LifecyclePhase::Destroyed => return Ok(()),
            };
            self.dispatch(event)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<LifecycleEvent>>>);

    impl LifecycleObserver for Recorder {
        fn on_lifecycle(&mut self, event: LifecycleEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn recorded() -> (Lifecycle, Arc<Mutex<Vec<LifecycleEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = Lifecycle::new();
        lifecycle.observe(LifecycleLogger::new("test"));
        lifecycle.observe(Recorder(Arc::clone(&seen)));
        (lifecycle, seen)
    }

    #[test]
    fn launch_then_shutdown_visits_every_phase() {
        let (mut lifecycle, seen) = recorded();
        lifecycle.launch().unwrap();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Resumed);

        lifecycle.shutdown().unwrap();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Destroyed);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                LifecycleEvent::Create { restored: false },
                LifecycleEvent::Start,
                LifecycleEvent::Resume,
                LifecycleEvent::Pause,
                LifecycleEvent::Stop,
                LifecycleEvent::Destroy,
            ]
        );
    }

    #[test]
    fn restart_cycle() {
        let (mut lifecycle, _) = recorded();
        lifecycle.launch().unwrap();
        for event in [
            LifecycleEvent::Pause,
            LifecycleEvent::Stop,
            LifecycleEvent::Restart,
            LifecycleEvent::Start,
            LifecycleEvent::Resume,
        ] {
            lifecycle.dispatch(event).unwrap();
        }
        assert_eq!(lifecycle.phase(), LifecyclePhase::Resumed);
    }

    #[test]
    fn illegal_event_is_rejected_without_notifying() {
        let (mut lifecycle, seen) = recorded();
        let err = lifecycle.dispatch(LifecycleEvent::Resume).unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Lifecycle {
                phase: LifecyclePhase::Initial,
                event: LifecycleEvent::Resume
            }
        ));
        assert!(seen.lock().unwrap().is_empty());

        lifecycle.launch().unwrap();
        assert!(lifecycle.dispatch(LifecycleEvent::Destroy).is_err());
        assert_eq!(lifecycle.phase(), LifecyclePhase::Resumed);
    }

    #[test]
    fn restored_create_is_described() {
        assert_eq!(
            LifecycleLogger::describe(LifecycleEvent::Create { restored: true }),
            "create: recreated from saved state"
        );
    }

    #[test]
    fn create_and_destroy_log_at_info() {
        let info = [LifecycleEvent::Create { restored: false }, LifecycleEvent::Destroy];
        for event in info {
            assert_eq!(LifecycleLogger::level(event), log::Level::Info);
        }
        for event in [
            LifecycleEvent::Start,
            LifecycleEvent::Resume,
            LifecycleEvent::Pause,
            LifecycleEvent::Stop,
            LifecycleEvent::Restart,
        ] {
            assert_eq!(LifecycleLogger::level(event), log::Level::Debug);
        }
    }
}
