//! Terminal front end: one input line, transient status messages.

use std::io::{self, BufRead, Write};
use std::thread;

use crossbeam_channel::{never, select, unbounded, Receiver};
use serde_json::json;

use crate::audio::{Notice, PlaybackControl, PlayerEvent, PlayerStatus, RequestHandler};

const HELP: &str = "\
Enter a URL to play it, or an empty line for the default song.
Submitting again stops playback.
  :status        show what is playing
  :volume <pct>  set volume (0-100)
  :help          this text
  :quit          exit";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console<P, W> {
    handler: RequestHandler<P>,
    out: W,
    json: bool,
}

impl<P: PlaybackControl, W: Write> Console<P, W> {
    pub fn new(handler: RequestHandler<P>, out: W, json: bool) -> Self {
        Self { handler, out, json }
    }

    pub fn handler(&self) -> &RequestHandler<P> {
        &self.handler
    }

    pub fn greet(&mut self) -> io::Result<()> {
        if !self.json {
            writeln!(self.out, "{HELP}")?;
        }
        Ok(())
    }

    /// Handle input lines and player events on the calling thread until the
    /// input ends or `:quit` is entered.
    pub fn run(
        &mut self,
        lines: Receiver<String>,
        mut events: Receiver<PlayerEvent>,
    ) -> io::Result<()> {
        loop {
            let mut events_closed = false;
            select! {
                recv(lines) -> line => match line {
                    Ok(line) => {
                        if self.handle_line(&line)? == Flow::Quit {
                            return Ok(());
                        }
                    }
                    Err(_) => {
                        // show whatever the player reported before input ended
                        for event in events.try_iter() {
                            self.handle_event(&event)?;
                        }
                        return Ok(());
                    }
                },
                recv(events) -> event => match event {
                    Ok(event) => self.handle_event(&event)?,
                    Err(_) => events_closed = true,
                },
            }
            if events_closed {
                log::debug!("Event stream closed");
                events = never();
            }
        }
    }

    /// Submit a line to the request handler and show the resulting notice.
    pub fn submit(&mut self, line: &str) -> io::Result<Notice> {
        let notice = self.handler.submit(line);
        if self.json {
            let value = match &notice {
                Notice::Starting(url) => json!({ "notice": "starting", "url": url }),
                Notice::Stopping(url) => json!({ "notice": "stopping", "url": url }),
                Notice::InvalidUrl(input) => json!({ "notice": "invalid-url", "input": input }),
                Notice::Unavailable(reason) => json!({ "notice": "unavailable", "reason": reason }),
            };
            writeln!(self.out, "{value}")?;
        } else {
            writeln!(self.out, "» {notice}")?;
        }
        Ok(notice)
    }

    fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let Some(command) = line.trim().strip_prefix(':') else {
            self.submit(line)?;
            return Ok(Flow::Continue);
        };

        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or_default() {
            "q" | "quit" => return Ok(Flow::Quit),
            "s" | "status" => self.show_status()?,
            "v" | "volume" => match parts.next().and_then(|v| v.parse::<u8>().ok()) {
                Some(pct) if pct <= 100 => {
                    self.handler.player().set_volume(f32::from(pct) / 100.0);
                    if !self.json {
                        writeln!(self.out, "» Volume {pct}%")?;
                    }
                }
                _ => writeln!(self.out, "» Volume must be a number from 0 to 100")?,
            },
            "h" | "help" => writeln!(self.out, "{HELP}")?,
            other => writeln!(self.out, "» Unknown command :{other} (try :help)")?,
        }
        Ok(Flow::Continue)
    }

    fn handle_event(&mut self, event: &PlayerEvent) -> io::Result<()> {
        match event {
            PlayerEvent::Ended { session, .. } | PlayerEvent::Failed { session, .. } => {
                self.handler.session_ended(*session)
            }
            _ => {}
        }

        if self.json {
            let line = serde_json::to_string(event).map_err(io::Error::from)?;
            writeln!(self.out, "{line}")
        } else if matches!(event, PlayerEvent::StateChanged { .. }) {
            Ok(())
        } else {
            writeln!(self.out, "» {event}")
        }
    }

    fn show_status(&mut self) -> io::Result<()> {
        let status = self.handler.player().status();
        if self.json {
            let line = serde_json::to_string(&status).map_err(io::Error::from)?;
            return writeln!(self.out, "{line}");
        }
        writeln!(self.out, "» {}", describe(&status))
    }
}

fn describe(status: &PlayerStatus) -> String {
    let mut text = status.state.to_string();
    if let Some(url) = status.url.as_deref().filter(|_| status.state.is_active()) {
        text.push(' ');
        text.push_str(url);
    }
    if status.state.is_active() {
        match status.duration_secs {
            Some(total) => text.push_str(&format!(" {:.1}s / {:.1}s", status.position_secs, total)),
            None => text.push_str(&format!(" {:.1}s", status.position_secs)),
        }
    }
    text.push_str(&format!(", volume {:.0}%", status.volume * 100.0));
    if let Some(error) = &status.error {
        text.push_str(&format!(", last error: {error}"));
    }
    text
}

/// Read stdin on its own thread; the channel closes at end of input.
pub fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("urlplay-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        ActiveSession, PlaybackRequest, PlaybackState, Result, SessionId, DEFAULT_TRACK_URL,
    };
    use std::cell::RefCell;

    #[derive(Default)]
    struct Stub {
        volume: RefCell<Option<f32>>,
    }

    impl PlaybackControl for Stub {
        fn start(&self, url: &str) -> Result<ActiveSession> {
            Ok(ActiveSession {
                id: SessionId(1),
                request: PlaybackRequest::parse(url)?,
            })
        }

        fn stop(&self) {}

        fn set_volume(&self, volume: f32) {
            *self.volume.borrow_mut() = Some(volume);
        }

        fn status(&self) -> PlayerStatus {
            PlayerStatus {
                state: PlaybackState::Playing,
                url: Some(DEFAULT_TRACK_URL.into()),
                session: SessionId(1),
                position_secs: 12.0,
                duration_secs: Some(372.0),
                volume: 0.5,
                error: None,
            }
        }
    }

    fn console(json: bool) -> Console<Stub, Vec<u8>> {
        Console::new(RequestHandler::new(Stub::default(), DEFAULT_TRACK_URL), Vec::new(), json)
    }

    fn output(console: &Console<Stub, Vec<u8>>) -> String {
        String::from_utf8(console.out.clone()).unwrap()
    }

    fn feed(console: &mut Console<Stub, Vec<u8>>, lines: &[&str], events: Vec<PlayerEvent>) {
        let (line_tx, line_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        for event in events {
            event_tx.send(event).unwrap();
        }
        drop(event_tx);
        for line in lines {
            line_tx.send(line.to_string()).unwrap();
        }
        drop(line_tx);
        console.run(line_rx, event_rx).unwrap();
    }

    #[test]
    fn empty_line_starts_default_song() {
        let mut c = console(false);
        c.handle_line("").unwrap();
        assert!(c.handler().has_session());
        assert_eq!(output(&c), format!("» Loading {DEFAULT_TRACK_URL}\n"));
    }

    #[test]
    fn quit_stops_reading() {
        let mut c = console(false);
        feed(&mut c, &[":quit", "https://example.com/a.mp3"], Vec::new());
        assert!(!c.handler().has_session());
    }

    #[test]
    fn volume_and_status_commands() {
        let mut c = console(false);
        c.handle_line(":volume 40").unwrap();
        assert_eq!(*c.handler().player().volume.borrow(), Some(0.4));

        c.handle_line(":volume 400").unwrap();
        assert_eq!(*c.handler().player().volume.borrow(), Some(0.4));

        c.handle_line(":status").unwrap();
        let text = output(&c);
        assert!(text.contains(&format!("playing {DEFAULT_TRACK_URL} 12.0s / 372.0s, volume 50%")));
    }

    #[test]
    fn track_end_clears_session() {
        let mut c = console(false);
        c.handle_line("https://example.com/a.mp3").unwrap();
        c.handle_event(&PlayerEvent::Ended {
            session: SessionId(1),
            url: "https://example.com/a.mp3".into(),
        })
        .unwrap();
        assert!(!c.handler().has_session());
        assert!(output(&c).ends_with("» Finished https://example.com/a.mp3\n"));
    }

    #[test]
    fn end_of_another_session_is_ignored() {
        let mut c = console(false);
        c.handle_line("https://example.com/a.mp3").unwrap();
        c.handle_event(&PlayerEvent::Failed {
            session: SessionId(0),
            url: "https://example.com/a.mp3".into(),
            message: "stale".into(),
        })
        .unwrap();
        assert!(c.handler().has_session());
    }

    #[test]
    fn json_mode_prints_events() {
        let mut c = console(true);
        feed(
            &mut c,
            &[],
            vec![PlayerEvent::StateChanged {
                session: SessionId(2),
                state: PlaybackState::Idle,
            }],
        );
        let text = output(&c);
        let value: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(value["type"], "state-changed");
        assert_eq!(value["state"], "idle");
    }

    #[test]
    fn invalid_url_is_reported() {
        let mut c = console(false);
        c.handle_line("song.mp3").unwrap();
        assert_eq!(output(&c), "» Invalid URL song.mp3\n");
        assert!(!c.handler().has_session());
    }
}
