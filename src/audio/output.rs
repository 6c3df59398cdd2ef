//! Audio outputs the controller plays prepared media through.

use std::time::{Duration, Instant};

use crate::audio::error::Result;
use crate::audio::loader::PreparedMedia;

/// The single media-player handle owned by the controller.
///
/// Implementations live on the engine thread and need not be `Send`.
pub trait AudioOutput {
    /// Replace whatever is playing with `media` and start it, once.
    fn play(&mut self, media: &PreparedMedia) -> Result<()>;
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// True when nothing is queued on the output any more.
    fn is_finished(&self) -> bool;
}

/// Open the output used by the binary.
pub fn open_default(silent: bool) -> Result<Box<dyn AudioOutput>> {
    if silent {
        log::info!("Using silent output");
        return Ok(Box::new(SilentOutput::new()));
    }
    open_device()
}

#[cfg(feature = "playback")]
fn open_device() -> Result<Box<dyn AudioOutput>> {
    Ok(Box::new(device::RodioOutput::open()?))
}

#[cfg(not(feature = "playback"))]
fn open_device() -> Result<Box<dyn AudioOutput>> {
    log::warn!("Built without the `playback` feature, falling back to silent output");
    Ok(Box::new(SilentOutput::new()))
}

#[cfg(feature = "playback")]
pub use device::RodioOutput;

#[cfg(feature = "playback")]
mod device {
    use std::io::Cursor;

    use rodio::{Decoder, OutputStream, Sink};

    use super::AudioOutput;
    use crate::audio::error::{PlayerError, Result};
    use crate::audio::loader::PreparedMedia;

    /// Default sound device through rodio.
    ///
    /// `OutputStream` is not `Send`, so this must be opened on the thread
    /// that uses it.
    pub struct RodioOutput {
        _stream: OutputStream,
        sink: Sink,
    }

    impl RodioOutput {
        pub fn open() -> Result<Self> {
            let (stream, stream_handle) = OutputStream::try_default()
                .map_err(|e| PlayerError::Output(e.to_string()))?;
            let sink =
                Sink::try_new(&stream_handle).map_err(|e| PlayerError::Output(e.to_string()))?;

            log::info!("Audio output opened");
            Ok(Self {
                _stream: stream,
                sink,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn play(&mut self, media: &PreparedMedia) -> Result<()> {
            let decoder = Decoder::new(Cursor::new(media.data.clone()))
                .map_err(|e| PlayerError::Decode(e.to_string()))?;

            self.sink.stop();
            self.sink.append(decoder);
            self.sink.play();
            Ok(())
        }

        fn stop(&mut self) {
            self.sink.stop();
        }

        fn set_volume(&mut self, volume: f32) {
            self.sink.set_volume(volume);
        }

        fn is_finished(&self) -> bool {
            self.sink.empty()
        }
    }
}

/// Output without a device. A track "plays" for its probed duration, or
/// until stopped when the duration is unknown.
pub struct SilentOutput {
    started: Option<Instant>,
    length: Option<Duration>,
}

impl SilentOutput {
    pub fn new() -> Self {
        Self {
            started: None,
            length: None,
        }
    }
}

impl Default for SilentOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for SilentOutput {
    fn play(&mut self, media: &PreparedMedia) -> Result<()> {
        self.started = Some(Instant::now());
        self.length = media
            .info
            .duration_secs
            .map(Duration::from_secs_f64);
        Ok(())
    }

    fn stop(&mut self) {
        self.started = None;
        self.length = None;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn is_finished(&self) -> bool {
        match (self.started, self.length) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(started), Some(length)) => started.elapsed() >= length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::loader::MediaInfo;
    use crate::audio::source::TrackSource;
    use bytes::Bytes;

    fn media(duration_secs: Option<f64>) -> PreparedMedia {
        PreparedMedia {
            source: TrackSource::HttpStream {
                url: "https://example.com/a.ogg".into(),
            },
            data: Bytes::new(),
            info: MediaInfo {
                duration_secs,
                ..Default::default()
            },
        }
    }

    #[test]
    fn silent_output_finishes_after_duration() {
        let mut output = SilentOutput::new();
        assert!(output.is_finished());

        output.play(&media(Some(0.0))).unwrap();
        assert!(output.is_finished());

        output.play(&media(Some(3600.0))).unwrap();
        assert!(!output.is_finished());

        output.stop();
        assert!(output.is_finished());
    }

    #[test]
    fn silent_output_unknown_length_plays_until_stopped() {
        let mut output = SilentOutput::new();
        output.play(&media(None)).unwrap();
        assert!(!output.is_finished());
        output.stop();
        assert!(output.is_finished());
    }
}
