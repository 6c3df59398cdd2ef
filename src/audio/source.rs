//! Playback requests and the sources they resolve to.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::audio::error::{PlayerError, Result};

/// Song played when the user submits an empty line.
pub const DEFAULT_TRACK_URL: &str =
    "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";

/// A validated request to play the song behind `url`.
///
/// Only constructible through [`PlaybackRequest::parse`], so holding one means
/// the URL has already been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    url: Url,
}

impl PlaybackRequest {
    /// Accepts `http`/`https` URLs with a host and `file` URLs that name a
    /// local path.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| PlayerError::InvalidUrl(format!("{input} ({e})")))?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(Self { url }),
            "file" if url.to_file_path().is_ok() => Ok(Self { url }),
            "file" => Err(PlayerError::InvalidUrl(format!("{input} (not a local path)"))),
            "http" | "https" => Err(PlayerError::InvalidUrl(format!("{input} (missing host)"))),
            other => Err(PlayerError::InvalidUrl(format!(
                "{input} (unsupported scheme `{other}`)"
            ))),
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Resolve the request into the source the loader reads from.
    pub fn source(&self) -> Result<TrackSource> {
        match self.url.scheme() {
            "file" => {
                let path = self
                    .url
                    .to_file_path()
                    .map_err(|_| PlayerError::InvalidUrl(self.url.to_string()))?;
                Ok(TrackSource::LocalFile { path })
            }
            _ => Ok(TrackSource::HttpStream {
                url: self.url.to_string(),
            }),
        }
    }
}

impl fmt::Display for PlaybackRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Represents the source of an audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    /// HTTP/HTTPS stream
    HttpStream { url: String },
    /// Local file on disk
    LocalFile { path: PathBuf },
}

impl TrackSource {
    /// File extension of the resource, used as a format hint when probing.
    pub fn extension(&self) -> Option<String> {
        let ext = match self {
            TrackSource::HttpStream { url } => {
                let path = Url::parse(url).ok()?.path().to_owned();
                Path::new(&path).extension()?.to_str()?.to_owned()
            }
            TrackSource::LocalFile { path } => path.extension()?.to_str()?.to_owned(),
        };
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSource::HttpStream { url } => f.write_str(url),
            TrackSource::LocalFile { path } => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_https_and_file() {
        for url in [
            DEFAULT_TRACK_URL,
            "http://radio.example.org:8000/live.ogg",
            "file:///tmp/song.flac",
        ] {
            assert!(PlaybackRequest::parse(url).is_ok(), "{url} should be valid");
        }
    }

    #[test]
    fn rejects_garbage_and_other_schemes() {
        for url in [
            "",
            "not a url",
            "www.example.com/a.mp3",
            "ftp://host/a.mp3",
            "http://",
            "file://example.com/song.mp3",
        ] {
            assert!(
                matches!(PlaybackRequest::parse(url), Err(PlayerError::InvalidUrl(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn resolves_sources() {
        let http = PlaybackRequest::parse(DEFAULT_TRACK_URL).unwrap();
        assert_eq!(
            http.source().unwrap(),
            TrackSource::HttpStream {
                url: DEFAULT_TRACK_URL.to_string()
            }
        );

        let file = PlaybackRequest::parse("file:///tmp/song.flac").unwrap();
        assert_eq!(
            file.source().unwrap(),
            TrackSource::LocalFile {
                path: PathBuf::from("/tmp/song.flac")
            }
        );
    }

    #[test]
    fn extension_hint_ignores_query() {
        let source = TrackSource::HttpStream {
            url: "https://cdn.example.com/tracks/One.MP3?token=abc".into(),
        };
        assert_eq!(source.extension().as_deref(), Some("mp3"));

        let source = TrackSource::HttpStream {
            url: "https://cdn.example.com/stream".into(),
        };
        assert_eq!(source.extension(), None);
    }
}
