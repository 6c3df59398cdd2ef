//! Media preparation: fetch the whole resource, then probe it.
//!
//! Loading runs on a worker thread per session, so implementations must be
//! `Send + Sync` and may block. A stopped session cancels its token and the
//! loader gives up at the next chunk boundary.

use std::fs::File;
use std::io::{Cursor, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::error::{PlayerError, Result};
use crate::audio::source::TrackSource;

/// What the probe learned about the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MediaInfo {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    pub duration_secs: Option<f64>,
}

/// A fully fetched track, ready to hand to an output.
#[derive(Debug, Clone)]
pub struct PreparedMedia {
    pub source: TrackSource,
    pub data: Bytes,
    pub info: MediaInfo,
}

/// Size of each read while fetching a resource.
const CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound for preallocating from a `Content-Length`.
const MAX_PREALLOC: u64 = 32 * 1024 * 1024;

/// Shared flag telling a preparation to stop early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub trait MediaLoader: Send + Sync {
    /// Fetch and probe `source`. Returns [`PlayerError::Cancelled`] once
    /// `cancel` is set.
    fn load(&self, source: &TrackSource, cancel: &CancelToken) -> Result<PreparedMedia>;
}

/// Read `reader` to the end in chunks, checking `cancel` between them.
pub fn read_cancellable<R: Read>(
    mut reader: R,
    size_hint: Option<u64>,
    cancel: &CancelToken,
) -> Result<Bytes> {
    let capacity = size_hint.unwrap_or(0).min(MAX_PREALLOC) as usize;
    let mut data = Vec::with_capacity(capacity);
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        if cancel.is_cancelled() {
            log::debug!("Preparation cancelled after {} bytes", data.len());
            return Err(PlayerError::Cancelled);
        }
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => data.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Bytes::from(data))
}

/// Loader backed by a blocking HTTP client and the local filesystem.
pub struct StreamLoader {
    client: reqwest::blocking::Client,
}

impl StreamLoader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Bytes> {
        log::debug!("Loading HTTP stream: {}", url);

        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(PlayerError::HttpStatus(response.status()));
        }

        let length = response.content_length();
        let bytes = read_cancellable(response, length, cancel)?;
        log::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes)
    }
}

impl MediaLoader for StreamLoader {
    fn load(&self, source: &TrackSource, cancel: &CancelToken) -> Result<PreparedMedia> {
        let data = match source {
            TrackSource::HttpStream { url } => self.fetch(url, cancel)?,
            TrackSource::LocalFile { path } => {
                log::debug!("Loading local file: {}", path.display());
                let file = File::open(path)?;
                let length = file.metadata().ok().map(|m| m.len());
                read_cancellable(file, length, cancel)?
            }
        };

        let info = probe(&data, source.extension().as_deref())?;
        Ok(PreparedMedia {
            source: source.clone(),
            data,
            info,
        })
    }
}

/// Identify the container and default audio track of `data`.
pub fn probe(data: &Bytes, extension: Option<&str>) -> Result<MediaInfo> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let stream = MediaSourceStream::new(Box::new(Cursor::new(data.clone())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::Decode(e.to_string()))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| PlayerError::Decode("no audio track".into()))?;
    let params = &track.codec_params;

    let codec = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string());

    let duration_secs = match (params.time_base, params.n_frames) {
        (Some(time_base), Some(frames)) => {
            let time = time_base.calc_time(frames);
            Some(time.seconds as f64 + time.frac)
        }
        _ => None,
    };

    Ok(MediaInfo {
        codec,
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count()),
        duration_secs,
    })
}
