use clap::Parser;
use log::LevelFilter;

use crate::audio::DEFAULT_TRACK_URL;

/// Stream and play a song from a URL
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL to start playing right away
    pub url: Option<String>,

    /// song played when an empty line is submitted
    #[arg(short, long, default_value = DEFAULT_TRACK_URL)]
    pub default_url: String,

    /// initial volume, in percent
    #[arg(
        short,
        long,
        default_value_t = 100,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub volume: u8,

    /// do not open a sound device
    #[arg(short, long)]
    pub silent: bool,

    /// print events and status as JSON lines
    #[arg(long)]
    pub json: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn volume_fraction(&self) -> f32 {
        f32::from(self.volume) / 100.0
    }
}
