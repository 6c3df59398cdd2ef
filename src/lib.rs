pub mod audio;
pub mod config;
pub mod console;
pub mod lifecycle;

use std::io;
use std::sync::Arc;

use clap::Parser;

use audio::engine::AudioEngineHandle;
use audio::error::Result;
use audio::loader::StreamLoader;
use audio::{output, RequestHandler};
use config::Args;
use console::{spawn_stdin_reader, Console};
use lifecycle::{Lifecycle, LifecycleLogger};

/// Environment variable that overrides `--log-level` with env_logger filters.
pub const LOG_ENV: &str = "URLPLAY_LOG";

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let loader = Arc::new(StreamLoader::new()?);
    let silent = args.silent;
    let engine = Arc::new(AudioEngineHandle::spawn(
        move || output::open_default(silent),
        loader,
        event_tx,
    )?);
    engine.set_volume(args.volume_fraction());

    let mut lifecycle = Lifecycle::new();
    lifecycle.observe(LifecycleLogger::new(env!("CARGO_PKG_NAME")));
    lifecycle.observe(Arc::clone(&engine));
    lifecycle.launch()?;

    let handler = RequestHandler::new(Arc::clone(&engine), args.default_url.clone());
    let mut console = Console::new(handler, io::stdout(), args.json);
    console.greet()?;
    if let Some(url) = &args.url {
        console.submit(url)?;
    }

    let lines = spawn_stdin_reader()?;
    let result = console.run(lines, event_rx);

    lifecycle.shutdown()?;
    result?;
    log::info!("Bye");
    Ok(())
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(args.log_level).parse_env(LOG_ENV);
    if builder.try_init().is_err() {
        log::warn!("Logger already initialized");
    }
}
