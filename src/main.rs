//! Headless collage driver: replays a recorded input script against a still
//! image or an album directory and writes the resulting collage as PNG.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

use photo_collage::config::Configuration;
use photo_collage::events::SessionCommand;
use photo_collage::export;
use photo_collage::feedback::{ChannelFeedback, Cue};
use photo_collage::script::Script;
use photo_collage::session::CollageSession;
use photo_collage::source::{AlbumSource, FrameSource, StillImageSource};
use photo_collage::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "photo-collage",
    version,
    about = "Stamp regions of a photo onto a collage by replaying touch input"
)]
struct Args {
    /// Path to YAML config (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Still image, or a directory of images cycled with `next-source`
    #[arg(short, long, value_name = "PATH")]
    source: PathBuf,
    /// YAML input script to replay
    #[arg(long, value_name = "FILE")]
    script: PathBuf,
    /// Where to write the finished collage
    #[arg(short, long, value_name = "FILE", default_value = "collage.png")]
    output: PathBuf,
    /// Deterministic RNG seed for stamp perturbation (overrides the config)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(
            format!("photo_collage={level}")
                .parse()
                .context("invalid log directive")?,
        );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        let album = AlbumSource::scan(path)
            .with_context(|| format!("failed to scan album {}", path.display()))?;
        if album.is_empty() {
            warn!(path = %path.display(), "album has no readable images; nothing will be stamped");
        }
        Ok(Box::new(album))
    } else {
        let still = StillImageSource::open(path)
            .with_context(|| format!("failed to open image {}", path.display()))?;
        Ok(Box::new(still))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        source,
        script,
        output,
        seed,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let mut cfg = match &config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("invalid configuration values")?;
    if seed.is_some() {
        cfg.seed = seed;
    }
    debug!("configuration: {cfg:#?}");

    let source = open_source(&source)?;
    let script = Script::from_yaml_file(&script)?;
    info!(events = script.len(), "loaded input script");

    // Feedback cues are counted rather than played.
    let (cue_tx, mut cue_rx) = mpsc::channel::<Cue>(16);
    let cues = tokio::spawn(async move {
        let mut played = 0usize;
        while cue_rx.recv().await.is_some() {
            played += 1;
            debug!(played, "feedback cue");
        }
        played
    });

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; stopping replay");
            cancel.cancel();
        });
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(64);
    let session = CollageSession::new(cfg, source, Arc::new(ChannelFeedback::new(cue_tx)));
    let session_task = tokio::spawn(tasks::session::run(session, cmd_rx, cancel.clone()));
    let sent = tasks::replay::run(script, cmd_tx, cancel.clone())
        .await
        .context("replay task failed")?;

    let session = session_task
        .await
        .context("session task panicked")?
        .context("session task failed")?;
    info!(
        events = sent,
        stamps = session.stamps_drawn(),
        width = session.canvas().size().width,
        height = session.canvas().size().height,
        "replay complete"
    );

    export::save_png(&output, session.canvas().image())
        .with_context(|| format!("failed to write {}", output.display()))?;
    drop(session);

    match cues.await {
        Ok(played) => info!(played, "feedback cues"),
        Err(err) => warn!("feedback counter failed: {err}"),
    }
    Ok(())
}
