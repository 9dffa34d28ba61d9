#![forbid(unsafe_code)]

//! Headless walkthrough host.
//!
//! Runs one viewer session against the scriptable runtime: optionally a
//! controller connects after a delay, names are submitted, and the session
//! summary is logged on exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use walkthrough_viewer::{
    dwell_gaze_factory, BlockTextBuilder, Collaborators, FsAssetLoader, HeadlessRenderer,
    SessionContext, TextInput, Viewer, ViewerConfig,
};
use walkthrough_xr::{ControllerIndex, HeadlessRuntime};

#[derive(Parser, Debug)]
#[command(name = "walkthrough")]
#[command(about = "Immersive walkthrough viewer (headless host)")]
struct Args {
    /// JSON viewer config; defaults are used when omitted
    #[arg(long, env = "WALKTHROUGH_CONFIG")]
    config: Option<PathBuf>,

    /// Asset root directory
    #[arg(long, env = "WALKTHROUGH_ASSETS")]
    assets: Option<PathBuf>,

    /// Milliseconds to wait for a controller before falling back to gaze
    #[arg(long)]
    controller_timeout_ms: Option<u64>,

    /// Stop after this many seconds (runs until Ctrl-C when omitted)
    #[arg(long)]
    run_for_secs: Option<u64>,

    /// Simulate a controller connecting after this many milliseconds
    #[arg(long)]
    connect_after_ms: Option<u64>,

    /// Start as if an immersive session were presenting
    #[arg(long, default_value_t = false)]
    presenting: bool,

    /// Submit this name through the screen button
    #[arg(long)]
    name: Option<String>,

    /// Type this into the in-world panel and submit it
    #[arg(long)]
    panel_text: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    walkthrough_common::init_tracing_with_default(&args.log_level);

    let mut config = ViewerConfig::load(args.config.as_deref())?;
    if let Some(root) = args.assets {
        config.assets.root = root;
    }
    if let Some(timeout) = args.controller_timeout_ms {
        config.xr.controller_timeout_ms = timeout;
    }

    let (runtime, xr) = if args.presenting {
        HeadlessRuntime::presenting()
    } else {
        HeadlessRuntime::new()
    };
    let gaze = dwell_gaze_factory(config.gaze.clone());
    let session = SessionContext::new(
        config,
        Collaborators {
            runtime: Box::new(runtime),
            gaze,
            renderer: Box::new(HeadlessRenderer::new()),
        },
    );
    let viewer = Viewer::new(session, Arc::new(FsAssetLoader), Arc::new(BlockTextBuilder));
    let handle = viewer.handle();

    if let Some(delay) = args.connect_after_ms {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            info!("simulating controller connect");
            xr.connect(ControllerIndex::Primary);
        });
    }
    if let Some(name) = args.name {
        handle.display_name(Some(name));
    }
    if let Some(text) = args.panel_text {
        handle.panel_input(TextInput::Set(text));
        handle.panel_submit();
    }

    let run_for = args.run_for_secs;
    let stopper = handle.clone();
    tokio::spawn(async move {
        match run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("ctrl-c handler failed: {}", err);
                }
            }
        }
        stopper.shutdown();
    });

    let summary = viewer.run().await;
    info!(
        "session {} finished: modality={} frames={} label={:?} connected={:?} panel_visible={}",
        summary.session_id,
        summary.modality,
        summary.frames,
        summary.label,
        summary.connected,
        summary.panel_visible
    );
    Ok(())
}
