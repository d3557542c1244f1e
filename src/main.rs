//! Replays recorded landmark streams through the measurement pipeline.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};
use pupillary_distance::{
    calibration::{AdjustmentFactors, ReferenceFrame},
    catalog::{FrameStore, YamlFrameStore},
    config::{Config, EXAMPLE_CONFIG},
    replay::RecordingSource,
    runner::FrameLoop,
    session::MeasurementSession,
    Error,
};
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines recording of detector output
    #[arg(short, long, required_unless_present_any = ["print_config", "list_frames"])]
    recording: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Frame catalog file, overrides the configured one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Catalog code of the reference frame worn during the recording
    #[arg(short, long, conflicts_with = "manual_width")]
    frame: Option<String>,

    /// Reference frame width in millimeters, when it is not in the catalog
    #[arg(long)]
    manual_width: Option<f64>,

    /// Alignment box width factor
    #[arg(long, default_value = "1.0")]
    width_factor: f64,

    /// Alignment box height factor
    #[arg(long, default_value = "1.0")]
    height_factor: f64,

    /// Alignment box vertical offset in pixels
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    vertical_offset: f64,

    /// Frame loop rate, overrides the configured one
    #[arg(long)]
    fps: Option<u32>,

    /// Print the capture as JSON
    #[arg(long)]
    json: bool,

    /// List catalog frames and exit
    #[arg(long)]
    list_frames: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(catalog) = &args.catalog {
        config.session.catalog.clone_from(catalog);
    }
    if let Some(fps) = args.fps {
        config.display.target_fps = fps;
    }
    config.validate()?;
    Ok(config)
}

fn reference_frame(args: &Args, config: &Config) -> Result<Option<ReferenceFrame>> {
    if let Some(width) = args.manual_width {
        return Ok(Some(ReferenceFrame::manual(width)?));
    }
    let Some(code) = &args.frame else {
        return Ok(None);
    };
    let store = YamlFrameStore::new(&config.session.catalog);
    let reference = store
        .list()?
        .select(code)
        .with_context(|| format!("Cannot use frame {code}"))?;
    Ok(Some(reference))
}

fn list_frames(config: &Config) -> Result<()> {
    let catalog = YamlFrameStore::new(&config.session.catalog).list()?;
    if catalog.is_empty() {
        println!("No frames in {}", config.session.catalog.display());
    }
    for entry in catalog.entries() {
        println!(
            "{:<12} {:<30} {:>6.1}mm  bridge {:>4.1}mm  lens {:>4.1}mm",
            entry.code,
            entry.label(),
            entry.width_mm,
            entry.bridge_mm,
            entry.lens_height_mm
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let config = load_config(&args)?;
    if args.list_frames {
        return list_frames(&config);
    }

    let mut session = MeasurementSession::new(&config)?;
    session.select_reference_frame(reference_frame(&args, &config)?);
    session.set_adjustment(AdjustmentFactors {
        width_scale: args.width_factor,
        height_scale: args.height_factor,
        vertical_offset: args.vertical_offset,
    });
    let session = Arc::new(Mutex::new(session));

    let recording = args
        .recording
        .as_ref()
        .ok_or_else(|| anyhow!("--recording is required"))?;
    let source = RecordingSource::open(recording)
        .with_context(|| format!("Failed to open {}", recording.display()))?;

    let (tx, rx) = mpsc::channel();
    let frame_loop = FrameLoop::start(Box::new(source), Arc::clone(&session), config.display.target_fps, tx)?;
    for snapshot in rx {
        info!(
            "frame {:>5} {:?}  PD {}  L {} R {}  {}",
            snapshot.frame_index,
            snapshot.state,
            snapshot.formatted.pd,
            snapshot.formatted.left_pd,
            snapshot.formatted.right_pd,
            snapshot.status
        );
    }
    let stats = frame_loop.wait()?;
    info!("Replayed {} frames ({} dropped)", stats.processed, stats.dropped);

    let session = session.lock().map_err(|_| anyhow!("Session lock poisoned"))?;
    match session.capture() {
        Ok(captured) if args.json => println!("{}", serde_json::to_string_pretty(&captured)?),
        Ok(captured) => {
            let f = &captured.formatted;
            println!("PD:      {} mm (L {} / R {})", f.pd, f.left_pd, f.right_pd);
            println!("Heights: L {} / R {} mm", f.left_height, f.right_height);
            println!("Samples: {}", captured.result.samples);
        }
        Err(e @ Error::InsufficientData { .. }) => {
            warn!("{e}");
            println!("No stable measurement: {e}");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
