use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use jar_descriptor::DESCRIPTOR_EXTENSION;
use jar_engine::recorder::CaptureSettings;
use jar_engine::WatchSettings;

#[derive(Parser, Debug)]
#[command(
    about = "Applies actor/animation descriptors dropped into a directory to the stage",
    version
)]
pub struct Args {
    /// Directory the producer writes descriptors into (must already exist)
    #[arg(long)]
    pub watch_dir: PathBuf,

    /// Descriptor file extension, matched case-insensitively
    #[arg(long, default_value = DESCRIPTOR_EXTENSION)]
    pub extension: String,

    /// Milliseconds between directory scans
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Directory for recorded clips; recording is disabled without it
    #[arg(long)]
    pub recording_dir: Option<PathBuf>,

    /// JSON scene file with the camera and actor bindings (default: built-in scene)
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Encoder executable used for recording
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// X11 display captured while recording
    #[arg(long, default_value = ":0.0")]
    pub capture_display: String,

    /// Capture size as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720")]
    pub capture_size: String,

    /// Capture frame rate
    #[arg(long, default_value_t = 30.0)]
    pub capture_fps: f32,

    /// Stop after this many scans
    #[arg(long)]
    pub max_scans: Option<u64>,

    /// Path to write the final stage snapshot as JSON
    #[arg(long)]
    pub state_json: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunConfig {
    pub watch: WatchSettings,
    pub recording_dir: Option<PathBuf>,
    pub scene: Option<PathBuf>,
    pub capture: CaptureSettings,
    pub state_json: Option<PathBuf>,
}

pub fn parse() -> Result<RunConfig> {
    Args::parse().into_config()
}

impl Args {
    fn into_config(self) -> Result<RunConfig> {
        if self.poll_interval_ms == 0 {
            bail!("--poll-interval-ms must be greater than zero");
        }
        if self.capture_fps.is_nan() || self.capture_fps <= 0.0 {
            bail!("--capture-fps must be positive");
        }
        let (width, height) = parse_capture_size(&self.capture_size)
            .with_context(|| format!("parsing --capture-size {}", self.capture_size))?;
        let extension = self.extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            bail!("--extension must not be empty");
        }

        Ok(RunConfig {
            watch: WatchSettings {
                directory: self.watch_dir,
                extension,
                interval: Duration::from_millis(self.poll_interval_ms),
                max_scans: self.max_scans,
            },
            recording_dir: self.recording_dir,
            scene: self.scene,
            capture: CaptureSettings {
                program: self.ffmpeg,
                display: self.capture_display,
                width,
                height,
                fps: self.capture_fps,
            },
            state_json: self.state_json,
        })
    }
}

fn parse_capture_size(value: &str) -> Result<(u32, u32)> {
    let Some((width, height)) = value.split_once(['x', 'X']) else {
        bail!("expected WIDTHxHEIGHT");
    };
    let width: u32 = width.trim().parse().context("invalid width")?;
    let height: u32 = height.trim().parse().context("invalid height")?;
    if width == 0 || height == 0 {
        bail!("capture size must be non-zero");
    }
    Ok((width, height))
}
