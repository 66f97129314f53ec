use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use env_logger::Env;
use jar_engine::recorder::FfmpegRecorderFactory;
use jar_engine::scene_config::SceneConfig;
use jar_engine::{DirectoryWatcher, EventDispatcher, RecordingSession, Stage, WatchExit};
use log::{error, info, warn};

mod cli;
use cli::RunConfig;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let result = cli::parse().and_then(run);
    match result {
        Ok(WatchExit::Stopped | WatchExit::ScanLimitReached) => ExitCode::SUCCESS,
        Ok(WatchExit::DirectoryMissing) => ExitCode::from(2),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(config: RunConfig) -> Result<WatchExit> {
    if !config.watch.directory.is_dir() {
        bail!(
            "watched directory {} does not exist",
            config.watch.directory.display()
        );
    }

    let scene = match &config.scene {
        Some(path) => SceneConfig::from_json_file(path)
            .with_context(|| format!("loading scene {}", path.display()))?,
        None => SceneConfig::builtin(),
    };
    let (stage, registry) = scene.build().context("building stage from scene")?;
    info!(
        "stage ready with {} actor(s): {}",
        registry.len(),
        registry
            .iter()
            .map(|(_, entry)| entry.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    match &config.recording_dir {
        Some(dir) if !dir.is_dir() => warn!(
            "recording directory {} does not exist; recording requests will be ignored",
            dir.display()
        ),
        Some(dir) => info!("recording clips to {}", dir.display()),
        None => info!("no recording directory configured; recording disabled"),
    }
    let recording = RecordingSession::new(
        config.recording_dir.clone(),
        Box::new(FfmpegRecorderFactory::new(config.capture.clone())),
    );

    let mut dispatcher = EventDispatcher::new(stage, registry, recording);
    let mut watcher = DirectoryWatcher::new(config.watch.clone());
    // No signal handling; an interrupt ends the process directly.
    let stop = AtomicBool::new(false);
    let exit = watcher.run(&mut dispatcher, &stop);
    info!("watcher finished after {} scan(s): {exit:?}", watcher.scans());

    if let Err(err) = dispatcher.shutdown() {
        warn!("stopping recording on exit failed: {err}");
    }
    if let Some(path) = &config.state_json {
        write_snapshot(&dispatcher, path)?;
    }
    Ok(exit)
}

fn write_snapshot<S: Stage>(dispatcher: &EventDispatcher<S>, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&dispatcher.snapshot())
        .context("serializing stage snapshot to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing stage snapshot to {}", path.display()))?;
    info!("saved stage snapshot to {}", path.display());
    Ok(())
}
