use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::capabilities::{Recorder, RecorderError, RecorderFactory};

/// Time ffmpeg gets to finalise the container after `q` before it is killed.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
/// An encoder that exits within this window after spawning never started.
const STARTUP_GRACE: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// x11grab capture parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub program: String,
    pub display: String,
    pub width: u32,
    pub height: u32,
    pub fps: f32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            display: ":0.0".to_string(),
            width: 1280,
            height: 720,
            fps: 30.0,
        }
    }
}

impl CaptureSettings {
    fn command_args(&self, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "warning",
            "-y",
            "-f",
            "x11grab",
            "-video_size",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(format!("{}x{}", self.width, self.height).into());
        args.push("-framerate".into());
        args.push(format!("{}", self.fps).into());
        args.push("-i".into());
        args.push(self.display.clone().into());
        for arg in ["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"] {
            args.push(arg.into());
        }
        args.push(output.as_os_str().to_os_string());
        args
    }
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegRecorderFactory {
    settings: CaptureSettings,
}

impl FfmpegRecorderFactory {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    fn create(&self, output_dir: &Path) -> Result<Box<dyn Recorder>, RecorderError> {
        if !output_dir.is_dir() {
            return Err(RecorderError::InvalidOutputDirectory(
                output_dir.to_path_buf(),
            ));
        }
        Ok(Box::new(FfmpegRecorder::new(
            self.settings.clone(),
            output_dir.to_path_buf(),
        )))
    }
}

/// Captures the display into one MP4 clip per start/stop pair.
#[derive(Debug)]
pub struct FfmpegRecorder {
    settings: CaptureSettings,
    output_dir: PathBuf,
    pending_output: Option<PathBuf>,
    child: Option<Child>,
    clips: u32,
}

impl FfmpegRecorder {
    pub fn new(settings: CaptureSettings, output_dir: PathBuf) -> Self {
        Self {
            settings,
            output_dir,
            pending_output: None,
            child: None,
            clips: 0,
        }
    }

    fn next_clip_path(&mut self) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        self.clips += 1;
        self.output_dir
            .join(format!("jar_capture_{stamp}_{:03}.mp4", self.clips))
    }
}

impl Recorder for FfmpegRecorder {
    fn prepare(&mut self) -> Result<(), RecorderError> {
        if self.child.is_some() {
            return Err(RecorderError::AlreadyRunning);
        }
        if !self.output_dir.is_dir() {
            return Err(RecorderError::InvalidOutputDirectory(
                self.output_dir.clone(),
            ));
        }
        let path = self.next_clip_path();
        self.pending_output = Some(path);
        Ok(())
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        if self.child.is_some() {
            return Err(RecorderError::AlreadyRunning);
        }
        let output = self
            .pending_output
            .take()
            .ok_or(RecorderError::NotPrepared)?;

        let mut child = Command::new(&self.settings.program)
            .args(self.settings.command_args(&output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RecorderError::Launch {
                program: self.settings.program.clone(),
                source,
            })?;
        if let Err(err) = confirm_running(&mut child) {
            reap(&mut child);
            return Err(err);
        }
        info!("recording to {}", output.display());
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        let mut child = self.child.take().ok_or(RecorderError::NotRunning)?;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(b"q") {
                warn!("could not ask ffmpeg to finish: {err}");
            }
        }

        let deadline = Instant::now() + STOP_TIMEOUT;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    reap(&mut child);
                    return Err(err.into());
                }
            }
            if Instant::now() >= deadline {
                warn!("ffmpeg did not exit within {STOP_TIMEOUT:?}; killing it");
                child.kill()?;
                break child.wait()?;
            }
            thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            Ok(())
        } else {
            Err(RecorderError::EncoderExit(status))
        }
    }

    fn is_recording(&self) -> bool {
        self.child.is_some()
    }
}

fn confirm_running(child: &mut Child) -> Result<(), RecorderError> {
    let deadline = Instant::now() + STARTUP_GRACE;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Err(RecorderError::EncoderExit(status));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

/// Kill and wait for a child that will not be kept.
fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("killing encoder failed: {err}");
    }
    if let Err(err) = child.wait() {
        debug!("waiting for encoder failed: {err}");
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(err) = self.stop() {
                warn!("stopping ffmpeg on drop failed: {err}");
            }
        }
    }
}
