//! Recorder implementations: an `ffmpeg` screen grab for live use and a
//! scripted recorder that logs calls for tests and dry runs.

mod ffmpeg;
pub mod scripted;

pub use ffmpeg::{CaptureSettings, FfmpegRecorder, FfmpegRecorderFactory};
