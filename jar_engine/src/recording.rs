//! Two-state recording session over a lazily built [`Recorder`].

use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::capabilities::{Recorder, RecorderError, RecorderFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingPhase {
    #[default]
    Idle,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadyRecording,
    AlreadyStopped,
    RecorderUnavailable,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IgnoreReason::AlreadyRecording => "already recording",
            IgnoreReason::AlreadyStopped => "already stopped",
            IgnoreReason::RecorderUnavailable => "recorder unavailable",
        })
    }
}

/// Effect of a start/stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    StartRecording,
    StopRecording,
    Ignore(IgnoreReason),
}

impl RecordingPhase {
    /// Pure state machine step; redundant requests leave the phase unchanged.
    pub fn transition(self, start: bool) -> (RecordingPhase, RecordAction) {
        match (self, start) {
            (RecordingPhase::Idle, true) => (RecordingPhase::Recording, RecordAction::StartRecording),
            (RecordingPhase::Idle, false) => (
                RecordingPhase::Idle,
                RecordAction::Ignore(IgnoreReason::AlreadyStopped),
            ),
            (RecordingPhase::Recording, true) => (
                RecordingPhase::Recording,
                RecordAction::Ignore(IgnoreReason::AlreadyRecording),
            ),
            (RecordingPhase::Recording, false) => (RecordingPhase::Idle, RecordAction::StopRecording),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("recorder could not be constructed: {0}")]
    Construction(#[source] RecorderError),
    #[error("recorder {operation} failed: {source}")]
    Recorder {
        operation: &'static str,
        #[source]
        source: RecorderError,
    },
}

enum RecorderSlot {
    Unbuilt,
    Ready(Box<dyn Recorder>),
    /// Construction failed; the message is kept until `reconfigure`.
    Failed(String),
}

/// Owns the recording phase and the recorder built on the first start.
pub struct RecordingSession {
    phase: RecordingPhase,
    output_dir: Option<PathBuf>,
    factory: Box<dyn RecorderFactory>,
    slot: RecorderSlot,
}

impl RecordingSession {
    pub fn new(output_dir: Option<PathBuf>, factory: Box<dyn RecorderFactory>) -> Self {
        Self {
            phase: RecordingPhase::Idle,
            output_dir,
            factory,
            slot: RecorderSlot::Unbuilt,
        }
    }

    pub fn phase(&self) -> RecordingPhase {
        self.phase
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Reason recording is disabled, if construction already failed.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.slot {
            RecorderSlot::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Apply a start (`true`) or stop (`false`) request.
    ///
    /// On error the phase is unchanged, except that a failed stop which still
    /// leaves the recorder idle ends the recording.
    pub fn handle(&mut self, start: bool) -> Result<RecordAction, RecordingError> {
        if let RecorderSlot::Failed(reason) = &self.slot {
            info!("recording request ignored: recorder unavailable ({reason})");
            return Ok(RecordAction::Ignore(IgnoreReason::RecorderUnavailable));
        }

        let (next, action) = self.phase.transition(start);
        match action {
            RecordAction::StartRecording => {
                let recorder = self.ensure_recorder()?;
                recorder
                    .prepare()
                    .map_err(|source| RecordingError::Recorder {
                        operation: "prepare",
                        source,
                    })?;
                recorder.start().map_err(|source| RecordingError::Recorder {
                    operation: "start",
                    source,
                })?;
                info!("recording started");
            }
            RecordAction::StopRecording => {
                if let RecorderSlot::Ready(recorder) = &mut self.slot {
                    if let Err(source) = recorder.stop() {
                        // The capture is over once the recorder reports idle.
                        if !recorder.is_recording() {
                            warn!("recorder ended with an error; recording session is idle");
                            self.phase = RecordingPhase::Idle;
                        }
                        return Err(RecordingError::Recorder {
                            operation: "stop",
                            source,
                        });
                    }
                }
                info!("recording stopped");
            }
            RecordAction::Ignore(reason) => {
                info!("recording request ignored: {reason}");
            }
        }
        self.phase = next;
        Ok(action)
    }

    /// Point the session at a new output directory and allow another
    /// construction attempt. An active recording is stopped first.
    pub fn reconfigure(&mut self, output_dir: Option<PathBuf>) -> Result<(), RecordingError> {
        self.shutdown()?;
        self.output_dir = output_dir;
        self.slot = RecorderSlot::Unbuilt;
        Ok(())
    }

    /// Stop an active recording, e.g. before the process exits.
    pub fn shutdown(&mut self) -> Result<(), RecordingError> {
        if self.phase == RecordingPhase::Recording {
            self.handle(false)?;
        }
        Ok(())
    }

    fn ensure_recorder(&mut self) -> Result<&mut dyn Recorder, RecordingError> {
        if matches!(self.slot, RecorderSlot::Unbuilt) {
            match self.build_recorder() {
                Ok(recorder) => self.slot = RecorderSlot::Ready(recorder),
                Err(err) => {
                    warn!("recording disabled: {err}");
                    self.slot = RecorderSlot::Failed(err.to_string());
                    return Err(RecordingError::Construction(err));
                }
            }
        }
        match &mut self.slot {
            RecorderSlot::Ready(recorder) => Ok(recorder.as_mut()),
            RecorderSlot::Failed(reason) => Err(RecordingError::Construction(
                RecorderError::Backend(reason.clone()),
            )),
            RecorderSlot::Unbuilt => Err(RecordingError::Construction(RecorderError::NotPrepared)),
        }
    }

    fn build_recorder(&self) -> Result<Box<dyn Recorder>, RecorderError> {
        let dir = self
            .output_dir
            .as_deref()
            .ok_or(RecorderError::MissingOutputDirectory)?;
        self.factory.create(dir)
    }
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("phase", &self.phase)
            .field("output_dir", &self.output_dir)
            .field("unavailable", &self.unavailable_reason())
            .finish()
    }
}
