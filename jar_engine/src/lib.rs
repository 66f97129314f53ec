//! File-driven stage controller.
//!
//! Descriptors dropped into a watched directory are decoded, resolved to a
//! registered actor and applied to the stage: animation triggers, absolute
//! moves, a camera snap to the actor's focus point and the recording session.

pub mod animation;
pub mod capabilities;
pub mod dispatcher;
pub mod orientation;
pub mod recorder;
pub mod recording;
pub mod registry;
pub mod scene_config;
pub mod stage;
pub mod watcher;

pub use capabilities::{
    AnimatorId, NodeId, Pose, Recorder, RecorderError, RecorderFactory, Stage, StageError,
};
pub use dispatcher::{DispatchError, DispatchResult, DropReason, EventDispatcher, StageSnapshot};
pub use recording::{
    IgnoreReason, RecordAction, RecordingError, RecordingPhase, RecordingSession,
};
pub use registry::{ActorBinding, ActorId, ActorRegistry};
pub use stage::SceneGraph;
pub use scene_config::{SceneConfig, SceneConfigError};
pub use watcher::{
    DirectoryWatcher, Disposition, ScanOutcome, WatchError, WatchExit, WatchSettings,
};
