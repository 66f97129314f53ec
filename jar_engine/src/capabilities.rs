//! Interfaces to the collaborators that own the scene and the video encoder.
//!
//! The controller never holds scene objects directly. Actors are bound to
//! opaque node/animator handles and every mutation goes through [`Stage`];
//! recording goes through a lazily constructed [`Recorder`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use glam::{Quat, Vec3};
use thiserror::Error;

/// Handle to a transform in the stage's scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Handle to an animation state machine owned by the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for AnimatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animator#{}", self.0)
    }
}

/// Rigid transform (no scale).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// World pose of a child whose local pose is `local`.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            translation: self.translation + self.rotation * local.translation,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// Local pose that places a child of `self` at `world`.
    pub fn localize(&self, world: &Pose) -> Pose {
        let inverse = self.rotation.inverse();
        Pose {
            translation: inverse * (world.translation - self.translation),
            rotation: (inverse * world.rotation).normalize(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::IDENTITY
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    #[error("{0} is not part of the stage")]
    UnknownNode(NodeId),
    #[error("{0} is not part of the stage")]
    UnknownAnimator(AnimatorId),
    #[error("animation trigger name is empty")]
    EmptyTrigger,
}

/// Animator and transform capabilities of the scene engine.
///
/// Calls are synchronous and single-writer from the controller's side.
pub trait Stage {
    /// Turn an animation trigger on or off.
    fn set_trigger(
        &mut self,
        animator: AnimatorId,
        trigger: &str,
        active: bool,
    ) -> Result<(), StageError>;

    fn world_pose(&self, node: NodeId) -> Result<Pose, StageError>;

    /// Absolute world position; orientation is left untouched.
    fn set_world_position(&mut self, node: NodeId, position: Vec3) -> Result<(), StageError>;

    /// Absolute world orientation from Euler degrees; position is left untouched.
    fn set_world_rotation_euler(
        &mut self,
        node: NodeId,
        euler_degrees: Vec3,
    ) -> Result<(), StageError>;

    fn set_world_pose(&mut self, node: NodeId, pose: Pose) -> Result<(), StageError>;

    /// The single observer the controller repositions.
    fn camera(&self) -> NodeId;
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recording output directory is not configured")]
    MissingOutputDirectory,
    #[error("recording output directory {} does not exist or is not a directory", .0.display())]
    InvalidOutputDirectory(PathBuf),
    #[error("recorder has not been prepared")]
    NotPrepared,
    #[error("recorder is already running")]
    AlreadyRunning,
    #[error("recorder is not running")]
    NotRunning,
    #[error("failed to launch encoder `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("encoder exited with {0}")]
    EncoderExit(ExitStatus),
    #[error("encoder i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Backend(String),
}

/// A video capture of the camera view.
pub trait Recorder {
    /// Choose the output target; must precede [`Recorder::start`].
    fn prepare(&mut self) -> Result<(), RecorderError>;
    fn start(&mut self) -> Result<(), RecorderError>;
    fn stop(&mut self) -> Result<(), RecorderError>;
    fn is_recording(&self) -> bool;
}

/// Builds recorders; construction fails when the output location is unusable.
pub trait RecorderFactory {
    fn create(&self, output_dir: &Path) -> Result<Box<dyn Recorder>, RecorderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_vec(a: Vec3, b: Vec3) {
        assert!((a - b).length() <= EPSILON, "{a:?} != {b:?}");
    }

    #[test]
    fn compose_applies_parent_rotation_to_offset() {
        let parent = Pose::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_y(90f32.to_radians()),
        );
        let child = Pose::new(Vec3::new(0.0, 0.0, 2.0), Quat::IDENTITY);
        let world = parent.compose(&child);
        approx_vec(world.translation, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn localize_inverts_compose() {
        let parent = Pose::new(
            Vec3::new(-2.0, 1.0, 4.0),
            Quat::from_rotation_x(30f32.to_radians()),
        );
        let world = Pose::new(
            Vec3::new(0.5, 2.0, -1.0),
            Quat::from_rotation_z(45f32.to_radians()),
        );
        let local = parent.localize(&world);
        let round_trip = parent.compose(&local);
        approx_vec(round_trip.translation, world.translation);
        assert!(round_trip.rotation.angle_between(world.rotation) <= 1e-4);
    }
}
