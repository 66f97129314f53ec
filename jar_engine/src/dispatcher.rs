//! Applies decoded descriptors to the stage, one at a time.

use glam::Vec3;
use jar_descriptor::{Action, DecodeError, EventDescriptor, MoveAction};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::animation::{self, ActorState, AnimationDiff};
use crate::capabilities::{NodeId, Pose, Stage, StageError};
use crate::orientation::euler_degrees_from_quat;
use crate::recording::{RecordingError, RecordingPhase, RecordingSession};
use crate::registry::{ActorBinding, ActorId, ActorRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    UnknownActor(String),
}

/// What happened to one descriptor. Nothing here is fatal to the watch loop.
#[derive(Debug)]
pub enum DispatchResult {
    Dispatched,
    Dropped(DropReason),
    /// The payload never decoded (raw entry point only).
    Rejected(DecodeError),
    /// A stage or recorder call failed part-way; earlier steps stay applied.
    Aborted(DispatchError),
}

impl DispatchResult {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchResult::Dispatched)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("stopping animation `{trigger}` failed: {source}")]
    StopAnimation {
        trigger: String,
        #[source]
        source: StageError,
    },
    #[error("moving actor failed: {0}")]
    Move(#[source] StageError),
    #[error("repositioning camera failed: {0}")]
    Camera(#[source] StageError),
    #[error("starting animation `{trigger}` failed: {source}")]
    StartAnimation {
        trigger: String,
        #[source]
        source: StageError,
    },
    #[error(transparent)]
    Recording(#[from] RecordingError),
}

/// Serializable view of controller-visible state.
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub actors: Vec<ActorSnapshot>,
    pub camera: Option<PoseSnapshot>,
    pub recording: RecordingPhase,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorSnapshot {
    pub name: String,
    pub active_animation: Option<String>,
    pub pose: Option<PoseSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoseSnapshot {
    pub position: [f32; 3],
    /// Euler degrees (pitch, yaw, roll).
    pub rotation: [f32; 3],
}

impl From<Pose> for PoseSnapshot {
    fn from(pose: Pose) -> Self {
        Self {
            position: pose.translation.to_array(),
            rotation: euler_degrees_from_quat(pose.rotation).to_array(),
        }
    }
}

/// Owns per-actor animation state and the recording session for one stage.
#[derive(Debug)]
pub struct EventDispatcher<S: Stage> {
    stage: S,
    registry: ActorRegistry,
    actors: Vec<ActorState>,
    recording: RecordingSession,
}

impl<S: Stage> EventDispatcher<S> {
    pub fn new(stage: S, registry: ActorRegistry, recording: RecordingSession) -> Self {
        let actors = vec![ActorState::default(); registry.len()];
        Self {
            stage,
            registry,
            actors,
            recording,
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn recording(&self) -> &RecordingSession {
        &self.recording
    }

    pub fn recording_mut(&mut self) -> &mut RecordingSession {
        &mut self.recording
    }

    pub fn actor_state(&self, name: &str) -> Option<&ActorState> {
        let (id, _) = self.registry.resolve(name)?;
        self.actors.get(id.index())
    }

    /// Decode `raw` and dispatch it; decode failures are logged with the payload.
    pub fn dispatch_raw(&mut self, raw: &str) -> DispatchResult {
        match jar_descriptor::parse(raw) {
            Ok(descriptor) => self.dispatch_with(&descriptor, Some(raw)),
            Err(err) => {
                warn!("descriptor rejected: {err}; payload: {raw:?}");
                DispatchResult::Rejected(err)
            }
        }
    }

    pub fn dispatch(&mut self, descriptor: &EventDescriptor) -> DispatchResult {
        self.dispatch_with(descriptor, None)
    }

    fn dispatch_with(
        &mut self,
        descriptor: &EventDescriptor,
        raw: Option<&str>,
    ) -> DispatchResult {
        let Some((actor, entry)) = self.registry.resolve(descriptor.actor_name()) else {
            warn!(
                "unknown actor `{}`; camera and animations unchanged ({descriptor})",
                descriptor.actor_name()
            );
            return DispatchResult::Dropped(DropReason::UnknownActor(
                descriptor.actor_name().to_string(),
            ));
        };
        let binding = entry.binding();

        match self.apply(actor, binding, descriptor) {
            Ok(()) => {
                info!("dispatched {descriptor}");
                DispatchResult::Dispatched
            }
            Err(err) => {
                match raw {
                    Some(raw) => warn!(
                        "dispatch aborted for actor `{}` animation `{}`: {err}; payload: {raw}",
                        descriptor.actor_name(),
                        descriptor.animation_name()
                    ),
                    None => warn!(
                        "dispatch aborted for actor `{}` animation `{}`: {err}; descriptor: {descriptor:?}",
                        descriptor.actor_name(),
                        descriptor.animation_name()
                    ),
                }
                DispatchResult::Aborted(err)
            }
        }
    }

    fn apply(
        &mut self,
        actor: ActorId,
        binding: ActorBinding,
        descriptor: &EventDescriptor,
    ) -> Result<(), DispatchError> {
        let diff = animation::transition(
            &mut self.actors[actor.index()],
            descriptor.animation_name(),
        );

        if let Err(err) = self.apply_to_stage(binding, descriptor, &diff) {
            // Track only the triggers the stage accepted.
            if diff.to_start.is_some() {
                let active = match &err {
                    DispatchError::StopAnimation { .. } => diff.to_stop.clone(),
                    _ => None,
                };
                self.actors[actor.index()].reset(active);
            }
            return Err(err);
        }

        if let Action::Record { start } = descriptor.action() {
            self.recording.handle(*start)?;
        }

        Ok(())
    }

    fn apply_to_stage(
        &mut self,
        binding: ActorBinding,
        descriptor: &EventDescriptor,
        diff: &AnimationDiff,
    ) -> Result<(), DispatchError> {
        if let Some(trigger) = &diff.to_stop {
            self.stage
                .set_trigger(binding.animator, trigger, false)
                .map_err(|source| DispatchError::StopAnimation {
                    trigger: trigger.clone(),
                    source,
                })?;
        }

        if let Action::Move(movement) = descriptor.action() {
            self.apply_move(binding.transform, movement)
                .map_err(DispatchError::Move)?;
        }

        self.track_camera(binding.camera_focus)
            .map_err(DispatchError::Camera)?;

        if let Some(trigger) = &diff.to_start {
            self.stage
                .set_trigger(binding.animator, trigger, true)
                .map_err(|source| DispatchError::StartAnimation {
                    trigger: trigger.clone(),
                    source,
                })?;
        }

        Ok(())
    }

    fn apply_move(&mut self, transform: NodeId, movement: &MoveAction) -> Result<(), StageError> {
        if let Some(position) = movement.translate_to {
            self.stage
                .set_world_position(transform, Vec3::from_array(position))?;
        }
        if let Some(euler) = movement.rotate_to {
            self.stage
                .set_world_rotation_euler(transform, Vec3::from_array(euler))?;
        }
        Ok(())
    }

    /// Snap the camera onto the focus point's current world pose. The camera
    /// stays unparented, so later focus motion does not drag it along.
    fn track_camera(&mut self, focus: NodeId) -> Result<(), StageError> {
        let pose = self.stage.world_pose(focus)?;
        let camera = self.stage.camera();
        self.stage.set_world_pose(camera, pose)
    }

    pub fn snapshot(&self) -> StageSnapshot {
        let actors = self
            .registry
            .iter()
            .map(|(id, entry)| ActorSnapshot {
                name: entry.name().to_string(),
                active_animation: self
                    .actors
                    .get(id.index())
                    .and_then(|state| state.active_animation())
                    .map(str::to_string),
                pose: self
                    .stage
                    .world_pose(entry.binding().transform)
                    .ok()
                    .map(PoseSnapshot::from),
            })
            .collect();
        StageSnapshot {
            actors,
            camera: self
                .stage
                .world_pose(self.stage.camera())
                .ok()
                .map(PoseSnapshot::from),
            recording: self.recording.phase(),
        }
    }

    /// Stop any active recording.
    pub fn shutdown(&mut self) -> Result<(), RecordingError> {
        self.recording.shutdown()
    }
}
