//! In-memory reference stage: a parent/child transform graph plus boolean
//! animator triggers. The binary drives it when no engine is attached, and it
//! doubles as the observable stage for tests.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec3;
use log::debug;

use crate::capabilities::{AnimatorId, NodeId, Pose, Stage, StageError};
use crate::orientation::{euler_degrees_from_quat, quat_from_euler_degrees};

/// Oldest journal entries are dropped past this many.
const JOURNAL_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    local: Pose,
}

#[derive(Debug, Clone, Default)]
struct Animator {
    name: String,
    active: BTreeSet<String>,
}

/// One mutation applied to the stage, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Trigger {
        animator: AnimatorId,
        trigger: String,
        active: bool,
    },
    Position {
        node: NodeId,
        position: Vec3,
    },
    Rotation {
        node: NodeId,
        euler_degrees: Vec3,
    },
    Pose {
        node: NodeId,
        pose: Pose,
    },
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    animators: Vec<Animator>,
    camera: NodeId,
    journal: VecDeque<StageEvent>,
}

impl SceneGraph {
    /// Create a graph holding only the unparented camera.
    pub fn new(camera_pose: Pose) -> Self {
        Self {
            nodes: vec![Node {
                name: "camera".to_string(),
                parent: None,
                local: camera_pose,
            }],
            animators: Vec::new(),
            camera: NodeId(0),
            journal: VecDeque::new(),
        }
    }

    pub fn add_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Pose,
    ) -> Result<NodeId, StageError> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            local,
        });
        Ok(id)
    }

    pub fn add_animator(&mut self, name: &str) -> AnimatorId {
        let id = AnimatorId(self.animators.len());
        self.animators.push(Animator {
            name: name.to_string(),
            active: BTreeSet::new(),
        });
        id
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|node| node.name.as_str())
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|node| node.parent)
    }

    pub fn animator_name(&self, animator: AnimatorId) -> Option<&str> {
        self.animators
            .get(animator.0)
            .map(|animator| animator.name.as_str())
    }

    /// Triggers currently switched on, in name order.
    pub fn active_triggers(&self, animator: AnimatorId) -> Vec<String> {
        self.animators
            .get(animator.0)
            .map(|animator| animator.active.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every `set_trigger` call still held in the journal for `animator`.
    pub fn trigger_calls(&self, animator: AnimatorId) -> Vec<(String, bool)> {
        self.journal
            .iter()
            .filter_map(|event| match event {
                StageEvent::Trigger {
                    animator: target,
                    trigger,
                    active,
                } if *target == animator => Some((trigger.clone(), *active)),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> impl ExactSizeIterator<Item = &StageEvent> {
        self.journal.iter()
    }

    /// Human-readable journal, e.g. `actor.robot_kyle.pos 1.000,0.000,2.000`.
    pub fn journal_lines(&self) -> Vec<String> {
        self.journal
            .iter()
            .map(|event| self.describe(event))
            .collect()
    }

    fn describe(&self, event: &StageEvent) -> String {
        match event {
            StageEvent::Trigger {
                animator,
                trigger,
                active,
            } => format!(
                "animator.{}.trigger {trigger} {}",
                self.animator_name(*animator).unwrap_or("<unknown>"),
                if *active { "on" } else { "off" }
            ),
            StageEvent::Position { node, position } => format!(
                "actor.{}.pos {:.3},{:.3},{:.3}",
                self.node_name(*node).unwrap_or("<unknown>"),
                position.x,
                position.y,
                position.z
            ),
            StageEvent::Rotation {
                node,
                euler_degrees,
            } => format!(
                "actor.{}.rot {:.3},{:.3},{:.3}",
                self.node_name(*node).unwrap_or("<unknown>"),
                euler_degrees.x,
                euler_degrees.y,
                euler_degrees.z
            ),
            StageEvent::Pose { node, pose } => {
                let euler = euler_degrees_from_quat(pose.rotation);
                format!(
                    "{}.pose {:.3},{:.3},{:.3} rot {:.3},{:.3},{:.3}",
                    self.node_name(*node).unwrap_or("<unknown>"),
                    pose.translation.x,
                    pose.translation.y,
                    pose.translation.z,
                    euler.x,
                    euler.y,
                    euler.z
                )
            }
        }
    }

    fn record(&mut self, event: StageEvent) {
        debug!("stage {}", self.describe(&event));
        if self.journal.len() == JOURNAL_LIMIT {
            self.journal.pop_front();
        }
        self.journal.push_back(event);
    }

    fn node(&self, id: NodeId) -> Result<&Node, StageError> {
        self.nodes.get(id.0).ok_or(StageError::UnknownNode(id))
    }

    fn parent_world_pose(&self, id: NodeId) -> Result<Pose, StageError> {
        match self.node(id)?.parent {
            Some(parent) => self.world_pose(parent),
            None => Ok(Pose::IDENTITY),
        }
    }

    fn set_world(&mut self, id: NodeId, world: Pose) -> Result<(), StageError> {
        let local = self.parent_world_pose(id)?.localize(&world);
        self.nodes
            .get_mut(id.0)
            .ok_or(StageError::UnknownNode(id))?
            .local = local;
        Ok(())
    }
}

impl Stage for SceneGraph {
    fn set_trigger(
        &mut self,
        animator: AnimatorId,
        trigger: &str,
        active: bool,
    ) -> Result<(), StageError> {
        if trigger.is_empty() {
            return Err(StageError::EmptyTrigger);
        }
        let state = self
            .animators
            .get_mut(animator.0)
            .ok_or(StageError::UnknownAnimator(animator))?;
        if active {
            state.active.insert(trigger.to_string());
        } else {
            state.active.remove(trigger);
        }
        self.record(StageEvent::Trigger {
            animator,
            trigger: trigger.to_string(),
            active,
        });
        Ok(())
    }

    fn world_pose(&self, node: NodeId) -> Result<Pose, StageError> {
        // Parents always precede children, so the chain is finite.
        let mut chain = vec![self.node(node)?];
        while let Some(parent) = chain.last().and_then(|current| current.parent) {
            chain.push(self.node(parent)?);
        }
        Ok(chain
            .iter()
            .rev()
            .fold(Pose::IDENTITY, |world, current| world.compose(&current.local)))
    }

    fn set_world_position(&mut self, node: NodeId, position: Vec3) -> Result<(), StageError> {
        let current = self.world_pose(node)?;
        self.set_world(node, Pose::new(position, current.rotation))?;
        self.record(StageEvent::Position { node, position });
        Ok(())
    }

    fn set_world_rotation_euler(
        &mut self,
        node: NodeId,
        euler_degrees: Vec3,
    ) -> Result<(), StageError> {
        let current = self.world_pose(node)?;
        let rotation = quat_from_euler_degrees(euler_degrees);
        self.set_world(node, Pose::new(current.translation, rotation))?;
        self.record(StageEvent::Rotation {
            node,
            euler_degrees,
        });
        Ok(())
    }

    fn set_world_pose(&mut self, node: NodeId, pose: Pose) -> Result<(), StageError> {
        self.set_world(node, pose)?;
        self.record(StageEvent::Pose { node, pose });
        Ok(())
    }

    fn camera(&self) -> NodeId {
        self.camera
    }
}
