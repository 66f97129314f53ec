//! Startup description of the stage: camera pose plus the actor set.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{Pose, StageError};
use crate::orientation::quat_from_euler_degrees;
use crate::registry::{ActorBinding, ActorRegistry, RegistryError};
use crate::stage::SceneGraph;

#[derive(Debug, Error)]
pub enum SceneConfigError {
    #[error("failed to read scene file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scene declares no actors")]
    NoActors,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Position plus Euler rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl TransformConfig {
    fn pose(&self) -> Pose {
        Pose::new(
            Vec3::from_array(self.position),
            quat_from_euler_degrees(Vec3::from_array(self.rotation)),
        )
    }
}

/// Focus point relative to its actor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub offset: [f32; 3],
    pub rotation: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub camera_focus: FocusConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: TransformConfig,
    pub actors: Vec<ActorConfig>,
}

impl SceneConfig {
    /// Two actors facing the camera, each framed from behind and above.
    pub fn builtin() -> Self {
        let focus = FocusConfig {
            offset: [0.0, 1.5, -3.0],
            rotation: [10.0, 0.0, 0.0],
        };
        Self {
            camera: TransformConfig {
                position: [0.0, 1.6, -6.0],
                rotation: [0.0, 0.0, 0.0],
            },
            actors: vec![
                ActorConfig {
                    name: "robot_kyle".to_string(),
                    position: [-1.5, 0.0, 0.0],
                    rotation: [0.0, 180.0, 0.0],
                    camera_focus: focus,
                },
                ActorConfig {
                    name: "banana_man".to_string(),
                    position: [1.5, 0.0, 0.0],
                    rotation: [0.0, 180.0, 0.0],
                    camera_focus: focus,
                },
            ],
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, SceneConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SceneConfigError> {
        let text = fs::read_to_string(path).map_err(|source| SceneConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Lay out the stage graph and bind every actor to its nodes.
    ///
    /// Each focus node is parented under its actor node so moving the actor
    /// carries the focus point; the camera stays unparented.
    pub fn build(&self) -> Result<(SceneGraph, ActorRegistry), SceneConfigError> {
        if self.actors.is_empty() {
            return Err(SceneConfigError::NoActors);
        }
        let mut stage = SceneGraph::new(self.camera.pose());
        let mut registry = ActorRegistry::new();
        for actor in &self.actors {
            let transform = stage
                .add_node(
                    &actor.name,
                    None,
                    TransformConfig {
                        position: actor.position,
                        rotation: actor.rotation,
                    }
                    .pose(),
                )?;
            let camera_focus = stage
                .add_node(
                    &format!("{}.camera_focus", actor.name),
                    Some(transform),
                    TransformConfig {
                        position: actor.camera_focus.offset,
                        rotation: actor.camera_focus.rotation,
                    }
                    .pose(),
                )?;
            let animator = stage.add_animator(&actor.name);
            registry.register(
                &actor.name,
                ActorBinding {
                    transform,
                    animator,
                    camera_focus,
                },
            )?;
        }
        Ok((stage, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Stage;

    const EPSILON: f32 = 1e-4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() <= EPSILON
    }

    #[test]
    fn builtin_scene_binds_both_actors() {
        let (stage, registry) = SceneConfig::builtin().build().expect("builtin builds");
        assert_eq!(registry.len(), 2);
        for name in ["robot_kyle", "banana_man"] {
            let (_, entry) = registry.resolve(name).expect("actor registered");
            let binding = entry.binding();
            assert_eq!(stage.node_name(binding.transform), Some(name));
            assert_eq!(stage.parent_of(binding.camera_focus), Some(binding.transform));
            assert_eq!(stage.animator_name(binding.animator), Some(name));
        }
        assert_eq!(stage.parent_of(stage.camera()), None);
    }

    #[test]
    fn focus_offset_is_in_actor_space() {
        let scene = SceneConfig::from_json_str(
            r#"{
                "camera": { "position": [0, 1.6, -6] },
                "actors": [
                    { "name": "robot_kyle", "position": [2, 0, 0], "rotation": [0, 180, 0],
                      "camera_focus": { "offset": [0, 1.5, -3] } }
                ]
            }"#,
        )
        .expect("scene parses");
        let (stage, registry) = scene.build().expect("scene builds");
        let (_, kyle) = registry.resolve("robot_kyle").expect("kyle");
        let focus = stage
            .world_pose(kyle.binding().camera_focus)
            .expect("focus pose");
        assert!(
            approx(focus.translation, Vec3::new(2.0, 1.5, 3.0)),
            "{:?}",
            focus.translation
        );
        let camera = stage.world_pose(stage.camera()).expect("camera pose");
        assert!(approx(camera.translation, Vec3::new(0.0, 1.6, -6.0)));
    }

    #[test]
    fn invalid_scenes_are_rejected() {
        assert!(matches!(
            SceneConfig::from_json_str(r#"{"actors": []}"#)
                .expect("parses")
                .build(),
            Err(SceneConfigError::NoActors)
        ));
        assert!(matches!(
            SceneConfig::from_json_str(r#"{"actors": [{"name": "a"}, {"name": "a"}]}"#)
                .expect("parses")
                .build(),
            Err(SceneConfigError::Registry(RegistryError::DuplicateActor(_)))
        ));
        assert!(matches!(
            SceneConfig::from_json_str(r#"{"actors": [{"name": ""}]}"#)
                .expect("parses")
                .build(),
            Err(SceneConfigError::Registry(RegistryError::EmptyName))
        ));
        assert!(matches!(
            SceneConfig::from_json_str("{ not json"),
            Err(SceneConfigError::Parse(_))
        ));
    }
}
