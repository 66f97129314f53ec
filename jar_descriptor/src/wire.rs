use serde::Deserialize;

use crate::{Action, DecodeError, EventDescriptor, MoveAction};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDescriptor {
    character: String,
    animation: String,
    #[serde(default)]
    jar_event: Option<WireJarEvent>,
}

impl WireDescriptor {
    pub(crate) fn into_descriptor(self) -> Result<EventDescriptor, DecodeError> {
        if self.character.trim().is_empty() {
            return Err(DecodeError::malformed("`character` must not be empty"));
        }
        if self.animation.is_empty() {
            return Err(DecodeError::malformed("`animation` must not be empty"));
        }
        let action = match self.jar_event {
            Some(event) => event.into_action()?,
            None => Action::None,
        };
        Ok(EventDescriptor::new(self.character, self.animation, action))
    }
}

/// Producer event block. Every field is optional on the wire; the older
/// producer wrote flat `movePos*` fields and enum ordinals instead of names.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireJarEvent {
    #[serde(default)]
    event_type: EventKind,
    start_recording: Option<bool>,
    do_move: Option<bool>,
    do_rotate: Option<bool>,
    move_params: Option<WireMoveParams>,
    rotate_params: Option<WireRotateParams>,
    move_pos_x: Option<f32>,
    move_pos_y: Option<f32>,
    move_pos_z: Option<f32>,
}

impl WireJarEvent {
    fn into_action(self) -> Result<Action, DecodeError> {
        match self.event_type {
            EventKind::Ignore => Ok(Action::None),
            EventKind::Record => self
                .start_recording
                .map(|start| Action::Record { start })
                .ok_or_else(|| DecodeError::malformed("RecordEvent requires `startRecording`")),
            EventKind::Move => self.into_move().map(Action::Move),
        }
    }

    fn into_move(self) -> Result<MoveAction, DecodeError> {
        let legacy = self.legacy_translation();
        let translation = self
            .move_params
            .map(|params| [params.move_pos_x, params.move_pos_y, params.move_pos_z])
            .or(legacy);
        let rotation = self
            .rotate_params
            .map(|params| [params.rot_x, params.rot_y, params.rot_z]);

        let translate = self.do_move.unwrap_or(translation.is_some());
        let rotate = self.do_rotate.unwrap_or(rotation.is_some());

        let translate_to = match (translate, translation) {
            (false, _) => None,
            (true, Some(target)) => Some(target),
            (true, None) => {
                return Err(DecodeError::malformed("`doMove` set without `moveParams`"));
            }
        };
        let rotate_to = match (rotate, rotation) {
            (false, _) => None,
            (true, Some(target)) => Some(target),
            (true, None) => {
                return Err(DecodeError::malformed("`doRotate` set without `rotateParams`"));
            }
        };

        Ok(MoveAction {
            translate_to,
            rotate_to,
        })
    }

    fn legacy_translation(&self) -> Option<[f32; 3]> {
        if self.move_pos_x.is_none() && self.move_pos_y.is_none() && self.move_pos_z.is_none() {
            return None;
        }
        Some([
            self.move_pos_x.unwrap_or_default(),
            self.move_pos_y.unwrap_or_default(),
            self.move_pos_z.unwrap_or_default(),
        ])
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireMoveParams {
    move_pos_x: f32,
    move_pos_y: f32,
    move_pos_z: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireRotateParams {
    rot_x: f32,
    rot_y: f32,
    rot_z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawEventKind")]
enum EventKind {
    #[default]
    Ignore,
    Move,
    Record,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEventKind {
    Name(String),
    Ordinal(u64),
}

impl TryFrom<RawEventKind> for EventKind {
    type Error = String;

    fn try_from(value: RawEventKind) -> Result<Self, Self::Error> {
        match value {
            RawEventKind::Name(name) => match name.as_str() {
                "IgnoreEvent" => Ok(Self::Ignore),
                "MoveEvent" => Ok(Self::Move),
                "RecordEvent" => Ok(Self::Record),
                other => Err(format!("unknown eventType `{other}`")),
            },
            RawEventKind::Ordinal(0) => Ok(Self::Ignore),
            RawEventKind::Ordinal(1) => Ok(Self::Move),
            RawEventKind::Ordinal(2) => Ok(Self::Record),
            RawEventKind::Ordinal(other) => Err(format!("unknown eventType ordinal {other}")),
        }
    }
}
