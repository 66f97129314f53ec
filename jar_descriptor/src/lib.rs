//! Event descriptors dropped into the watched directory by an external producer.
//!
//! A descriptor names one actor, the animation trigger it should play, and at
//! most one action (move/rotate or start/stop recording). The JSON layout is
//! shared with the producer, so decoding stays lenient about the historical
//! variants of that layout while the in-memory form is a closed enum.

use std::fmt;

use thiserror::Error;

mod wire;

/// File extension producers use for descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// One consumed event: who, which animation, and what else to do.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDescriptor {
    actor_name: String,
    animation_name: String,
    action: Action,
}

impl EventDescriptor {
    pub fn new(
        actor_name: impl Into<String>,
        animation_name: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            actor_name: actor_name.into(),
            animation_name: animation_name.into(),
            action,
        }
    }

    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    pub fn animation_name(&self) -> &str {
        &self.animation_name
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({})",
            self.actor_name,
            self.animation_name,
            self.action.label()
        )
    }
}

/// The single optional side effect carried by a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Action {
    /// Animation and camera update only.
    #[default]
    None,
    Move(MoveAction),
    Record { start: bool },
}

impl Action {
    /// Name of the producer-side event type this action came from.
    pub fn label(&self) -> &'static str {
        match self {
            Action::None => "IgnoreEvent",
            Action::Move(_) => "MoveEvent",
            Action::Record { .. } => "RecordEvent",
        }
    }
}

/// Absolute world-space targets; `None` leaves that channel untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveAction {
    pub translate_to: Option<[f32; 3]>,
    /// Euler angles in degrees (pitch, yaw, roll about X, Y, Z).
    pub rotate_to: Option<[f32; 3]>,
}

impl MoveAction {
    pub fn translate(position: [f32; 3]) -> Self {
        Self {
            translate_to: Some(position),
            rotate_to: None,
        }
    }

    pub fn rotate(euler_degrees: [f32; 3]) -> Self {
        Self {
            translate_to: None,
            rotate_to: Some(euler_degrees),
        }
    }
}

/// Reasons a payload could not become an [`EventDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("descriptor payload is empty")]
    EmptyPayload,
    #[error("descriptor payload is malformed: {0}")]
    MalformedPayload(String),
}

impl DecodeError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        DecodeError::MalformedPayload(detail.into())
    }
}

/// Decode a descriptor document.
pub fn parse(raw: &str) -> Result<EventDescriptor, DecodeError> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    let document: wire::WireDescriptor =
        serde_json::from_str(trimmed).map_err(|err| DecodeError::malformed(err.to_string()))?;
    document.into_descriptor()
}

/// Decode raw file bytes; invalid UTF-8 counts as malformed.
pub fn parse_bytes(bytes: &[u8]) -> Result<EventDescriptor, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| DecodeError::malformed(format!("payload is not valid UTF-8: {err}")))?;
    parse(text)
}
