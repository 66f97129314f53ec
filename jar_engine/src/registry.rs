use thiserror::Error;

use crate::capabilities::{AnimatorId, NodeId};

/// Stage handles an actor is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorBinding {
    pub transform: NodeId,
    pub animator: AnimatorId,
    pub camera_focus: NodeId,
}

/// Index into the registry; also indexes per-actor state slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(usize);

impl ActorId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorEntry {
    name: String,
    binding: ActorBinding,
}

impl ActorEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> ActorBinding {
        self.binding
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("actor `{0}` is registered twice")]
    DuplicateActor(String),
    #[error("actor name must not be empty")]
    EmptyName,
}

/// Fixed set of controllable actors, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    entries: Vec<ActorEntry>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, binding: ActorBinding) -> Result<ActorId, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(RegistryError::DuplicateActor(name.to_string()));
        }
        let id = ActorId(self.entries.len());
        self.entries.push(ActorEntry {
            name: name.to_string(),
            binding,
        });
        Ok(id)
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<(ActorId, &ActorEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.name == name)
            .map(|(index, entry)| (ActorId(index), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (ActorId, &ActorEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (ActorId(index), entry))
    }
}
