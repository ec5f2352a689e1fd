//! Authenticated actors and the directory they are looked up in
//!
//! Actors are owned by the surrounding application; the engine only reads
//! their role set and active role.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError, StoreError};

/// Identity of an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Editorial role an actor can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Author,
    Reviewer,
    Editor,
    CopyEditor,
    Admin,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Editor => "editor",
            Role::CopyEditor => "copy-editor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "author" => Ok(Role::Author),
            "reviewer" => Ok(Role::Reviewer),
            "editor" => Ok(Role::Editor),
            "copy-editor" => Ok(Role::CopyEditor),
            "admin" => Ok(Role::Admin),
            other => Err(ReviewError::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// An authenticated user as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Assigned roles in assignment order
    pub roles: Vec<Role>,
    /// Role the actor is currently acting as
    pub current_active_role: Option<Role>,
}

impl Actor {
    /// Create an actor holding the given roles, with no explicit active role
    pub fn new(id: impl Into<ActorId>, roles: Vec<Role>) -> Self {
        Self {
            id: id.into(),
            roles,
            current_active_role: None,
        }
    }

    /// Set the active role
    pub fn with_active_role(mut self, role: Role) -> Self {
        self.current_active_role = Some(role);
        self
    }

    /// Whether the actor holds `role`, irrespective of the active role
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// The role the actor is acting as.
    ///
    /// An explicit active role only counts when it is one of the held roles;
    /// otherwise this falls back to the first held role, then to `Author`.
    pub fn active_role(&self) -> Role {
        self.current_active_role
            .filter(|role| self.has_role(*role))
            .or_else(|| self.roles.first().copied())
            .unwrap_or(Role::Author)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Read-only lookup of actors by identity
pub trait ActorDirectory: Send + Sync {
    /// Look up an actor's role set and active role
    fn lookup(&self, id: &ActorId) -> std::result::Result<Option<Actor>, StoreError>;
}

/// In-memory actor directory
#[derive(Debug, Default)]
pub struct InMemoryActorDirectory {
    actors: RwLock<HashMap<ActorId, Actor>>,
}

impl InMemoryActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an actor
    pub fn insert(&self, actor: Actor) {
        if let Ok(mut actors) = self.actors.write() {
            actors.insert(actor.id.clone(), actor);
        }
    }
}

impl ActorDirectory for InMemoryActorDirectory {
    fn lookup(&self, id: &ActorId) -> std::result::Result<Option<Actor>, StoreError> {
        let actors = self
            .actors
            .read()
            .map_err(|_| StoreError::Database("actor directory lock poisoned".to_string()))?;
        Ok(actors.get(id).cloned())
    }
}
