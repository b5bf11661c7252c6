//! Ownership rules for mutating rooms and messages.
//!
//! Every update or delete goes through [`ensure_can_mutate`] after the actor has
//! been authenticated and the target row has been loaded, and before anything
//! is written.

use uuid::Uuid;

use crate::{
    appresult::{AppError, AppResult},
    db::{Identity, Message, Room},
};

/// Whoever is making the request.
#[derive(Debug, Clone)]
pub enum Actor {
    Anonymous,
    Identified(Identity),
}

impl Actor {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Actor::Anonymous => None,
            Actor::Identified(identity) => Some(identity),
        }
    }

    /// The authenticated identity, or `Unauthenticated`.
    pub fn require(&self) -> AppResult<&Identity> {
        self.identity().ok_or(AppError::Unauthenticated)
    }

    pub fn hosts(&self, room: &Room) -> bool {
        can_mutate(self, room)
    }

    pub fn wrote(&self, message: &Message) -> bool {
        can_mutate(self, message)
    }
}

impl From<Identity> for Actor {
    fn from(identity: Identity) -> Self {
        Actor::Identified(identity)
    }
}

/// A resource with a single identity allowed to change it.
pub trait Owned {
    /// Name of the owning role, used in denial messages.
    const ROLE: &'static str;

    fn owner_id(&self) -> Uuid;
}

impl Owned for Room {
    const ROLE: &'static str = "host";

    fn owner_id(&self) -> Uuid {
        self.host_id
    }
}

impl Owned for Message {
    const ROLE: &'static str = "author";

    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

pub fn can_mutate<R: Owned>(actor: &Actor, resource: &R) -> bool {
    actor
        .identity()
        .is_some_and(|identity| identity.id == resource.owner_id())
}

pub fn ensure_can_mutate<R: Owned>(actor: &Actor, resource: &R) -> AppResult<()> {
    if can_mutate(actor, resource) {
        return Ok(());
    }

    tracing::warn!(
        actor = ?actor.identity().map(|identity| identity.id),
        owner = %resource.owner_id(),
        "denied: not the {}",
        R::ROLE
    );
    Err(AppError::Forbidden(R::ROLE))
}
