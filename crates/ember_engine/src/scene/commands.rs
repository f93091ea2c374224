//! Deferred scene mutations
//!
//! Entity updates run while the scene manager is iterating its collections,
//! so they cannot insert or erase entities themselves. They record what they
//! want in a [`SceneCommands`] buffer instead and the scene manager applies
//! it once the iteration is over.

use crate::foundation::math::Vec3;
use crate::physics::ManagedPhysicsEntity;
use crate::scene::EntityId;
use std::fmt;

/// One pending scene mutation
pub enum SceneCommand {
    /// Delete an entity after the next physics step
    Despawn(EntityId),
    /// Area damage against active enemies
    Explode {
        /// Entity that caused the explosion
        source: EntityId,
        /// Center of the blast
        origin: Vec3,
        /// Blast radius
        radius: f32,
        /// Damage dealt to every enemy inside the radius
        damage: f32,
    },
    /// Damage the player
    DamagePlayer {
        /// Entity dealing the damage
        source: EntityId,
        /// Amount of damage
        amount: f32,
    },
    /// Add a new managed physics entity to the active set
    Spawn(Box<dyn ManagedPhysicsEntity>),
}

impl fmt::Debug for SceneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Despawn(id) => f.debug_tuple("Despawn").field(id).finish(),
            Self::Explode { source, origin, radius, damage } => f
                .debug_struct("Explode")
                .field("source", source)
                .field("origin", origin)
                .field("radius", radius)
                .field("damage", damage)
                .finish(),
            Self::DamagePlayer { source, amount } => f
                .debug_struct("DamagePlayer")
                .field("source", source)
                .field("amount", amount)
                .finish(),
            Self::Spawn(entity) => f.debug_tuple("Spawn").field(&entity.id()).finish(),
        }
    }
}

/// Ordered buffer of pending scene mutations
#[derive(Debug, Default)]
pub struct SceneCommands {
    queue: Vec<SceneCommand>,
}

impl SceneCommands {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Request deletion of an entity
    pub fn despawn(&mut self, id: EntityId) {
        self.queue.push(SceneCommand::Despawn(id));
    }

    /// Request area damage
    pub fn explode(&mut self, source: EntityId, origin: Vec3, radius: f32, damage: f32) {
        self.queue.push(SceneCommand::Explode { source, origin, radius, damage });
    }

    /// Request damage to the player
    pub fn damage_player(&mut self, source: EntityId, amount: f32) {
        self.queue.push(SceneCommand::DamagePlayer { source, amount });
    }

    /// Request insertion of a new entity
    pub fn spawn(&mut self, entity: Box<dyn ManagedPhysicsEntity>) {
        self.queue.push(SceneCommand::Spawn(entity));
    }

    /// Number of pending commands
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take the pending commands in submission order
    pub fn drain(&mut self) -> std::vec::Drain<'_, SceneCommand> {
        self.queue.drain(..)
    }
}
