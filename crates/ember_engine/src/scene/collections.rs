//! Scene data: disjoint entity collections keyed by id

use crate::gameplay::PhysicsPlayer;
use crate::physics::{Enemy, ManagedPhysicsEntity};
use crate::scene::objects::{PointLight, SpectralObject, Sun, UiElement};
use crate::scene::{EntityId, GameObject};
use std::collections::HashMap;
use std::fmt;

/// Collection an entity currently lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRole {
    /// The single player
    Player,
    /// The single sun
    Sun,
    /// Point light
    Light,
    /// UI element
    Ui,
    /// Spectral object
    Spectral,
    /// Enemy taking part in simulation
    ActiveEnemy,
    /// Enemy detached from simulation
    PassiveEnemy,
    /// Managed physics entity taking part in simulation
    ActivePhysics,
    /// Managed physics entity detached from simulation
    PassivePhysics,
}

impl ObjectRole {
    /// Whether entities in this role own a physics body
    pub fn has_body(self) -> bool {
        matches!(
            self,
            Self::Player | Self::ActiveEnemy | Self::PassiveEnemy | Self::ActivePhysics | Self::PassivePhysics
        )
    }

    /// Whether entities in this role are currently simulated
    pub fn is_active(self) -> bool {
        matches!(self, Self::Player | Self::ActiveEnemy | Self::ActivePhysics)
    }
}

/// Everything in the scene
///
/// Only [`SceneManager`](crate::scene::SceneManager) mutates this, which is
/// what keeps an id in at most one collection.
#[derive(Default)]
pub struct Scene {
    pub(crate) player: Option<PhysicsPlayer>,
    pub(crate) sun: Option<Sun>,
    pub(crate) lights: HashMap<EntityId, PointLight>,
    pub(crate) ui: HashMap<EntityId, UiElement>,
    pub(crate) spectral: HashMap<EntityId, SpectralObject>,
    pub(crate) active_enemies: HashMap<EntityId, Box<dyn Enemy>>,
    pub(crate) passive_enemies: HashMap<EntityId, Box<dyn Enemy>>,
    pub(crate) active_physics: HashMap<EntityId, Box<dyn ManagedPhysicsEntity>>,
    pub(crate) passive_physics: HashMap<EntityId, Box<dyn ManagedPhysicsEntity>>,
}

impl Scene {
    /// Collection holding `id`, if any
    pub fn role_of(&self, id: EntityId) -> Option<ObjectRole> {
        if self.player.as_ref().map_or(false, |player| player.id() == id) {
            Some(ObjectRole::Player)
        } else if self.sun.as_ref().map_or(false, |sun| sun.id() == id) {
            Some(ObjectRole::Sun)
        } else if self.lights.contains_key(&id) {
            Some(ObjectRole::Light)
        } else if self.ui.contains_key(&id) {
            Some(ObjectRole::Ui)
        } else if self.spectral.contains_key(&id) {
            Some(ObjectRole::Spectral)
        } else if self.active_enemies.contains_key(&id) {
            Some(ObjectRole::ActiveEnemy)
        } else if self.passive_enemies.contains_key(&id) {
            Some(ObjectRole::PassiveEnemy)
        } else if self.active_physics.contains_key(&id) {
            Some(ObjectRole::ActivePhysics)
        } else if self.passive_physics.contains_key(&id) {
            Some(ObjectRole::PassivePhysics)
        } else {
            None
        }
    }

    /// Whether `id` is in any collection
    pub fn contains(&self, id: EntityId) -> bool {
        self.role_of(id).is_some()
    }

    /// Total number of entities, player and sun included
    pub fn len(&self) -> usize {
        usize::from(self.player.is_some())
            + usize::from(self.sun.is_some())
            + self.lights.len()
            + self.ui.len()
            + self.spectral.len()
            + self.active_enemies.len()
            + self.passive_enemies.len()
            + self.active_physics.len()
            + self.passive_physics.len()
    }

    /// Whether the scene holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("player", &self.player.as_ref().map(|player| player.id()))
            .field("sun", &self.sun.as_ref().map(|sun| sun.id()))
            .field("lights", &self.lights.len())
            .field("ui", &self.ui.len())
            .field("spectral", &self.spectral.len())
            .field("active_enemies", &self.active_enemies.len())
            .field("passive_enemies", &self.passive_enemies.len())
            .field("active_physics", &self.active_physics.len())
            .field("passive_physics", &self.passive_physics.len())
            .finish()
    }
}
