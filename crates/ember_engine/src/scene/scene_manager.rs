//! Scene Manager - authoritative owner of every live entity
//!
//! The scene manager is the only code allowed to insert, move or erase
//! entities, and the only code that destroys physics bodies. It works in
//! lockstep with the physics simulation:
//!
//! ```text
//!   pre_simulation      simulate                 post_simulation
//! ──────────────────┬──────────────────────────┬─────────────────────
//! optimize if dirty │ step ─► remove_stale_*() │ contacts, post_step
//! think / update    │                          │
//! apply commands    │                          │
//! ```
//!
//! Entity code never deletes anything directly. It queues a despawn (or the
//! manager queues one when an enemy dies) and the deletion happens right
//! after the next physics step, when no body is borrowed by the engine and no
//! collection is being iterated.

use crate::foundation::math::{Mat3, Mat4, Vec3};
use crate::gameplay::PhysicsPlayer;
use crate::physics::{
    ContactPhase, ContactRecord, DebugFlags, Enemy, ManagedPhysicsEntity, PhysicsEntity, PhysicsWorld,
    StepContext,
};
use crate::scene::collections::{ObjectRole, Scene};
use crate::scene::commands::{SceneCommand, SceneCommands};
use crate::scene::error::SceneError;
use crate::scene::objects::{PointLight, SpectralObject, Sun, UiElement};
use crate::scene::{EntityId, GameObject, Model};
use rapier3d::dynamics::RigidBodyHandle;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Entity handed back by [`SceneManager::remove_game_object`]
pub enum OwnedObject {
    /// Point light
    Light(PointLight),
    /// UI element
    Ui(UiElement),
    /// Spectral object
    Spectral(SpectralObject),
    /// Enemy with its body detached
    Enemy(Box<dyn Enemy>),
    /// Managed physics entity with its body detached
    Physics(Box<dyn ManagedPhysicsEntity>),
}

impl OwnedObject {
    /// Id of the wrapped entity
    pub fn id(&self) -> EntityId {
        match self {
            Self::Light(light) => light.id(),
            Self::Ui(element) => element.id(),
            Self::Spectral(object) => object.id(),
            Self::Enemy(enemy) => enemy.id(),
            Self::Physics(entity) => entity.id(),
        }
    }
}

/// Ownership of a removed entity plus the collection it came from
pub struct RemovedObject {
    /// Collection the entity was removed from
    pub role: ObjectRole,
    /// The entity itself
    pub object: OwnedObject,
}

/// Per-entity draw record for the renderer
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// Entity id
    pub id: EntityId,
    /// Model matrix
    pub model_matrix: Mat4,
    /// Normal matrix
    pub normal_matrix: Mat3,
    /// Mesh to draw
    pub model: Arc<Model>,
    /// Base color
    pub color: Vec3,
}

fn render_item<O: GameObject + ?Sized>(object: &O, world: &PhysicsWorld) -> Option<RenderItem> {
    let model = object.model()?;
    let transform = object.transform(world);
    Some(RenderItem {
        id: object.id(),
        model_matrix: transform.to_matrix(),
        normal_matrix: transform.to_normal_matrix(),
        model,
        color: object.color(),
    })
}

/// Scene manager
///
/// Operations that create, enable, disable or destroy bodies take the
/// physics world explicitly; the manager never stores a reference to it.
#[derive(Debug, Default)]
pub struct SceneManager {
    scene: Scene,
    body_to_id: HashMap<RigidBodyHandle, EntityId>,
    stale: HashSet<EntityId>,
    broad_phase_dirty: bool,
}

impl SceneManager {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the scene data
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    // ---------------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------------

    /// Install the player, returning the previous one with its body detached
    pub fn set_player(
        &mut self,
        mut player: PhysicsPlayer,
        world: &mut PhysicsWorld,
    ) -> Result<Option<PhysicsPlayer>, SceneError> {
        let id = player.id();
        if self.scene.contains(id) {
            log::warn!("Player {} is already in the scene", id);
            return Err(SceneError::DuplicateId(id));
        }

        let handle = player.add_physics_body(world)?;

        let previous = self.scene.player.take().map(|mut old| {
            self.unregister_body(old.body_handle());
            old.remove_physics_body(world);
            old
        });

        self.body_to_id.insert(handle, id);
        self.scene.player = Some(player);
        self.broad_phase_dirty = true;
        log::info!("Player {} set", id);
        Ok(previous)
    }

    /// Install the sun, returning the previous one
    pub fn set_sun(&mut self, sun: Sun) -> Option<Sun> {
        log::debug!("Sun {} set", sun.id());
        self.scene.sun.replace(sun)
    }

    /// Add a point light
    pub fn add_light(&mut self, light: PointLight) -> Result<EntityId, SceneError> {
        let id = self.check_absent(light.id())?;
        self.scene.lights.insert(id, light);
        log::debug!("Light {} added", id);
        Ok(id)
    }

    /// Add a UI element
    pub fn add_ui_object(&mut self, element: UiElement) -> Result<EntityId, SceneError> {
        let id = self.check_absent(element.id())?;
        self.scene.ui.insert(id, element);
        log::debug!("UI element {} added", id);
        Ok(id)
    }

    /// Add a spectral object
    pub fn add_spectral_object(&mut self, object: SpectralObject) -> Result<EntityId, SceneError> {
        let id = self.check_absent(object.id())?;
        self.scene.spectral.insert(id, object);
        log::debug!("Spectral object {} added", id);
        Ok(id)
    }

    /// Add an enemy to the active set, creating or enabling its body
    pub fn add_enemy(&mut self, mut enemy: Box<dyn Enemy>, world: &mut PhysicsWorld) -> Result<EntityId, SceneError> {
        let id = self.check_absent(enemy.id())?;
        let handle = enemy.add_physics_body(world)?;

        self.body_to_id.insert(handle, id);
        self.scene.active_enemies.insert(id, enemy);
        self.broad_phase_dirty = true;
        log::debug!("Enemy {} added", id);
        Ok(id)
    }

    /// Add a managed physics entity to the active set, creating or enabling its body
    pub fn add_managed_physics_entity(
        &mut self,
        mut entity: Box<dyn ManagedPhysicsEntity>,
        world: &mut PhysicsWorld,
    ) -> Result<EntityId, SceneError> {
        let id = self.check_absent(entity.id())?;
        let handle = entity.add_physics_body(world)?;

        self.body_to_id.insert(handle, id);
        self.scene.active_physics.insert(id, entity);
        self.broad_phase_dirty = true;
        log::debug!("Physics entity {} added", id);
        Ok(id)
    }

    fn check_absent(&self, id: EntityId) -> Result<EntityId, SceneError> {
        match self.scene.role_of(id) {
            Some(role) => {
                log::warn!("Entity {} is already in the scene as {:?}", id, role);
                Err(SceneError::DuplicateId(id))
            }
            None => Ok(id),
        }
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    /// Erase an entity and destroy its physics body
    ///
    /// Returns false if the id is unknown. The player and the sun are never
    /// deleted this way.
    pub fn delete_game_object(&mut self, id: EntityId, world: &mut PhysicsWorld) -> bool {
        let Some(role) = self.scene.role_of(id) else {
            return false;
        };

        let deleted = match role {
            ObjectRole::Player | ObjectRole::Sun => {
                log::warn!("Refusing to delete {:?} {}", role, id);
                return false;
            }
            ObjectRole::Light => self.scene.lights.remove(&id).is_some(),
            ObjectRole::Ui => self.scene.ui.remove(&id).is_some(),
            ObjectRole::Spectral => self.scene.spectral.remove(&id).is_some(),
            ObjectRole::ActiveEnemy | ObjectRole::PassiveEnemy => {
                let enemies = if role == ObjectRole::ActiveEnemy {
                    &mut self.scene.active_enemies
                } else {
                    &mut self.scene.passive_enemies
                };
                match enemies.remove(&id) {
                    Some(mut enemy) => {
                        self.unregister_body(enemy.body_handle());
                        enemy.destroy_physics_body(world);
                        true
                    }
                    None => false,
                }
            }
            ObjectRole::ActivePhysics | ObjectRole::PassivePhysics => {
                let entities = if role == ObjectRole::ActivePhysics {
                    &mut self.scene.active_physics
                } else {
                    &mut self.scene.passive_physics
                };
                match entities.remove(&id) {
                    Some(mut entity) => {
                        self.unregister_body(entity.body_handle());
                        entity.destroy_physics_body(world);
                        true
                    }
                    None => false,
                }
            }
        };

        if deleted {
            self.stale.remove(&id);
            if role.has_body() {
                self.broad_phase_dirty = true;
            }
            log::debug!("Deleted {:?} {}", role, id);
        }
        deleted
    }

    /// Take an entity out of the scene, detaching (not destroying) its body
    ///
    /// The caller owns the returned entity and may add it back later, which
    /// re-enables the same body.
    pub fn remove_game_object(&mut self, id: EntityId, world: &mut PhysicsWorld) -> Option<RemovedObject> {
        let role = self.scene.role_of(id)?;

        let object = match role {
            ObjectRole::Player | ObjectRole::Sun => {
                log::warn!("Refusing to remove {:?} {}", role, id);
                return None;
            }
            ObjectRole::Light => OwnedObject::Light(self.scene.lights.remove(&id)?),
            ObjectRole::Ui => OwnedObject::Ui(self.scene.ui.remove(&id)?),
            ObjectRole::Spectral => OwnedObject::Spectral(self.scene.spectral.remove(&id)?),
            ObjectRole::ActiveEnemy | ObjectRole::PassiveEnemy => {
                let enemies = if role == ObjectRole::ActiveEnemy {
                    &mut self.scene.active_enemies
                } else {
                    &mut self.scene.passive_enemies
                };
                let mut enemy = enemies.remove(&id)?;
                self.unregister_body(enemy.body_handle());
                enemy.remove_physics_body(world);
                OwnedObject::Enemy(enemy)
            }
            ObjectRole::ActivePhysics | ObjectRole::PassivePhysics => {
                let entities = if role == ObjectRole::ActivePhysics {
                    &mut self.scene.active_physics
                } else {
                    &mut self.scene.passive_physics
                };
                let mut entity = entities.remove(&id)?;
                self.unregister_body(entity.body_handle());
                entity.remove_physics_body(world);
                OwnedObject::Physics(entity)
            }
        };

        self.stale.remove(&id);
        if role.is_active() {
            self.broad_phase_dirty = true;
        }
        log::debug!("Removed {:?} {}", role, id);
        Some(RemovedObject { role, object })
    }

    // ---------------------------------------------------------------------
    // Active / passive transitions
    // ---------------------------------------------------------------------

    /// Move a passive enemy or managed entity back into the simulation
    pub fn activate_physics_object(&mut self, id: EntityId, world: &mut PhysicsWorld) -> Result<(), SceneError> {
        match self.scene.role_of(id) {
            Some(ObjectRole::PassiveEnemy) => {
                let Some(mut enemy) = self.scene.passive_enemies.remove(&id) else {
                    return Err(SceneError::NotFound(id));
                };
                match enemy.add_physics_body(world) {
                    Ok(handle) => {
                        self.body_to_id.insert(handle, id);
                        self.scene.active_enemies.insert(id, enemy);
                    }
                    Err(e) => {
                        self.scene.passive_enemies.insert(id, enemy);
                        return Err(e.into());
                    }
                }
            }
            Some(ObjectRole::PassivePhysics) => {
                let Some(mut entity) = self.scene.passive_physics.remove(&id) else {
                    return Err(SceneError::NotFound(id));
                };
                match entity.add_physics_body(world) {
                    Ok(handle) => {
                        self.body_to_id.insert(handle, id);
                        self.scene.active_physics.insert(id, entity);
                    }
                    Err(e) => {
                        self.scene.passive_physics.insert(id, entity);
                        return Err(e.into());
                    }
                }
            }
            Some(ObjectRole::Player | ObjectRole::Sun) => return Err(SceneError::ProtectedRole(id)),
            _ => return Err(SceneError::NotFound(id)),
        }

        self.broad_phase_dirty = true;
        log::debug!("Activated {}", id);
        Ok(())
    }

    /// Take an active enemy or managed entity out of the simulation,
    /// keeping it in memory with its state intact
    pub fn detach_physics_object(&mut self, id: EntityId, world: &mut PhysicsWorld) -> Result<(), SceneError> {
        match self.scene.role_of(id) {
            Some(ObjectRole::ActiveEnemy) => {
                let Some(mut enemy) = self.scene.active_enemies.remove(&id) else {
                    return Err(SceneError::NotFound(id));
                };
                self.unregister_body(enemy.body_handle());
                enemy.remove_physics_body(world);
                self.scene.passive_enemies.insert(id, enemy);
            }
            Some(ObjectRole::ActivePhysics) => {
                let Some(mut entity) = self.scene.active_physics.remove(&id) else {
                    return Err(SceneError::NotFound(id));
                };
                self.unregister_body(entity.body_handle());
                entity.remove_physics_body(world);
                self.scene.passive_physics.insert(id, entity);
            }
            Some(ObjectRole::Player | ObjectRole::Sun) => return Err(SceneError::ProtectedRole(id)),
            _ => return Err(SceneError::NotFound(id)),
        }

        self.broad_phase_dirty = true;
        log::debug!("Detached {}", id);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Stale queue
    // ---------------------------------------------------------------------

    /// Mark an entity for deletion after the next physics step
    ///
    /// Returns true if the id was not already queued.
    pub fn add_to_stale_queue(&mut self, id: EntityId) -> bool {
        let added = self.stale.insert(id);
        if added {
            log::debug!("Entity {} queued for deletion", id);
        }
        added
    }

    /// Delete every queued entity that still exists and empty the queue
    ///
    /// Must only run while no physics step is in flight.
    pub fn remove_stale_objects(&mut self, world: &mut PhysicsWorld) -> usize {
        if self.stale.is_empty() {
            return 0;
        }

        let mut stale: Vec<EntityId> = self.stale.drain().collect();
        stale.sort();

        let removed = stale
            .into_iter()
            .filter(|&id| self.delete_game_object(id, world))
            .count();
        log::debug!("Removed {} stale objects", removed);
        removed
    }

    /// Number of ids waiting for deletion
    pub fn stale_count(&self) -> usize {
        self.stale.len()
    }

    /// Whether `id` is queued for deletion
    pub fn is_stale(&self, id: EntityId) -> bool {
        self.stale.contains(&id)
    }

    /// Whether bodies were added or moved in or out of the simulation since
    /// the last call; reading clears the flag
    pub fn is_broad_phase_optimization_needed(&mut self) -> bool {
        std::mem::take(&mut self.broad_phase_dirty)
    }

    /// Entity owning a body
    pub fn id_from_body(&self, handle: RigidBodyHandle) -> Option<EntityId> {
        self.body_to_id.get(&handle).copied()
    }

    fn unregister_body(&mut self, handle: Option<RigidBodyHandle>) {
        if let Some(handle) = handle {
            self.body_to_id.remove(&handle);
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// The player
    pub fn player(&self) -> Option<&PhysicsPlayer> {
        self.scene.player.as_ref()
    }

    /// Mutable player
    pub fn player_mut(&mut self) -> Option<&mut PhysicsPlayer> {
        self.scene.player.as_mut()
    }

    /// The sun
    pub fn sun(&self) -> Option<&Sun> {
        self.scene.sun.as_ref()
    }

    /// Point lights
    pub fn lights(&self) -> impl Iterator<Item = &PointLight> + '_ {
        self.scene.lights.values()
    }

    /// UI elements
    pub fn ui_objects(&self) -> impl Iterator<Item = &UiElement> + '_ {
        self.scene.ui.values()
    }

    /// Spectral objects
    pub fn spectral_objects(&self) -> impl Iterator<Item = &SpectralObject> + '_ {
        self.scene.spectral.values()
    }

    /// Enemies taking part in simulation
    pub fn active_enemies(&self) -> impl Iterator<Item = &dyn Enemy> + '_ {
        self.scene.active_enemies.values().map(|enemy| &**enemy as &dyn Enemy)
    }

    /// Enemies detached from simulation
    pub fn passive_enemies(&self) -> impl Iterator<Item = &dyn Enemy> + '_ {
        self.scene.passive_enemies.values().map(|enemy| &**enemy as &dyn Enemy)
    }

    /// Managed physics entities taking part in simulation
    pub fn active_physics_entities(&self) -> impl Iterator<Item = &dyn ManagedPhysicsEntity> + '_ {
        self.scene
            .active_physics
            .values()
            .map(|entity| &**entity as &dyn ManagedPhysicsEntity)
    }

    /// Managed physics entities detached from simulation
    pub fn passive_physics_entities(&self) -> impl Iterator<Item = &dyn ManagedPhysicsEntity> + '_ {
        self.scene
            .passive_physics
            .values()
            .map(|entity| &**entity as &dyn ManagedPhysicsEntity)
    }

    /// Active or passive enemy by id
    pub fn enemy(&self, id: EntityId) -> Option<&dyn Enemy> {
        self.scene
            .active_enemies
            .get(&id)
            .or_else(|| self.scene.passive_enemies.get(&id))
            .map(|enemy| &**enemy as &dyn Enemy)
    }

    /// Active or passive managed physics entity by id
    pub fn physics_entity(&self, id: EntityId) -> Option<&dyn ManagedPhysicsEntity> {
        self.scene
            .active_physics
            .get(&id)
            .or_else(|| self.scene.passive_physics.get(&id))
            .map(|entity| &**entity as &dyn ManagedPhysicsEntity)
    }

    /// Collection holding `id`
    pub fn role_of(&self, id: EntityId) -> Option<ObjectRole> {
        self.scene.role_of(id)
    }

    /// Whether `id` is anywhere in the scene
    pub fn contains(&self, id: EntityId) -> bool {
        self.scene.contains(id)
    }

    /// Number of entities, player and sun included
    pub fn object_count(&self) -> usize {
        self.scene.len()
    }

    // ---------------------------------------------------------------------
    // Gameplay
    // ---------------------------------------------------------------------

    /// Damage an enemy, queueing it for deletion once its health runs out
    ///
    /// The enemy stays in the scene until the stale queue is flushed.
    pub fn damage_enemy(&mut self, id: EntityId, amount: f32) -> Option<f32> {
        let enemy = self
            .scene
            .active_enemies
            .get_mut(&id)
            .or_else(|| self.scene.passive_enemies.get_mut(&id))?;

        let remaining = enemy.take_damage(amount);
        let dead = enemy.is_dead();
        if dead && self.add_to_stale_queue(id) {
            log::info!("Enemy {} killed", id);
        }
        Some(remaining)
    }

    /// Apply buffered scene mutations in submission order
    ///
    /// Duplicate spawns are logged and skipped; body creation failures are
    /// returned and stop the remaining commands.
    pub fn apply_commands(&mut self, commands: &mut SceneCommands, world: &mut PhysicsWorld) -> Result<(), SceneError> {
        for command in commands.drain() {
            match command {
                SceneCommand::Despawn(id) => {
                    self.add_to_stale_queue(id);
                }
                SceneCommand::Explode { source, origin, radius, damage } => {
                    let targets: Vec<EntityId> = self
                        .scene
                        .active_enemies
                        .iter()
                        .filter(|(id, enemy)| !enemy.is_dead() && !self.stale.contains(*id))
                        .filter(|(_, enemy)| (enemy.position(world) - origin).norm() <= radius)
                        .map(|(id, _)| *id)
                        .collect();
                    log::debug!("Explosion from {} hit {} enemies", source, targets.len());
                    for id in targets {
                        self.damage_enemy(id, damage);
                    }
                }
                SceneCommand::DamagePlayer { source, amount } => {
                    if let Some(player) = self.scene.player.as_mut() {
                        let remaining = player.take_damage(amount);
                        log::debug!("{} hit the player for {:.1}, {:.1} left", source, amount, remaining);
                    }
                }
                SceneCommand::Spawn(entity) => match self.add_managed_physics_entity(entity, world) {
                    Ok(_) => {}
                    Err(SceneError::Physics(e)) => return Err(SceneError::Physics(e)),
                    Err(e) => log::warn!("Spawn skipped: {}", e),
                },
            }
        }
        Ok(())
    }

    /// Keep spectral objects centered on the viewpoint
    pub fn update_spectral_objects(&mut self, viewpoint: Vec3) {
        for object in self.scene.spectral.values_mut() {
            object.follow(viewpoint);
        }
    }

    /// Draw records for every drawable entity in the simulation, ordered by id
    ///
    /// Entities without a model and passive entities are skipped.
    pub fn render_snapshot(&self, world: &PhysicsWorld) -> Vec<RenderItem> {
        let mut items: Vec<RenderItem> = self
            .scene
            .player
            .iter()
            .filter_map(|player| render_item(player, world))
            .chain(self.scene.lights.values().filter_map(|light| render_item(light, world)))
            .chain(self.scene.ui.values().filter_map(|element| render_item(element, world)))
            .chain(self.scene.spectral.values().filter_map(|object| render_item(object, world)))
            .chain(
                self.scene
                    .active_enemies
                    .values()
                    .filter_map(|enemy| render_item(enemy.as_ref(), world)),
            )
            .chain(
                self.scene
                    .active_physics
                    .values()
                    .filter_map(|entity| render_item(entity.as_ref(), world)),
            )
            .collect();

        items.sort_by_key(|item| item.id);
        items
    }

    /// Destroy every body and empty the scene
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        if let Some(mut player) = self.scene.player.take() {
            player.destroy_physics_body(world);
        }
        for (_, mut enemy) in self
            .scene
            .active_enemies
            .drain()
            .chain(self.scene.passive_enemies.drain())
        {
            enemy.destroy_physics_body(world);
        }
        for (_, mut entity) in self
            .scene
            .active_physics
            .drain()
            .chain(self.scene.passive_physics.drain())
        {
            entity.destroy_physics_body(world);
        }

        self.scene = Scene::default();
        self.body_to_id.clear();
        self.stale.clear();
        self.broad_phase_dirty = false;
        log::info!("Scene cleared");
    }

    // ---------------------------------------------------------------------
    // Step hooks, driven by the physics simulation
    // ---------------------------------------------------------------------

    /// Run enemy AI and managed-entity updates; returns what they asked for
    pub(crate) fn update_active_entities(&mut self, world: &mut PhysicsWorld, dt: f32) -> SceneCommands {
        let mut commands = SceneCommands::new();
        let player_position = self.scene.player.as_ref().map(|player| player.position(world));

        let mut ctx = StepContext {
            world,
            dt,
            player_position,
            commands: &mut commands,
        };
        let stale = &self.stale;
        for (id, enemy) in self.scene.active_enemies.iter_mut() {
            if enemy.is_dead() || stale.contains(id) {
                continue;
            }
            enemy.think(&mut ctx);
        }
        for entity in self.scene.active_physics.values_mut() {
            entity.update(&mut ctx);
        }

        commands
    }

    /// Hand contacts recorded during the step to the active managed
    /// entities involved; returns the number of notifications delivered
    pub fn dispatch_contacts(&mut self, contacts: &[ContactRecord]) -> usize {
        let mut delivered = 0;
        for contact in contacts.iter().filter(|contact| contact.phase != ContactPhase::Removed) {
            let first = contact.body1.and_then(|handle| self.id_from_body(handle));
            let second = contact.body2.and_then(|handle| self.id_from_body(handle));

            for (this, other) in [(first, second), (second, first)] {
                if let Some(entity) = this.and_then(|id| self.scene.active_physics.get_mut(&id)) {
                    entity.on_contact(other);
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Post-step reconciliation of the player and every active enemy
    pub(crate) fn post_step_entities(&mut self, world: &PhysicsWorld, flags: DebugFlags) {
        if let Some(player) = self.scene.player.as_mut() {
            player.post_step(world, flags);
        }
        for enemy in self.scene.active_enemies.values_mut() {
            enemy.post_step(world, flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::foundation::math::Transform;
    use crate::gameplay::PlayerSettings;
    use crate::physics::{BodyDesc, BodyKind, PhysicsBody, ShapeDesc};
    use approx::assert_relative_eq;

    struct Dummy {
        id: EntityId,
        body: PhysicsBody,
        health: f32,
    }

    impl Dummy {
        fn at(position: Vec3) -> Self {
            Self::with_id(EntityId::next(), position)
        }

        fn with_id(id: EntityId, position: Vec3) -> Self {
            Self {
                id,
                body: PhysicsBody::new(BodyDesc::new(
                    BodyKind::KinematicVelocity,
                    ShapeDesc::Ball(0.5),
                    position,
                )),
                health: 10.0,
            }
        }
    }

    impl GameObject for Dummy {
        fn id(&self) -> EntityId {
            self.id
        }

        fn transform(&self, world: &PhysicsWorld) -> Transform {
            self.body.transform(world)
        }
    }

    impl PhysicsEntity for Dummy {
        fn body(&self) -> &PhysicsBody {
            &self.body
        }

        fn body_mut(&mut self) -> &mut PhysicsBody {
            &mut self.body
        }
    }

    impl Enemy for Dummy {
        fn think(&mut self, ctx: &mut StepContext<'_>) {
            if ctx.player_position.is_some() {
                ctx.commands.damage_player(self.id, 1.0);
            }
        }

        fn take_damage(&mut self, amount: f32) -> f32 {
            self.health -= amount;
            self.health
        }

        fn health(&self) -> f32 {
            self.health
        }
    }

    struct Crate {
        id: EntityId,
        body: PhysicsBody,
        contacts: usize,
    }

    impl Crate {
        fn at(position: Vec3) -> Self {
            Self {
                id: EntityId::next(),
                body: PhysicsBody::new(BodyDesc::new(
                    BodyKind::Dynamic,
                    ShapeDesc::Cuboid(Vec3::new(0.5, 0.5, 0.5)),
                    position,
                )),
                contacts: 0,
            }
        }
    }

    impl GameObject for Crate {
        fn id(&self) -> EntityId {
            self.id
        }

        fn transform(&self, world: &PhysicsWorld) -> Transform {
            self.body.transform(world)
        }

        fn model(&self) -> Option<Arc<Model>> {
            Some(Arc::new(Model::new("crate", Vec::new(), Vec::new())))
        }
    }

    impl PhysicsEntity for Crate {
        fn body(&self) -> &PhysicsBody {
            &self.body
        }

        fn body_mut(&mut self) -> &mut PhysicsBody {
            &mut self.body
        }
    }

    impl ManagedPhysicsEntity for Crate {
        fn on_contact(&mut self, _other: Option<EntityId>) {
            self.contacts += 1;
        }
    }

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig::default())
    }

    fn collections_holding(manager: &SceneManager, id: EntityId) -> usize {
        [
            manager.active_enemies().any(|e| e.id() == id),
            manager.passive_enemies().any(|e| e.id() == id),
            manager.active_physics_entities().any(|e| e.id() == id),
            manager.passive_physics_entities().any(|e| e.id() == id),
            manager.lights().any(|l| l.id() == id),
            manager.ui_objects().any(|u| u.id() == id),
            manager.spectral_objects().any(|s| s.id() == id),
        ]
        .into_iter()
        .filter(|&held| held)
        .count()
    }

    #[test]
    fn test_duplicate_ids_rejected_across_collections() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let id = manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();
        manager.detach_physics_object(id, &mut world).unwrap();

        let again = manager.add_enemy(Box::new(Dummy::with_id(id, Vec3::zeros())), &mut world);
        assert!(matches!(again, Err(SceneError::DuplicateId(dup)) if dup == id));
        assert_eq!(manager.passive_enemies().count(), 1);
        assert_eq!(manager.active_enemies().count(), 0);

        let light = PointLight::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0);
        let light_id = manager.add_light(light.clone()).unwrap();
        assert!(matches!(manager.add_light(light), Err(SceneError::DuplicateId(dup)) if dup == light_id));

        manager.clear(&mut world);
    }

    #[test]
    fn test_activate_detach_keep_collections_disjoint() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let enemy = manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();
        let entity = manager
            .add_managed_physics_entity(Box::new(Crate::at(Vec3::new(5.0, 0.0, 0.0))), &mut world)
            .unwrap();

        for _ in 0..3 {
            manager.detach_physics_object(enemy, &mut world).unwrap();
            manager.detach_physics_object(entity, &mut world).unwrap();
            assert_eq!(manager.role_of(enemy), Some(ObjectRole::PassiveEnemy));
            assert_eq!(manager.role_of(entity), Some(ObjectRole::PassivePhysics));
            assert_eq!(collections_holding(&manager, enemy), 1);
            assert_eq!(collections_holding(&manager, entity), 1);

            manager.activate_physics_object(enemy, &mut world).unwrap();
            manager.activate_physics_object(entity, &mut world).unwrap();
            assert_eq!(manager.role_of(enemy), Some(ObjectRole::ActiveEnemy));
            assert_eq!(manager.role_of(entity), Some(ObjectRole::ActivePhysics));
            assert_eq!(collections_holding(&manager, enemy), 1);
            assert_eq!(collections_holding(&manager, entity), 1);
        }

        assert!(matches!(
            manager.activate_physics_object(enemy, &mut world),
            Err(SceneError::NotFound(_))
        ));
        assert_eq!(manager.object_count(), 2);

        manager.clear(&mut world);
    }

    #[test]
    fn test_stale_queue_defers_deletion() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let ids: Vec<EntityId> = (0..4)
            .map(|i| {
                manager
                    .add_enemy(Box::new(Dummy::at(Vec3::new(i as f32 * 3.0, 0.0, 0.0))), &mut world)
                    .unwrap()
            })
            .collect();
        let bodies_before = world.body_count();

        assert!(manager.add_to_stale_queue(ids[0]));
        assert!(manager.add_to_stale_queue(ids[2]));
        assert!(!manager.add_to_stale_queue(ids[2]));

        assert_eq!(manager.active_enemies().count(), 4);
        assert_eq!(world.body_count(), bodies_before);
        assert!(manager.enemy(ids[0]).is_some());
        assert_eq!(manager.stale_count(), 2);

        assert_eq!(manager.remove_stale_objects(&mut world), 2);
        assert_eq!(manager.stale_count(), 0);
        assert!(!manager.contains(ids[0]));
        assert!(!manager.contains(ids[2]));
        assert!(manager.contains(ids[1]));
        assert_eq!(world.body_count(), bodies_before - 2);

        assert_eq!(manager.remove_stale_objects(&mut world), 0);
        manager.clear(&mut world);
    }

    #[test]
    fn test_stale_entry_for_vanished_id_is_dropped() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let id = manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();
        manager.add_to_stale_queue(id);
        manager.add_to_stale_queue(EntityId::next());
        assert!(manager.delete_game_object(id, &mut world));

        assert_eq!(manager.remove_stale_objects(&mut world), 0);
        assert_eq!(manager.stale_count(), 0);
    }

    #[test]
    fn test_remove_and_readd_keeps_body() {
        let mut world = world();
        let mut manager = SceneManager::new();
        let position = Vec3::new(1.0, 2.0, 3.0);

        let id = manager.add_enemy(Box::new(Dummy::at(position)), &mut world).unwrap();
        let handle = manager.enemy(id).and_then(|e| e.body_handle()).unwrap();
        assert_eq!(manager.id_from_body(handle), Some(id));

        let removed = manager.remove_game_object(id, &mut world).unwrap();
        assert_eq!(removed.role, ObjectRole::ActiveEnemy);
        assert_eq!(manager.id_from_body(handle), None);

        let OwnedObject::Enemy(enemy) = removed.object else {
            panic!("expected an enemy");
        };
        assert!(!enemy.in_simulation(&world));
        assert_eq!(enemy.body_handle(), Some(handle));
        assert_relative_eq!(enemy.position(&world), position);

        manager.add_enemy(enemy, &mut world).unwrap();
        let enemy = manager.enemy(id).unwrap();
        assert!(enemy.in_simulation(&world));
        assert_eq!(enemy.body_handle(), Some(handle));
        assert_eq!(manager.id_from_body(handle), Some(id));

        manager.clear(&mut world);
    }

    #[test]
    fn test_broad_phase_flag_set_once_per_change() {
        let mut world = world();
        let mut manager = SceneManager::new();
        assert!(!manager.is_broad_phase_optimization_needed());

        let id = manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();
        assert!(manager.is_broad_phase_optimization_needed());
        assert!(!manager.is_broad_phase_optimization_needed());

        manager.detach_physics_object(id, &mut world).unwrap();
        assert!(manager.is_broad_phase_optimization_needed());
        assert!(!manager.is_broad_phase_optimization_needed());

        manager.activate_physics_object(id, &mut world).unwrap();
        assert!(manager.is_broad_phase_optimization_needed());
        assert!(!manager.is_broad_phase_optimization_needed());

        // Failed operations leave the flag alone
        assert!(manager.detach_physics_object(EntityId::next(), &mut world).is_err());
        assert!(!manager.is_broad_phase_optimization_needed());

        manager.add_light(PointLight::new(Vec3::zeros(), Vec3::zeros(), 1.0)).unwrap();
        assert!(!manager.is_broad_phase_optimization_needed());

        manager.clear(&mut world);
    }

    #[test]
    fn test_player_and_sun_are_protected() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let player = PhysicsPlayer::new(Vec3::zeros(), PlayerSettings::default());
        let player_id = player.id();
        assert!(manager.set_player(player, &mut world).unwrap().is_none());
        let sun = Sun::new(-Vec3::y(), Vec3::new(1.0, 1.0, 1.0), 1.0);
        let sun_id = sun.id();
        assert!(manager.set_sun(sun).is_none());

        assert!(!manager.delete_game_object(player_id, &mut world));
        assert!(!manager.delete_game_object(sun_id, &mut world));
        assert!(manager.remove_game_object(player_id, &mut world).is_none());
        assert!(matches!(
            manager.detach_physics_object(player_id, &mut world),
            Err(SceneError::ProtectedRole(_))
        ));
        assert_eq!(manager.role_of(player_id), Some(ObjectRole::Player));
        assert_eq!(manager.role_of(sun_id), Some(ObjectRole::Sun));

        manager.clear(&mut world);
    }

    #[test]
    fn test_set_player_detaches_previous() {
        let mut world = world();
        let mut manager = SceneManager::new();

        manager
            .set_player(PhysicsPlayer::new(Vec3::zeros(), PlayerSettings::default()), &mut world)
            .unwrap();
        let first_handle = manager.player().and_then(|p| p.body_handle()).unwrap();

        let mut previous = manager
            .set_player(PhysicsPlayer::new(Vec3::new(4.0, 0.0, 0.0), PlayerSettings::default()), &mut world)
            .unwrap()
            .expect("previous player returned");

        assert_eq!(previous.body_handle(), Some(first_handle));
        assert!(!previous.in_simulation(&world));
        assert!(world.contains_body(first_handle));
        assert_eq!(manager.id_from_body(first_handle), None);

        previous.destroy_physics_body(&mut world);
        manager.clear(&mut world);
    }

    #[test]
    fn test_dead_enemy_queued_not_deleted() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let id = manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();

        assert_eq!(manager.damage_enemy(id, 4.0), Some(6.0));
        assert!(!manager.is_stale(id));

        assert_eq!(manager.damage_enemy(id, 10.0), Some(-4.0));
        assert!(manager.is_stale(id));
        assert!(manager.contains(id));

        assert_eq!(manager.damage_enemy(EntityId::next(), 1.0), None);
        assert_eq!(manager.remove_stale_objects(&mut world), 1);
        assert!(!manager.contains(id));
    }

    #[test]
    fn test_commands_applied_in_order() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let near = manager.add_enemy(Box::new(Dummy::at(Vec3::new(1.0, 0.0, 0.0))), &mut world).unwrap();
        let far = manager.add_enemy(Box::new(Dummy::at(Vec3::new(20.0, 0.0, 0.0))), &mut world).unwrap();
        let passive = manager.add_enemy(Box::new(Dummy::at(Vec3::new(0.5, 0.0, 0.0))), &mut world).unwrap();
        manager.detach_physics_object(passive, &mut world).unwrap();

        let source = EntityId::next();
        let mut commands = SceneCommands::new();
        commands.explode(source, Vec3::zeros(), 5.0, 25.0);
        commands.spawn(Box::new(Crate::at(Vec3::new(0.0, 5.0, 0.0))));
        commands.despawn(far);

        manager.apply_commands(&mut commands, &mut world).unwrap();
        assert!(commands.is_empty());

        assert!(manager.is_stale(near));
        assert!(manager.is_stale(far));
        assert_relative_eq!(manager.enemy(far).unwrap().health(), 10.0);
        assert_relative_eq!(manager.enemy(passive).unwrap().health(), 10.0);
        assert_eq!(manager.active_physics_entities().count(), 1);

        manager.clear(&mut world);
    }

    #[test]
    fn test_think_pushes_commands() {
        let mut world = world();
        let mut manager = SceneManager::new();

        manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();
        assert!(manager.update_active_entities(&mut world, 1.0 / 60.0).is_empty());

        manager
            .set_player(PhysicsPlayer::new(Vec3::new(0.0, 0.0, 3.0), PlayerSettings::default()), &mut world)
            .unwrap();
        let mut commands = manager.update_active_entities(&mut world, 1.0 / 60.0);
        assert_eq!(commands.len(), 1);

        manager.apply_commands(&mut commands, &mut world).unwrap();
        assert_relative_eq!(manager.player().unwrap().health(), 99.0);

        manager.clear(&mut world);
    }

    #[test]
    fn test_dead_and_stale_enemies_sit_out_until_flush() {
        let mut world = world();
        let mut manager = SceneManager::new();

        manager
            .set_player(PhysicsPlayer::new(Vec3::new(0.0, 0.0, 3.0), PlayerSettings::default()), &mut world)
            .unwrap();
        let killed = manager.add_enemy(Box::new(Dummy::at(Vec3::new(1.0, 0.0, 0.0))), &mut world).unwrap();
        let despawning = manager.add_enemy(Box::new(Dummy::at(Vec3::new(-1.0, 0.0, 0.0))), &mut world).unwrap();

        assert_eq!(manager.damage_enemy(killed, 20.0), Some(-10.0));
        assert!(manager.add_to_stale_queue(despawning));

        let mut commands = manager.update_active_entities(&mut world, 1.0 / 60.0);
        assert!(commands.is_empty());

        commands.explode(EntityId::next(), Vec3::zeros(), 5.0, 3.0);
        manager.apply_commands(&mut commands, &mut world).unwrap();
        assert_relative_eq!(manager.enemy(killed).unwrap().health(), -10.0);
        assert_relative_eq!(manager.enemy(despawning).unwrap().health(), 10.0);
        assert_relative_eq!(manager.player().unwrap().health(), PlayerSettings::default().max_health);

        assert_eq!(manager.remove_stale_objects(&mut world), 2);
        manager.clear(&mut world);
    }

    #[test]
    fn test_contacts_dispatched_to_active_entities() {
        let mut world = world();
        let mut manager = SceneManager::new();

        let first = Crate::at(Vec3::zeros());
        let second = Crate::at(Vec3::new(0.0, 2.0, 0.0));
        let first_id = manager.add_managed_physics_entity(Box::new(first), &mut world).unwrap();
        let second_id = manager.add_managed_physics_entity(Box::new(second), &mut world).unwrap();
        let first_body = manager.physics_entity(first_id).and_then(|e| e.body_handle());
        let second_body = manager.physics_entity(second_id).and_then(|e| e.body_handle());

        let contacts = [
            ContactRecord { phase: ContactPhase::Added, body1: first_body, body2: second_body },
            ContactRecord { phase: ContactPhase::Removed, body1: first_body, body2: second_body },
            ContactRecord { phase: ContactPhase::Added, body1: None, body2: second_body },
        ];
        assert_eq!(manager.dispatch_contacts(&contacts), 3);

        manager.detach_physics_object(first_id, &mut world).unwrap();
        assert_eq!(manager.dispatch_contacts(&contacts[..1]), 1);

        manager.clear(&mut world);
    }

    #[test]
    fn test_render_snapshot_skips_missing_models() {
        let mut world = world();
        let mut manager = SceneManager::new();

        manager.add_light(PointLight::new(Vec3::zeros(), Vec3::zeros(), 1.0)).unwrap();
        manager.add_enemy(Box::new(Dummy::at(Vec3::zeros())), &mut world).unwrap();
        let drawn = manager
            .add_managed_physics_entity(Box::new(Crate::at(Vec3::new(0.0, 3.0, 0.0))), &mut world)
            .unwrap();
        let hidden = manager
            .add_managed_physics_entity(Box::new(Crate::at(Vec3::new(0.0, 6.0, 0.0))), &mut world)
            .unwrap();
        manager.detach_physics_object(hidden, &mut world).unwrap();

        let items = manager.render_snapshot(&world);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, drawn);
        assert_relative_eq!(items[0].model_matrix[(1, 3)], 3.0);

        manager.clear(&mut world);
        assert_eq!(manager.object_count(), 0);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_spectral_objects_follow_viewpoint() {
        let world = world();
        let mut manager = SceneManager::new();

        let id = manager
            .add_spectral_object(SpectralObject::new(Vec3::new(0.0, 0.0, -100.0), Vec3::repeat(1.0), None))
            .unwrap();
        manager.update_spectral_objects(Vec3::new(10.0, 2.0, 0.0));

        let object = manager.spectral_objects().find(|o| o.id() == id).unwrap();
        assert_relative_eq!(object.position(&world), Vec3::new(10.0, 2.0, -100.0));
    }
}
