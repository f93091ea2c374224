//! Physics capability contract for scene entities
//!
//! Every physics-backed entity owns exactly one [`PhysicsBody`], which pairs
//! the body description with the (optional) rapier handle. The body is
//! created lazily the first time the entity is added to the simulation and
//! lives until [`PhysicsEntity::destroy_physics_body`] is called by the scene
//! manager when the entity is deleted.
//!
//! ```text
//!  add_physics_body        remove_physics_body       destroy_physics_body
//! ─────────────────► body ─────────────────────► disabled ──────────────► released
//!   (create or enable)        (handle kept)         (handle dropped)
//! ```

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::physics::error::PhysicsError;
use crate::physics::world::{BodyDesc, PhysicsWorld};
use crate::physics::DebugFlags;
use crate::scene::{EntityId, GameObject, SceneCommands};
use rapier3d::dynamics::RigidBodyHandle;

/// A body description plus the handle of the body created from it
#[derive(Debug)]
pub struct PhysicsBody {
    desc: BodyDesc,
    handle: Option<RigidBodyHandle>,
    last_position: Vec3,
    last_rotation: Quat,
}

impl PhysicsBody {
    /// Describe a body that does not exist yet
    pub fn new(desc: BodyDesc) -> Self {
        Self {
            last_position: desc.position,
            last_rotation: desc.rotation,
            desc,
            handle: None,
        }
    }

    /// Body description used on creation
    pub fn desc(&self) -> &BodyDesc {
        &self.desc
    }

    /// Handle of the body, `None` if it was never created or was destroyed
    pub fn handle(&self) -> Option<RigidBodyHandle> {
        self.handle
    }

    /// Create the body, or re-enable it if it already exists
    pub fn add(&mut self, world: &mut PhysicsWorld) -> Result<RigidBodyHandle, PhysicsError> {
        if let Some(handle) = self.handle {
            if world.set_body_enabled(handle, true) {
                return Ok(handle);
            }
            log::warn!("Body {:?} vanished from the world, recreating", handle);
        }

        let desc = BodyDesc {
            position: self.last_position,
            rotation: self.last_rotation,
            ..self.desc.clone()
        };
        let handle = world.create_body(&desc)?;
        self.handle = Some(handle);
        Ok(handle)
    }

    /// Take the body out of the simulation, keeping handle and state
    pub fn remove(&mut self, world: &mut PhysicsWorld) {
        if let Some(handle) = self.handle {
            self.remember_pose(world, handle);
            world.set_body_enabled(handle, false);
        }
    }

    /// Release the body permanently
    pub fn destroy(&mut self, world: &mut PhysicsWorld) {
        if let Some(handle) = self.handle.take() {
            self.remember_pose(world, handle);
            world.destroy_body(handle);
        }
    }

    /// Whether the body exists and is being simulated
    pub fn is_simulated(&self, world: &PhysicsWorld) -> bool {
        self.handle.map_or(false, |handle| world.is_body_enabled(handle))
    }

    /// Current position, or the last known one if there is no body
    pub fn position(&self, world: &PhysicsWorld) -> Vec3 {
        self.handle
            .and_then(|handle| world.body_translation(handle))
            .unwrap_or(self.last_position)
    }

    /// Current pose as a transform
    pub fn transform(&self, world: &PhysicsWorld) -> Transform {
        let rotation = self
            .handle
            .and_then(|handle| world.body_rotation(handle))
            .unwrap_or(self.last_rotation);
        Transform::from_position_rotation(self.position(world), rotation)
    }

    /// Current linear velocity (zero without a body)
    pub fn velocity(&self, world: &PhysicsWorld) -> Vec3 {
        self.handle
            .and_then(|handle| world.linear_velocity(handle))
            .unwrap_or_else(Vec3::zeros)
    }

    fn remember_pose(&mut self, world: &PhysicsWorld, handle: RigidBodyHandle) {
        if let Some(position) = world.body_translation(handle) {
            self.last_position = position;
        }
        if let Some(rotation) = world.body_rotation(handle) {
            self.last_rotation = rotation;
        }
    }
}

impl Drop for PhysicsBody {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("Physics body {:?} dropped without being destroyed", handle);
        }
    }
}

/// Entity bridged to a physics body
///
/// Implementors only provide access to their [`PhysicsBody`]; the lifecycle
/// operations are shared.
pub trait PhysicsEntity: GameObject {
    /// The entity's body
    fn body(&self) -> &PhysicsBody;

    /// Mutable access to the entity's body
    fn body_mut(&mut self) -> &mut PhysicsBody;

    /// Create the body if absent, otherwise put it back into the simulation
    fn add_physics_body(&mut self, world: &mut PhysicsWorld) -> Result<RigidBodyHandle, PhysicsError> {
        self.body_mut().add(world)
    }

    /// Take the body out of the simulation without releasing it
    fn remove_physics_body(&mut self, world: &mut PhysicsWorld) {
        self.body_mut().remove(world);
    }

    /// Release the body permanently; only the scene manager calls this
    fn destroy_physics_body(&mut self, world: &mut PhysicsWorld) {
        self.body_mut().destroy(world);
    }

    /// Handle of the body, `None` if there is none
    fn body_handle(&self) -> Option<RigidBodyHandle> {
        self.body().handle()
    }

    /// Whether the body is currently simulated
    fn in_simulation(&self, world: &PhysicsWorld) -> bool {
        self.body().is_simulated(world)
    }

    /// Current linear velocity
    fn velocity(&self, world: &PhysicsWorld) -> Vec3 {
        self.body().velocity(world)
    }
}

/// Per-step context handed to entity updates
///
/// Replaces any global scene access: entities read the world and the player
/// position from here and request scene changes through `commands`.
pub struct StepContext<'a> {
    /// Physics world (velocities may be changed, bodies may not be created)
    pub world: &'a mut PhysicsWorld,
    /// Step length in seconds
    pub dt: f32,
    /// Player position, if there is a player
    pub player_position: Option<Vec3>,
    /// Deferred scene mutations
    pub commands: &'a mut SceneCommands,
}

/// Self-updating hostile actor
pub trait Enemy: PhysicsEntity {
    /// AI update before the step; sets velocities, may queue commands
    fn think(&mut self, ctx: &mut StepContext<'_>);

    /// Reconciliation after the step
    fn post_step(&mut self, world: &PhysicsWorld, flags: DebugFlags) {
        log_debug_state(self.id(), "enemy", world, self, flags);
        if flags.contains(DebugFlags::HEALTH) {
            log::debug!("enemy {} health: {:.1}", self.id(), self.health());
        }
    }

    /// Apply damage and return the remaining health
    fn take_damage(&mut self, amount: f32) -> f32;

    /// Current health
    fn health(&self) -> f32;

    /// Whether health has dropped to zero
    fn is_dead(&self) -> bool {
        self.health() <= 0.0
    }
}

/// Physics-backed object driven by the scene (terrain, props, projectiles)
pub trait ManagedPhysicsEntity: PhysicsEntity {
    /// Per-step update before the physics step
    fn update(&mut self, _ctx: &mut StepContext<'_>) {}

    /// React to a contact recorded during the last step
    fn on_contact(&mut self, _other: Option<EntityId>) {}
}

/// Shared debug logging for post-step reconciliation
pub(crate) fn log_debug_state<E: PhysicsEntity + ?Sized>(
    id: EntityId,
    label: &str,
    world: &PhysicsWorld,
    entity: &E,
    flags: DebugFlags,
) {
    if flags.contains(DebugFlags::POSITION) {
        let p = entity.position(world);
        log::debug!("{} {} position: ({:.3}, {:.3}, {:.3})", label, id, p.x, p.y, p.z);
    }
    if flags.contains(DebugFlags::VELOCITY) {
        let v = entity.velocity(world);
        log::debug!("{} {} velocity: ({:.3}, {:.3}, {:.3})", label, id, v.x, v.y, v.z);
    }
}
