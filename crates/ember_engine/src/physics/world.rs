//! Physics world: rapier body/collider storage plus the pipeline that steps it
//!
//! [`PhysicsWorld`] is the only type that touches rapier's sets directly. It
//! distinguishes the two ways a body can leave the simulation:
//!
//! - **detach** ([`PhysicsWorld::set_body_enabled`] with `false`): the body is
//!   disabled, keeps its handle, pose and velocity, and can be re-enabled;
//! - **destroy** ([`PhysicsWorld::destroy_body`]): the body and its colliders
//!   are released and the handle becomes invalid.

use crate::config::PhysicsConfig;
use crate::foundation::math::{Point3, Quat, Vec3};
use crate::physics::collision_layers::ObjectLayer;
use crate::physics::error::PhysicsError;
use rapier3d::control::{EffectiveCharacterMovement, KinematicCharacterController};
use rapier3d::prelude::*;

/// Motion type of a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Fully simulated body affected by gravity and contacts
    Dynamic,
    /// Immovable body (terrain, props)
    Fixed,
    /// Moved by setting a velocity (AI-driven actors)
    KinematicVelocity,
    /// Moved by setting the next position (character controllers)
    KinematicPosition,
}

/// Collision shape of a body's single collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeDesc {
    /// Sphere with the given radius
    Ball(f32),
    /// Y-aligned capsule
    Capsule {
        /// Half the height of the cylindrical part
        half_height: f32,
        /// Radius of the caps
        radius: f32,
    },
    /// Box with the given half extents
    Cuboid(Vec3),
}

/// Everything needed to create a body and its collider
#[derive(Debug, Clone)]
pub struct BodyDesc {
    /// Motion type
    pub kind: BodyKind,
    /// Collider shape
    pub shape: ShapeDesc,
    /// Initial position
    pub position: Vec3,
    /// Initial rotation
    pub rotation: Quat,
    /// Initial linear velocity
    pub linear_velocity: Vec3,
    /// Object layer used for collision filtering
    pub layer: ObjectLayer,
    /// Collider density (dynamic bodies only)
    pub density: f32,
    /// Restitution of the collider
    pub restitution: f32,
    /// Report contact start/stop events for this body
    pub contact_events: bool,
    /// Report per-step contact force (persisted contact) events
    pub contact_force_events: bool,
    /// Run contact pairs through the contact validation hook
    pub validate_contacts: bool,
    /// Enable continuous collision detection (fast projectiles)
    pub ccd: bool,
}

impl BodyDesc {
    /// Body description with defaults for the given kind, shape and position
    pub fn new(kind: BodyKind, shape: ShapeDesc, position: Vec3) -> Self {
        let layer = match kind {
            BodyKind::Fixed => ObjectLayer::NonMoving,
            _ => ObjectLayer::Moving,
        };
        Self {
            kind,
            shape,
            position,
            rotation: Quat::identity(),
            linear_velocity: Vec3::zeros(),
            layer,
            density: 1.0,
            restitution: 0.0,
            contact_events: false,
            contact_force_events: false,
            validate_contacts: false,
            ccd: false,
        }
    }

    /// Set the initial velocity
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Enable contact start/stop events
    pub fn with_contact_events(mut self) -> Self {
        self.contact_events = true;
        self
    }

    fn rigid_body(&self) -> RigidBody {
        let body_type = match self.kind {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
            BodyKind::KinematicVelocity => RigidBodyType::KinematicVelocityBased,
            BodyKind::KinematicPosition => RigidBodyType::KinematicPositionBased,
        };

        RigidBodyBuilder::new(body_type)
            .translation(self.position)
            .rotation(self.rotation.scaled_axis())
            .linvel(self.linear_velocity)
            .ccd_enabled(self.ccd)
            .build()
    }

    fn collider(&self) -> Collider {
        let builder = match self.shape {
            ShapeDesc::Ball(radius) => ColliderBuilder::ball(radius),
            ShapeDesc::Capsule { half_height, radius } => ColliderBuilder::capsule_y(half_height, radius),
            ShapeDesc::Cuboid(half) => ColliderBuilder::cuboid(half.x, half.y, half.z),
        };

        let mut events = ActiveEvents::empty();
        if self.contact_events {
            events |= ActiveEvents::COLLISION_EVENTS;
        }
        if self.contact_force_events {
            events |= ActiveEvents::CONTACT_FORCE_EVENTS;
        }

        let hooks = if self.validate_contacts {
            ActiveHooks::FILTER_CONTACT_PAIRS
        } else {
            ActiveHooks::empty()
        };

        builder
            .density(self.density)
            .restitution(self.restitution)
            .collision_groups(self.layer.interaction_groups())
            .active_events(events)
            .active_hooks(hooks)
            .build()
    }
}

/// A ray cast result
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Body owning the collider that was hit
    pub body: RigidBodyHandle,
    /// Distance along the (normalized) ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
}

/// Narrow-phase load after a step, compared against the capacity ceilings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactLoad {
    /// Body pairs with at least one active contact
    pub body_pairs: usize,
    /// Solver contact constraints generated for this step
    pub contact_constraints: usize,
}

/// Rapier state for one simulated world
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    max_bodies: usize,
}

impl PhysicsWorld {
    /// Create an empty world stepping by `config.fixed_timestep`
    pub fn new(config: &PhysicsConfig) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: config.fixed_timestep,
            ..IntegrationParameters::default()
        };

        Self {
            gravity: config.gravity,
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            max_bodies: config.max_bodies,
        }
    }

    /// Length of one step in seconds
    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// World gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Create a body with its collider
    ///
    /// Fails once `max_bodies` bodies exist (enabled or not).
    pub fn create_body(&mut self, desc: &BodyDesc) -> Result<RigidBodyHandle, PhysicsError> {
        if self.bodies.len() >= self.max_bodies {
            return Err(PhysicsError::CapacityExceeded {
                resource: "bodies",
                limit: self.max_bodies,
            });
        }

        let handle = self.bodies.insert(desc.rigid_body());
        self.colliders
            .insert_with_parent(desc.collider(), handle, &mut self.bodies);

        log::trace!("Created {:?} body {:?} at {:?}", desc.kind, handle, desc.position);
        Ok(handle)
    }

    /// Release a body and its colliders permanently
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> bool {
        let removed = self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        if removed.is_some() {
            log::trace!("Destroyed body {:?}", handle);
        }
        removed.is_some()
    }

    /// Enable (re-add) or disable (detach) a body without destroying it
    pub fn set_body_enabled(&mut self, handle: RigidBodyHandle, enabled: bool) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_enabled(enabled);
                if enabled {
                    body.wake_up(true);
                }
                true
            }
            None => false,
        }
    }

    /// Whether the handle refers to a live body
    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    /// Whether the body exists and takes part in simulation
    pub fn is_body_enabled(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).map_or(false, RigidBody::is_enabled)
    }

    /// Number of live bodies (enabled or not)
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Current body translation
    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|body| *body.translation())
    }

    /// Current body rotation
    pub fn body_rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|body| *body.rotation())
    }

    /// Current body linear velocity
    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|body| *body.linvel())
    }

    /// Set the linear velocity, waking the body
    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(velocity, true);
        }
    }

    /// Teleport a body
    pub fn set_translation(&mut self, handle: RigidBodyHandle, translation: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(translation, true);
        }
    }

    /// Target position of a position-based kinematic body for the next step
    pub fn set_next_kinematic_translation(&mut self, handle: RigidBodyHandle, translation: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_translation(translation);
            body.wake_up(true);
        }
    }

    /// Resolve a desired character displacement against the world
    ///
    /// Uses the body's first collider as the character shape and ignores the
    /// body itself and sensors. Returns `None` if the body has no collider.
    pub fn move_character(
        &self,
        controller: &KinematicCharacterController,
        handle: RigidBodyHandle,
        desired_translation: Vec3,
        dt: f32,
    ) -> Option<EffectiveCharacterMovement> {
        let body = self.bodies.get(handle)?;
        let collider = self.colliders.get(*body.colliders().first()?)?;

        let filter = QueryFilter::default()
            .exclude_rigid_body(handle)
            .exclude_sensors();

        Some(controller.move_shape(
            dt,
            &self.bodies,
            &self.colliders,
            &self.query_pipeline,
            collider.shape(),
            collider.position(),
            desired_translation,
            filter,
            |_| {},
        ))
    }

    /// Cast a ray against enabled bodies, optionally ignoring one body
    pub fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize(f32::EPSILON)?;
        let ray = Ray::new(Point3::from(origin), direction);

        let bodies = &self.bodies;
        let only_enabled = |_handle: ColliderHandle, collider: &Collider| {
            collider
                .parent()
                .and_then(|parent| bodies.get(parent))
                .map_or(false, RigidBody::is_enabled)
        };

        let mut filter = QueryFilter::default().exclude_sensors().predicate(&only_enabled);
        if let Some(handle) = exclude {
            filter = filter.exclude_rigid_body(handle);
        }

        let (collider_handle, distance) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        let body = self.colliders.get(collider_handle)?.parent()?;

        Some(RayHit {
            body,
            distance,
            point: ray.point_at(distance).coords,
        })
    }

    /// Rebuild the query acceleration structure from scratch
    ///
    /// Incremental updates during [`PhysicsWorld::step`] keep it usable, but
    /// after bodies are added, enabled or disabled in bulk the tree is
    /// unbalanced and missing new bodies until rebuilt. This is the expensive
    /// broad-phase optimization and must only run when the scene changed.
    pub fn optimize_broad_phase(&mut self) {
        self.query_pipeline.update(&self.bodies, &self.colliders);
        log::debug!("Broad phase optimized ({} bodies)", self.bodies.len());
    }

    /// Advance the world by one fixed step
    pub fn step(&mut self, hooks: &dyn PhysicsHooks, events: &dyn EventHandler) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            hooks,
            events,
        );
    }

    /// Bodies currently awake (dynamic and kinematic)
    pub fn active_bodies(&self) -> impl Iterator<Item = RigidBodyHandle> + '_ {
        self.island_manager
            .active_dynamic_bodies()
            .iter()
            .chain(self.island_manager.active_kinematic_bodies().iter())
            .copied()
    }

    /// Narrow-phase load produced by the last step
    pub fn contact_load(&self) -> ContactLoad {
        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .fold(ContactLoad::default(), |mut load, pair| {
                load.body_pairs += 1;
                load.contact_constraints += pair
                    .manifolds
                    .iter()
                    .map(|manifold| manifold.data.solver_contacts.len())
                    .sum::<usize>();
                load
            })
    }
}
