//! Fixed-step physics simulation driving the scene
//!
//! One sub-step is always the same three calls, in order:
//!
//! 1. [`PhysicsSimulation::pre_simulation`] - broad-phase rebuild if the scene
//!    changed, player input, enemy AI and managed-entity updates, then the
//!    scene commands those produced;
//! 2. [`PhysicsSimulation::simulate`] - one world step on the worker pool,
//!    then the stale queue is flushed and capacity ceilings are checked;
//! 3. [`PhysicsSimulation::post_simulation`] - recorded contacts are handed
//!    to gameplay, then player and enemies reconcile and log.

use crate::config::{DebugConfig, PhysicsConfig};
use crate::foundation::math::Vec3;
use crate::gameplay::MovementIntent;
use crate::physics::entity::PhysicsEntity;
use crate::physics::error::PhysicsError;
use crate::physics::listeners::{AcceptAllContacts, ActivationListener, ContactListener, LoggingActivationListener};
use crate::physics::world::{ContactLoad, PhysicsWorld, RayHit};
use crate::scene::{EntityId, SceneError, SceneManager};
use rapier3d::dynamics::RigidBodyHandle;
use rapier3d::pipeline::PhysicsHooks;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashSet;

bitflags::bitflags! {
    /// What to log after each step
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugFlags: u32 {
        /// Player and enemy positions
        const POSITION = 1 << 0;
        /// Player and enemy velocities
        const VELOCITY = 1 << 1;
        /// Player and enemy health
        const HEALTH = 1 << 2;
    }
}

impl From<&DebugConfig> for DebugFlags {
    fn from(config: &DebugConfig) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::POSITION, config.log_positions);
        flags.set(Self::VELOCITY, config.log_velocities);
        flags.set(Self::HEALTH, config.log_health);
        flags
    }
}

/// Outcome of one [`PhysicsSimulation::simulate`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Steps run so far, this one included
    pub step: u64,
    /// Entities deleted from the stale queue after the step
    pub removed_stale: usize,
    /// Bodies that woke up during the step
    pub activated: usize,
    /// Bodies that fell asleep during the step
    pub deactivated: usize,
    /// Narrow-phase load of the step
    pub load: ContactLoad,
}

/// The physics side of the frame loop
pub struct PhysicsSimulation {
    world: PhysicsWorld,
    pool: ThreadPool,
    config: PhysicsConfig,
    contact_listener: ContactListener,
    hooks: Box<dyn PhysicsHooks>,
    activation_listener: Box<dyn ActivationListener>,
    previously_active: HashSet<RigidBodyHandle>,
    step_count: u64,
}

impl PhysicsSimulation {
    /// Build the world and the worker pool
    ///
    /// Fails if the configuration is unusable or the pool cannot be created;
    /// both are fatal for the engine.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;

        let threads = config.resolved_worker_threads();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("ember-physics-{}", index))
            .build()
            .map_err(|e| PhysicsError::ThreadPool(e.to_string()))?;

        log::info!(
            "Physics simulation created: step {:.4}s, {} worker threads, max {} bodies",
            config.fixed_timestep,
            threads,
            config.max_bodies
        );

        Ok(Self {
            world: PhysicsWorld::new(&config),
            pool,
            config,
            contact_listener: ContactListener::new(),
            hooks: Box::new(AcceptAllContacts),
            activation_listener: Box::new(LoggingActivationListener),
            previously_active: HashSet::new(),
            step_count: 0,
        })
    }

    /// Replace the contact validation hook
    pub fn with_hooks(mut self, hooks: Box<dyn PhysicsHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the activation listener
    pub fn with_activation_listener(mut self, listener: Box<dyn ActivationListener>) -> Self {
        self.activation_listener = listener;
        self
    }

    /// Configuration the simulation was built with
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Physics world
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Mutable physics world, for adding entities to the scene
    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    /// Number of steps run
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Length of one step in seconds
    pub fn fixed_timestep(&self) -> f32 {
        self.config.fixed_timestep
    }

    /// Prepare the next step
    ///
    /// Body queries made here (character controller, AI ray casts) see a
    /// freshly optimized broad phase whenever the scene changed since the
    /// last pre-step.
    pub fn pre_simulation(&mut self, scene: &mut SceneManager, intent: &MovementIntent) -> Result<(), SceneError> {
        if scene.is_broad_phase_optimization_needed() {
            self.world.optimize_broad_phase();
        }

        let dt = self.world.timestep();
        if let Some(player) = scene.player_mut() {
            player.apply_input(&mut self.world, intent, dt);
        }

        let mut commands = scene.update_active_entities(&mut self.world, dt);
        if !commands.is_empty() {
            log::trace!("Applying {} scene commands", commands.len());
        }
        scene.apply_commands(&mut commands, &mut self.world)
    }

    /// Advance the world by exactly one fixed step
    ///
    /// Entities queued for deletion (during this step or before it) are
    /// removed as soon as the step returns.
    pub fn simulate(&mut self, scene: &mut SceneManager) -> Result<StepReport, PhysicsError> {
        let world = &mut self.world;
        let hooks = self.hooks.as_ref();
        let events = &self.contact_listener;
        self.pool.install(|| world.step(hooks, events));
        self.step_count += 1;

        let load = self.world.contact_load();
        let removed_stale = scene.remove_stale_objects(&mut self.world);
        let (activated, deactivated) = self.report_activation();
        self.check_capacity(load)?;

        Ok(StepReport {
            step: self.step_count,
            removed_stale,
            activated,
            deactivated,
            load,
        })
    }

    /// React to the step that just ran
    pub fn post_simulation(&mut self, scene: &mut SceneManager, flags: DebugFlags) {
        let contacts = self.contact_listener.drain();
        let delivered = scene.dispatch_contacts(&contacts);
        if !contacts.is_empty() {
            log::trace!("{} contacts recorded, {} delivered", contacts.len(), delivered);
        }

        scene.post_step_entities(&self.world, flags);
    }

    /// Cast a ray against bodies in the simulation
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        self.world.cast_ray(origin, direction, max_distance, None)
    }

    /// Entity hit by a ray, ignoring the player
    pub fn pick_entity(
        &self,
        scene: &SceneManager,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<EntityId> {
        let exclude = scene.player().and_then(|player| player.body_handle());
        let hit = self.world.cast_ray(origin, direction, max_distance, exclude)?;
        scene.id_from_body(hit.body)
    }

    fn check_capacity(&self, load: ContactLoad) -> Result<(), PhysicsError> {
        if load.body_pairs > self.config.max_body_pairs {
            log::error!("{} body pairs in contact, limit is {}", load.body_pairs, self.config.max_body_pairs);
            return Err(PhysicsError::CapacityExceeded {
                resource: "body pairs",
                limit: self.config.max_body_pairs,
            });
        }
        if load.contact_constraints > self.config.max_contact_constraints {
            log::error!(
                "{} contact constraints, limit is {}",
                load.contact_constraints,
                self.config.max_contact_constraints
            );
            return Err(PhysicsError::CapacityExceeded {
                resource: "contact constraints",
                limit: self.config.max_contact_constraints,
            });
        }
        Ok(())
    }

    fn report_activation(&mut self) -> (usize, usize) {
        let active: HashSet<RigidBodyHandle> = self.world.active_bodies().collect();

        let mut activated = 0;
        for &body in active.difference(&self.previously_active) {
            self.activation_listener.on_body_activated(body);
            activated += 1;
        }

        let mut deactivated = 0;
        for &body in self.previously_active.difference(&active) {
            // Destroyed or detached bodies are not reported as sleeping
            if self.world.contains_body(body) && self.world.is_body_enabled(body) {
                self.activation_listener.on_body_deactivated(body);
                deactivated += 1;
            }
        }

        self.previously_active = active;
        (activated, deactivated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::gameplay::{Grenade, GrenadeSettings, StaticProp};
    use std::sync::{Arc, Mutex};

    type ActivationLog = Arc<Mutex<Vec<(bool, RigidBodyHandle)>>>;

    struct RecordingListener(ActivationLog);

    impl ActivationListener for RecordingListener {
        fn on_body_activated(&mut self, body: RigidBodyHandle) {
            self.0.lock().unwrap().push((true, body));
        }

        fn on_body_deactivated(&mut self, body: RigidBodyHandle) {
            self.0.lock().unwrap().push((false, body));
        }
    }

    fn recording_simulation(config: PhysicsConfig) -> (PhysicsSimulation, ActivationLog) {
        let log = ActivationLog::default();
        let simulation = PhysicsSimulation::new(config)
            .unwrap()
            .with_activation_listener(Box::new(RecordingListener(Arc::clone(&log))));
        (simulation, log)
    }

    fn grenade_at(position: Vec3) -> Box<Grenade> {
        Box::new(Grenade::thrown(position, Vec3::zeros(), GrenadeSettings::default()))
    }

    #[test]
    fn test_debug_flags_from_config() {
        let flags = DebugFlags::from(&DebugConfig {
            log_positions: true,
            log_velocities: false,
            log_health: true,
        });

        assert!(flags.contains(DebugFlags::POSITION | DebugFlags::HEALTH));
        assert!(!flags.contains(DebugFlags::VELOCITY));
        assert_eq!(DebugFlags::from(&DebugConfig::default()), DebugFlags::empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = PhysicsSimulation::new(PhysicsConfig {
            max_substeps: 0,
            ..Default::default()
        });

        assert!(matches!(
            result,
            Err(PhysicsError::InvalidConfig(ConfigError::Invalid { field: "max_substeps", .. }))
        ));
    }

    #[test]
    fn test_empty_scene_steps() {
        let mut simulation = PhysicsSimulation::new(PhysicsConfig {
            worker_threads: Some(1),
            ..Default::default()
        })
        .unwrap();
        let mut scene = SceneManager::new();

        for _ in 0..3 {
            simulation.pre_simulation(&mut scene, &MovementIntent::default()).unwrap();
            let report = simulation.simulate(&mut scene).unwrap();
            simulation.post_simulation(&mut scene, DebugFlags::all());
            assert_eq!(report.removed_stale, 0);
            assert_eq!(report.load, ContactLoad::default());
        }

        assert_eq!(simulation.step_count(), 3);
        assert!(simulation.raycast(Vec3::zeros(), -Vec3::y(), 100.0).is_none());
    }

    #[test]
    fn test_detached_body_is_not_reported_as_sleeping() {
        let (mut simulation, log) = recording_simulation(PhysicsConfig {
            worker_threads: Some(1),
            ..Default::default()
        });
        let mut scene = SceneManager::new();

        let id = scene
            .add_managed_physics_entity(grenade_at(Vec3::new(0.0, 10.0, 0.0)), simulation.world_mut())
            .unwrap();
        let handle = scene.physics_entity(id).and_then(|e| e.body_handle()).unwrap();

        let report = simulation.simulate(&mut scene).unwrap();
        assert_eq!(report.activated, 1);
        assert_eq!(*log.lock().unwrap(), vec![(true, handle)]);

        scene.detach_physics_object(id, simulation.world_mut()).unwrap();
        let report = simulation.simulate(&mut scene).unwrap();
        assert_eq!(report.deactivated, 0);
        assert_eq!(*log.lock().unwrap(), vec![(true, handle)]);

        scene.clear(simulation.world_mut());
    }

    #[test]
    fn test_activation_reported_when_capacity_exceeded() {
        let (mut simulation, log) = recording_simulation(PhysicsConfig {
            worker_threads: Some(1),
            max_body_pairs: 1,
            ..Default::default()
        });
        let mut scene = SceneManager::new();

        scene
            .add_managed_physics_entity(Box::new(StaticProp::floor(0.0, 10.0)), simulation.world_mut())
            .unwrap();
        // Both balls start sunk into the floor, so two pairs are in contact
        for x in [-2.0, 2.0] {
            scene
                .add_managed_physics_entity(grenade_at(Vec3::new(x, 0.1, 0.0)), simulation.world_mut())
                .unwrap();
        }

        let result = simulation.simulate(&mut scene);
        assert!(matches!(
            result,
            Err(PhysicsError::CapacityExceeded { resource: "body pairs", limit: 1 })
        ));
        assert_eq!(simulation.step_count(), 1);

        let activations = log.lock().unwrap();
        assert_eq!(activations.len(), 2);
        assert!(activations.iter().all(|&(woke, _)| woke));
        drop(activations);

        scene.clear(simulation.world_mut());
    }
}
