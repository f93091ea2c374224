//! # Ember Engine
//!
//! Scene ownership and fixed-step physics synchronization for a 3D game
//! engine. The renderer, windowing and asset loading live elsewhere; this
//! crate owns every live entity and keeps it in step with the `rapier3d`
//! world.
//!
//! ## Features
//!
//! - **Scene Manager**: single owner of all entities, active/passive
//!   collections, deferred deletion through a stale queue
//! - **Physics Simulation**: fixed-step pre/simulate/post cycle on a worker
//!   pool, collision layers, capacity ceilings, contact and activation
//!   listeners
//! - **Gameplay**: kinematic character controller, chasing enemies,
//!   grenades and static props
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PhysicsConfig::default();
//!     let mut simulation = PhysicsSimulation::new(config.clone())?;
//!     let mut scene = SceneManager::new();
//!     let mut timestep = FixedTimestep::new(config.fixed_timestep, config.max_substeps);
//!
//!     scene.set_player(PhysicsPlayer::new(Vec3::new(0.0, 1.5, 0.0), PlayerSettings::default()), simulation.world_mut())?;
//!     scene.add_managed_physics_entity(Box::new(StaticProp::floor(0.0, 50.0)), simulation.world_mut())?;
//!
//!     let intent = MovementIntent::walk(Vec3::x());
//!     timestep.advance(1.0 / 30.0, || -> Result<(), Box<dyn std::error::Error>> {
//!         simulation.pre_simulation(&mut scene, &intent)?;
//!         simulation.simulate(&mut scene)?;
//!         simulation.post_simulation(&mut scene, DebugFlags::empty());
//!         Ok(())
//!     })?;
//!
//!     scene.clear(simulation.world_mut());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod gameplay;
pub mod physics;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, DebugConfig, EngineConfig, PhysicsConfig},
        foundation::{
            math::{Transform, Vec3},
            time::{FixedTimestep, Timer},
        },
        gameplay::{
            Grenade, GrenadeSettings, MovementIntent, PhysicsPlayer, PlayerSettings, Sprinter, SprinterSettings,
            StaticProp,
        },
        physics::{
            DebugFlags, Enemy, ManagedPhysicsEntity, PhysicsEntity, PhysicsError, PhysicsSimulation, PhysicsWorld,
            StepReport,
        },
        scene::{EntityId, GameObject, ObjectRole, SceneCommands, SceneError, SceneManager},
    };
}
