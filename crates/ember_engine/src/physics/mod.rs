//! Physics module: rapier-backed world, listeners and the fixed-step loop
//!
//! Rigid bodies, colliders and the solver come from `rapier3d`. This module
//! wraps them so that the rest of the engine deals in entity ids, layers and
//! body descriptions instead of rapier sets.

pub mod collision_layers;
pub mod entity;
pub mod error;
pub mod listeners;
pub mod simulation;
pub mod world;

pub use collision_layers::ObjectLayer;
pub use entity::{Enemy, ManagedPhysicsEntity, PhysicsBody, PhysicsEntity, StepContext};
pub use error::PhysicsError;
pub use listeners::{
    AcceptAllContacts, ActivationListener, ContactListener, ContactPhase, ContactRecord, LoggingActivationListener,
};
pub use simulation::{DebugFlags, PhysicsSimulation, StepReport};
pub use world::{BodyDesc, BodyKind, ContactLoad, PhysicsWorld, RayHit, ShapeDesc};
