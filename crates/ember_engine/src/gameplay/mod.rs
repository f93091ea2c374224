//! Concrete physics-backed entities
//!
//! - [`PhysicsPlayer`]: position-based kinematic character
//! - [`Sprinter`]: velocity-based kinematic melee enemy
//! - [`Grenade`]: dynamic fused projectile
//! - [`StaticProp`]: fixed terrain and props

mod grenade;
mod player;
mod prop;
mod sprinter;

pub use grenade::{Grenade, GrenadeSettings};
pub use player::{MovementIntent, PhysicsPlayer, PlayerSettings};
pub use prop::StaticProp;
pub use sprinter::{Sprinter, SprinterSettings};
