//! Scene ownership and bookkeeping
//!
//! ## Architecture
//!
//! ```text
//! Gameplay (think / update)
//!      ↓ SceneCommands
//! Scene Manager (owner of every entity)
//!      ↓ add / remove / destroy bodies
//! Physics World
//! ```
//!
//! The Scene Manager:
//! - Keeps every entity in exactly one collection (active, passive, lights, ...)
//! - Defers deletions requested during a step to the stale queue
//! - Tracks when the broad phase needs rebuilding
//! - Maps physics bodies back to entity ids

mod collections;
mod commands;
mod entity;
mod error;
pub mod objects;
mod scene_manager;

pub use collections::{ObjectRole, Scene};
pub use commands::{SceneCommand, SceneCommands};
pub use entity::{EntityId, GameObject, Model};
pub use error::SceneError;
pub use objects::{PointLight, SpectralObject, Sun, UiAnchor, UiElement};
pub use scene_manager::{OwnedObject, RemovedObject, RenderItem, SceneManager};
