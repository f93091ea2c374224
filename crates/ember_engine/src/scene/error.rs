//! Scene error types

use crate::physics::PhysicsError;
use crate::scene::EntityId;
use thiserror::Error;

/// Errors returned by scene mutations
///
/// Apart from [`SceneError::Physics`] these are caller mistakes; the scene is
/// left unchanged when one is returned.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The id is already present in some collection
    #[error("Entity {0} is already in the scene")]
    DuplicateId(EntityId),

    /// The id is not in the collection the operation expects
    #[error("Entity {0} not found")]
    NotFound(EntityId),

    /// The operation does not apply to the player or the sun
    #[error("Entity {0} is the player or the sun")]
    ProtectedRole(EntityId),

    /// Body creation failed
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}
