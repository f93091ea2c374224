//! Entity identity and the renderer-facing object contract

use crate::foundation::math::{Mat3, Mat4, Transform, Vec3};
use crate::physics::PhysicsWorld;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique entity identifier
///
/// Ids are handed out in increasing order and never reused while the process
/// runs, so a stale id can only ever miss, never alias another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate the next id
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Renderable mesh data shared between entities
///
/// Loaded by the asset collaborator; entities only keep a shared reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    /// Asset name
    pub name: String,
    /// Vertex positions in model space
    pub vertices: Vec<Vec3>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl Model {
    /// Create a named model from raw geometry
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }
}

/// Everything placed in a scene
///
/// Transform queries take the physics world because physics-backed objects
/// read their pose from the current body state rather than a cached copy.
/// Objects without a body simply ignore it. All queries are side-effect free.
pub trait GameObject {
    /// Immutable entity id
    fn id(&self) -> EntityId;

    /// Current world transform
    fn transform(&self, world: &PhysicsWorld) -> Transform;

    /// Base color attribute
    fn color(&self) -> Vec3 {
        Vec3::new(1.0, 1.0, 1.0)
    }

    /// World-space position
    fn position(&self, world: &PhysicsWorld) -> Vec3 {
        self.transform(world).position
    }

    /// Model matrix for rendering
    fn model_matrix(&self, world: &PhysicsWorld) -> Mat4 {
        self.transform(world).to_matrix()
    }

    /// Normal matrix for rendering
    fn normal_matrix(&self, world: &PhysicsWorld) -> Mat3 {
        self.transform(world).to_normal_matrix()
    }

    /// Renderable mesh, or `None` for objects that are not drawn
    fn model(&self) -> Option<Arc<Model>> {
        None
    }
}
