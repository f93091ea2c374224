//! Scene objects without a physics body: lights, sun, UI and spectral objects

use crate::foundation::math::{Transform, Vec2, Vec3};
use crate::physics::PhysicsWorld;
use crate::scene::entity::{EntityId, GameObject, Model};
use std::sync::Arc;

/// Point light
///
/// Has no orientation; its model matrix is a translation scaled by the
/// light's visual radius.
#[derive(Debug, Clone)]
pub struct PointLight {
    id: EntityId,
    /// World position
    pub position: Vec3,
    /// Light color
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
    /// Radius used when the light is visualised
    pub radius: f32,
}

impl PointLight {
    /// Create a point light with a fresh id
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            id: EntityId::next(),
            position,
            color,
            intensity,
            radius: 0.1,
        }
    }
}

impl GameObject for PointLight {
    fn id(&self) -> EntityId {
        self.id
    }

    fn transform(&self, _world: &PhysicsWorld) -> Transform {
        Transform::from_position(self.position).with_scale(Vec3::repeat(self.radius))
    }

    fn color(&self) -> Vec3 {
        self.color
    }
}

/// Directional sun light; never collides and is not drawn as geometry
#[derive(Debug, Clone)]
pub struct Sun {
    id: EntityId,
    /// Direction the light travels in (normalized)
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
}

impl Sun {
    /// Create a sun shining along `direction`
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            id: EntityId::next(),
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y()),
            color,
            intensity,
        }
    }
}

impl GameObject for Sun {
    fn id(&self) -> EntityId {
        self.id
    }

    fn transform(&self, _world: &PhysicsWorld) -> Transform {
        // Placed "at infinity" opposite its direction, for shadow setup only
        Transform::from_position(-self.direction)
    }

    fn color(&self) -> Vec3 {
        self.color
    }
}

/// How a UI element is positioned
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAnchor {
    /// Fixed screen position in normalized device coordinates
    Screen(Vec2),
    /// Follows a point in the world
    World(Vec3),
}

/// UI element; not affected by physics
#[derive(Debug, Clone)]
pub struct UiElement {
    id: EntityId,
    /// Anchor
    pub anchor: UiAnchor,
    /// Size on screen
    pub scale: Vec2,
    /// Quad or glyph mesh
    pub model: Option<Arc<Model>>,
    /// Tint
    pub color: Vec3,
}

impl UiElement {
    /// Create a UI element
    pub fn new(anchor: UiAnchor, scale: Vec2, model: Option<Arc<Model>>) -> Self {
        Self {
            id: EntityId::next(),
            anchor,
            scale,
            model,
            color: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Whether the element stays put on screen
    pub fn is_screen_fixed(&self) -> bool {
        matches!(self.anchor, UiAnchor::Screen(_))
    }
}

impl GameObject for UiElement {
    fn id(&self) -> EntityId {
        self.id
    }

    fn transform(&self, _world: &PhysicsWorld) -> Transform {
        let position = match self.anchor {
            UiAnchor::Screen(ndc) => Vec3::new(ndc.x, ndc.y, 0.0),
            UiAnchor::World(position) => position,
        };
        Transform::from_position(position).with_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
    }

    fn color(&self) -> Vec3 {
        self.color
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model.clone()
    }
}

/// Object without collision that keeps a fixed offset from the viewpoint
/// (skybox, distant scenery)
#[derive(Debug, Clone)]
pub struct SpectralObject {
    id: EntityId,
    /// Offset from the viewpoint
    pub offset: Vec3,
    /// Scale
    pub scale: Vec3,
    viewpoint: Vec3,
    /// Mesh
    pub model: Option<Arc<Model>>,
}

impl SpectralObject {
    /// Create a spectral object at `offset` from the viewpoint
    pub fn new(offset: Vec3, scale: Vec3, model: Option<Arc<Model>>) -> Self {
        Self {
            id: EntityId::next(),
            offset,
            scale,
            viewpoint: Vec3::zeros(),
            model,
        }
    }

    /// Move with the viewpoint
    pub fn follow(&mut self, viewpoint: Vec3) {
        self.viewpoint = viewpoint;
    }
}

impl GameObject for SpectralObject {
    fn id(&self) -> EntityId {
        self.id
    }

    fn transform(&self, _world: &PhysicsWorld) -> Transform {
        Transform::from_position(self.viewpoint + self.offset).with_scale(self.scale)
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model.clone()
    }
}
