//! Static terrain and props

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::physics::{BodyDesc, BodyKind, ManagedPhysicsEntity, PhysicsBody, PhysicsEntity, PhysicsWorld, ShapeDesc};
use crate::scene::{EntityId, GameObject, Model};
use std::sync::Arc;

/// Immovable box on the non-moving layer (floors, walls, crates)
pub struct StaticProp {
    id: EntityId,
    body: PhysicsBody,
    half_extents: Vec3,
    color: Vec3,
    model: Option<Arc<Model>>,
}

impl StaticProp {
    /// Box with the given half extents centered at `position`
    pub fn cuboid(position: Vec3, half_extents: Vec3) -> Self {
        Self::oriented(position, Quat::identity(), half_extents)
    }

    /// Rotated box
    pub fn oriented(position: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        let mut desc = BodyDesc::new(BodyKind::Fixed, ShapeDesc::Cuboid(half_extents), position);
        desc.rotation = rotation;

        Self {
            id: EntityId::next(),
            body: PhysicsBody::new(desc),
            half_extents,
            color: Vec3::new(0.5, 0.5, 0.5),
            model: None,
        }
    }

    /// Large flat floor whose top face is at `height`
    pub fn floor(height: f32, half_size: f32) -> Self {
        Self::cuboid(Vec3::new(0.0, height - 0.5, 0.0), Vec3::new(half_size, 0.5, half_size))
    }

    /// Attach a mesh; the unit-cube mesh is scaled to the box extents
    pub fn with_model(mut self, model: Arc<Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the base color
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }
}

impl GameObject for StaticProp {
    fn id(&self) -> EntityId {
        self.id
    }

    fn transform(&self, world: &PhysicsWorld) -> Transform {
        self.body.transform(world).with_scale(self.half_extents * 2.0)
    }

    fn color(&self) -> Vec3 {
        self.color
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model.clone()
    }
}

impl PhysicsEntity for StaticProp {
    fn body(&self) -> &PhysicsBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicsBody {
        &mut self.body
    }
}

impl ManagedPhysicsEntity for StaticProp {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::physics::ObjectLayer;
    use approx::assert_relative_eq;

    #[test]
    fn test_floor_top_face_at_height() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let mut floor = StaticProp::floor(0.0, 10.0);
        floor.add_physics_body(&mut world).unwrap();
        world.optimize_broad_phase();

        let hit = world
            .cast_ray(Vec3::new(0.0, 5.0, 0.0), -Vec3::y(), 10.0, None)
            .expect("floor below");
        assert_relative_eq!(hit.point.y, 0.0, epsilon = 1e-4);
        assert_eq!(floor.body().desc().layer, ObjectLayer::NonMoving);

        floor.destroy_physics_body(&mut world);
    }

    #[test]
    fn test_transform_scales_to_extents() {
        let world = PhysicsWorld::new(&PhysicsConfig::default());
        let prop = StaticProp::cuboid(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 1.0, 2.0));

        let transform = prop.transform(&world);
        assert_relative_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(transform.scale, Vec3::new(1.0, 2.0, 4.0));
    }
}
