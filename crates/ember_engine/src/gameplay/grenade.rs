//! Thrown grenade: a dynamic ball that explodes when its fuse runs out

use crate::foundation::math::{Transform, Vec3};
use crate::physics::{
    BodyDesc, BodyKind, ManagedPhysicsEntity, PhysicsBody, PhysicsEntity, PhysicsWorld, ShapeDesc, StepContext,
};
use crate::scene::{EntityId, GameObject, Model};
use std::sync::Arc;

/// Grenade tunables
#[derive(Debug, Clone)]
pub struct GrenadeSettings {
    /// Seconds from throw to detonation
    pub fuse: f32,
    /// Blast radius
    pub blast_radius: f32,
    /// Damage to every enemy inside the blast
    pub damage: f32,
    /// Detonate on the first contact with another entity
    pub impact_fuse: bool,
}

impl Default for GrenadeSettings {
    fn default() -> Self {
        Self {
            fuse: 2.0,
            blast_radius: 5.0,
            damage: 60.0,
            impact_fuse: false,
        }
    }
}

/// Fused projectile
///
/// Explodes through the scene command buffer and despawns itself the same
/// way, so it disappears right after the step in which it went off.
pub struct Grenade {
    id: EntityId,
    body: PhysicsBody,
    settings: GrenadeSettings,
    fuse: f32,
    detonated: bool,
    model: Option<Arc<Model>>,
}

impl Grenade {
    /// Grenade leaving `origin` with `velocity`
    pub fn thrown(origin: Vec3, velocity: Vec3, settings: GrenadeSettings) -> Self {
        let mut desc = BodyDesc::new(BodyKind::Dynamic, ShapeDesc::Ball(0.15), origin)
            .with_velocity(velocity)
            .with_contact_events();
        desc.restitution = 0.3;
        desc.ccd = true;

        Self {
            id: EntityId::next(),
            body: PhysicsBody::new(desc),
            fuse: settings.fuse,
            settings,
            detonated: false,
            model: None,
        }
    }

    /// Attach a mesh
    pub fn with_model(mut self, model: Arc<Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Seconds left on the fuse
    pub fn fuse_remaining(&self) -> f32 {
        self.fuse
    }

    /// Whether the grenade already went off
    pub fn has_detonated(&self) -> bool {
        self.detonated
    }
}

impl GameObject for Grenade {
    fn id(&self) -> EntityId {
        self.id
    }

    fn transform(&self, world: &PhysicsWorld) -> Transform {
        self.body.transform(world)
    }

    fn position(&self, world: &PhysicsWorld) -> Vec3 {
        self.body.position(world)
    }

    fn color(&self) -> Vec3 {
        Vec3::new(0.3, 0.4, 0.2)
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model.clone()
    }
}

impl PhysicsEntity for Grenade {
    fn body(&self) -> &PhysicsBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicsBody {
        &mut self.body
    }
}

impl ManagedPhysicsEntity for Grenade {
    fn update(&mut self, ctx: &mut StepContext<'_>) {
        if self.detonated {
            return;
        }

        self.fuse -= ctx.dt;
        if self.fuse > 0.0 {
            return;
        }

        let origin = self.body.position(ctx.world);
        log::debug!("Grenade {} detonated at ({:.2}, {:.2}, {:.2})", self.id, origin.x, origin.y, origin.z);
        ctx.commands
            .explode(self.id, origin, self.settings.blast_radius, self.settings.damage);
        ctx.commands.despawn(self.id);
        self.detonated = true;
    }

    fn on_contact(&mut self, other: Option<EntityId>) {
        if self.settings.impact_fuse && other.is_some() && !self.detonated {
            self.fuse = 0.0;
        }
    }
}
