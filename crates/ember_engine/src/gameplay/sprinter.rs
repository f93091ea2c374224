//! Melee enemy that runs straight at the player

use crate::foundation::math::{horizontal, Transform, Vec3};
use crate::physics::{BodyDesc, BodyKind, Enemy, PhysicsBody, PhysicsEntity, PhysicsWorld, ShapeDesc, StepContext};
use crate::scene::{EntityId, GameObject, Model};
use std::sync::Arc;

/// Sprinter tunables
#[derive(Debug, Clone)]
pub struct SprinterSettings {
    /// Running speed in m/s
    pub speed: f32,
    /// Distance at which the sprinter notices the player
    pub aggro_range: f32,
    /// Distance at which it stops and attacks
    pub attack_range: f32,
    /// Damage per hit
    pub attack_damage: f32,
    /// Seconds between hits
    pub attack_cooldown: f32,
    /// Starting health
    pub max_health: f32,
}

impl Default for SprinterSettings {
    fn default() -> Self {
        Self {
            speed: 4.0,
            aggro_range: 30.0,
            attack_range: 1.5,
            attack_damage: 10.0,
            attack_cooldown: 1.0,
            max_health: 50.0,
        }
    }
}

/// Velocity-driven kinematic enemy
///
/// Never affected by gravity or contacts: each step it moves by exactly the
/// velocity its AI picked.
pub struct Sprinter {
    id: EntityId,
    body: PhysicsBody,
    settings: SprinterSettings,
    health: f32,
    cooldown: f32,
    ai_velocity: Vec3,
    model: Option<Arc<Model>>,
}

impl Sprinter {
    /// Sprinter standing at `position`
    pub fn new(position: Vec3, settings: SprinterSettings) -> Self {
        let desc = BodyDesc::new(
            BodyKind::KinematicVelocity,
            ShapeDesc::Capsule {
                half_height: 0.6,
                radius: 0.4,
            },
            position,
        );

        Self {
            id: EntityId::next(),
            body: PhysicsBody::new(desc),
            health: settings.max_health,
            settings,
            cooldown: 0.0,
            ai_velocity: Vec3::zeros(),
            model: None,
        }
    }

    /// Attach a mesh
    pub fn with_model(mut self, model: Arc<Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Velocity chosen by the last `think`
    pub fn ai_velocity(&self) -> Vec3 {
        self.ai_velocity
    }

    fn choose_velocity(&mut self, position: Vec3, ctx: &mut StepContext<'_>) -> Vec3 {
        let Some(target) = ctx.player_position else {
            return Vec3::zeros();
        };

        let to_target = horizontal(&(target - position));
        let distance = to_target.norm();

        if distance <= self.settings.attack_range {
            if self.cooldown <= 0.0 {
                ctx.commands.damage_player(self.id, self.settings.attack_damage);
                self.cooldown = self.settings.attack_cooldown;
            }
            Vec3::zeros()
        } else if distance <= self.settings.aggro_range {
            to_target / distance * self.settings.speed
        } else {
            Vec3::zeros()
        }
    }
}

impl GameObject for Sprinter {
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
        Vec3::new(0.9, 0.2, 0.1)
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model.clone()
    }
}

impl PhysicsEntity for Sprinter {
    fn body(&self) -> &PhysicsBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicsBody {
        &mut self.body
    }
}

impl Enemy for Sprinter {
    fn think(&mut self, ctx: &mut StepContext<'_>) {
        let Some(handle) = self.body.handle() else {
            return;
        };

        self.cooldown = (self.cooldown - ctx.dt).max(0.0);
        let position = self.body.position(ctx.world);
        self.ai_velocity = self.choose_velocity(position, ctx);
        ctx.world.set_linear_velocity(handle, self.ai_velocity);
    }

    fn take_damage(&mut self, amount: f32) -> f32 {
        self.health = (self.health - amount).max(0.0);
        self.health
    }

    fn health(&self) -> f32 {
        self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::scene::{SceneCommand, SceneCommands};
    use approx::assert_relative_eq;

    fn think_once(sprinter: &mut Sprinter, world: &mut PhysicsWorld, player: Option<Vec3>) -> SceneCommands {
        let mut commands = SceneCommands::new();
        let mut ctx = StepContext {
            world,
            dt: 1.0 / 60.0,
            player_position: player,
            commands: &mut commands,
        };
        sprinter.think(&mut ctx);
        commands
    }

    #[test]
    fn test_runs_toward_player_on_the_ground_plane() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let mut sprinter = Sprinter::new(Vec3::zeros(), SprinterSettings::default());
        sprinter.add_physics_body(&mut world).unwrap();

        let commands = think_once(&mut sprinter, &mut world, Some(Vec3::new(10.0, 5.0, 0.0)));

        assert!(commands.is_empty());
        assert_relative_eq!(sprinter.ai_velocity(), Vec3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(sprinter.velocity(&world), Vec3::new(4.0, 0.0, 0.0));

        sprinter.destroy_physics_body(&mut world);
    }

    #[test]
    fn test_idles_without_player_or_out_of_range() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let mut sprinter = Sprinter::new(Vec3::zeros(), SprinterSettings::default());
        sprinter.add_physics_body(&mut world).unwrap();

        think_once(&mut sprinter, &mut world, None);
        assert_eq!(sprinter.ai_velocity(), Vec3::zeros());

        think_once(&mut sprinter, &mut world, Some(Vec3::new(100.0, 0.0, 0.0)));
        assert_eq!(sprinter.ai_velocity(), Vec3::zeros());

        sprinter.destroy_physics_body(&mut world);
    }

    #[test]
    fn test_attacks_in_range_with_cooldown() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let mut sprinter = Sprinter::new(Vec3::zeros(), SprinterSettings::default());
        sprinter.add_physics_body(&mut world).unwrap();
        let player = Some(Vec3::new(1.0, 0.0, 0.0));

        let mut first = think_once(&mut sprinter, &mut world, player);
        let hits: Vec<SceneCommand> = first.drain().collect();
        assert_eq!(hits.len(), 1);
        assert!(matches!(hits[0], SceneCommand::DamagePlayer { amount, .. } if amount == 10.0));
        assert_eq!(sprinter.ai_velocity(), Vec3::zeros());

        assert!(think_once(&mut sprinter, &mut world, player).is_empty());

        sprinter.destroy_physics_body(&mut world);
    }

    #[test]
    fn test_damage_clamps_and_kills() {
        let mut sprinter = Sprinter::new(Vec3::zeros(), SprinterSettings::default());

        assert_relative_eq!(sprinter.take_damage(20.0), 30.0);
        assert!(!sprinter.is_dead());
        assert_relative_eq!(sprinter.take_damage(100.0), 0.0);
        assert!(sprinter.is_dead());
    }
}
