//! Player character driven by a kinematic character controller

use crate::foundation::math::{horizontal, Transform, Vec3};
use crate::physics::entity::log_debug_state;
use crate::physics::{
    BodyDesc, BodyKind, DebugFlags, PhysicsBody, PhysicsEntity, PhysicsWorld, ShapeDesc,
};
use crate::scene::{EntityId, GameObject, Model};
use rapier3d::control::KinematicCharacterController;
use std::sync::Arc;

/// Buffered player input for one physics step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementIntent {
    /// Desired horizontal direction (world space, any length; Y is ignored)
    pub direction: Vec3,
    /// Jump requested this step
    pub jump: bool,
}

impl MovementIntent {
    /// Walk in a direction without jumping
    pub fn walk(direction: Vec3) -> Self {
        Self { direction, jump: false }
    }
}

/// Tunables for the player character
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// Horizontal speed in m/s
    pub move_speed: f32,
    /// Initial upward speed of a jump
    pub jump_speed: f32,
    /// Capsule half height (cylindrical part)
    pub half_height: f32,
    /// Capsule radius
    pub radius: f32,
    /// Starting health
    pub max_health: f32,
    /// Extra distance below the capsule that still counts as standing
    pub ground_probe: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            jump_speed: 5.0,
            half_height: 0.9,
            radius: 0.4,
            max_health: 100.0,
            ground_probe: 0.05,
        }
    }
}

/// The player: one position-based kinematic body moved by a character controller
pub struct PhysicsPlayer {
    id: EntityId,
    body: PhysicsBody,
    controller: KinematicCharacterController,
    settings: PlayerSettings,
    vertical_velocity: f32,
    on_ground: bool,
    health: f32,
    last_displacement: Vec3,
    model: Option<Arc<Model>>,
}

impl PhysicsPlayer {
    /// Create a player standing at `position`; the body is created when the
    /// player is handed to the scene manager
    pub fn new(position: Vec3, settings: PlayerSettings) -> Self {
        let desc = BodyDesc::new(
            BodyKind::KinematicPosition,
            ShapeDesc::Capsule {
                half_height: settings.half_height,
                radius: settings.radius,
            },
            position,
        );

        Self {
            id: EntityId::next(),
            body: PhysicsBody::new(desc),
            controller: KinematicCharacterController::default(),
            health: settings.max_health,
            settings,
            vertical_velocity: 0.0,
            on_ground: false,
            last_displacement: Vec3::zeros(),
            model: None,
        }
    }

    /// Attach a mesh
    pub fn with_model(mut self, model: Arc<Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Resolve this step's input into a displacement and queue it on the body
    ///
    /// Returns the displacement the controller allowed, which the body will
    /// have travelled once the step has run.
    pub fn apply_input(&mut self, world: &mut PhysicsWorld, intent: &MovementIntent, dt: f32) -> Vec3 {
        let Some(handle) = self.body.handle().filter(|&handle| world.is_body_enabled(handle)) else {
            self.last_displacement = Vec3::zeros();
            return self.last_displacement;
        };

        let walk = horizontal(&intent.direction)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::zeros)
            * self.settings.move_speed;

        if intent.jump && self.on_ground {
            self.vertical_velocity = self.settings.jump_speed;
            self.on_ground = false;
        } else if !self.on_ground {
            self.vertical_velocity += world.gravity().y * dt;
        }

        let desired = (walk + Vec3::y() * self.vertical_velocity) * dt;
        let displacement = match world.move_character(&self.controller, handle, desired, dt) {
            Some(movement) => {
                self.on_ground = movement.grounded;
                movement.translation
            }
            None => Vec3::zeros(),
        };

        let current = self.body.position(world);
        world.set_next_kinematic_translation(handle, current + displacement);
        self.last_displacement = displacement;
        displacement
    }

    /// Settle onto the ground after the step
    ///
    /// Probes straight down from the capsule center; standing on something
    /// stops any downward vertical motion so gravity does not accumulate.
    pub fn post_step(&mut self, world: &PhysicsWorld, flags: DebugFlags) {
        if let Some(handle) = self.body.handle() {
            let reach = self.settings.half_height + self.settings.radius + self.settings.ground_probe;
            let origin = self.body.position(world);
            self.on_ground = world
                .cast_ray(origin, -Vec3::y(), reach, Some(handle))
                .is_some();

            if self.on_ground && self.vertical_velocity < 0.0 {
                self.vertical_velocity = 0.0;
            }
        }

        log_debug_state(self.id, "player", world, self, flags);
        if flags.contains(DebugFlags::HEALTH) {
            log::debug!("player {} health: {:.1}", self.id, self.health);
        }
    }

    /// Displacement resolved by the controller for the last step
    pub fn last_displacement(&self) -> Vec3 {
        self.last_displacement
    }

    /// Whether the player stood on something after the last step
    pub fn is_on_ground(&self) -> bool {
        self.on_ground
    }

    /// Vertical speed carried between steps
    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    /// Apply damage and return the remaining health
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            log::info!("Player {} died", self.id);
        }
        self.health
    }

    /// Current health
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Whether health has dropped to zero
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

impl GameObject for PhysicsPlayer {
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
        Vec3::new(0.2, 0.6, 1.0)
    }

    fn model(&self) -> Option<Arc<Model>> {
        self.model.clone()
    }
}

impl PhysicsEntity for PhysicsPlayer {
    fn body(&self) -> &PhysicsBody {
        &self.body
    }

    fn body_mut(&mut self) -> &mut PhysicsBody {
        &mut self.body
    }

    // Position-based kinematic bodies carry no velocity of their own
    fn velocity(&self, world: &PhysicsWorld) -> Vec3 {
        let dt = world.timestep();
        if dt > 0.0 {
            self.last_displacement / dt
        } else {
            Vec3::zeros()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_input_without_body_does_nothing() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let mut player = PhysicsPlayer::new(Vec3::zeros(), PlayerSettings::default());

        let moved = player.apply_input(&mut world, &MovementIntent::walk(Vec3::x()), 1.0 / 60.0);
        assert_eq!(moved, Vec3::zeros());
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut player = PhysicsPlayer::new(Vec3::zeros(), PlayerSettings::default());

        assert_relative_eq!(player.take_damage(30.0), 70.0);
        assert!(!player.is_dead());
        assert_relative_eq!(player.take_damage(500.0), 0.0);
        assert!(player.is_dead());
    }

    #[test]
    fn test_player_lands_on_floor() {
        let config = PhysicsConfig::default();
        let mut world = PhysicsWorld::new(&config);
        let mut floor = PhysicsBody::new(BodyDesc::new(
            BodyKind::Fixed,
            ShapeDesc::Cuboid(Vec3::new(20.0, 0.5, 20.0)),
            Vec3::new(0.0, -0.5, 0.0),
        ));
        floor.add(&mut world).unwrap();

        let settings = PlayerSettings::default();
        let standing_height = settings.half_height + settings.radius;
        let mut player = PhysicsPlayer::new(Vec3::new(0.0, standing_height + 0.5, 0.0), settings);
        player.add_physics_body(&mut world).unwrap();
        world.optimize_broad_phase();

        for _ in 0..120 {
            player.apply_input(&mut world, &MovementIntent::default(), config.fixed_timestep);
            world.step(&(), &crate::physics::ContactListener::new());
            player.post_step(&world, DebugFlags::empty());
        }

        assert!(player.is_on_ground());
        assert_relative_eq!(player.vertical_velocity(), 0.0);
        let y = player.position(&world).y;
        assert!(y > standing_height - 0.1 && y < standing_height + 0.3, "player settled at y = {}", y);

        player.destroy_physics_body(&mut world);
        floor.destroy(&mut world);
    }
}
