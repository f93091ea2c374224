//! Arena demo
//!
//! Headless frame loop around the engine core: a player runs circles on a
//! floor while sprinters chase it and grenades are lobbed at the closest
//! one. Frame times are jittered to exercise sub-stepping, including the
//! occasional long hitch.
//!
//! Usage: `arena [config.toml|config.ron]`

use ember_engine::config::{Config, ConfigError, EngineConfig};
use ember_engine::foundation::logging;
use ember_engine::foundation::math::{horizontal, Vec2, Vec3};
use ember_engine::foundation::time::{FixedTimestep, Timer};
use ember_engine::gameplay::{
    Grenade, GrenadeSettings, MovementIntent, PhysicsPlayer, PlayerSettings, Sprinter, SprinterSettings, StaticProp,
};
use ember_engine::physics::{DebugFlags, PhysicsError, PhysicsSimulation};
use ember_engine::scene::{
    EntityId, GameObject, PointLight, SceneError, SceneManager, SpectralObject, Sun, UiAnchor, UiElement,
};
use rand::Rng;

// Scenario configuration
const RUN_SECONDS: f32 = 20.0;
const ARENA_HALF_SIZE: f32 = 40.0;
const SPAWN_RADIUS: f32 = 15.0;
const MAX_ENEMIES: usize = 8;
const SPAWN_INTERVAL: f32 = 1.0;
const GRENADE_INTERVAL: f32 = 1.5;
const GRENADE_SPEED: f32 = 9.0;
const JUMP_INTERVAL: f32 = 2.0;
const LEASH_DISTANCE: f32 = 25.0; // Enemies farther than this are parked
const HITCH_CHANCE: f64 = 0.02;

#[derive(thiserror::Error, Debug)]
enum ArenaError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("physics: {0}")]
    Physics(#[from] PhysicsError),

    #[error("scene: {0}")]
    Scene(#[from] SceneError),
}

struct ArenaApp {
    simulation: PhysicsSimulation,
    scene: SceneManager,
    timestep: FixedTimestep,
    flags: DebugFlags,
    rng: rand::rngs::ThreadRng,
    elapsed: f32,
    spawn_timer: f32,
    grenade_timer: f32,
    jump_timer: f32,
    grenades_thrown: u32,
}

impl ArenaApp {
    fn new(config: &EngineConfig) -> Result<Self, ArenaError> {
        config.validate()?;

        let simulation = PhysicsSimulation::new(config.physics.clone())?;
        let timestep = FixedTimestep::new(config.physics.fixed_timestep, config.physics.max_substeps);

        Ok(Self {
            simulation,
            scene: SceneManager::new(),
            timestep,
            flags: DebugFlags::from(&config.debug),
            rng: rand::thread_rng(),
            elapsed: 0.0,
            spawn_timer: 0.0,
            grenade_timer: GRENADE_INTERVAL,
            jump_timer: JUMP_INTERVAL,
            grenades_thrown: 0,
        })
    }

    fn initialize(&mut self) -> Result<(), ArenaError> {
        log::info!("Building arena...");
        let world = self.simulation.world_mut();

        self.scene
            .add_managed_physics_entity(Box::new(StaticProp::floor(0.0, ARENA_HALF_SIZE)), world)?;
        for (x, z) in [(8.0, 0.0), (-6.0, 7.0), (0.0, -9.0)] {
            let pillar = StaticProp::cuboid(Vec3::new(x, 1.5, z), Vec3::new(0.75, 1.5, 0.75));
            self.scene.add_managed_physics_entity(Box::new(pillar), world)?;
        }

        let settings = PlayerSettings::default();
        let standing = settings.half_height + settings.radius + 0.05;
        self.scene
            .set_player(PhysicsPlayer::new(Vec3::new(0.0, standing, 0.0), settings), world)?;

        self.scene.set_sun(Sun::new(Vec3::new(-0.3, -1.0, -0.2), Vec3::new(1.0, 0.95, 0.9), 1.0));
        self.scene
            .add_light(PointLight::new(Vec3::new(0.0, 6.0, 0.0), Vec3::new(1.0, 0.6, 0.3), 2.0))?;
        self.scene
            .add_spectral_object(SpectralObject::new(Vec3::zeros(), Vec3::repeat(500.0), None))?;
        self.scene
            .add_ui_object(UiElement::new(UiAnchor::Screen(Vec2::zeros()), Vec2::new(0.02, 0.02), None))?;

        log::info!("Arena ready with {} objects", self.scene.object_count());
        Ok(())
    }

    fn run(&mut self) -> Result<(), ArenaError> {
        let mut timer = Timer::new();
        let mut next_report = 1.0;

        while self.elapsed < RUN_SECONDS {
            let frame_delta = self.next_frame_delta();
            self.elapsed += frame_delta;

            self.update_gameplay(frame_delta)?;

            let intent = self.player_intent();
            let Self { simulation, scene, timestep, flags, .. } = self;
            let steps = timestep.advance(frame_delta, || -> Result<(), ArenaError> {
                simulation.pre_simulation(scene, &intent)?;
                let report = simulation.simulate(scene)?;
                simulation.post_simulation(scene, *flags);
                if report.removed_stale > 0 {
                    log::debug!("Step {} removed {} objects", report.step, report.removed_stale);
                }
                Ok(())
            })?;
            if steps == 0 {
                log::trace!("Frame of {:.4}s ran no physics step", frame_delta);
            }

            self.render_frame();
            timer.update();

            if self.elapsed >= next_report {
                next_report += 1.0;
                self.report();
            }

            if self.scene.player().map_or(true, PhysicsPlayer::is_dead) {
                log::warn!("Player died after {:.1}s", self.elapsed);
                break;
            }
        }

        log::info!(
            "Simulated {:.1}s in {:.3}s wall time over {} frames ({} physics steps)",
            self.elapsed,
            timer.total_time(),
            timer.frame_count(),
            self.simulation.step_count()
        );
        Ok(())
    }

    fn next_frame_delta(&mut self) -> f32 {
        if self.rng.gen_bool(HITCH_CHANCE) {
            let hitch = self.rng.gen_range(0.15..0.4);
            log::debug!("Simulating a {:.3}s hitch", hitch);
            hitch
        } else {
            self.rng.gen_range(0.008..0.04)
        }
    }

    fn player_intent_direction(&self) -> Vec3 {
        let angle = self.elapsed * 0.5;
        Vec3::new(-angle.sin(), 0.0, angle.cos())
    }

    fn player_intent(&mut self) -> MovementIntent {
        let jump = self.jump_timer <= 0.0;
        if jump {
            self.jump_timer = JUMP_INTERVAL;
        }

        MovementIntent {
            direction: self.player_intent_direction(),
            jump,
        }
    }

    fn update_gameplay(&mut self, frame_delta: f32) -> Result<(), ArenaError> {
        self.spawn_timer -= frame_delta;
        self.grenade_timer -= frame_delta;
        self.jump_timer -= frame_delta;

        let Some(player_position) = self.scene.player().map(|p| p.position(self.simulation.world())) else {
            return Ok(());
        };

        let enemies = self.scene.active_enemies().count() + self.scene.passive_enemies().count();
        if self.spawn_timer <= 0.0 && enemies < MAX_ENEMIES {
            self.spawn_timer = SPAWN_INTERVAL;
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let position = player_position + Vec3::new(angle.cos(), 0.0, angle.sin()) * SPAWN_RADIUS;
            let sprinter = Sprinter::new(Vec3::new(position.x, 1.05, position.z), SprinterSettings::default());
            let id = self.scene.add_enemy(Box::new(sprinter), self.simulation.world_mut())?;
            log::info!("Spawned sprinter {}", id);
        }

        if self.grenade_timer <= 0.0 {
            self.grenade_timer = GRENADE_INTERVAL;
            if let Some(target) = self.closest_enemy(player_position) {
                self.throw_grenade(player_position, target)?;
            }
        }

        self.leash_enemies(player_position)
    }

    fn closest_enemy(&self, from: Vec3) -> Option<Vec3> {
        let world = self.simulation.world();
        self.scene
            .active_enemies()
            .map(|enemy| enemy.position(world))
            .min_by(|a, b| (a - from).norm().total_cmp(&(b - from).norm()))
    }

    fn throw_grenade(&mut self, from: Vec3, target: Vec3) -> Result<(), ArenaError> {
        let flat = horizontal(&(target - from));
        let Some(direction) = flat.try_normalize(f32::EPSILON) else {
            return Ok(());
        };

        let origin = from + direction * 0.8 + Vec3::y() * 0.5;
        let velocity = direction * GRENADE_SPEED + Vec3::y() * 4.0;
        let settings = GrenadeSettings {
            impact_fuse: self.grenades_thrown % 2 == 1,
            ..Default::default()
        };

        let id = self
            .scene
            .add_managed_physics_entity(Box::new(Grenade::thrown(origin, velocity, settings)), self.simulation.world_mut())?;
        self.grenades_thrown += 1;
        log::info!("Grenade {} thrown", id);
        Ok(())
    }

    /// Park enemies that fell far behind and bring them back once close
    fn leash_enemies(&mut self, player_position: Vec3) -> Result<(), ArenaError> {
        let world = self.simulation.world();
        let distance = |position: Vec3| horizontal(&(position - player_position)).norm();

        let to_park: Vec<EntityId> = self
            .scene
            .active_enemies()
            .filter(|enemy| distance(enemy.position(world)) > LEASH_DISTANCE)
            .map(|enemy| enemy.id())
            .collect();
        let to_wake: Vec<EntityId> = self
            .scene
            .passive_enemies()
            .filter(|enemy| distance(enemy.position(world)) <= LEASH_DISTANCE)
            .map(|enemy| enemy.id())
            .collect();

        for id in to_park {
            self.scene.detach_physics_object(id, self.simulation.world_mut())?;
            log::debug!("Parked sprinter {}", id);
        }
        for id in to_wake {
            self.scene.activate_physics_object(id, self.simulation.world_mut())?;
            log::debug!("Woke sprinter {}", id);
        }
        Ok(())
    }

    fn render_frame(&mut self) {
        let world = self.simulation.world();
        if let Some(viewpoint) = self.scene.player().map(|p| p.position(world)) {
            self.scene.update_spectral_objects(viewpoint);
        }

        let items = self.scene.render_snapshot(world);
        log::trace!("{} draw items", items.len());
    }

    fn report(&self) {
        let world = self.simulation.world();
        let enemies = self.scene.active_enemies().count();
        let parked = self.scene.passive_enemies().count();
        let health = self.scene.player().map_or(0.0, PhysicsPlayer::health);
        let position = self.scene.player().map_or_else(Vec3::zeros, |p| p.position(world));

        let facing = self.player_intent_direction();
        if let Some(id) = self.simulation.pick_entity(&self.scene, position, facing, 30.0) {
            log::debug!("Player is facing {}", id);
        }

        log::info!(
            "t={:.1}s player ({:.1}, {:.1}, {:.1}) health {:.0}, {} enemies active, {} parked, {} bodies",
            self.elapsed,
            position.x,
            position.y,
            position.z,
            health,
            enemies,
            parked,
            world.body_count()
        );
    }

    fn cleanup(&mut self) {
        log::info!("Cleaning up arena ({} grenades thrown)", self.grenades_thrown);
        self.scene.clear(self.simulation.world_mut());
    }
}

fn load_config() -> Result<EngineConfig, ArenaError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            Ok(EngineConfig::load_from_file(&path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    log::info!("Starting arena demo");

    let config = load_config()?;
    let mut app = ArenaApp::new(&config)?;
    let result = app.initialize().and_then(|()| app.run());
    app.cleanup();

    match result {
        Ok(()) => {
            log::info!("Arena demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Arena demo failed: {}", e);
            Err(e.into())
        }
    }
}
