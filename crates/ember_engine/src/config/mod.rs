//! Configuration system
//!
//! Engine settings are plain `serde` structs with sensible defaults. Any type
//! implementing [`Config`] can be loaded from or saved to TOML or RON, picked
//! by file extension.

pub use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            Self::from_toml_str(&contents)
        } else if path.ends_with(".ron") {
            Self::from_ron_str(&contents)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse configuration from TOML text
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse configuration from RON text
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Physics world and stepping configuration
///
/// The capacity limits are hard ceilings. A scene that needs more bodies or
/// contacts than configured is authored beyond what the engine was set up
/// for, and the simulation reports it as a fatal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Length of one physics step in seconds
    pub fixed_timestep: f32,
    /// Maximum number of physics steps run for a single rendered frame
    pub max_substeps: u32,
    /// World gravity
    pub gravity: Vec3,
    /// Maximum number of rigid bodies alive in the world
    pub max_bodies: usize,
    /// Maximum number of overlapping body pairs tracked by the narrow phase
    pub max_body_pairs: usize,
    /// Maximum number of contact constraints solved per step
    pub max_contact_constraints: usize,
    /// Worker thread override; `None` uses hardware concurrency minus one
    pub worker_threads: Option<usize>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 5,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_bodies: 1024,
            max_body_pairs: 1024,
            max_contact_constraints: 1024,
            worker_threads: None,
        }
    }
}

impl PhysicsConfig {
    /// Check that every limit is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(ConfigError::Invalid {
                field: "fixed_timestep",
                reason: format!("must be a positive number of seconds, got {}", self.fixed_timestep),
            });
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid {
                field: "max_substeps",
                reason: "must allow at least one sub-step".to_string(),
            });
        }

        let limits = [
            ("max_bodies", self.max_bodies),
            ("max_body_pairs", self.max_body_pairs),
            ("max_contact_constraints", self.max_contact_constraints),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "capacity must be non-zero".to_string(),
                });
            }
        }

        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "worker_threads",
                reason: "use `None` for the automatic thread count".to_string(),
            });
        }

        Ok(())
    }

    /// Worker thread count for the physics pool
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }
}

impl Config for PhysicsConfig {}

/// Per-step debug logging switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log player and enemy positions after each step
    pub log_positions: bool,
    /// Log player and enemy velocities after each step
    pub log_velocities: bool,
    /// Log player and enemy health after each step
    pub log_health: bool,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Physics settings
    pub physics: PhysicsConfig,
    /// Debug logging settings
    pub debug: DebugConfig,
}

impl EngineConfig {
    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()
    }
}

impl Config for EngineConfig {}
