//! Physics error types

use crate::config::ConfigError;
use thiserror::Error;

/// Fatal physics setup and capacity errors
///
/// None of these are recoverable at runtime: they mean the world could not be
/// built as configured, or the scene outgrew the limits it was configured for.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Configuration rejected during simulation construction
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A hard capacity ceiling was reached
    #[error("Physics capacity exceeded: {resource} limit is {limit}")]
    CapacityExceeded {
        /// Which ceiling was hit (bodies, body pairs, contact constraints)
        resource: &'static str,
        /// Configured ceiling
        limit: usize,
    },

    /// The physics worker pool could not be created
    #[error("Failed to build physics worker pool: {0}")]
    ThreadPool(String),
}
