//! Errors raised while loading configuration or building the topology.

use thiserror::Error;

/// Errors from configuration loading, validation and node placement.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rejection sampling gave up before finding a free spot.
    #[error(
        "Could not place node {node} after {attempts} attempts \
         (minimum distance {minimum_distance} m); the area is too crowded"
    )]
    PlacementExhausted {
        node: usize,
        attempts: u32,
        minimum_distance: f64,
    },
}
