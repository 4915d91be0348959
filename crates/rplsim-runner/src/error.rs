//! Runner error type.

use rplsim_common::SimError;
use rplsim_model::ModelError;
use thiserror::Error;

/// Anything that can stop a run or its output.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
