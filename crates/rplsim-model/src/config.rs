//! Run configuration.
//!
//! Durations are configured in seconds and converted to [`SimTime`] on access. Every
//! field has a default, so an empty YAML document is a valid configuration:
//!
//! ```yaml
//! seed: 42
//! node_count: 20
//! connection_range: 20.0
//! protocol:
//!   disruption_probability: 0.05
//! ```

use crate::ModelError;
use rplsim_common::SimTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Configuration Types
// ============================================================================

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed for placement and protocol randomness.
    pub seed: u64,
    /// Number of nodes created over the run.
    pub node_count: usize,
    /// Width of the deployment area in meters.
    pub area_width: f64,
    /// Height of the deployment area in meters.
    pub area_height: f64,
    /// Minimum spacing between any two nodes in meters.
    pub minimum_distance: f64,
    /// Maximum link distance in meters.
    pub connection_range: f64,
    /// Period of the DIO advertisement loop in seconds.
    pub dio_interval: f64,
    /// Delay between consecutive node creations in seconds.
    pub node_creation_interval: f64,
    /// Simulation horizon in seconds.
    pub runtime: f64,
    /// Protocol timing and fault-injection parameters.
    pub protocol: ProtocolParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: 1111,
            node_count: 50,
            area_width: 125.0,
            area_height: 125.0,
            minimum_distance: 5.0,
            connection_range: 15.0,
            dio_interval: 10.0,
            node_creation_interval: 1.0,
            runtime: 120.0,
            protocol: ProtocolParams::default(),
        }
    }
}

/// Protocol constants that rarely change between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolParams {
    /// Delay between starting discovery and sending the DIS fan-out, in seconds.
    pub discovery_delay: f64,
    /// Delivery delay of every protocol message, in seconds.
    pub propagation_delay: f64,
    /// Smallest trickle interval in seconds.
    pub trickle_imin: f64,
    /// Largest trickle interval in seconds.
    pub trickle_imax: f64,
    /// Chance that a disruption check severs the node's links.
    pub disruption_probability: f64,
    /// Rejection-sampling attempts per node before placement fails.
    pub max_placement_attempts: u32,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        ProtocolParams {
            discovery_delay: 0.1,
            propagation_delay: 0.0,
            trickle_imin: 1.0,
            trickle_imax: 10.0,
            disruption_probability: 0.01,
            max_placement_attempts: 10_000,
        }
    }
}

// ============================================================================
// Accessors and Validation
// ============================================================================

impl SimulationConfig {
    /// Horizon at which the run stops.
    pub fn runtime_time(&self) -> SimTime {
        SimTime::from_secs(self.runtime)
    }

    /// Period of the DIO loop.
    pub fn dio_interval_time(&self) -> SimTime {
        SimTime::from_secs(self.dio_interval)
    }

    /// Delay between node creations.
    pub fn node_creation_interval_time(&self) -> SimTime {
        SimTime::from_secs(self.node_creation_interval)
    }

    /// Check that the configuration describes a runnable simulation.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.node_count == 0 {
            return Err(invalid("node_count must be at least 1"));
        }
        positive("area_width", self.area_width)?;
        positive("area_height", self.area_height)?;
        non_negative("minimum_distance", self.minimum_distance)?;
        positive("connection_range", self.connection_range)?;
        positive("dio_interval", self.dio_interval)?;
        if self.dio_interval_time() == SimTime::ZERO {
            return Err(invalid("dio_interval is below the clock resolution"));
        }
        non_negative("node_creation_interval", self.node_creation_interval)?;
        non_negative("runtime", self.runtime)?;
        self.protocol.validate()
    }
}

impl ProtocolParams {
    /// Discovery delay as simulation time.
    pub fn discovery_delay_time(&self) -> SimTime {
        SimTime::from_secs(self.discovery_delay)
    }

    /// Message propagation delay as simulation time.
    pub fn propagation_delay_time(&self) -> SimTime {
        SimTime::from_secs(self.propagation_delay)
    }

    /// Smallest trickle interval as simulation time.
    pub fn trickle_imin_time(&self) -> SimTime {
        SimTime::from_secs(self.trickle_imin)
    }

    /// Largest trickle interval as simulation time.
    pub fn trickle_imax_time(&self) -> SimTime {
        SimTime::from_secs(self.trickle_imax)
    }

    fn validate(&self) -> Result<(), ModelError> {
        non_negative("protocol.discovery_delay", self.discovery_delay)?;
        non_negative("protocol.propagation_delay", self.propagation_delay)?;
        positive("protocol.trickle_imin", self.trickle_imin)?;
        if self.trickle_imin_time() == SimTime::ZERO {
            return Err(invalid("protocol.trickle_imin is below the clock resolution"));
        }
        positive("protocol.trickle_imax", self.trickle_imax)?;
        if self.trickle_imax < self.trickle_imin {
            return Err(invalid(format!(
                "protocol.trickle_imax ({}) must not be smaller than protocol.trickle_imin ({})",
                self.trickle_imax, self.trickle_imin
            )));
        }
        if !(0.0..=1.0).contains(&self.disruption_probability) {
            return Err(invalid(format!(
                "protocol.disruption_probability must be within [0, 1], got {}",
                self.disruption_probability
            )));
        }
        if self.max_placement_attempts == 0 {
            return Err(invalid("protocol.max_placement_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ModelError {
    ModelError::InvalidConfig(msg.into())
}

fn positive(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be a positive number, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must not be negative, got {}", name, value)))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parse and validate a configuration from YAML text.
pub fn load_config_from_str(yaml: &str) -> Result<SimulationConfig, ModelError> {
    // An empty document deserializes to unit, not to an empty map.
    let config: SimulationConfig = if yaml.trim().is_empty() {
        SimulationConfig::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a YAML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimulationConfig, ModelError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    tracing::debug!("Loaded configuration from {}", path.as_ref().display());
    load_config_from_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.seed, 1111);
        assert_eq!(config.node_count, 50);
        assert_eq!(config.runtime_time(), SimTime::from_secs(120.0));
        assert_eq!(config.protocol.discovery_delay_time(), SimTime::from_millis(100));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = load_config_from_str(
            "seed: 7\nnode_count: 3\nprotocol:\n  disruption_probability: 0.5\n",
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.node_count, 3);
        assert_relative_eq!(config.connection_range, 15.0);
        assert_relative_eq!(config.protocol.disruption_probability, 0.5);
        assert_relative_eq!(config.protocol.trickle_imax, 10.0);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = load_config_from_str("  \n").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_config_from_str("seed: 1\nnode_cnt: 4\n").unwrap_err();
        assert!(matches!(err, ModelError::Yaml(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SimulationConfig {
            node_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));

        config.node_count = 5;
        config.connection_range = -1.0;
        assert!(config.validate().is_err());

        config.connection_range = 15.0;
        config.protocol.trickle_imax = 0.5;
        assert!(config.validate().is_err());

        config.protocol.trickle_imax = 10.0;
        config.protocol.disruption_probability = 1.5;
        assert!(config.validate().is_err());

        config.protocol.disruption_probability = 1.0;
        config.validate().unwrap();
    }

    #[test]
    fn test_sub_microsecond_intervals_rejected() {
        let config = SimulationConfig {
            dio_interval: 1e-7,
            ..Default::default()
        };
        match config.validate() {
            Err(ModelError::InvalidConfig(msg)) => assert!(msg.contains("dio_interval")),
            other => panic!("expected invalid dio_interval, got {:?}", other),
        }

        let mut config = SimulationConfig::default();
        config.protocol.trickle_imin = 1e-7;
        config.protocol.trickle_imax = 1e-7;
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));

        let config = SimulationConfig {
            dio_interval: 1e-6,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_round_trip_of_defaults() {
        let yaml = serde_yaml::to_string(&SimulationConfig::default()).unwrap();
        assert_eq!(load_config_from_str(&yaml).unwrap(), SimulationConfig::default());
    }
}
