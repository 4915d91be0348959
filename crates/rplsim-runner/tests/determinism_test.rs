//! Determinism tests for RPLSim.
//!
//! The same seed and configuration must produce a byte-identical record stream;
//! a different seed must not.

use std::path::Path;

use rplsim_runner::{
    build_simulation, create_event_loop, load_config, write_records, RecordFormat,
    SimulationConfig, SimulationStats,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Everything a run produces that must be reproducible.
#[derive(Debug, PartialEq, Eq)]
struct RunOutput {
    stats: SimulationStats,
    text: String,
    jsonl: String,
    digest: String,
}

fn run(config: &SimulationConfig) -> RunOutput {
    let simulation = build_simulation(config)
        .unwrap_or_else(|e| panic!("Failed to build simulation: {}", e));
    let mut event_loop = create_event_loop(simulation);
    let stats = event_loop
        .run(config.runtime_time())
        .unwrap_or_else(|e| panic!("Failed to run simulation: {}", e));

    let records = event_loop.records().records();
    let mut text = Vec::new();
    write_records(&mut text, records, RecordFormat::Text).unwrap();
    let mut jsonl = Vec::new();
    write_records(&mut jsonl, records, RecordFormat::Jsonl).unwrap();

    RunOutput {
        stats,
        text: String::from_utf8(text).unwrap(),
        jsonl: String::from_utf8(jsonl).unwrap(),
        digest: event_loop.digest(),
    }
}

fn small_network() -> SimulationConfig {
    load_config(Path::new("tests/small_network.yaml"))
        .unwrap_or_else(|e| panic!("Failed to load tests/small_network.yaml: {}", e))
}

// ============================================================================
// Determinism Tests
// ============================================================================

#[test]
fn test_determinism_same_seed() {
    let config = small_network();
    let first = run(&config);
    let second = run(&config);

    assert!(!first.text.is_empty());
    assert_eq!(first.digest, second.digest);
    assert_eq!(first.text, second.text);
    assert_eq!(first.jsonl, second.jsonl);
    assert_eq!(first.stats, second.stats);
}

#[test]
fn test_determinism_different_seeds_differ() {
    let config = small_network();
    let other = SimulationConfig {
        seed: config.seed + 1,
        ..config.clone()
    };

    let first = run(&config);
    let second = run(&other);
    assert_ne!(first.digest, second.digest);
}

#[test]
fn test_digest_matches_text_stream() {
    use sha2::{Digest, Sha256};

    let output = run(&small_network());
    let expected = hex::encode(Sha256::digest(output.text.as_bytes()));
    assert_eq!(output.digest, expected);
}

#[test]
fn test_multiple_runs_consistent() {
    let config = SimulationConfig {
        runtime: 20.0,
        ..small_network()
    };
    let baseline = run(&config).digest;
    for _ in 0..3 {
        assert_eq!(run(&config).digest, baseline);
    }
}
