//! Runner library for RPLSim.
//!
//! Builds a simulation from a [`SimulationConfig`], drives it with an [`EventLoop`]
//! and turns the result into statistics, a record stream and a topology report.
//!
//! ```rust,ignore
//! use rplsim_runner::{build_simulation, create_event_loop, SimulationConfig};
//!
//! let config = SimulationConfig::default();
//! let simulation = build_simulation(&config)?;
//! let mut event_loop = create_event_loop(simulation);
//! let stats = event_loop.run(config.runtime_time())?;
//! println!("{} of {} nodes attached", stats.attached_nodes, stats.nodes_created);
//! ```

pub mod error;
pub mod output;
pub mod report;

pub use error::RunnerError;
pub use output::{record_digest, write_records, RecordFormat};
pub use report::{ReportFormat, RunReport};

pub use rplsim_common::{EventRecord, NodeId, RecordFilter, RecordKind, RecordLog, SimTime};
pub use rplsim_model::{load_config, load_config_from_str, Position, SimulationConfig};
pub use rplsim_protocol::{InvariantViolation, Network, NodeSnapshot};

use rplsim_common::{SimContext, SimError};
use rplsim_metrics::metric_defs;
use rplsim_model::Topology;
use rplsim_protocol::invariants;
use serde::Serialize;
use tracing::{info, warn};

// ============================================================================
// Simulation Building
// ============================================================================

/// A network ready to run, plus how its records are echoed.
#[derive(Debug)]
pub struct Simulation {
    pub network: Network,
    pub trace: RecordFilter,
}

impl Simulation {
    /// Echo matching records through `tracing` while running.
    pub fn with_trace(mut self, trace: RecordFilter) -> Self {
        self.trace = trace;
        self
    }
}

/// Validate the configuration and place its nodes.
pub fn build_simulation(config: &SimulationConfig) -> Result<Simulation, RunnerError> {
    config.validate()?;
    let topology = Topology::generate(config)?;
    info!(
        "Placed {} nodes in {}x{} m (seed {})",
        topology.len(),
        config.area_width,
        config.area_height,
        config.seed
    );
    simulation_over(config.clone(), topology)
}

/// Build a simulation over explicit node positions instead of random placement.
///
/// `node_count` is taken from the number of positions.
pub fn build_simulation_with_positions(
    config: &SimulationConfig,
    positions: Vec<Position>,
) -> Result<Simulation, RunnerError> {
    let config = SimulationConfig {
        node_count: positions.len(),
        ..config.clone()
    };
    config.validate()?;
    let topology = Topology::from_positions(positions, config.connection_range);
    simulation_over(config, topology)
}

fn simulation_over(
    config: SimulationConfig,
    topology: Topology,
) -> Result<Simulation, RunnerError> {
    Ok(Simulation {
        network: Network::new(config, topology)?,
        trace: RecordFilter::none(),
    })
}

/// Wrap a simulation in an event loop with node creation scheduled at time zero.
pub fn create_event_loop(simulation: Simulation) -> EventLoop {
    let Simulation { network, trace } = simulation;
    let mut ctx = SimContext::new(network.config().seed, RecordLog::new(trace));
    network.start(&mut ctx);
    EventLoop {
        network,
        ctx,
        check_invariants: false,
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    /// Events executed since the loop was created.
    pub total_events: u64,
    /// Clock at the end of the run, in microseconds.
    pub simulation_time_us: u64,
    pub nodes_created: usize,
    pub attached_nodes: usize,
    pub records: usize,
    pub dis_sent: usize,
    pub dio_sent: usize,
    pub dao_sent: usize,
    pub parent_changes: usize,
    pub cycles_rejected: usize,
    pub stale_dios: usize,
    pub disruptions: usize,
    /// Nodes whose prefix disagrees with their parent's at the end of the run.
    /// Only computed when invariant checks are on.
    pub prefix_inconsistencies: usize,
}

/// Drives a [`Network`] through a [`SimContext`].
pub struct EventLoop {
    network: Network,
    ctx: SimContext,
    check_invariants: bool,
}

impl EventLoop {
    /// Check structural invariants after every event, and prefixes at the end.
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Records produced so far.
    pub fn records(&self) -> &RecordLog {
        self.ctx.records()
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.ctx.time()
    }

    /// Mutable access to the network and context, for injecting events or faults
    /// between runs.
    pub fn parts_mut(&mut self) -> (&mut Network, &mut SimContext) {
        (&mut self.network, &mut self.ctx)
    }

    /// Run every event up to and including `horizon`.
    pub fn run(&mut self, horizon: SimTime) -> Result<SimulationStats, RunnerError> {
        let before = self.ctx.scheduler().processed();

        if self.check_invariants {
            while let Some(time) = self.ctx.step(horizon, &mut self.network)? {
                if let Some(violation) = invariants::check_structure(&self.network).first() {
                    return Err(SimError::InvariantViolated {
                        time,
                        detail: violation.to_string(),
                    }
                    .into());
                }
            }
        }
        // Drains whatever is left (nothing when checking) and rests the clock.
        self.ctx.advance_to(horizon, &mut self.network)?;

        let processed = self.ctx.scheduler().processed() - before;
        metrics::counter!(metric_defs::EVENTS_PROCESSED.name).increment(processed);

        let mut stats = self.stats();
        if self.check_invariants {
            let mismatches = invariants::check_prefixes(&self.network);
            for violation in &mismatches {
                warn!("{}", violation);
            }
            stats.prefix_inconsistencies = mismatches.len();
        }
        metrics::gauge!(metric_defs::ATTACHED_NODES.name).set(stats.attached_nodes as f64);

        info!(
            "Run finished at {}s: {} events, {}/{} nodes attached",
            self.ctx.time(),
            stats.total_events,
            stats.attached_nodes,
            stats.nodes_created
        );
        Ok(stats)
    }

    /// Statistics derived from the network and record stream so far.
    pub fn stats(&self) -> SimulationStats {
        let records = self.ctx.records();
        SimulationStats {
            total_events: self.ctx.scheduler().processed(),
            simulation_time_us: self.ctx.time().as_micros(),
            nodes_created: self.network.nodes().len(),
            attached_nodes: self.network.attached_count(),
            records: records.len(),
            dis_sent: records.count(RecordKind::DisSent),
            dio_sent: records.count(RecordKind::DioSent),
            dao_sent: records.count(RecordKind::DaoSent) + records.count(RecordKind::DaoForwarded),
            parent_changes: records.count(RecordKind::ParentChanged),
            cycles_rejected: records.count(RecordKind::DioRejectedCycle)
                + records.count(RecordKind::DaoRejectedCycle),
            stale_dios: records.count(RecordKind::DioStale),
            disruptions: records.count(RecordKind::DisruptionOccurred),
            prefix_inconsistencies: 0,
        }
    }

    /// SHA-256 of the record stream so far.
    pub fn digest(&self) -> String {
        record_digest(self.ctx.records().records())
    }

    /// Report of the current state.
    pub fn report(&self, stats: SimulationStats) -> RunReport {
        RunReport::new(
            self.network.config().clone(),
            stats,
            self.digest(),
            self.network.snapshots(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            seed: 42,
            node_count: 12,
            area_width: 40.0,
            area_height: 40.0,
            runtime: 30.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_reports_consistent_stats() {
        let config = small_config();
        let mut event_loop = create_event_loop(build_simulation(&config).unwrap());
        let stats = event_loop.run(config.runtime_time()).unwrap();

        assert_eq!(stats.nodes_created, 12);
        assert_eq!(stats.simulation_time_us, 30_000_000);
        assert_eq!(stats.records, event_loop.records().len());
        assert!(stats.total_events > 0);
        assert!(stats.attached_nodes <= stats.nodes_created);
        assert_eq!(stats, event_loop.stats());
    }

    #[test]
    fn test_run_can_resume() {
        let config = small_config();
        let mut event_loop = create_event_loop(build_simulation(&config).unwrap());
        let first = event_loop.run(SimTime::from_secs(10.0)).unwrap();
        let second = event_loop.run(SimTime::from_secs(20.0)).unwrap();
        assert!(second.total_events >= first.total_events);
        assert_eq!(event_loop.time(), SimTime::from_secs(20.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            connection_range: 0.0,
            ..small_config()
        };
        assert!(matches!(
            build_simulation(&config),
            Err(RunnerError::Model(_))
        ));
    }

    #[test]
    fn test_report_serializes() {
        let config = small_config();
        let mut event_loop = create_event_loop(build_simulation(&config).unwrap());
        let stats = event_loop.run(SimTime::from_secs(5.0)).unwrap();
        let report = event_loop.report(stats);

        let json: serde_json::Value =
            serde_json::from_str(&report.render(ReportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(6));
        assert_eq!(json["digest"], event_loop.digest());
        assert_eq!(json["config"]["seed"], 42);

        let yaml = report.render(ReportFormat::Yaml).unwrap();
        assert!(yaml.contains("digest:"));
    }
}
