//! `rplsim` command-line entry point.

use clap::Parser;
use rplsim_runner::{
    build_simulation, create_event_loop, load_config, write_records, RecordFilter, RecordFormat,
    RecordKind, ReportFormat, RunnerError, SimulationConfig,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Simulate RPL DODAG formation over randomly placed wireless nodes.
#[derive(Parser, Debug)]
#[command(name = "rplsim", version, about)]
struct Cli {
    /// YAML configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of nodes
    #[arg(short = 'n', long)]
    nodes: Option<usize>,

    /// Simulation horizon in seconds
    #[arg(long)]
    runtime: Option<f64>,

    /// Connection range in meters
    #[arg(long)]
    range: Option<f64>,

    /// Per-check disruption probability
    #[arg(long)]
    disruption: Option<f64>,

    /// Write the record stream to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Format of the record stream
    #[arg(long, value_enum, default_value_t = RecordFormat::Text)]
    record_format: RecordFormat,

    /// Write the final topology report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Format of the topology report
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    report_format: ReportFormat,

    /// Echo records of these nodes while running (e.g. "Node01,Node07" or "*")
    #[arg(long)]
    trace: Option<String>,

    /// Only echo these record kinds (e.g. "parent-changed,disruption-occurred").
    /// Without --trace, applies to every node.
    #[arg(long, value_delimiter = ',')]
    trace_kind: Vec<RecordKind>,

    /// Check protocol invariants after every event
    #[arg(long)]
    check_invariants: bool,
}

impl Cli {
    fn config(&self) -> Result<SimulationConfig, RunnerError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(nodes) = self.nodes {
            config.node_count = nodes;
        }
        if let Some(runtime) = self.runtime {
            config.runtime = runtime;
        }
        if let Some(range) = self.range {
            config.connection_range = range;
        }
        if let Some(p) = self.disruption {
            config.protocol.disruption_probability = p;
        }
        Ok(config)
    }

    fn trace_filter(&self) -> RecordFilter {
        let filter = match self.trace.as_deref() {
            Some(spec) => RecordFilter::from_spec(spec),
            None if !self.trace_kind.is_empty() => RecordFilter::from_spec("*"),
            None => RecordFilter::none(),
        };
        self.trace_kind
            .iter()
            .fold(filter, |filter, kind| filter.with_kind(*kind))
    }
}

fn run(cli: &Cli) -> Result<(), RunnerError> {
    let config = cli.config()?;
    let simulation = build_simulation(&config)?.with_trace(cli.trace_filter());
    let mut event_loop = create_event_loop(simulation).with_invariant_checks(cli.check_invariants);
    let stats = event_loop.run(config.runtime_time())?;

    if let Some(path) = &cli.output {
        let mut out = BufWriter::new(File::create(path)?);
        write_records(&mut out, event_loop.records().records(), cli.record_format)?;
        info!("Wrote {} records to {}", stats.records, path.display());
    }

    let digest = event_loop.digest();
    if let Some(path) = &cli.report {
        event_loop
            .report(stats.clone())
            .write_to(path, cli.report_format)?;
        info!("Wrote report to {}", path.display());
    }

    println!("RPL Simulation");
    println!("  seed:            {}", config.seed);
    println!("  simulated time:  {}s", event_loop.time());
    println!("  events:          {}", stats.total_events);
    println!(
        "  attached nodes:  {}/{}",
        stats.attached_nodes, stats.nodes_created
    );
    println!("  parent changes:  {}", stats.parent_changes);
    println!("  cycles rejected: {}", stats.cycles_rejected);
    println!("  disruptions:     {}", stats.disruptions);
    if cli.check_invariants {
        println!("  prefix errors:   {}", stats.prefix_inconsistencies);
    }
    println!("  digest:          {}", digest);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
