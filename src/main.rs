//! Swarmcast - Node swarm broadcaster and packet analyzer
//!
//! Simulates a swarm of nodes broadcasting position and connectivity-graph
//! packets over UDP, and dissects those packets on the receiving side.

mod analyzer;
mod config;
mod network;
mod protocol;
mod simulation;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use analyzer::{Dispatcher, Dissection, Mode, NetworkSummary};
use config::Config;
use network::{parse_ip, Datagram, UdpReceiver, UdpSender};
use simulation::{loop_rngs, run_graph_loop, run_position_loop, GraphGenerator, SimulationState};

/// Swarmcast - node swarm broadcaster and packet analyzer
#[derive(Parser)]
#[command(name = "swarmcast")]
#[command(author = "Swarmcast Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Broadcast and dissect swarm position/graph packets", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulated swarm and broadcast its packets
    Announce {
        /// Address to send packets to
        #[arg(short, long)]
        destination: Option<String>,

        /// Number of simulated nodes
        #[arg(short, long)]
        nodes: Option<u16>,

        /// Seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Receive packets on both designated ports and summarize them
    Listen {
        /// How defective packets are handled
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
    },

    /// Dissect a single hex-encoded payload
    Dissect {
        /// Payload bytes as hex
        #[arg(long)]
        hex: String,

        /// Source port hint
        #[arg(long, default_value_t = 0)]
        src_port: u16,

        /// Destination port hint
        #[arg(long, default_value_t = protocol::POSITION_PORT)]
        dst_port: u16,

        /// How defective packets are handled
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Announce {
            destination,
            nodes,
            seed,
        } => {
            let mut config = config;
            if let Some(destination) = destination {
                config.network.destination = destination;
            }
            if let Some(nodes) = nodes {
                config.simulation.node_count = nodes;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            run_announce(config).await?;
        }
        Commands::Listen { mode } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.analyzer.mode = mode;
            }
            run_listen(config).await?;
        }
        Commands::Dissect {
            hex,
            src_port,
            dst_port,
            mode,
        } => {
            let mode = mode.unwrap_or(config.analyzer.mode);
            run_dissect(&config, &hex, src_port, dst_port, mode)?;
        }
        Commands::Config { generate, output } => {
            if generate {
                if let Some(path) = output {
                    config::sample_config().save(&path)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", config::generate_sample_config()?);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info(&config);
        }
    }

    Ok(())
}

/// Run both broadcast loops until Ctrl+C
async fn run_announce(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let transport = config.network.transport()?;
    let sim = &config.simulation;

    let (position_rng, graph_rng) = loop_rngs(sim.seed);
    let state = SimulationState::from_config(sim, position_rng);
    for node in state.nodes() {
        tracing::debug!("Node {} starts at ({:.1}, {:.1})", node.id, node.x, node.y);
    }
    let generator = GraphGenerator::from_config(sim, graph_rng);

    // Each loop owns its own socket, as well as its own generator
    let position_sink = UdpSender::bind(&transport).await?;
    let graph_sink = UdpSender::bind(&transport).await?;

    tracing::info!(
        "Starting swarm '{}': {} nodes -> {} (positions :{}, graphs :{})",
        config.general.name,
        sim.node_count,
        position_sink.destination(),
        config.network.position_port,
        config.network.graph_port
    );
    if let Some(seed) = sim.seed {
        tracing::info!("Using seed {}", seed);
    }

    let stop = Arc::new(AtomicBool::new(false));

    let position_task = tokio::spawn(run_position_loop(
        state,
        position_sink,
        config.network.position_port,
        config.network.position_pacing(),
        stop.clone(),
    ));
    let graph_task = tokio::spawn(run_graph_loop(
        generator,
        sim.node_count,
        graph_sink,
        config.network.graph_port,
        config.network.graph_pacing(),
        stop.clone(),
    ));

    println!("Broadcasting. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");

    stop.store(true, Ordering::Relaxed);
    let position_stats = position_task.await?;
    let graph_stats = graph_task.await?;

    tracing::info!(
        "Sent {} position packets ({} errors), {} graph packets ({} errors)",
        position_stats.sent,
        position_stats.send_errors,
        graph_stats.sent,
        graph_stats.send_errors
    );

    Ok(())
}

/// Receive on both ports, dissect everything, print a summary periodically
async fn run_listen(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let transport = config.network.transport()?;
    let ports = config.network.ports();
    let dispatcher = Dispatcher::new(ports, config.analyzer.mode);

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::channel::<Datagram>(256);

    let mut receivers = Vec::new();
    for port in [ports.position_port, ports.graph_port] {
        let receiver =
            UdpReceiver::bind(transport.bind_address, port, transport.recv_buffer_size).await?;
        tracing::info!("Listening on {}:{}", transport.bind_address, receiver.local_port());
        receivers.push(tokio::spawn(receiver.run(tx.clone(), stop.clone())));
    }
    drop(tx);

    tracing::info!(
        "Analyzer '{}' running in {:?} mode",
        config.general.name,
        dispatcher.mode()
    );
    println!("Listening. Press Ctrl+C to stop.");

    let mut summary = NetworkSummary::new();
    let mut ticker =
        tokio::time::interval(Duration::from_millis(config.analyzer.summary_interval_ms.max(1)));

    loop {
        tokio::select! {
            Some(datagram) = rx.recv() => {
                let dissection = dispatcher.dispatch(
                    &datagram.payload,
                    datagram.source_port(),
                    datagram.destination_port,
                );
                log_dissection(&dissection, &datagram);
                summary.record(&dissection);
            }
            _ = ticker.tick() => {
                print_summary(&summary);
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    for receiver in receivers {
        if let Err(e) = receiver.await? {
            tracing::warn!("Receiver exited with error: {}", e);
        }
    }

    print_summary(&summary);
    Ok(())
}

fn log_dissection(dissection: &Dissection, datagram: &Datagram) {
    match dissection {
        Dissection::Position { packet, error } => match error {
            None => tracing::trace!("Position from {}: {:?}", datagram.source, packet),
            Some(e) => tracing::debug!("Invalid position from {}: {}", datagram.source, e),
        },
        Dissection::Graph {
            packet,
            flags,
            error,
        } => {
            for flag in flags {
                tracing::debug!("Graph from node {}: {}", packet.sender_id, flag);
            }
            if let Some(e) = error {
                tracing::debug!("Invalid graph from {}: {}", datagram.source, e);
            }
        }
        Dissection::Diagnostic(diagnostic) => match &diagnostic.reason {
            analyzer::DiagnosticReason::Rejected { .. } => tracing::warn!(
                "Rejected {} byte packet from {}: {:?}",
                diagnostic.observed_length,
                datagram.source,
                diagnostic.reason
            ),
            reason => tracing::debug!(
                "Undissected {} byte packet from {}: {:?}",
                diagnostic.observed_length,
                datagram.source,
                reason
            ),
        },
    }
}

fn print_summary(summary: &NetworkSummary) {
    let counters = summary.counters();
    println!(
        "--- {} nodes | positions {} graphs {} flagged {} invalid {} rejected {} unknown {} ---",
        summary.node_count(),
        counters.positions,
        counters.graphs,
        counters.flagged,
        counters.invalid,
        counters.rejected,
        counters.unknown + counters.too_short
    );
    for line in summary.lines() {
        println!("{}", line);
    }
}

/// Dissect one payload given on the command line
fn run_dissect(
    config: &Config,
    payload_hex: &str,
    src_port: u16,
    dst_port: u16,
    mode: Mode,
) -> anyhow::Result<()> {
    let cleaned: String = payload_hex.chars().filter(|c| !c.is_whitespace()).collect();
    let payload = hex::decode(&cleaned)?;

    let dispatcher = Dispatcher::new(config.network.ports(), mode);
    let dissection = dispatcher.dispatch(&payload, src_port, dst_port);
    println!("{}", dissection.to_json()?);

    Ok(())
}

/// Print protocol information
fn print_protocol_info(config: &Config) {
    println!("Swarmcast Protocol Information");
    println!("==============================\n");

    println!(
        "Position packet: {} bytes  node_id:u16 x:f32 y:f32 (little-endian)",
        protocol::POSITION_PACKET_SIZE
    );
    println!(
        "Graph packet:    {}..={} bytes  sender_id:u16 edge_count:u16 [source:u16 target:u16 strength:u16]*",
        protocol::GRAPH_HEADER_SIZE,
        protocol::MAX_GRAPH_PACKET_SIZE
    );
    println!("Max edges:       {}", protocol::MAX_EDGES);
    println!(
        "Coordinates:     {}..={}",
        protocol::COORDINATE_MIN,
        protocol::COORDINATE_MAX
    );

    println!("\nPosition port: {}", config.network.position_port);
    println!("Graph port:    {}", config.network.graph_port);
    match parse_ip(&config.network.destination) {
        Ok(addr) => println!("Destination:   {}", addr),
        Err(e) => println!("Destination:   {}", e),
    }
}
