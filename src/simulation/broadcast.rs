//! Broadcast loops
//!
//! Two independent loops, one per packet kind. Each owns its own generator
//! state and sink; the only thing they share is the stop flag, which they
//! poll between sends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::network::PacketSink;
use crate::protocol::{encode_graph, encode_position};

use super::{GraphGenerator, SimulationState};

/// Longest single sleep before the stop flag is checked again
const STOP_POLL_SLICE: Duration = Duration::from_millis(50);

/// Delays between sends
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Pause after each node's packet
    pub per_node: Duration,
    /// Pause after a full pass over all nodes
    pub per_tick: Duration,
}

impl Pacing {
    pub fn from_millis(per_node_ms: u64, per_tick_ms: u64) -> Self {
        Self {
            per_node: Duration::from_millis(per_node_ms),
            per_tick: Duration::from_millis(per_tick_ms),
        }
    }
}

/// Counters returned when a loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub sent: u64,
    pub send_errors: u64,
}

fn stopped(stop: &AtomicBool) -> bool {
    stop.load(Ordering::Relaxed)
}

/// Sleep for `duration`, waking early once `stop` is set
async fn pause(duration: Duration, stop: &AtomicBool) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return;
    }

    let mut remaining = duration;
    while !remaining.is_zero() && !stopped(stop) {
        let slice = remaining.min(STOP_POLL_SLICE);
        tokio::time::sleep(slice).await;
        remaining -= slice;
    }
}

/// Advance the simulation and emit one position packet per node per tick
pub async fn run_position_loop<S: PacketSink>(
    mut state: SimulationState,
    sink: S,
    port: u16,
    pacing: Pacing,
    stop: Arc<AtomicBool>,
) -> LoopStats {
    let mut stats = LoopStats::default();
    tracing::info!(
        "Position loop started: {} nodes -> port {}",
        state.node_count(),
        port
    );

    while !stopped(&stop) {
        state.tick();
        stats.ticks += 1;

        for packet in state.position_packets() {
            if stopped(&stop) {
                break;
            }
            let bytes = encode_position(packet.node_id, packet.x, packet.y);
            match sink.send(&bytes, port).await {
                Ok(()) => stats.sent += 1,
                Err(e) => {
                    stats.send_errors += 1;
                    tracing::error!("Failed to send position of node {}: {}", packet.node_id, e);
                }
            }
            pause(pacing.per_node, &stop).await;
        }

        if let Some((neighbor, distance)) = state.nearest_neighbor(1) {
            tracing::debug!(
                "Tick {}: node 1 nearest neighbor is {} at {:.1}",
                stats.ticks,
                neighbor,
                distance
            );
        }

        pause(pacing.per_tick, &stop).await;
    }

    tracing::info!("Position loop stopped after {} ticks", stats.ticks);
    stats
}

/// Emit one freshly generated graph packet per node per tick
pub async fn run_graph_loop<S: PacketSink>(
    mut generator: GraphGenerator,
    node_count: u16,
    sink: S,
    port: u16,
    pacing: Pacing,
    stop: Arc<AtomicBool>,
) -> LoopStats {
    let mut stats = LoopStats::default();
    tracing::info!("Graph loop started: {} senders -> port {}", node_count, port);

    while !stopped(&stop) {
        stats.ticks += 1;

        for sender_id in 1..=node_count {
            if stopped(&stop) {
                break;
            }
            let packet = generator.generate(sender_id);
            let bytes = encode_graph(packet.sender_id, &packet.edges);
            match sink.send(&bytes, port).await {
                Ok(()) => stats.sent += 1,
                Err(e) => {
                    stats.send_errors += 1;
                    tracing::error!("Failed to send graph of node {}: {}", sender_id, e);
                }
            }
            pause(pacing.per_node, &stop).await;
        }

        pause(pacing.per_tick, &stop).await;
    }

    tracing::info!("Graph loop stopped after {} ticks", stats.ticks);
    stats
}
