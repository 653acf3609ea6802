//! Random connectivity graphs
//!
//! Produces a fresh, bounded edge list for a sender on every call. Edges
//! never form self loops.

use std::ops::RangeInclusive;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::SimulationConfig;
use crate::protocol::{GraphEdge, GraphPacket, MAX_EDGES};

/// Generates random graph packets for a population of nodes `1..=node_count`
pub struct GraphGenerator {
    rng: ChaCha8Rng,
    node_count: u16,
    edge_count: RangeInclusive<usize>,
    strength: RangeInclusive<u16>,
}

impl GraphGenerator {
    pub fn new(
        node_count: u16,
        edge_count: RangeInclusive<usize>,
        strength: RangeInclusive<u16>,
        rng: ChaCha8Rng,
    ) -> Self {
        let max = (*edge_count.end()).min(MAX_EDGES);
        let min = (*edge_count.start()).min(max);
        Self {
            rng,
            node_count,
            edge_count: min..=max,
            strength,
        }
    }

    pub fn from_config(config: &SimulationConfig, rng: ChaCha8Rng) -> Self {
        Self::new(
            config.node_count,
            config.min_edges..=config.max_edges,
            config.min_strength..=config.max_strength,
            rng,
        )
    }

    /// Generate a graph packet for `sender_id`
    pub fn generate(&mut self, sender_id: u16) -> GraphPacket {
        // A distinct target needs at least two nodes
        if self.node_count < 2 {
            return GraphPacket::new(sender_id, Vec::new());
        }

        let count = self.rng.gen_range(self.edge_count.clone());
        let mut edges = Vec::with_capacity(count);
        for _ in 0..count {
            let source_id = self.rng.gen_range(1..=self.node_count);
            let mut target_id = self.rng.gen_range(1..=self.node_count);
            while target_id == source_id {
                target_id = self.rng.gen_range(1..=self.node_count);
            }
            let strength = self.rng.gen_range(self.strength.clone());
            edges.push(GraphEdge::new(source_id, target_id, strength));
        }

        GraphPacket::new(sender_id, edges)
    }
}
