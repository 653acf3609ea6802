//! Simulated node positions
//!
//! Each node wanders inside the 1000x1000 field: every tick a biased coin
//! decides whether it moves, and if so both coordinates get an independent
//! uniform nudge before being clamped back into the field.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::SimulationConfig;
use crate::protocol::{PositionPacket, COORDINATE_MAX, COORDINATE_MIN};

/// A simulated node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationNode {
    /// Identifier, 1..=N
    pub id: u16,
    pub x: f32,
    pub y: f32,
}

impl SimulationNode {
    pub fn to_packet(&self) -> PositionPacket {
        PositionPacket::new(self.id, self.x, self.y)
    }
}

/// Positions of a fixed node population plus their pairwise distances
pub struct SimulationState {
    nodes: Vec<SimulationNode>,
    /// Symmetric all-pairs table, indexed by `id - 1`
    distances: Vec<Vec<f32>>,
    move_probability: f64,
    max_step: f32,
    rng: ChaCha8Rng,
}

impl SimulationState {
    /// Create `node_count` nodes at uniformly random positions
    pub fn new(node_count: u16, move_probability: f64, max_step: f32, mut rng: ChaCha8Rng) -> Self {
        let nodes = (1..=node_count)
            .map(|id| SimulationNode {
                id,
                x: rng.gen_range(COORDINATE_MIN..=COORDINATE_MAX),
                y: rng.gen_range(COORDINATE_MIN..=COORDINATE_MAX),
            })
            .collect::<Vec<_>>();

        let n = nodes.len();
        let mut state = Self {
            nodes,
            distances: vec![vec![0.0; n]; n],
            move_probability: move_probability.clamp(0.0, 1.0),
            max_step: max_step.abs(),
            rng,
        };
        state.refresh_distances();
        state
    }

    pub fn from_config(config: &SimulationConfig, rng: ChaCha8Rng) -> Self {
        Self::new(config.node_count, config.move_probability, config.max_step, rng)
    }

    /// Advance every node by one tick
    pub fn tick(&mut self) {
        for node in &mut self.nodes {
            if !self.rng.gen_bool(self.move_probability) {
                continue;
            }
            let dx = self.rng.gen_range(-self.max_step..=self.max_step);
            let dy = self.rng.gen_range(-self.max_step..=self.max_step);
            node.x = (node.x + dx).clamp(COORDINATE_MIN, COORDINATE_MAX);
            node.y = (node.y + dy).clamp(COORDINATE_MIN, COORDINATE_MAX);
        }
        self.refresh_distances();
    }

    fn refresh_distances(&mut self) {
        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(&self.nodes[i], &self.nodes[j]);
                self.distances[i][j] = d;
                self.distances[j][i] = d;
            }
        }
    }

    pub fn nodes(&self) -> &[SimulationNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn index_of(&self, id: u16) -> Option<usize> {
        let index = (id as usize).checked_sub(1)?;
        (index < self.nodes.len()).then_some(index)
    }

    #[cfg(test)]
    pub fn position(&self, id: u16) -> Option<(f32, f32)> {
        self.index_of(id).map(|i| (self.nodes[i].x, self.nodes[i].y))
    }

    /// Distance between two nodes as of the last tick
    pub fn distance(&self, a: u16, b: u16) -> Option<f32> {
        Some(self.distances[self.index_of(a)?][self.index_of(b)?])
    }

    /// Closest other node and its distance
    pub fn nearest_neighbor(&self, id: u16) -> Option<(u16, f32)> {
        self.nodes
            .iter()
            .filter(|other| other.id != id)
            .filter_map(|other| Some((other.id, self.distance(id, other.id)?)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
    }

    /// One position packet per node, in id order
    pub fn position_packets(&self) -> Vec<PositionPacket> {
        self.nodes.iter().map(SimulationNode::to_packet).collect()
    }
}

fn euclidean(a: &SimulationNode, b: &SimulationNode) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}
