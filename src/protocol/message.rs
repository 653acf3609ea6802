//! Protocol packet definitions
//!
//! Plain value types for the two broadcast payloads. Their in-memory layout
//! has nothing to do with the wire layout; see the codec for that.

use serde::{Deserialize, Serialize};

/// Which of the two payload shapes a buffer carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Position,
    Graph,
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketKind::Position => write!(f, "position"),
            PacketKind::Graph => write!(f, "graph"),
        }
    }
}

/// A single node's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionPacket {
    /// Node identifier (1..=65535 when valid)
    pub node_id: u16,
    /// Horizontal coordinate, expected in 0.0..=1000.0
    pub x: f32,
    /// Vertical coordinate, expected in 0.0..=1000.0
    pub y: f32,
}

impl PositionPacket {
    pub fn new(node_id: u16, x: f32, y: f32) -> Self {
        Self { node_id, x, y }
    }
}

/// A directed, weighted link between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: u16,
    pub target_id: u16,
    /// Link strength, 1..=1000 by convention
    pub strength: u16,
}

impl GraphEdge {
    pub fn new(source_id: u16, target_id: u16, strength: u16) -> Self {
        Self {
            source_id,
            target_id,
            strength,
        }
    }

    /// Whether the edge points back at its own source
    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}

/// Header fields of a graph packet as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphHeader {
    pub sender_id: u16,
    /// Declared edge count; a claim, not a guarantee
    pub edge_count: u16,
}

/// A sender's outgoing edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPacket {
    pub sender_id: u16,
    /// Declared edge count. Equals `edges.len()` when well-formed.
    pub edge_count: u16,
    pub edges: Vec<GraphEdge>,
}

impl GraphPacket {
    /// Build a well-formed packet whose declared count matches its edges
    pub fn new(sender_id: u16, edges: Vec<GraphEdge>) -> Self {
        Self {
            sender_id,
            edge_count: edges.len() as u16,
            edges,
        }
    }
}
